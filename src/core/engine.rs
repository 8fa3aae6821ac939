use crate::core::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

pub struct StageEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> StageEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        let name = self.pipeline.name();
        let started = Instant::now();
        tracing::info!("🚀 Starting {} stage", name);

        tracing::debug!("📥 {}: extracting", name);
        let extracted = self.pipeline.extract().await?;

        tracing::debug!("🔄 {}: transforming", name);
        let transformed = self.pipeline.transform(extracted).await?;

        tracing::debug!("💾 {}: loading", name);
        let output = self.pipeline.load(transformed).await?;

        tracing::info!(
            "✅ {} stage finished in {:?}, output: {}",
            name,
            started.elapsed(),
            output
        );
        Ok(output)
    }
}
