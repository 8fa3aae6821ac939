use crate::config::toml_config::CombineConfig;
use crate::core::aggregate::combine;
use crate::core::{Pipeline, Storage};
use crate::utils::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct GroupWords {
    pub name: String,
    pub words: Vec<String>,
}

/// Merges per-value answer files into one word list per configured group.
pub struct CombinePipeline<S: Storage> {
    storage: S,
    config: CombineConfig,
}

impl<S: Storage> CombinePipeline<S> {
    pub fn new(storage: S, config: CombineConfig) -> Self {
        Self { storage, config }
    }

    fn output_path(&self, group: &str) -> String {
        format!("{}/{}.json", self.config.output_dir.trim_end_matches('/'), group)
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for CombinePipeline<S> {
    type Extracted = Vec<GroupWords>;
    type Transformed = Vec<(String, Vec<u8>)>;

    fn name(&self) -> &str {
        "combine"
    }

    async fn extract(&self) -> Result<Vec<GroupWords>> {
        let mut groups = Vec::with_capacity(self.config.groups.len());

        for group in &self.config.groups {
            let mut words = Vec::new();
            for source_dir in &self.config.source_dirs {
                let mut part = combine(&self.storage, source_dir, &group.files).await?;
                tracing::info!("📂 {} <- {}: {} words", group.name, source_dir, part.len());
                words.append(&mut part);
            }
            groups.push(GroupWords {
                name: group.name.clone(),
                words,
            });
        }

        Ok(groups)
    }

    async fn transform(&self, groups: Vec<GroupWords>) -> Result<Vec<(String, Vec<u8>)>> {
        let mut outputs = Vec::with_capacity(groups.len());
        for group in groups {
            let bytes = serde_json::to_vec_pretty(&group.words)?;
            tracing::info!("📊 {}: {} words total", group.name, group.words.len());
            outputs.push((self.output_path(&group.name), bytes));
        }
        Ok(outputs)
    }

    async fn load(&self, outputs: Vec<(String, Vec<u8>)>) -> Result<String> {
        for (path, bytes) in &outputs {
            self.storage.write_file(path, bytes).await?;
            tracing::info!("💾 Saved {}", path);
        }

        Ok(self.config.output_dir.clone())
    }
}
