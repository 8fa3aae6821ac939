use crate::config::toml_config::AskConfig;
use crate::core::{CompletionClient, Pipeline, Storage};
use crate::domain::model::{
    CategoryMap, CompletionRequest, CompletionResult, PromptTemplate, ResponseFormat,
};
use crate::utils::error::{ProbeError, Result};
use std::sync::Arc;
use tokio::task::JoinSet;

/// One (category, value) request and where its answer goes.
#[derive(Debug, Clone, PartialEq)]
pub struct AskJob {
    pub index: usize,
    pub category: String,
    pub value: String,
    /// Relative to the storage root, e.g. `gender/men.json`.
    pub path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SavedResponse {
    pub job: AskJob,
    pub bytes: usize,
}

/// Sends the prompt template once per category value and stores each answer
/// as `<category>/<value>.<ext>` under the storage root.
pub struct AskPipeline<S: Storage, C: CompletionClient> {
    storage: Arc<S>,
    client: Arc<C>,
    categories: CategoryMap,
    template: PromptTemplate,
    config: AskConfig,
}

impl<S, C> AskPipeline<S, C>
where
    S: Storage + 'static,
    C: CompletionClient + 'static,
{
    pub fn new(
        storage: S,
        client: Arc<C>,
        categories: CategoryMap,
        template: PromptTemplate,
        config: AskConfig,
    ) -> Self {
        Self {
            storage: Arc::new(storage),
            client,
            categories,
            template,
            config,
        }
    }

    pub fn planned_jobs(&self) -> Vec<AskJob> {
        plan_jobs(&self.categories, &self.config)
    }

    fn request_for(&self, value: &str) -> Result<CompletionRequest> {
        Ok(CompletionRequest {
            messages: self.template.messages_for(value)?,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            top_p: self.config.top_p,
            response_format: self.config.response_format,
        })
    }
}

/// Every job the settings would run, before skip-existing checks.
pub fn plan_jobs(categories: &CategoryMap, config: &AskConfig) -> Vec<AskJob> {
    let extension = config.response_format.extension();
    let jobs = categories.pairs().enumerate().map(|(index, (category, value))| AskJob {
        index,
        category: category.to_string(),
        value: value.to_string(),
        path: format!("{}/{}.{}", category, value, extension),
    });

    if config.dry_run {
        jobs.take(1).collect()
    } else {
        jobs.collect()
    }
}

async fn execute_job<S: Storage, C: CompletionClient>(
    storage: Arc<S>,
    client: Arc<C>,
    request: CompletionRequest,
    job: AskJob,
) -> Result<SavedResponse> {
    tracing::info!("📡 Processing {}/{}", job.category, job.value);

    let content = client.complete(&request).await?;
    let result = match request.response_format {
        ResponseFormat::Json => {
            let value: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
                ProbeError::ProcessingError {
                    message: format!(
                        "{}/{}: model answer is not valid JSON ({}): {}",
                        job.category, job.value, e, content
                    ),
                }
            })?;
            CompletionResult::Json(value)
        }
        ResponseFormat::Text => CompletionResult::Text(content),
    };

    let bytes = result.to_bytes()?;
    storage.write_file(&job.path, &bytes).await?;
    tracing::info!("💾 Saved {}", job.path);

    Ok(SavedResponse {
        bytes: bytes.len(),
        job,
    })
}

#[async_trait::async_trait]
impl<S, C> Pipeline for AskPipeline<S, C>
where
    S: Storage + 'static,
    C: CompletionClient + 'static,
{
    type Extracted = Vec<AskJob>;
    type Transformed = Vec<SavedResponse>;

    fn name(&self) -> &str {
        "ask"
    }

    async fn extract(&self) -> Result<Vec<AskJob>> {
        if self.config.dry_run {
            tracing::info!("🎯 Dry-run mode: only the first value of the first category");
        }

        let mut jobs = Vec::new();
        for job in self.planned_jobs() {
            if self.config.skip_existing && self.storage.exists(&job.path).await {
                tracing::info!("⏭️ Skipping {} (already exists)", job.path);
                continue;
            }
            jobs.push(job);
        }

        tracing::info!(
            "📥 Planned {} requests across {} categories",
            jobs.len(),
            self.categories.categories.len()
        );
        Ok(jobs)
    }

    async fn transform(&self, jobs: Vec<AskJob>) -> Result<Vec<SavedResponse>> {
        let limit = self.config.concurrent_requests().max(1);
        let mut tasks = JoinSet::new();
        let mut saved = Vec::with_capacity(jobs.len());

        for job in jobs {
            // 達到並發上限時先等一個完成；任何失敗都直接中止（JoinSet drop 會取消其餘工作）
            if tasks.len() >= limit {
                if let Some(joined) = tasks.join_next().await {
                    saved.push(flatten_join(joined)?);
                }
            }

            let request = self.request_for(&job.value)?;
            tasks.spawn(execute_job(
                Arc::clone(&self.storage),
                Arc::clone(&self.client),
                request,
                job,
            ));
        }

        while let Some(joined) = tasks.join_next().await {
            saved.push(flatten_join(joined)?);
        }

        saved.sort_by_key(|s| s.job.index);
        Ok(saved)
    }

    async fn load(&self, saved: Vec<SavedResponse>) -> Result<String> {
        for category in &self.categories.categories {
            let count = saved.iter().filter(|s| s.job.category == category.name).count();
            if count > 0 {
                tracing::info!("📊 {}: {} answers saved", category.name, count);
            }
        }

        Ok(format!("{} responses", saved.len()))
    }
}

fn flatten_join(
    joined: std::result::Result<Result<SavedResponse>, tokio::task::JoinError>,
) -> Result<SavedResponse> {
    joined.map_err(|e| ProbeError::ProcessingError {
        message: format!("request task failed: {}", e),
    })?
}
