//! Stage runners shared by the CLI commands.
//!
//! Every relative path in [`ProbeConfig`] is resolved against `root`; the
//! binary passes the working directory.

use crate::adapters::{LocalStorage, OpenAiClient};
use crate::app::pipelines::{plan_jobs, AskPipeline, CombinePipeline, RenderPipeline};
use crate::config::ProbeConfig;
use crate::core::engine::StageEngine;
use crate::core::lexicon::LexiconLoader;
use crate::core::sentiment::SentimentClassifier;
use crate::core::{CompletionClient, Storage};
use crate::domain::model::{CategoryMap, PromptTemplate};
use crate::utils::error::{ProbeError, Result};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

fn storage_at(root: &Path, dir: &str) -> LocalStorage {
    LocalStorage::new(root.join(dir).to_string_lossy().into_owned())
}

fn resolve(root: &Path, path: &str) -> String {
    root.join(path).to_string_lossy().into_owned()
}

/// 去掉 `./`，讓 `outputs/x` 與 `./outputs/x` 相等
fn normalized(path: PathBuf) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn load_inputs(config: &ProbeConfig, root: &Path) -> Result<(CategoryMap, PromptTemplate)> {
    let categories = CategoryMap::from_file(resolve(root, &config.inputs.categories_path))?;
    let template = PromptTemplate::from_file(resolve(root, &config.inputs.prompt_path))?;
    Ok((categories, template))
}

pub async fn run_ask(config: &ProbeConfig, root: &Path) -> Result<String> {
    // 在發出任何請求前載入輸入檔
    let (categories, template) = load_inputs(config, root)?;
    ask_with(config, root, categories, template).await
}

async fn ask_with(
    config: &ProbeConfig,
    root: &Path,
    categories: CategoryMap,
    template: PromptTemplate,
) -> Result<String> {
    tracing::info!(
        "📋 Loaded {} categories ({} values)",
        categories.categories.len(),
        categories.total_values()
    );

    let api_key = config.api.resolve_api_key()?;
    let client = Arc::new(OpenAiClient::new(&config.api, api_key)?);
    tracing::info!("🤖 Using model {} at {}", client.model(), config.api.base_url);

    let storage = storage_at(root, &config.ask.output_dir);
    let pipeline = AskPipeline::new(storage, client, categories, template, config.ask.clone());

    StageEngine::new(pipeline).run().await
}

pub async fn run_combine(config: &ProbeConfig, root: &Path) -> Result<String> {
    let storage = storage_at(root, ".");
    let pipeline = CombinePipeline::new(storage, config.combine.clone());

    StageEngine::new(pipeline).run().await
}

pub async fn run_render(config: &ProbeConfig, root: &Path) -> Result<String> {
    let mut lexicon = config.lexicon.clone();
    lexicon.path = lexicon.path.map(|path| resolve(root, &path));
    let loader = LexiconLoader::from_config(&lexicon)?;

    let mut render = config.render.clone();
    render.font_path = render.font_path.map(|path| resolve(root, &path));

    let mut pipeline = RenderPipeline::new(storage_at(root, "."), loader, lexicon.on_fetch_error, render);

    if config.render.ai_fallback {
        let api_key = config.api.resolve_api_key()?;
        let client: Arc<dyn CompletionClient> = Arc::new(OpenAiClient::new(&config.api, api_key)?);
        tracing::info!("🤖 AI sentiment fallback enabled");
        pipeline = pipeline.with_classifier(Arc::new(SentimentClassifier::new(
            client,
            config.render.classifier_temperature,
        )));
    }

    StageEngine::new(pipeline).run().await
}

/// Combine inputs that neither this ask run writes nor already exist.
pub async fn unplanned_combine_inputs(
    config: &ProbeConfig,
    root: &Path,
    categories: &CategoryMap,
) -> Vec<String> {
    let planned: HashSet<PathBuf> = plan_jobs(categories, &config.ask)
        .into_iter()
        .map(|job| normalized(Path::new(&config.ask.output_dir).join(job.path)))
        .collect();
    let storage = storage_at(root, ".");

    let mut missing = Vec::new();
    for dir in &config.combine.source_dirs {
        for group in &config.combine.groups {
            for file in &group.files {
                let path = normalized(Path::new(dir).join(file));
                if planned.contains(&path) {
                    continue;
                }
                let path = path.to_string_lossy().into_owned();
                if !storage.exists(&path).await {
                    missing.push(path);
                }
            }
        }
    }
    missing
}

/// ask → combine → render. Fails before any request when combine would not
/// find its inputs.
pub async fn run_all(config: &ProbeConfig, root: &Path) -> Result<Vec<String>> {
    let (categories, template) = load_inputs(config, root)?;

    let missing = unplanned_combine_inputs(config, root, &categories).await;
    if let Some(first) = missing.first() {
        return Err(ProbeError::ConfigValidationError {
            field: "combine.source_dirs".to_string(),
            message: format!(
                "{} combine input(s) are neither written by ask nor present, first: {}",
                missing.len(),
                first
            ),
        });
    }

    let asked = ask_with(config, root, categories, template).await?;
    let combined = run_combine(config, root).await?;
    let rendered = run_render(config, root).await?;
    Ok(vec![asked, combined, rendered])
}
