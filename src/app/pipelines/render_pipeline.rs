use crate::config::toml_config::{CloudConfig, FetchErrorPolicy, RenderConfig};
use crate::core::lexicon::LexiconLoader;
use crate::core::render::{encode_png, load_font, CloudRenderer};
use crate::core::sentiment::{SentimentClassifier, SentimentResolver};
use crate::core::{Pipeline, Storage};
use crate::domain::model::{Lexicon, Sentiment, WeightedWord, WordFrequencies};
use crate::utils::error::{ProbeError, Result};
use std::sync::Arc;

pub struct CloudInput {
    pub cloud: CloudConfig,
    pub words: Vec<String>,
}

pub struct RenderInput {
    pub lexicon: Lexicon,
    pub clouds: Vec<CloudInput>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CloudPlan {
    pub cloud: CloudConfig,
    pub words: Vec<WeightedWord>,
}

/// Turns each aggregate word list into a sentiment-colored word cloud PNG.
pub struct RenderPipeline<S: Storage> {
    storage: S,
    loader: LexiconLoader,
    policy: FetchErrorPolicy,
    classifier: Option<Arc<SentimentClassifier>>,
    config: RenderConfig,
}

impl<S: Storage> RenderPipeline<S> {
    pub fn new(storage: S, loader: LexiconLoader, policy: FetchErrorPolicy, config: RenderConfig) -> Self {
        Self {
            storage,
            loader,
            policy,
            classifier: None,
            config,
        }
    }

    /// Words the lexicon cannot resolve are sent to this classifier.
    pub fn with_classifier(mut self, classifier: Arc<SentimentClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    async fn load_lexicon(&self) -> Result<Lexicon> {
        match self.loader.load().await {
            Ok(lexicon) => Ok(lexicon),
            Err(e) => match self.policy {
                FetchErrorPolicy::Abort => Err(e),
                FetchErrorPolicy::Neutral => {
                    tracing::warn!("⚠️ Lexicon unavailable ({}), words without AI fallback will be neutral", e);
                    Ok(Lexicon::default())
                }
            },
        }
    }

    async fn read_words(&self, path: &str) -> Result<Vec<String>> {
        let bytes = self.storage.read_file(path).await?;
        let value: serde_json::Value = serde_json::from_slice(&bytes)?;
        let serde_json::Value::Array(items) = value else {
            return Err(ProbeError::ValidationError {
                message: format!("{} is not a JSON array", path),
            });
        };

        items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(text) => Ok(text),
                other => Err(ProbeError::ValidationError {
                    message: format!("{}: expected a string, found {}", path, other),
                }),
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for RenderPipeline<S> {
    type Extracted = RenderInput;
    type Transformed = Vec<CloudPlan>;

    fn name(&self) -> &str {
        "render"
    }

    async fn extract(&self) -> Result<RenderInput> {
        let lexicon = self.load_lexicon().await?;

        let mut clouds = Vec::with_capacity(self.config.clouds.len());
        for cloud in &self.config.clouds {
            let words = self.read_words(&cloud.input).await?;
            tracing::info!("📥 {}: {} words from {}", cloud.title, words.len(), cloud.input);
            clouds.push(CloudInput {
                cloud: cloud.clone(),
                words,
            });
        }

        Ok(RenderInput { lexicon, clouds })
    }

    async fn transform(&self, input: RenderInput) -> Result<Vec<CloudPlan>> {
        let resolver = SentimentResolver::new(input.lexicon, self.classifier.clone());
        let mut plans = Vec::with_capacity(input.clouds.len());

        for CloudInput { cloud, words } in input.clouds {
            let frequencies = WordFrequencies::from_words(&words);
            let mut weighted = Vec::new();

            for (text, count) in frequencies.top(self.config.max_words) {
                let sentiment = resolver.resolve(text).await;
                weighted.push(WeightedWord {
                    text: text.clone(),
                    count: *count,
                    sentiment,
                });
            }

            let tally = |s: Sentiment| weighted.iter().filter(|w| w.sentiment == s).count();
            tracing::info!(
                "🎨 {}: {} distinct words, {} positive / {} neutral / {} negative",
                cloud.title,
                frequencies.len(),
                tally(Sentiment::Positive),
                tally(Sentiment::Neutral),
                tally(Sentiment::Negative)
            );

            plans.push(CloudPlan {
                cloud,
                words: weighted,
            });
        }

        if let Some(classifier) = &self.classifier {
            tracing::debug!("🤖 Classifier cache holds {} words", classifier.cached_words().await);
        }

        Ok(plans)
    }

    async fn load(&self, plans: Vec<CloudPlan>) -> Result<String> {
        if plans.is_empty() {
            return Ok("0 clouds".to_string());
        }

        tracing::debug!(
            "Using font {}",
            self.config.font_path.as_deref().unwrap_or("DejaVu Sans (bundled)")
        );
        let renderer = CloudRenderer::new(load_font(self.config.font_path.as_deref())?, self.config.clone());

        for plan in &plans {
            let image = renderer.render(&plan.words, &plan.cloud.title)?;
            let png = encode_png(&image)?;
            self.storage.write_file(&plan.cloud.output, &png).await?;
            tracing::info!(
                "💾 Saved {} ({}x{})",
                plan.cloud.output,
                image.width(),
                image.height()
            );
        }

        Ok(format!("{} clouds", plans.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lexicon::LexiconSource;
    use crate::domain::model::CompletionRequest;
    use crate::domain::ports::CompletionClient;
    use async_trait::async_trait;
    use httpmock::prelude::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    const LEXICON: &str = "amazing\tpositive\t1\namazing\tjoy\t1\n\
cruel\tnegative\t1\n\
calm\tpositive\t1\ncalm\tnegative\t1\n";

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn with_files(files: &[(&str, &str)]) -> Self {
            Self {
                files: Arc::new(Mutex::new(
                    files
                        .iter()
                        .map(|(p, c)| (p.to_string(), c.as_bytes().to_vec()))
                        .collect(),
                )),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                ProbeError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        async fn exists(&self, path: &str) -> bool {
            self.files.lock().await.contains_key(path)
        }
    }

    struct PositiveClient {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionClient for PositiveClient {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("Positive".to_string())
        }
    }

    fn config() -> RenderConfig {
        RenderConfig {
            width: 200,
            height: 100,
            scale: 1,
            clouds: vec![CloudConfig {
                input: "gender/male.json".to_string(),
                title: "Male Word Cloud".to_string(),
                output: "gender/male_wordcloud.png".to_string(),
            }],
            ..RenderConfig::default()
        }
    }

    fn storage() -> MockStorage {
        MockStorage::with_files(&[(
            "gender/male.json",
            r#"["Amazing", "stoic", "AMAZING", "cruel", "calm", "stoic", "Amazing"]"#,
        )])
    }

    fn lexicon_file(dir: &tempfile::TempDir) -> LexiconLoader {
        let path = dir.path().join("nrc.txt");
        std::fs::write(&path, LEXICON).unwrap();
        LexiconLoader::new(LexiconSource::File(path.to_str().unwrap().to_string()))
    }

    #[tokio::test]
    async fn test_transform_colors_words_from_lexicon() {
        let dir = tempfile::TempDir::new().unwrap();
        let pipeline = RenderPipeline::new(storage(), lexicon_file(&dir), FetchErrorPolicy::Neutral, config());

        let input = pipeline.extract().await.unwrap();
        let plans = pipeline.transform(input).await.unwrap();
        assert_eq!(plans.len(), 1);

        let words: Vec<(&str, usize, Sentiment)> = plans[0]
            .words
            .iter()
            .map(|w| (w.text.as_str(), w.count, w.sentiment))
            .collect();

        // 計數區分大小寫，上色不區分
        assert_eq!(
            words,
            vec![
                ("Amazing", 2, Sentiment::Positive),
                ("stoic", 2, Sentiment::Neutral),
                ("AMAZING", 1, Sentiment::Positive),
                ("cruel", 1, Sentiment::Negative),
                ("calm", 1, Sentiment::Neutral),
            ]
        );
    }

    #[tokio::test]
    async fn test_max_words_limits_plan() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = RenderConfig {
            max_words: 2,
            ..config()
        };
        let pipeline = RenderPipeline::new(storage(), lexicon_file(&dir), FetchErrorPolicy::Neutral, config);

        let input = pipeline.extract().await.unwrap();
        let plans = pipeline.transform(input).await.unwrap();
        assert_eq!(plans[0].words.len(), 2);
    }

    #[tokio::test]
    async fn test_lexicon_failure_policies() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/nrc.txt");
            then.status(500);
        });

        let neutral = RenderPipeline::new(
            storage(),
            LexiconLoader::new(LexiconSource::Url(server.url("/nrc.txt"))),
            FetchErrorPolicy::Neutral,
            config(),
        );
        let input = neutral.extract().await.unwrap();
        assert!(input.lexicon.is_empty());
        let plans = neutral.transform(input).await.unwrap();
        assert!(plans[0].words.iter().all(|w| w.sentiment == Sentiment::Neutral));

        let abort = RenderPipeline::new(
            storage(),
            LexiconLoader::new(LexiconSource::Url(server.url("/nrc.txt"))),
            FetchErrorPolicy::Abort,
            config(),
        );
        let err = abort.extract().await.err().unwrap();
        assert!(matches!(err, ProbeError::LexiconUnavailable { status: 500 }));
    }

    #[tokio::test]
    async fn test_ai_fallback_only_for_unresolved_words() {
        let dir = tempfile::TempDir::new().unwrap();
        let client = Arc::new(PositiveClient {
            calls: AtomicUsize::new(0),
        });
        let classifier = Arc::new(SentimentClassifier::new(client.clone(), 0.0));
        let pipeline = RenderPipeline::new(storage(), lexicon_file(&dir), FetchErrorPolicy::Neutral, config())
            .with_classifier(classifier);

        let input = pipeline.extract().await.unwrap();
        let plans = pipeline.transform(input).await.unwrap();

        let stoic = plans[0].words.iter().find(|w| w.text == "stoic").unwrap();
        let calm = plans[0].words.iter().find(|w| w.text == "calm").unwrap();
        assert_eq!(stoic.sentiment, Sentiment::Positive);
        assert_eq!(calm.sentiment, Sentiment::Positive);
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_array_input_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = MockStorage::with_files(&[("gender/male.json", r#"{"a": "b"}"#)]);
        let pipeline = RenderPipeline::new(storage, lexicon_file(&dir), FetchErrorPolicy::Neutral, config());

        let err = pipeline.extract().await.err().unwrap();
        assert!(matches!(err, ProbeError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn test_load_writes_png() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = storage();
        let pipeline = RenderPipeline::new(storage.clone(), lexicon_file(&dir), FetchErrorPolicy::Neutral, config());

        let input = pipeline.extract().await.unwrap();
        let plans = pipeline.transform(input).await.unwrap();
        assert_eq!(pipeline.load(plans).await.unwrap(), "1 clouds");

        let png = storage.get_file("gender/male_wordcloud.png").await.unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
