//! NRC word-level emotion lexicon loading.
//!
//! The file is tab separated: `word<TAB>emotion<TAB>flag`, one emotion per
//! line, flag `1` when the word carries that emotion.

use crate::config::toml_config::LexiconConfig;
use crate::domain::model::Lexicon;
use crate::utils::error::{ProbeError, Result};
use reqwest::Client;
use std::time::Duration;

const SAMPLE_WORDS: [&str; 5] = ["amazing", "caring", "happy", "sad", "angry"];

#[derive(Debug, Clone, PartialEq)]
pub enum LexiconSource {
    Url(String),
    File(String),
}

pub struct LexiconLoader {
    client: Client,
    source: LexiconSource,
}

impl LexiconLoader {
    pub fn new(source: LexiconSource) -> Self {
        Self {
            client: Client::new(),
            source,
        }
    }

    pub fn from_config(config: &LexiconConfig) -> Result<Self> {
        let source = match &config.path {
            Some(path) => LexiconSource::File(path.clone()),
            None => LexiconSource::Url(config.url.clone()),
        };

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        Ok(Self {
            client: builder.build()?,
            source,
        })
    }

    pub async fn load(&self) -> Result<Lexicon> {
        let text = match &self.source {
            LexiconSource::File(path) => {
                tracing::info!("📖 Reading lexicon from {}", path);
                tokio::fs::read_to_string(path).await?
            }
            LexiconSource::Url(url) => {
                tracing::info!("📖 Downloading lexicon from {}", url);
                let response = self.client.get(url).send().await?;
                let status = response.status();
                tracing::debug!("Lexicon response status: {}", status);

                if !status.is_success() {
                    return Err(ProbeError::LexiconUnavailable {
                        status: status.as_u16(),
                    });
                }
                response.text().await?
            }
        };

        let lexicon = parse_lexicon(&text);
        tracing::info!("📖 Lexicon size: {} words", lexicon.len());
        for word in SAMPLE_WORDS {
            if let Some(emotions) = lexicon.emotions(word) {
                let mut tags: Vec<&str> = emotions.iter().map(String::as_str).collect();
                tags.sort_unstable();
                tracing::debug!("  {}: {:?}", word, tags);
            }
        }

        Ok(lexicon)
    }
}

/// Lines that do not split into exactly three fields are skipped.
pub fn parse_lexicon(text: &str) -> Lexicon {
    let mut lexicon = Lexicon::default();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if let [word, emotion, flag] = fields.as_slice() {
            lexicon.insert(word, emotion, *flag == "1");
        }
    }

    lexicon
}
