use crate::domain::model::{ChatMessage, CompletionRequest, Lexicon, ResponseFormat, Sentiment};
use crate::domain::ports::CompletionClient;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

const CLASSIFIER_SYSTEM_PROMPT: &str = "Classify the sentiment of a word as 'positive' or 'negative'. Answer with exactly one word: 'positive' or 'negative'.";

/// Asks the completion API for a word's polarity, memoizing answers per
/// lowercase word.
pub struct SentimentClassifier {
    client: Arc<dyn CompletionClient>,
    temperature: f32,
    cache: Mutex<HashMap<String, Sentiment>>,
}

impl SentimentClassifier {
    pub fn new(client: Arc<dyn CompletionClient>, temperature: f32) -> Self {
        Self {
            client,
            temperature,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn classify(&self, word: &str) -> Sentiment {
        let key = word.to_lowercase();
        if let Some(sentiment) = self.cache.lock().await.get(&key) {
            return *sentiment;
        }

        let request = CompletionRequest {
            messages: vec![
                ChatMessage::system(CLASSIFIER_SYSTEM_PROMPT),
                ChatMessage::user(format!("Classify the sentiment of this word: {}", key)),
            ],
            temperature: self.temperature,
            max_tokens: None,
            top_p: None,
            response_format: ResponseFormat::Text,
        };

        match self.client.complete(&request).await {
            Ok(answer) => {
                let sentiment = parse_answer(&answer);
                tracing::debug!("🤖 Classified '{}' as {:?} (answer: {:?})", key, sentiment, answer);
                self.cache.lock().await.insert(key, sentiment);
                sentiment
            }
            Err(e) => {
                // 失敗不快取，下次遇到同一個字會再問一次
                tracing::warn!("⚠️ Sentiment classification failed for '{}': {}", key, e);
                Sentiment::Neutral
            }
        }
    }

    pub async fn cached_words(&self) -> usize {
        self.cache.lock().await.len()
    }
}

fn parse_answer(answer: &str) -> Sentiment {
    match answer.trim().to_lowercase().as_str() {
        "positive" => Sentiment::Positive,
        "negative" => Sentiment::Negative,
        _ => Sentiment::Neutral,
    }
}

/// Lexicon first, then the optional classifier, else neutral.
pub struct SentimentResolver {
    lexicon: Lexicon,
    classifier: Option<Arc<SentimentClassifier>>,
}

impl SentimentResolver {
    pub fn new(lexicon: Lexicon, classifier: Option<Arc<SentimentClassifier>>) -> Self {
        Self { lexicon, classifier }
    }

    pub async fn resolve(&self, word: &str) -> Sentiment {
        if let Some(sentiment) = self.lexicon.sentiment_of(word) {
            return sentiment;
        }

        match &self.classifier {
            Some(classifier) => classifier.classify(word).await,
            None => Sentiment::Neutral,
        }
    }
}
