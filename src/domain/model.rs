use crate::utils::error::{ProbeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub const VALUE_PLACEHOLDER: &str = "{value}";

/// 類別 → 值清單，保持檔案中的順序
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryMap {
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    pub values: Vec<String>,
}

impl CategoryMap {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn total_values(&self) -> usize {
        self.categories.iter().map(|c| c.values.len()).sum()
    }

    /// (category, value) pairs in file order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.categories.iter().flat_map(|category| {
            category
                .values
                .iter()
                .map(move |value| (category.name.as_str(), value.as_str()))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub system: PromptMessage,
    pub user: PromptMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub content: String,
}

impl PromptTemplate {
    /// System text is sent as written; the user text is filled with `value`.
    pub fn messages_for(&self, value: &str) -> Result<Vec<ChatMessage>> {
        let (user, _) = fill_value(&self.user.content, value)?;
        Ok(vec![
            ChatMessage::system(self.system.content.clone()),
            ChatMessage::user(user),
        ])
    }

    /// How many `{value}` fields the user text has.
    pub fn value_slots(&self) -> Result<usize> {
        fill_value(&self.user.content, "").map(|(_, slots)| slots)
    }
}

/// Format-string filling with a single `{value}` field: `{{` and `}}` are
/// literal braces, any other `{name}` or a lone brace is an error.
fn fill_value(template: &str, value: &str) -> Result<(String, usize)> {
    let invalid = |message: String| ProbeError::ConfigValidationError {
        field: "user.content".to_string(),
        message,
    };

    let mut filled = String::with_capacity(template.len() + value.len());
    let mut slots = 0;
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                filled.push('{');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') | None => {
                            return Err(invalid("unclosed '{' in template".to_string()))
                        }
                        Some(ch) => name.push(ch),
                    }
                }
                if name != "value" {
                    return Err(invalid(format!(
                        "unknown placeholder {{{}}}; only {} is filled, write {{{{ and }}}} for literal braces",
                        name, VALUE_PLACEHOLDER
                    )));
                }
                filled.push_str(value);
                slots += 1;
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                filled.push('}');
            }
            '}' => return Err(invalid("single '}' in template; write }} for a literal brace".to_string())),
            _ => filled.push(c),
        }
    }

    Ok((filled, slots))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Json,
    Text,
}

impl ResponseFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ResponseFormat::Json => "json",
            ResponseFormat::Text => "txt",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub response_format: ResponseFormat,
}

/// One model answer, either parsed JSON or raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionResult {
    Json(serde_json::Value),
    Text(String),
}

impl CompletionResult {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            CompletionResult::Json(value) => Ok(serde_json::to_string_pretty(value)?.into_bytes()),
            CompletionResult::Text(text) => Ok(text.clone().into_bytes()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative];

    pub fn rgb(&self) -> [u8; 3] {
        match self {
            Sentiment::Positive => [0x2E, 0xCC, 0x71],
            Sentiment::Neutral => [0xFF, 0xD7, 0x00],
            Sentiment::Negative => [0xE7, 0x4C, 0x3C],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Neutral => "Neutral",
            Sentiment::Negative => "Negative",
        }
    }
}

/// Lowercase word → emotion tags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lexicon {
    entries: HashMap<String, HashSet<String>>,
}

impl Lexicon {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 第一次見到單字就建立空集合，flag 為 "1" 時才加入情緒
    pub fn insert(&mut self, word: &str, emotion: &str, flagged: bool) {
        let tags = self.entries.entry(word.to_lowercase()).or_default();
        if flagged {
            tags.insert(emotion.to_string());
        }
    }

    pub fn emotions(&self, word: &str) -> Option<&HashSet<String>> {
        self.entries.get(&word.to_lowercase())
    }

    /// Positive-only or negative-only words resolve; absent, untagged and
    /// ambiguous words return `None`.
    pub fn sentiment_of(&self, word: &str) -> Option<Sentiment> {
        let tags = self.emotions(word)?;
        let positive = tags.contains("positive");
        let negative = tags.contains("negative");
        match (positive, negative) {
            (true, false) => Some(Sentiment::Positive),
            (false, true) => Some(Sentiment::Negative),
            _ => None,
        }
    }

    pub fn color_of(&self, word: &str) -> Sentiment {
        self.sentiment_of(word).unwrap_or(Sentiment::Neutral)
    }
}

/// Word counts ordered by count, ties kept in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WordFrequencies {
    pub entries: Vec<(String, usize)>,
}

impl WordFrequencies {
    pub fn from_words(words: &[String]) -> Self {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut entries: Vec<(String, usize)> = Vec::new();

        for word in words {
            match index.get(word.as_str()) {
                Some(&position) => entries[position].1 += 1,
                None => {
                    index.insert(word.as_str(), entries.len());
                    entries.push((word.clone(), 1));
                }
            }
        }

        // sort_by 是穩定排序，同次數保留出現順序
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        Self { entries }
    }

    pub fn top(&self, n: usize) -> &[(String, usize)] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightedWord {
    pub text: String,
    pub count: usize,
    pub sentiment: Sentiment,
}
