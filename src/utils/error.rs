use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    ApiStatusError { status: u16, body: String },

    #[error("Completion response was empty: {message}")]
    EmptyCompletionError { message: String },

    #[error("Lexicon unavailable (HTTP {status})")]
    LexiconUnavailable { status: u16 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Render error: {message}")]
    RenderError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Data,
    Rendering,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ProbeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProbeError::ApiError(_)
            | ProbeError::ApiStatusError { .. }
            | ProbeError::EmptyCompletionError { .. }
            | ProbeError::LexiconUnavailable { .. } => ErrorCategory::Network,
            ProbeError::ConfigError { .. }
            | ProbeError::ConfigValidationError { .. }
            | ProbeError::InvalidConfigValueError { .. }
            | ProbeError::MissingConfigError { .. }
            | ProbeError::YamlError(_) => ErrorCategory::Configuration,
            ProbeError::SerializationError(_)
            | ProbeError::ProcessingError { .. }
            | ProbeError::ValidationError { .. } => ErrorCategory::Data,
            ProbeError::ImageError(_) | ProbeError::RenderError { .. } => ErrorCategory::Rendering,
            ProbeError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 網路錯誤重跑通常就會好
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Data | ErrorCategory::Rendering => {
                ErrorSeverity::High
            }
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ProbeError::ApiError(_) => "Check network connectivity and the api.base_url setting, then re-run",
            ProbeError::ApiStatusError { status: 401, .. } => {
                "Check that the API key environment variable holds a valid key"
            }
            ProbeError::ApiStatusError { status: 429, .. } => {
                "Rate limited; wait a moment or lower ask.concurrent_requests"
            }
            ProbeError::ApiStatusError { .. } | ProbeError::EmptyCompletionError { .. } => {
                "Inspect the API response; try a larger ask.max_tokens or a different model"
            }
            ProbeError::LexiconUnavailable { .. } => {
                "Set lexicon.path to a local copy or lexicon.on_fetch_error = \"neutral\""
            }
            ProbeError::MissingConfigError { .. } => "Provide the missing value in lexiprobe.toml, the environment or .env",
            ProbeError::ConfigError { .. }
            | ProbeError::ConfigValidationError { .. }
            | ProbeError::InvalidConfigValueError { .. }
            | ProbeError::YamlError(_) => "Fix the configuration file and try again",
            ProbeError::SerializationError(_) | ProbeError::ValidationError { .. } => {
                "Combine reads JSON objects of word strings ({\"1\": \"brave\"}), render reads arrays of word strings; numbers and booleans are not converted"
            }
            ProbeError::ProcessingError { .. } => "Re-run with --verbose to see which item failed",
            ProbeError::ImageError(_) | ProbeError::RenderError { .. } => {
                "Check render.font_path and that the output directory is writable"
            }
            ProbeError::IoError(_) => "Check that the file exists and that you have permission to access it",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Network => format!("Request failed: {}", self),
            ErrorCategory::Data => format!("Input data problem: {}", self),
            ErrorCategory::Rendering => format!("Could not render word cloud: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProbeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let err = ProbeError::LexiconUnavailable { status: 500 };
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(err.severity(), ErrorSeverity::Medium);

        let err = ProbeError::MissingConfigError {
            field: "OPENAI_API".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::High);

        let err = ProbeError::IoError(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_user_friendly_message_mentions_cause() {
        let err = ProbeError::ApiStatusError {
            status: 401,
            body: "unauthorized".to_string(),
        };
        assert!(err.user_friendly_message().contains("401"));
        assert!(err.recovery_suggestion().contains("API key"));
    }
}
