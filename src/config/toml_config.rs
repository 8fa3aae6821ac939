use crate::domain::model::ResponseFormat;
use crate::utils::error::{ProbeError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "lexiprobe.toml";
pub const NRC_LEXICON_URL: &str = "https://raw.githubusercontent.com/beefoo/text-analysis/master/lexicons_external/NRC-Emotion-Lexicon-v0.92/NRC-emotion-lexicon-wordlevel-alphabetized-v0.92.txt";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub api: ApiConfig,
    pub inputs: InputConfig,
    pub ask: AskConfig,
    pub combine: CombineConfig,
    pub lexicon: LexiconConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub model: String,
    /// 直接給的金鑰優先，否則讀 api_key_env 指定的環境變數
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub timeout_seconds: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key: None,
            api_key_env: "OPENAI_API".to_string(),
            timeout_seconds: None,
        }
    }
}

impl ApiConfig {
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = &self.api_key {
            // 未被替換的 ${VAR} 視為沒有設定
            if !key.trim().is_empty() && !key.contains("${") {
                return Ok(key.clone());
            }
        }

        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ProbeError::MissingConfigError {
                field: self.api_key_env.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub categories_path: String,
    pub prompt_path: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            categories_path: "data/categories.json".to_string(),
            prompt_path: "data/base_prompts.yaml".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AskConfig {
    pub output_dir: String,
    pub response_format: ResponseFormat,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    /// 只處理第一個類別的第一個值
    pub dry_run: bool,
    pub skip_existing: bool,
    pub concurrent_requests: Option<usize>,
}

impl Default for AskConfig {
    fn default() -> Self {
        Self {
            output_dir: "outputs".to_string(),
            response_format: ResponseFormat::Json,
            temperature: 0.0,
            max_tokens: Some(300),
            top_p: Some(1.0),
            dry_run: false,
            skip_existing: false,
            concurrent_requests: None,
        }
    }
}

impl AskConfig {
    pub fn concurrent_requests(&self) -> usize {
        self.concurrent_requests.unwrap_or(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombineConfig {
    pub source_dirs: Vec<String>,
    pub output_dir: String,
    pub groups: Vec<GroupConfig>,
}

impl Default for CombineConfig {
    fn default() -> Self {
        let files = |names: &[&str]| -> Vec<String> {
            names.iter().map(|n| format!("{}.json", n)).collect()
        };

        Self {
            // ask 預設寫到 outputs/<category>/
            source_dirs: vec!["outputs/gender".to_string()],
            output_dir: "outputs/gender".to_string(),
            groups: vec![
                GroupConfig {
                    name: "male".to_string(),
                    files: files(&[
                        "boyfriends", "boys", "brothers", "daddies", "fathers", "gentlemen",
                        "grandfathers", "grooms", "husbands", "males", "men", "schoolboys",
                        "stepfathers",
                    ]),
                },
                GroupConfig {
                    name: "female".to_string(),
                    files: files(&[
                        "brides", "females", "girlfriends", "girls", "grandmothers", "ladies",
                        "mommies", "schoolgirls", "sisters", "stepmothers", "wives", "women",
                    ]),
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchErrorPolicy {
    /// Warn and continue with an empty lexicon.
    #[default]
    Neutral,
    Abort,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LexiconConfig {
    pub url: String,
    /// Local copy of the lexicon; takes precedence over `url`.
    pub path: Option<String>,
    pub on_fetch_error: FetchErrorPolicy,
    pub timeout_seconds: Option<u64>,
}

impl Default for LexiconConfig {
    fn default() -> Self {
        Self {
            url: NRC_LEXICON_URL.to_string(),
            path: None,
            on_fetch_error: FetchErrorPolicy::Neutral,
            timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudConfig {
    pub input: String,
    pub title: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub max_words: usize,
    pub prefer_horizontal: f64,
    /// Pixel multiplier; 3 matches a 300 DPI export of a 100 DPI canvas.
    pub scale: u32,
    pub font_path: Option<String>,
    pub ai_fallback: bool,
    pub classifier_temperature: f32,
    pub random_seed: u64,
    pub clouds: Vec<CloudConfig>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 400,
            max_words: 100,
            prefer_horizontal: 0.7,
            scale: 3,
            font_path: None,
            ai_fallback: false,
            classifier_temperature: 0.0,
            random_seed: 42,
            clouds: vec![
                CloudConfig {
                    input: "outputs/gender/female.json".to_string(),
                    title: "Female Word Cloud".to_string(),
                    output: "outputs/gender/female_wordcloud.png".to_string(),
                },
                CloudConfig {
                    input: "outputs/gender/male.json".to_string(),
                    title: "Male Word Cloud".to_string(),
                    output: "outputs/gender/male_wordcloud.png".to_string(),
                },
            ],
        }
    }
}

impl ProbeConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ProbeError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ProbeError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Explicit path must exist; otherwise `lexiprobe.toml` is used when
    /// present and built-in defaults when not.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE),
            None => {
                tracing::debug!("No {} found, using built-in defaults", DEFAULT_CONFIG_FILE);
                Ok(Self::default())
            }
        }
    }

    /// 替換環境變數 (例如 ${OPENAI_API})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ProbeError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("api.base_url", &self.api.base_url)?;
        validation::validate_non_empty_string("api.model", &self.api.model)?;
        validation::validate_non_empty_string("api.api_key_env", &self.api.api_key_env)?;

        validation::validate_path("inputs.categories_path", &self.inputs.categories_path)?;
        validation::validate_path("inputs.prompt_path", &self.inputs.prompt_path)?;

        validation::validate_path("ask.output_dir", &self.ask.output_dir)?;
        validation::validate_range("ask.temperature", self.ask.temperature, 0.0, 2.0)?;
        if let Some(top_p) = self.ask.top_p {
            validation::validate_range("ask.top_p", top_p, 0.0, 1.0)?;
        }
        if let Some(max_tokens) = self.ask.max_tokens {
            validation::validate_positive_number("ask.max_tokens", max_tokens as usize, 1)?;
        }
        validation::validate_positive_number(
            "ask.concurrent_requests",
            self.ask.concurrent_requests(),
            1,
        )?;

        validation::validate_path("combine.output_dir", &self.combine.output_dir)?;
        for dir in &self.combine.source_dirs {
            validation::validate_path("combine.source_dirs", dir)?;
        }
        for group in &self.combine.groups {
            validation::validate_path_component("combine.groups.name", &group.name)?;
            validation::validate_file_extensions("combine.groups.files", &group.files, &["json"])?;
        }

        match &self.lexicon.path {
            Some(path) => validation::validate_path("lexicon.path", path)?,
            None => validation::validate_url("lexicon.url", &self.lexicon.url)?,
        }

        validation::validate_positive_number("render.width", self.render.width as usize, 1)?;
        validation::validate_positive_number("render.height", self.render.height as usize, 1)?;
        validation::validate_positive_number("render.max_words", self.render.max_words, 1)?;
        validation::validate_range("render.scale", self.render.scale, 1, 8)?;
        validation::validate_range(
            "render.prefer_horizontal",
            self.render.prefer_horizontal,
            0.0,
            1.0,
        )?;
        for cloud in &self.render.clouds {
            validation::validate_path("render.clouds.input", &cloud.input)?;
            validation::validate_path("render.clouds.output", &cloud.output)?;
        }

        Ok(())
    }
}

impl Validate for ProbeConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_defaults() {
        let config = ProbeConfig::default();

        assert_eq!(config.api.model, "gpt-4o");
        assert_eq!(config.api.api_key_env, "OPENAI_API");
        assert_eq!(config.ask.max_tokens, Some(300));
        assert_eq!(config.ask.response_format, ResponseFormat::Json);
        assert_eq!(config.ask.concurrent_requests(), 1);
        assert_eq!(config.combine.source_dirs, vec!["outputs/gender"]);
        assert_eq!(config.combine.groups.len(), 2);
        assert_eq!(config.combine.groups[0].files.len(), 13);
        assert_eq!(config.combine.groups[1].files.len(), 12);
        assert_eq!(config.render.max_words, 100);
        assert_eq!(config.lexicon.url, NRC_LEXICON_URL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml_config() {
        let toml_content = r#"
[api]
model = "gpt-4o-mini"
timeout_seconds = 30

[ask]
response_format = "text"
dry_run = true
concurrent_requests = 4

[[combine.groups]]
name = "male"
files = ["boys.json"]

[[combine.groups]]
name = "female"
files = ["girls.json"]

[render]
ai_fallback = true
"#;

        let config = ProbeConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.api.model, "gpt-4o-mini");
        assert_eq!(config.api.base_url, "https://api.openai.com/v1");
        assert_eq!(config.ask.response_format, ResponseFormat::Text);
        assert!(config.ask.dry_run);
        assert_eq!(config.ask.concurrent_requests(), 4);
        assert_eq!(config.combine.groups[0].files, vec!["boys.json".to_string()]);
        assert!(config.render.ai_fallback);
        assert_eq!(config.render.width, 800);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("LEXIPROBE_TEST_BASE_URL", "http://localhost:9999/v1");

        let toml_content = r#"
[api]
base_url = "${LEXIPROBE_TEST_BASE_URL}"
api_key = "${LEXIPROBE_TEST_UNSET_KEY}"
"#;

        let config = ProbeConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:9999/v1");
        // 未設定的變數保留原樣
        assert_eq!(config.api.api_key.as_deref(), Some("${LEXIPROBE_TEST_UNSET_KEY}"));

        std::env::remove_var("LEXIPROBE_TEST_BASE_URL");
    }

    #[test]
    fn test_resolve_api_key() {
        let mut api = ApiConfig {
            api_key_env: "LEXIPROBE_TEST_KEY_ENV".to_string(),
            ..ApiConfig::default()
        };
        std::env::remove_var("LEXIPROBE_TEST_KEY_ENV");
        assert!(matches!(
            api.resolve_api_key(),
            Err(ProbeError::MissingConfigError { .. })
        ));

        std::env::set_var("LEXIPROBE_TEST_KEY_ENV", "sk-from-env");
        assert_eq!(api.resolve_api_key().unwrap(), "sk-from-env");

        api.api_key = Some("sk-inline".to_string());
        assert_eq!(api.resolve_api_key().unwrap(), "sk-inline");

        api.api_key = Some("${NOT_SUBSTITUTED}".to_string());
        assert_eq!(api.resolve_api_key().unwrap(), "sk-from-env");

        std::env::remove_var("LEXIPROBE_TEST_KEY_ENV");
    }

    #[test]
    fn test_config_validation() {
        let config = ProbeConfig::from_toml_str(
            r#"
[api]
base_url = "invalid-url"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = ProbeConfig::from_toml_str(
            r#"
[render]
prefer_horizontal = 1.5
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = ProbeConfig::from_toml_str(
            r#"
[[combine.groups]]
name = "male"
files = ["boys.txt"]
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_example_config_is_valid() {
        let config = ProbeConfig::from_toml_str(include_str!("../../lexiprobe.toml.example")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.combine.source_dirs, vec!["outputs/gender"]);
        assert_eq!(config.combine.groups.len(), 2);
        assert_eq!(config.render.clouds.len(), 2);
        assert_eq!(config.lexicon.on_fetch_error, FetchErrorPolicy::Neutral);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = ProbeConfig::from_toml_str("[ask\nbroken").unwrap_err();
        assert!(matches!(err, ProbeError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[ask]\noutput_dir = \"custom-out\"\n")
            .unwrap();

        let config = ProbeConfig::load(temp_file.path().to_str()).unwrap();
        assert_eq!(config.ask.output_dir, "custom-out");
    }
}
