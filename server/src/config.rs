use anyhow::Result;
use docqa_core::content::ContentBackend;
use docqa_core::vectorizer::DEFAULT_MAX_FEATURES;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "google/flan-t5-base";
const HF_INFERENCE_URL: &str = "https://api-inference.huggingface.co/models";

/// Runtime settings read from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub admin_token: Option<String>,
    /// Comma-separated origins; `None` allows any.
    pub cors_allow_origin: Option<String>,
    pub content_backend: ContentBackend,
    pub content_root: PathBuf,
    pub max_features: usize,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub use_fake: bool,
    pub model: String,
    pub endpoint: String,
    pub api_token: Option<String>,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            admin_token: None,
            cors_allow_origin: None,
            content_backend: ContentBackend::Database,
            content_root: PathBuf::from("./content"),
            max_features: DEFAULT_MAX_FEATURES,
            llm: LlmConfig {
                use_fake: true,
                model: DEFAULT_MODEL.to_string(),
                endpoint: format!("{HF_INFERENCE_URL}/{DEFAULT_MODEL}"),
                api_token: None,
                timeout: Duration::from_secs(60),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(get: F) -> Result<Self> {
        let model = get("HUGGINGFACE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let endpoint = get("HUGGINGFACE_ENDPOINT").unwrap_or_else(|| format!("{HF_INFERENCE_URL}/{model}"));
        let content_backend = match get("CONTENT_STORAGE_BACKEND") {
            Some(v) => v.parse()?,
            None => ContentBackend::Database,
        };
        let max_features = match get("MAX_FEATURES") {
            Some(v) => v.trim().parse()?,
            None => DEFAULT_MAX_FEATURES,
        };
        let timeout = match get("HUGGINGFACE_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(v.trim().parse()?),
            None => Duration::from_secs(60),
        };
        Ok(Self {
            admin_token: get("ADMIN_TOKEN").filter(|t| !t.is_empty()),
            cors_allow_origin: get("CORS_ALLOW_ORIGIN"),
            content_backend,
            content_root: get("CONTENT_ROOT").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("./content")),
            max_features,
            llm: LlmConfig {
                use_fake: get("USE_FAKE_LLM").is_some_and(|v| is_truthy(&v)),
                model,
                endpoint,
                api_token: get("HUGGINGFACE_API_TOKEN").filter(|t| !t.is_empty()),
                timeout,
            },
        })
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}
