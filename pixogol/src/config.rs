use serde::Deserialize;
use std::env;
use std::path::PathBuf;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

/// First non-empty value among `vars`, in order.
fn env_first(vars: &[&str]) -> Option<String> {
    vars.iter()
        .filter_map(|var| env::var(var).ok())
        .map(|val| val.trim().to_string())
        .find(|val| !val.is_empty())
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub ocr: OcrConfig,
    pub llm: LlmConfig,
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Bearer tokens accepted on the analysis routes. Empty means no auth.
    pub api_keys: Vec<String>,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub languages: String,
    pub timeout_secs: u64,
    pub max_image_dimension: u32,
    pub min_image_dimension: u32,
}

/// LLM configuration for the risk assessment model
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    pub log_dir: PathBuf,
    /// Also write one pretty-printed JSON file per analysis.
    pub write_snapshots: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model: "local/tesseract".to_string(),
            api_key: None,
            base_url: None,
            languages: "eng".to_string(),
            timeout_secs: 60,
            max_image_dimension: 4096,
            min_image_dimension: 20,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "openai/gpt-4o".to_string(),
            api_key: None,
            base_url: None,
            timeout_secs: 60,
            temperature: 0.3,
            max_tokens: 2000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let ocr_defaults = OcrConfig::default();
        let llm_defaults = LlmConfig::default();

        Self {
            server: ServerConfig {
                host: env::var("PIXOGOL_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("PIXOGOL_PORT", 8501),
                api_keys: env::var("PIXOGOL_API_KEYS")
                    .map(|keys| {
                        keys.split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or_default(),
                max_upload_bytes: parse_env_or("PIXOGOL_MAX_UPLOAD_BYTES", 25 * 1024 * 1024),
            },
            ocr: OcrConfig {
                model: env::var("OCR_MODEL").unwrap_or(ocr_defaults.model),
                api_key: env_first(&["OCR_API_KEY"]),
                base_url: env_first(&["OCR_BASE_URL"]),
                languages: env::var("OCR_LANGUAGES").unwrap_or(ocr_defaults.languages),
                timeout_secs: parse_env_or("OCR_TIMEOUT", ocr_defaults.timeout_secs),
                max_image_dimension: parse_env_or(
                    "OCR_MAX_DIMENSION",
                    ocr_defaults.max_image_dimension,
                ),
                min_image_dimension: parse_env_or(
                    "OCR_MIN_DIMENSION",
                    ocr_defaults.min_image_dimension,
                ),
            },
            llm: LlmConfig {
                model: env::var("LLM_MODEL").unwrap_or(llm_defaults.model),
                api_key: env_first(&["LLM_API_KEY", "OPENAI_API_KEY"]),
                base_url: env_first(&["LLM_BASE_URL"]),
                timeout_secs: parse_env_or("LLM_TIMEOUT", llm_defaults.timeout_secs),
                temperature: parse_env_or("LLM_TEMPERATURE", llm_defaults.temperature),
                max_tokens: parse_env_or("LLM_MAX_TOKENS", llm_defaults.max_tokens),
            },
            audit: AuditConfig {
                log_dir: env::var("AUDIT_LOG_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("logs")),
                write_snapshots: parse_env_or("AUDIT_WRITE_SNAPSHOTS", true),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// Known LLM providers that use OpenAI-compatible APIs
pub const KNOWN_LLM_PROVIDERS: &[&str] = &["openai", "openrouter", "ollama", "lmstudio"];

/// Parse an LLM model name into (provider, model) tuple.
pub fn parse_llm_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_LLM_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    // Default to treating the whole string as a local model
    ("local", model)
}
