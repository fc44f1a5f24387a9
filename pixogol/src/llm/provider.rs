use serde_json::Value;

use crate::config::{parse_llm_provider_model, LlmConfig};
use crate::error::{PixogolError, Result};
use crate::llm::api::LlmApiClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmBackend {
    OpenAI,
    OpenRouter,
    Ollama,
    LmStudio,
    OpenAICompatible { base_url: String },
    Unavailable { reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionOptions {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            temperature: Some(config.temperature),
            max_tokens: Some(config.max_tokens),
        }
    }
}

#[derive(Clone)]
pub struct LlmProvider {
    backend: LlmBackend,
    client: Option<LlmApiClient>,
}

impl LlmProvider {
    /// Resolve the backend and build its client.
    ///
    /// Never fails: an unknown provider or a missing API key leaves the
    /// provider `Unavailable` with the reason, and every call then reports
    /// that reason without touching the network.
    pub fn new(config: &LlmConfig) -> Self {
        let (provider, _model) = parse_llm_provider_model(&config.model);

        let backend = match provider.to_lowercase().as_str() {
            "openai" => LlmBackend::OpenAI,
            "openrouter" => LlmBackend::OpenRouter,
            "ollama" => LlmBackend::Ollama,
            "lmstudio" => LlmBackend::LmStudio,
            _ => match &config.base_url {
                Some(base_url) => LlmBackend::OpenAICompatible {
                    base_url: base_url.clone(),
                },
                None => {
                    return Self::unavailable(&format!(
                        "Unknown provider in model: {}",
                        config.model
                    ))
                }
            },
        };

        match LlmApiClient::new(config) {
            Ok(client) => {
                tracing::info!(model = %config.model, "LLM backend initialized");
                Self {
                    backend,
                    client: Some(client),
                }
            }
            Err(e) => {
                let reason = match e {
                    PixogolError::Configuration(message) => message,
                    other => other.to_string(),
                };
                tracing::warn!(model = %config.model, "LLM backend unavailable: {}", reason);
                Self::unavailable(&reason)
            }
        }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            backend: LlmBackend::Unavailable {
                reason: reason.to_string(),
            },
            client: None,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, LlmBackend::Unavailable { .. })
    }

    pub fn backend(&self) -> &LlmBackend {
        &self.backend
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.backend {
            LlmBackend::Unavailable { reason } => Some(reason),
            _ => None,
        }
    }

    pub async fn complete_json(
        &self,
        system_prompt: &str,
        prompt: &str,
        options: Option<&CompletionOptions>,
    ) -> Result<Value> {
        let client = self.client.as_ref().ok_or_else(|| {
            PixogolError::LlmUnavailable(
                self.unavailable_reason()
                    .unwrap_or("No LLM client available")
                    .to_string(),
            )
        })?;

        client.complete_json(system_prompt, prompt, options).await
    }
}
