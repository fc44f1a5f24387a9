use std::time::Duration;

use serde_json::Value;

use async_openai::{
    config::OpenAIConfig,
    error::{ApiError, OpenAIError},
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};

use crate::{
    config::{parse_llm_provider_model, LlmConfig},
    error::{PixogolError, Result},
    llm::provider::CompletionOptions,
};

/// Whether the provider behind `model` refuses requests without a key.
pub(crate) fn provider_needs_api_key(model: &str) -> bool {
    let (provider, _) = parse_llm_provider_model(model);
    !matches!(
        provider.to_lowercase().as_str(),
        "ollama" | "local" | "lmstudio"
    )
}

fn provider_base_url(provider: &str) -> &'static str {
    match provider.to_lowercase().as_str() {
        "openrouter" => "https://openrouter.ai/api/v1",
        "ollama" => "http://localhost:11434/v1",
        "lmstudio" => "http://localhost:1234/v1",
        _ => "https://api.openai.com/v1",
    }
}

/// One JSON-mode chat completion per call against an OpenAI-compatible API.
///
/// Every call sends exactly one HTTP request. Failures come back to the
/// caller as they are.
#[derive(Clone)]
pub struct LlmApiClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl LlmApiClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let (provider, model) = parse_llm_provider_model(&config.model);

        if provider_needs_api_key(&config.model) && config.api_key.is_none() {
            return Err(PixogolError::Configuration(
                "LLM API key is not set (set OPENAI_API_KEY or LLM_API_KEY)".to_string(),
            ));
        }

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| provider_base_url(provider).to_string());

        // Bare model names for a local server are sent as typed.
        let model = if provider.eq_ignore_ascii_case("local") {
            config.model.clone()
        } else {
            model.to_string()
        };

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PixogolError::Llm(format!("Failed to create LLM HTTP client: {e}")))?;

        // A zero budget turns off async-openai's own retry of 5xx and 429.
        let no_retry = backoff::ExponentialBackoff {
            max_elapsed_time: Some(Duration::ZERO),
            ..Default::default()
        };

        let client = Client::with_config(
            OpenAIConfig::new()
                .with_api_base(base_url)
                .with_api_key(config.api_key.clone().unwrap_or_default()),
        )
        .with_http_client(http_client)
        .with_backoff(no_retry);

        Ok(Self { client, model })
    }

    /// Ask for a JSON object reply and parse it.
    ///
    /// `response_format: json_object` is set, so the prompt must mention
    /// JSON for OpenAI to accept the request.
    pub async fn complete_json(
        &self,
        system_prompt: &str,
        prompt: &str,
        options: Option<&CompletionOptions>,
    ) -> Result<Value> {
        if prompt.trim().is_empty() {
            return Err(PixogolError::Validation("Prompt cannot be empty".to_string()));
        }

        let request = self.json_request(system_prompt, prompt, options)?;
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(classify_error)?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| PixogolError::Llm("LLM reply was empty".to_string()))?;

        tracing::debug!(reply_len = content.len(), "LLM reply received");

        serde_json::from_str(&content).map_err(|e| {
            let preview: String = content.chars().take(100).collect();
            tracing::error!(%preview, error = %e, "LLM reply is not JSON");
            PixogolError::Llm(format!("Failed to parse JSON reply: {e}"))
        })
    }

    fn json_request(
        &self,
        system_prompt: &str,
        prompt: &str,
        options: Option<&CompletionOptions>,
    ) -> Result<CreateChatCompletionRequest> {
        let invalid = |e: OpenAIError| PixogolError::Validation(format!("Invalid LLM request: {e}"));

        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(2);
        if !system_prompt.trim().is_empty() {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system_prompt)
                    .build()
                    .map_err(invalid)?
                    .into(),
            );
        }
        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(invalid)?
                .into(),
        );

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model.as_str())
            .messages(messages)
            .response_format(ResponseFormat::JsonObject);

        if let Some(options) = options {
            if let Some(temperature) = options.temperature {
                args.temperature(temperature);
            }
            if let Some(max_tokens) = options.max_tokens {
                args.max_tokens(max_tokens);
            }
        }

        args.build().map_err(invalid)
    }
}

/// Map a failed call to the error the rest of the crate reports.
fn classify_error(error: OpenAIError) -> PixogolError {
    match error {
        OpenAIError::ApiError(api_error) if is_rate_limited(&api_error) => {
            PixogolError::LlmRateLimit { retry_after: None }
        }
        OpenAIError::ApiError(api_error) if is_rejected_key(&api_error) => {
            PixogolError::Llm(format!("LLM authentication failed: {}", api_error.message))
        }
        OpenAIError::ApiError(api_error) => {
            PixogolError::Llm(format!("LLM API error: {}", api_error.message))
        }
        OpenAIError::Reqwest(e) if e.is_timeout() => {
            PixogolError::Llm(format!("LLM request timed out: {e}"))
        }
        OpenAIError::Reqwest(e) => PixogolError::Llm(format!("LLM request failed: {e}")),
        OpenAIError::JSONDeserialize(e) => {
            PixogolError::Llm(format!("Unreadable LLM response: {e}"))
        }
        other => PixogolError::Llm(other.to_string()),
    }
}

fn api_error_tags(api_error: &ApiError) -> (String, String, String) {
    (
        api_error.code.as_deref().unwrap_or_default().to_lowercase(),
        api_error.r#type.as_deref().unwrap_or_default().to_lowercase(),
        api_error.message.to_lowercase(),
    )
}

fn is_rate_limited(api_error: &ApiError) -> bool {
    let (code, kind, message) = api_error_tags(api_error);
    code == "insufficient_quota"
        || code.contains("rate_limit")
        || kind.contains("rate_limit")
        || message.contains("rate limit")
        || message.contains("too many requests")
}

fn is_rejected_key(api_error: &ApiError) -> bool {
    let (code, kind, message) = api_error_tags(api_error);
    code == "invalid_api_key"
        || kind.contains("authentication")
        || message.contains("api key")
        || message.contains("unauthorized")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn test_llm_config(model: &str, api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            model: model.to_string(),
            api_key: api_key.map(String::from),
            ..LlmConfig::default()
        }
    }

    fn api_error(message: &str, kind: Option<&str>, code: Option<&str>) -> ApiError {
        ApiError {
            message: message.to_string(),
            r#type: kind.map(String::from),
            param: None,
            code: code.map(String::from),
        }
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let result = LlmApiClient::new(&test_llm_config("openai/gpt-4o", None));
        let err = result.err().expect("client should not be created");
        assert!(matches!(err, PixogolError::Configuration(_)));
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_local_providers_need_no_key() {
        assert!(LlmApiClient::new(&test_llm_config("ollama/llama3", None)).is_ok());
        assert!(LlmApiClient::new(&test_llm_config("lmstudio/qwen", None)).is_ok());
        assert!(!provider_needs_api_key("ollama/llama3"));
        assert!(provider_needs_api_key("openrouter/openai/gpt-4o"));
    }

    #[test]
    fn test_provider_base_urls() {
        assert_eq!(provider_base_url("openrouter"), "https://openrouter.ai/api/v1");
        assert_eq!(provider_base_url("LMStudio"), "http://localhost:1234/v1");
        assert_eq!(provider_base_url("openai"), "https://api.openai.com/v1");
    }

    #[test]
    fn test_request_uses_stripped_model_and_json_format() {
        let client = LlmApiClient::new(&test_llm_config("openrouter/openai/gpt-4o", Some("k")))
            .expect("client should be created");

        let options = CompletionOptions {
            temperature: Some(0.3),
            max_tokens: Some(2000),
        };
        let request = client
            .json_request("You are an expert", "Return JSON", Some(&options))
            .expect("request should build");

        assert_eq!(request.model, "openai/gpt-4o");
        assert!(matches!(
            request.response_format,
            Some(ResponseFormat::JsonObject)
        ));
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.temperature, Some(0.3));
    }

    #[test]
    fn test_local_model_name_is_kept_whole() {
        let client = LlmApiClient::new(&test_llm_config("my-gguf-model", None))
            .expect("client should be created");
        let request = client
            .json_request("   ", "Return JSON", None)
            .expect("request should build");
        assert_eq!(request.model, "my-gguf-model");
        assert_eq!(request.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_prompt_is_rejected_without_request() {
        let client = LlmApiClient::new(&test_llm_config("ollama/llama3", None))
            .expect("client should be created");
        let err = client.complete_json("system", "  ", None).await.unwrap_err();
        assert!(matches!(err, PixogolError::Validation(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_sent_once() {
        let server = MockServer::start().await;
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_for_mock = Arc::clone(&attempts);

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(move |_request: &Request| {
                attempts_for_mock.fetch_add(1, Ordering::SeqCst);
                ResponseTemplate::new(500).set_body_string("upstream failure")
            })
            .expect(1)
            .mount(&server)
            .await;

        let config = LlmConfig {
            base_url: Some(server.uri()),
            timeout_secs: 5,
            ..test_llm_config("openai/gpt-4o", Some("sk-test"))
        };
        let client = LlmApiClient::new(&config).expect("client should be created");

        let err = client
            .complete_json("Reply in JSON.", "Risk check", None)
            .await
            .unwrap_err();

        assert!(matches!(err, PixogolError::Llm(_)), "{err:?}");
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_plain_rate_limit_is_sent_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {
                    "message": "Rate limit reached for gpt-4o",
                    "type": "requests",
                    "param": null,
                    "code": "rate_limit_exceeded"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = LlmConfig {
            base_url: Some(server.uri()),
            timeout_secs: 5,
            ..test_llm_config("openai/gpt-4o", Some("sk-test"))
        };
        let client = LlmApiClient::new(&config).expect("client should be created");

        let err = client
            .complete_json("Reply in JSON.", "Risk check", None)
            .await
            .unwrap_err();

        assert!(matches!(err, PixogolError::LlmRateLimit { .. }), "{err:?}");
    }

    #[test]
    fn test_rate_limit_classification() {
        let err = classify_error(OpenAIError::ApiError(api_error(
            "Rate limit reached for gpt-4o",
            Some("requests"),
            Some("rate_limit_exceeded"),
        )));
        assert!(matches!(err, PixogolError::LlmRateLimit { retry_after: None }));
    }

    #[test]
    fn test_rejected_key_classification() {
        let err = classify_error(OpenAIError::ApiError(api_error(
            "Incorrect API key provided: sk-xxx",
            Some("invalid_request_error"),
            Some("invalid_api_key"),
        )));
        assert!(matches!(err, PixogolError::Llm(ref m) if m.starts_with("LLM authentication failed")));
    }

    #[test]
    fn test_other_api_errors_keep_message() {
        let err = classify_error(OpenAIError::ApiError(api_error(
            "The model `gpt-9` does not exist",
            Some("invalid_request_error"),
            Some("model_not_found"),
        )));
        assert!(matches!(err, PixogolError::Llm(ref m) if m.contains("gpt-9")));
    }
}
