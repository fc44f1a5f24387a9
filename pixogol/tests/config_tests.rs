use std::env;
use std::path::PathBuf;

use axum::{http::StatusCode, response::IntoResponse};
use serial_test::serial;

use pixogol::api::v1::response::ApiResponse;
use pixogol::config::{parse_llm_provider_model, Config, KNOWN_LLM_PROVIDERS};
use pixogol::error::PixogolError;

const PIXOGOL_ENV: &[&str] = &[
    "PIXOGOL_HOST",
    "PIXOGOL_PORT",
    "PIXOGOL_API_KEYS",
    "PIXOGOL_MAX_UPLOAD_BYTES",
    "OCR_MODEL",
    "OCR_API_KEY",
    "OCR_BASE_URL",
    "LLM_MODEL",
    "LLM_API_KEY",
    "OPENAI_API_KEY",
    "LLM_BASE_URL",
    "LLM_TIMEOUT",
    "LLM_TEMPERATURE",
    "AUDIT_LOG_DIR",
    "AUDIT_WRITE_SNAPSHOTS",
];

fn clear_env() {
    for var in PIXOGOL_ENV {
        env::remove_var(var);
    }
}

#[test]
fn test_llm_config_openrouter() {
    let (provider, model) = parse_llm_provider_model("openrouter/anthropic/claude-3.5-sonnet");
    assert_eq!(provider, "openrouter");
    assert_eq!(model, "anthropic/claude-3.5-sonnet");
}

#[test]
fn test_llm_config_unknown_prefix_defaults_to_local() {
    let (provider, model) = parse_llm_provider_model("unknown/model-name");
    assert_eq!(provider, "local");
    assert_eq!(model, "unknown/model-name");
}

#[test]
fn test_known_llm_providers_constant() {
    assert!(KNOWN_LLM_PROVIDERS.contains(&"openai"));
    assert!(KNOWN_LLM_PROVIDERS.contains(&"lmstudio"));
    assert_eq!(KNOWN_LLM_PROVIDERS.len(), 4);
}

#[test]
#[serial]
fn test_defaults_without_env() {
    clear_env();

    let config = Config::from_env();

    assert_eq!(config.server.port, 8501);
    assert!(config.server.api_keys.is_empty());
    assert_eq!(config.ocr.model, "local/tesseract");
    assert_eq!(config.llm.model, "openai/gpt-4o");
    assert!(config.llm.api_key.is_none());
    assert_eq!(config.audit.log_dir, PathBuf::from("logs"));
    assert!(config.audit.write_snapshots);
}

#[test]
#[serial]
fn test_openai_api_key_is_picked_up() {
    clear_env();
    env::set_var("OPENAI_API_KEY", "  sk-from-env  ");

    let config = Config::from_env();
    assert_eq!(config.llm.api_key.as_deref(), Some("sk-from-env"));

    env::set_var("LLM_API_KEY", "sk-preferred");
    let config = Config::from_env();
    assert_eq!(config.llm.api_key.as_deref(), Some("sk-preferred"));

    clear_env();
}

#[test]
#[serial]
fn test_api_keys_and_audit_dir_from_env() {
    clear_env();
    env::set_var("PIXOGOL_API_KEYS", "alpha, beta,,");
    env::set_var("AUDIT_LOG_DIR", "/var/log/pixogol");
    env::set_var("LLM_TEMPERATURE", "warm");

    let config = Config::from_env();

    assert_eq!(config.server.api_keys, vec!["alpha", "beta"]);
    assert_eq!(config.audit.log_dir, PathBuf::from("/var/log/pixogol"));
    // Unparseable values fall back to the default.
    assert_eq!(config.llm.temperature, 0.3);

    clear_env();
}

#[test]
fn test_configuration_error_maps_to_service_unavailable() {
    let response: ApiResponse<()> =
        PixogolError::Configuration("LLM API key is not set".to_string()).into();
    assert_eq!(response.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);

    let response: ApiResponse<()> = PixogolError::LlmRateLimit { retry_after: None }.into();
    assert_eq!(response.into_response().status(), StatusCode::TOO_MANY_REQUESTS);
}
