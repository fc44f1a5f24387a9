use tracing::{debug, info};

use crate::config::LlmConfig;
use crate::error::{PixogolError, Result};
use crate::llm::prompts::{risk_assessment_prompt, risk_system_prompt};
use crate::llm::{CompletionOptions, LlmProvider};
use crate::models::RiskAssessment;

#[derive(Clone)]
pub struct RiskAnalyzer {
    llm: LlmProvider,
    options: CompletionOptions,
}

impl RiskAnalyzer {
    pub fn new(llm: LlmProvider, config: &LlmConfig) -> Self {
        Self {
            llm,
            options: CompletionOptions::from_config(config),
        }
    }

    /// Fails with `Configuration` when the model cannot be called at all.
    pub fn ensure_configured(&self) -> Result<()> {
        match self.llm.unavailable_reason() {
            Some(reason) => Err(PixogolError::Configuration(reason.to_string())),
            None => Ok(()),
        }
    }

    /// Assess `text` for copyright, trademark and brand risk.
    ///
    /// Empty text short-circuits to [`RiskAssessment::no_text_found`] without a
    /// model call. Model failures are returned as errors; there is no fallback
    /// assessment.
    pub async fn assess(&self, text: &str, filename: &str) -> Result<RiskAssessment> {
        self.ensure_configured()?;

        if text.trim().is_empty() {
            debug!(filename, "No text to assess, skipping model call");
            return Ok(RiskAssessment::no_text_found());
        }

        let prompt = risk_assessment_prompt(text, filename);
        let reply = self
            .llm
            .complete_json(risk_system_prompt(), &prompt, Some(&self.options))
            .await?;

        if !reply.is_object() {
            return Err(PixogolError::Llm(
                "Model reply was not a JSON object".to_string(),
            ));
        }

        let assessment = RiskAssessment::from_model_reply(&reply);
        info!(
            filename,
            overall = %assessment.overall_risk_level,
            confidence = assessment.confidence_score,
            "Risk assessment complete"
        );
        Ok(assessment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskLevel;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion_body(content: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }]
        })
    }

    fn analyzer_for(server: &MockServer) -> RiskAnalyzer {
        let config = LlmConfig {
            api_key: Some("sk-test".to_string()),
            base_url: Some(server.uri()),
            ..LlmConfig::default()
        };
        RiskAnalyzer::new(LlmProvider::new(&config), &config)
    }

    #[tokio::test]
    async fn test_missing_key_is_configuration_error() {
        let config = LlmConfig::default();
        let analyzer = RiskAnalyzer::new(LlmProvider::new(&config), &config);

        let err = analyzer.assess("Nike", "shoe.png").await.unwrap_err();
        assert!(matches!(err, PixogolError::Configuration(_)));
        assert!(analyzer.ensure_configured().is_err());
    }

    #[tokio::test]
    async fn test_empty_text_skips_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let assessment = analyzer_for(&server).assess("  ", "blank.png").await.unwrap();
        assert!(assessment.no_text_detected);
        assert_eq!(assessment.overall_risk_level, RiskLevel::Low);
    }

    #[tokio::test]
    async fn test_reply_is_normalised() {
        let server = MockServer::start().await;
        let reply = json!({
            "overall_risk_level": "HIGH",
            "confidence_score": 7,
            "risk_categories": {
                "trademark": {
                    "level": "CRITICAL",
                    "explanation": "Registered mark",
                    "identified_elements": ["Coca-Cola"],
                    "recommendations": ["Obtain a licence"]
                }
            }
        });
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "model": "gpt-4o",
                "response_format": { "type": "json_object" },
                "max_tokens": 2000
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(&reply.to_string())))
            .expect(1)
            .mount(&server)
            .await;

        let assessment = analyzer_for(&server)
            .assess("Coca-Cola", "can.jpg")
            .await
            .unwrap();

        assert_eq!(assessment.overall_risk_level, RiskLevel::High);
        assert_eq!(assessment.confidence_score, 0.5);
        assert_eq!(assessment.risk_categories.trademark.level, RiskLevel::Critical);
        assert_eq!(assessment.risk_categories.copyright.level, RiskLevel::Low);
        assert!(!assessment.no_text_detected);
    }

    #[tokio::test]
    async fn test_non_json_reply_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("not json")))
            .mount(&server)
            .await;

        let err = analyzer_for(&server).assess("Nike", "a.png").await.unwrap_err();
        assert!(matches!(err, PixogolError::Llm(_)));
    }

    #[tokio::test]
    async fn test_array_reply_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("[1, 2]")))
            .mount(&server)
            .await;

        let err = analyzer_for(&server).assess("Nike", "a.png").await.unwrap_err();
        assert!(err.to_string().contains("not a JSON object"));
    }
}
