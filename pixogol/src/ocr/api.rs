use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::OcrConfig;
use crate::error::{PixogolError, Result};

const EXTRACTION_INSTRUCTION: &str = "Extract all text from this image. Return only the extracted text without any explanations or formatting. If the image contains no text, return an empty response.";

/// Hosted vision models that can stand in for a local OCR engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisionProvider {
    OpenAi,
    Mistral,
}

impl VisionProvider {
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix.to_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "mistral" => Some(Self::Mistral),
            _ => None,
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Mistral => "https://api.mistral.ai/v1",
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o",
            Self::Mistral => "pixtral-12b-2409",
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai-vision",
            Self::Mistral => "mistral-vision",
        }
    }
}

#[derive(Clone, Debug)]
pub struct VisionOcrClient {
    client: Client,
    provider: VisionProvider,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

impl VisionOcrClient {
    /// `model` is the part after the provider prefix, e.g. `gpt-4o-mini` for
    /// `OCR_MODEL=openai/gpt-4o-mini`. Empty picks the provider default.
    pub fn new(provider: VisionProvider, model: &str, config: &OcrConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            PixogolError::Configuration(format!(
                "API key required for {} OCR (set OCR_API_KEY)",
                provider.backend_name()
            ))
        })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| provider.default_base_url().to_string());

        let model = if model.trim().is_empty() {
            provider.default_model().to_string()
        } else {
            model.to_string()
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PixogolError::Ocr(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            provider,
            api_key,
            base_url,
            model,
        })
    }

    pub fn backend_name(&self) -> &'static str {
        self.provider.backend_name()
    }

    /// Send PNG bytes to the vision model and return its raw text reply.
    pub async fn ocr(&self, png_bytes: &[u8]) -> Result<String> {
        let data_url = format!("data:image/png;base64,{}", STANDARD.encode(png_bytes));

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: EXTRACTION_INSTRUCTION.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                ],
            }],
            max_tokens: 4096,
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| PixogolError::Ocr(format!("OCR API request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PixogolError::Ocr(format!(
                "OCR API request failed: {status} - {body}"
            )));
        }

        let chat_response: ChatResponse = resp
            .json()
            .await
            .map_err(|e| PixogolError::Ocr(format!("Failed to parse OCR API response: {e}")))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| PixogolError::Ocr("OCR API returned no choices".to_string()))
    }
}
