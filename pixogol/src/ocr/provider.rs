use std::sync::Arc;
use std::time::Duration;

use leptess::{LepTess, Variable};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::OcrConfig;
use crate::error::{PixogolError, Result};
use crate::models::OcrOutput;

use super::api::{VisionOcrClient, VisionProvider};
use super::preprocessing::{normalize_image, preprocess_image};
use super::text::clean_extracted_text;

/// Characters Tesseract is allowed to emit. Keeps stray symbols out of
/// logos and stylised lettering.
const CHAR_WHITELIST: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789.,!?@#$%^&*()_+-=[]{}|;:'\"<>?/~` ";

/// Assume a single uniform block of text.
const PAGE_SEGMENTATION_MODE: &str = "6";

enum OcrBackend {
    Local { tesseract: Arc<Mutex<LepTess>> },
    Api { client: VisionOcrClient },
    Unavailable { reason: String },
}

pub struct OcrProvider {
    backend: OcrBackend,
    config: OcrConfig,
}

fn create_tesseract(languages: &str) -> std::result::Result<LepTess, String> {
    let mut lt = LepTess::new(None, languages).map_err(|e| e.to_string())?;
    lt.set_variable(Variable::TesseditPagesegMode, PAGE_SEGMENTATION_MODE)
        .map_err(|e| e.to_string())?;
    lt.set_variable(Variable::TesseditCharWhitelist, CHAR_WHITELIST)
        .map_err(|e| e.to_string())?;
    Ok(lt)
}

impl OcrProvider {
    /// Pick a backend from `config.model` (`local/tesseract`, `openai/<model>`,
    /// `mistral/<model>`). A backend that cannot start leaves the provider
    /// unavailable instead of failing construction.
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let (prefix, model) = config
            .model
            .split_once('/')
            .unwrap_or((config.model.as_str(), ""));

        let backend = match VisionProvider::from_prefix(prefix) {
            Some(provider) => match VisionOcrClient::new(provider, model, config) {
                Ok(client) => {
                    info!(backend = client.backend_name(), "Vision OCR backend initialized");
                    OcrBackend::Api { client }
                }
                Err(e) => {
                    let reason = format!("{} OCR backend unavailable: {e}", provider.backend_name());
                    warn!("{}", reason);
                    OcrBackend::Unavailable { reason }
                }
            },
            None => match create_tesseract(&config.languages) {
                Ok(lt) => {
                    info!(languages = %config.languages, "Tesseract OCR initialized");
                    OcrBackend::Local {
                        tesseract: Arc::new(Mutex::new(lt)),
                    }
                }
                Err(e) => {
                    let reason = format!("Tesseract not available: {e}");
                    warn!("{}", reason);
                    OcrBackend::Unavailable { reason }
                }
            },
        };

        Ok(Self {
            backend,
            config: config.clone(),
        })
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, OcrBackend::Unavailable { .. })
    }

    pub fn backend_name(&self) -> &'static str {
        match &self.backend {
            OcrBackend::Local { .. } => "tesseract",
            OcrBackend::Api { client } => client.backend_name(),
            OcrBackend::Unavailable { .. } => "unavailable",
        }
    }

    /// Why the backend could not start, if it could not.
    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.backend {
            OcrBackend::Unavailable { reason } => Some(reason),
            _ => None,
        }
    }

    /// Preprocess the raw upload for the active backend and recognise its text.
    ///
    /// Image decoding and filtering run on the blocking pool together with
    /// Tesseract. The whole call is bounded by `timeout_secs`.
    pub async fn extract_text(&self, image_bytes: &[u8]) -> Result<OcrOutput> {
        if let OcrBackend::Unavailable { reason } = &self.backend {
            return Err(PixogolError::OcrUnavailable(reason.clone()));
        }

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        tokio::time::timeout(timeout_duration, self.recognize(image_bytes.to_vec()))
            .await
            .map_err(|_| {
                PixogolError::Ocr(format!(
                    "OCR operation timed out after {} seconds",
                    self.config.timeout_secs
                ))
            })?
    }

    async fn recognize(&self, bytes: Vec<u8>) -> Result<OcrOutput> {
        let config = self.config.clone();

        match &self.backend {
            OcrBackend::Local { tesseract } => {
                let tesseract = Arc::clone(tesseract);

                let (raw, confidence) = tokio::task::spawn_blocking(move || {
                    let prepared = preprocess_image(&bytes, &config)?;
                    debug!(bytes = prepared.len(), "Image preprocessed for OCR");

                    let mut lt = tesseract.blocking_lock();
                    lt.set_image_from_mem(&prepared)
                        .map_err(|e| PixogolError::Ocr(format!("Failed to set image: {e}")))?;
                    let text = lt
                        .get_utf8_text()
                        .map_err(|e| PixogolError::Ocr(format!("Failed to extract text: {e}")))?;
                    Ok::<_, PixogolError>((text, lt.mean_text_conf()))
                })
                .await
                .map_err(|e| PixogolError::Ocr(format!("OCR task panicked: {e}")))??;

                Ok(OcrOutput {
                    text: clean_extracted_text(&raw),
                    backend: self.backend_name().to_string(),
                    mean_confidence: Some(confidence),
                })
            }
            OcrBackend::Api { client } => {
                let prepared =
                    tokio::task::spawn_blocking(move || normalize_image(&bytes, &config))
                        .await
                        .map_err(|e| {
                            PixogolError::Ocr(format!("Image preparation panicked: {e}"))
                        })??;
                debug!(bytes = prepared.len(), "Image normalized for vision OCR");

                let raw = client.ocr(&prepared).await?;
                Ok(OcrOutput {
                    text: clean_extracted_text(&raw),
                    backend: client.backend_name().to_string(),
                    mean_confidence: None,
                })
            }
            OcrBackend::Unavailable { reason } => {
                Err(PixogolError::OcrUnavailable(reason.clone()))
            }
        }
    }
}

impl Clone for OcrProvider {
    fn clone(&self) -> Self {
        let backend = match &self.backend {
            OcrBackend::Local { tesseract } => OcrBackend::Local {
                tesseract: Arc::clone(tesseract),
            },
            OcrBackend::Api { client } => OcrBackend::Api {
                client: client.clone(),
            },
            OcrBackend::Unavailable { reason } => OcrBackend::Unavailable {
                reason: reason.clone(),
            },
        };

        Self {
            backend,
            config: self.config.clone(),
        }
    }
}

#[cfg(test)]
impl OcrProvider {
    pub(crate) fn unavailable(reason: &str) -> Self {
        Self {
            backend: OcrBackend::Unavailable {
                reason: reason.to_string(),
            },
            config: OcrConfig::default(),
        }
    }
}
