use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::risk::RiskAssessment;

/// Text recognised in an image together with what produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrOutput {
    /// Cleaned text; empty when nothing was recognised.
    pub text: String,
    pub backend: String,
    /// Mean word confidence (0-100) when the engine reports one.
    pub mean_confidence: Option<i32>,
}

impl OcrOutput {
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Which surface requested the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisOrigin {
    Http,
    Cli,
}

impl AnalysisOrigin {
    pub fn user_agent(&self) -> &'static str {
        match self {
            Self::Http => "pixogol-http",
            Self::Cli => "pixogol-cli",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub user_agent: String,
    pub app_version: String,
}

/// One line of the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub analysis_id: String,
    pub timestamp: DateTime<Local>,
    pub timestamp_readable: String,
    pub filename: String,
    pub image_sha256: String,
    pub extracted_text: Option<String>,
    pub extracted_text_length: usize,
    pub risk_analysis: RiskAssessment,
    pub session_info: SessionInfo,
}

impl AnalysisRecord {
    pub fn new(
        analysis_id: String,
        timestamp: DateTime<Local>,
        filename: String,
        image_sha256: String,
        ocr: &OcrOutput,
        risk_analysis: RiskAssessment,
        origin: AnalysisOrigin,
    ) -> Self {
        let extracted_text = ocr.has_text().then(|| ocr.text.clone());
        let extracted_text_length = extracted_text
            .as_deref()
            .map(|t| t.chars().count())
            .unwrap_or(0);

        Self {
            analysis_id,
            timestamp,
            timestamp_readable: timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            filename,
            image_sha256,
            extracted_text,
            extracted_text_length,
            risk_analysis,
            session_info: SessionInfo {
                user_agent: origin.user_agent().to_string(),
                app_version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }
}

/// Result handed back to whoever asked for the analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub analysis_id: String,
    pub timestamp: DateTime<Local>,
    pub filename: String,
    pub extracted_text: Option<String>,
    pub ocr_backend: String,
    pub ocr_mean_confidence: Option<i32>,
    pub word_count: usize,
    pub risk_analysis: RiskAssessment,
    pub log_file: String,
}

/// Short identifier: the first 8 hex digits of a random UUID.
pub fn new_analysis_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ocr(text: &str) -> OcrOutput {
        OcrOutput {
            text: text.to_string(),
            backend: "tesseract".to_string(),
            mean_confidence: Some(91),
        }
    }

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 7, 28, 14, 5, 9).unwrap()
    }

    #[test]
    fn analysis_ids_are_eight_hex_chars() {
        let id = new_analysis_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_analysis_id());
    }

    #[test]
    fn record_with_text_keeps_it() {
        let record = AnalysisRecord::new(
            "abcd1234".to_string(),
            fixed_time(),
            "poster.png".to_string(),
            "00".repeat(32),
            &ocr("Café Coca-Cola"),
            RiskAssessment::no_text_found(),
            AnalysisOrigin::Http,
        );

        assert_eq!(record.extracted_text.as_deref(), Some("Café Coca-Cola"));
        assert_eq!(record.extracted_text_length, 14);
        assert_eq!(record.timestamp_readable, "2025-07-28 14:05:09");
        assert_eq!(record.session_info.user_agent, "pixogol-http");
    }

    #[test]
    fn record_without_text_serializes_null() {
        let record = AnalysisRecord::new(
            "abcd1234".to_string(),
            fixed_time(),
            "blank.png".to_string(),
            "00".repeat(32),
            &ocr("   "),
            RiskAssessment::no_text_found(),
            AnalysisOrigin::Cli,
        );

        let json = serde_json::to_value(&record).unwrap();
        assert!(json["extracted_text"].is_null());
        assert_eq!(json["extracted_text_length"], 0);
        assert_eq!(json["session_info"]["user_agent"], "pixogol-cli");
        assert!(json["timestamp"].as_str().unwrap().starts_with("2025-07-28T14:05:09"));
    }

    #[test]
    fn word_count_ignores_extra_whitespace() {
        assert_eq!(ocr("  STAR   WARS \n drink ").word_count(), 3);
        assert_eq!(ocr("").word_count(), 0);
        assert!(!ocr(" \n").has_text());
    }
}
