use chrono::{DateTime, Local};
use serde::Serialize;

use crate::models::{AnalysisReport, RiskAssessment};

/// OCR details for one analysis.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OcrSummary {
    /// Backend that read the image (`tesseract`, `openai-vision`, ...).
    pub backend: String,
    /// Mean word confidence 0-100, when the backend reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_confidence: Option<i32>,
    pub word_count: usize,
}

/// Response for `POST /api/v1/analyses:upload`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    /// Short analysis ID (8 hex chars), also the key of the audit record.
    pub analysis_id: String,
    pub timestamp: DateTime<Local>,
    pub filename: String,
    /// Cleaned OCR text. `null` when no text was found.
    pub extracted_text: Option<String>,
    pub ocr: OcrSummary,
    /// Assessment with its original snake_case field names.
    pub risk_analysis: RiskAssessment,
    /// Plain-text rendering of `riskAnalysis`.
    pub summary: String,
    /// Daily audit log file the record was appended to.
    pub log_file: String,
}

impl From<AnalysisReport> for AnalysisResponse {
    fn from(report: AnalysisReport) -> Self {
        let summary = report.risk_analysis.summary_text();
        Self {
            analysis_id: report.analysis_id,
            timestamp: report.timestamp,
            filename: report.filename,
            extracted_text: report.extracted_text,
            ocr: OcrSummary {
                backend: report.ocr_backend,
                mean_confidence: report.ocr_mean_confidence,
                word_count: report.word_count,
            },
            risk_analysis: report.risk_analysis,
            summary,
            log_file: report.log_file,
        }
    }
}
