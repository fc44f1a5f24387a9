use std::sync::Arc;

use chrono::Local;
use tracing::{info, info_span, warn, Instrument};

use crate::audit::AuditSink;
use crate::error::{PixogolError, Result};
use crate::models::{
    new_analysis_id, AnalysisOrigin, AnalysisRecord, AnalysisReport, ImageUpload,
};
use crate::ocr::OcrProvider;
use crate::services::risk::RiskAnalyzer;

/// Runs one upload through OCR, risk assessment and the audit log.
#[derive(Clone)]
pub struct AnalysisService {
    ocr: OcrProvider,
    risk: RiskAnalyzer,
    audit: Arc<dyn AuditSink>,
}

impl AnalysisService {
    pub fn new(ocr: OcrProvider, risk: RiskAnalyzer, audit: Arc<dyn AuditSink>) -> Self {
        Self { ocr, risk, audit }
    }

    pub fn ocr(&self) -> &OcrProvider {
        &self.ocr
    }

    /// Analyse a validated upload and append its audit record.
    ///
    /// A missing LLM configuration is reported before OCR starts so nothing
    /// is spent on an analysis that cannot finish. The report is only
    /// returned once the audit line has been written.
    pub async fn analyze(
        &self,
        upload: ImageUpload,
        origin: AnalysisOrigin,
    ) -> Result<AnalysisReport> {
        let analysis_id = new_analysis_id();
        let span = info_span!(
            "analysis",
            analysis_id = %analysis_id,
            filename = %upload.file_name,
            kind = %upload.kind,
            origin = origin.user_agent()
        );

        self.run(analysis_id, upload, origin).instrument(span).await
    }

    async fn run(
        &self,
        analysis_id: String,
        upload: ImageUpload,
        origin: AnalysisOrigin,
    ) -> Result<AnalysisReport> {
        self.risk.ensure_configured()?;

        let ocr = self.ocr.extract_text(&upload.bytes).await?;
        let word_count = ocr.word_count();
        info!(
            backend = %ocr.backend,
            chars = ocr.text.chars().count(),
            words = word_count,
            confidence = ?ocr.mean_confidence,
            "Text extracted"
        );
        if !ocr.has_text() {
            warn!("No text found in image");
        }

        let risk_analysis = self.risk.assess(&ocr.text, &upload.file_name).await?;

        let record = AnalysisRecord::new(
            analysis_id,
            Local::now(),
            upload.file_name.clone(),
            upload.sha256_hex(),
            &ocr,
            risk_analysis,
            origin,
        );

        let audit = Arc::clone(&self.audit);
        let to_append = record.clone();
        let log_file = tokio::task::spawn_blocking(move || audit.append(&to_append))
            .await
            .map_err(|e| PixogolError::Internal(format!("Audit task failed: {e}")))??;

        info!(
            overall = %record.risk_analysis.overall_risk_level,
            log_file = %log_file.display(),
            "Analysis recorded"
        );

        Ok(AnalysisReport {
            analysis_id: record.analysis_id,
            timestamp: record.timestamp,
            filename: record.filename,
            extracted_text: record.extracted_text,
            ocr_backend: ocr.backend,
            ocr_mean_confidence: ocr.mean_confidence,
            word_count,
            risk_analysis: record.risk_analysis,
            log_file: log_file.display().to_string(),
        })
    }
}
