use std::sync::Arc;

use crate::audit::AuditSink;
use crate::config::Config;
use crate::llm::LlmProvider;
use crate::ocr::OcrProvider;
use crate::services::{AnalysisService, RiskAnalyzer};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub llm: LlmProvider,
    pub analysis: AnalysisService,
}

impl AppState {
    pub fn new(
        config: Config,
        ocr: OcrProvider,
        llm: LlmProvider,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let config = Arc::new(config);
        let risk = RiskAnalyzer::new(llm.clone(), &config.llm);
        let analysis = AnalysisService::new(ocr, risk, audit);

        Self {
            config,
            llm,
            analysis,
        }
    }
}
