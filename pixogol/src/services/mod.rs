mod analysis;
mod risk;

pub use analysis::AnalysisService;
pub use risk::RiskAnalyzer;
