use crate::llm::{ModelError, TextModel};
use crate::models::ReportAnalysis;
use crate::prompts::{report_analysis_prompt, strip_json_fence};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Error generating analysis: {0}")]
    Model(#[from] ModelError),

    #[error("model returned an invalid analysis: {reason}")]
    InvalidFormat { reason: String, raw: String },
}

/// Turns extracted report text into a validated [`ReportAnalysis`].
#[derive(Clone)]
pub struct ReportAnalyzer {
    model: Arc<dyn TextModel>,
}

impl ReportAnalyzer {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }

    pub async fn analyze(&self, report_text: &str) -> Result<ReportAnalysis, AnalysisError> {
        info!(report_len = report_text.len(), "Requesting report analysis");

        let prompt = report_analysis_prompt(report_text);
        let raw = self.model.generate(&prompt).await?;
        parse_analysis(&raw)
    }
}

pub fn parse_analysis(raw: &str) -> Result<ReportAnalysis, AnalysisError> {
    let cleaned = strip_json_fence(raw);
    serde_json::from_str(cleaned).map_err(|e| {
        warn!(error = %e, output_len = raw.len(), "Analysis output failed schema validation");
        AnalysisError::InvalidFormat {
            reason: e.to_string(),
            raw: cleaned.to_string(),
        }
    })
}
