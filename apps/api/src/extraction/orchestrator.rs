//! Extraction Orchestrator: ordered fallback over extraction strategies.
//!
//! Strategy order is fixed at construction. For a given document only the
//! strategies that support its format are tried, in order, one attempt each.
//! The first non-empty text wins; partial results are never merged.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::config::Config;
use crate::extraction::direct::DirectTextExtractor;
use crate::extraction::ocr::GeminiOcrExtractor;
use crate::extraction::{
    AttemptOutcome, ExtractedText, ExtractionAttempt, ExtractionError, Extractor,
    UploadedDocument,
};

/// Committed text plus the diagnostic trail that led to it.
#[derive(Debug)]
pub struct Extraction {
    pub text: ExtractedText,
    pub attempts: Vec<ExtractionAttempt>,
}

#[derive(Clone)]
pub struct ExtractionOrchestrator {
    strategies: Vec<Arc<dyn Extractor>>,
}

impl ExtractionOrchestrator {
    pub fn new(strategies: Vec<Arc<dyn Extractor>>) -> Self {
        Self { strategies }
    }

    /// Direct text first, then one OCR strategy per configured model.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut strategies: Vec<Arc<dyn Extractor>> =
            vec![Arc::new(DirectTextExtractor::new(config.pdf_text_layer))];
        for model in &config.ocr_models {
            strategies.push(Arc::new(GeminiOcrExtractor::new(
                &config.ocr_base_url,
                config.gemini_api_key.clone(),
                model.clone(),
                config.ocr_timeout,
            )?));
        }
        Ok(Self::new(strategies))
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub async fn extract(&self, document: &UploadedDocument) -> Result<Extraction, ExtractionError> {
        let format = document.format();
        let mut attempts = Vec::new();
        let mut last_error: Option<ExtractionError> = None;

        let candidates = self.strategies.iter().filter(|s| s.supports(format));
        for (index, strategy) in candidates.enumerate() {
            let ordinal = index + 1;
            let result = strategy.extract(document).await;

            let error = match result {
                Ok(raw) => match ExtractedText::new(raw) {
                    Some(text) => {
                        let chars = text.as_str().chars().count();
                        info!(
                            "Extracted {chars} chars from '{}' with {} (attempt {ordinal})",
                            document.filename(),
                            strategy.name()
                        );
                        attempts.push(ExtractionAttempt {
                            strategy: strategy.name().to_string(),
                            ordinal,
                            outcome: AttemptOutcome::Success { chars },
                        });
                        return Ok(Extraction { text, attempts });
                    }
                    None => ExtractionError::EmptyText {
                        strategy: strategy.name().to_string(),
                    },
                },
                Err(e) => e,
            };

            warn!(
                "Extraction strategy {} failed for '{}' (attempt {ordinal}): {error}",
                strategy.name(),
                document.filename()
            );
            attempts.push(ExtractionAttempt {
                strategy: strategy.name().to_string(),
                ordinal,
                outcome: AttemptOutcome::Failure(error.to_string()),
            });
            last_error = Some(error);
        }

        Err(ExtractionError::Exhausted {
            attempts: attempts.len(),
            last: last_error.map(Box::new),
        })
    }
}
