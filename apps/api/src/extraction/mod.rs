//! Document extraction: turns uploaded bytes into plain text.
//!
//! Strategies implement [`Extractor`]. The [`orchestrator::ExtractionOrchestrator`]
//! walks them in a fixed priority order per format and commits to the first
//! one that yields non-empty text.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

pub mod direct;
pub mod format;
pub mod ocr;
pub mod orchestrator;

pub use format::{DocumentFormat, UploadedDocument};

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Empty input: {0}")]
    EmptyInput(&'static str),

    #[error("Document is not valid UTF-8: {0}")]
    Decode(#[from] std::str::Utf8Error),

    #[error("Could not read {format} document: {detail}")]
    Unreadable {
        format: DocumentFormat,
        detail: String,
    },

    #[error("Network error calling OCR model '{model}': {source}")]
    Network {
        model: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("OCR model '{model}' timed out after {secs}s")]
    Timeout { model: String, secs: u64 },

    #[error("OCR model '{model}' returned status {status}: {body}")]
    RemoteStatus {
        model: String,
        status: u16,
        body: String,
    },

    #[error("OCR model '{model}' sent a reply that could not be decoded: {detail}")]
    MalformedReply { model: String, detail: String },

    #[error("Strategy '{strategy}' produced no text")]
    EmptyText { strategy: String },

    #[error("OCR model '{model}' declined to read the document")]
    Refusal { model: String },

    #[error("No extractor produced text after {attempts} attempt(s)")]
    Exhausted {
        attempts: usize,
        #[source]
        last: Option<Box<ExtractionError>>,
    },
}

/// Text committed by the orchestrator. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText(String);

impl ExtractedText {
    /// Returns `None` for empty or whitespace-only text.
    pub fn new(text: String) -> Option<Self> {
        if text.trim().is_empty() {
            None
        } else {
            Some(Self(text))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One strategy tried by the orchestrator. Kept for diagnostics only.
#[derive(Debug, Clone)]
pub struct ExtractionAttempt {
    pub strategy: String,
    pub ordinal: usize,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success { chars: usize },
    Failure(String),
}

impl fmt::Display for ExtractionAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            AttemptOutcome::Success { chars } => {
                write!(f, "#{} {}: ok ({chars} chars)", self.ordinal, self.strategy)
            }
            AttemptOutcome::Failure(cause) => {
                write!(f, "#{} {}: failed ({cause})", self.ordinal, self.strategy)
            }
        }
    }
}

/// A single extraction strategy: bytes of a known format in, text or a typed failure out.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Stable name used in logs and attempt records.
    fn name(&self) -> &str;

    fn supports(&self, format: DocumentFormat) -> bool;

    async fn extract(&self, document: &UploadedDocument) -> Result<String, ExtractionError>;
}
