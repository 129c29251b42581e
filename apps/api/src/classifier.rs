//! Error Classifier: maps any pipeline failure to a stable (category, status, message).
//!
//! Typed causes are matched first. Message substrings are only consulted for
//! untyped errors that carry no recognisable cause in their chain.
//! Classification never fails.

use axum::http::StatusCode;

use crate::errors::AppError;
use crate::extraction::ExtractionError;
use crate::llm_client::LlmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    UnsupportedFormat,
    InvalidInput,
    PayloadTooLarge,
    ExtractionFailed,
    RateLimited,
    ServiceUnavailable,
    ModelUnavailable,
    Internal,
}

impl ErrorCategory {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCategory::UnsupportedFormat | ErrorCategory::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorCategory::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCategory::ExtractionFailed => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCategory::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorCategory::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCategory::ModelUnavailable | ErrorCategory::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            ErrorCategory::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            ErrorCategory::InvalidInput => "INVALID_INPUT",
            ErrorCategory::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ErrorCategory::ExtractionFailed => "EXTRACTION_FAILED",
            ErrorCategory::RateLimited => "RATE_LIMITED",
            ErrorCategory::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCategory::ModelUnavailable => "MODEL_UNAVAILABLE",
            ErrorCategory::Internal => "INTERNAL_ERROR",
        }
    }

    /// User-facing message. Never includes internal diagnostics.
    pub fn default_message(self) -> &'static str {
        match self {
            ErrorCategory::UnsupportedFormat => {
                "Unsupported file format. Only PDF, DOCX, and TXT files are allowed."
            }
            ErrorCategory::InvalidInput => "The request is missing required input.",
            ErrorCategory::PayloadTooLarge => "The uploaded file is too large.",
            ErrorCategory::ExtractionFailed => {
                "Could not extract text from the document. Please try a different file format like DOCX or TXT."
            }
            ErrorCategory::RateLimited => "API rate limit exceeded. Please try again later.",
            ErrorCategory::ServiceUnavailable => {
                "Our AI analysis service is currently unavailable. Please try again later."
            }
            ErrorCategory::ModelUnavailable => {
                "The document processing model is not available. Please contact support for assistance."
            }
            ErrorCategory::Internal => "An unexpected error occurred.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: ErrorCategory,
    pub status: StatusCode,
    pub message: String,
}

impl From<ErrorCategory> for Classification {
    fn from(category: ErrorCategory) -> Self {
        Self {
            category,
            status: category.status(),
            message: category.default_message().to_string(),
        }
    }
}

impl Classification {
    fn with_message(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::from(category)
        }
    }
}

pub fn classify(error: &AppError) -> Classification {
    match error {
        AppError::Validation(msg) => Classification::with_message(ErrorCategory::InvalidInput, msg),
        AppError::Multipart(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            ErrorCategory::PayloadTooLarge.into()
        }
        AppError::Multipart(e) => {
            Classification::with_message(ErrorCategory::InvalidInput, e.body_text())
        }
        AppError::Extraction(e) => classify_extraction(e),
        AppError::Analysis(e) => classify_llm(e),
        AppError::Internal(e) => classify_untyped(e),
    }
}

pub fn classify_extraction(error: &ExtractionError) -> Classification {
    match error {
        ExtractionError::UnsupportedFormat(ext) => {
            let shown = if ext.is_empty() { "(none)" } else { ext.as_str() };
            Classification::with_message(
                ErrorCategory::UnsupportedFormat,
                format!(
                    "Unsupported file format: {shown}. Only PDF, DOCX, and TXT files are allowed."
                ),
            )
        }
        ExtractionError::EmptyInput(detail) => {
            Classification::with_message(ErrorCategory::InvalidInput, *detail)
        }
        // Decode errors, unreadable documents and exhausted OCR all look the same to the user.
        _ => ErrorCategory::ExtractionFailed.into(),
    }
}

pub fn classify_llm(error: &LlmError) -> Classification {
    let category = match error {
        LlmError::Api { status: 429, .. } => ErrorCategory::RateLimited,
        LlmError::Api { message, body, .. }
            if names_invalid_model(message) || names_invalid_model(body) =>
        {
            ErrorCategory::ModelUnavailable
        }
        LlmError::Api { status, .. } if (500..600).contains(status) => {
            ErrorCategory::ServiceUnavailable
        }
        LlmError::Http(_) | LlmError::Timeout { .. } => ErrorCategory::ServiceUnavailable,
        LlmError::Api { .. } | LlmError::Parse(_) | LlmError::EmptyContent => {
            ErrorCategory::Internal
        }
    };
    category.into()
}

/// Looks for a typed cause anywhere in the chain before falling back to the message.
fn classify_untyped(error: &anyhow::Error) -> Classification {
    for cause in error.chain() {
        if let Some(e) = cause.downcast_ref::<ExtractionError>() {
            return classify_extraction(e);
        }
        if let Some(e) = cause.downcast_ref::<LlmError>() {
            return classify_llm(e);
        }
        if let Some(e) = cause.downcast_ref::<reqwest::Error>() {
            if e.is_timeout() || e.is_connect() {
                return ErrorCategory::ServiceUnavailable.into();
            }
        }
    }
    classify_message(&format!("{error:#}")).into()
}

/// Last-resort substring matching for errors with no typed cause.
pub fn classify_message(message: &str) -> ErrorCategory {
    let lowered = message.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lowered.contains(n));

    if has(&["rate limit", "too many requests"]) {
        ErrorCategory::RateLimited
    } else if has(&["invalid_model", "model not found"]) {
        ErrorCategory::ModelUnavailable
    } else if has(&[
        "connection refused",
        "network error",
        "timed out",
        "dns error",
        "service unavailable",
    ]) {
        ErrorCategory::ServiceUnavailable
    } else {
        ErrorCategory::Internal
    }
}

fn names_invalid_model(message: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("invalid_model")
        || lowered.contains("invalid model")
        || lowered.contains("model not found")
}
