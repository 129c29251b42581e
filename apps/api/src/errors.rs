use axum::{
    extract::multipart::MultipartError,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::classifier::classify;
use crate::extraction::ExtractionError;
use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Multipart(#[from] MultipartError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Analysis(#[from] LlmError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let classification = classify(&self);

        // Underlying causes are logged, never returned to the client.
        if classification.status.is_server_error() {
            tracing::error!("{}: {}", classification.category.code(), ErrorChain(&self));
        } else {
            tracing::warn!("{}: {}", classification.category.code(), ErrorChain(&self));
        }

        let body = Json(json!({
            "error": {
                "code": classification.category.code(),
                "message": classification.message
            }
        }));

        (classification.status, body).into_response()
    }
}

/// Renders an error followed by its `source()` chain.
struct ErrorChain<'a>(&'a (dyn std::error::Error + 'static));

impl std::fmt::Display for ErrorChain<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(cause) = source {
            write!(f, ": {cause}")?;
            source = cause.source();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::StatusCode;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_exhausted_renders_generic_422() {
        let (status, body) = render(AppError::Extraction(ExtractionError::Exhausted {
            attempts: 1,
            last: Some(Box::new(ExtractionError::EmptyText {
                strategy: "ocr:gemini".to_string(),
            })),
        }))
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "EXTRACTION_FAILED");
        assert!(!body["error"]["message"].as_str().unwrap().contains("ocr:gemini"));
    }

    #[tokio::test]
    async fn test_rate_limit_renders_429() {
        let (status, body) = render(AppError::Analysis(LlmError::Api {
            status: 429,
            message: "slow down".to_string(),
            body: String::new(),
        }))
        .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"]["code"], "RATE_LIMITED");
    }

    #[test]
    fn test_error_chain_includes_sources() {
        let err = AppError::Extraction(ExtractionError::Exhausted {
            attempts: 1,
            last: Some(Box::new(ExtractionError::Refusal {
                model: "gemini".to_string(),
            })),
        });
        let rendered = ErrorChain(&err).to_string();
        assert!(rendered.contains("declined to read"));
    }
}
