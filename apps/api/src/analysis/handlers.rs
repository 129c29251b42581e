//! Axum route handler for CV analysis.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::analysis::invoker::{AnalysisInvoker, AnalysisRequest, AnalysisResult, Language};
use crate::errors::AppError;
use crate::extraction::orchestrator::ExtractionOrchestrator;
use crate::extraction::{DocumentFormat, UploadedDocument};
use crate::llm_client::ChatCompletion;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// Multipart fields of `POST /analyze`.
#[derive(Debug, Default)]
pub struct AnalyzeForm {
    pub file: Option<(String, Vec<u8>)>,
    pub language: Language,
    pub job_description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub analysis: AnalysisResult,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let form = read_form(multipart).await?;
    let span = tracing::info_span!("analyze", request_id = %Uuid::new_v4());

    let analysis = analyze_upload(&state.orchestrator, state.llm.as_ref(), form)
        .instrument(span)
        .await?;
    Ok(Json(AnalyzeResponse { analysis }))
}

async fn read_form(mut multipart: Multipart) -> Result<AnalyzeForm, AppError> {
    let mut form = AnalyzeForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                // Reject by extension before the body is buffered.
                DocumentFormat::detect(&filename)?;
                let bytes = field.bytes().await?;
                form.file = Some((filename, bytes.to_vec()));
            }
            "language" => form.language = Language::parse(&field.text().await?),
            "job_description" => form.job_description = Some(field.text().await?),
            _ => {}
        }
    }

    Ok(form)
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Upload → format check → extraction → analysis.
pub async fn analyze_upload(
    orchestrator: &ExtractionOrchestrator,
    llm: &dyn ChatCompletion,
    form: AnalyzeForm,
) -> Result<AnalysisResult, AppError> {
    let (filename, bytes) = form
        .file
        .ok_or_else(|| AppError::Validation("No file part".to_string()))?;
    let document = UploadedDocument::new(filename, bytes)?;

    if let Some(jd) = &form.job_description {
        info!("Job description provided ({} characters)", jd.chars().count());
    }

    let request = prepare_request(orchestrator, &document, form.language, form.job_description).await?;
    drop(document);

    let result = AnalysisInvoker::new(llm).analyze(&request).await?;
    Ok(result)
}

/// Extracts the document and builds the analysis request for it.
pub async fn prepare_request(
    orchestrator: &ExtractionOrchestrator,
    document: &UploadedDocument,
    language: Language,
    job_description: Option<String>,
) -> Result<AnalysisRequest, AppError> {
    info!(
        "Processing file '{}' ({})",
        document.filename(),
        document.format().extension()
    );
    let extraction = orchestrator.extract(document).await?;
    for attempt in &extraction.attempts {
        info!("Extraction attempt {attempt}");
    }
    Ok(AnalysisRequest::new(extraction.text, language, job_description))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::prompts::EN_PROMPT;
    use crate::classifier::{classify, ErrorCategory};
    use crate::extraction::direct::DirectTextExtractor;
    use crate::extraction::{DocumentFormat, ExtractionError, Extractor};
    use crate::llm_client::LlmError;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// OCR stand-in that always answers with the same text.
    struct FixedOcr {
        reply: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Extractor for FixedOcr {
        fn name(&self) -> &str {
            "ocr:stub"
        }

        fn supports(&self, format: DocumentFormat) -> bool {
            format == DocumentFormat::Pdf
        }

        async fn extract(&self, _document: &UploadedDocument) -> Result<String, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.to_string())
        }
    }

    struct EchoChat;

    #[async_trait]
    impl ChatCompletion for EchoChat {
        async fn complete_json(&self, _system: &str, _prompt: &str) -> Result<String, LlmError> {
            Ok(r#"{"overall_impression": "Concise CV", "ats_score": 70}"#.to_string())
        }
    }

    fn orchestrator_with_ocr(ocr: Arc<FixedOcr>) -> ExtractionOrchestrator {
        let strategies: Vec<Arc<dyn Extractor>> =
            vec![Arc::new(DirectTextExtractor::new(true)), ocr];
        ExtractionOrchestrator::new(strategies)
    }

    fn fixed_ocr(reply: &'static str) -> Arc<FixedOcr> {
        Arc::new(FixedOcr {
            reply,
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_txt_upload_builds_english_no_job_request() {
        let ocr = fixed_ocr("unused");
        let orchestrator = orchestrator_with_ocr(ocr.clone());
        let document =
            UploadedDocument::new("jane.txt", b"Jane Doe\nSoftware Engineer".to_vec()).unwrap();

        let request = prepare_request(&orchestrator, &document, Language::En, None)
            .await
            .unwrap();
        let prompt = request.prompt();

        assert_eq!(request.template(), EN_PROMPT);
        assert!(prompt.contains("Jane Doe\nSoftware Engineer"));
        assert!(prompt.contains("This is a request to analyze a resume/CV."));
        assert!(prompt.contains("recommendations (array)"));
        assert!(!prompt.contains("job_match_score"));
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_pdf_without_text_layer_and_empty_ocr_is_422() {
        let ocr = fixed_ocr("");
        let orchestrator = orchestrator_with_ocr(ocr.clone());
        let document = UploadedDocument::new("scan.pdf", b"%PDF-1.4 no text".to_vec()).unwrap();

        let err = prepare_request(&orchestrator, &document, Language::En, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Extraction(ExtractionError::Exhausted { .. })
        ));
        assert_eq!(classify(&err).status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_validation_error() {
        let orchestrator = orchestrator_with_ocr(fixed_ocr("unused"));
        let err = analyze_upload(&orchestrator, &EchoChat, AnalyzeForm::default())
            .await
            .unwrap_err();
        assert_eq!(classify(&err).category, ErrorCategory::InvalidInput);
    }

    #[tokio::test]
    async fn test_unsupported_upload_is_400() {
        let orchestrator = orchestrator_with_ocr(fixed_ocr("unused"));
        let form = AnalyzeForm {
            file: Some(("cv.rtf".to_string(), b"{\\rtf1}".to_vec())),
            ..AnalyzeForm::default()
        };
        let err = analyze_upload(&orchestrator, &EchoChat, form).await.unwrap_err();
        assert_eq!(classify(&err).status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_full_pipeline_returns_analysis() {
        let orchestrator = orchestrator_with_ocr(fixed_ocr("Scanned Jane Doe"));
        let form = AnalyzeForm {
            file: Some(("scan.pdf".to_string(), b"%PDF-1.4 no text".to_vec())),
            language: Language::En,
            job_description: Some("Rust engineer".to_string()),
        };
        let result = analyze_upload(&orchestrator, &EchoChat, form).await.unwrap();
        assert_eq!(result.overall_impression, "Concise CV");
        assert_eq!(result.ats_score, Some(70));
    }
}
