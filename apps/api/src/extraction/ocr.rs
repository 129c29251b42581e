//! OCR extractor: sends the raw document to a remote vision model.
//!
//! The document is base64-encoded and inlined in a `generateContent` request
//! alongside a fixed extraction instruction. Output is not deterministic, so an
//! empty reply or a reply where the model says it cannot read the file is a
//! failure, never a success.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::extraction::{DocumentFormat, ExtractionError, Extractor, UploadedDocument};

const OCR_INSTRUCTION: &str = "\
Extract the full textual content of this document. Preserve its structure: \
headings and section titles, contact information, education, work experience, \
skills, bullet points, and tables (render tables row by row). \
Return ONLY the extracted text, formatted as it appears in the document. \
Do not summarise, translate, or add commentary.";

const MAX_OUTPUT_TOKENS: u32 = 8192;

/// Phrases a vision model uses when it declares it cannot see the file.
const REFUSAL_PHRASES: &[&str] = &[
    "i don't have the ability to directly",
    "i do not have the ability to directly",
    "i cannot access",
    "i can't access",
    "i am unable to access",
    "i'm unable to access",
];

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    InlineData { inline_data: InlineData<'a> },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenates every text part of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| {
                c.parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

/// One OCR strategy bound to a single remote model.
pub struct GeminiOcrExtractor {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    name: String,
    timeout: Duration,
}

impl GeminiOcrExtractor {
    pub fn new(base_url: &str, api_key: String, model: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()
            .context("Failed to build OCR HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            name: format!("ocr:{model}"),
            model,
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn network_error(&self, e: reqwest::Error) -> ExtractionError {
        if e.is_timeout() {
            ExtractionError::Timeout {
                model: self.model.clone(),
                secs: self.timeout.as_secs(),
            }
        } else {
            ExtractionError::Network {
                model: self.model.clone(),
                source: e,
            }
        }
    }
}

#[async_trait]
impl Extractor for GeminiOcrExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, format: DocumentFormat) -> bool {
        format == DocumentFormat::Pdf
    }

    async fn extract(&self, document: &UploadedDocument) -> Result<String, ExtractionError> {
        let payload = STANDARD.encode(document.bytes());
        debug!(
            "OCR request to {}: {} bytes ({} base64 chars)",
            self.model,
            document.bytes().len(),
            payload.len()
        );

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: document.format().mime_type(),
                            data: payload,
                        },
                    },
                    Part::Text {
                        text: OCR_INSTRUCTION,
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.network_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("OCR model {} returned {}: {}", self.model, status, body);
            return Err(ExtractionError::RemoteStatus {
                model: self.model.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let raw = response.text().await.map_err(|e| self.network_error(e))?;
        let parsed: GenerateResponse =
            serde_json::from_str(&raw).map_err(|e| ExtractionError::MalformedReply {
                model: self.model.clone(),
                detail: e.to_string(),
            })?;
        let text = parsed.text();

        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyText {
                strategy: self.name.clone(),
            });
        }
        if is_refusal(&text) {
            return Err(ExtractionError::Refusal {
                model: self.model.clone(),
            });
        }

        Ok(text)
    }
}

fn is_refusal(text: &str) -> bool {
    let lowered = text.to_lowercase().replace('\u{2019}', "'");
    REFUSAL_PHRASES.iter().any(|p| lowered.contains(p))
}
