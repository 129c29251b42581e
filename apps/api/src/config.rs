use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_ANALYSIS_MODEL: &str = "mistral-large-latest";
const DEFAULT_ANALYSIS_BASE_URL: &str = "https://api.mistral.ai/v1";
const DEFAULT_OCR_MODELS: &str = "gemini-2.0-flash,gemini-1.5-pro";
const DEFAULT_OCR_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Application configuration loaded from environment variables.
/// Built once at startup and handed to the components that need it.
#[derive(Debug, Clone)]
pub struct Config {
    pub mistral_api_key: String,
    pub gemini_api_key: String,
    pub analysis_model: String,
    pub analysis_base_url: String,
    pub analysis_timeout: Duration,
    /// OCR models in priority order. One OCR extractor is built per entry.
    pub ocr_models: Vec<String>,
    pub ocr_base_url: String,
    pub ocr_timeout: Duration,
    /// Whether PDFs are first checked for an embedded text layer.
    pub pdf_text_layer: bool,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            mistral_api_key: require_env("MISTRAL_API_KEY")?,
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            analysis_model: env_or("ANALYSIS_MODEL", DEFAULT_ANALYSIS_MODEL),
            analysis_base_url: env_or("ANALYSIS_BASE_URL", DEFAULT_ANALYSIS_BASE_URL),
            analysis_timeout: Duration::from_secs(parse_env("ANALYSIS_TIMEOUT_SECS", 60)?),
            ocr_models: parse_model_list(&env_or("OCR_MODELS", DEFAULT_OCR_MODELS)),
            ocr_base_url: env_or("OCR_BASE_URL", DEFAULT_OCR_BASE_URL),
            ocr_timeout: Duration::from_secs(parse_env("OCR_TIMEOUT_SECS", 90)?),
            pdf_text_layer: parse_env("PDF_TEXT_LAYER", true)?,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            port: parse_env("PORT", 5000)?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

/// Splits a comma-separated model list, dropping blanks and keeping order.
fn parse_model_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect()
}
