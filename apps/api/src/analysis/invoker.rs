//! Analysis Invoker: builds the prompt and asks the chat model for a structured review.
//!
//! A reply that is not valid JSON degrades to a placeholder result with the
//! same shape, so callers never special-case a parse failure.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::analysis::prompts::{
    fill_template, ANALYSIS_SYSTEM, EN_JOB_PROMPT, EN_PROMPT, TR_JOB_PROMPT, TR_PROMPT,
};
use crate::extraction::ExtractedText;
use crate::llm_client::{ChatCompletion, LlmError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    En,
    Tr,
}

impl Language {
    /// `tr` selects Turkish; anything else falls back to English.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "tr" => Language::Tr,
            _ => Language::En,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Language::En => "en",
            Language::Tr => "tr",
        })
    }
}

/// Everything the prompt depends on. Built once per document.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    text: ExtractedText,
    language: Language,
    job_description: Option<String>,
}

impl AnalysisRequest {
    /// A blank job description is treated as absent.
    pub fn new(text: ExtractedText, language: Language, job_description: Option<String>) -> Self {
        let job_description = job_description.filter(|jd| !jd.trim().is_empty());
        Self {
            text,
            language,
            job_description,
        }
    }

    pub fn text(&self) -> &str {
        self.text.as_str()
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn job_description(&self) -> Option<&str> {
        self.job_description.as_deref()
    }

    /// Template choice is a pure function of (language, job description present).
    pub fn template(&self) -> &'static str {
        match (self.language, self.job_description.is_some()) {
            (Language::En, false) => EN_PROMPT,
            (Language::En, true) => EN_JOB_PROMPT,
            (Language::Tr, false) => TR_PROMPT,
            (Language::Tr, true) => TR_JOB_PROMPT,
        }
    }

    pub fn prompt(&self) -> String {
        fill_template(
            self.template(),
            &[
                ("cv_text", self.text.as_str()),
                ("job_description", self.job_description().unwrap_or_default()),
            ],
        )
    }
}

/// The model's assessment. Every key is always present in the serialised form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub overall_impression: String,
    #[serde(default, deserialize_with = "lenient_score")]
    pub ats_score: Option<u8>,
    #[serde(default, deserialize_with = "lenient_score")]
    pub job_match_score: Option<u8>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub strengths: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub areas_for_improvement: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub recommendations: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub job_specific_recommendations: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub keyword_suggestions: Vec<String>,
}

impl AnalysisResult {
    /// Placeholder returned when the model's reply cannot be parsed.
    pub fn parse_failure(language: Language) -> Self {
        let overall_impression = match language {
            Language::En => {
                "The analysis could not be completed because the AI response could not be parsed. Please try again."
            }
            Language::Tr => "Yapay zeka yanıtı ayrıştırılamadığı için analiz tamamlanamadı. Lütfen tekrar deneyin.",
        };
        Self {
            overall_impression: overall_impression.to_string(),
            ..Self::default()
        }
    }

    /// Parses a model reply. Anything that is not a JSON object degrades to the placeholder.
    pub fn from_reply(reply: &str, language: Language) -> Self {
        match serde_json::from_str::<Value>(reply) {
            Ok(value @ Value::Object(_)) => match serde_json::from_value::<AnalysisResult>(value) {
                Ok(result) => result,
                Err(e) => {
                    warn!("Analysis reply has an unexpected shape: {e}");
                    Self::parse_failure(language)
                }
            },
            Ok(other) => {
                warn!("Analysis reply is JSON but not an object: {other}");
                Self::parse_failure(language)
            }
            Err(e) => {
                warn!("Analysis reply is not valid JSON: {e}");
                Self::parse_failure(language)
            }
        }
    }
}

/// Accepts 85, 85.4, "85" or "85/100"; clamps to 0..=100. Unusable values become `None`.
fn lenient_score<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s
            .split('/')
            .next()
            .and_then(|head| head.trim().trim_end_matches('%').parse::<f64>().ok()),
        _ => None,
    };
    Ok(number
        .filter(|n| n.is_finite())
        .map(|n| n.round().clamp(0.0, 100.0) as u8))
}

/// Accepts an array of strings; non-string items are rendered as text. A single
/// string becomes a one-item list.
fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Null => None,
                Value::Object(map) => Some(
                    map.values()
                        .map(|v| match v {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(": "),
                ),
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    })
}

/// Calls the chat model for one analysis request.
pub struct AnalysisInvoker<'a> {
    llm: &'a dyn ChatCompletion,
}

impl<'a> AnalysisInvoker<'a> {
    pub fn new(llm: &'a dyn ChatCompletion) -> Self {
        Self { llm }
    }

    /// Remote failures propagate as `LlmError`. Malformed replies never do.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, LlmError> {
        info!(
            "Analyzing {} chars (language: {}, job description: {})",
            request.text().chars().count(),
            request.language(),
            request.job_description().is_some()
        );

        let reply = match self.llm.complete_json(ANALYSIS_SYSTEM, &request.prompt()).await {
            Ok(reply) => reply,
            // An undecodable or empty reply is a malformed response, not an outage.
            Err(e @ (LlmError::Parse(_) | LlmError::EmptyContent)) => {
                warn!("Analysis response could not be used: {e}");
                return Ok(AnalysisResult::parse_failure(request.language()));
            }
            Err(e) => return Err(e),
        };

        Ok(AnalysisResult::from_reply(&reply, request.language()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StubChat {
        reply: Result<String, u16>,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl StubChat {
        fn ok(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn status(status: u16) -> Self {
            Self {
                reply: Err(status),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatCompletion for StubChat {
        async fn complete_json(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
            self.seen
                .lock()
                .unwrap()
                .push((system.to_string(), prompt.to_string()));
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(status) => Err(LlmError::Api {
                    status: *status,
                    message: "stub failure".to_string(),
                    body: String::new(),
                }),
            }
        }
    }

    fn text(s: &str) -> ExtractedText {
        ExtractedText::new(s.to_string()).unwrap()
    }

    fn request(language: Language, jd: Option<&str>) -> AnalysisRequest {
        AnalysisRequest::new(text("Jane Doe\nSoftware Engineer"), language, jd.map(String::from))
    }

    #[test]
    fn test_language_parse() {
        assert_eq!(Language::parse("tr"), Language::Tr);
        assert_eq!(Language::parse(" TR "), Language::Tr);
        assert_eq!(Language::parse("en"), Language::En);
        assert_eq!(Language::parse("de"), Language::En);
        assert_eq!(Language::parse(""), Language::En);
    }

    #[test]
    fn test_template_selection_is_distinct_per_combination() {
        let templates = [
            request(Language::En, None).template(),
            request(Language::En, Some("Rust role")).template(),
            request(Language::Tr, None).template(),
            request(Language::Tr, Some("Rust role")).template(),
        ];
        for (i, a) in templates.iter().enumerate() {
            for b in templates.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let r = request(Language::Tr, Some("Backend engineer, Rust"));
        assert_eq!(r.prompt(), r.prompt());
    }

    #[test]
    fn test_job_prompt_contains_job_description_verbatim() {
        let jd = "Senior Rust Engineer\n- 5+ years {async} experience";
        for language in [Language::En, Language::Tr] {
            let prompt = request(language, Some(jd)).prompt();
            assert!(prompt.contains(jd));
            assert!(prompt.contains("Jane Doe\nSoftware Engineer"));
            assert!(prompt.contains("job_match_score"));
        }
    }

    #[test]
    fn test_blank_job_description_is_absent() {
        let r = request(Language::En, Some("   \n"));
        assert!(r.job_description().is_none());
        assert_eq!(r.template(), EN_PROMPT);
    }

    #[test]
    fn test_object_items_keep_the_model_key_order() {
        let reply = r#"{
            "strengths": [{"title": "Metrics", "description": "Quantified wins"}],
            "recommendations": [{"summary": "Add links", "action": "GitHub profile"}]
        }"#;
        let result = AnalysisResult::from_reply(reply, Language::En);
        assert_eq!(result.strengths, vec!["Metrics: Quantified wins"]);
        assert_eq!(result.recommendations, vec!["Add links: GitHub profile"]);
    }

    #[test]
    fn test_reply_with_numeric_strings_and_objects() {
        let reply = r#"{
            "overall_impression": "Solid.",
            "ats_score": "82/100",
            "job_match_score": 67.6,
            "strengths": ["Clear layout", {"area": "Metrics", "detail": "Quantified wins"}],
            "areas_for_improvement": "Add a summary",
            "recommendations": [],
            "keyword_suggestions": ["Rust", null, 42]
        }"#;
        let result = AnalysisResult::from_reply(reply, Language::En);
        assert_eq!(result.ats_score, Some(82));
        assert_eq!(result.job_match_score, Some(68));
        assert_eq!(result.strengths, vec!["Clear layout", "Metrics: Quantified wins"]);
        assert_eq!(result.areas_for_improvement, vec!["Add a summary"]);
        assert_eq!(result.keyword_suggestions, vec!["Rust", "42"]);
        assert!(result.job_specific_recommendations.is_empty());
    }

    #[test]
    fn test_score_is_clamped() {
        let result = AnalysisResult::from_reply(r#"{"ats_score": 140}"#, Language::En);
        assert_eq!(result.ats_score, Some(100));
    }

    #[test]
    fn test_non_object_reply_degrades() {
        let result = AnalysisResult::from_reply("[1, 2, 3]", Language::En);
        assert_eq!(result, AnalysisResult::parse_failure(Language::En));
    }

    #[test]
    fn test_placeholder_serialises_every_key() {
        let value = serde_json::to_value(AnalysisResult::parse_failure(Language::Tr)).unwrap();
        for key in [
            "overall_impression",
            "ats_score",
            "job_match_score",
            "strengths",
            "areas_for_improvement",
            "recommendations",
            "job_specific_recommendations",
            "keyword_suggestions",
        ] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
        assert!(value["ats_score"].is_null());
    }

    #[tokio::test]
    async fn test_analyze_sends_system_and_prompt() {
        let stub = StubChat::ok(
            r#"{"overall_impression": "Good CV", "ats_score": 75, "strengths": ["a"],
                "areas_for_improvement": ["b"], "recommendations": ["c"], "keyword_suggestions": ["d"]}"#,
        );
        let req = request(Language::En, None);
        let result = AnalysisInvoker::new(&stub).analyze(&req).await.unwrap();

        assert_eq!(result.overall_impression, "Good CV");
        assert_eq!(result.ats_score, Some(75));
        assert_eq!(result.recommendations, vec!["c"]);

        let seen = stub.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, ANALYSIS_SYSTEM);
        assert_eq!(seen[0].1, req.prompt());
    }

    #[tokio::test]
    async fn test_invalid_json_degrades_to_placeholder() {
        let stub = StubChat::ok("Sure! Here is my analysis: the CV is great.");
        let result = AnalysisInvoker::new(&stub)
            .analyze(&request(Language::En, None))
            .await
            .unwrap();

        assert!(result.overall_impression.contains("could not be parsed"));
        assert!(result.strengths.is_empty());
        assert!(result.areas_for_improvement.is_empty());
        assert!(result.recommendations.is_empty());
        assert!(result.job_specific_recommendations.is_empty());
        assert!(result.keyword_suggestions.is_empty());
    }

    #[tokio::test]
    async fn test_empty_reply_degrades_to_placeholder() {
        let stub = StubChat::ok("");
        let result = AnalysisInvoker::new(&stub)
            .analyze(&request(Language::Tr, Some("Rust")))
            .await
            .unwrap();
        assert_eq!(result, AnalysisResult::parse_failure(Language::Tr));
    }

    #[tokio::test]
    async fn test_remote_failure_propagates() {
        let stub = StubChat::status(503);
        let err = AnalysisInvoker::new(&stub)
            .analyze(&request(Language::En, None))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 503, .. }));
    }
}
