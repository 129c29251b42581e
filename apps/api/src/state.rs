use std::sync::Arc;

use crate::config::Config;
use crate::extraction::orchestrator::ExtractionOrchestrator;
use crate::llm_client::ChatCompletion;

/// Shared application state injected into all route handlers via Axum extractors.
/// Holds no per-request mutable state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: ExtractionOrchestrator,
    /// Chat-completion backend. `LlmClient` in production.
    pub llm: Arc<dyn ChatCompletion>,
    pub config: Config,
}
