use std::sync::Arc;

use crate::analysis::content::ContentGenerator;
use crate::config::Config;
use crate::store::AnalysisStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// History collection. JSON file by default, PostgreSQL when DATABASE_URL is set.
    pub store: Arc<dyn AnalysisStore>,
    /// Pluggable content generator. Default: FallbackContentGenerator.
    pub generator: Arc<dyn ContentGenerator>,
    pub config: Config,
}
