//! Application state.

use std::sync::Arc;

use reword_gemini::{GeminiClient, GeminiError};
use reword_store::RocksStore;

use crate::config::ServiceConfig;
use crate::orchestrator::RequestOrchestrator;

/// Application state shared across handlers and the transport adapter.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<RocksStore>,

    /// The Gemini generation client.
    pub gemini: Arc<GeminiClient>,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create the application state, building the generation client from
    /// the configured key pool.
    pub fn new(store: Arc<RocksStore>, config: ServiceConfig) -> Result<Self, GeminiError> {
        let gemini = Arc::new(
            GeminiClient::new(config.gemini_api_keys.clone())?
                .with_model(config.gemini_model.clone()),
        );
        tracing::info!(
            keys = config.gemini_api_keys.len(),
            model = %config.gemini_model,
            "Gemini client configured"
        );

        Ok(Self {
            store,
            gemini,
            config,
        })
    }

    /// Build an orchestrator over this state's store and client.
    #[must_use]
    pub fn orchestrator(&self) -> RequestOrchestrator {
        RequestOrchestrator::new(self.store.clone(), self.gemini.clone(), &self.config)
    }
}
