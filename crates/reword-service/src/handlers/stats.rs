//! Aggregate reporting handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{Duration, Utc};
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

/// Aggregate statistics response.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Total number of known accounts.
    pub total_users: u64,
    /// Paraphrases generated in the trailing 24 hours.
    pub paraphrases_last_24h: u64,
}

/// Aggregate statistics endpoint.
///
/// Both figures are eventually consistent snapshots, reporting only.
pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>, ApiError> {
    use reword_store::Store;

    let total_users = state.store.count_accounts()?;
    let paraphrases_last_24h = state
        .store
        .count_events_since(Utc::now() - Duration::hours(24))?;

    Ok(Json(StatsResponse {
        total_users,
        paraphrases_last_24h,
    }))
}
