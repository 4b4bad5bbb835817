use axum::{extract::State, Json};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{instrument, warn};

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime: u64,
    pub timestamp: i64,
    pub database: &'static str,
}

/// Liveness probe. Always answers 200; a dead store shows up in the body
/// so orchestrators keep routing while operators see the degradation.
#[instrument(skip(state))]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.users.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            warn!(error = %e, "health probe could not reach the store");
            "disconnected"
        }
    };
    let status = if database == "connected" { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64,
        database,
    })
}
