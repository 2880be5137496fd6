//! HTTP handler for the shortage report

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::models::ShortageLine;
use crate::services::ShortageReporter;
use crate::AppState;

/// Variants whose pending demand exceeds stock
pub async fn list_shortages(State(state): State<AppState>) -> AppResult<Json<Vec<ShortageLine>>> {
    let reporter = ShortageReporter::new(state.store);
    Ok(Json(reporter.report().await?))
}
