//! Derived report routes.
//!
//! GET /realtime                      - 7-day dashboard plus placeholder live figures
//! GET /compare?current=&previous=    - Period-over-period comparison

use axum::extract::Query;
use axum::routing::get;
use axum::{Extension, Json, Router};
use tracing::info;

use crate::analytics::derived;
use crate::error::ApiError;
use crate::models::{ApiResponse, CompareQuery, ComparisonReport, RealtimeReport};
use crate::state::AppState;

const DEFAULT_CURRENT_PERIOD: &str = "7d";
const DEFAULT_PREVIOUS_PERIOD: &str = "30d";

/// Build the insights router.
pub fn router() -> Router {
    Router::new()
        .route("/realtime", get(realtime))
        .route("/compare", get(compare))
}

async fn realtime(
    Extension(state): Extension<AppState>,
) -> Result<Json<ApiResponse<RealtimeReport>>, ApiError> {
    let report = derived::realtime(&state.engine, state.realtime.as_ref()).await?;
    Ok(Json(ApiResponse::ok(report)))
}

/// Compare two periods. Fails as a whole if either report cannot be built.
async fn compare(
    Extension(state): Extension<AppState>,
    Query(query): Query<CompareQuery>,
) -> Result<Json<ApiResponse<ComparisonReport>>, ApiError> {
    let current = query.current.as_deref().unwrap_or(DEFAULT_CURRENT_PERIOD);
    let previous = query.previous.as_deref().unwrap_or(DEFAULT_PREVIOUS_PERIOD);

    let report = derived::compare(&state.engine, current, previous).await?;
    info!("Compared periods {} and {}", current, previous);
    Ok(Json(ApiResponse::ok(report)))
}
