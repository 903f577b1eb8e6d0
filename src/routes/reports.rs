//! Report routes.
//!
//! GET /dashboard?period=  - Dashboard report
//! GET /customers?period=  - Customer analytics report
//! GET /products?period=   - Product analytics report
//! GET /sales?period=&format=json|csv - Dashboard report, or a CSV header stub

use axum::extract::Query;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::models::{ApiResponse, PeriodQuery, Report, ReportKind, SalesQuery};
use crate::period::{Period, DEFAULT_PERIOD};
use crate::state::AppState;

/// CSV export is a placeholder: only the header row is produced.
pub const SALES_CSV_HEADER: &str = "Data,Receita,Pedidos\n";

/// Build the reports router.
pub fn router() -> Router {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/customers", get(customers))
        .route("/products", get(products))
        .route("/sales", get(sales))
}

async fn dashboard(
    Extension(state): Extension<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<ApiResponse<Report>>, ApiError> {
    report(&state, ReportKind::Dashboard, query).await
}

async fn customers(
    Extension(state): Extension<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<ApiResponse<Report>>, ApiError> {
    report(&state, ReportKind::Customers, query).await
}

async fn products(
    Extension(state): Extension<AppState>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<ApiResponse<Report>>, ApiError> {
    report(&state, ReportKind::Products, query).await
}

async fn report(
    state: &AppState,
    kind: ReportKind,
    query: PeriodQuery,
) -> Result<Json<ApiResponse<Report>>, ApiError> {
    let period = query.period.as_deref().unwrap_or(DEFAULT_PERIOD);
    let report = state.engine.build_report(kind, period).await?;
    info!("Built {:?} report for period {}", kind, period);
    Ok(Json(ApiResponse::ok(report)))
}

/// Sales report. `format=csv` returns the header-only CSV stub without
/// touching the store; anything else returns the dashboard report as JSON.
///
/// The CSV filename uses the canonical token of the resolved period, never
/// the raw query value, so the header is always well-formed.
async fn sales(
    Extension(state): Extension<AppState>,
    Query(query): Query<SalesQuery>,
) -> Result<Response, ApiError> {
    let period = query.period.as_deref().unwrap_or(DEFAULT_PERIOD);

    if query.format.as_deref() == Some("csv") {
        let token = Period::from_token(period).token();
        debug!("Serving CSV sales stub for period {}", token);
        return Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"sales-{}.csv\"", token),
                ),
            ],
            SALES_CSV_HEADER,
        )
            .into_response());
    }

    let report = state.engine.build_dashboard(period).await?;
    Ok(Json(ApiResponse::ok(report)).into_response())
}
