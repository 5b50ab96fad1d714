use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::json;
use std::sync::Arc;

use crate::AppState;

pub mod cron;
pub mod customers;
pub mod invoices;
pub mod projects;

pub use cron::cron_routes;
pub use customers::customer_routes;
pub use invoices::invoice_routes;
pub use projects::project_routes;

pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<serde_json::Value>) {
    let db_healthy = crate::database::health_check(&state.db_pool).await;
    let status = if db_healthy { "healthy" } else { "degraded" };
    let code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(json!({
            "status": status,
            "service": "ledgerdesk-api",
            "database": db_healthy,
        })),
    )
}
