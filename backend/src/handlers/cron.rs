use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::Json,
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::warn;

use crate::error::{ApiResult, AppError};
use crate::jobs::{OverdueCheckSummary, OverdueReminderJob};
use crate::AppState;

pub fn cron_routes() -> Router<Arc<AppState>> {
    Router::new().route("/check-overdue", get(check_overdue))
}

/// Trigger endpoint for the overdue reminder job, hit by an external
/// scheduler. The bearer secret is verified before anything touches the
/// database.
async fn check_overdue(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<OverdueCheckSummary>> {
    let expected = format!("Bearer {}", state.config.cron_secret);
    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    if provided != Some(expected.as_str()) {
        warn!("Rejected cron trigger with missing or invalid secret");
        return Err(AppError::Unauthorized("Unauthorized".to_string()));
    }

    let job = OverdueReminderJob::new(state.db_pool.clone(), state.mailer.clone());
    let result = job.run().await?;

    Ok(Json(result.summary))
}
