use axum::{Json, extract::State};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::CronAuth;
use crate::scheduler::RetrySummary;
use crate::state::AppState;

/// Run one retry pass over due dead-letter items.
#[utoipa::path(
    post,
    path = "/retry-run",
    tag = "Retry Trigger",
    operation_id = "triggerRetryRun",
    summary = "Run the retry scheduler",
    description = "Invoked by the periodic trigger. Raises a backlog alert if needed, then retries every due item within the run budget.",
    responses(
        (status = 200, description = "Run completed", body = RetrySummary),
        (status = 401, description = "Missing or wrong secret (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 409, description = "Another run is in progress (CONFLICT)", body = ErrorBody),
        (status = 503, description = "Store unavailable (SERVICE_UNAVAILABLE)", body = ErrorBody),
    ),
    security(("cron_secret" = [])),
)]
#[instrument(skip(state, _auth))]
pub async fn trigger_retry_run(
    _auth: CronAuth,
    State(state): State<AppState>,
) -> Result<Json<RetrySummary>, AppError> {
    let summary = state.scheduler.run_once().await?;
    Ok(Json(summary))
}
