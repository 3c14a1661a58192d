use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use tracing::{info, instrument};

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AdminAuth;
use crate::models::dlq::*;
use crate::state::AppState;

/// List dead-letter items with current stats.
#[utoipa::path(
    get,
    path = "",
    tag = "Dead Letter Queue",
    operation_id = "listDlqItems",
    summary = "List dead-letter items",
    description = "Returns queued webhook deliveries, newest first, together with backlog stats.",
    params(ListDlqParams),
    responses(
        (status = 200, description = "Items and stats", body = DlqListResponse),
        (status = 400, description = "Limit out of range (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 503, description = "Store unavailable (SERVICE_UNAVAILABLE)", body = ErrorBody),
    ),
    security(("admin_token" = [])),
)]
#[instrument(skip(state, _auth))]
pub async fn list_dlq_items(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Query(params): Query<ListDlqParams>,
) -> Result<Json<DlqListResponse>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    if !(1..=MAX_LIST_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {MAX_LIST_LIMIT}"
        )));
    }

    let items = state.store.list_items(Some(limit)).await?;
    let stats = state.store.stats().await?;

    Ok(Json(DlqListResponse {
        items: items.into_iter().map(Into::into).collect(),
        stats: stats.into(),
    }))
}

/// Get backlog statistics.
#[utoipa::path(
    get,
    path = "/stats",
    tag = "Dead Letter Queue",
    operation_id = "getDlqStats",
    summary = "Get dead-letter stats",
    responses(
        (status = 200, description = "Backlog statistics", body = DlqStatsResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 503, description = "Store unavailable (SERVICE_UNAVAILABLE)", body = ErrorBody),
    ),
    security(("admin_token" = [])),
)]
#[instrument(skip(state, _auth))]
pub async fn get_dlq_stats(
    _auth: AdminAuth,
    State(state): State<AppState>,
) -> Result<Json<DlqStatsResponse>, AppError> {
    Ok(Json(state.store.stats().await?.into()))
}

/// Get one dead-letter item including its retry history.
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Dead Letter Queue",
    operation_id = "getDlqItem",
    summary = "Get dead-letter item",
    params(("id" = i32, Path, description = "Dead-letter item ID")),
    responses(
        (status = 200, description = "Item details", body = DeadLetterItemResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Item not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("admin_token" = [])),
)]
#[instrument(skip(state, _auth), fields(id))]
pub async fn get_dlq_item(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DeadLetterItemResponse>, AppError> {
    let item = state
        .store
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Dead-letter item {} not found", id)))?;

    Ok(Json(item.into()))
}

/// Delete one dead-letter item.
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Dead Letter Queue",
    operation_id = "deleteDlqItem",
    summary = "Delete dead-letter item",
    description = "Removes the item without retrying it. Reports whether it existed.",
    params(("id" = i32, Path, description = "Dead-letter item ID")),
    responses(
        (status = 200, description = "Deletion result", body = DeleteDlqResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 503, description = "Store unavailable (SERVICE_UNAVAILABLE)", body = ErrorBody),
    ),
    security(("admin_token" = [])),
)]
#[instrument(skip(state, _auth), fields(id))]
pub async fn delete_dlq_item(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DeleteDlqResponse>, AppError> {
    let removed = state.store.remove(id).await?;
    if removed {
        info!(id, "Dead-letter item deleted by admin");
    }

    Ok(Json(DeleteDlqResponse { removed }))
}

/// Delete every dead-letter item.
#[utoipa::path(
    delete,
    path = "",
    tag = "Dead Letter Queue",
    operation_id = "clearDlq",
    summary = "Clear the dead-letter queue",
    description = "Deletes items one by one. Individual failures are skipped and logged; the response counts what was removed.",
    responses(
        (status = 200, description = "Number of items removed", body = ClearDlqResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 503, description = "Store unavailable (SERVICE_UNAVAILABLE)", body = ErrorBody),
    ),
    security(("admin_token" = [])),
)]
#[instrument(skip(state, _auth))]
pub async fn clear_dlq(
    _auth: AdminAuth,
    State(state): State<AppState>,
) -> Result<Json<ClearDlqResponse>, AppError> {
    let removed = state.store.clear_all().await?;
    info!(removed, "Dead-letter queue cleared by admin");

    Ok(Json(ClearDlqResponse { removed }))
}

/// Give an item a fresh set of retries.
#[utoipa::path(
    post,
    path = "/{id}/requeue",
    tag = "Dead Letter Queue",
    operation_id = "requeueDlqItem",
    summary = "Requeue dead-letter item",
    description = "Resets the attempt count to zero and makes the item due immediately. Use after fixing whatever made it fail.",
    params(("id" = i32, Path, description = "Dead-letter item ID")),
    responses(
        (status = 200, description = "Requeue result", body = RequeueDlqResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 503, description = "Store unavailable (SERVICE_UNAVAILABLE)", body = ErrorBody),
    ),
    security(("admin_token" = [])),
)]
#[instrument(skip(state, _auth), fields(id))]
pub async fn requeue_dlq_item(
    _auth: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<RequeueDlqResponse>, AppError> {
    let requeued = state.store.requeue(id, Utc::now()).await?;
    if requeued {
        info!(id, "Dead-letter item requeued by admin");
    }

    Ok(Json(RequeueDlqResponse { requeued }))
}
