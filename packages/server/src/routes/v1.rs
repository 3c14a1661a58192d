use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest("/dlq", dlq_routes())
}

fn dlq_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::dlq::list_dlq_items,
            handlers::dlq::clear_dlq
        ))
        .routes(routes!(handlers::dlq::get_dlq_stats))
        .routes(routes!(handlers::trigger::trigger_retry_run))
        .routes(routes!(
            handlers::dlq::get_dlq_item,
            handlers::dlq::delete_dlq_item
        ))
        .routes(routes!(handlers::dlq::requeue_dlq_item))
}
