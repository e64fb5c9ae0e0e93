//! Live connection listing.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{ConnectionListResponse, ConnectionSummaryDto, PaginationParams};
use crate::app_state::AppState;

/// `GET /connections`: List live sync connections.
#[utoipa::path(
    get,
    path = "/connections",
    tag = "Connections",
    summary = "List live connections",
    description = "Returns the sync connections currently registered, oldest first, paginated.",
    params(PaginationParams),
    responses(
        (status = 200, description = "Live connections", body = ConnectionListResponse),
    )
)]
pub async fn list_connections(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let summaries = state.registry.list().await;
    let (page, pagination) = params.paginate(summaries);
    Json(ConnectionListResponse {
        connections: page.into_iter().map(ConnectionSummaryDto::from).collect(),
        pagination,
    })
}

/// Connection routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new().route("/connections", get(list_connections))
}
