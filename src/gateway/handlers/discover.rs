use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::{error, info};

use super::super::AppState;

#[derive(serde::Deserialize)]
pub(crate) struct DiscoverRequest {
    #[serde(default)]
    query: String,
}

/// `POST /api/discover`
///
/// Body: `{ "query": "..." }` → `{ "result": "..." }`.
pub(crate) async fn api_discover(
    State(state): State<AppState>,
    Json(req): Json<DiscoverRequest>,
) -> impl IntoResponse {
    let query = req.query.trim();
    if query.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "query is required" })),
        )
            .into_response();
    }

    info!(query_len = query.len(), "discovery request received");

    match state.coordinator.run_discovery(query).await {
        Ok(result) => Json(serde_json::json!({ "result": result })).into_response(),
        Err(e) => {
            error!(error = %e, "discovery turn failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
