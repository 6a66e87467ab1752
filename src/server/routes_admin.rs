//! `POST /api/admin/restart`: persist a restart marker and stop the server.

use crate::restart::RestartMarker;
use crate::server::{AppContext, AppError};
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use reelgate_common::{ChatId, MessageId};
use serde::Deserialize;

pub fn admin_routes() -> Router<AppContext> {
    Router::new().route("/admin/restart", post(restart))
}

/// The operator message to confirm on after restart.
#[derive(Debug, Deserialize)]
struct RestartRequest {
    chat_id: i64,
    message_id: i64,
}

async fn restart(
    State(ctx): State<AppContext>,
    Json(request): Json<RestartRequest>,
) -> Result<StatusCode, AppError> {
    let marker = RestartMarker::new(ChatId(request.chat_id), MessageId(request.message_id));
    marker.persist(&ctx.config.restart.marker_path).await?;

    tracing::warn!(message = %marker.message(), "Restart requested, shutting down");
    ctx.shutdown.cancel();

    Ok(StatusCode::ACCEPTED)
}
