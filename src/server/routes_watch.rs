//! `GET /api/watch/{media_type}/{id}/{index}`: playable streams of a title.

use crate::server::{AppContext, AppError};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use reelgate_common::Error;
use reelgate_parser::{format_size, normalize};
use serde::Serialize;

const MOVIE: &str = "movie";

pub fn watch_routes() -> Router<AppContext> {
    Router::new().route("/watch/:media_type/:id/:index", get(watch))
}

#[derive(Debug, Serialize)]
struct WatchResponse {
    media_type: String,
    id: i64,
    title: String,
    streams: Vec<StreamLink>,
}

#[derive(Debug, Serialize)]
struct StreamLink {
    label: String,
    name: String,
    url: String,
}

async fn watch(
    State(ctx): State<AppContext>,
    Path((media_type, id, index)): Path<(String, i64, u32)>,
) -> Result<Json<WatchResponse>, AppError> {
    let key = format!("{media_type}/{id}/{index}");
    let catalog = ctx
        .catalog
        .as_ref()
        .ok_or_else(|| Error::not_found("document", &key))?;
    let document = catalog
        .get_document(&media_type, id, index)
        .await?
        .ok_or_else(|| Error::not_found("document", &key))?;

    // Only movie documents carry playable files directly; series list
    // theirs per episode.
    let base_url = ctx.config.server.base_url();
    let streams = if document.media_type == MOVIE {
        document
            .telegram
            .iter()
            .map(|entry| StreamLink {
                label: format!("{} • {}", entry.quality, format_size(entry.size)),
                name: normalize(&entry.name),
                url: format!("{}/dl/{}/video.mkv", base_url, entry.id),
            })
            .collect()
    } else {
        Vec::new()
    };

    Ok(Json(WatchResponse {
        media_type: document.media_type,
        id: document.id,
        title: document.title,
        streams,
    }))
}
