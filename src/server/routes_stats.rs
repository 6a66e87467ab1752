//! `GET /api/stats`: credential loads for operators.

use crate::server::AppContext;
use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde_json::{Map, Value};

pub fn stats_routes() -> Router<AppContext> {
    Router::new().route("/stats", get(stats))
}

/// Label to load, busiest credential first.
async fn stats(State(ctx): State<AppContext>) -> impl IntoResponse {
    let loads: Map<String, Value> = ctx
        .pool()
        .snapshot()
        .into_iter()
        .map(|(label, load)| (label, Value::from(load)))
        .collect();
    Json(loads)
}
