//! `GET /dl/{token}/{name}`: ranged download of a stored file.

use crate::server::{AppContext, AppError};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue},
    response::Response,
    routing::get,
    Router,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reelgate_common::Error;

/// Characters left unescaped in an RFC 5987 `filename*` value.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

pub fn stream_routes() -> Router<AppContext> {
    Router::new().route("/dl/:token/:name", get(stream_file))
}

async fn stream_file(
    State(ctx): State<AppContext>,
    Path((token, name)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let range_header = headers.get(header::RANGE).and_then(|h| h.to_str().ok());
    let stream = ctx.streamer.serve(&token, range_header).await?;

    let raw_name = if stream.file_name.is_empty() {
        name.as_str()
    } else {
        stream.file_name.as_str()
    };
    let file_name = reelgate_parser::normalize(raw_name);

    let mut builder = Response::builder()
        .status(stream.status())
        .header(header::CONTENT_TYPE, stream.content_type.as_str())
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_DISPOSITION, content_disposition(&file_name));
    if let Some(length) = stream.content_length() {
        builder = builder.header(header::CONTENT_LENGTH, length);
    }
    if let Some(range) = stream.content_range() {
        builder = builder.header(header::CONTENT_RANGE, range);
    }

    tracing::debug!(
        session = %stream.session_id,
        status = %stream.status(),
        file = %file_name,
        "Streaming response"
    );

    builder
        .body(Body::from_stream(stream.body))
        .map_err(|e| AppError(Error::internal(e.to_string())))
}

/// `inline` disposition with an ASCII fallback and a UTF-8 `filename*`.
pub fn content_disposition(file_name: &str) -> HeaderValue {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();
    let encoded = utf8_percent_encode(file_name, ATTR_CHAR);
    let value = format!("inline; filename=\"{fallback}\"; filename*=UTF-8''{encoded}");
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("inline"))
}
