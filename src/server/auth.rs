//! Bearer-key authentication for the stats and admin routes.

use crate::server::{AppContext, AppError};
use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    typed_header::TypedHeader,
};
use reelgate_common::Error;

/// Check a presented bearer token against the configured key.
///
/// With no key configured every request passes.
fn check_auth(api_key: Option<&str>, bearer_token: Option<&str>) -> Result<(), Error> {
    match (api_key, bearer_token) {
        (None, _) => Ok(()),
        (Some(key), Some(token)) if key == token => Ok(()),
        (Some(_), Some(_)) => Err(Error::Unauthorized("invalid API key".into())),
        (Some(_), None) => Err(Error::Unauthorized("API key required".into())),
    }
}

/// Middleware for API key authentication
pub async fn api_auth_middleware(
    State(ctx): State<AppContext>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let bearer_token = bearer.as_ref().map(|b| b.token());
    check_auth(ctx.config.server.api_key.as_deref(), bearer_token)?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn open_without_key() {
        assert!(check_auth(None, None).is_ok());
        assert!(check_auth(None, Some("anything")).is_ok());
    }

    #[test]
    fn key_must_match() {
        assert!(check_auth(Some("k"), Some("k")).is_ok());
        assert_matches!(check_auth(Some("k"), Some("x")), Err(Error::Unauthorized(_)));
        assert_matches!(check_auth(Some("k"), None), Err(Error::Unauthorized(_)));
    }
}
