//! Application middleware: the session guard and the request logger.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{HeaderName, HeaderValue, Request, header};
use axum::middleware::Next;
use axum::response::Response;

use super::error::AppError;
use crate::jwt::TokenManager;

const REQUEST_ID_HEADER: &str = "x-request-id";
const TOKEN_QUERY_PARAM: &str = "token";
const BEARER_SCHEME: &str = "Bearer";
const UNAUTHORIZED_MSG: &str = "Unauthorized";

/// The verified subject of a guarded request.
///
/// Inserted into the request extensions by [`auth`]. Extracting it on a route
/// that is not behind the guard yields `401` instead of a panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthSubject {
    pub user_id: i64,
}

impl<S> FromRequestParts<S> for AuthSubject
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthSubject>()
            .copied()
            .ok_or_else(|| AppError::Unauthorized(UNAUTHORIZED_MSG.to_string()))
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case(BEARER_SCHEME))
        .map(|(_, token)| token.trim())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

fn query_token(parts: &Parts) -> Option<String> {
    let query = parts.uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == TOKEN_QUERY_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|token| !token.is_empty())
}

/// Session guard: authenticates the request from `Authorization: Bearer <token>`
/// or, failing that, the `token` query parameter.
///
/// Invalid and expired tokens are rejected with the same `401` body.
pub async fn auth(
    State(tm): State<Arc<dyn TokenManager>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    let token = bearer_token(&parts)
        .or_else(|| query_token(&parts))
        .ok_or_else(|| AppError::Unauthorized(UNAUTHORIZED_MSG.to_string()))?;

    let claims = tm.validate_session_token(&token).map_err(|err| {
        tracing::debug!("Rejected session token: {}", err);
        AppError::Unauthorized(UNAUTHORIZED_MSG.to_string())
    })?;

    parts.extensions.insert(AuthSubject { user_id: claims.sub });

    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Logs every request with a correlation id. Only the path is logged: query
/// strings can carry session tokens.
pub async fn request_logger(mut req: Request<Body>, next: Next) -> Response {
    let start_time = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    req.extensions_mut().insert(request_id.clone());

    tracing::info!(_cID = request_id, method = %method, path = %path, "Incoming request");

    let mut response = next.run(req).await;

    let status = response.status();
    let duration_ms = start_time.elapsed().as_millis();

    response.headers_mut().insert(
        HeaderName::from_static(REQUEST_ID_HEADER),
        HeaderValue::from_str(&request_id).unwrap_or_else(|_| HeaderValue::from_static("invalid-correlation-id")),
    );

    if status.is_server_error() {
        tracing::error!(_cID = request_id, method = %method, path = %path, status = %status, duration_ms,
            "Request completed with server error");
    } else if status.is_client_error() {
        tracing::warn!(_cID = request_id, method = %method, path = %path, status = %status, duration_ms,
            "Request completed with client error");
    } else {
        tracing::info!(_cID = request_id, method = %method, path = %path, status = %status, duration_ms,
            "Request completed successfully");
    }

    response
}
