//! A centralized and idiomatic error handling module for the Axum web
//! application.
//!
//! Every layer returns [`AppError`]; the HTTP status and the public message
//! are decided here. Causes of server-side failures are logged, never sent.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use super::config::ConfigError;
use super::jwt::JwtError;
use super::oauth::OAuthError;
use super::random::RandomError;
use super::signed::AuthenticityError;

const INTERNAL_MSG: &str = "An internal server error occurred";
const INVALID_STATE_MSG: &str = "Invalid OAuth state";
const UNAUTHORIZED_MSG: &str = "Unauthorized";
const PROVIDER_MSG: &str = "OAuth provider request failed";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid request format: {0}")]
    RequestFormat(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("OAuth state cookie failed verification")]
    Authenticity(#[from] AuthenticityError),

    #[error("OAuth state does not match the state cookie")]
    StateMismatch,

    // Internal Libraries
    #[error("Config operation failed")]
    Config(#[from] ConfigError),

    #[error("JWT operation failed")]
    Jwt(#[from] JwtError),

    #[error("OAuth operation failed")]
    OAuth(#[from] OAuthError),

    #[error("Random token generation failed")]
    Random(#[from] RandomError),

    // Third Party Libraries
    #[error("Sea ORM operation failed")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database operation timed out")]
    DatabaseTimeout,

    #[error("An internal server error occurred")]
    Internal,
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

fn internal() -> (StatusCode, String, Option<serde_json::Value>) {
    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MSG.to_string(), None)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self {
            AppError::Validation(err) => {
                let details = json!(err.field_errors());
                (StatusCode::UNPROCESSABLE_ENTITY, "Validation failed".to_string(), Some(details))
            },
            AppError::RequestFormat(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),

            AppError::Authenticity(err) => {
                tracing::warn!("OAuth state rejected: {}", err);
                (StatusCode::FORBIDDEN, INVALID_STATE_MSG.to_string(), None)
            },
            AppError::StateMismatch => {
                tracing::warn!("OAuth state rejected: mismatch");
                (StatusCode::FORBIDDEN, INVALID_STATE_MSG.to_string(), None)
            },

            // Internal Libraries
            AppError::Config(err) => {
                tracing::error!("Config getter error: {:?}", err);
                internal()
            },
            AppError::Jwt(err) => match err {
                JwtError::TokenExpired | JwtError::InvalidToken => {
                    tracing::debug!("Session token rejected: {}", err);
                    (StatusCode::UNAUTHORIZED, UNAUTHORIZED_MSG.to_string(), None)
                },
                JwtError::TokenCreation => {
                    tracing::error!("JWT error: {:?}", err);
                    internal()
                },
            },
            AppError::OAuth(err) => match err {
                OAuthError::ProviderNotFound(_) => (StatusCode::NOT_FOUND, err.to_string(), None),
                OAuthError::Exchange(_) | OAuthError::ProfileFetch(_) | OAuthError::HttpClient(_) => {
                    tracing::error!("OAuth provider error: {:?}", err);
                    (StatusCode::BAD_GATEWAY, PROVIDER_MSG.to_string(), None)
                },
                OAuthError::InvalidUrl(_) => {
                    tracing::error!("OAuth configuration error: {:?}", err);
                    internal()
                },
            },
            AppError::Random(err) => {
                tracing::error!("Random token error: {:?}", err);
                internal()
            },

            // Third Party Libraries
            AppError::Database(err) => {
                tracing::error!("Database error: {:?}", err);
                internal()
            },
            AppError::DatabaseTimeout => {
                tracing::error!("Database operation exceeded its deadline");
                internal()
            },
            AppError::Internal => internal(),
        };

        let body = Json(ErrorResponse { message, details });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use sea_orm::DbErr;
    use serde_json::Value;
    use validator::{ValidationError, ValidationErrors};

    use super::*;

    /// Helper function to extract JSON response body from an Axum response
    async fn extract_json_response(response: Response<Body>) -> (StatusCode, Value) {
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        let json: Value = serde_json::from_slice(&body_bytes).expect("Failed to parse JSON response");
        (status, json)
    }

    async fn assert_internal(error: AppError) {
        let (status, json) = extract_json_response(error.into_response()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], "An internal server error occurred");
        assert!(json["details"].is_null());
    }

    #[tokio::test]
    async fn test_request_format_error() {
        let error = AppError::RequestFormat("Invalid query".to_string());
        let (status, json) = extract_json_response(error.into_response()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Invalid query");
        assert!(json["details"].is_null());
    }

    #[tokio::test]
    async fn test_not_found_error() {
        let error = AppError::NotFound("User not found".to_string());
        let (status, json) = extract_json_response(error.into_response()).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["message"], "User not found");
    }

    #[tokio::test]
    async fn test_state_errors_share_one_body() {
        let (status_a, json_a) =
            extract_json_response(AppError::Authenticity(AuthenticityError::BadSignature).into_response()).await;
        let (status_b, json_b) = extract_json_response(AppError::StateMismatch.into_response()).await;
        let (status_c, json_c) =
            extract_json_response(AppError::Authenticity(AuthenticityError::Malformed).into_response()).await;

        assert_eq!(status_a, StatusCode::FORBIDDEN);
        assert_eq!(status_b, StatusCode::FORBIDDEN);
        assert_eq!(status_c, StatusCode::FORBIDDEN);
        assert_eq!(json_a["message"], "Invalid OAuth state");
        assert_eq!(json_a, json_b);
        assert_eq!(json_b, json_c);
    }

    #[tokio::test]
    async fn test_invalid_and_expired_token_share_one_body() {
        let (status_a, json_a) = extract_json_response(AppError::Jwt(JwtError::InvalidToken).into_response()).await;
        let (status_b, json_b) = extract_json_response(AppError::Jwt(JwtError::TokenExpired).into_response()).await;

        assert_eq!(status_a, StatusCode::UNAUTHORIZED);
        assert_eq!(status_b, StatusCode::UNAUTHORIZED);
        assert_eq!(json_a["message"], "Unauthorized");
        assert_eq!(json_a, json_b);
    }

    #[tokio::test]
    async fn test_token_creation_error() {
        assert_internal(AppError::Jwt(JwtError::TokenCreation)).await;
    }

    #[tokio::test]
    async fn test_provider_errors_are_bad_gateway() {
        for err in [
            OAuthError::Exchange("invalid_grant".to_string()),
            OAuthError::ProfileFetch("status: 401".to_string()),
        ] {
            let (status, json) = extract_json_response(AppError::OAuth(err).into_response()).await;

            assert_eq!(status, StatusCode::BAD_GATEWAY);
            assert_eq!(json["message"], "OAuth provider request failed");
        }
    }

    #[tokio::test]
    async fn test_provider_error_does_not_leak_cause() {
        let error = AppError::OAuth(OAuthError::Exchange("client_secret=abc".to_string()));
        let (_, json) = extract_json_response(error.into_response()).await;

        assert!(!json.to_string().contains("client_secret"));
    }

    #[tokio::test]
    async fn test_unknown_provider_is_not_found() {
        let error = AppError::OAuth(OAuthError::ProviderNotFound("gitlab".to_string()));
        let (status, json) = extract_json_response(error.into_response()).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["message"], "Provider not found: gitlab");
    }

    #[tokio::test]
    async fn test_database_errors() {
        assert_internal(AppError::Database(DbErr::Custom("connection reset".to_string()))).await;
        assert_internal(AppError::DatabaseTimeout).await;
    }

    #[tokio::test]
    async fn test_config_error() {
        let raw = config::ConfigError::NotFound("jwt.secret".to_string());
        assert_internal(AppError::Config(ConfigError::Load(raw))).await;
    }

    #[tokio::test]
    async fn test_internal_error() {
        assert_internal(AppError::Internal).await;
    }

    #[tokio::test]
    async fn test_validation_error_structure() {
        let mut errors = ValidationErrors::new();

        let mut state_error = ValidationError::new("length");
        state_error.message = Some("state is required".into());
        errors.add("state", state_error);

        let error = AppError::Validation(errors);
        let (status, json) = extract_json_response(error.into_response()).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["message"], "Validation failed");
        assert!(json["details"]["state"].is_array());
    }
}
