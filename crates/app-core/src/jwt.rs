//! Session tokens: signed, expiring bearer credentials (HS256 JWT).
//!
//! A token is self-contained. Validity is the signature plus the expiration
//! check, nothing is stored server side. The expiration check is done here
//! rather than by `jsonwebtoken` so the clock can be supplied explicitly:
//! a token is valid while `now <= exp + leeway` and expired afterwards.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default session lifetime: 14 days.
pub const DEFAULT_LIFETIME_SECS: i64 = 14 * 24 * 60 * 60;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum JwtError {
    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token format or signature")]
    InvalidToken,

    #[error("Failed to create token")]
    TokenCreation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// A freshly issued token together with the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait TokenManager: Send + Sync {
    /// Issues a token for `user_id` that expires after the configured lifetime.
    fn issue_session_token(&self, user_id: i64) -> Result<IssuedToken, JwtError>;

    /// Issues a token with an explicit expiration instant.
    fn encode_session_token(&self, user_id: i64, expires_at: DateTime<Utc>) -> Result<String, JwtError>;

    fn validate_session_token(&self, token: &str) -> Result<Claims, JwtError>;

    fn validate_session_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, JwtError>;
}

#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub lifetime_secs: i64,
    pub leeway_secs: i64,
}

pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self { config, encoding_key, decoding_key }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        // expiry is checked against an explicit clock in `validate_session_token_at`
        validation.validate_exp = false;
        validation
    }
}

impl TokenManager for JwtService {
    fn issue_session_token(&self, user_id: i64) -> Result<IssuedToken, JwtError> {
        let expires_at = Duration::try_seconds(self.config.lifetime_secs)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                tracing::error!(lifetime_secs = self.config.lifetime_secs, "Session lifetime is out of range");
                JwtError::TokenCreation
            })?;
        let token = self.encode_session_token(user_id, expires_at)?;

        Ok(IssuedToken { token, expires_at })
    }

    fn encode_session_token(&self, user_id: i64, expires_at: DateTime<Utc>) -> Result<String, JwtError> {
        let claims = Claims {
            sub: user_id,
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            exp: expires_at.timestamp(),
            iat: Utc::now().timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode session token: {:?}", e);
            JwtError::TokenCreation
        })
    }

    fn validate_session_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.validate_session_token_at(token, Utc::now())
    }

    fn validate_session_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, JwtError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation())
            .map(|data| data.claims)
            .map_err(|_| JwtError::InvalidToken)?;

        if now.timestamp() > claims.exp.saturating_add(self.config.leeway_secs) {
            return Err(JwtError::TokenExpired);
        }

        Ok(claims)
    }
}
