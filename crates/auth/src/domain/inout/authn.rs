use chrono::{DateTime, Utc};
use validator::Validate;

// ╔════════════════════════════╗
// ║        Login OAuth         ║
// ╚════════════════════════════╝

#[derive(Debug, Validate)]
pub struct OAuthLoginInput {
    #[validate(length(min = 1, message = "provider cannot be empty"))]
    pub provider: String,
}

#[derive(Debug)]
pub struct OAuthLoginOutput {
    /// Provider consent URL carrying the freshly minted state.
    pub auth_url: String,
    /// Signed state, to be stored in the state cookie.
    pub state_cookie: String,
}

// ╔════════════════════════════╗
// ║   Login OAuth Callback     ║
// ╚════════════════════════════╝

#[derive(Debug, Validate)]
pub struct OAuthCallbackInput {
    #[validate(length(min = 1, message = "provider cannot be empty"))]
    pub provider: String,

    /// Signed value of the state cookie, if the browser sent one.
    pub state_cookie: Option<String>,

    pub state: Option<String>,
    pub code: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct OAuthCallbackOutput {
    pub user_id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// Client landing page with the token and its expiration attached.
    pub redirect_url: String,
}
