use serde::Deserialize;

// ╔════════════════════════════╗
// ║   Login OAuth Callback     ║
// ╚════════════════════════════╝

/// Query string the provider appends when redirecting back.
///
/// Every field is optional so a malformed callback still reaches the handler,
/// which consumes the state cookie before rejecting it.
#[derive(Debug, Deserialize)]
pub struct OAuthCallbackRequest {
    pub state: Option<String>,
    pub code: Option<String>,
    pub error: Option<String>,
}
