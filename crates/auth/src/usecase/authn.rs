use std::sync::Arc;

use app_core::config::Config;
use app_core::error::AppError;
use app_core::jwt::{IssuedToken, TokenManager};
use app_core::oauth::{OAuthManager, public_url};
use app_core::random::generate_token;
use app_core::signed::{AuthenticityError, CookieSigner};
use async_trait::async_trait;
use subtle::ConstantTimeEq;
use validator::Validate;

use crate::domain::entity::oauth::{OAuthUserProfile, ProfileSync};
use crate::domain::inout::prelude::*;
use crate::outbound::repository::UserRepository;

const DEFAULT_CLIENT_CALLBACK_PATH: &str = "/auth/complete";
const PROVIDER_DENIED_MSG: &str = "OAuth authorization was not granted";
const MISSING_CODE_MSG: &str = "Missing authorization code";

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait AuthnUseCase: Send + Sync {
    /// Mints a fresh state and returns the provider consent URL along with the
    /// signed state for the cookie.
    async fn oauth_login(&self, input: OAuthLoginInput) -> Result<OAuthLoginOutput, AppError>;

    /// Verifies the returning state, exchanges the code, resolves the local
    /// user and issues a session token for it.
    async fn oauth_callback(&self, input: OAuthCallbackInput) -> Result<OAuthCallbackOutput, AppError>;
}

#[derive(Clone)]
pub struct AuthnService {
    config: Arc<Config>,
    signer: CookieSigner,
    token: Arc<dyn TokenManager>,
    oauth: OAuthManager,
    repo: Arc<dyn UserRepository>,
}

impl AuthnService {
    pub fn new(
        config: Arc<Config>,
        signer: CookieSigner,
        token: Arc<dyn TokenManager>,
        oauth: OAuthManager,
        repo: Arc<dyn UserRepository>,
    ) -> Self {
        Self { config, signer, token, oauth, repo }
    }

    /// Checks the signed cookie and compares the state it carries with the one
    /// the provider sent back, in constant time.
    fn verify_state(&self, state_cookie: Option<&str>, state: Option<&str>) -> Result<(), AppError> {
        let signed = state_cookie.ok_or(AuthenticityError::Missing)?;
        let expected = self.signer.verify(signed)?;

        let received = state.unwrap_or_default();
        if !bool::from(expected.as_bytes().ct_eq(received.as_bytes())) {
            return Err(AppError::StateMismatch);
        }

        Ok(())
    }

    fn profile_sync(&self) -> Result<ProfileSync, AppError> {
        Ok(ProfileSync::from(self.config.get_or::<bool>("oauth.refresh_profile_on_login", false)?))
    }

    /// Builds `{public_origin}{client_callback_path}?token=..&expires_at=..`.
    fn client_redirect_url(&self, issued: &IssuedToken) -> Result<String, AppError> {
        let origin: String = self.config.get("server.public_origin")?;
        let path: String = self
            .config
            .get_or("server.client_callback_path", DEFAULT_CLIENT_CALLBACK_PATH.to_string())?;

        let mut url = public_url(&origin, &path).map_err(|e| {
            tracing::error!("Invalid client redirect configuration: {}", e);
            AppError::Internal
        })?;

        url.query_pairs_mut()
            .append_pair("token", &issued.token)
            .append_pair("expires_at", &issued.expires_at.timestamp().to_string());

        Ok(url.into())
    }
}

#[async_trait]
impl AuthnUseCase for AuthnService {
    async fn oauth_login(&self, input: OAuthLoginInput) -> Result<OAuthLoginOutput, AppError> {
        input.validate()?;

        let provider = self.oauth.get_provider(&input.provider)?;

        let state = generate_token()?;
        let auth_url = provider.authorization_url(&state);
        let state_cookie = self.signer.sign(&state);

        tracing::info!(provider = %input.provider, stage = "redirected", "OAuth login started");

        Ok(OAuthLoginOutput { auth_url, state_cookie })
    }

    async fn oauth_callback(&self, input: OAuthCallbackInput) -> Result<OAuthCallbackOutput, AppError> {
        input.validate()?;

        let provider = self.oauth.get_provider(&input.provider)?;

        self.verify_state(input.state_cookie.as_deref(), input.state.as_deref())?;
        tracing::info!(provider = %input.provider, stage = "verified", "OAuth state verified");

        if let Some(err) = input.error {
            tracing::warn!(provider = %input.provider, error = %err, "Provider reported an authorization error");
            return Err(AppError::Forbidden(PROVIDER_DENIED_MSG.to_string()));
        }

        let code = input
            .code
            .filter(|code| !code.is_empty())
            .ok_or_else(|| AppError::Forbidden(MISSING_CODE_MSG.to_string()))?;

        let provider_access_token = provider.exchange_code(code).await?;
        tracing::info!(provider = %input.provider, stage = "exchanged", "OAuth code exchanged");

        let profile = provider.fetch_profile(&provider_access_token).await?;
        tracing::info!(provider = %input.provider, stage = "profile_fetched", "OAuth profile fetched");

        let user = self
            .repo
            .find_or_create_oauth_user(OAuthUserProfile::from(profile), self.profile_sync()?)
            .await?;
        tracing::info!(provider = %input.provider, stage = "user_resolved", user_id = user.id, "OAuth user resolved");

        let issued = self.token.issue_session_token(user.id)?;
        let redirect_url = self.client_redirect_url(&issued)?;
        tracing::info!(provider = %input.provider, stage = "token_issued", user_id = user.id, "Session token issued");

        Ok(OAuthCallbackOutput { user_id: user.id, token: issued.token, expires_at: issued.expires_at, redirect_url })
    }
}
