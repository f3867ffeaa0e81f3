//! OAuth 2.0 authorization-code client for a GitHub-style provider.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet, RedirectUrl, Scope,
    TokenResponse, TokenUrl,
};
use reqwest::{Client, ClientBuilder, redirect};
use serde::Deserialize;
use thiserror::Error;

pub const GITHUB_AUTH_URL: &str = "https://github.com/login/oauth/authorize";
pub const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
pub const GITHUB_PROFILE_URL: &str = "https://api.github.com/user";

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("Invalid URL format: {0}")]
    InvalidUrl(#[from] oauth2::url::ParseError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("OAuth token exchange failed: {0}")]
    Exchange(String),

    #[error("OAuth profile fetch failed: {0}")]
    ProfileFetch(String),

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),
}

/// Resolves `path` under the service's public origin. A path prefix on the
/// origin (`https://example.com/app`) is kept, so every URL handed out to
/// browsers and providers lives under the same base.
pub fn public_url(origin: &str, path: &str) -> Result<url::Url, url::ParseError> {
    url::Url::parse(&format!("{}/{}", origin.trim_end_matches('/'), path.trim_start_matches('/')))
}

/// Identity data returned by the provider after a successful exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub provider_user_id: String,
    pub login_name: String,
    pub avatar_url: Option<String>,
}

#[async_trait::async_trait]
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait OAuthProvider: Send + Sync {
    /// Route key of the provider, e.g. `github`.
    fn name(&self) -> &str;

    /// Builds the consent URL that carries `state` back to the callback.
    fn authorization_url(&self, state: &str) -> String;

    /// Exchanges an authorization code for a provider access token.
    async fn exchange_code(&self, code: String) -> Result<String, OAuthError>;

    /// Fetches the user's profile from the provider using an access token.
    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, OAuthError>;
}

#[derive(Debug, Clone)]
pub struct GitHubOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub profile_url: String,
    pub scopes: Vec<String>,
    pub timeout: Duration,
}

impl GitHubOAuthConfig {
    /// Config pointing at the public GitHub endpoints with the `read:user` scope.
    pub fn github(client_id: String, client_secret: String, redirect_url: String) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_url,
            auth_url: GITHUB_AUTH_URL.to_string(),
            token_url: GITHUB_TOKEN_URL.to_string(),
            profile_url: GITHUB_PROFILE_URL.to_string(),
            scopes: vec!["read:user".to_string()],
            timeout: Duration::from_secs(10),
        }
    }
}

type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

#[derive(Debug)]
pub struct GitHubOAuthProvider {
    name: String,
    client: ConfiguredClient,
    scopes: Vec<Scope>,
    profile_url: reqwest::Url,
    http: Client,
}

impl GitHubOAuthProvider {
    pub fn new(name: &str, config: GitHubOAuthConfig) -> Result<Self, OAuthError> {
        let client = BasicClient::new(ClientId::new(config.client_id))
            .set_client_secret(ClientSecret::new(config.client_secret))
            .set_auth_uri(AuthUrl::new(config.auth_url)?)
            .set_token_uri(TokenUrl::new(config.token_url)?)
            .set_redirect_uri(RedirectUrl::new(config.redirect_url)?);

        // Provider calls must not follow redirects and must finish within the deadline.
        let http = ClientBuilder::new()
            .redirect(redirect::Policy::none())
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            name: name.to_string(),
            client,
            scopes: config.scopes.into_iter().map(Scope::new).collect(),
            profile_url: reqwest::Url::parse(&config.profile_url)?,
            http,
        })
    }
}

#[async_trait::async_trait]
impl OAuthProvider for GitHubOAuthProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn authorization_url(&self, state: &str) -> String {
        let state = state.to_string();
        let (auth_url, _) = self
            .client
            .authorize_url(move || CsrfToken::new(state))
            .add_scopes(self.scopes.iter().cloned())
            .url();

        auth_url.to_string()
    }

    async fn exchange_code(&self, code: String) -> Result<String, OAuthError> {
        let token_result = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .request_async(&self.http)
            .await
            .map_err(|e| {
                let error_msg = match &e {
                    oauth2::RequestTokenError::ServerResponse(err) => {
                        format!("Server response error: {:?} {:?}", err.error(), err.error_description())
                    },
                    oauth2::RequestTokenError::Parse(_, body) => match std::str::from_utf8(body) {
                        Ok(body_str) => format!("Parse error. Response body: {body_str}"),
                        Err(_) => "Parse error with non-UTF8 response".to_string(),
                    },
                    _ => format!("Token exchange error: {e:?}"),
                };
                tracing::error!(provider = %self.name, "OAuth token exchange failed: {}", error_msg);
                OAuthError::Exchange(error_msg)
            })?;

        Ok(token_result.access_token().secret().to_string())
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, OAuthError> {
        #[derive(Deserialize)]
        struct GitHubUser {
            id: i64,
            login: String,
            avatar_url: Option<String>,
        }

        let fail = |stage: &str, err: reqwest::Error| {
            let error_msg = format!("{stage}: {err}");
            tracing::error!(provider = %self.name, "OAuth profile fetch failed: {}", error_msg);
            OAuthError::ProfileFetch(error_msg)
        };

        let user: GitHubUser = self
            .http
            .get(self.profile_url.clone())
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| fail("request", e))?
            .error_for_status()
            .map_err(|e| fail("status", e))?
            .json()
            .await
            .map_err(|e| fail("decode", e))?;

        Ok(ProviderProfile {
            provider_user_id: user.id.to_string(),
            login_name: user.login,
            avatar_url: user.avatar_url.filter(|url| !url.trim().is_empty()),
        })
    }
}

/// Registry of the configured providers, keyed by their route name.
#[derive(Clone, Default)]
pub struct OAuthManager {
    providers: HashMap<String, Arc<dyn OAuthProvider>>,
}

impl OAuthManager {
    pub fn new() -> Self {
        Self { providers: HashMap::new() }
    }

    pub fn add_provider(&mut self, provider: Arc<dyn OAuthProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn get_provider(&self, name: &str) -> Result<&Arc<dyn OAuthProvider>, OAuthError> {
        self.providers
            .get(name)
            .ok_or_else(|| OAuthError::ProviderNotFound(name.to_string()))
    }

    pub fn has_provider(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn config_for(server_uri: &str) -> GitHubOAuthConfig {
        GitHubOAuthConfig {
            client_id: "client_id".to_string(),
            client_secret: "client_secret".to_string(),
            redirect_url: "https://example.com/oauth/github/callback".to_string(),
            auth_url: format!("{server_uri}/login/oauth/authorize"),
            token_url: format!("{server_uri}/login/oauth/access_token"),
            profile_url: format!("{server_uri}/user"),
            scopes: vec!["read:user".to_string()],
            timeout: Duration::from_millis(500),
        }
    }

    #[test]
    fn test_public_url_keeps_origin_prefix() {
        assert_eq!(
            public_url("https://example.com", "/oauth/github/callback").unwrap().as_str(),
            "https://example.com/oauth/github/callback"
        );
        assert_eq!(
            public_url("https://example.com/app/", "/auth/complete").unwrap().as_str(),
            "https://example.com/app/auth/complete"
        );
        assert!(public_url("not a url", "/auth/complete").is_err());
    }

    #[test]
    fn test_oauth_manager() {
        let mut provider = MockOAuthProvider::new();
        provider.expect_name().return_const("github".to_string());

        let mut manager = OAuthManager::new();
        manager.add_provider(Arc::new(provider));

        assert!(manager.has_provider("github"));
        assert!(manager.get_provider("github").is_ok());
        assert!(matches!(manager.get_provider("gitlab"), Err(OAuthError::ProviderNotFound(name)) if name == "gitlab"));
    }

    #[test]
    fn test_invalid_redirect_url() {
        let config = GitHubOAuthConfig::github("id".into(), "secret".into(), "invalid_url".into());

        let provider = GitHubOAuthProvider::new("github", config);

        assert!(matches!(provider.unwrap_err(), OAuthError::InvalidUrl(_)));
    }

    #[test]
    fn test_authorization_url() {
        let config = GitHubOAuthConfig::github(
            "client_id".to_string(),
            "client_secret".to_string(),
            "https://example.com/oauth/github/callback".to_string(),
        );
        let provider = GitHubOAuthProvider::new("github", config).unwrap();

        let url = provider.authorization_url("state-123");

        assert!(url.starts_with(GITHUB_AUTH_URL));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=client_id"));
        assert!(url.contains("state=state-123"));
        assert!(url.contains("scope=read%3Auser"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fexample.com%2Foauth%2Fgithub%2Fcallback"));
        assert_eq!(provider.name(), "github");
    }

    #[tokio::test]
    async fn test_exchange_code_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .and(body_string_contains("code=the-code"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"access_token": "gho_token", "token_type": "bearer"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = GitHubOAuthProvider::new("github", config_for(&server.uri())).unwrap();

        let token = provider.exchange_code("the-code".to_string()).await.unwrap();

        assert_eq!(token, "gho_token");
    }

    #[tokio::test]
    async fn test_exchange_code_rejected_by_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({"error": "invalid_grant"})))
            .mount(&server)
            .await;

        let provider = GitHubOAuthProvider::new("github", config_for(&server.uri())).unwrap();

        let result = provider.exchange_code("bad-code".to_string()).await;

        assert!(matches!(result.unwrap_err(), OAuthError::Exchange(_)));
    }

    #[tokio::test]
    async fn test_exchange_code_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"access_token": "gho_token", "token_type": "bearer"}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let provider = GitHubOAuthProvider::new("github", config_for(&server.uri())).unwrap();

        let result = provider.exchange_code("slow-code".to_string()).await;

        assert!(matches!(result.unwrap_err(), OAuthError::Exchange(_)));
    }

    #[tokio::test]
    async fn test_fetch_profile_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("authorization", "Bearer gho_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 42,
                "login": "john",
                "avatar_url": null,
                "name": "John"
            })))
            .mount(&server)
            .await;

        let provider = GitHubOAuthProvider::new("github", config_for(&server.uri())).unwrap();

        let profile = provider.fetch_profile("gho_token").await.unwrap();

        assert_eq!(
            profile,
            ProviderProfile { provider_user_id: "42".to_string(), login_name: "john".to_string(), avatar_url: None }
        );
    }

    #[tokio::test]
    async fn test_fetch_profile_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let provider = GitHubOAuthProvider::new("github", config_for(&server.uri())).unwrap();

        let result = provider.fetch_profile("expired").await;

        assert!(matches!(result.unwrap_err(), OAuthError::ProfileFetch(_)));
    }

    #[tokio::test]
    async fn test_fetch_profile_undecodable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let provider = GitHubOAuthProvider::new("github", config_for(&server.uri())).unwrap();

        let result = provider.fetch_profile("gho_token").await;

        assert!(matches!(result.unwrap_err(), OAuthError::ProfileFetch(_)));
    }
}
