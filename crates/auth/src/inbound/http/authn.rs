use app_core::error::AppError;
use app_core::extractors::{AppPath, AppQuery};
use axum::debug_handler;
use axum::extract::State;
use axum::response::Redirect;
use tower_cookies::cookie::{SameSite, time};
use tower_cookies::{Cookie, Cookies};

use crate::domain::inout::prelude::*;
use crate::inbound::model::prelude::*;
use crate::inbound::state::AuthState;

pub(crate) const COOKIE_OAUTH_STATE: &str = "__oauth_state";
const DEFAULT_STATE_TTL_SECS: i64 = 600;

/// The state cookie is only ever sent back to this path.
fn callback_path(provider: &str) -> String {
    format!("/oauth/{provider}/callback")
}

fn build_state_cookie(state: &AuthState, provider: &str, value: String) -> Result<Cookie<'static>, AppError> {
    let ttl_secs: i64 = state.config.get_or("oauth.state_ttl_secs", DEFAULT_STATE_TTL_SECS)?;
    let public_origin: String = state.config.get("server.public_origin")?;

    Ok(Cookie::build((COOKIE_OAUTH_STATE, value))
        .http_only(true)
        .secure(public_origin.starts_with("https://"))
        .path(callback_path(provider))
        .max_age(time::Duration::seconds(ttl_secs))
        .same_site(SameSite::Lax)
        .build())
}

#[debug_handler]
pub async fn oauth_login(
    State(state): State<AuthState>,
    cookies: Cookies,
    AppPath(provider): AppPath<String>,
) -> Result<Redirect, AppError> {
    let output = state.authn.oauth_login(OAuthLoginInput { provider: provider.clone() }).await?;

    cookies.add(build_state_cookie(&state, &provider, output.state_cookie)?);

    Ok(Redirect::temporary(&output.auth_url))
}

#[debug_handler]
pub async fn oauth_callback(
    State(state): State<AuthState>,
    cookies: Cookies,
    AppPath(provider): AppPath<String>,
    query: Result<AppQuery<OAuthCallbackRequest>, AppError>,
) -> Result<Redirect, AppError> {
    let state_cookie = cookies.get(COOKIE_OAUTH_STATE).map(|cookie| cookie.value().to_string());

    // The state is single-use: invalidate it before anything is checked,
    // including the query itself.
    cookies.remove(Cookie::build((COOKIE_OAUTH_STATE, "")).path(callback_path(&provider)).build());

    let AppQuery(query) = query?;

    let output = state
        .authn
        .oauth_callback(OAuthCallbackInput {
            provider,
            state_cookie,
            state: query.state,
            code: query.code,
            error: query.error,
        })
        .await?;

    Ok(Redirect::temporary(&output.redirect_url))
}
