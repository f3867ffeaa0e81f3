use std::sync::Arc;

use app_core::jwt::TokenManager;
use app_core::middleware::auth;
use axum::routing::get;
use axum::{Router, middleware};

use crate::inbound::http::authn::*;
use crate::inbound::http::profile::*;
use crate::inbound::state::AuthState;

/// Routes of the auth module. Expects a `CookieManagerLayer` further out.
pub fn create_router(state: AuthState, tm: Arc<dyn TokenManager>) -> Router {
    let protected_routes = Router::new()
        // profile scope
        .route("/auth/me", get(get_profile))
        .route_layer(middleware::from_fn_with_state(tm, auth));

    let public_routes = Router::new()
        // authentication scope
        .route("/oauth/{provider}/start", get(oauth_login))
        .route("/oauth/{provider}/callback", get(oauth_callback));

    Router::new().merge(public_routes).merge(protected_routes).with_state(state)
}
