//! OAuth login: the start/callback flow, the user store and the profile
//! endpoint.

mod domain;
mod inbound;
mod outbound;
mod usecase;

use std::sync::Arc;
use std::time::Duration;

use app_core::config::Config;
use app_core::error::AppError;
use app_core::jwt::TokenManager;
use app_core::oauth::OAuthManager;
use app_core::signed::CookieSigner;
pub use inbound::router::create_router;
pub use inbound::state::AuthState;
use sea_orm::DatabaseConnection;

use crate::outbound::orm::UserORM;
use crate::outbound::repository::UserRepository;
use crate::usecase::authn::AuthnService;
use crate::usecase::profile::ProfileService;

pub struct Dependency {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<Config>,
    pub token: Arc<dyn TokenManager>,
    pub oauth: OAuthManager,
    pub signer: CookieSigner,
    /// Deadline applied to every store operation.
    pub store_timeout: Duration,
}

pub fn new(dep: Dependency) -> AuthState {
    let repo = Arc::new(UserORM::new(dep.db, dep.store_timeout));

    let authn_svc = Arc::new(AuthnService::new(dep.config.clone(), dep.signer, dep.token, dep.oauth, repo.clone()));
    let profile_svc = Arc::new(ProfileService::new(repo));

    AuthState::new(dep.config, authn_svc, profile_svc)
}

/// Creates the tables this module owns, if they do not exist yet.
pub async fn migrate(db: Arc<DatabaseConnection>, store_timeout: Duration) -> Result<(), AppError> {
    UserORM::new(db, store_timeout).ensure_schema().await
}
