use std::sync::Arc;

use app_core::config::Config;

use crate::usecase::authn::AuthnUseCase;
use crate::usecase::profile::ProfileUseCase;

/// Immutable request context, built once at startup and cloned per request.
#[derive(Clone)]
pub struct AuthState {
    pub config: Arc<Config>,
    pub authn: Arc<dyn AuthnUseCase>,
    pub profile: Arc<dyn ProfileUseCase>,
}

impl AuthState {
    pub fn new(config: Arc<Config>, authn: Arc<dyn AuthnUseCase>, profile: Arc<dyn ProfileUseCase>) -> Self {
        Self { config, authn, profile }
    }
}
