use app_core::error::AppError;
use app_core::middleware::AuthSubject;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::domain::inout::prelude::*;
use crate::inbound::state::AuthState;

/// The live user behind a guarded request.
///
/// Requires the session guard; resolves the subject through the profile use
/// case, so a token whose user has been deleted yields `404` for every handler
/// that takes this extractor.
#[derive(Debug)]
pub struct CurrentUser(pub GetProfileOutput);

impl FromRequestParts<AuthState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AuthState) -> Result<Self, Self::Rejection> {
        let subject = AuthSubject::from_request_parts(parts, state).await?;
        let profile = state.profile.get_profile(GetProfileInput { user_id: subject.user_id }).await?;

        Ok(Self(profile))
    }
}
