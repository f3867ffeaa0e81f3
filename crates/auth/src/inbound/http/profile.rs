use axum::debug_handler;
use axum::response::{IntoResponse, Json};

use crate::inbound::extractor::CurrentUser;
use crate::inbound::model::prelude::*;

#[debug_handler(state = crate::inbound::state::AuthState)]
pub async fn get_profile(CurrentUser(profile): CurrentUser) -> impl IntoResponse {
    Json(GetProfileResponse::from(profile))
}
