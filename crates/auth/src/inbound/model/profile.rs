use serde::Serialize;

use crate::domain::inout::prelude::GetProfileOutput;

// ╔════════════════════════════╗
// ║    Get Profile             ║
// ╚════════════════════════════╝

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetProfileResponse {
    pub id: i64,
    pub username: String,
    pub avatar_url: Option<String>,
}

impl From<GetProfileOutput> for GetProfileResponse {
    fn from(output: GetProfileOutput) -> Self {
        Self { id: output.id, username: output.username, avatar_url: output.avatar_url }
    }
}
