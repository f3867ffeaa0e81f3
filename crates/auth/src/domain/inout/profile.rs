use validator::Validate;

// ╔════════════════════════════╗
// ║        Get Profile         ║
// ╚════════════════════════════╝

#[derive(Debug, Validate)]
pub struct GetProfileInput {
    #[validate(range(min = 1, message = "user id must be positive"))]
    pub user_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetProfileOutput {
    pub id: i64,
    pub username: String,
    pub avatar_url: Option<String>,
}
