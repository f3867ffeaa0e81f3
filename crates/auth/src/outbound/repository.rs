use app_core::error::AppError;
use async_trait::async_trait;

use crate::domain::entity::oauth::{OAuthUserProfile, ProfileSync};
use crate::domain::entity::user::User;

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait UserRepository: Send + Sync {
    /// Finds a single user by their local ID.
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    /// Finds a single user by the identity the provider assigned them.
    async fn find_user_by_provider_id(&self, provider_user_id: &str) -> Result<Option<User>, AppError>;

    /// Returns the user bound to `profile.provider_user_id`, creating it from
    /// the profile on first login.
    ///
    /// With [`ProfileSync::Freeze`] a returning user is answered by a plain
    /// lookup. Otherwise lookup and insert happen in one transaction and the
    /// insert is conflict-tolerant, so concurrent first logins of the same
    /// identity resolve to a single row. With [`ProfileSync::Refresh`] an
    /// existing user's username and avatar are overwritten in the same
    /// transaction.
    ///
    /// # Errors
    ///
    /// * `AppError::Database` if a query fails; the transaction is rolled back.
    /// * `AppError::DatabaseTimeout` if the store misses its deadline.
    async fn find_or_create_oauth_user(&self, profile: OAuthUserProfile, sync: ProfileSync)
    -> Result<User, AppError>;

    /// Creates the `users` table if it does not exist yet.
    async fn ensure_schema(&self) -> Result<(), AppError>;
}
