use std::sync::Arc;

use app_core::error::AppError;
use async_trait::async_trait;
use validator::Validate;

use crate::domain::entity::user::User;
use crate::domain::inout::prelude::*;
use crate::outbound::repository::UserRepository;

const USER_NOT_FOUND_MSG: &str = "User not found";

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait ProfileUseCase: Send + Sync {
    async fn get_profile(&self, input: GetProfileInput) -> Result<GetProfileOutput, AppError>;
}

#[derive(Clone)]
pub struct ProfileService {
    repo: Arc<dyn UserRepository>,
}

impl ProfileService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    async fn get_user_by_id(&self, user_id: i64) -> Result<User, AppError> {
        self.repo
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND_MSG.to_string()))
    }
}

#[async_trait]
impl ProfileUseCase for ProfileService {
    async fn get_profile(&self, input: GetProfileInput) -> Result<GetProfileOutput, AppError> {
        // A token may outlive its user; ids that cannot exist are simply unknown.
        if input.validate().is_err() {
            return Err(AppError::NotFound(USER_NOT_FOUND_MSG.to_string()));
        }

        let user = self.get_user_by_id(input.user_id).await?;

        Ok(GetProfileOutput { id: user.id, username: user.username, avatar_url: user.avatar_url })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sea_orm::DbErr;

    use super::*;
    use crate::outbound::repository::MockUserRepository;

    #[tokio::test]
    async fn test_get_profile_success() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_user_by_id().withf(|id| *id == 7).times(1).returning(|_| {
            Box::pin(async move {
                Ok(Some(User {
                    id: 7,
                    username: "john".to_string(),
                    avatar_url: Some("https://a.example/7".to_string()),
                    provider_user_id: "42".to_string(),
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                }))
            })
        });

        let svc = ProfileService::new(Arc::new(repo));

        let output = svc.get_profile(GetProfileInput { user_id: 7 }).await.unwrap();

        assert_eq!(
            output,
            GetProfileOutput {
                id: 7,
                username: "john".to_string(),
                avatar_url: Some("https://a.example/7".to_string())
            }
        );
    }

    #[tokio::test]
    async fn test_get_profile_deleted_user() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_user_by_id().returning(|_| Box::pin(async move { Ok(None) }));

        let svc = ProfileService::new(Arc::new(repo));

        let result = svc.get_profile(GetProfileInput { user_id: 7 }).await;

        assert!(matches!(result, Err(AppError::NotFound(msg)) if msg == "User not found"));
    }

    #[tokio::test]
    async fn test_get_profile_invalid_id_skips_store() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_user_by_id().times(0);

        let svc = ProfileService::new(Arc::new(repo));

        let result = svc.get_profile(GetProfileInput { user_id: 0 }).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_profile_store_failure() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_user_by_id()
            .returning(|_| Box::pin(async move { Err(AppError::Database(DbErr::Custom("down".to_string()))) }));

        let svc = ProfileService::new(Arc::new(repo));

        let result = svc.get_profile(GetProfileInput { user_id: 7 }).await;

        assert!(matches!(result, Err(AppError::Database(_))));
    }
}
