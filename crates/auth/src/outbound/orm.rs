use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use app_core::error::AppError;
use app_core::time::now_fixed;
use app_orm::prelude::Users;
use app_orm::users;
use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    QueryFilter, Schema, TransactionTrait,
};

use super::repository::UserRepository;
use crate::domain::entity::oauth::{OAuthUserProfile, ProfileSync};
use crate::domain::entity::user::User;

/// `UserORM` is the SeaORM-backed [`UserRepository`].
///
/// Every operation runs under `timeout`; when the deadline passes the pending
/// future is dropped, which rolls back any open transaction.
pub struct UserORM {
    db: Arc<DatabaseConnection>,
    timeout: Duration,
}

impl UserORM {
    pub fn new(db: Arc<DatabaseConnection>, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    fn to_user(&self, model: users::Model) -> User {
        User {
            id: model.id,
            username: model.username,
            avatar_url: model.avatar_url,
            provider_user_id: model.provider_user_id,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    async fn with_deadline<T, F>(&self, op: &'static str, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(op, timeout_ms = self.timeout.as_millis() as u64, "Store operation timed out");
                Err(AppError::DatabaseTimeout)
            },
        }
    }

    async fn find_by_provider_id<C>(&self, db: &C, provider_user_id: &str) -> Result<Option<users::Model>, AppError>
    where
        C: ConnectionTrait + Send + Sync,
    {
        Ok(Users::find()
            .filter(users::Column::ProviderUserId.eq(provider_user_id))
            .one(db)
            .await?)
    }

    async fn upsert(&self, profile: OAuthUserProfile, sync: ProfileSync) -> Result<User, AppError> {
        let txn = self.db.begin().await?;

        let model = match self.find_by_provider_id(&txn, &profile.provider_user_id).await? {
            Some(existing) => match sync {
                ProfileSync::Freeze => existing,
                ProfileSync::Refresh => {
                    if existing.username == profile.username && existing.avatar_url == profile.avatar_url {
                        existing
                    } else {
                        let mut active = existing.into_active_model();
                        active.username = ActiveValue::Set(profile.username);
                        active.avatar_url = ActiveValue::Set(profile.avatar_url);
                        active.updated_at = ActiveValue::Set(now_fixed());
                        active.update(&txn).await?
                    }
                },
            },
            None => {
                let now = now_fixed();
                let new_user = users::ActiveModel {
                    username: ActiveValue::Set(profile.username),
                    avatar_url: ActiveValue::Set(profile.avatar_url),
                    provider_user_id: ActiveValue::Set(profile.provider_user_id.clone()),
                    created_at: ActiveValue::Set(now),
                    updated_at: ActiveValue::Set(now),
                    ..Default::default()
                };

                // A concurrent first login may have inserted the row already.
                Users::insert(new_user)
                    .on_conflict(
                        OnConflict::column(users::Column::ProviderUserId)
                            .do_nothing()
                            .to_owned(),
                    )
                    .exec_without_returning(&txn)
                    .await?;

                self.find_by_provider_id(&txn, &profile.provider_user_id)
                    .await?
                    .ok_or_else(|| {
                        tracing::error!("User row missing right after insert");
                        AppError::Internal
                    })?
            },
        };

        txn.commit().await?;

        Ok(self.to_user(model))
    }
}

#[async_trait]
impl UserRepository for UserORM {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        self.with_deadline("find_user_by_id", async {
            let user = Users::find_by_id(id).one(self.db.as_ref()).await?;
            Ok(user.map(|u| self.to_user(u)))
        })
        .await
    }

    async fn find_user_by_provider_id(&self, provider_user_id: &str) -> Result<Option<User>, AppError> {
        self.with_deadline("find_user_by_provider_id", async {
            let user = self.find_by_provider_id(self.db.as_ref(), provider_user_id).await?;
            Ok(user.map(|u| self.to_user(u)))
        })
        .await
    }

    async fn find_or_create_oauth_user(
        &self,
        profile: OAuthUserProfile,
        sync: ProfileSync,
    ) -> Result<User, AppError> {
        // Returning users that keep their stored profile need no transaction.
        if sync == ProfileSync::Freeze {
            if let Some(user) = self.find_user_by_provider_id(&profile.provider_user_id).await? {
                return Ok(user);
            }
        }

        self.with_deadline("find_or_create_oauth_user", self.upsert(profile, sync)).await
    }

    async fn ensure_schema(&self) -> Result<(), AppError> {
        self.with_deadline("ensure_schema", async {
            let backend = self.db.get_database_backend();
            let mut stmt = Schema::new(backend).create_table_from_entity(Users);
            stmt.if_not_exists();

            self.db.execute(backend.build(&stmt)).await?;
            Ok(())
        })
        .await
    }
}
