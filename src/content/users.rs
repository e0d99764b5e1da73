//! Profile directory scoped by owner

use super::ServiceError;
use crate::database::Database;
use crate::models::{ProfileAttributes, Subject, UserProfile};

use serde::Deserialize;
use validator::Validate;

const PROFILE_COLUMNS: &str = "user_id, first_name, last_name, email, gender, active";

/// Display attributes a subject may change on its own profile.
///
/// Identity and id are not part of the update; they come from the subject.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[serde(flatten)]
    #[validate(nested)]
    pub attributes: ProfileAttributes,
}

/// User profile service
#[derive(Clone)]
pub struct UserDirectory {
    db: Database,
}

impl UserDirectory {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<UserProfile>, ServiceError> {
        let sql = format!("SELECT {} FROM users ORDER BY user_id", PROFILE_COLUMNS);
        Ok(self.db.query(&sql, &[]).await?)
    }

    pub async fn get(&self, user_id: i64) -> Result<UserProfile, ServiceError> {
        let sql = format!("SELECT {} FROM users WHERE user_id = $1", PROFILE_COLUMNS);
        self.db
            .query_single(&sql, &[user_id.into()])
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User not found: {}", user_id)))
    }

    /// Update the subject's own display attributes
    pub async fn update_own(
        &self,
        subject: Subject,
        update: ProfileUpdate,
    ) -> Result<(), ServiceError> {
        update.validate()?;
        let attrs = update.attributes;

        let updated = self
            .db
            .execute(
                r#"UPDATE users
                   SET first_name = $1, last_name = $2, gender = $3
                   WHERE user_id = $4"#,
                &[
                    attrs.first_name.into(),
                    attrs.last_name.into(),
                    attrs.gender.into(),
                    subject.user_id().into(),
                ],
            )
            .await?;

        if updated == 0 {
            return Err(ServiceError::NotFound(format!(
                "User not found: {}",
                subject.user_id()
            )));
        }

        Ok(())
    }

    /// Mark the subject's profile inactive; token refresh stops working
    pub async fn deactivate(&self, subject: Subject) -> Result<(), ServiceError> {
        let updated = self
            .db
            .execute(
                "UPDATE users SET active = $1 WHERE user_id = $2",
                &[0i64.into(), subject.user_id().into()],
            )
            .await?;

        if updated == 0 {
            return Err(ServiceError::NotFound(format!(
                "User not found: {}",
                subject.user_id()
            )));
        }

        tracing::info!(user_id = subject.user_id(), "User deactivated");

        Ok(())
    }

    /// Remove the subject's posts, profile and credential in one unit of work
    pub async fn delete_own(&self, subject: Subject) -> Result<(), ServiceError> {
        let mut uow = self.db.begin().await?;

        let email: Option<(String,)> = uow
            .query_single(
                "SELECT email FROM users WHERE user_id = $1",
                &[subject.user_id().into()],
            )
            .await?;

        let (email,) = email.ok_or_else(|| {
            ServiceError::NotFound(format!("User not found: {}", subject.user_id()))
        })?;

        uow.execute(
            "DELETE FROM posts WHERE user_id = $1",
            &[subject.user_id().into()],
        )
        .await?;
        uow.execute(
            "DELETE FROM users WHERE user_id = $1",
            &[subject.user_id().into()],
        )
        .await?;
        uow.execute(
            "DELETE FROM auth_credentials WHERE email = $1",
            &[email.into()],
        )
        .await?;

        uow.commit().await?;

        tracing::info!(user_id = subject.user_id(), "User deleted");

        Ok(())
    }
}
