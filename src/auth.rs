//! Credential checks against the `users` table.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::{info, warn};

use crate::entity::user::{self, Entity as User};
use crate::error::{AppError, AppResult};
use crate::password;
use crate::validation::Credentials;

#[derive(Debug, Clone)]
pub struct AuthService {
    db: DatabaseConnection,
}

impl AuthService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Resolves credentials to a user.
    ///
    /// Unknown usernames and wrong passwords both yield
    /// [`AppError::InvalidCredentials`], after the same amount of bcrypt work.
    pub async fn authenticate(&self, credentials: &Credentials) -> AppResult<user::Model> {
        let found = User::find()
            .filter(user::Column::Username.eq(credentials.username.as_str()))
            .one(&self.db)
            .await?;

        let Some(user) = found else {
            password::verify_dummy(&credentials.password).await;
            warn!(username = %credentials.username, "login failed");
            return Err(AppError::InvalidCredentials);
        };

        if !password::verify(&credentials.password, &user.password_hash).await? {
            warn!(username = %credentials.username, "login failed");
            return Err(AppError::InvalidCredentials);
        }

        Ok(user)
    }

    pub async fn find_user(&self, id: i32) -> AppResult<Option<user::Model>> {
        Ok(User::find_by_id(id).one(&self.db).await?)
    }

    /// Inserts a user unless the username is taken. Returns whether a row was
    /// created.
    pub async fn seed_user(&self, username: &str, plaintext: &str) -> AppResult<bool> {
        let existing = User::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            info!(%username, "user already exists, skipping");
            return Ok(false);
        }

        let password_hash = password::hash(plaintext).await?;
        user::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(password_hash),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(%username, "seeded user");
        Ok(true)
    }
}
