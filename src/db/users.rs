//! User and session persistence.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;

use super::repository::is_unique_violation;
use super::Repository;
use crate::errors::AppError;
use crate::models::{User, UserRole};

/// A stored login session. Only the hash of the token secret is kept.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    pub secret_hash: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

const USER_COLUMNS: &str = "id, name, email, role, created_at, updated_at";

impl Repository {
    // ==================== USER OPERATIONS ====================

    /// Create a user. Fails with a conflict if the email is taken.
    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(UserRole::User.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            if is_unique_violation(&e) {
                return Err(AppError::Conflict(format!("Email {} already exists", email)));
            }
            return Err(e.into());
        }

        tracing::info!("Created user {}", id);

        Ok(User {
            id,
            name: name.to_string(),
            email: email.to_string(),
            role: UserRole::User,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Get a user by email (case-insensitive).
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Get a user together with their password hash, for login.
    pub async fn find_credentials(&self, email: &str) -> Result<Option<(User, String)>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| (user_from_row(&row), row.get("password_hash"))))
    }

    /// Get the password hash of a user.
    pub async fn get_password_hash(&self, user_id: &str) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT password_hash FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get("password_hash")))
    }

    /// Update name and email. Fails with a conflict if the email belongs to someone else.
    pub async fn update_profile(&self, id: &str, name: &str, email: &str) -> Result<User, AppError> {
        let existing = self
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

        let now = Utc::now().to_rfc3339();

        let result = sqlx::query("UPDATE users SET name = ?, email = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(email)
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await;

        if let Err(e) = result {
            if is_unique_violation(&e) {
                return Err(AppError::Conflict(format!("Email {} already exists", email)));
            }
            return Err(e.into());
        }

        self.increment_revision().await?;

        Ok(User {
            name: name.to_string(),
            email: email.to_string(),
            updated_at: now,
            ..existing
        })
    }

    /// Replace a user's password hash.
    pub async fn update_password_hash(&self, id: &str, password_hash: &str) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }

    // ==================== SESSION OPERATIONS ====================

    /// Store a new session and return its ID.
    pub async fn create_session(
        &self,
        user_id: &str,
        secret_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO sessions (id, user_id, secret_hash, created_at, expires_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(secret_hash)
        .bind(&now)
        .bind(expires_at.to_rfc3339_opts(SecondsFormat::Secs, true))
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// Get a session by ID.
    pub async fn get_session(&self, id: &str) -> Result<Option<SessionRecord>, AppError> {
        let row = sqlx::query("SELECT id, user_id, secret_hash, expires_at FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let expires_at: String = row.get("expires_at");
        let expires_at = DateTime::parse_from_rfc3339(&expires_at)
            .map_err(|e| AppError::Internal(format!("Corrupt session expiry: {}", e)))?
            .with_timezone(&Utc);

        Ok(Some(SessionRecord {
            id: row.get("id"),
            user_id: row.get("user_id"),
            secret_hash: row.get("secret_hash"),
            expires_at,
        }))
    }

    /// Delete a session.
    pub async fn delete_session(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete every session of a user except `keep`.
    pub async fn delete_other_sessions(&self, user_id: &str, keep: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = ? AND id <> ?")
            .bind(user_id)
            .bind(keep)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Remove sessions that expired before `now`.
    pub async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now.to_rfc3339_opts(SecondsFormat::Secs, true))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> User {
    let role: String = row.get("role");
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        role: UserRole::parse(&role).unwrap_or(UserRole::User),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
