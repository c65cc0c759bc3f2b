//! Vault and membership persistence.
//!
//! Owners are stored as `OWNER` members, so access checks only look at
//! `vault_members`.

use chrono::Utc;
use sqlx::Row;

use super::repository::{bump_revision, is_unique_violation, normalize_text};
use super::Repository;
use crate::errors::AppError;
use crate::models::{CreateVaultRequest, UpdateVaultRequest, User, Vault, VaultMember, VaultRole};

/// A vault as seen by one user.
#[derive(Debug, Clone)]
pub struct VaultAccess {
    pub vault: Vault,
    pub role: VaultRole,
    pub member_count: usize,
}

const VAULT_SELECT: &str = r#"
    SELECT v.id, v.name, v.description, v.owner_id, v.created_at, v.updated_at,
           u.name AS owner_name, u.email AS owner_email,
           m.role AS member_role,
           (SELECT COUNT(*) FROM vault_members c WHERE c.vault_id = v.id) AS member_count
    FROM vaults v
    JOIN users u ON u.id = v.owner_id
    JOIN vault_members m ON m.vault_id = v.id
"#;

impl Repository {
    // ==================== VAULT OPERATIONS ====================

    /// List vaults the user owns or is a member of.
    pub async fn list_vaults_for_user(&self, user_id: &str) -> Result<Vec<VaultAccess>, AppError> {
        let rows = sqlx::query(&format!("{VAULT_SELECT} WHERE m.user_id = ? ORDER BY v.name"))
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(vault_access_from_row).collect())
    }

    /// Get a vault as seen by a user. `None` if it does not exist or the user has no access.
    pub async fn get_vault_for_user(
        &self,
        vault_id: &str,
        user_id: &str,
    ) -> Result<Option<VaultAccess>, AppError> {
        let row = sqlx::query(&format!("{VAULT_SELECT} WHERE v.id = ? AND m.user_id = ?"))
            .bind(vault_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(vault_access_from_row))
    }

    /// Role of a user in a vault, if any.
    pub async fn get_member_role(
        &self,
        vault_id: &str,
        user_id: &str,
    ) -> Result<Option<VaultRole>, AppError> {
        let row = sqlx::query("SELECT role FROM vault_members WHERE vault_id = ? AND user_id = ?")
            .bind(vault_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.and_then(|row| {
            let role: String = row.get("role");
            VaultRole::parse(&role)
        }))
    }

    /// List members of a vault, owner first.
    pub async fn list_members(&self, vault_id: &str) -> Result<Vec<VaultMember>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT m.user_id, u.name, u.email, m.role, m.joined_at
            FROM vault_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.vault_id = ?
            ORDER BY CASE m.role WHEN 'OWNER' THEN 0 WHEN 'EDITOR' THEN 1 ELSE 2 END, u.name
            "#,
        )
        .bind(vault_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let role: String = row.get("role");
                VaultMember {
                    user_id: row.get("user_id"),
                    name: row.get("name"),
                    email: row.get("email"),
                    role: VaultRole::parse(&role).unwrap_or(VaultRole::Viewer),
                    joined_at: row.get("joined_at"),
                }
            })
            .collect())
    }

    /// Create a vault owned by `owner`, who becomes its first member.
    pub async fn create_vault(
        &self,
        owner: &User,
        request: &CreateVaultRequest,
    ) -> Result<VaultAccess, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let name = request.name.trim().to_string();
        let description = normalize_text(request.description.as_deref());

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO vaults (id, name, description, owner_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&name)
        .bind(&description)
        .bind(&owner.id)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            if is_unique_violation(&e) {
                return Err(AppError::Conflict(format!(
                    "Vault with name {} already exists",
                    name
                )));
            }
            return Err(e.into());
        }

        sqlx::query("INSERT INTO vault_members (vault_id, user_id, role, joined_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(&owner.id)
            .bind(VaultRole::Owner.as_str())
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        bump_revision(&mut tx).await?;
        tx.commit().await?;

        tracing::info!("Created vault {} for user {}", id, owner.id);

        Ok(VaultAccess {
            vault: Vault {
                id,
                name,
                description,
                owner_id: owner.id.clone(),
                owner_name: owner.name.clone(),
                owner_email: owner.email.clone(),
                created_at: now.clone(),
                updated_at: now,
            },
            role: VaultRole::Owner,
            member_count: 1,
        })
    }

    /// Update a vault's name and description.
    pub async fn update_vault(
        &self,
        existing: &Vault,
        request: &UpdateVaultRequest,
    ) -> Result<Vault, AppError> {
        let now = Utc::now().to_rfc3339();
        let name = request
            .name
            .as_deref()
            .map(str::trim)
            .unwrap_or(existing.name.as_str())
            .to_string();
        let description = match request.description.as_deref() {
            Some(d) => normalize_text(Some(d)),
            None => existing.description.clone(),
        };

        let result = sqlx::query("UPDATE vaults SET name = ?, description = ?, updated_at = ? WHERE id = ?")
            .bind(&name)
            .bind(&description)
            .bind(&now)
            .bind(&existing.id)
            .execute(&self.pool)
            .await;

        match result {
            Ok(r) if r.rows_affected() == 0 => {
                return Err(AppError::NotFound(format!("Vault {} not found", existing.id)));
            }
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(AppError::Conflict(format!(
                    "Vault with name {} already exists",
                    name
                )));
            }
            Err(e) => return Err(e.into()),
        }

        self.increment_revision().await?;

        Ok(Vault {
            name,
            description,
            updated_at: now,
            ..existing.clone()
        })
    }

    /// Delete a vault with its members, items and attachments.
    pub async fn delete_vault(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM vaults WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Vault {} not found", id)));
        }

        self.increment_revision().await?;
        tracing::info!("Deleted vault {}", id);
        Ok(())
    }

    /// Add a member to a vault.
    pub async fn add_member(
        &self,
        vault_id: &str,
        user: &User,
        role: VaultRole,
    ) -> Result<VaultMember, AppError> {
        let now = Utc::now().to_rfc3339();

        let result =
            sqlx::query("INSERT INTO vault_members (vault_id, user_id, role, joined_at) VALUES (?, ?, ?, ?)")
                .bind(vault_id)
                .bind(&user.id)
                .bind(role.as_str())
                .bind(&now)
                .execute(&self.pool)
                .await;

        if let Err(e) = result {
            if is_unique_violation(&e) {
                return Err(AppError::Conflict(format!(
                    "{} is already a member of this vault",
                    user.email
                )));
            }
            return Err(e.into());
        }

        self.increment_revision().await?;

        Ok(VaultMember {
            user_id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role,
            joined_at: now,
        })
    }

    /// Remove a member from a vault.
    pub async fn remove_member(&self, vault_id: &str, user_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM vault_members WHERE vault_id = ? AND user_id = ?")
            .bind(vault_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "User {} is not a member of vault {}",
                user_id, vault_id
            )));
        }

        self.increment_revision().await?;
        Ok(())
    }
}

fn vault_access_from_row(row: &sqlx::sqlite::SqliteRow) -> VaultAccess {
    let role: String = row.get("member_role");
    let member_count: i64 = row.get("member_count");
    VaultAccess {
        vault: Vault {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get("description"),
            owner_id: row.get("owner_id"),
            owner_name: row.get("owner_name"),
            owner_email: row.get("owner_email"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        },
        role: VaultRole::parse(&role).unwrap_or(VaultRole::Viewer),
        member_count: usize::try_from(member_count).unwrap_or(0),
    }
}
