//! Category lookups.

use sqlx::Row;

use super::Repository;
use crate::errors::AppError;
use crate::models::Category;

impl Repository {
    /// List all categories ordered by name.
    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let rows = sqlx::query(
            "SELECT id, name, description, icon, reminder_days_default FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(category_from_row).collect())
    }

    /// List categories used by at least one item in a vault the user can access.
    pub async fn list_categories_with_items(&self, user_id: &str) -> Result<Vec<Category>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT c.id, c.name, c.description, c.icon, c.reminder_days_default
            FROM categories c
            JOIN items i ON i.category_id = c.id
            JOIN vault_members m ON m.vault_id = i.vault_id
            WHERE m.user_id = ?
            ORDER BY c.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(category_from_row).collect())
    }

    /// Get a category by ID.
    pub async fn get_category(&self, id: &str) -> Result<Option<Category>, AppError> {
        let row = sqlx::query(
            "SELECT id, name, description, icon, reminder_days_default FROM categories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(category_from_row))
    }

    /// Get a category by name.
    pub async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>, AppError> {
        let row = sqlx::query(
            "SELECT id, name, description, icon, reminder_days_default FROM categories WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(category_from_row))
    }
}

fn category_from_row(row: &sqlx::sqlite::SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        icon: row.get("icon"),
        reminder_days_default: row.get("reminder_days_default"),
    }
}
