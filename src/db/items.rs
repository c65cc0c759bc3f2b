//! Item and attachment persistence.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::Row;

use super::repository::{bump_revision, normalize_text};
use super::Repository;
use crate::errors::AppError;
use crate::models::{
    Attachment, AttachmentType, CreateAttachmentRequest, CreateItemRequest, Item, ItemState,
    UpdateItemRequest,
};

/// A stored item joined with the names clients display next to it.
#[derive(Debug, Clone)]
pub struct ItemRow {
    pub item: Item,
    pub vault_name: String,
    pub category_name: Option<String>,
}

/// Optional filters for item listings. `search` matches title, brand and
/// model case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub vault_id: Option<String>,
    pub category_id: Option<String>,
    pub search: Option<String>,
}

const ITEM_SELECT: &str = r#"
    SELECT i.id, i.vault_id, i.category_id, i.title, i.brand, i.model, i.serial_number,
           i.purchase_date, i.price, i.warranty_months, i.state, i.notes,
           i.created_at, i.updated_at, i.version,
           v.name AS vault_name, c.name AS category_name
    FROM items i
    JOIN vaults v ON v.id = i.vault_id
    LEFT JOIN categories c ON c.id = i.category_id
"#;

const ATTACHMENT_COLUMNS: &str =
    "a.id, a.item_id, a.file_url, a.file_name, a.file_size, a.file_type, a.kind, a.uploaded_at, a.uploaded_by";

impl Repository {
    // ==================== ITEM OPERATIONS ====================

    /// List items in vaults the user can access, newest first.
    pub async fn list_items_for_user(
        &self,
        user_id: &str,
        filter: &ItemFilter,
    ) -> Result<Vec<ItemRow>, AppError> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        let rows = sqlx::query(&format!(
            r#"{ITEM_SELECT}
            JOIN vault_members m ON m.vault_id = i.vault_id AND m.user_id = ?
            WHERE (? IS NULL OR i.vault_id = ?)
              AND (? IS NULL OR i.category_id = ?)
              AND (? IS NULL
                   OR LOWER(i.title) LIKE ? ESCAPE '\'
                   OR LOWER(COALESCE(i.brand, '')) LIKE ? ESCAPE '\'
                   OR LOWER(COALESCE(i.model, '')) LIKE ? ESCAPE '\')
            ORDER BY i.created_at DESC, i.title"#
        ))
        .bind(user_id)
        .bind(&filter.vault_id)
        .bind(&filter.vault_id)
        .bind(&filter.category_id)
        .bind(&filter.category_id)
        .bind(&search)
        .bind(&search)
        .bind(&search)
        .bind(&search)
        .fetch_all(&self.pool)
        .await?;

        let mut items = rows
            .iter()
            .map(item_row_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let mut attachments = self.attachments_for_user(user_id).await?;
        for row in &mut items {
            if let Some(list) = attachments.remove(&row.item.id) {
                row.item.attachments = list;
            }
        }

        Ok(items)
    }

    /// Get an item by ID with its attachments.
    pub async fn get_item(&self, id: &str) -> Result<Option<ItemRow>, AppError> {
        let row = sqlx::query(&format!("{ITEM_SELECT} WHERE i.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut item = item_row_from_row(&row)?;
        item.item.attachments = self.list_attachments(id).await?;
        Ok(Some(item))
    }

    /// Create a new item. Input is expected to be validated.
    pub async fn create_item(&self, request: &CreateItemRequest) -> Result<ItemRow, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let state = request.state.unwrap_or_default();

        sqlx::query(
            r#"INSERT INTO items (id, vault_id, category_id, title, brand, model, serial_number,
                                  purchase_date, price, warranty_months, state, notes,
                                  created_at, updated_at, version)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1)"#,
        )
        .bind(&id)
        .bind(&request.vault_id)
        .bind(normalize_text(request.category_id.as_deref()))
        .bind(request.title.trim())
        .bind(normalize_text(request.brand.as_deref()))
        .bind(normalize_text(request.model.as_deref()))
        .bind(normalize_text(request.serial_number.as_deref()))
        .bind(request.purchase_date)
        .bind(request.price)
        .bind(request.warranty_months)
        .bind(state.as_str())
        .bind(normalize_text(request.notes.as_deref()))
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;
        tracing::info!("Created item {} in vault {}", id, request.vault_id);

        self.get_item(&id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Item {} vanished after insert", id)))
    }

    /// Update an item with optimistic concurrency control.
    pub async fn update_item(
        &self,
        existing: &Item,
        request: &UpdateItemRequest,
    ) -> Result<ItemRow, AppError> {
        // Check version for optimistic concurrency
        if let Some(expected) = request.expected_version {
            if existing.version != expected {
                return Err(AppError::VersionMismatch {
                    message: format!(
                        "Version mismatch: expected {}, current {}",
                        expected, existing.version
                    ),
                    current_version: existing.version,
                });
            }
        }

        let now = Utc::now().to_rfc3339();
        let new_version = existing.version + 1;

        let title = request
            .title
            .as_deref()
            .map(str::trim)
            .unwrap_or(existing.title.as_str());
        let category_id = normalize_text(request.category_id.as_deref())
            .or_else(|| existing.category_id.clone());
        let brand = normalize_text(request.brand.as_deref()).or_else(|| existing.brand.clone());
        let model = normalize_text(request.model.as_deref()).or_else(|| existing.model.clone());
        let serial_number = normalize_text(request.serial_number.as_deref())
            .or_else(|| existing.serial_number.clone());
        let purchase_date = request.purchase_date.unwrap_or(existing.purchase_date);
        let price = request.price.or(existing.price);
        let warranty_months = request.warranty_months.or(existing.warranty_months);
        let state = request.state.unwrap_or(existing.state);
        let notes = normalize_text(request.notes.as_deref()).or_else(|| existing.notes.clone());

        // Use conditional UPDATE with version check to prevent race conditions
        let result = sqlx::query(
            r#"UPDATE items SET title = ?, category_id = ?, brand = ?, model = ?, serial_number = ?,
                                purchase_date = ?, price = ?, warranty_months = ?, state = ?,
                                notes = ?, updated_at = ?, version = ?
               WHERE id = ? AND version = ?"#,
        )
        .bind(title)
        .bind(&category_id)
        .bind(&brand)
        .bind(&model)
        .bind(&serial_number)
        .bind(purchase_date)
        .bind(price)
        .bind(warranty_months)
        .bind(state.as_str())
        .bind(&notes)
        .bind(&now)
        .bind(new_version)
        .bind(&existing.id)
        .bind(existing.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Race condition - version changed between read and write
            let current = self.get_item(&existing.id).await?;
            return Err(AppError::VersionMismatch {
                message: "Concurrent modification detected".to_string(),
                current_version: current.map(|r| r.item.version).unwrap_or(0),
            });
        }

        self.increment_revision().await?;
        tracing::info!("Updated item {} to version {}", existing.id, new_version);

        self.get_item(&existing.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item {} not found", existing.id)))
    }

    /// Delete an item and its attachments.
    pub async fn delete_item(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Item {} not found", id)));
        }

        self.increment_revision().await?;
        tracing::info!("Deleted item {}", id);
        Ok(())
    }

    // ==================== ATTACHMENT OPERATIONS ====================

    /// List attachments of an item, oldest first.
    pub async fn list_attachments(&self, item_id: &str) -> Result<Vec<Attachment>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachments a WHERE a.item_id = ? ORDER BY a.uploaded_at"
        ))
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(attachment_from_row).collect())
    }

    /// Attachments of every item the user can see, keyed by item ID.
    async fn attachments_for_user(
        &self,
        user_id: &str,
    ) -> Result<HashMap<String, Vec<Attachment>>, AppError> {
        let rows = sqlx::query(&format!(
            r#"SELECT {ATTACHMENT_COLUMNS}
               FROM attachments a
               JOIN items i ON i.id = a.item_id
               JOIN vault_members m ON m.vault_id = i.vault_id
               WHERE m.user_id = ?
               ORDER BY a.uploaded_at"#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_item: HashMap<String, Vec<Attachment>> = HashMap::new();
        for attachment in rows.iter().map(attachment_from_row) {
            by_item
                .entry(attachment.item_id.clone())
                .or_default()
                .push(attachment);
        }
        Ok(by_item)
    }

    /// Attach a document to an item and bump the item's version.
    pub async fn add_attachment(
        &self,
        item_id: &str,
        request: &CreateAttachmentRequest,
        uploaded_by: &str,
    ) -> Result<Attachment, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO attachments (id, item_id, file_url, file_name, file_size, file_type,
                                        kind, uploaded_at, uploaded_by)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(item_id)
        .bind(request.file_url.trim())
        .bind(request.file_name.trim())
        .bind(request.file_size)
        .bind(normalize_text(request.file_type.as_deref()))
        .bind(request.kind.as_str())
        .bind(&now)
        .bind(uploaded_by)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE items SET version = version + 1, updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

        bump_revision(&mut tx).await?;
        tx.commit().await?;

        Ok(Attachment {
            id,
            item_id: item_id.to_string(),
            file_url: request.file_url.trim().to_string(),
            file_name: request.file_name.trim().to_string(),
            file_size: request.file_size,
            file_type: normalize_text(request.file_type.as_deref()),
            kind: request.kind,
            uploaded_at: now,
            uploaded_by: uploaded_by.to_string(),
        })
    }

    /// Remove an attachment from an item.
    pub async fn delete_attachment(&self, item_id: &str, attachment_id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM attachments WHERE id = ? AND item_id = ?")
            .bind(attachment_id)
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Attachment {} not found",
                attachment_id
            )));
        }

        sqlx::query("UPDATE items SET version = version + 1, updated_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

        bump_revision(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }
}

/// Build a LIKE pattern matching `term` anywhere, with wildcards escaped.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn item_row_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ItemRow, sqlx::Error> {
    let state: String = row.try_get("state")?;
    let item = Item {
        id: row.try_get("id")?,
        vault_id: row.try_get("vault_id")?,
        category_id: row.try_get("category_id")?,
        title: row.try_get("title")?,
        brand: row.try_get("brand")?,
        model: row.try_get("model")?,
        serial_number: row.try_get("serial_number")?,
        purchase_date: row.try_get("purchase_date")?,
        price: row.try_get("price")?,
        warranty_months: row.try_get("warranty_months")?,
        state: ItemState::parse(&state).unwrap_or_default(),
        notes: row.try_get("notes")?,
        attachments: Vec::new(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        version: row.try_get("version")?,
    };

    Ok(ItemRow {
        item,
        vault_name: row.try_get("vault_name")?,
        category_name: row.try_get("category_name")?,
    })
}

fn attachment_from_row(row: &sqlx::sqlite::SqliteRow) -> Attachment {
    let kind: String = row.get("kind");
    Attachment {
        id: row.get("id"),
        item_id: row.get("item_id"),
        file_url: row.get("file_url"),
        file_name: row.get("file_name"),
        file_size: row.get("file_size"),
        file_type: row.get("file_type"),
        kind: AttachmentType::parse(&kind).unwrap_or_default(),
        uploaded_at: row.get("uploaded_at"),
        uploaded_by: row.get("uploaded_by"),
    }
}
