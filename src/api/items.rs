//! Item and attachment endpoints.
//!
//! Warranty status is never stored; every response derives it from the
//! purchase date and warranty length at request time.

use axum::{
    extract::{Path, Query, State},
    Extension,
};
use serde::Deserialize;

use super::{check_length, derive_view, derive_views, error, success, ApiJson, ApiResult};
use crate::auth::CurrentUser;
use crate::db::{ItemFilter, ItemRow};
use crate::errors::AppError;
use crate::models::{
    Attachment, CreateAttachmentRequest, CreateItemRequest, ItemView, UpdateItemRequest, VaultRole,
};
use crate::warranty::WarrantyStatus;
use crate::AppState;

const MAX_TITLE_LENGTH: usize = 200;
const MAX_SHORT_FIELD_LENGTH: usize = 100;
const MAX_NOTES_LENGTH: usize = 1000;
const MAX_FILE_NAME_LENGTH: usize = 255;

/// Query parameters for item listings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemQuery {
    pub vault_id: Option<String>,
    pub category_id: Option<String>,
    pub search: Option<String>,
    pub status: Option<String>,
}

/// Query parameters for the expiring-items lookahead.
#[derive(Debug, Default, Deserialize)]
pub struct ExpiringQuery {
    pub days: Option<String>,
}

/// Field checks shared by create and update. `None` means "not provided".
struct ItemFields<'a> {
    title: Option<&'a str>,
    brand: Option<&'a str>,
    model: Option<&'a str>,
    serial_number: Option<&'a str>,
    notes: Option<&'a str>,
    price: Option<f64>,
    warranty_months: Option<i32>,
}

impl ItemFields<'_> {
    fn validate(&self) -> Result<(), AppError> {
        if self.title.is_some_and(|t| t.trim().is_empty()) {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        check_length("Title", self.title, MAX_TITLE_LENGTH)?;
        check_length("Brand", self.brand, MAX_SHORT_FIELD_LENGTH)?;
        check_length("Model", self.model, MAX_SHORT_FIELD_LENGTH)?;
        check_length("Serial number", self.serial_number, MAX_SHORT_FIELD_LENGTH)?;
        check_length("Notes", self.notes, MAX_NOTES_LENGTH)?;

        if let Some(price) = self.price {
            if !price.is_finite() || price < 0.0 {
                return Err(AppError::Validation(
                    "Price must be a non-negative number".to_string(),
                ));
            }
        }
        if self.warranty_months.is_some_and(|m| m < 0) {
            return Err(AppError::Validation(
                "Warranty months must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Role of the caller in a vault. A vault the caller cannot see is reported as missing.
async fn vault_role(state: &AppState, vault_id: &str, user_id: &str) -> Result<VaultRole, AppError> {
    state
        .repo
        .get_member_role(vault_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Vault {} not found", vault_id)))
}

/// Load an item the caller can see, with the caller's role in its vault.
async fn load_item(
    state: &AppState,
    item_id: &str,
    user_id: &str,
) -> Result<(ItemRow, VaultRole), AppError> {
    let not_found = || AppError::NotFound(format!("Item {} not found", item_id));

    let row = state.repo.get_item(item_id).await?.ok_or_else(not_found)?;
    let role = state
        .repo
        .get_member_role(&row.item.vault_id, user_id)
        .await?
        .ok_or_else(not_found)?;
    Ok((row, role))
}

fn require_edit(role: VaultRole) -> Result<(), AppError> {
    if role.can_edit() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Viewers cannot modify items in this vault".to_string(),
        ))
    }
}

async fn ensure_category(state: &AppState, category_id: Option<&str>) -> Result<(), AppError> {
    let Some(id) = category_id.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(());
    };
    match state.repo.get_category(id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::Validation(format!("Category {} does not exist", id))),
    }
}

/// GET /api/items - List items in the caller's vaults.
pub async fn list_items(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ItemQuery>,
) -> ApiResult<Vec<ItemView>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => None,
        Some(raw) => match WarrantyStatus::parse(raw) {
            Some(status) => Some(status),
            None => {
                return error(
                    AppError::Validation(format!("Unknown status filter: {}", raw)),
                    revision_id,
                )
            }
        },
    };

    let filter = ItemFilter {
        vault_id: query.vault_id,
        category_id: query.category_id,
        search: query.search,
    };

    match state.repo.list_items_for_user(&current.user.id, &filter).await {
        Ok(rows) => {
            let mut items = derive_views(&state, rows);
            if let Some(status) = status {
                items.retain(|item| item.warranty.status == status);
            }
            success(items, revision_id)
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/items/expiring?days=N - Items whose warranty ends within N days.
pub async fn list_expiring_items(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ExpiringQuery>,
) -> ApiResult<Vec<ItemView>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let days = match query.days.as_deref().map(str::trim) {
        None | Some("") => state.deriver.window_days(),
        Some(raw) => match raw.parse::<i64>() {
            Ok(days) if days >= 0 => days,
            _ => {
                return error(
                    AppError::Validation("days must be a non-negative integer".to_string()),
                    revision_id,
                )
            }
        },
    };

    match state
        .repo
        .list_items_for_user(&current.user.id, &ItemFilter::default())
        .await
    {
        Ok(rows) => {
            let mut items: Vec<ItemView> = derive_views(&state, rows)
                .into_iter()
                .filter(|item| item.warranty.expires_within(days))
                .collect();
            items.sort_by_key(|item| item.warranty.days_until_expiry);
            success(items, revision_id)
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/items/{id} - Get a single item.
pub async fn get_item(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<ItemView> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match load_item(&state, &id, &current.user.id).await {
        Ok((row, _)) => success(derive_view(&state, row, state.clock.now()), revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/items - Create an item in a vault the caller can edit.
pub async fn create_item(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(request): ApiJson<CreateItemRequest>,
) -> ApiResult<ItemView> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    // Validate required fields
    if request.vault_id.trim().is_empty() {
        return error(
            AppError::Validation("vaultId is required".to_string()),
            revision_id,
        );
    }
    let fields = ItemFields {
        title: Some(&request.title),
        brand: request.brand.as_deref(),
        model: request.model.as_deref(),
        serial_number: request.serial_number.as_deref(),
        notes: request.notes.as_deref(),
        price: request.price,
        warranty_months: request.warranty_months,
    };
    if let Err(e) = fields.validate() {
        return error(e, revision_id);
    }

    let result = async {
        require_edit(vault_role(&state, &request.vault_id, &current.user.id).await?)?;
        ensure_category(&state, request.category_id.as_deref()).await?;
        state.repo.create_item(&request).await
    }
    .await;

    match result {
        Ok(row) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(derive_view(&state, row, state.clock.now()), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/items/{id} - Update an item. Honors `expectedVersion`.
pub async fn update_item(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateItemRequest>,
) -> ApiResult<ItemView> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let fields = ItemFields {
        title: request.title.as_deref(),
        brand: request.brand.as_deref(),
        model: request.model.as_deref(),
        serial_number: request.serial_number.as_deref(),
        notes: request.notes.as_deref(),
        price: request.price,
        warranty_months: request.warranty_months,
    };
    if let Err(e) = fields.validate() {
        return error(e, revision_id);
    }

    let result = async {
        let (row, role) = load_item(&state, &id, &current.user.id).await?;
        require_edit(role)?;
        ensure_category(&state, request.category_id.as_deref()).await?;
        state.repo.update_item(&row.item, &request).await
    }
    .await;

    match result {
        Ok(row) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(derive_view(&state, row, state.clock.now()), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/items/{id} - Delete an item.
pub async fn delete_item(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        let (_, role) = load_item(&state, &id, &current.user.id).await?;
        require_edit(role)?;
        state.repo.delete_item(&id).await
    }
    .await;

    match result {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/items/{id}/attachments - Record a document for an item.
pub async fn add_attachment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<CreateAttachmentRequest>,
) -> ApiResult<Attachment> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if request.file_url.trim().is_empty() || request.file_name.trim().is_empty() {
        return error(
            AppError::Validation("fileUrl and fileName are required".to_string()),
            revision_id,
        );
    }
    if let Err(e) = check_length("File name", Some(&request.file_name), MAX_FILE_NAME_LENGTH) {
        return error(e, revision_id);
    }
    if request.file_size.is_some_and(|size| size < 0) {
        return error(
            AppError::Validation("fileSize must not be negative".to_string()),
            revision_id,
        );
    }

    let result = async {
        let (_, role) = load_item(&state, &id, &current.user.id).await?;
        require_edit(role)?;
        state
            .repo
            .add_attachment(&id, &request, &current.user.id)
            .await
    }
    .await;

    match result {
        Ok(attachment) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(attachment, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/items/{id}/attachments/{attachment_id} - Remove an attachment.
pub async fn delete_attachment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((id, attachment_id)): Path<(String, String)>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        let (_, role) = load_item(&state, &id, &current.user.id).await?;
        require_edit(role)?;
        state.repo.delete_attachment(&id, &attachment_id).await
    }
    .await;

    match result {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
