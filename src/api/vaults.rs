//! Vault and membership endpoints.

use axum::{
    extract::{Path, State},
    Extension,
};

use super::{check_length, derive_views, error, success, ApiJson, ApiResult};
use crate::auth::CurrentUser;
use crate::db::{ItemFilter, VaultAccess};
use crate::errors::AppError;
use crate::models::{
    AddMemberRequest, CreateVaultRequest, UpdateVaultRequest, VaultDetail, VaultMember, VaultRole,
    VaultSummary,
};
use crate::warranty::{aggregate, summarize, GroupBy, GroupStats, WarrantyStatus};
use crate::AppState;

const MAX_VAULT_NAME_LENGTH: usize = 100;
const MAX_VAULT_DESCRIPTION_LENGTH: usize = 500;

fn to_summary(access: VaultAccess, stats: &GroupStats) -> VaultSummary {
    VaultSummary {
        vault: access.vault,
        role: access.role,
        item_count: stats.total,
        member_count: access.member_count,
        expiring_soon_count: stats.count(WarrantyStatus::ExpiringSoon),
        expired_count: stats.count(WarrantyStatus::Expired),
    }
}

/// Load a vault the caller can see, or fail with NOT_FOUND.
async fn load_vault(state: &AppState, vault_id: &str, user_id: &str) -> Result<VaultAccess, AppError> {
    state
        .repo
        .get_vault_for_user(vault_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Vault {} not found", vault_id)))
}

/// GET /api/vaults - List vaults the caller can access.
pub async fn list_vaults(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Vec<VaultSummary>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        let vaults = state.repo.list_vaults_for_user(&current.user.id).await?;
        let rows = state
            .repo
            .list_items_for_user(&current.user.id, &ItemFilter::default())
            .await?;
        let items = derive_views(&state, rows);
        let mut by_vault = aggregate(&items, GroupBy::Vault);

        Ok::<_, AppError>(
            vaults
                .into_iter()
                .map(|access| {
                    let stats = by_vault.remove(&access.vault.id).unwrap_or_default();
                    to_summary(access, &stats)
                })
                .collect(),
        )
    }
    .await;

    match result {
        Ok(vaults) => success(vaults, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/vaults/{id} - Vault with members and warranty statistics.
pub async fn get_vault(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<VaultDetail> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        let access = load_vault(&state, &id, &current.user.id).await?;
        let members = state.repo.list_members(&id).await?;
        let filter = ItemFilter {
            vault_id: Some(id.clone()),
            ..ItemFilter::default()
        };
        let rows = state
            .repo
            .list_items_for_user(&current.user.id, &filter)
            .await?;
        let items = derive_views(&state, rows);
        let stats = summarize(&items);

        Ok::<_, AppError>(VaultDetail {
            summary: to_summary(access, &stats),
            members,
            stats,
        })
    }
    .await;

    match result {
        Ok(detail) => success(detail, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/vaults - Create a vault owned by the caller.
pub async fn create_vault(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(request): ApiJson<CreateVaultRequest>,
) -> ApiResult<VaultSummary> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    // Validate required fields
    if request.name.trim().is_empty() {
        return error(
            AppError::Validation("Vault name is required".to_string()),
            revision_id,
        );
    }
    if let Err(e) = check_length("Vault name", Some(&request.name), MAX_VAULT_NAME_LENGTH)
        .and_then(|_| {
            check_length(
                "Description",
                request.description.as_deref(),
                MAX_VAULT_DESCRIPTION_LENGTH,
            )
        })
    {
        return error(e, revision_id);
    }

    match state.repo.create_vault(&current.user, &request).await {
        Ok(access) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(to_summary(access, &GroupStats::default()), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/vaults/{id} - Rename or describe a vault. Owners and editors only.
pub async fn update_vault(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateVaultRequest>,
) -> ApiResult<VaultSummary> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if request.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return error(
            AppError::Validation("Vault name cannot be empty".to_string()),
            revision_id,
        );
    }
    if let Err(e) = check_length("Vault name", request.name.as_deref(), MAX_VAULT_NAME_LENGTH)
        .and_then(|_| {
            check_length(
                "Description",
                request.description.as_deref(),
                MAX_VAULT_DESCRIPTION_LENGTH,
            )
        })
    {
        return error(e, revision_id);
    }

    let result = async {
        let access = load_vault(&state, &id, &current.user.id).await?;
        if !access.role.can_edit() {
            return Err(AppError::Forbidden(
                "Only owners and editors can update a vault".to_string(),
            ));
        }

        let vault = state.repo.update_vault(&access.vault, &request).await?;
        let filter = ItemFilter {
            vault_id: Some(id.clone()),
            ..ItemFilter::default()
        };
        let rows = state
            .repo
            .list_items_for_user(&current.user.id, &filter)
            .await?;
        let stats = summarize(&derive_views(&state, rows));

        Ok(to_summary(VaultAccess { vault, ..access }, &stats))
    }
    .await;

    match result {
        Ok(summary) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(summary, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/vaults/{id} - Delete a vault and everything in it. Owner only.
pub async fn delete_vault(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        let access = load_vault(&state, &id, &current.user.id).await?;
        if !access.role.can_delete() {
            return Err(AppError::Forbidden(
                "Only the owner can delete a vault".to_string(),
            ));
        }
        state.repo.delete_vault(&id).await
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

/// POST /api/vaults/{id}/members - Share a vault with another user. Owner only.
pub async fn add_member(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<AddMemberRequest>,
) -> ApiResult<VaultMember> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if request.role == VaultRole::Owner {
        return error(
            AppError::Validation("A vault has exactly one owner".to_string()),
            revision_id,
        );
    }

    let result = async {
        let access = load_vault(&state, &id, &current.user.id).await?;
        if !access.role.can_manage_members() {
            return Err(AppError::Forbidden(
                "Only the owner can manage members".to_string(),
            ));
        }

        let email = request.email.trim().to_lowercase();
        let user = state
            .repo
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No user with email {}", email)))?;

        state.repo.add_member(&id, &user, request.role).await
    }
    .await;

    match result {
        Ok(member) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(member, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/vaults/{id}/members/{user_id} - Revoke a member's access. Owner only.
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((id, user_id)): Path<(String, String)>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        let access = load_vault(&state, &id, &current.user.id).await?;
        if !access.role.can_manage_members() {
            return Err(AppError::Forbidden(
                "Only the owner can manage members".to_string(),
            ));
        }
        if user_id == access.vault.owner_id {
            return Err(AppError::Validation(
                "The owner cannot be removed from a vault".to_string(),
            ));
        }
        state.repo.remove_member(&id, &user_id).await
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
