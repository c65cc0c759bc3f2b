//! Category endpoints.

use axum::{extract::State, Extension};

use super::{error, success, ApiResult};
use crate::auth::CurrentUser;
use crate::models::Category;
use crate::AppState;

/// GET /api/categories - List all categories.
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_categories().await {
        Ok(categories) => success(categories, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/categories/with-items - Categories used by the caller's items.
pub async fn list_categories_with_items(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Vec<Category>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_categories_with_items(&current.user.id).await {
        Ok(categories) => success(categories, revision_id),
        Err(e) => error(e, revision_id),
    }
}
