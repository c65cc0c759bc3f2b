//! REST API module.
//!
//! Contains all API routes and handlers. Every response uses the
//! `{success, data | error, revisionId}` envelope.

mod auth;
mod categories;
mod items;
mod revision;
mod stats;
mod vaults;

pub use auth::*;
pub use categories::*;
pub use items::*;
pub use revision::*;
pub use stats::*;
pub use vaults::*;

use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::db::ItemRow;
use crate::errors::{AppError, AppErrorWithRevision};
use crate::models::ItemView;
use crate::AppState;

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub revision_id: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, revision_id: i64) -> Self {
        Self {
            success: true,
            data,
            revision_id,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppErrorWithRevision>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T, revision_id: i64) -> ApiResult<T> {
    Ok(ApiResponse::new(data, revision_id))
}

/// Create an error API response.
pub fn error<T: Serialize>(err: AppError, revision_id: i64) -> ApiResult<T> {
    Err(AppErrorWithRevision {
        error: err,
        revision_id,
    })
}

/// JSON body extractor whose rejections use the error envelope.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppErrorWithRevision;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                tracing::debug!("Rejected request body: {}", rejection.body_text());
                Err(AppError::BadRequest(rejection.body_text()).into())
            }
        }
    }
}

/// Attach derived warranty state to stored items at the current instant.
pub(crate) fn derive_views(state: &AppState, rows: Vec<ItemRow>) -> Vec<ItemView> {
    let now = state.clock.now();
    rows.into_iter()
        .map(|row| derive_view(state, row, now))
        .collect()
}

pub(crate) fn derive_view(
    state: &AppState,
    row: ItemRow,
    now: chrono::DateTime<chrono::Utc>,
) -> ItemView {
    ItemView::derive(
        row.item,
        row.vault_name,
        row.category_name,
        &state.deriver,
        now,
    )
}

/// Validate an optional text field's length.
pub(crate) fn check_length(field: &str, value: Option<&str>, max: usize) -> Result<(), AppError> {
    match value {
        Some(v) if v.trim().chars().count() > max => Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            field, max
        ))),
        _ => Ok(()),
    }
}
