//! Statistics and dashboard endpoints.

use axum::{
    extract::{Query, State},
    Extension,
};
use serde::Deserialize;

use super::{derive_views, error, success, ApiResult};
use crate::auth::CurrentUser;
use crate::db::ItemFilter;
use crate::errors::AppError;
use crate::models::{DashboardResponse, StatsResponse};
use crate::warranty::{aggregate, summarize, GroupBy};
use crate::AppState;

const RECENT_ITEMS: usize = 5;

/// Query parameters for the statistics endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub group_by: Option<String>,
}

/// GET /api/stats?groupBy=all|category|vault - Aggregate the caller's items.
pub async fn get_stats(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<StatsResponse> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let group_by = match query.group_by.as_deref().map(str::trim) {
        None | Some("") => GroupBy::default(),
        Some(raw) => match GroupBy::parse(raw) {
            Some(group_by) => group_by,
            None => {
                return error(
                    AppError::Validation(format!(
                        "groupBy must be one of all, category, vault (got {})",
                        raw
                    )),
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
            let items = derive_views(&state, rows);
            success(
                StatsResponse {
                    group_by,
                    window_days: state.deriver.window_days(),
                    groups: aggregate(&items, group_by),
                },
                revision_id,
            )
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/dashboard - Totals, status summary and recently added items.
pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<DashboardResponse> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        let vaults = state.repo.list_vaults_for_user(&current.user.id).await?;
        let rows = state
            .repo
            .list_items_for_user(&current.user.id, &ItemFilter::default())
            .await?;
        let items = derive_views(&state, rows);
        let summary = summarize(&items);

        Ok::<_, AppError>(DashboardResponse {
            total_vaults: vaults.len(),
            total_items: items.len(),
            summary,
            recent_items: items.into_iter().take(RECENT_ITEMS).collect(),
        })
    }
    .await;

    match result {
        Ok(dashboard) => success(dashboard, revision_id),
        Err(e) => error(e, revision_id),
    }
}
