//! Statistics and dashboard payloads.

use std::collections::BTreeMap;

use serde::Serialize;

use super::ItemView;
use crate::warranty::{GroupBy, GroupStats};

/// Aggregated warranty statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub group_by: GroupBy,
    /// Expiring-soon window the statuses were derived with
    pub window_days: i64,
    pub groups: BTreeMap<String, GroupStats>,
}

/// Overview shown on the dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub total_vaults: usize,
    pub total_items: usize,
    pub summary: GroupStats,
    pub recent_items: Vec<ItemView>,
}
