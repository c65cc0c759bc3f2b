//! Revision metadata used by clients for cache invalidation.

use serde::{Deserialize, Serialize};

/// Revision information for change detection.
///
/// Every successful write bumps `revision_id`; clients drop cached query
/// results when it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    pub revision_id: i64,
    pub generated_at: String,
}
