//! Category model.

use serde::{Deserialize, Serialize};

/// A classification items may reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Suggested reminder lead time in days. Informational only; the
    /// expiring-soon window is global.
    pub reminder_days_default: i64,
}

/// Categories created on first start: (name, description, icon, reminder days).
pub const DEFAULT_CATEGORIES: &[(&str, &str, &str, i64)] = &[
    ("Electronics", "Electronic devices and gadgets", "computer-desktop", 30),
    ("Appliances", "Home and kitchen appliances", "home", 60),
    ("Insurance", "Insurance policies and coverage", "shield-check", 90),
    ("Documents", "Important documents and certificates", "document-text", 30),
    ("Vehicles", "Cars, motorcycles, and other vehicles", "truck", 30),
    ("Home & Garden", "Home improvement and garden tools", "wrench-screwdriver", 60),
    ("Health & Beauty", "Health and beauty products", "heart", 30),
    ("Other", "Other items", "squares-plus", 30),
];
