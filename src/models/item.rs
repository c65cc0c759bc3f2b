//! Item and attachment models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::warranty::{Classified, StatusDeriver, WarrantyInfo, WarrantyStatus};

/// User-managed lifecycle marker. Independent of the derived warranty status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemState {
    #[default]
    Active,
    /// A warranty claim has been made
    Claimed,
    /// The warranty has been renewed or extended
    Renewed,
}

impl ItemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemState::Active => "ACTIVE",
            ItemState::Claimed => "CLAIMED",
            ItemState::Renewed => "RENEWED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(ItemState::Active),
            "CLAIMED" => Some(ItemState::Claimed),
            "RENEWED" => Some(ItemState::Renewed),
            _ => None,
        }
    }
}

/// Kind of document attached to an item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttachmentType {
    #[default]
    Receipt,
    Warranty,
    Manual,
    Invoice,
    Certificate,
    Other,
}

impl AttachmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentType::Receipt => "RECEIPT",
            AttachmentType::Warranty => "WARRANTY",
            AttachmentType::Manual => "MANUAL",
            AttachmentType::Invoice => "INVOICE",
            AttachmentType::Certificate => "CERTIFICATE",
            AttachmentType::Other => "OTHER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RECEIPT" => Some(AttachmentType::Receipt),
            "WARRANTY" => Some(AttachmentType::Warranty),
            "MANUAL" => Some(AttachmentType::Manual),
            "INVOICE" => Some(AttachmentType::Invoice),
            "CERTIFICATE" => Some(AttachmentType::Certificate),
            "OTHER" => Some(AttachmentType::Other),
            _ => None,
        }
    }
}

/// File metadata attached to an item. The file itself lives at `file_url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub item_id: String,
    pub file_url: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(rename = "type")]
    pub kind: AttachmentType,
    pub uploaded_at: String,
    pub uploaded_by: String,
}

/// A tracked possession as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub vault_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    pub purchase_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warranty_months: Option<i32>,
    pub state: ItemState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub created_at: String,
    pub updated_at: String,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

/// An item as returned to clients: stored fields, display names, and the
/// warranty state derived at read time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    #[serde(flatten)]
    pub item: Item,
    pub vault_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(flatten)]
    pub warranty: WarrantyInfo,
}

impl ItemView {
    pub fn derive(
        item: Item,
        vault_name: String,
        category_name: Option<String>,
        deriver: &StatusDeriver,
        now: DateTime<Utc>,
    ) -> Self {
        let warranty = deriver.derive(item.purchase_date, item.warranty_months, now);
        Self {
            item,
            vault_name,
            category_name,
            warranty,
        }
    }
}

impl Classified for ItemView {
    fn status(&self) -> WarrantyStatus {
        self.warranty.status
    }

    fn price(&self) -> Option<f64> {
        self.item.price
    }

    fn category_key(&self) -> Option<&str> {
        self.item.category_id.as_deref()
    }

    fn vault_key(&self) -> &str {
        &self.item.vault_id
    }
}

/// Request body for creating an item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    pub vault_id: String,
    pub title: String,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    pub purchase_date: NaiveDate,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub warranty_months: Option<i32>,
    #[serde(default)]
    pub state: Option<ItemState>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request body for updating an item. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub purchase_date: Option<NaiveDate>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub warranty_months: Option<i32>,
    #[serde(default)]
    pub state: Option<ItemState>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Request body for attaching a document to an item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAttachmentRequest {
    pub file_url: String,
    pub file_name: String,
    #[serde(default)]
    pub file_size: Option<i64>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: AttachmentType,
}
