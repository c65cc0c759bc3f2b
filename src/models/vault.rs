//! Vault and membership models.

use serde::{Deserialize, Serialize};

use crate::warranty::GroupStats;

/// Role of a user within a vault.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VaultRole {
    /// Full access, can delete the vault and manage members
    Owner,
    /// Can add, edit and delete items and attachments
    Editor,
    /// Read-only
    Viewer,
}

impl VaultRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            VaultRole::Owner => "OWNER",
            VaultRole::Editor => "EDITOR",
            VaultRole::Viewer => "VIEWER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OWNER" => Some(VaultRole::Owner),
            "EDITOR" => Some(VaultRole::Editor),
            "VIEWER" => Some(VaultRole::Viewer),
            _ => None,
        }
    }

    pub fn can_edit(&self) -> bool {
        matches!(self, VaultRole::Owner | VaultRole::Editor)
    }

    pub fn can_manage_members(&self) -> bool {
        *self == VaultRole::Owner
    }

    pub fn can_delete(&self) -> bool {
        *self == VaultRole::Owner
    }
}

/// A stored vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub owner_id: String,
    pub owner_name: String,
    pub owner_email: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A member of a vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultMember {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: VaultRole,
    pub joined_at: String,
}

/// Vault listing entry with counters derived from its items.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultSummary {
    #[serde(flatten)]
    pub vault: Vault,
    /// The caller's role in this vault
    pub role: VaultRole,
    pub item_count: usize,
    pub member_count: usize,
    pub expiring_soon_count: usize,
    pub expired_count: usize,
}

/// Full vault view with members and warranty statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultDetail {
    #[serde(flatten)]
    pub summary: VaultSummary,
    pub members: Vec<VaultMember>,
    pub stats: GroupStats,
}

/// Request body for creating a vault.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVaultRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Request body for updating a vault.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVaultRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Request body for adding a member to a vault.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub email: String,
    #[serde(default = "default_member_role")]
    pub role: VaultRole,
}

fn default_member_role() -> VaultRole {
    VaultRole::Viewer
}
