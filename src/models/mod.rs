//! Data models for the Warrantree application.
//!
//! Field names serialize in camelCase to match the web client.

mod category;
mod item;
mod meta;
mod stats;
mod user;
mod vault;

pub use category::*;
pub use item::*;
pub use meta::*;
pub use stats::*;
pub use user::*;
pub use vault::*;
