//! Aggregation of derived warranty states.
//!
//! Pure reductions over already-derived records. Vault counters, the
//! dashboard and the statistics endpoint all go through here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::WarrantyStatus;

/// Group key used when every item falls into a single group.
pub const ALL_GROUP_KEY: &str = "all";
/// Group key for items without a category.
pub const UNCATEGORIZED_GROUP_KEY: &str = "uncategorized";

/// How to partition items before aggregating.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    #[default]
    All,
    Category,
    Vault,
}

impl GroupBy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Some(GroupBy::All),
            "category" => Some(GroupBy::Category),
            "vault" => Some(GroupBy::Vault),
            _ => None,
        }
    }
}

/// A record that can be aggregated.
pub trait Classified {
    fn status(&self) -> WarrantyStatus;
    fn price(&self) -> Option<f64>;
    fn category_key(&self) -> Option<&str>;
    fn vault_key(&self) -> &str;

    fn group_key(&self, group_by: GroupBy) -> String {
        match group_by {
            GroupBy::All => ALL_GROUP_KEY.to_string(),
            GroupBy::Category => self
                .category_key()
                .unwrap_or(UNCATEGORIZED_GROUP_KEY)
                .to_string(),
            GroupBy::Vault => self.vault_key().to_string(),
        }
    }
}

/// Counts and mean price for one group.
///
/// `mean_price` only considers items with a price and is `None` when no item
/// in the group has one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupStats {
    pub total: usize,
    pub active: usize,
    pub expiring_soon: usize,
    pub expired: usize,
    pub unknown: usize,
    pub mean_price: Option<f64>,
}

impl GroupStats {
    pub fn count(&self, status: WarrantyStatus) -> usize {
        match status {
            WarrantyStatus::Active => self.active,
            WarrantyStatus::ExpiringSoon => self.expiring_soon,
            WarrantyStatus::Expired => self.expired,
            WarrantyStatus::Unknown => self.unknown,
        }
    }
}

#[derive(Default)]
struct Accumulator {
    stats: GroupStats,
    price_sum: f64,
    priced: usize,
}

impl Accumulator {
    fn add(&mut self, status: WarrantyStatus, price: Option<f64>) {
        self.stats.total += 1;
        match status {
            WarrantyStatus::Active => self.stats.active += 1,
            WarrantyStatus::ExpiringSoon => self.stats.expiring_soon += 1,
            WarrantyStatus::Expired => self.stats.expired += 1,
            WarrantyStatus::Unknown => self.stats.unknown += 1,
        }
        if let Some(price) = price.filter(|p| p.is_finite()) {
            self.price_sum += price;
            self.priced += 1;
        }
    }

    fn finish(mut self) -> GroupStats {
        if self.priced > 0 {
            self.stats.mean_price = Some(self.price_sum / self.priced as f64);
        }
        self.stats
    }
}

/// Aggregate items into per-group statistics. Empty input yields an empty map.
pub fn aggregate<T: Classified>(items: &[T], group_by: GroupBy) -> BTreeMap<String, GroupStats> {
    let mut groups: BTreeMap<String, Accumulator> = BTreeMap::new();
    for item in items {
        groups
            .entry(item.group_key(group_by))
            .or_default()
            .add(item.status(), item.price());
    }

    groups
        .into_iter()
        .map(|(key, acc)| (key, acc.finish()))
        .collect()
}

/// Aggregate all items into a single group. Empty input yields zero counts.
pub fn summarize<'a, T, I>(items: I) -> GroupStats
where
    T: Classified + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut acc = Accumulator::default();
    for item in items {
        acc.add(item.status(), item.price());
    }
    acc.finish()
}
