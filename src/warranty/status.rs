//! Warranty status derivation.
//!
//! Expiry is never stored: it is recomputed from the purchase date and the
//! warranty duration every time an item is read, so every view shares one
//! definition of "expired" and "expiring soon".

use chrono::{DateTime, Months, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Default lookahead window for "expiring soon", in days.
pub const DEFAULT_EXPIRY_WINDOW_DAYS: i64 = 30;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Largest window a `TimeDelta` can represent.
pub const MAX_EXPIRY_WINDOW_DAYS: i64 = i64::MAX / MILLIS_PER_DAY;

/// Derived warranty state of an item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum WarrantyStatus {
    Active,
    ExpiringSoon,
    Expired,
    /// No warranty duration recorded, so there is no expiry date.
    Unknown,
}

impl WarrantyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarrantyStatus::Active => "active",
            WarrantyStatus::ExpiringSoon => "expiring-soon",
            WarrantyStatus::Expired => "expired",
            WarrantyStatus::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(WarrantyStatus::Active),
            "expiring-soon" => Some(WarrantyStatus::ExpiringSoon),
            "expired" => Some(WarrantyStatus::Expired),
            "unknown" => Some(WarrantyStatus::Unknown),
            _ => None,
        }
    }
}

/// Result of deriving an item's warranty state at a given instant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WarrantyInfo {
    pub expiry_date: Option<NaiveDate>,
    pub status: WarrantyStatus,
    pub days_until_expiry: Option<i64>,
    pub is_expired: bool,
    pub is_expiring_soon: bool,
}

impl WarrantyInfo {
    fn unknown() -> Self {
        Self {
            expiry_date: None,
            status: WarrantyStatus::Unknown,
            days_until_expiry: None,
            is_expired: false,
            is_expiring_soon: false,
        }
    }

    /// True when the warranty has not passed yet and ends within `days`.
    pub fn expires_within(&self, days: i64) -> bool {
        matches!(
            self.status,
            WarrantyStatus::Active | WarrantyStatus::ExpiringSoon
        ) && self.days_until_expiry.is_some_and(|d| d <= days)
    }
}

/// Calendar-correct month addition. Days past the end of the target month
/// are clamped to its last day (Jan 31 + 1 month = Feb 28/29).
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

/// Derives [`WarrantyInfo`] using a fixed "expiring soon" window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusDeriver {
    window_days: i64,
}

impl Default for StatusDeriver {
    fn default() -> Self {
        Self::new(DEFAULT_EXPIRY_WINDOW_DAYS)
    }
}

impl StatusDeriver {
    pub fn new(window_days: i64) -> Self {
        Self {
            window_days: window_days.clamp(0, MAX_EXPIRY_WINDOW_DAYS),
        }
    }

    pub fn window_days(&self) -> i64 {
        self.window_days
    }

    fn window(&self) -> TimeDelta {
        TimeDelta::try_days(self.window_days).unwrap_or(TimeDelta::MAX)
    }

    /// Derive the warranty state of an item at `now`.
    ///
    /// A missing or negative `warranty_months` yields [`WarrantyStatus::Unknown`].
    /// Expiry happens at the start (UTC) of the computed expiry date. A
    /// purchase dated in the future is always `Active`.
    pub fn derive(
        &self,
        purchase_date: NaiveDate,
        warranty_months: Option<i32>,
        now: DateTime<Utc>,
    ) -> WarrantyInfo {
        let expiry_date = warranty_months
            .and_then(|m| u32::try_from(m).ok())
            .and_then(|m| add_months(purchase_date, m));

        let Some(expiry_date) = expiry_date else {
            return WarrantyInfo::unknown();
        };

        let expires_at = start_of_day(expiry_date);
        let remaining = expires_at - now;

        let status = if now < start_of_day(purchase_date) {
            WarrantyStatus::Active
        } else if now >= expires_at {
            WarrantyStatus::Expired
        } else if remaining <= self.window() {
            WarrantyStatus::ExpiringSoon
        } else {
            WarrantyStatus::Active
        };

        WarrantyInfo {
            expiry_date: Some(expiry_date),
            status,
            days_until_expiry: Some(ceil_days(remaining)),
            is_expired: status == WarrantyStatus::Expired,
            is_expiring_soon: status == WarrantyStatus::ExpiringSoon,
        }
    }
}

/// Derive with the default 30-day window.
pub fn derive_status(
    purchase_date: NaiveDate,
    warranty_months: Option<i32>,
    now: DateTime<Utc>,
) -> WarrantyInfo {
    StatusDeriver::default().derive(purchase_date, warranty_months, now)
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

fn ceil_days(delta: TimeDelta) -> i64 {
    let millis = delta.num_milliseconds();
    let whole = millis.div_euclid(MILLIS_PER_DAY);
    if millis.rem_euclid(MILLIS_PER_DAY) == 0 {
        whole
    } else {
        whole + 1
    }
}
