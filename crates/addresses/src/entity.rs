//! Materialized entity records.
//!
//! Records never leave their map: a `*Deleted` event only flips `deleted`, so
//! anything that already points at the record keeps resolving.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use addrsync_core::{AccessAddressId, PostCodeId, RoadId};

/// Lifecycle status shared by access and unit addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressStatus {
    Active,
    Canceled,
    Pending,
    Discontinued,
}

impl AddressStatus {
    /// Name written to the downstream store.
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressStatus::Active => "Active",
            AddressStatus::Canceled => "Canceled",
            AddressStatus::Pending => "Pending",
            AddressStatus::Discontinued => "Discontinued",
        }
    }
}

impl core::fmt::Display for AddressStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Post district.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostCode {
    pub code: String,
    pub name: String,
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Road {
    pub external_id: String,
    pub name: String,
    pub deleted: bool,
}

/// A house number on a road, with its position.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessAddress {
    pub external_id: Option<String>,
    pub municipal_code: String,
    pub status: AddressStatus,
    pub road_code: String,
    pub house_number: String,
    pub east_coordinate: f64,
    pub north_coordinate: f64,
    pub town_name: Option<String>,
    pub plot_id: Option<String>,
    pub road_id: RoadId,
    pub post_code_id: PostCodeId,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted: bool,
}

/// A floor and/or suite below an access address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitAddress {
    pub access_address_id: AccessAddressId,
    pub status: AddressStatus,
    pub floor_name: Option<String>,
    pub suite_name: Option<String>,
    pub external_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted: bool,
}

/// Advance `updated_at` to `at`, never moving it backwards past the previous
/// change or the creation time.
fn advance(updated_at: &mut Option<DateTime<Utc>>, created_at: DateTime<Utc>, at: DateTime<Utc>) {
    let floor = updated_at.unwrap_or(created_at);
    *updated_at = Some(at.max(floor));
}

impl AccessAddress {
    pub(crate) fn touch(&mut self, at: DateTime<Utc>) {
        advance(&mut self.updated_at, self.created_at, at);
    }
}

impl UnitAddress {
    pub(crate) fn touch(&mut self, at: DateTime<Utc>) {
        advance(&mut self.updated_at, self.created_at, at);
    }
}
