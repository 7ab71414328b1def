use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use addrsync_core::{AccessAddressId, UnitAddressId};

use crate::entity::AddressStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitAddressCreated {
    pub id: UnitAddressId,
    #[serde(alias = "officialId")]
    pub external_id: Option<String>,
    pub access_address_id: AccessAddressId,
    pub status: AddressStatus,
    pub floor_name: Option<String>,
    #[serde(alias = "suitName")]
    pub suite_name: Option<String>,
    pub external_created_date: Option<DateTime<Utc>>,
    pub external_updated_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitAddressExternalIdChanged {
    pub id: UnitAddressId,
    #[serde(alias = "officialId")]
    pub external_id: Option<String>,
    pub external_updated_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitAddressAccessAddressIdChanged {
    pub id: UnitAddressId,
    pub access_address_id: AccessAddressId,
    pub external_updated_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitAddressStatusChanged {
    pub id: UnitAddressId,
    pub status: AddressStatus,
    pub external_updated_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitAddressFloorNameChanged {
    pub id: UnitAddressId,
    pub floor_name: Option<String>,
    pub external_updated_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitAddressSuiteNameChanged {
    pub id: UnitAddressId,
    #[serde(alias = "suitName")]
    pub suite_name: Option<String>,
    pub external_updated_date: Option<DateTime<Utc>>,
}

/// Wholesale replacement from the older log generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitAddressUpdated {
    pub id: UnitAddressId,
    #[serde(alias = "officialId")]
    pub external_id: Option<String>,
    pub access_address_id: AccessAddressId,
    pub status: AddressStatus,
    pub floor_name: Option<String>,
    #[serde(alias = "suitName")]
    pub suite_name: Option<String>,
    pub external_updated_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitAddressDeleted {
    pub id: UnitAddressId,
    pub external_updated_date: Option<DateTime<Utc>>,
}

event_family! {
    /// Events targeting the unit address map.
    UnitAddressEvent {
        Created(UnitAddressCreated),
        ExternalIdChanged(UnitAddressExternalIdChanged),
        AccessAddressIdChanged(UnitAddressAccessAddressIdChanged),
        StatusChanged(UnitAddressStatusChanged),
        FloorNameChanged(UnitAddressFloorNameChanged),
        SuiteNameChanged(UnitAddressSuiteNameChanged),
        Updated(UnitAddressUpdated),
        Deleted(UnitAddressDeleted),
    }
}

impl UnitAddressEvent {
    pub fn id(&self) -> UnitAddressId {
        match self {
            Self::Created(e) => e.id,
            Self::ExternalIdChanged(e) => e.id,
            Self::AccessAddressIdChanged(e) => e.id,
            Self::StatusChanged(e) => e.id,
            Self::FloorNameChanged(e) => e.id,
            Self::SuiteNameChanged(e) => e.id,
            Self::Updated(e) => e.id,
            Self::Deleted(e) => e.id,
        }
    }

    pub fn external_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Created(e) => e.external_created_date.or(e.external_updated_date),
            Self::ExternalIdChanged(e) => e.external_updated_date,
            Self::AccessAddressIdChanged(e) => e.external_updated_date,
            Self::StatusChanged(e) => e.external_updated_date,
            Self::FloorNameChanged(e) => e.external_updated_date,
            Self::SuiteNameChanged(e) => e.external_updated_date,
            Self::Updated(e) => e.external_updated_date,
            Self::Deleted(e) => e.external_updated_date,
        }
    }
}
