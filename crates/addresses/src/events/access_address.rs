use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use addrsync_core::{AccessAddressId, PostCodeId, RoadId};

use crate::entity::AddressStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessAddressCreated {
    pub id: AccessAddressId,
    #[serde(alias = "officialId")]
    pub external_id: Option<String>,
    pub municipal_code: String,
    pub status: AddressStatus,
    pub road_code: String,
    pub house_number: String,
    pub east_coordinate: f64,
    pub north_coordinate: f64,
    #[serde(alias = "supplementaryTownName")]
    pub town_name: Option<String>,
    pub plot_id: Option<String>,
    pub road_id: RoadId,
    pub post_code_id: PostCodeId,
    pub external_created_date: Option<DateTime<Utc>>,
    pub external_updated_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessAddressExternalIdChanged {
    pub id: AccessAddressId,
    #[serde(alias = "officialId")]
    pub external_id: Option<String>,
    pub external_updated_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessAddressMunicipalCodeChanged {
    pub id: AccessAddressId,
    pub municipal_code: String,
    pub external_updated_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessAddressStatusChanged {
    pub id: AccessAddressId,
    pub status: AddressStatus,
    pub external_updated_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessAddressRoadCodeChanged {
    pub id: AccessAddressId,
    pub road_code: String,
    pub external_updated_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessAddressHouseNumberChanged {
    pub id: AccessAddressId,
    pub house_number: String,
    pub external_updated_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessAddressCoordinateChanged {
    pub id: AccessAddressId,
    pub east_coordinate: f64,
    pub north_coordinate: f64,
    pub external_updated_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessAddressTownNameChanged {
    pub id: AccessAddressId,
    #[serde(alias = "supplementaryTownName")]
    pub town_name: Option<String>,
    pub external_updated_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessAddressPlotIdChanged {
    pub id: AccessAddressId,
    pub plot_id: Option<String>,
    pub external_updated_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessAddressRoadIdChanged {
    pub id: AccessAddressId,
    pub road_id: RoadId,
    pub external_updated_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessAddressPostCodeIdChanged {
    pub id: AccessAddressId,
    pub post_code_id: PostCodeId,
    pub external_updated_date: Option<DateTime<Utc>>,
}

/// Wholesale replacement from the older log generation. Carries every
/// mutable field; `created_at` and `deleted` are left as they were.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessAddressUpdated {
    pub id: AccessAddressId,
    #[serde(alias = "officialId")]
    pub external_id: Option<String>,
    pub municipal_code: String,
    pub status: AddressStatus,
    pub road_code: String,
    pub house_number: String,
    pub east_coordinate: f64,
    pub north_coordinate: f64,
    #[serde(alias = "supplementaryTownName")]
    pub town_name: Option<String>,
    pub plot_id: Option<String>,
    pub road_id: RoadId,
    pub post_code_id: PostCodeId,
    pub external_updated_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessAddressDeleted {
    pub id: AccessAddressId,
    pub external_updated_date: Option<DateTime<Utc>>,
}

event_family! {
    /// Events targeting the access address map.
    AccessAddressEvent {
        Created(AccessAddressCreated),
        ExternalIdChanged(AccessAddressExternalIdChanged),
        MunicipalCodeChanged(AccessAddressMunicipalCodeChanged),
        StatusChanged(AccessAddressStatusChanged),
        RoadCodeChanged(AccessAddressRoadCodeChanged),
        HouseNumberChanged(AccessAddressHouseNumberChanged),
        CoordinateChanged(AccessAddressCoordinateChanged),
        TownNameChanged(AccessAddressTownNameChanged),
        PlotIdChanged(AccessAddressPlotIdChanged),
        RoadIdChanged(AccessAddressRoadIdChanged),
        PostCodeIdChanged(AccessAddressPostCodeIdChanged),
        Updated(AccessAddressUpdated),
        Deleted(AccessAddressDeleted),
    }
}

impl AccessAddressEvent {
    pub fn id(&self) -> AccessAddressId {
        match self {
            Self::Created(e) => e.id,
            Self::ExternalIdChanged(e) => e.id,
            Self::MunicipalCodeChanged(e) => e.id,
            Self::StatusChanged(e) => e.id,
            Self::RoadCodeChanged(e) => e.id,
            Self::HouseNumberChanged(e) => e.id,
            Self::CoordinateChanged(e) => e.id,
            Self::TownNameChanged(e) => e.id,
            Self::PlotIdChanged(e) => e.id,
            Self::RoadIdChanged(e) => e.id,
            Self::PostCodeIdChanged(e) => e.id,
            Self::Updated(e) => e.id,
            Self::Deleted(e) => e.id,
        }
    }

    /// Change time reported by the registry. A creation prefers its creation date.
    pub fn external_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Created(e) => e.external_created_date.or(e.external_updated_date),
            Self::ExternalIdChanged(e) => e.external_updated_date,
            Self::MunicipalCodeChanged(e) => e.external_updated_date,
            Self::StatusChanged(e) => e.external_updated_date,
            Self::RoadCodeChanged(e) => e.external_updated_date,
            Self::HouseNumberChanged(e) => e.external_updated_date,
            Self::CoordinateChanged(e) => e.external_updated_date,
            Self::TownNameChanged(e) => e.external_updated_date,
            Self::PlotIdChanged(e) => e.external_updated_date,
            Self::RoadIdChanged(e) => e.external_updated_date,
            Self::PostCodeIdChanged(e) => e.external_updated_date,
            Self::Updated(e) => e.external_updated_date,
            Self::Deleted(e) => e.external_updated_date,
        }
    }
}
