use serde::{Deserialize, Serialize};

use addrsync_core::RoadId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadCreated {
    pub id: RoadId,
    #[serde(alias = "officialId")]
    pub external_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadNameChanged {
    pub id: RoadId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadExternalIdChanged {
    pub id: RoadId,
    #[serde(alias = "officialId")]
    pub external_id: String,
}

/// Wholesale replacement from the older log generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadUpdated {
    pub id: RoadId,
    #[serde(alias = "officialId")]
    pub external_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadDeleted {
    pub id: RoadId,
}

event_family! {
    /// Events targeting the road map.
    RoadEvent {
        Created(RoadCreated),
        NameChanged(RoadNameChanged),
        ExternalIdChanged(RoadExternalIdChanged),
        Updated(RoadUpdated),
        Deleted(RoadDeleted),
    }
}

impl RoadEvent {
    pub fn id(&self) -> RoadId {
        match self {
            RoadEvent::Created(e) => e.id,
            RoadEvent::NameChanged(e) => e.id,
            RoadEvent::ExternalIdChanged(e) => e.id,
            RoadEvent::Updated(e) => e.id,
            RoadEvent::Deleted(e) => e.id,
        }
    }
}
