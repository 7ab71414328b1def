use serde::{Deserialize, Serialize};

use addrsync_core::PostCodeId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostCodeCreated {
    pub id: PostCodeId,
    #[serde(alias = "number")]
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostCodeNameChanged {
    pub id: PostCodeId,
    pub name: String,
}

/// Wholesale replacement from the older log generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostCodeUpdated {
    pub id: PostCodeId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostCodeDeleted {
    pub id: PostCodeId,
}

event_family! {
    /// Events targeting the post code map.
    PostCodeEvent {
        Created(PostCodeCreated),
        NameChanged(PostCodeNameChanged),
        Updated(PostCodeUpdated),
        Deleted(PostCodeDeleted),
    }
}

impl PostCodeEvent {
    pub fn id(&self) -> PostCodeId {
        match self {
            PostCodeEvent::Created(e) => e.id,
            PostCodeEvent::NameChanged(e) => e.id,
            PostCodeEvent::Updated(e) => e.id,
            PostCodeEvent::Deleted(e) => e.id,
        }
    }
}
