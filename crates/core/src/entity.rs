//! The four entity families kept by the address projection.

use serde::{Deserialize, Serialize};

/// Entity family a record or event belongs to.
///
/// Used to tag integrity errors and log lines so an operator can tell which
/// map an offending id was looked up in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    PostCode,
    Road,
    AccessAddress,
    UnitAddress,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::PostCode => "post_code",
            EntityKind::Road => "road",
            EntityKind::AccessAddress => "access_address",
            EntityKind::UnitAddress => "unit_address",
        }
    }
}

impl core::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
