use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// Caller-assigned identifier for a reported hazard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HazardId(pub u64);

/// A user-reported road problem (pothole, debris, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    pub location: GeoPoint,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<HazardId>,
}

/// Identity of a hazard within one scoring call.
///
/// Hazards with an explicit id are the same hazard whenever the ids match,
/// wherever they sit in the list. Hazards without one are identified by
/// their position. Two hazards at the same coordinates stay distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum HazardKey {
    Id(HazardId),
    Index(usize),
}

impl Hazard {
    pub fn new(location: GeoPoint, description: impl Into<String>) -> Self {
        Self {
            location,
            description: description.into(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: HazardId) -> Self {
        self.id = Some(id);
        self
    }

    /// Key for this hazard when it sits at `index` in the request list.
    pub fn key(&self, index: usize) -> HazardKey {
        match self.id {
            Some(id) => HazardKey::Id(id),
            None => HazardKey::Index(index),
        }
    }
}
