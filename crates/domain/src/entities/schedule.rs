use serde::{Deserialize, Serialize};

use crate::value_objects::Coordinates;

/// A scheduled waypoint: where an NPC should be from `time` onwards.
///
/// `time` is the game clock tick at which the entry becomes current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub waypoint: String,
    pub time: u32,
    pub location: String,
    pub coordinates: Coordinates,
}

impl ScheduleEntry {
    pub fn new(
        waypoint: impl Into<String>,
        time: u32,
        location: impl Into<String>,
        coordinates: Coordinates,
    ) -> Self {
        Self {
            waypoint: waypoint.into(),
            time,
            location: location.into(),
            coordinates,
        }
    }
}
