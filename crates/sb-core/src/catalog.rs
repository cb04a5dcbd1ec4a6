//! Room catalog and filter predicates.
//!
//! Filtering is a pure AND-composition of independent predicates: adding a
//! criterion can only narrow the result, and the catalog order is preserved.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{BaseAvailability, RoomId, RoomType, ValidationError};

/// An immutable catalog entry. Created at catalog load, never mutated by the
/// booking workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub location: String,
    pub building: String,
    pub capacity: u32,
    #[serde(default)]
    pub amenities: BTreeSet<String>,
    pub room_type: RoomType,
    pub base_availability: BaseAvailability,
}

/// Fixed capacity ranges offered as filter options. The last bucket is
/// unbounded above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CapacityBucket {
    UpToFive,
    SixToTen,
    ElevenToTwenty,
    TwentyOneToFifty,
    FiftyPlus,
}

impl CapacityBucket {
    /// All buckets, smallest first.
    pub const ALL: [Self; 5] = [
        Self::UpToFive,
        Self::SixToTen,
        Self::ElevenToTwenty,
        Self::TwentyOneToFifty,
        Self::FiftyPlus,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UpToFive => "1-5",
            Self::SixToTen => "6-10",
            Self::ElevenToTwenty => "11-20",
            Self::TwentyOneToFifty => "21-50",
            Self::FiftyPlus => "50+",
        }
    }

    /// Inclusive membership test for a room capacity.
    #[must_use]
    pub const fn contains(&self, capacity: u32) -> bool {
        match self {
            Self::UpToFive => capacity <= 5,
            Self::SixToTen => capacity >= 6 && capacity <= 10,
            Self::ElevenToTwenty => capacity >= 11 && capacity <= 20,
            Self::TwentyOneToFifty => capacity >= 21 && capacity <= 50,
            Self::FiftyPlus => capacity > 50,
        }
    }
}

impl fmt::Display for CapacityBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CapacityBucket {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1-5" => Ok(Self::UpToFive),
            "6-10" => Ok(Self::SixToTen),
            "11-20" => Ok(Self::ElevenToTwenty),
            "21-50" => Ok(Self::TwentyOneToFifty),
            "50+" => Ok(Self::FiftyPlus),
            _ => Err(ValidationError::InvalidCapacityBucket {
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for CapacityBucket {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CapacityBucket> for String {
    fn from(bucket: CapacityBucket) -> Self {
        bucket.as_str().to_string()
    }
}

/// One filter session's criteria. Absent fields impose no constraint;
/// amenities use AND semantics (the room must carry all of them).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub search_text: Option<String>,
    pub capacity: Option<CapacityBucket>,
    pub building: Option<String>,
    pub room_type: Option<RoomType>,
    #[serde(default)]
    pub amenities: BTreeSet<String>,
}

impl FilterCriteria {
    /// True when no criterion is set, so filtering returns the full catalog.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.search_text.is_none()
            && self.capacity.is_none()
            && self.building.is_none()
            && self.room_type.is_none()
            && self.amenities.is_empty()
    }

    /// Whether a single room satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, room: &Room) -> bool {
        if let Some(text) = &self.search_text {
            let needle = text.to_lowercase();
            let in_name = room.name.to_lowercase().contains(&needle);
            let in_location = room.location.to_lowercase().contains(&needle);
            if !in_name && !in_location {
                return false;
            }
        }
        if let Some(bucket) = self.capacity {
            if !bucket.contains(room.capacity) {
                return false;
            }
        }
        if let Some(building) = &self.building {
            if room.building != *building {
                return false;
            }
        }
        if let Some(room_type) = self.room_type {
            if room.room_type != room_type {
                return false;
            }
        }
        self.amenities.is_subset(&room.amenities)
    }
}

/// Narrows a catalog by the given criteria. Pure and order-preserving; an
/// empty result is a valid outcome, not an error.
#[must_use]
pub fn filter_rooms(catalog: &[Room], criteria: &FilterCriteria) -> Vec<Room> {
    catalog
        .iter()
        .filter(|room| criteria.matches(room))
        .cloned()
        .collect()
}
