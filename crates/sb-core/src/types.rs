//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A minute-of-day value outside 0..1440.
    #[error("minute of day must be below 1440, got {value}")]
    MinuteOutOfRange { value: u16 },

    /// A time string that is not `HH:MM`.
    #[error("invalid time: {value} (expected HH:MM)")]
    InvalidTime { value: String },

    /// A duration outside the bookable option set.
    #[error("invalid booking duration: {minutes} minutes")]
    InvalidDuration { minutes: u16 },

    /// Invalid reservation status value.
    #[error("invalid reservation status: {value}")]
    InvalidStatus { value: String },

    /// Invalid room type value.
    #[error("invalid room type: {value}")]
    InvalidRoomType { value: String },

    /// Invalid capacity bucket label.
    #[error("invalid capacity bucket: {value}")]
    InvalidCapacityBucket { value: String },

    /// Invalid base availability value.
    #[error("invalid availability: {value}")]
    InvalidAvailability { value: String },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated room identifier.
    ///
    /// Room IDs must be non-empty strings. They identify catalog entries and
    /// are referenced by reservations as the space being booked.
    RoomId, "room ID"
);

define_string_id!(
    /// A validated reservation identifier.
    ///
    /// Reservation IDs are opaque client-assigned tokens (the CLI mints
    /// `BK`-prefixed ones). They are never parsed, only compared.
    ReservationId, "reservation ID"
);

define_string_id!(
    /// A validated user identifier.
    UserId, "user ID"
);

/// Lifecycle status of a reservation.
///
/// Transitions are monotonic: `Pending` may only advance to `Confirmed`;
/// `Confirmed` may end in `Cancelled` or `Completed`; terminal states never
/// revert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl ReservationStatus {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// Returns true once no further transition is allowed.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }

    /// Whether a transition to `next` respects the monotonic lifecycle.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        match self {
            Self::Pending => matches!(next, Self::Confirmed),
            Self::Confirmed => matches!(next, Self::Cancelled | Self::Completed),
            Self::Cancelled | Self::Completed => false,
        }
    }

    /// Display descriptor for presentation layers.
    #[must_use]
    pub const fn display(&self) -> StatusDisplay {
        match self {
            Self::Pending => StatusDisplay {
                label: "Pending",
                symbol: "…",
                tone: Tone::Notice,
            },
            Self::Confirmed => StatusDisplay {
                label: "Confirmed",
                symbol: "✓",
                tone: Tone::Positive,
            },
            Self::Cancelled => StatusDisplay {
                label: "Cancelled",
                symbol: "✗",
                tone: Tone::Negative,
            },
            Self::Completed => StatusDisplay {
                label: "Completed",
                symbol: "•",
                tone: Tone::Neutral,
            },
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            _ => Err(ValidationError::InvalidStatus {
                value: s.to_string(),
            }),
        }
    }
}

/// Catalog-level availability of a room, independent of any time slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseAvailability {
    Available,
    Limited,
    Booked,
}

impl BaseAvailability {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Limited => "limited",
            Self::Booked => "booked",
        }
    }
}

impl fmt::Display for BaseAvailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BaseAvailability {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "limited" => Ok(Self::Limited),
            "booked" => Ok(Self::Booked),
            _ => Err(ValidationError::InvalidAvailability {
                value: s.to_string(),
            }),
        }
    }
}

/// Kind of bookable space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    StudyRoom,
    ConferenceRoom,
    Classroom,
    Lab,
    Auditorium,
}

impl RoomType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StudyRoom => "study_room",
            Self::ConferenceRoom => "conference_room",
            Self::Classroom => "classroom",
            Self::Lab => "lab",
            Self::Auditorium => "auditorium",
        }
    }
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RoomType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "study_room" => Ok(Self::StudyRoom),
            "conference_room" => Ok(Self::ConferenceRoom),
            "classroom" => Ok(Self::Classroom),
            "lab" => Ok(Self::Lab),
            "auditorium" => Ok(Self::Auditorium),
            _ => Err(ValidationError::InvalidRoomType {
                value: s.to_string(),
            }),
        }
    }
}

/// Bookable slot length. Only the enumerated set is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum SlotDuration {
    M30,
    #[default]
    M60,
    M90,
    M120,
    M180,
    M240,
}

impl SlotDuration {
    /// All durations offered to a booker, shortest first.
    pub const ALL: [Self; 6] = [
        Self::M30,
        Self::M60,
        Self::M90,
        Self::M120,
        Self::M180,
        Self::M240,
    ];

    /// Length in minutes.
    #[must_use]
    pub const fn minutes(&self) -> u16 {
        match self {
            Self::M30 => 30,
            Self::M60 => 60,
            Self::M90 => 90,
            Self::M120 => 120,
            Self::M180 => 180,
            Self::M240 => 240,
        }
    }

    /// Looks up the duration for a minute count.
    pub const fn from_minutes(minutes: u16) -> Result<Self, ValidationError> {
        match minutes {
            30 => Ok(Self::M30),
            60 => Ok(Self::M60),
            90 => Ok(Self::M90),
            120 => Ok(Self::M120),
            180 => Ok(Self::M180),
            240 => Ok(Self::M240),
            _ => Err(ValidationError::InvalidDuration { minutes }),
        }
    }
}

impl fmt::Display for SlotDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} min", self.minutes())
    }
}

impl TryFrom<u16> for SlotDuration {
    type Error = ValidationError;

    fn try_from(minutes: u16) -> Result<Self, Self::Error> {
        Self::from_minutes(minutes)
    }
}

impl From<SlotDuration> for u16 {
    fn from(duration: SlotDuration) -> Self {
        duration.minutes()
    }
}

impl std::str::FromStr for SlotDuration {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let minutes: u16 = s
            .parse()
            .map_err(|_| ValidationError::InvalidDuration { minutes: 0 })?;
        Self::from_minutes(minutes)
    }
}

/// A minute offset within a day, in `0..1440`.
///
/// Used for slot grid starts. Slot *ends* may land exactly on minute 1440
/// and are therefore carried as plain minute counts, not this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct MinuteOfDay(u16);

impl MinuteOfDay {
    pub const MINUTES_PER_DAY: u16 = 1440;

    /// Creates a minute-of-day after range validation.
    pub const fn new(value: u16) -> Result<Self, ValidationError> {
        if value >= Self::MINUTES_PER_DAY {
            return Err(ValidationError::MinuteOutOfRange { value });
        }
        Ok(Self(value))
    }

    #[must_use]
    pub const fn value(self) -> u16 {
        self.0
    }

    #[must_use]
    pub const fn hour(self) -> u16 {
        self.0 / 60
    }

    #[must_use]
    pub const fn minute(self) -> u16 {
        self.0 % 60
    }
}

impl fmt::Display for MinuteOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl TryFrom<u16> for MinuteOfDay {
    type Error = ValidationError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MinuteOfDay> for u16 {
    fn from(minute: MinuteOfDay) -> Self {
        minute.0
    }
}

impl std::str::FromStr for MinuteOfDay {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidTime {
            value: s.to_string(),
        };
        let (hours, minutes) = s.split_once(':').ok_or_else(&invalid)?;
        let hours: u16 = hours.parse().map_err(|_| invalid())?;
        let minutes: u16 = minutes.parse().map_err(|_| invalid())?;
        if minutes >= 60 {
            return Err(invalid());
        }
        Self::new(hours * 60 + minutes).map_err(|_| invalid())
    }
}

/// How a status should be rendered, kept out of the domain state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusDisplay {
    pub label: &'static str,
    pub symbol: &'static str,
    pub tone: Tone,
}

/// Presentation tone for a display descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Positive,
    Notice,
    Negative,
    Neutral,
}
