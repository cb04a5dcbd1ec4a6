//! Reservation records and lifecycle classification.
//!
//! Classification is a pure function of `(now, reservations)` so list views
//! and any derived counts always agree, and so the buckets are testable with
//! an injected clock.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ReservationId, ReservationStatus, RoomId, UserId};

/// A committed reservation. Owned by the store; the wizard only requests
/// creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub space_id: RoomId,
    /// Denormalized for display and search.
    pub space_name: String,
    pub building: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub attendees: u32,
    pub purpose: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub status: ReservationStatus,
    pub is_recurring: bool,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub checked_in_at: Option<DateTime<Utc>>,
}

impl Reservation {
    /// Booked length in minutes. `end - start` by construction.
    #[must_use]
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// The not-yet-committed booking details handed from the wizard to the
/// store. The id is client-assigned so a retried create reconciles instead
/// of duplicating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationDraft {
    pub id: ReservationId,
    pub space_id: RoomId,
    pub space_name: String,
    pub building: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub attendees: u32,
    pub purpose: String,
    pub notes: Option<String>,
    pub is_recurring: bool,
    pub created_by: UserId,
}

/// Named lifecycle partitions of a reservation list, computed relative to a
/// reference time. `recurring` is flag-based and may overlap the others.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleBuckets {
    pub all: Vec<Reservation>,
    pub upcoming: Vec<Reservation>,
    pub today: Vec<Reservation>,
    pub past: Vec<Reservation>,
    pub recurring: Vec<Reservation>,
}

/// Which time bucket a reservation falls in relative to `now`.
///
/// A reservation starting exactly at `now` has not begun yet and counts as
/// upcoming, so every reservation lands in exactly one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBucket {
    Upcoming,
    Past,
}

impl TimeBucket {
    #[must_use]
    pub fn of(reservation: &Reservation, now: DateTime<Utc>) -> Self {
        if reservation.start < now {
            Self::Past
        } else {
            Self::Upcoming
        }
    }
}

/// Partitions reservations into lifecycle buckets.
///
/// `today` uses the caller's local calendar day, carried by `offset`;
/// everything else compares instants directly. Recomputed from scratch on
/// every call, never cached.
#[must_use]
pub fn classify(
    reservations: &[Reservation],
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> LifecycleBuckets {
    let today_local = now.with_timezone(&offset).date_naive();
    let mut buckets = LifecycleBuckets {
        all: reservations.to_vec(),
        ..LifecycleBuckets::default()
    };

    for reservation in reservations {
        match TimeBucket::of(reservation, now) {
            TimeBucket::Upcoming => buckets.upcoming.push(reservation.clone()),
            TimeBucket::Past => buckets.past.push(reservation.clone()),
        }
        if reservation.start.with_timezone(&offset).date_naive() == today_local {
            buckets.today.push(reservation.clone());
        }
        if reservation.is_recurring {
            buckets.recurring.push(reservation.clone());
        }
    }

    tracing::debug!(
        total = buckets.all.len(),
        upcoming = buckets.upcoming.len(),
        today = buckets.today.len(),
        past = buckets.past.len(),
        "classified reservations"
    );
    buckets
}

/// Case-insensitive substring search over space name, building, and purpose.
/// Preserves the input order.
#[must_use]
pub fn search_reservations(reservations: &[Reservation], query: &str) -> Vec<Reservation> {
    let needle = query.to_lowercase();
    reservations
        .iter()
        .filter(|r| {
            r.space_name.to_lowercase().contains(&needle)
                || r.building.to_lowercase().contains(&needle)
                || r.purpose.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}
