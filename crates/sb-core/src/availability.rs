//! Time-slot availability over a fixed half-hour grid.
//!
//! Slots are derived values: recomputed on demand from the room, the
//! confirmed reservations, and the opening policy, never stored. A slot
//! whose end would pass the closing time (or midnight) is not emitted at
//! all — day rollover is rejected, not wrapped.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::Room;
use crate::reservation::Reservation;
use crate::types::{MinuteOfDay, ReservationStatus, SlotDuration, StatusDisplay, Tone};

/// Opening hours and demand windows. Comes from configuration, not code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityPolicy {
    /// First bookable minute of the day.
    pub open: MinuteOfDay,

    /// Closing boundary in minutes from midnight; slot ends may touch it but
    /// not pass it. Capped at 1440.
    pub close: u16,

    /// Grid step between candidate starts.
    pub step_minutes: u16,

    /// Windows that mark otherwise-free slots as limited.
    pub high_demand: Vec<DemandWindow>,
}

impl Default for AvailabilityPolicy {
    fn default() -> Self {
        Self {
            open: MinuteOfDay::new(8 * 60).expect("within day"),
            close: 22 * 60,
            step_minutes: 30,
            high_demand: vec![
                // late morning and mid-afternoon peaks
                DemandWindow::new(10 * 60, 12 * 60),
                DemandWindow::new(14 * 60, 16 * 60),
            ],
        }
    }
}

impl AvailabilityPolicy {
    /// Closing boundary clamped to the end of the day.
    #[must_use]
    pub fn close_minutes(&self) -> u16 {
        self.close.min(MinuteOfDay::MINUTES_PER_DAY)
    }
}

/// A half-open `[start, end)` minute window with elevated demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandWindow {
    pub start: u16,
    pub end: u16,
}

impl DemandWindow {
    #[must_use]
    pub const fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    /// Whether `[start, end)` in minutes intersects this window.
    #[must_use]
    pub const fn intersects(&self, start: u16, end: u16) -> bool {
        self.start < end && start < self.end
    }
}

/// Derived availability of one candidate slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Available,
    Limited,
    Booked,
}

impl SlotStatus {
    /// Booked slots are the only non-selectable ones; limited is a warning.
    #[must_use]
    pub const fn is_selectable(&self) -> bool {
        !matches!(self, Self::Booked)
    }

    /// Display descriptor for presentation layers.
    #[must_use]
    pub const fn display(&self) -> StatusDisplay {
        match self {
            Self::Available => StatusDisplay {
                label: "Available",
                symbol: "○",
                tone: Tone::Positive,
            },
            Self::Limited => StatusDisplay {
                label: "Limited",
                symbol: "◐",
                tone: Tone::Notice,
            },
            Self::Booked => StatusDisplay {
                label: "Booked",
                symbol: "●",
                tone: Tone::Negative,
            },
        }
    }
}

/// A candidate booking interval on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: MinuteOfDay,
    pub duration: SlotDuration,
    pub status: SlotStatus,
}

impl TimeSlot {
    /// End boundary in minutes from midnight. May equal 1440.
    #[must_use]
    pub const fn end_minutes(&self) -> u16 {
        self.start.value() + self.duration.minutes()
    }
}

/// Why a previously chosen start time no longer holds after a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    /// The new interval overlaps a confirmed reservation.
    Conflict,
    /// The new end would pass the closing boundary or midnight.
    CrossesClose,
}

/// Outcome of re-checking a selection against the same overlap rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revalidation {
    /// The selection still stands, with its (possibly changed) status.
    Valid(SlotStatus),
    /// The selection must be dropped; callers must not keep it silently.
    Invalidated(Invalidation),
}

/// Half-open interval overlap: `[s1, e1)` and `[s2, e2)` overlap iff
/// `s1 < e2 && s2 < e1`.
#[must_use]
pub fn overlaps(s1: DateTime<Utc>, e1: DateTime<Utc>, s2: DateTime<Utc>, e2: DateTime<Utc>) -> bool {
    s1 < e2 && s2 < e1
}

/// Absolute instant for a minute offset on a calendar day.
#[must_use]
pub fn minute_on_day(day: NaiveDate, minutes: u16) -> DateTime<Utc> {
    day.and_hms_opt(0, 0, 0)
        .expect("midnight exists")
        .and_utc()
        + Duration::minutes(i64::from(minutes))
}

/// Computes the slot grid for one room and day.
///
/// Only reservations for this room in `Confirmed` status block a slot;
/// pending, cancelled, and completed ones do not. The grid runs from the
/// policy's opening minute in `step_minutes` increments, and stops emitting
/// once a slot's end would pass the closing boundary.
#[must_use]
pub fn slots_for(
    room: &Room,
    day: NaiveDate,
    existing: &[Reservation],
    duration: SlotDuration,
    policy: &AvailabilityPolicy,
) -> Vec<TimeSlot> {
    let blocking: Vec<(DateTime<Utc>, DateTime<Utc>)> = existing
        .iter()
        .filter(|r| r.space_id == room.id && r.status == ReservationStatus::Confirmed)
        .map(|r| (r.start, r.end))
        .collect();

    let close = policy.close_minutes();
    let step = policy.step_minutes.max(1);
    let mut slots = Vec::new();
    let mut start = policy.open.value();

    while start + duration.minutes() <= close {
        let status = slot_status(day, start, duration, &blocking, policy);
        slots.push(TimeSlot {
            start: MinuteOfDay::new(start).expect("grid start within day"),
            duration,
            status,
        });
        start += step;
    }

    tracing::debug!(
        room = %room.id,
        %day,
        slots = slots.len(),
        blocking = blocking.len(),
        "computed slot grid"
    );
    slots
}

/// Re-checks a chosen start against a (possibly new) duration.
///
/// Invoked after the booker changes the duration: the resulting end time is
/// validated against the same overlap rule, and a conflicting or
/// boundary-crossing interval yields an explicit invalidation instead of a
/// silently stale selection.
#[must_use]
pub fn revalidate_selection(
    room: &Room,
    day: NaiveDate,
    start: MinuteOfDay,
    duration: SlotDuration,
    existing: &[Reservation],
    policy: &AvailabilityPolicy,
) -> Revalidation {
    if start.value() + duration.minutes() > policy.close_minutes() {
        return Revalidation::Invalidated(Invalidation::CrossesClose);
    }

    let blocking: Vec<(DateTime<Utc>, DateTime<Utc>)> = existing
        .iter()
        .filter(|r| r.space_id == room.id && r.status == ReservationStatus::Confirmed)
        .map(|r| (r.start, r.end))
        .collect();

    match slot_status(day, start.value(), duration, &blocking, policy) {
        SlotStatus::Booked => Revalidation::Invalidated(Invalidation::Conflict),
        status => Revalidation::Valid(status),
    }
}

/// Status priority: booked beats limited beats available.
fn slot_status(
    day: NaiveDate,
    start: u16,
    duration: SlotDuration,
    blocking: &[(DateTime<Utc>, DateTime<Utc>)],
    policy: &AvailabilityPolicy,
) -> SlotStatus {
    let end = start + duration.minutes();
    let slot_start = minute_on_day(day, start);
    let slot_end = minute_on_day(day, end);

    if blocking
        .iter()
        .any(|(s, e)| overlaps(slot_start, slot_end, *s, *e))
    {
        return SlotStatus::Booked;
    }
    if policy.high_demand.iter().any(|w| w.intersects(start, end)) {
        return SlotStatus::Limited;
    }
    SlotStatus::Available
}
