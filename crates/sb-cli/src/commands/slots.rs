//! Slot grid display for a room and day.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use sb_core::{AvailabilityPolicy, RoomId, SlotDuration, slots_for};
use sb_db::Database;

/// Prints the computed slot grid.
pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    room_id: &str,
    day: NaiveDate,
    duration: SlotDuration,
    policy: &AvailabilityPolicy,
) -> Result<()> {
    let room_id = RoomId::new(room_id).context("invalid room id")?;
    let room = db.room(&room_id)?;
    let existing = db.reservations_for_room(&room_id)?;
    let slots = slots_for(&room, day, &existing, duration, policy);

    writeln!(writer, "{} on {day} ({duration} slots):", room.name)?;
    if slots.is_empty() {
        writeln!(writer, "No slots fit the opening window.")?;
        return Ok(());
    }
    for slot in slots {
        writeln!(
            writer,
            "{}-{}  {}",
            slot.start,
            fmt_minutes(slot.end_minutes()),
            slot.status.display().label,
        )?;
    }
    Ok(())
}

/// `HH:MM` for a minute count that may be exactly end-of-day.
fn fmt_minutes(minutes: u16) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}
