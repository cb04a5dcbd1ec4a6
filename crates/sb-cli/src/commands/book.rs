//! End-to-end booking through the wizard.

use std::io::Write;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use sb_core::{
    AvailabilityPolicy, BookingWizard, MinuteOfDay, ReservationId, RoomId, SlotDuration,
    SubmitOutcome, UserId, slots_for,
};
use sb_db::{Database, StoreError};

/// Details entered alongside the time selection.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub room: String,
    pub day: NaiveDate,
    pub start: MinuteOfDay,
    pub duration: SlotDuration,
    pub purpose: String,
    pub attendees: u32,
    pub notes: Option<String>,
    pub recurring: bool,
    pub user: String,
}

/// Drives the wizard through all four steps and commits the reservation.
///
/// A conflict or store failure leaves the wizard in the confirm step with
/// the draft intact; this command surfaces the retained error and fails, so
/// a retry re-runs the flow against fresh availability.
pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    request: &BookingRequest,
    policy: &AvailabilityPolicy,
    now: DateTime<Utc>,
) -> Result<()> {
    let room_id = RoomId::new(request.room.as_str()).context("invalid room id")?;
    let room = db.room(&room_id)?;
    let existing = db.reservations_for_room(&room_id)?;

    let mut wizard = BookingWizard::new(request.day);
    wizard.select_room(room.clone(), &existing, policy)?;
    wizard.to_time_selection()?;

    let slots = slots_for(&room, request.day, &existing, request.duration, policy);
    let slot = slots
        .iter()
        .find(|s| s.start == request.start)
        .with_context(|| {
            format!(
                "{} is not on the booking grid for {}",
                request.start, request.day
            )
        })?;
    wizard.select_slot(slot)?;
    wizard.to_confirm()?;

    wizard.set_purpose(request.purpose.clone())?;
    wizard.set_attendees(request.attendees)?;
    wizard.set_notes(request.notes.clone())?;
    wizard.set_recurring(request.recurring)?;

    let created_by = UserId::new(request.user.as_str()).context("invalid user")?;
    let draft = wizard.begin_submit(mint_booking_id(), created_by)?;

    let outcome = match db.create_reservation(&draft, now) {
        Ok(created) => SubmitOutcome::Created(created),
        Err(StoreError::OverlapConflict { .. }) => SubmitOutcome::Conflict,
        Err(err) => SubmitOutcome::Failed(err.to_string()),
    };
    wizard.resolve_submit(outcome)?;

    if let Some(created) = wizard.created() {
        writeln!(writer, "Booked {} ({})", created.id, created.space_name)?;
        writeln!(
            writer,
            "{} to {}, {} attendees, purpose: {}",
            created.start.format("%Y-%m-%d %H:%M"),
            created.end.format("%H:%M"),
            created.attendees,
            created.purpose,
        )?;
        return Ok(());
    }

    // Draft fields are retained for a retry; report the failure distinctly.
    let failure = wizard
        .last_error()
        .map_or_else(|| "unknown failure".to_string(), ToString::to_string);
    writeln!(writer, "Booking not created: {failure}")?;
    bail!("{failure}");
}

/// Mints an opaque `BK`-prefixed booking id.
fn mint_booking_id() -> ReservationId {
    ReservationId::new(format!("BK{}", Uuid::new_v4().simple()))
        .expect("uuid-based id is never empty")
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeSet;

    use chrono::TimeZone;
    use sb_core::{BaseAvailability, Room, RoomType};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 9, 12, 0, 0).single().unwrap()
    }

    fn policy() -> AvailabilityPolicy {
        AvailabilityPolicy {
            high_demand: Vec::new(),
            ..AvailabilityPolicy::default()
        }
    }

    fn seeded_db() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        db.upsert_rooms(&[Room {
            id: RoomId::new("r1").unwrap(),
            name: "Alpha".to_string(),
            location: "2F".to_string(),
            building: "Main".to_string(),
            capacity: 8,
            amenities: BTreeSet::new(),
            room_type: RoomType::StudyRoom,
            base_availability: BaseAvailability::Available,
        }])
        .unwrap();
        db
    }

    fn request(start: &str) -> BookingRequest {
        BookingRequest {
            room: "r1".to_string(),
            day: day(),
            start: start.parse().unwrap(),
            duration: SlotDuration::M60,
            purpose: "project sync".to_string(),
            attendees: 4,
            notes: None,
            recurring: false,
            user: "u1".to_string(),
        }
    }

    #[test]
    fn booking_creates_reservation() {
        let mut db = seeded_db();
        let mut output = Vec::new();
        run(&mut output, &mut db, &request("14:00"), &policy(), now()).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.starts_with("Booked BK"), "unexpected: {output}");
        assert!(output.contains("2025-03-10 14:00 to 15:00"), "{output}");

        let stored = db.list_reservations().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].purpose, "project sync");
        assert_eq!((stored[0].end - stored[0].start).num_minutes(), 60);
    }

    #[test]
    fn double_booking_same_slot_fails_with_conflict() {
        let mut db = seeded_db();
        let mut output = Vec::new();
        run(&mut output, &mut db, &request("14:00"), &policy(), now()).unwrap();

        // second attempt sees the slot as booked on the grid already
        let mut output = Vec::new();
        let err = run(&mut output, &mut db, &request("14:00"), &policy(), now()).unwrap_err();
        assert!(
            err.to_string().contains("booked"),
            "unexpected error: {err}"
        );
        assert_eq!(db.list_reservations().unwrap().len(), 1);
    }

    #[test]
    fn overlapping_attempt_fails_and_keeps_store_clean() {
        let mut db = seeded_db();
        let mut output = Vec::new();
        run(&mut output, &mut db, &request("14:00"), &policy(), now()).unwrap();

        // 13:30-14:30 overlaps the committed 14:00-15:00
        let mut output = Vec::new();
        let result = run(&mut output, &mut db, &request("13:30"), &policy(), now());
        assert!(result.is_err());
        assert_eq!(db.list_reservations().unwrap().len(), 1);
    }

    #[test]
    fn off_grid_start_is_rejected() {
        let mut db = seeded_db();
        let mut output = Vec::new();
        let err = run(&mut output, &mut db, &request("14:10"), &policy(), now()).unwrap_err();
        assert!(err.to_string().contains("not on the booking grid"));
    }

    #[test]
    fn minted_ids_are_opaque_bk_tokens() {
        let id = mint_booking_id();
        assert!(id.as_str().starts_with("BK"));
        assert!(id.as_str().len() > 10);
        assert_ne!(mint_booking_id(), mint_booking_id());
    }
}
