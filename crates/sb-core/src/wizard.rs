//! Booking wizard state machine.
//!
//! An explicit, serializable state value drives the four booking steps with
//! guarded transitions, so the flow is unit-testable without any rendering.
//! The wizard never talks to storage itself: `begin_submit` hands out a
//! draft with a client-assigned reservation id and `resolve_submit` feeds
//! the store outcome back in.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::availability::{
    AvailabilityPolicy, Invalidation, Revalidation, SlotStatus, TimeSlot, minute_on_day,
    revalidate_selection,
};
use crate::catalog::Room;
use crate::reservation::{Reservation, ReservationDraft};
use crate::types::{BaseAvailability, MinuteOfDay, ReservationId, RoomId, SlotDuration, UserId};

/// The four wizard steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    SelectRoom,
    SelectTime,
    Confirm,
    Success,
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SelectRoom => "select-room",
            Self::SelectTime => "select-time",
            Self::Confirm => "confirm",
            Self::Success => "success",
        };
        f.write_str(s)
    }
}

/// Rejected transitions and guard failures. All synchronous; none reach the
/// store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WizardError {
    /// The requested action is not valid in the current step.
    #[error("cannot {action} while in the {step} step")]
    InvalidTransition { step: WizardStep, action: &'static str },

    /// The chosen room is fully booked at the catalog level.
    #[error("room {room} is fully booked")]
    RoomUnavailable { room: RoomId },

    /// No room chosen yet.
    #[error("no room selected")]
    NoRoomSelected,

    /// No start time chosen yet.
    #[error("no start time selected")]
    NoTimeSelected,

    /// The chosen slot is booked and cannot be selected.
    #[error("slot at {start} is already booked")]
    SlotNotSelectable { start: MinuteOfDay },

    /// A confirm is already in flight; repeated submits are no-ops.
    #[error("a booking request is already in flight")]
    SubmitInFlight,

    /// Booking purpose must not be empty.
    #[error("purpose cannot be empty")]
    EmptyPurpose,

    /// Attendee count outside the room's capacity.
    #[error("{attendees} attendees exceeds capacity {capacity}")]
    TooManyAttendees { attendees: u32, capacity: u32 },

    /// Attendee count of zero.
    #[error("at least one attendee is required")]
    NoAttendees,

    /// The wizard already produced a reservation; start a new one.
    #[error("booking already completed; start a new wizard")]
    AlreadyCompleted,
}

/// Free-form booking details collected in the confirm step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftDetails {
    pub purpose: String,
    pub attendees: u32,
    pub notes: Option<String>,
    pub is_recurring: bool,
}

impl Default for DraftDetails {
    fn default() -> Self {
        Self {
            purpose: String::new(),
            attendees: 1,
            notes: None,
            is_recurring: false,
        }
    }
}

/// What happened to an existing time selection when the room changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomSelection {
    /// First room choice, or no time had been chosen yet.
    Selected,
    /// The previously chosen start/duration still fit the new room.
    TimeKept(SlotStatus),
    /// The previous selection is invalid for the new room and was cleared.
    TimeCleared(Invalidation),
}

/// Failure surfaced in the confirm step. The draft is always retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitFailure {
    /// The slot was taken between selection and commit.
    SlotTaken,
    /// The store failed for another reason; retryable.
    Store(String),
}

impl fmt::Display for SubmitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SlotTaken => f.write_str("slot no longer available"),
            Self::Store(message) => write!(f, "booking failed: {message}"),
        }
    }
}

/// Store outcome fed back via [`BookingWizard::resolve_submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created(Reservation),
    Conflict,
    Failed(String),
}

/// One booking attempt. Discarded on success or explicit reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingWizard {
    step: WizardStep,
    day: NaiveDate,
    selected_room: Option<Room>,
    selected_start: Option<MinuteOfDay>,
    selected_status: Option<SlotStatus>,
    duration: SlotDuration,
    details: DraftDetails,
    /// Client-assigned id, minted on first submit and reused on retries.
    pending_id: Option<ReservationId>,
    submit_in_flight: bool,
    created: Option<Reservation>,
    #[serde(skip)]
    last_error: Option<SubmitFailure>,
}

impl BookingWizard {
    /// Starts a fresh wizard for a booking on `day`.
    #[must_use]
    pub fn new(day: NaiveDate) -> Self {
        Self {
            step: WizardStep::SelectRoom,
            day,
            selected_room: None,
            selected_start: None,
            selected_status: None,
            duration: SlotDuration::default(),
            details: DraftDetails::default(),
            pending_id: None,
            submit_in_flight: false,
            created: None,
            last_error: None,
        }
    }

    #[must_use]
    pub const fn step(&self) -> WizardStep {
        self.step
    }

    #[must_use]
    pub const fn day(&self) -> NaiveDate {
        self.day
    }

    #[must_use]
    pub const fn selected_room(&self) -> Option<&Room> {
        self.selected_room.as_ref()
    }

    #[must_use]
    pub const fn selected_start(&self) -> Option<MinuteOfDay> {
        self.selected_start
    }

    #[must_use]
    pub const fn duration(&self) -> SlotDuration {
        self.duration
    }

    #[must_use]
    pub const fn details(&self) -> &DraftDetails {
        &self.details
    }

    #[must_use]
    pub const fn last_error(&self) -> Option<&SubmitFailure> {
        self.last_error.as_ref()
    }

    /// The reservation created on success.
    #[must_use]
    pub const fn created(&self) -> Option<&Reservation> {
        self.created.as_ref()
    }

    fn guard_active(&self) -> Result<(), WizardError> {
        if self.step == WizardStep::Success {
            return Err(WizardError::AlreadyCompleted);
        }
        if self.submit_in_flight {
            return Err(WizardError::SubmitInFlight);
        }
        Ok(())
    }

    /// Chooses a room while in the room step.
    ///
    /// Switching to a different room keeps an already-chosen start/duration
    /// but re-validates it against the new room's reservations; an interval
    /// that is booked there is cleared and reported, never carried forward.
    pub fn select_room(
        &mut self,
        room: Room,
        existing: &[Reservation],
        policy: &AvailabilityPolicy,
    ) -> Result<RoomSelection, WizardError> {
        self.guard_active()?;
        if self.step != WizardStep::SelectRoom {
            return Err(WizardError::InvalidTransition {
                step: self.step,
                action: "select a room",
            });
        }
        if room.base_availability == BaseAvailability::Booked {
            return Err(WizardError::RoomUnavailable { room: room.id });
        }

        let switched = self
            .selected_room
            .as_ref()
            .is_some_and(|previous| previous.id != room.id);

        let outcome = match self.selected_start {
            Some(start) if switched => {
                match revalidate_selection(&room, self.day, start, self.duration, existing, policy)
                {
                    Revalidation::Valid(status) => {
                        self.selected_status = Some(status);
                        RoomSelection::TimeKept(status)
                    }
                    Revalidation::Invalidated(reason) => {
                        self.selected_start = None;
                        self.selected_status = None;
                        RoomSelection::TimeCleared(reason)
                    }
                }
            }
            _ => RoomSelection::Selected,
        };

        tracing::debug!(room = %room.id, ?outcome, "room selected");
        self.selected_room = Some(room);
        Ok(outcome)
    }

    /// `SelectRoom → SelectTime`, guarded by a selectable room.
    pub fn to_time_selection(&mut self) -> Result<(), WizardError> {
        self.guard_active()?;
        if self.step != WizardStep::SelectRoom {
            return Err(WizardError::InvalidTransition {
                step: self.step,
                action: "continue to time selection",
            });
        }
        let room = self
            .selected_room
            .as_ref()
            .ok_or(WizardError::NoRoomSelected)?;
        if room.base_availability == BaseAvailability::Booked {
            return Err(WizardError::RoomUnavailable {
                room: room.id.clone(),
            });
        }
        self.step = WizardStep::SelectTime;
        Ok(())
    }

    /// Chooses a computed slot. Booked slots are rejected; limited ones are
    /// allowed.
    pub fn select_slot(&mut self, slot: &TimeSlot) -> Result<(), WizardError> {
        self.guard_active()?;
        if self.step != WizardStep::SelectTime {
            return Err(WizardError::InvalidTransition {
                step: self.step,
                action: "select a time",
            });
        }
        if !slot.status.is_selectable() {
            return Err(WizardError::SlotNotSelectable { start: slot.start });
        }
        self.selected_start = Some(slot.start);
        self.selected_status = Some(slot.status);
        self.duration = slot.duration;
        Ok(())
    }

    /// Changes the duration, re-validating any chosen start against the same
    /// overlap rule. An invalidated selection is cleared and reported.
    pub fn set_duration(
        &mut self,
        duration: SlotDuration,
        existing: &[Reservation],
        policy: &AvailabilityPolicy,
    ) -> Result<Option<Revalidation>, WizardError> {
        self.guard_active()?;
        if self.step != WizardStep::SelectTime {
            return Err(WizardError::InvalidTransition {
                step: self.step,
                action: "change the duration",
            });
        }
        self.duration = duration;

        let (Some(start), Some(room)) = (self.selected_start, self.selected_room.as_ref()) else {
            return Ok(None);
        };
        let revalidation = revalidate_selection(room, self.day, start, duration, existing, policy);
        match revalidation {
            Revalidation::Valid(status) => self.selected_status = Some(status),
            Revalidation::Invalidated(reason) => {
                tracing::debug!(?reason, "duration change invalidated time selection");
                self.selected_start = None;
                self.selected_status = None;
            }
        }
        Ok(Some(revalidation))
    }

    /// `SelectTime → Confirm`, guarded by a selectable slot.
    pub fn to_confirm(&mut self) -> Result<(), WizardError> {
        self.guard_active()?;
        if self.step != WizardStep::SelectTime {
            return Err(WizardError::InvalidTransition {
                step: self.step,
                action: "continue to confirmation",
            });
        }
        let start = self.selected_start.ok_or(WizardError::NoTimeSelected)?;
        match self.selected_status {
            Some(status) if status.is_selectable() => {
                self.step = WizardStep::Confirm;
                Ok(())
            }
            _ => Err(WizardError::SlotNotSelectable { start }),
        }
    }

    /// `Confirm → SelectTime`. Always permitted before success; keeps the
    /// draft and selection untouched.
    pub fn back_to_time_selection(&mut self) -> Result<(), WizardError> {
        self.guard_active()?;
        if self.step != WizardStep::Confirm {
            return Err(WizardError::InvalidTransition {
                step: self.step,
                action: "go back to time selection",
            });
        }
        self.step = WizardStep::SelectTime;
        Ok(())
    }

    /// `SelectTime → SelectRoom`. Always permitted before success; keeps the
    /// time selection and draft untouched.
    pub fn back_to_room_selection(&mut self) -> Result<(), WizardError> {
        self.guard_active()?;
        if self.step != WizardStep::SelectTime {
            return Err(WizardError::InvalidTransition {
                step: self.step,
                action: "go back to room selection",
            });
        }
        self.step = WizardStep::SelectRoom;
        Ok(())
    }

    /// The only action that clears everything collected so far.
    pub fn start_over(&mut self) -> Result<(), WizardError> {
        self.guard_active()?;
        *self = Self::new(self.day);
        Ok(())
    }

    /// Draft detail setters; valid until the wizard completes.
    pub fn set_purpose(&mut self, purpose: impl Into<String>) -> Result<(), WizardError> {
        self.guard_active()?;
        self.details.purpose = purpose.into();
        Ok(())
    }

    pub fn set_attendees(&mut self, attendees: u32) -> Result<(), WizardError> {
        self.guard_active()?;
        self.details.attendees = attendees;
        Ok(())
    }

    pub fn set_notes(&mut self, notes: Option<String>) -> Result<(), WizardError> {
        self.guard_active()?;
        self.details.notes = notes;
        Ok(())
    }

    pub fn set_recurring(&mut self, recurring: bool) -> Result<(), WizardError> {
        self.guard_active()?;
        self.details.is_recurring = recurring;
        Ok(())
    }

    /// Starts the single in-flight create.
    ///
    /// Validates the draft, marks the submit in flight (repeat calls fail
    /// with [`WizardError::SubmitInFlight`]), and returns the draft carrying
    /// the client-assigned id. `candidate_id` is adopted on the first call
    /// only; retries reuse the original id so the store can reconcile a
    /// create whose response never arrived instead of booking twice.
    pub fn begin_submit(
        &mut self,
        candidate_id: ReservationId,
        created_by: UserId,
    ) -> Result<ReservationDraft, WizardError> {
        match self.step {
            WizardStep::Success => return Err(WizardError::AlreadyCompleted),
            WizardStep::Confirm => {}
            step => {
                return Err(WizardError::InvalidTransition {
                    step,
                    action: "confirm the booking",
                });
            }
        }
        if self.submit_in_flight {
            return Err(WizardError::SubmitInFlight);
        }

        let room = self
            .selected_room
            .as_ref()
            .ok_or(WizardError::NoRoomSelected)?;
        let start = self.selected_start.ok_or(WizardError::NoTimeSelected)?;
        if self.details.purpose.trim().is_empty() {
            return Err(WizardError::EmptyPurpose);
        }
        if self.details.attendees == 0 {
            return Err(WizardError::NoAttendees);
        }
        if self.details.attendees > room.capacity {
            return Err(WizardError::TooManyAttendees {
                attendees: self.details.attendees,
                capacity: room.capacity,
            });
        }

        let id = self.pending_id.get_or_insert(candidate_id).clone();
        let start_at = minute_on_day(self.day, start.value());
        let end_at = minute_on_day(self.day, start.value() + self.duration.minutes());

        self.submit_in_flight = true;
        self.last_error = None;
        tracing::debug!(reservation = %id, room = %room.id, "booking submit started");

        Ok(ReservationDraft {
            id,
            space_id: room.id.clone(),
            space_name: room.name.clone(),
            building: room.building.clone(),
            start: start_at,
            end: end_at,
            attendees: self.details.attendees,
            purpose: self.details.purpose.clone(),
            notes: self.details.notes.clone(),
            is_recurring: self.details.is_recurring,
            created_by,
        })
    }

    /// Abandons a submit whose outcome will never be delivered, e.g. the
    /// user navigated away mid-request.
    ///
    /// The client-assigned id is kept: if the original request did land, a
    /// later retry reconciles against the stored row instead of creating a
    /// duplicate.
    pub fn abandon_submit(&mut self) -> Result<(), WizardError> {
        if !self.submit_in_flight {
            return Err(WizardError::InvalidTransition {
                step: self.step,
                action: "abandon a booking that was never submitted",
            });
        }
        tracing::debug!("in-flight booking abandoned");
        self.submit_in_flight = false;
        Ok(())
    }

    /// Feeds the store outcome back into the machine.
    ///
    /// Success reaches the terminal step. Both failure kinds stay in
    /// `Confirm` with every draft field retained; the caller surfaces
    /// [`BookingWizard::last_error`] and may go back to re-query slots.
    pub fn resolve_submit(&mut self, outcome: SubmitOutcome) -> Result<(), WizardError> {
        if !self.submit_in_flight {
            return Err(WizardError::InvalidTransition {
                step: self.step,
                action: "resolve a booking that was never submitted",
            });
        }
        self.submit_in_flight = false;
        match outcome {
            SubmitOutcome::Created(reservation) => {
                tracing::info!(reservation = %reservation.id, "booking created");
                self.created = Some(reservation);
                self.step = WizardStep::Success;
            }
            SubmitOutcome::Conflict => {
                self.last_error = Some(SubmitFailure::SlotTaken);
            }
            SubmitOutcome::Failed(message) => {
                self.last_error = Some(SubmitFailure::Store(message));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::{SlotStatus, slots_for};
    use crate::types::{BaseAvailability, ReservationStatus, RoomType};
    use chrono::Duration;
    use std::collections::BTreeSet;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn room(id: &str, capacity: u32) -> Room {
        Room {
            id: RoomId::new(id).unwrap(),
            name: format!("Room {id}"),
            location: "2F".to_string(),
            building: "Main".to_string(),
            capacity,
            amenities: BTreeSet::new(),
            room_type: RoomType::StudyRoom,
            base_availability: BaseAvailability::Available,
        }
    }

    fn policy() -> AvailabilityPolicy {
        AvailabilityPolicy {
            high_demand: Vec::new(),
            ..AvailabilityPolicy::default()
        }
    }

    fn confirmed(room_id: &str, start_min: u16, end_min: u16) -> Reservation {
        Reservation {
            id: ReservationId::new(format!("BK-{room_id}-{start_min}")).unwrap(),
            space_id: RoomId::new(room_id).unwrap(),
            space_name: room_id.to_string(),
            building: "Main".to_string(),
            start: minute_on_day(day(), start_min),
            end: minute_on_day(day(), end_min),
            attendees: 2,
            purpose: "existing".to_string(),
            notes: None,
            status: ReservationStatus::Confirmed,
            is_recurring: false,
            created_by: UserId::new("u0").unwrap(),
            created_at: minute_on_day(day(), 0) - Duration::days(1),
            checked_in_at: None,
        }
    }

    fn slot(start: &str, duration: SlotDuration, status: SlotStatus) -> TimeSlot {
        TimeSlot {
            start: start.parse().unwrap(),
            duration,
            status,
        }
    }

    fn wizard_at_confirm() -> BookingWizard {
        let mut wizard = BookingWizard::new(day());
        wizard.select_room(room("r1", 8), &[], &policy()).unwrap();
        wizard.to_time_selection().unwrap();
        wizard
            .select_slot(&slot("10:00", SlotDuration::M60, SlotStatus::Available))
            .unwrap();
        wizard.to_confirm().unwrap();
        wizard.set_purpose("project sync").unwrap();
        wizard.set_attendees(4).unwrap();
        wizard
    }

    fn bk(n: u32) -> ReservationId {
        ReservationId::new(format!("BK{n:04}")).unwrap()
    }

    fn user() -> UserId {
        UserId::new("u1").unwrap()
    }

    fn created_from(draft: &ReservationDraft) -> Reservation {
        Reservation {
            id: draft.id.clone(),
            space_id: draft.space_id.clone(),
            space_name: draft.space_name.clone(),
            building: draft.building.clone(),
            start: draft.start,
            end: draft.end,
            attendees: draft.attendees,
            purpose: draft.purpose.clone(),
            notes: draft.notes.clone(),
            status: ReservationStatus::Confirmed,
            is_recurring: draft.is_recurring,
            created_by: draft.created_by.clone(),
            created_at: draft.start - Duration::days(1),
            checked_in_at: None,
        }
    }

    #[test]
    fn happy_path_reaches_success() {
        let mut wizard = wizard_at_confirm();
        let draft = wizard.begin_submit(bk(1), user()).unwrap();
        assert_eq!(draft.start, minute_on_day(day(), 600));
        assert_eq!(draft.end, minute_on_day(day(), 660));

        wizard
            .resolve_submit(SubmitOutcome::Created(created_from(&draft)))
            .unwrap();
        assert_eq!(wizard.step(), WizardStep::Success);
        assert_eq!(wizard.created().unwrap().id, draft.id);
    }

    #[test]
    fn cannot_advance_without_room() {
        let mut wizard = BookingWizard::new(day());
        assert_eq!(
            wizard.to_time_selection(),
            Err(WizardError::NoRoomSelected)
        );
    }

    #[test]
    fn fully_booked_room_is_rejected() {
        let mut wizard = BookingWizard::new(day());
        let mut booked = room("r1", 8);
        booked.base_availability = BaseAvailability::Booked;
        let err = wizard.select_room(booked, &[], &policy()).unwrap_err();
        assert!(matches!(err, WizardError::RoomUnavailable { .. }));
    }

    #[test]
    fn booked_slot_cannot_be_selected_but_limited_can() {
        let mut wizard = BookingWizard::new(day());
        wizard.select_room(room("r1", 8), &[], &policy()).unwrap();
        wizard.to_time_selection().unwrap();

        let err = wizard
            .select_slot(&slot("10:00", SlotDuration::M60, SlotStatus::Booked))
            .unwrap_err();
        assert!(matches!(err, WizardError::SlotNotSelectable { .. }));

        wizard
            .select_slot(&slot("10:00", SlotDuration::M60, SlotStatus::Limited))
            .unwrap();
        wizard.to_confirm().unwrap();
        assert_eq!(wizard.step(), WizardStep::Confirm);
    }

    #[test]
    fn confirm_requires_time_selection() {
        let mut wizard = BookingWizard::new(day());
        wizard.select_room(room("r1", 8), &[], &policy()).unwrap();
        wizard.to_time_selection().unwrap();
        assert_eq!(wizard.to_confirm(), Err(WizardError::NoTimeSelected));
    }

    #[test]
    fn backward_transitions_keep_later_state() {
        let mut wizard = wizard_at_confirm();
        wizard.back_to_time_selection().unwrap();
        assert_eq!(wizard.step(), WizardStep::SelectTime);
        // selection and draft survive going back
        assert_eq!(wizard.selected_start().unwrap().to_string(), "10:00");
        assert_eq!(wizard.details().purpose, "project sync");
        assert_eq!(wizard.details().attendees, 4);

        wizard.back_to_room_selection().unwrap();
        assert_eq!(wizard.step(), WizardStep::SelectRoom);
        assert!(wizard.selected_room().is_some());
        assert_eq!(wizard.selected_start().unwrap().to_string(), "10:00");

        // and forward again without re-entering anything
        wizard.to_time_selection().unwrap();
        wizard.to_confirm().unwrap();
        assert_eq!(wizard.details().purpose, "project sync");
    }

    #[test]
    fn start_over_clears_everything() {
        let mut wizard = wizard_at_confirm();
        wizard.start_over().unwrap();
        assert_eq!(wizard.step(), WizardStep::SelectRoom);
        assert!(wizard.selected_room().is_none());
        assert!(wizard.selected_start().is_none());
        assert_eq!(wizard.details().purpose, "");
    }

    #[test]
    fn switching_rooms_revalidates_kept_time() {
        let mut wizard = wizard_at_confirm();
        wizard.back_to_time_selection().unwrap();
        wizard.back_to_room_selection().unwrap();

        // the other room is free at 10:00: selection kept
        let outcome = wizard.select_room(room("r2", 8), &[], &policy()).unwrap();
        assert_eq!(outcome, RoomSelection::TimeKept(SlotStatus::Available));
        assert_eq!(wizard.selected_start().unwrap().to_string(), "10:00");
    }

    #[test]
    fn switching_rooms_clears_conflicting_time() {
        let mut wizard = wizard_at_confirm();
        wizard.back_to_time_selection().unwrap();
        wizard.back_to_room_selection().unwrap();

        let existing = vec![confirmed("r2", 10 * 60, 11 * 60)];
        let outcome = wizard
            .select_room(room("r2", 8), &existing, &policy())
            .unwrap();
        assert_eq!(outcome, RoomSelection::TimeCleared(Invalidation::Conflict));
        assert!(wizard.selected_start().is_none());
        // draft details survive the cleared time
        assert_eq!(wizard.details().purpose, "project sync");
    }

    #[test]
    fn reselecting_same_room_keeps_selection_untouched() {
        let mut wizard = wizard_at_confirm();
        wizard.back_to_time_selection().unwrap();
        wizard.back_to_room_selection().unwrap();
        let outcome = wizard.select_room(room("r1", 8), &[], &policy()).unwrap();
        assert_eq!(outcome, RoomSelection::Selected);
        assert!(wizard.selected_start().is_some());
    }

    #[test]
    fn duration_change_clears_invalidated_selection() {
        let existing = vec![confirmed("r1", 11 * 60, 12 * 60)];
        let mut wizard = BookingWizard::new(day());
        wizard
            .select_room(room("r1", 8), &existing, &policy())
            .unwrap();
        wizard.to_time_selection().unwrap();
        wizard
            .select_slot(&slot("10:00", SlotDuration::M60, SlotStatus::Available))
            .unwrap();

        let reval = wizard
            .set_duration(SlotDuration::M120, &existing, &policy())
            .unwrap();
        assert_eq!(reval, Some(Revalidation::Invalidated(Invalidation::Conflict)));
        assert!(wizard.selected_start().is_none());
        assert_eq!(wizard.to_confirm(), Err(WizardError::NoTimeSelected));
    }

    #[test]
    fn submit_guard_blocks_double_confirm() {
        let mut wizard = wizard_at_confirm();
        let _draft = wizard.begin_submit(bk(1), user()).unwrap();
        assert_eq!(
            wizard.begin_submit(bk(2), user()),
            Err(WizardError::SubmitInFlight)
        );
    }

    #[test]
    fn conflict_keeps_confirm_and_draft() {
        let mut wizard = wizard_at_confirm();
        let draft = wizard.begin_submit(bk(1), user()).unwrap();
        wizard.resolve_submit(SubmitOutcome::Conflict).unwrap();

        assert_eq!(wizard.step(), WizardStep::Confirm);
        assert_eq!(wizard.last_error(), Some(&SubmitFailure::SlotTaken));
        assert_eq!(wizard.details().purpose, "project sync");
        assert_eq!(wizard.details().attendees, 4);
        assert_eq!(wizard.selected_start().unwrap().to_string(), "10:00");

        // retry is possible and reuses the same client-assigned id
        let retry = wizard.begin_submit(bk(2), user()).unwrap();
        assert_eq!(retry.id, draft.id);
    }

    #[test]
    fn store_failure_is_retryable_without_data_loss() {
        let mut wizard = wizard_at_confirm();
        wizard.set_notes(Some("bring cables".to_string())).unwrap();
        let draft = wizard.begin_submit(bk(1), user()).unwrap();
        wizard
            .resolve_submit(SubmitOutcome::Failed("disk full".to_string()))
            .unwrap();

        assert_eq!(wizard.step(), WizardStep::Confirm);
        assert!(matches!(
            wizard.last_error(),
            Some(SubmitFailure::Store(_))
        ));
        let retry = wizard.begin_submit(bk(9), user()).unwrap();
        assert_eq!(retry.id, draft.id);
        assert_eq!(retry.notes.as_deref(), Some("bring cables"));
    }

    #[test]
    fn abandoned_submit_can_retry_with_same_id() {
        let mut wizard = wizard_at_confirm();
        let draft = wizard.begin_submit(bk(1), user()).unwrap();

        // navigating away mid-request releases the guard but keeps the id
        wizard.abandon_submit().unwrap();
        let retry = wizard.begin_submit(bk(7), user()).unwrap();
        assert_eq!(retry.id, draft.id);

        // abandoning with nothing in flight is a misuse
        let mut idle = wizard_at_confirm();
        assert!(idle.abandon_submit().is_err());
    }

    #[test]
    fn success_is_terminal() {
        let mut wizard = wizard_at_confirm();
        let draft = wizard.begin_submit(bk(1), user()).unwrap();
        wizard
            .resolve_submit(SubmitOutcome::Created(created_from(&draft)))
            .unwrap();

        assert_eq!(
            wizard.begin_submit(bk(2), user()),
            Err(WizardError::AlreadyCompleted)
        );
        assert_eq!(wizard.start_over(), Err(WizardError::AlreadyCompleted));
        assert_eq!(
            wizard.set_purpose("again"),
            Err(WizardError::AlreadyCompleted)
        );
    }

    #[test]
    fn empty_purpose_and_bad_attendees_are_rejected() {
        let mut wizard = wizard_at_confirm();
        wizard.set_purpose("  ").unwrap();
        assert_eq!(
            wizard.begin_submit(bk(1), user()),
            Err(WizardError::EmptyPurpose)
        );

        wizard.set_purpose("ok").unwrap();
        wizard.set_attendees(0).unwrap();
        assert_eq!(
            wizard.begin_submit(bk(1), user()),
            Err(WizardError::NoAttendees)
        );

        wizard.set_attendees(9).unwrap();
        assert_eq!(
            wizard.begin_submit(bk(1), user()),
            Err(WizardError::TooManyAttendees {
                attendees: 9,
                capacity: 8
            })
        );
    }

    #[test]
    fn draft_end_is_start_plus_duration() {
        let existing: Vec<Reservation> = Vec::new();
        let mut wizard = BookingWizard::new(day());
        wizard
            .select_room(room("r1", 8), &existing, &policy())
            .unwrap();
        wizard.to_time_selection().unwrap();
        let slots = slots_for(&room("r1", 8), day(), &existing, SlotDuration::M90, &policy());
        wizard.select_slot(&slots[5]).unwrap(); // 10:30
        wizard.to_confirm().unwrap();
        wizard.set_purpose("seminar").unwrap();

        let draft = wizard.begin_submit(bk(1), user()).unwrap();
        assert_eq!(draft.end - draft.start, Duration::minutes(90));
        assert_eq!(draft.start, minute_on_day(day(), 630));
        assert_eq!(draft.end, minute_on_day(day(), 720));
    }
}
