//! Core domain logic for the space booker.
//!
//! This crate contains the fundamental types and logic for:
//! - Catalog filtering: pure predicate composition over rooms
//! - Availability: slot grids derived from confirmed reservations
//! - The booking wizard: a guarded four-step state machine
//! - Lifecycle classification: upcoming/today/past/recurring buckets
//! - Check-in: QR/manual resolution gated to a time window
//!
//! Everything time-dependent takes an injected clock; nothing here performs
//! I/O.

pub mod availability;
pub mod catalog;
pub mod checkin;
pub mod reservation;
pub mod types;
pub mod wizard;

pub use availability::{
    AvailabilityPolicy, DemandWindow, Invalidation, Revalidation, SlotStatus, TimeSlot,
    minute_on_day, overlaps, revalidate_selection, slots_for,
};
pub use catalog::{CapacityBucket, FilterCriteria, Room, filter_rooms};
pub use checkin::{
    CheckInError, CheckInPolicy, Decoder, JsonFrameDecoder, QrPayload, WindowMiss, eligible,
    resolve_manual, resolve_qr, suggest,
};
pub use reservation::{
    LifecycleBuckets, Reservation, ReservationDraft, TimeBucket, classify, search_reservations,
};
pub use types::{
    BaseAvailability, MinuteOfDay, ReservationId, ReservationStatus, RoomId, RoomType,
    SlotDuration, StatusDisplay, Tone, UserId, ValidationError,
};
pub use wizard::{
    BookingWizard, DraftDetails, RoomSelection, SubmitFailure, SubmitOutcome, WizardError,
    WizardStep,
};
