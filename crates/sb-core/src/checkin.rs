//! Check-in resolution and eligibility gating.
//!
//! A booking is resolved from a decoded QR payload or manual entry, then
//! gated to a time window around its start. The gate itself never mutates
//! reservation state; recording the check-in is the store's job.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reservation::Reservation;
use crate::types::{ReservationId, ReservationStatus, RoomId, UserId};

/// Decoded QR payload handed over by a scanner collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    pub booking_id: ReservationId,
    pub space_id: RoomId,
    pub user_id: UserId,
    pub timestamp: DateTime<Utc>,
}

/// Seam to whatever produces QR payloads from camera frames.
///
/// The workflow core never touches a camera API; anything that can turn a
/// frame into a payload plugs in here.
pub trait Decoder {
    /// Attempts to decode one frame. `None` means no payload found.
    fn try_decode(&self, frame: &[u8]) -> Option<QrPayload>;
}

/// Decoder for frames that already carry the payload as JSON (the format
/// the campus app renders into its QR codes).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFrameDecoder;

impl Decoder for JsonFrameDecoder {
    fn try_decode(&self, frame: &[u8]) -> Option<QrPayload> {
        serde_json::from_slice(frame).ok()
    }
}

/// Eligibility window around a reservation's start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInPolicy {
    /// Minutes before the start from which check-in opens.
    pub early_minutes: u32,
    /// Minutes after the start until which check-in stays open.
    pub grace_minutes: u32,
}

impl Default for CheckInPolicy {
    fn default() -> Self {
        Self {
            early_minutes: 15,
            grace_minutes: 30,
        }
    }
}

impl CheckInPolicy {
    /// Inclusive window `[start - early, start + grace]`.
    #[must_use]
    pub fn window(&self, start: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            start - chrono::Duration::minutes(i64::from(self.early_minutes)),
            start + chrono::Duration::minutes(i64::from(self.grace_minutes)),
        )
    }
}

/// How far outside the window the attempt landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowMiss {
    /// Too early; how long until the window opens.
    Early { wait_minutes: i64 },
    /// Too late; how long ago the window closed.
    Late { overrun_minutes: i64 },
}

impl fmt::Display for WindowMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Early { wait_minutes } => {
                write!(f, "check-in opens in {wait_minutes} min")
            }
            Self::Late { overrun_minutes } => {
                write!(f, "check-in closed {overrun_minutes} min ago")
            }
        }
    }
}

/// Check-in failures, each with a distinct user-facing message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckInError {
    /// No reservation matches the identifier.
    #[error("no booking found for {identifier}")]
    NotFound { identifier: String },

    /// Resolved, but the attempt is outside the eligibility window.
    #[error("{miss}")]
    OutOfWindow { miss: WindowMiss },

    /// Resolved, but the reservation is not in confirmed status.
    #[error("booking {id} is {status}, not confirmed")]
    NotConfirmed {
        id: ReservationId,
        status: ReservationStatus,
    },
}

/// Resolves a booking from a decoded QR payload by exact id.
pub fn resolve_qr<'a>(
    reservations: &'a [Reservation],
    payload: &QrPayload,
) -> Result<&'a Reservation, CheckInError> {
    reservations
        .iter()
        .find(|r| r.id == payload.booking_id)
        .ok_or_else(|| CheckInError::NotFound {
            identifier: payload.booking_id.to_string(),
        })
}

/// Resolves a booking from manual free-text entry by exact id match.
///
/// Substring resolution is deliberately not offered here: ids sharing a
/// prefix would make a partial match land on the wrong reservation. Partial
/// input goes through [`suggest`] instead.
pub fn resolve_manual<'a>(
    reservations: &'a [Reservation],
    input: &str,
) -> Result<&'a Reservation, CheckInError> {
    let trimmed = input.trim();
    reservations
        .iter()
        .find(|r| r.id.as_str() == trimmed)
        .ok_or_else(|| CheckInError::NotFound {
            identifier: trimmed.to_string(),
        })
}

/// Case-insensitive substring suggestions over booking id and space name,
/// in the input order. Feeds a picker; never resolves on its own.
#[must_use]
pub fn suggest<'a>(reservations: &'a [Reservation], input: &str) -> Vec<&'a Reservation> {
    let needle = input.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    reservations
        .iter()
        .filter(|r| {
            r.id.as_str().to_lowercase().contains(&needle)
                || r.space_name.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Gates a resolved reservation to its eligibility window.
///
/// Only confirmed reservations can check in, and only within
/// `[start - early, start + grace]`. The miss direction carries the wait or
/// overrun so the caller can display it.
pub fn eligible(
    reservation: &Reservation,
    now: DateTime<Utc>,
    policy: &CheckInPolicy,
) -> Result<(), CheckInError> {
    if reservation.status != ReservationStatus::Confirmed {
        return Err(CheckInError::NotConfirmed {
            id: reservation.id.clone(),
            status: reservation.status,
        });
    }

    let (opens, closes) = policy.window(reservation.start);
    if now < opens {
        return Err(CheckInError::OutOfWindow {
            miss: WindowMiss::Early {
                wait_minutes: (opens - now).num_minutes(),
            },
        });
    }
    if now > closes {
        return Err(CheckInError::OutOfWindow {
            miss: WindowMiss::Late {
                overrun_minutes: (now - closes).num_minutes(),
            },
        });
    }
    Ok(())
}
