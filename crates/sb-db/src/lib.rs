//! Storage layer for the space booker.
//!
//! Provides persistence for the room catalog and reservations using
//! `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but
//! not `Sync`. A `Database` instance can be moved between threads but cannot
//! be shared without external synchronization.
//!
//! # Consistency
//!
//! Every mutation runs inside a single transaction, so the overlap-invariant
//! check and the insert it guards observe one consistent snapshot. This is
//! what makes `create_reservation` safe against the slot having been taken
//! between slot computation and commit.
//!
//! # Schema
//!
//! Timestamps are stored as TEXT in ISO 8601 UTC (e.g.
//! `2025-03-10T10:00:00Z`), so lexicographic ordering matches chronological
//! ordering. Amenity sets are stored as JSON arrays.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use sb_core::{
    BaseAvailability, Reservation, ReservationDraft, ReservationId, ReservationStatus, Room,
    RoomId, UserId, search_reservations,
};

/// Database errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for {id}: {timestamp}")]
    TimestampParse {
        id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },

    /// A stored row no longer satisfies the domain types.
    #[error("invalid row for {id}: {message}")]
    InvalidRow { id: String, message: String },

    /// The requested interval overlaps a confirmed reservation.
    #[error("slot no longer available for {space_id}")]
    OverlapConflict { space_id: RoomId },

    /// No reservation with this id.
    #[error("reservation {id} not found")]
    NotFound { id: ReservationId },

    /// The reservation already reached a terminal status.
    #[error("reservation {id} is already {status}")]
    AlreadyTerminal {
        id: ReservationId,
        status: ReservationStatus,
    },

    /// The operation requires a confirmed reservation.
    #[error("reservation {id} is {status}, not confirmed")]
    NotConfirmed {
        id: ReservationId,
        status: ReservationStatus,
    },

    /// No room with this id in the catalog.
    #[error("room {id} not found")]
    RoomNotFound { id: RoomId },
}

/// Action applied per item by [`Database::bulk_apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    Cancel,
    Complete,
}

impl BulkAction {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cancel => "cancel",
            Self::Complete => "complete",
        }
    }

    const fn target(self) -> ReservationStatus {
        match self {
            Self::Cancel => ReservationStatus::Cancelled,
            Self::Complete => ReservationStatus::Completed,
        }
    }
}

impl std::str::FromStr for BulkAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cancel" => Ok(Self::Cancel),
            "complete" => Ok(Self::Complete),
            _ => Err(format!("invalid bulk action: {s}")),
        }
    }
}

/// Per-item outcome of a bulk mutation. Never all-or-nothing: each id is
/// evaluated independently and partial success is reported as such.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub succeeded: Vec<ReservationId>,
    pub failed: Vec<(ReservationId, String)>,
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety and consistency
/// notes.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database. Useful for testing.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the schema. Idempotent.
    fn init(&self) -> Result<(), StoreError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS rooms (
                id TEXT PRIMARY KEY,
                position INTEGER NOT NULL,
                name TEXT NOT NULL,
                location TEXT NOT NULL,
                building TEXT NOT NULL,
                capacity INTEGER NOT NULL,
                amenities TEXT NOT NULL DEFAULT '[]',
                room_type TEXT NOT NULL,
                base_availability TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_rooms_building ON rooms(building);

            -- Reservations: start_at/end_at in ISO 8601 UTC, half-open [start, end)
            CREATE TABLE IF NOT EXISTS reservations (
                id TEXT PRIMARY KEY,
                space_id TEXT NOT NULL,
                space_name TEXT NOT NULL,
                building TEXT NOT NULL,
                start_at TEXT NOT NULL,
                end_at TEXT NOT NULL,
                attendees INTEGER NOT NULL,
                purpose TEXT NOT NULL,
                notes TEXT,
                status TEXT NOT NULL,
                is_recurring INTEGER NOT NULL DEFAULT 0,
                created_by TEXT NOT NULL,
                created_at TEXT NOT NULL,
                checked_in_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_reservations_space ON reservations(space_id);
            CREATE INDEX IF NOT EXISTS idx_reservations_status ON reservations(status);
            CREATE INDEX IF NOT EXISTS idx_reservations_start ON reservations(start_at);
            ",
        )?;
        Ok(())
    }

    /// Upserts catalog rooms, keeping the slice order as the catalog order.
    pub fn upsert_rooms(&mut self, rooms: &[Room]) -> Result<usize, StoreError> {
        if rooms.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO rooms
                (id, position, name, location, building, capacity, amenities, room_type, base_availability)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    position = excluded.position,
                    name = excluded.name,
                    location = excluded.location,
                    building = excluded.building,
                    capacity = excluded.capacity,
                    amenities = excluded.amenities,
                    room_type = excluded.room_type,
                    base_availability = excluded.base_availability
                ",
            )?;
            for (position, room) in (0_i64..).zip(rooms.iter()) {
                let amenities = serde_json::to_string(&room.amenities)
                    .map_err(|e| StoreError::InvalidRow {
                        id: room.id.to_string(),
                        message: e.to_string(),
                    })?;
                written += stmt.execute(params![
                    room.id.as_str(),
                    position,
                    room.name,
                    room.location,
                    room.building,
                    room.capacity,
                    amenities,
                    room.room_type.as_str(),
                    room.base_availability.as_str(),
                ])?;
            }
        }
        tx.commit()?;
        tracing::info!(rooms = written, "catalog upserted");
        Ok(written)
    }

    /// Lists the catalog in its original (import) order.
    pub fn list_rooms(&self) -> Result<Vec<Room>, StoreError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, name, location, building, capacity, amenities, room_type, base_availability
            FROM rooms
            ORDER BY position ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([], room_from_row)?;
        let mut rooms = Vec::new();
        for row in rows {
            rooms.push(parse_room(row?)?);
        }
        Ok(rooms)
    }

    /// Fetches a single room.
    pub fn room(&self, id: &RoomId) -> Result<Room, StoreError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT id, name, location, building, capacity, amenities, room_type, base_availability
                FROM rooms
                WHERE id = ?
                ",
                [id.as_str()],
                room_from_row,
            )
            .optional()?;
        match row {
            Some(raw) => parse_room(raw),
            None => Err(StoreError::RoomNotFound { id: id.clone() }),
        }
    }

    /// Creates a reservation, enforcing the overlap invariant atomically.
    ///
    /// Within one transaction: if the draft's id already exists the stored
    /// row is returned unchanged (idempotent reconcile for retried
    /// submissions); otherwise the interval is checked against every
    /// confirmed reservation for the room and inserted as confirmed, or
    /// rejected with [`StoreError::OverlapConflict`] if the slot was taken
    /// since it was computed.
    pub fn create_reservation(
        &mut self,
        draft: &ReservationDraft,
        now: DateTime<Utc>,
    ) -> Result<Reservation, StoreError> {
        let tx = self.conn.transaction()?;

        let existing = tx
            .query_row(
                RESERVATION_SELECT_BY_ID,
                [draft.id.as_str()],
                reservation_from_row,
            )
            .optional()?;
        if let Some(raw) = existing {
            tx.commit()?;
            tracing::debug!(reservation = %draft.id, "create reconciled to existing row");
            return parse_reservation(raw);
        }

        let conflicts: i64 = tx.query_row(
            "
            SELECT COUNT(*)
            FROM reservations
            WHERE space_id = ? AND status = 'confirmed'
              AND start_at < ? AND ? < end_at
            ",
            params![
                draft.space_id.as_str(),
                format_timestamp(draft.end),
                format_timestamp(draft.start),
            ],
            |row| row.get(0),
        )?;
        if conflicts > 0 {
            return Err(StoreError::OverlapConflict {
                space_id: draft.space_id.clone(),
            });
        }

        tx.execute(
            "
            INSERT INTO reservations
            (id, space_id, space_name, building, start_at, end_at, attendees, purpose,
             notes, status, is_recurring, created_by, created_at, checked_in_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'confirmed', ?, ?, ?, NULL)
            ",
            params![
                draft.id.as_str(),
                draft.space_id.as_str(),
                draft.space_name,
                draft.building,
                format_timestamp(draft.start),
                format_timestamp(draft.end),
                draft.attendees,
                draft.purpose,
                draft.notes,
                draft.is_recurring,
                draft.created_by.as_str(),
                format_timestamp(now),
            ],
        )?;
        tx.commit()?;
        tracing::info!(reservation = %draft.id, space = %draft.space_id, "reservation created");

        Ok(Reservation {
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
            created_at: now,
            checked_in_at: None,
        })
    }

    /// Cancels a reservation. Fails on unknown ids and terminal statuses.
    pub fn cancel(&mut self, id: &ReservationId) -> Result<Reservation, StoreError> {
        self.transition(id, ReservationStatus::Cancelled)
    }

    /// Marks a reservation completed. Fails on unknown ids and terminal
    /// statuses.
    pub fn complete(&mut self, id: &ReservationId) -> Result<Reservation, StoreError> {
        self.transition(id, ReservationStatus::Completed)
    }

    fn transition(
        &mut self,
        id: &ReservationId,
        next: ReservationStatus,
    ) -> Result<Reservation, StoreError> {
        let tx = self.conn.transaction()?;
        let raw = tx
            .query_row(RESERVATION_SELECT_BY_ID, [id.as_str()], reservation_from_row)
            .optional()?
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })?;
        let mut reservation = parse_reservation(raw)?;

        if reservation.status.is_terminal() {
            return Err(StoreError::AlreadyTerminal {
                id: id.clone(),
                status: reservation.status,
            });
        }
        if !reservation.status.can_transition_to(next) {
            return Err(StoreError::NotConfirmed {
                id: id.clone(),
                status: reservation.status,
            });
        }

        tx.execute(
            "UPDATE reservations SET status = ? WHERE id = ?",
            params![next.as_str(), id.as_str()],
        )?;
        tx.commit()?;
        tracing::info!(reservation = %id, status = %next, "reservation transitioned");

        reservation.status = next;
        Ok(reservation)
    }

    /// Applies an action to each id independently, reporting partial
    /// success. A failure on one id never rolls back the others.
    pub fn bulk_apply(&mut self, ids: &[ReservationId], action: BulkAction) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for id in ids {
            match self.transition(id, action.target()) {
                Ok(_) => outcome.succeeded.push(id.clone()),
                Err(err) => outcome.failed.push((id.clone(), err.to_string())),
            }
        }
        tracing::info!(
            action = action.as_str(),
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "bulk apply finished"
        );
        outcome
    }

    /// Records a check-in time. Requires confirmed status; a second call is
    /// a no-op that keeps the first timestamp.
    pub fn record_check_in(
        &mut self,
        id: &ReservationId,
        at: DateTime<Utc>,
    ) -> Result<Reservation, StoreError> {
        let tx = self.conn.transaction()?;
        let raw = tx
            .query_row(RESERVATION_SELECT_BY_ID, [id.as_str()], reservation_from_row)
            .optional()?
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })?;
        let mut reservation = parse_reservation(raw)?;

        if reservation.status != ReservationStatus::Confirmed {
            return Err(StoreError::NotConfirmed {
                id: id.clone(),
                status: reservation.status,
            });
        }
        if reservation.checked_in_at.is_none() {
            tx.execute(
                "UPDATE reservations SET checked_in_at = ? WHERE id = ?",
                params![format_timestamp(at), id.as_str()],
            )?;
            reservation.checked_in_at = Some(at);
            tracing::info!(reservation = %id, "check-in recorded");
        }
        tx.commit()?;
        Ok(reservation)
    }

    /// Lists all reservations ordered by start time then id.
    pub fn list_reservations(&self) -> Result<Vec<Reservation>, StoreError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, space_id, space_name, building, start_at, end_at, attendees, purpose,
                   notes, status, is_recurring, created_by, created_at, checked_in_at
            FROM reservations
            ORDER BY start_at ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([], reservation_from_row)?;
        let mut reservations = Vec::new();
        for row in rows {
            reservations.push(parse_reservation(row?)?);
        }
        Ok(reservations)
    }

    /// Lists reservations for one room, for availability computation.
    pub fn reservations_for_room(&self, space_id: &RoomId) -> Result<Vec<Reservation>, StoreError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, space_id, space_name, building, start_at, end_at, attendees, purpose,
                   notes, status, is_recurring, created_by, created_at, checked_in_at
            FROM reservations
            WHERE space_id = ?
            ORDER BY start_at ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([space_id.as_str()], reservation_from_row)?;
        let mut reservations = Vec::new();
        for row in rows {
            reservations.push(parse_reservation(row?)?);
        }
        Ok(reservations)
    }

    /// Case-insensitive substring search over space name, building, and
    /// purpose, in stored order.
    pub fn search(&self, query: &str) -> Result<Vec<Reservation>, StoreError> {
        let all = self.list_reservations()?;
        Ok(search_reservations(&all, query))
    }
}

const RESERVATION_SELECT_BY_ID: &str = "
    SELECT id, space_id, space_name, building, start_at, end_at, attendees, purpose,
           notes, status, is_recurring, created_by, created_at, checked_in_at
    FROM reservations
    WHERE id = ?
";

/// Raw room columns before domain validation.
struct RoomRow {
    id: String,
    name: String,
    location: String,
    building: String,
    capacity: i64,
    amenities: String,
    room_type: String,
    base_availability: String,
}

fn room_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RoomRow> {
    Ok(RoomRow {
        id: row.get(0)?,
        name: row.get(1)?,
        location: row.get(2)?,
        building: row.get(3)?,
        capacity: row.get(4)?,
        amenities: row.get(5)?,
        room_type: row.get(6)?,
        base_availability: row.get(7)?,
    })
}

fn parse_room(raw: RoomRow) -> Result<Room, StoreError> {
    let invalid = |message: String| StoreError::InvalidRow {
        id: raw.id.clone(),
        message,
    };
    let amenities: BTreeSet<String> =
        serde_json::from_str(&raw.amenities).map_err(|e| invalid(e.to_string()))?;
    Ok(Room {
        id: RoomId::new(raw.id.clone()).map_err(|e| invalid(e.to_string()))?,
        name: raw.name.clone(),
        location: raw.location.clone(),
        building: raw.building.clone(),
        capacity: u32::try_from(raw.capacity).map_err(|e| invalid(e.to_string()))?,
        amenities,
        room_type: raw.room_type.parse().map_err(|e: sb_core::ValidationError| {
            invalid(e.to_string())
        })?,
        base_availability: raw
            .base_availability
            .parse::<BaseAvailability>()
            .map_err(|e| invalid(e.to_string()))?,
    })
}

/// Raw reservation columns before domain validation.
struct ReservationRow {
    id: String,
    space_id: String,
    space_name: String,
    building: String,
    start_at: String,
    end_at: String,
    attendees: i64,
    purpose: String,
    notes: Option<String>,
    status: String,
    is_recurring: bool,
    created_by: String,
    created_at: String,
    checked_in_at: Option<String>,
}

fn reservation_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReservationRow> {
    Ok(ReservationRow {
        id: row.get(0)?,
        space_id: row.get(1)?,
        space_name: row.get(2)?,
        building: row.get(3)?,
        start_at: row.get(4)?,
        end_at: row.get(5)?,
        attendees: row.get(6)?,
        purpose: row.get(7)?,
        notes: row.get(8)?,
        status: row.get(9)?,
        is_recurring: row.get(10)?,
        created_by: row.get(11)?,
        created_at: row.get(12)?,
        checked_in_at: row.get(13)?,
    })
}

fn parse_reservation(raw: ReservationRow) -> Result<Reservation, StoreError> {
    let invalid = |message: String| StoreError::InvalidRow {
        id: raw.id.clone(),
        message,
    };
    let checked_in_at = raw
        .checked_in_at
        .as_deref()
        .map(|ts| parse_timestamp(ts, &raw.id))
        .transpose()?;
    Ok(Reservation {
        id: ReservationId::new(raw.id.clone()).map_err(|e| invalid(e.to_string()))?,
        space_id: RoomId::new(raw.space_id.clone()).map_err(|e| invalid(e.to_string()))?,
        space_name: raw.space_name.clone(),
        building: raw.building.clone(),
        start: parse_timestamp(&raw.start_at, &raw.id)?,
        end: parse_timestamp(&raw.end_at, &raw.id)?,
        attendees: u32::try_from(raw.attendees).map_err(|e| invalid(e.to_string()))?,
        purpose: raw.purpose.clone(),
        notes: raw.notes.clone(),
        status: raw
            .status
            .parse::<ReservationStatus>()
            .map_err(|e| invalid(e.to_string()))?,
        is_recurring: raw.is_recurring,
        created_by: UserId::new(raw.created_by.clone()).map_err(|e| invalid(e.to_string()))?,
        created_at: parse_timestamp(&raw.created_at, &raw.id)?,
        checked_in_at,
    })
}

/// Formats a timestamp for storage (ISO 8601, UTC, second precision).
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(value: &str, id: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| StoreError::TimestampParse {
            id: id.to_string(),
            timestamp: value.to_string(),
            source,
        })
}
