//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use sb_core::{CapacityBucket, MinuteOfDay, RoomType, SlotDuration};
use sb_db::BulkAction;

/// Campus space booker.
///
/// Filters a room catalog, computes slot availability, drives the booking
/// wizard, and gates check-ins to their eligibility window.
#[derive(Debug, Parser)]
#[command(name = "sb", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Room catalog operations.
    Rooms {
        #[command(subcommand)]
        action: RoomsAction,
    },

    /// Show the slot grid for a room on a day.
    Slots {
        /// Room ID to compute slots for.
        room: String,

        /// Day to compute, e.g. 2025-03-10.
        #[arg(long)]
        day: NaiveDate,

        /// Slot length in minutes (30, 60, 90, 120, 180, 240).
        #[arg(long, default_value = "60")]
        duration: SlotDuration,
    },

    /// Book a room through the wizard.
    Book {
        /// Room ID to book.
        room: String,

        /// Day of the booking, e.g. 2025-03-10.
        #[arg(long)]
        day: NaiveDate,

        /// Start time, e.g. 14:00.
        #[arg(long)]
        start: MinuteOfDay,

        /// Slot length in minutes (30, 60, 90, 120, 180, 240).
        #[arg(long, default_value = "60")]
        duration: SlotDuration,

        /// What the room is booked for.
        #[arg(long)]
        purpose: String,

        /// Number of attendees.
        #[arg(long, default_value_t = 1)]
        attendees: u32,

        /// Free-form notes.
        #[arg(long)]
        notes: Option<String>,

        /// Mark the booking as recurring.
        #[arg(long)]
        recurring: bool,

        /// Booking user.
        #[arg(long, default_value = "me")]
        user: String,
    },

    /// Reservation listing and mutation.
    Reservations {
        #[command(subcommand)]
        action: ReservationsAction,
    },

    /// Check in to a booking.
    Checkin {
        /// Booking ID, exact match.
        #[arg(long, conflicts_with_all = ["qr", "suggest"])]
        code: Option<String>,

        /// Decoded QR payload as JSON.
        #[arg(long, conflicts_with = "suggest")]
        qr: Option<String>,

        /// List candidate bookings matching a partial id or space name.
        #[arg(long)]
        suggest: Option<String>,
    },
}

/// Catalog subcommands.
#[derive(Debug, Subcommand)]
pub enum RoomsAction {
    /// Import (upsert) the catalog from a JSON file.
    Import {
        /// Path to a JSON array of rooms.
        file: PathBuf,
    },

    /// List rooms, optionally narrowed by filters.
    List {
        /// Substring match against name or location.
        #[arg(long)]
        search: Option<String>,

        /// Capacity bucket: 1-5, 6-10, 11-20, 21-50, 50+.
        #[arg(long)]
        capacity: Option<CapacityBucket>,

        /// Exact building match.
        #[arg(long)]
        building: Option<String>,

        /// Exact room type match.
        #[arg(long)]
        room_type: Option<RoomType>,

        /// Required amenity; repeat for several (all must be present).
        #[arg(long = "amenity")]
        amenities: Vec<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Reservation subcommands.
#[derive(Debug, Subcommand)]
pub enum ReservationsAction {
    /// List reservations in lifecycle buckets.
    List {
        /// Show one bucket only: upcoming, today, past, or recurring.
        #[arg(long)]
        bucket: Option<Bucket>,

        /// Substring match over space name, building, and purpose.
        #[arg(long)]
        search: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Cancel one reservation.
    Cancel {
        /// Reservation ID.
        id: String,
    },

    /// Apply an action to several reservations, reporting per-item results.
    Bulk {
        /// cancel or complete.
        action: BulkAction,

        /// Reservation IDs.
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

/// Lifecycle bucket selector for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Bucket {
    Upcoming,
    Today,
    Past,
    Recurring,
}
