//! CLI subcommand implementations.

pub mod book;
pub mod checkin;
pub mod reservations;
pub mod rooms;
pub mod slots;
