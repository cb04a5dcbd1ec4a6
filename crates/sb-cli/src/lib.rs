//! Space booker CLI library.
//!
//! This crate provides the CLI interface for the space booker.

mod cli;
pub mod commands;
mod config;

pub use cli::{Bucket, Cli, Commands, ReservationsAction, RoomsAction};
pub use config::{CheckinConfig, Config, DemandWindowConfig, OpeningConfig};
