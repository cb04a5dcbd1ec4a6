use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, Offset, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sb_cli::commands::{book, checkin, reservations, rooms, slots};
use sb_cli::{Cli, Commands, Config, ReservationsAction, RoomsAction};
use sb_core::FilterCriteria;

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(sb_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = sb_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let mut stdout = std::io::stdout().lock();

    match &cli.command {
        Some(Commands::Rooms { action }) => match action {
            RoomsAction::Import { file } => {
                let (mut db, _config) = open_database(cli.config.as_deref())?;
                rooms::import(&mut stdout, &mut db, file)?;
            }
            RoomsAction::List {
                search,
                capacity,
                building,
                room_type,
                amenities,
                json,
            } => {
                let (db, _config) = open_database(cli.config.as_deref())?;
                let criteria = FilterCriteria {
                    search_text: search.clone(),
                    capacity: *capacity,
                    building: building.clone(),
                    room_type: *room_type,
                    amenities: amenities.iter().cloned().collect(),
                };
                rooms::list(&mut stdout, &db, &criteria, *json)?;
            }
        },
        Some(Commands::Slots {
            room,
            day,
            duration,
        }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let policy = config.availability_policy()?;
            slots::run(&mut stdout, &db, room, *day, *duration, &policy)?;
        }
        Some(Commands::Book {
            room,
            day,
            start,
            duration,
            purpose,
            attendees,
            notes,
            recurring,
            user,
        }) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            let policy = config.availability_policy()?;
            let request = book::BookingRequest {
                room: room.clone(),
                day: *day,
                start: *start,
                duration: *duration,
                purpose: purpose.clone(),
                attendees: *attendees,
                notes: notes.clone(),
                recurring: *recurring,
                user: user.clone(),
            };
            book::run(&mut stdout, &mut db, &request, &policy, Utc::now())?;
        }
        Some(Commands::Reservations { action }) => match action {
            ReservationsAction::List {
                bucket,
                search,
                json,
            } => {
                let (db, _config) = open_database(cli.config.as_deref())?;
                let offset = Local::now().offset().fix();
                reservations::list(
                    &mut stdout,
                    &db,
                    *bucket,
                    search.as_deref(),
                    *json,
                    Utc::now(),
                    offset,
                )?;
            }
            ReservationsAction::Cancel { id } => {
                let (mut db, _config) = open_database(cli.config.as_deref())?;
                reservations::cancel(&mut stdout, &mut db, id)?;
            }
            ReservationsAction::Bulk { action, ids } => {
                let (mut db, _config) = open_database(cli.config.as_deref())?;
                reservations::bulk(&mut stdout, &mut db, *action, ids)?;
            }
        },
        Some(Commands::Checkin { code, qr, suggest }) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            let policy = config.checkin_policy();
            let identifier = match (code, qr, suggest) {
                (Some(code), _, _) => checkin::Identifier::Code(code.clone()),
                (_, Some(qr), _) => checkin::Identifier::Qr(qr.clone()),
                (_, _, Some(text)) => checkin::Identifier::Suggest(text.clone()),
                _ => anyhow::bail!("provide --code, --qr, or --suggest"),
            };
            checkin::run(&mut stdout, &mut db, &identifier, &policy, Utc::now())?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            writeln!(stdout)?;
        }
    }

    Ok(())
}
