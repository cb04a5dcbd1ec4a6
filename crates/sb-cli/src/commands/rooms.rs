//! Catalog import and filtered listing.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use sb_core::{FilterCriteria, Room, filter_rooms};
use sb_db::Database;

/// Imports (upserts) the catalog from a JSON array of rooms.
pub fn import<W: Write>(writer: &mut W, db: &mut Database, file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let rooms: Vec<Room> =
        serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", file.display()))?;
    let written = db.upsert_rooms(&rooms)?;
    writeln!(writer, "Imported {written} rooms.")?;
    Ok(())
}

/// Lists rooms narrowed by the given criteria.
pub fn list<W: Write>(
    writer: &mut W,
    db: &Database,
    criteria: &FilterCriteria,
    json: bool,
) -> Result<()> {
    let catalog = db.list_rooms()?;
    let rooms = filter_rooms(&catalog, criteria);

    if json {
        serde_json::to_writer_pretty(&mut *writer, &rooms)?;
        writeln!(writer)?;
        return Ok(());
    }

    if rooms.is_empty() {
        // an empty result is a valid state, not an error
        writeln!(writer, "No rooms match the current filters.")?;
        return Ok(());
    }

    writeln!(writer, "Rooms ({} of {}):", rooms.len(), catalog.len())?;
    for room in rooms {
        let amenities = if room.amenities.is_empty() {
            "none".to_string()
        } else {
            room.amenities.iter().cloned().collect::<Vec<_>>().join(", ")
        };
        writeln!(
            writer,
            "- {}: {} ({}, {}) seats {}, {}, {} | amenities: {amenities}",
            room.id,
            room.name,
            room.building,
            room.location,
            room.capacity,
            room.room_type,
            room.base_availability,
        )?;
    }
    Ok(())
}
