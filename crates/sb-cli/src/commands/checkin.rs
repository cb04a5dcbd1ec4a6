//! Check-in by QR payload, exact code, or suggestion lookup.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use sb_core::{
    CheckInPolicy, Decoder, JsonFrameDecoder, eligible, resolve_manual, resolve_qr, suggest,
};
use sb_db::Database;

/// How the booking is being identified.
#[derive(Debug, Clone)]
pub enum Identifier {
    /// Exact booking id from manual entry.
    Code(String),
    /// Decoded QR payload as JSON text.
    Qr(String),
    /// Partial text; list candidates without checking in.
    Suggest(String),
}

/// Resolves the identifier, gates it to the eligibility window, and records
/// the check-in.
pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    identifier: &Identifier,
    policy: &CheckInPolicy,
    now: DateTime<Utc>,
) -> Result<()> {
    let reservations = db.list_reservations()?;

    let resolved = match identifier {
        Identifier::Suggest(text) => {
            let candidates = suggest(&reservations, text);
            if candidates.is_empty() {
                writeln!(writer, "No bookings match '{text}'.")?;
            } else {
                writeln!(writer, "Candidates:")?;
                for candidate in candidates {
                    writeln!(
                        writer,
                        "- {} {} at {}",
                        candidate.id,
                        candidate.space_name,
                        candidate.start.format("%Y-%m-%d %H:%M"),
                    )?;
                }
            }
            return Ok(());
        }
        Identifier::Code(code) => resolve_manual(&reservations, code)?,
        Identifier::Qr(json) => {
            let payload = JsonFrameDecoder
                .try_decode(json.as_bytes())
                .context("QR payload did not decode")?;
            resolve_qr(&reservations, &payload)?
        }
    };

    eligible(resolved, now, policy)?;
    let id = resolved.id.clone();
    let checked = db.record_check_in(&id, now)?;
    writeln!(
        writer,
        "Checked in to {} ({}) for {}",
        checked.id,
        checked.space_name,
        checked.start.format("%H:%M"),
    )?;
    Ok(())
}
