//! Reservation listing, cancellation, and bulk mutation.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};

use sb_core::{Reservation, ReservationId, classify, search_reservations};
use sb_db::{BulkAction, Database};

use crate::cli::Bucket;

/// Lists reservations, optionally narrowed to one lifecycle bucket and a
/// search query.
pub fn list<W: Write>(
    writer: &mut W,
    db: &Database,
    bucket: Option<Bucket>,
    search: Option<&str>,
    json: bool,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Result<()> {
    let mut reservations = db.list_reservations()?;
    if let Some(query) = search {
        reservations = search_reservations(&reservations, query);
    }
    let buckets = classify(&reservations, now, offset);
    let selected = match bucket {
        None => &buckets.all,
        Some(Bucket::Upcoming) => &buckets.upcoming,
        Some(Bucket::Today) => &buckets.today,
        Some(Bucket::Past) => &buckets.past,
        Some(Bucket::Recurring) => &buckets.recurring,
    };

    if json {
        serde_json::to_writer_pretty(&mut *writer, selected)?;
        writeln!(writer)?;
        return Ok(());
    }

    if selected.is_empty() {
        writeln!(writer, "No reservations.")?;
        return Ok(());
    }

    writeln!(
        writer,
        "Reservations: {} total, {} upcoming, {} today, {} past, {} recurring",
        buckets.all.len(),
        buckets.upcoming.len(),
        buckets.today.len(),
        buckets.past.len(),
        buckets.recurring.len(),
    )?;
    for reservation in selected {
        writeln!(writer, "- {}", line(reservation))?;
    }
    Ok(())
}

fn line(r: &Reservation) -> String {
    let display = r.status.display();
    let mut out = format!(
        "{} {} {} ({}) {} to {} [{}]",
        display.symbol,
        r.id,
        r.space_name,
        r.building,
        r.start.format("%Y-%m-%d %H:%M"),
        r.end.format("%H:%M"),
        display.label,
    );
    if r.is_recurring {
        out.push_str(" (recurring)");
    }
    if r.checked_in_at.is_some() {
        out.push_str(" (checked in)");
    }
    out
}

/// Cancels one reservation.
pub fn cancel<W: Write>(writer: &mut W, db: &mut Database, id: &str) -> Result<()> {
    let id = ReservationId::new(id).context("invalid reservation id")?;
    let cancelled = db.cancel(&id)?;
    writeln!(writer, "Cancelled {} ({})", cancelled.id, cancelled.space_name)?;
    Ok(())
}

/// Applies an action to each id independently and reports both outcomes.
pub fn bulk<W: Write>(
    writer: &mut W,
    db: &mut Database,
    action: BulkAction,
    ids: &[String],
) -> Result<()> {
    let mut parsed = Vec::with_capacity(ids.len());
    for id in ids {
        parsed.push(ReservationId::new(id.as_str()).context("invalid reservation id")?);
    }
    let outcome = db.bulk_apply(&parsed, action);

    writeln!(
        writer,
        "{}: {} succeeded, {} failed",
        action.as_str(),
        outcome.succeeded.len(),
        outcome.failed.len(),
    )?;
    for id in &outcome.succeeded {
        writeln!(writer, "- {id}: ok")?;
    }
    for (id, reason) in &outcome.failed {
        writeln!(writer, "- {id}: {reason}")?;
    }
    Ok(())
}
