//! End-to-end integration tests for the booking flow.
//!
//! Drives the compiled binary through import → filter → slots → book →
//! list → check-in → cancel against a temp database.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

fn sb_binary() -> String {
    env!("CARGO_BIN_EXE_sb").to_string()
}

fn sb(temp: &Path, args: &[&str]) -> std::process::Output {
    Command::new(sb_binary())
        .env("SB_DATABASE_PATH", temp.join("sb.db"))
        .args(args)
        .output()
        .expect("failed to run sb")
}

fn write_catalog(temp: &Path) -> String {
    let path = temp.join("rooms.json");
    let catalog = r#"[
        {
            "id": "r1",
            "name": "Alpha",
            "location": "2F east",
            "building": "Main",
            "capacity": 8,
            "amenities": ["wifi", "projector"],
            "room_type": "study_room",
            "base_availability": "available"
        },
        {
            "id": "r2",
            "name": "Beta",
            "location": "basement",
            "building": "Annex",
            "capacity": 30,
            "amenities": ["projector"],
            "room_type": "classroom",
            "base_availability": "limited"
        }
    ]"#;
    std::fs::write(&path, catalog).unwrap();
    path.display().to_string()
}

#[test]
fn test_import_then_filtered_listing() {
    let temp = TempDir::new().unwrap();
    let catalog = write_catalog(temp.path());

    let output = sb(temp.path(), &["rooms", "import", &catalog]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "Imported 2 rooms.\n"
    );

    // capacity 6-10 plus a required projector keeps only Alpha
    let output = sb(
        temp.path(),
        &[
            "rooms", "list", "--capacity", "6-10", "--amenity", "projector",
        ],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Alpha"), "{stdout}");
    assert!(!stdout.contains("Beta"), "{stdout}");

    // an impossible filter is reported, not an error
    let output = sb(temp.path(), &["rooms", "list", "--search", "observatory"]);
    assert!(output.status.success());
    assert!(
        String::from_utf8_lossy(&output.stdout).contains("No rooms match"),
    );
}

#[test]
fn test_book_list_and_conflict() {
    let temp = TempDir::new().unwrap();
    let catalog = write_catalog(temp.path());
    sb(temp.path(), &["rooms", "import", &catalog]);

    let output = sb(
        temp.path(),
        &[
            "slots", "r1", "--day", "2030-01-15", "--duration", "60",
        ],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("08:00-09:00  Available"), "{stdout}");

    let output = sb(
        temp.path(),
        &[
            "book", "r1", "--day", "2030-01-15", "--start", "09:00",
            "--purpose", "team sync", "--attendees", "3",
        ],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Booked BK"), "{stdout}");

    // the same slot is no longer bookable
    let output = sb(
        temp.path(),
        &[
            "book", "r1", "--day", "2030-01-15", "--start", "09:00",
            "--purpose", "second try", "--attendees", "2",
        ],
    );
    assert!(!output.status.success());
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("booked"),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );

    // an overlapping slot shows as booked on the grid now
    let output = sb(
        temp.path(),
        &["slots", "r1", "--day", "2030-01-15", "--duration", "60"],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("08:30-09:30  Booked"), "{stdout}");
    assert!(stdout.contains("09:00-10:00  Booked"), "{stdout}");

    // the booking is upcoming and searchable by purpose
    let output = sb(
        temp.path(),
        &["reservations", "list", "--bucket", "upcoming", "--search", "team"],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Alpha"), "{stdout}");
}

#[test]
fn test_checkin_window_and_cancel() {
    let temp = TempDir::new().unwrap();
    let catalog = write_catalog(temp.path());
    sb(temp.path(), &["rooms", "import", &catalog]);

    let output = sb(
        temp.path(),
        &[
            "book", "r1", "--day", "2030-01-15", "--start", "10:00",
            "--purpose", "thesis defense", "--attendees", "5",
        ],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let booking_id = stdout
        .split_whitespace()
        .find(|token| token.starts_with("BK"))
        .expect("booking id in output")
        .to_string();

    // far in the future: the gate reports the wait, nothing is recorded
    let output = sb(temp.path(), &["checkin", "--code", &booking_id]);
    assert!(!output.status.success());
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("check-in opens in"),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );

    // suggestion lookup finds it by partial space name
    let output = sb(temp.path(), &["checkin", "--suggest", "alp"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(&booking_id));

    // cancel, then check-in is refused for status reasons
    let output = sb(temp.path(), &["reservations", "cancel", &booking_id]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Cancelled"));

    let output = sb(temp.path(), &["checkin", "--code", &booking_id]);
    assert!(!output.status.success());
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("not confirmed"),
    );

    // bulk reports the terminal row as failed without aborting
    let output = sb(
        temp.path(),
        &["reservations", "bulk", "cancel", &booking_id],
    );
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("0 succeeded, 1 failed"), "{stdout}");
}
