//! Shared fixtures: real SQLite stores laid out like a calendar client's.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use agenda_engine::FixedZones;
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::America::New_York;
use chrono_tz::Tz;
use rusqlite::{params, Connection};

pub const SCHEMA: &str = "
    CREATE TABLE cal_events (
        cal_id TEXT,
        id TEXT,
        title TEXT,
        event_start INTEGER,
        event_end INTEGER,
        event_start_tz TEXT
    );
    CREATE TABLE cal_properties (
        item_id TEXT,
        cal_id TEXT,
        key TEXT,
        value TEXT
    );
    CREATE TABLE cal_exceptions (
        cal_id TEXT,
        item_id TEXT,
        recurrence_id INTEGER,
        is_negative INTEGER
    );
";

/// 2026-03-17 at `h:m` in New York (EDT, UTC-4).
pub fn local(d: u32, h: u32, m: u32) -> DateTime<Tz> {
    New_York.with_ymd_and_hms(2026, 3, d, h, m, 0).unwrap()
}

pub fn micros(dt: DateTime<Tz>) -> i64 {
    dt.timestamp_micros()
}

/// Observer in New York, now = 2026-03-17 10:00 local.
pub fn zones() -> FixedZones {
    FixedZones::new(New_York, local(17, 10, 0).with_timezone(&Utc))
}

/// Create `<dir>/<profile>/calendar-data/local.sqlite` with the full schema.
pub fn profile_store(dir: &Path, profile: &str) -> (PathBuf, Connection) {
    let store_dir = dir.join(profile).join("calendar-data");
    fs::create_dir_all(&store_dir).unwrap();
    let path = store_dir.join("local.sqlite");
    let conn = create_store(&path);
    (path, conn)
}

pub fn create_store(path: &Path) -> Connection {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    conn
}

pub fn insert_event(
    conn: &Connection,
    id: &str,
    cal_id: &str,
    start: i64,
    end: Option<i64>,
    tz: Option<&str>,
) {
    conn.execute(
        "INSERT INTO cal_events (cal_id, id, title, event_start, event_end, event_start_tz)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![cal_id, id, format!("Meeting {id}"), start, end, tz],
    )
    .unwrap();
}

pub fn insert_rule(conn: &Connection, item_id: &str, cal_id: &str, rule: &str) {
    conn.execute(
        "INSERT INTO cal_properties (item_id, cal_id, key, value) VALUES (?1, ?2, 'RRULE', ?3)",
        params![item_id, cal_id, rule],
    )
    .unwrap();
}

pub fn insert_exception(
    conn: &Connection,
    cal_id: &str,
    item_id: &str,
    instance: i64,
    negative: bool,
) {
    conn.execute(
        "INSERT INTO cal_exceptions (cal_id, item_id, recurrence_id, is_negative)
         VALUES (?1, ?2, ?3, ?4)",
        params![cal_id, item_id, instance, i64::from(negative)],
    )
    .unwrap();
}
