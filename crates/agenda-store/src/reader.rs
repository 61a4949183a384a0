//! Read-only queries against a snapshotted calendar store.
//!
//! Expected schema (Thunderbird `local.sqlite` layout):
//!
//! - `cal_events(id, cal_id, event_start, event_end, event_start_tz, ...)`
//! - `cal_properties(item_id, key, value)`, optional; `key = 'RRULE'` rows
//!   hold rule text
//! - `cal_recurrence(item_id, cal_id, icalString)`, optional; `RRULE...`
//!   lines hold rule text
//! - `cal_exceptions(cal_id, recurrence_id, is_negative)`, optional
//!
//! Rows are decoded leniently: a column holding an unexpected type makes that
//! row a decode defect rather than failing the query.

use std::path::Path;
use std::time::Duration;

use agenda_engine::{DayWindow, EpochUnit, EventRecord, ExceptionKey, ExceptionSet};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use tracing::debug;

use crate::error::{Result, StoreError};

/// Default time to wait for a lock held by another connection.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(2);

/// Event rows fetched from one store.
#[derive(Debug, Clone, Default)]
pub struct RecordBatch {
    pub records: Vec<EventRecord>,
    /// Rows skipped because id, calendar or start could not be decoded.
    pub defects: usize,
}

/// A read-only connection to one store.
pub struct StoreReader {
    conn: Connection,
}

impl StoreReader {
    /// Open `path` read-only, waiting up to `busy_timeout` for locks.
    ///
    /// The schema is read once here so a locked or corrupt file fails as
    /// [`StoreError::Open`] rather than on the first query.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self> {
        let open_err = |source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        };

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(open_err)?;
        conn.busy_timeout(busy_timeout).map_err(open_err)?;
        conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(open_err)?;

        Ok(Self { conn })
    }

    /// Whether a table named `name` exists.
    pub fn has_table(&self, name: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![name],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Infer the store's epoch unit from its largest start magnitude.
    ///
    /// An empty or unreadable events table yields the default unit.
    pub fn infer_unit(&self) -> EpochUnit {
        let max = self
            .conn
            .query_row("SELECT MAX(ABS(event_start)) FROM cal_events", [], |row| {
                row.get::<_, Option<f64>>(0)
            });

        match max {
            Ok(max) => EpochUnit::infer(max.map(|m| m as i64)),
            Err(e) => {
                debug!(error = %e, "could not sample start magnitude, using default unit");
                EpochUnit::default()
            }
        }
    }

    /// Fetch every event that could touch `window`.
    ///
    /// Singular events that ended before the window are filtered in SQL;
    /// recurring events are always returned since their stored end belongs to
    /// the first instance only.
    pub fn fetch_events(&self, unit: EpochUnit, window: &DayWindow) -> Result<RecordBatch> {
        let sql = format!(
            "SELECT id, cal_id, event_start, event_end, event_start_tz, rule FROM (
                 SELECT e.id, e.cal_id, e.event_start, e.event_end, e.event_start_tz,
                        {rule} AS rule
                 FROM cal_events e
             )
             WHERE event_end IS NULL OR event_end > ?1 OR event_start >= ?1 OR rule IS NOT NULL
             ORDER BY event_start, id",
            rule = self.rule_expression()?
        );

        let window_start = unit.quantize(&window.start);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![window_start], decode_event)?;

        let mut batch = RecordBatch::default();
        for row in rows {
            match row? {
                Some(record) => batch.records.push(record),
                None => batch.defects += 1,
            }
        }

        debug!(
            rows = batch.records.len(),
            defects = batch.defects,
            "fetched event rows"
        );
        Ok(batch)
    }

    /// Load cancelled recurring instances. A store without a cancellation
    /// table has none.
    pub fn load_exceptions(&self) -> Result<ExceptionSet> {
        if !self.has_table("cal_exceptions")? {
            return Ok(ExceptionSet::new());
        }

        let mut stmt = self
            .conn
            .prepare("SELECT cal_id, recurrence_id FROM cal_exceptions WHERE is_negative = 1")?;
        let rows = stmt.query_map([], |row| {
            Ok(text_at(row, 0)?.zip(integer_at(row, 1)?))
        })?;

        let mut exceptions = ExceptionSet::new();
        for row in rows {
            if let Some((series_id, instance)) = row? {
                exceptions.insert(ExceptionKey::new(series_id, instance));
            }
        }
        Ok(exceptions)
    }

    /// SQL expression yielding an event's rule text, built from whichever
    /// rule tables this store has.
    fn rule_expression(&self) -> Result<String> {
        let mut sources = Vec::new();
        if self.has_table("cal_properties")? {
            sources.push(
                "(SELECT p.value FROM cal_properties p
                  WHERE p.item_id = e.id AND p.key = 'RRULE' LIMIT 1)",
            );
        }
        if self.has_table("cal_recurrence")? {
            sources.push(
                "(SELECT r.icalString FROM cal_recurrence r
                  WHERE r.item_id = e.id AND r.cal_id = e.cal_id
                    AND UPPER(r.icalString) LIKE 'RRULE%' LIMIT 1)",
            );
        }

        Ok(match sources.len() {
            0 => "NULL".to_string(),
            1 => sources[0].to_string(),
            _ => format!("COALESCE({})", sources.join(", ")),
        })
    }
}

/// Decode one event row; `None` marks a defective row.
fn decode_event(row: &Row<'_>) -> rusqlite::Result<Option<EventRecord>> {
    let (Some(id), Some(series_id), Some(raw_start)) =
        (text_at(row, 0)?, text_at(row, 1)?, integer_at(row, 2)?)
    else {
        return Ok(None);
    };

    Ok(Some(EventRecord {
        id,
        series_id,
        raw_start,
        raw_end: integer_at(row, 3)?,
        start_zone: text_at(row, 4)?.filter(|z| !z.trim().is_empty()),
        rule: text_at(row, 5)?.filter(|r| !r.trim().is_empty()),
    }))
}

/// Column as text; integers are rendered, anything else is `None`.
fn text_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Integer(i) => Some(i.to_string()),
        _ => None,
    })
}

/// Column as an integer; reals are truncated, numeric text is parsed.
fn integer_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<i64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Integer(i) => Some(i),
        ValueRef::Real(f) if f.is_finite() => Some(f as i64),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.trim().parse().ok()),
        _ => None,
    })
}
