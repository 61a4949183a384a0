//! The local calendar day a run resolves occurrences for.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Half-open `[start, end)` span covering one local calendar day.
///
/// `end` is the next local midnight, so a day is 23 or 25 hours long across
/// DST transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl DayWindow {
    /// The local day containing `now`.
    pub fn containing(now: &DateTime<Tz>) -> Self {
        Self::for_date(now.date_naive(), now.timezone())
    }

    /// The window for `date` in `tz`.
    pub fn for_date(date: NaiveDate, tz: Tz) -> Self {
        let next = date.succ_opt().unwrap_or(date);
        Self {
            start: start_of_day(date, tz),
            end: start_of_day(next, tz),
        }
    }

    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start.with_timezone(&Utc)
    }

    pub fn end_utc(&self) -> DateTime<Utc> {
        self.end.with_timezone(&Utc)
    }

    /// Whether `instant` falls inside the window.
    pub fn contains<Z: TimeZone>(&self, instant: &DateTime<Z>) -> bool {
        let t = instant.with_timezone(&Utc);
        self.start_utc() <= t && t < self.end_utc()
    }

    /// Whether the span `[start, end)` intersects the window.
    ///
    /// A span ending exactly at the window start (an all-day event from the
    /// previous day) does not intersect it.
    pub fn overlaps<Z: TimeZone>(&self, start: &DateTime<Z>, end: &DateTime<Z>) -> bool {
        let (s, e) = (start.with_timezone(&Utc), end.with_timezone(&Utc));
        s < self.end_utc() && e > self.start_utc()
    }

    /// Retention test applied to every candidate instant: the start lies in the
    /// window, or the candidate's span intersects it.
    pub fn admits<Z: TimeZone>(&self, start: &DateTime<Z>, end: Option<&DateTime<Z>>) -> bool {
        self.contains(start) || end.is_some_and(|end| self.overlaps(start, end))
    }
}

/// First instant of `date` in `tz`. Days whose midnight falls in a DST gap start
/// at the first valid wall-clock time after it.
fn start_of_day(date: NaiveDate, tz: Tz) -> DateTime<Tz> {
    let midnight = date.and_time(NaiveTime::MIN);
    if let Some(dt) = tz.from_local_datetime(&midnight).earliest() {
        return dt;
    }
    (1..=4)
        .map(|h| midnight + Duration::hours(h))
        .find_map(|local| tz.from_local_datetime(&local).earliest())
        .unwrap_or_else(|| tz.from_utc_datetime(&midnight))
}
