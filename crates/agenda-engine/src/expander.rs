//! RRULE expansion -- the recurrence oracle the resolver delegates to.
//!
//! The resolver only needs "rule text + anchor + window → instants", so that is
//! the whole [`RecurrenceOracle`] contract. [`RRuleOracle`] implements it on top
//! of the `rrule` crate and `chrono-tz`, which own frequency, BYxxx and DST
//! semantics. Nothing here reinterprets rule syntax beyond unwrapping the
//! `RRULE:` property line.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;
use tracing::trace;

use crate::error::{EngineError, Result};

/// Default cap on instances returned for one window.
pub const DEFAULT_LIMIT: u16 = 500;

/// Expands a recurrence rule into concrete instants inside a window.
pub trait RecurrenceOracle {
    /// Return every instance of `rule` anchored at `anchor` whose start lies in
    /// `[window_start, window_end)`, ascending.
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidRule`] when the rule cannot be parsed or
    /// evaluated.
    fn expand(
        &self,
        rule: &str,
        anchor: &DateTime<Tz>,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>>;
}

/// [`RecurrenceOracle`] backed by the `rrule` crate.
#[derive(Debug, Clone, Copy)]
pub struct RRuleOracle {
    limit: u16,
}

impl RRuleOracle {
    pub fn new() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_limit(limit: u16) -> Self {
        Self { limit }
    }
}

impl Default for RRuleOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl RecurrenceOracle for RRuleOracle {
    fn expand(
        &self,
        rule: &str,
        anchor: &DateTime<Tz>,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>> {
        let rule = normalize_rule(rule)
            .ok_or_else(|| EngineError::InvalidRule("empty RRULE string".to_string()))?;

        if window_start >= window_end {
            return Ok(Vec::new());
        }

        let rrule_set = parse_rule_set(&rule, anchor)?;

        // `after`/`before` bounds are padded by a second and the exact
        // half-open window is applied below.
        let pad = Duration::seconds(1);
        let after = window_start
            .checked_sub_signed(pad)
            .unwrap_or(window_start)
            .with_timezone(&rrule::Tz::UTC);
        let before = window_end
            .checked_add_signed(pad)
            .unwrap_or(window_end)
            .with_timezone(&rrule::Tz::UTC);
        let instances = rrule_set.after(after).before(before).all(self.limit);

        if instances.limited {
            trace!(rule = %rule, limit = self.limit, "expansion hit instance limit");
        }

        Ok(instances
            .dates
            .into_iter()
            .map(|dt| dt.with_timezone(&Utc))
            .filter(|dt| *dt >= window_start && *dt < window_end)
            .collect())
    }
}

/// Build the iCalendar text block for `rule` anchored at `anchor` and parse it.
///
/// The anchor is first written as wall-clock time with a TZID so BYxxx parts
/// follow local time across DST. The rrule crate rejects a UTC `UNTIL` next to
/// a zoned `DTSTART` for some inputs; those rules are retried with the anchor
/// expressed in UTC.
fn parse_rule_set(rule: &str, anchor: &DateTime<Tz>) -> Result<RRuleSet> {
    let dtstart_ical = anchor.format("%Y%m%dT%H%M%S");
    let zoned = format!(
        "DTSTART;TZID={}:{}\nRRULE:{}",
        anchor.timezone().name(),
        dtstart_ical,
        rule
    );

    match zoned.parse::<RRuleSet>() {
        Ok(set) => Ok(set),
        Err(zoned_err) => {
            let utc_anchor = anchor.with_timezone(&Utc).format("%Y%m%dT%H%M%SZ");
            let utc = format!("DTSTART:{}\nRRULE:{}", utc_anchor, rule);
            utc.parse::<RRuleSet>()
                .map_err(|_| EngineError::InvalidRule(format!("{}", zoned_err)))
        }
    }
}

/// Extract the bare rule value from stored rule text.
///
/// Accepts `FREQ=...`, `RRULE:FREQ=...`, or a multi-line property block, in
/// which case only the first `RRULE` line is used. Returns `None` for blank
/// input.
pub fn normalize_rule(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let line = if text.contains('\n') {
        text.lines()
            .map(str::trim)
            .find(|l| l.to_ascii_uppercase().starts_with("RRULE"))?
    } else {
        text
    };

    let value = match line.split_once(':') {
        Some((name, value)) if name.to_ascii_uppercase().starts_with("RRULE") => value,
        _ => line,
    };

    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
