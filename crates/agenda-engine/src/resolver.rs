//! Occurrence resolution -- raw event rows to concrete meetings for one day.
//!
//! For each [`EventRecord`] the resolver picks a zone, converts the raw
//! timestamps with the store's [`EpochUnit`], and then either tests the single
//! anchor instance against the [`DayWindow`] or asks the [`RecurrenceOracle`]
//! for the rule's instances in that window. Cancelled recurring instances are
//! dropped by comparing their re-quantized UTC start against the store's
//! [`ExceptionSet`].
//!
//! Record-level problems (a start that does not convert, a rule the oracle
//! rejects) never fail the batch; they are counted in [`ResolveStats`].

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::expander::RecurrenceOracle;
use crate::record::{EventRecord, ExceptionSet};
use crate::units::EpochUnit;
use crate::window::DayWindow;
use crate::zone::ZoneProvider;

/// One concrete meeting instance for the target day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    pub record_id: String,
    pub series_id: String,
    /// Start, in the observer's local zone.
    pub start: DateTime<Tz>,
    /// End, in the observer's local zone; absent when the record had none.
    pub end: Option<DateTime<Tz>>,
    pub recurring: bool,
}

/// Per-store counters gathered during resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveStats {
    /// Records handed to the resolver.
    pub records: usize,
    pub recurring: usize,
    pub singular: usize,
    /// Records skipped because their start could not be interpreted.
    pub decode_defects: usize,
    /// Rules the oracle could not evaluate; those records fell back to their anchor.
    pub rule_failures: usize,
    /// Recurring instances dropped by a matching cancellation.
    pub suppressed: usize,
    /// Occurrences produced.
    pub occurrences: usize,
}

/// Output of one resolution pass over a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub occurrences: Vec<Occurrence>,
    pub stats: ResolveStats,
}

/// Everything about one store's data that resolution depends on.
#[derive(Debug, Clone, Copy)]
pub struct StoreView<'a> {
    pub records: &'a [EventRecord],
    pub exceptions: &'a ExceptionSet,
    pub unit: EpochUnit,
}

/// Resolve one store's records into occurrences overlapping `window`.
///
/// Pure apart from the oracle: the same inputs always produce the same
/// occurrences, in record order then instance order.
pub fn resolve<Z, O>(
    store: StoreView<'_>,
    window: &DayWindow,
    zones: &Z,
    oracle: &O,
) -> Resolution
where
    Z: ZoneProvider + ?Sized,
    O: RecurrenceOracle + ?Sized,
{
    let local = zones.local_zone();
    let mut resolution = Resolution::default();

    for record in store.records {
        resolution.stats.records += 1;

        let Some(anchor) = Anchor::from_record(record, store.unit, zones) else {
            debug!(
                record = %record.id,
                raw_start = record.raw_start,
                "skipping record with unconvertible start"
            );
            resolution.stats.decode_defects += 1;
            continue;
        };

        let spans = match record.rule.as_deref().filter(|_| record.is_recurring()) {
            Some(rule) => {
                let expanded = expand_recurring(
                    record,
                    rule,
                    &anchor,
                    store,
                    window,
                    oracle,
                    &mut resolution.stats,
                );
                let Some(spans) = expanded else {
                    debug!(
                        record = %record.id,
                        "skipping record whose span reaches outside the time range"
                    );
                    resolution.stats.decode_defects += 1;
                    continue;
                };
                resolution.stats.recurring += 1;
                spans
            }
            None => {
                resolution.stats.singular += 1;
                vec![(anchor.start_utc(), anchor.end_utc())]
            }
        };

        for (start, end) in spans {
            if !window.admits(&start, end.as_ref()) {
                continue;
            }
            resolution.occurrences.push(Occurrence {
                record_id: record.id.clone(),
                series_id: record.series_id.clone(),
                start: start.with_timezone(&local),
                end: end.map(|e| e.with_timezone(&local)),
                recurring: record.is_recurring(),
            });
        }
    }

    resolution.stats.occurrences = resolution.occurrences.len();
    resolution
}

/// A record's start (and optional end) as zoned instants.
struct Anchor {
    start: DateTime<Tz>,
    end: Option<DateTime<Tz>>,
}

impl Anchor {
    fn from_record<Z: ZoneProvider + ?Sized>(
        record: &EventRecord,
        unit: EpochUnit,
        zones: &Z,
    ) -> Option<Self> {
        let zone = zones.resolve(record.start_zone.as_deref());
        let start = unit.to_instant(record.raw_start).ok()?.with_timezone(&zone);
        let end = record
            .raw_end
            .and_then(|raw| unit.to_instant(raw).ok())
            .map(|e| e.with_timezone(&zone));
        Some(Self { start, end })
    }

    fn start_utc(&self) -> DateTime<Utc> {
        self.start.with_timezone(&Utc)
    }

    fn end_utc(&self) -> Option<DateTime<Utc>> {
        self.end.map(|e| e.with_timezone(&Utc))
    }

    /// `end - start`, only when the record had an end. Negative spans count as zero.
    fn duration(&self) -> Option<Duration> {
        self.end.map(|end| (end - self.start).max(Duration::zero()))
    }
}

/// Candidate spans for a recurring record, with cancelled instances removed.
///
/// `None` when looking back by the record's duration leaves the representable
/// time range.
fn expand_recurring<O: RecurrenceOracle + ?Sized>(
    record: &EventRecord,
    rule: &str,
    anchor: &Anchor,
    store: StoreView<'_>,
    window: &DayWindow,
    oracle: &O,
    stats: &mut ResolveStats,
) -> Option<Vec<(DateTime<Utc>, Option<DateTime<Utc>>)>> {
    let duration = anchor.duration();

    // Instances that began before the window can still overlap it. They are
    // requested separately from today's so the oracle's instance cap is
    // applied to each range on its own.
    let lookback = duration.unwrap_or_else(Duration::zero);
    let lookback_start = window.start_utc().checked_sub_signed(lookback)?;
    let mut ranges = Vec::with_capacity(2);
    if lookback_start < window.start_utc() {
        ranges.push((lookback_start, window.start_utc()));
    }
    ranges.push((window.start_utc(), window.end_utc()));

    let mut candidates = Vec::new();
    for (from, to) in ranges {
        match oracle.expand(rule, &anchor.start, from, to) {
            Ok(found) => candidates.extend(found),
            Err(err) => {
                debug!(record = %record.id, error = %err, "rule not evaluable, using anchor instance");
                stats.rule_failures += 1;
                return Some(vec![(anchor.start_utc(), anchor.end_utc())]);
            }
        }
    }

    let spans = candidates
        .into_iter()
        .filter(|instance| {
            let key = store.unit.quantize(instance);
            let cancelled = store.exceptions.contains(&record.series_id, key);
            if cancelled {
                trace!(record = %record.id, instance = key, "instance cancelled");
                stats.suppressed += 1;
            }
            !cancelled
        })
        .map(|start| {
            let end = duration.map(|d| {
                start
                    .checked_add_signed(d)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC)
            });
            (start, end)
        })
        .collect();
    Some(spans)
}
