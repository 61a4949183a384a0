//! One resolution run: every candidate store, one at a time, then aggregation.
//!
//! Each store is snapshotted, opened, drained and closed before the next is
//! touched, so at most one connection and one snapshot directory exist at any
//! moment. A store that fails at any step is recorded and skipped; only a run
//! in which no store succeeds reports an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use agenda_engine::{
    aggregate, resolve, AggregateOptions, DayWindow, RecurrenceOracle, ResolutionResult,
    StoreFailure, StoreOutcome, StoreView, ZoneProvider,
};
use tracing::{info, warn};

use crate::error::Result;
use crate::locator::StoreLocator;
use crate::reader::{StoreReader, DEFAULT_BUSY_TIMEOUT};
use crate::snapshot::Snapshot;

/// Per-store access settings.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// How long opening a snapshot may wait on a lock.
    pub busy_timeout: Duration,
    /// Parent directory for snapshot directories; the system temp dir if `None`.
    pub snapshot_root: Option<PathBuf>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            snapshot_root: None,
        }
    }
}

/// Resolve today's occurrences from one store.
///
/// The snapshot lives only for the duration of this call; the connection is
/// closed before the snapshot directory is removed.
///
/// # Errors
/// Returns the first snapshot, open or query failure for this store.
pub fn resolve_store<Z, O>(
    path: &Path,
    window: &DayWindow,
    zones: &Z,
    oracle: &O,
    options: &StoreOptions,
) -> Result<StoreOutcome>
where
    Z: ZoneProvider + ?Sized,
    O: RecurrenceOracle + ?Sized,
{
    let snapshot = Snapshot::capture(path, options.snapshot_root.as_deref())?;
    let reader = StoreReader::open(snapshot.path(), options.busy_timeout)?;

    let unit = reader.infer_unit();
    let batch = reader.fetch_events(unit, window)?;
    let exceptions = reader.load_exceptions()?;
    drop(reader);
    drop(snapshot);

    let store = StoreView {
        records: &batch.records,
        exceptions: &exceptions,
        unit,
    };
    let mut resolution = resolve(store, window, zones, oracle);
    resolution.stats.records += batch.defects;
    resolution.stats.decode_defects += batch.defects;

    Ok(StoreOutcome {
        source: path.display().to_string(),
        unit,
        resolution,
    })
}

/// Run a full resolution for the current local day.
///
/// Never fails: store-level problems become [`StoreFailure`]s and, when no
/// store succeeds, the result's `error`.
pub fn resolve_today<L, Z, O>(
    locator: &L,
    zones: &Z,
    oracle: &O,
    store_options: &StoreOptions,
    aggregate_options: AggregateOptions,
) -> ResolutionResult
where
    L: StoreLocator + ?Sized,
    Z: ZoneProvider + ?Sized,
    O: RecurrenceOracle + ?Sized,
{
    let now = zones.now();
    let window = DayWindow::containing(&now);

    let mut outcomes = Vec::new();
    let mut failures = Vec::new();

    for path in locator.candidates() {
        match resolve_store(&path, &window, zones, oracle, store_options) {
            Ok(outcome) => {
                info!(
                    store = %outcome.source,
                    unit = %outcome.unit,
                    records = outcome.resolution.stats.records,
                    occurrences = outcome.resolution.stats.occurrences,
                    "resolved store"
                );
                outcomes.push(outcome);
            }
            Err(e) => {
                warn!(store = %path.display(), error = %e, "skipping store");
                failures.push(StoreFailure {
                    source: path.display().to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    aggregate(&outcomes, &failures, &now, aggregate_options)
}
