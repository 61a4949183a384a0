//! Cross-store aggregation and the next/remaining projections.
//!
//! Occurrences from every store that resolved successfully are merged into
//! one list, stably sorted by start, and projected two independent ways:
//!
//! - [`remaining_count`] counts meetings not yet over (ongoing or future).
//! - [`next_start`] is the earliest start at or after now, ignoring whether an
//!   earlier meeting is still running.
//!
//! Only the absence of any usable store becomes a [`ResolutionError`]; an
//! empty day is a normal result with a zero count.

use chrono::{DateTime, TimeZone};
use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;

use crate::resolver::{Occurrence, Resolution, ResolveStats};
use crate::units::EpochUnit;

/// A store that was read and resolved.
#[derive(Debug, Clone)]
pub struct StoreOutcome {
    /// Where the store came from (usually its path).
    pub source: String,
    pub unit: EpochUnit,
    pub resolution: Resolution,
}

/// A store that was abandoned before it produced occurrences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreFailure {
    pub source: String,
    pub reason: String,
}

/// Output-step options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateOptions {
    /// Attach per-store diagnostics to the result.
    pub verbose: bool,
}

/// Run-level failure reported in [`ResolutionResult::error`].
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionError {
    #[error("no calendar store found")]
    NoCandidates,

    #[error("no calendar store readable ({attempted} tried): {last_error}")]
    StoreUnavailable { attempted: usize, last_error: String },
}

/// Per-store diagnostic line, attached only in verbose mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreDiagnostics {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<EpochUnit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<ResolveStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

/// Terminal output of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionResult {
    pub next_start: Option<DateTime<Tz>>,
    pub remaining_count: usize,
    pub total_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResolutionError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Vec<StoreDiagnostics>>,
}

impl ResolutionResult {
    pub fn failed(error: ResolutionError) -> Self {
        Self {
            next_start: None,
            remaining_count: 0,
            total_count: 0,
            error: Some(error),
            diagnostics: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Merge all stores' occurrences, sorted by start. Ties keep store order, then
/// record order.
pub fn merge_occurrences(outcomes: &[StoreOutcome]) -> Vec<Occurrence> {
    let mut merged: Vec<Occurrence> = outcomes
        .iter()
        .flat_map(|o| o.resolution.occurrences.iter().cloned())
        .collect();
    merged.sort_by_key(|o| o.start);
    merged
}

/// Occurrences that are ongoing or still to come: end ≥ now, or start ≥ now
/// when there is no end.
pub fn remaining_count<Z: TimeZone>(occurrences: &[Occurrence], now: &DateTime<Z>) -> usize {
    occurrences
        .iter()
        .filter(|o| match &o.end {
            Some(end) => *end >= *now,
            None => o.start >= *now,
        })
        .count()
}

/// Earliest start at or after now.
pub fn next_start<Z: TimeZone>(
    occurrences: &[Occurrence],
    now: &DateTime<Z>,
) -> Option<DateTime<Tz>> {
    occurrences
        .iter()
        .map(|o| o.start)
        .filter(|start| *start >= *now)
        .min()
}

/// Build the run result from every store attempted.
///
/// `failures` only matter when no store succeeded, or for diagnostics.
pub fn aggregate(
    outcomes: &[StoreOutcome],
    failures: &[StoreFailure],
    now: &DateTime<Tz>,
    options: AggregateOptions,
) -> ResolutionResult {
    let diagnostics = options.verbose.then(|| collect_diagnostics(outcomes, failures));

    if outcomes.is_empty() {
        let error = match failures.last() {
            None => ResolutionError::NoCandidates,
            Some(last) => ResolutionError::StoreUnavailable {
                attempted: failures.len(),
                last_error: last.reason.clone(),
            },
        };
        return ResolutionResult {
            diagnostics,
            ..ResolutionResult::failed(error)
        };
    }

    let occurrences = merge_occurrences(outcomes);

    ResolutionResult {
        next_start: next_start(&occurrences, now),
        remaining_count: remaining_count(&occurrences, now),
        total_count: occurrences.len(),
        error: None,
        diagnostics,
    }
}

fn collect_diagnostics(
    outcomes: &[StoreOutcome],
    failures: &[StoreFailure],
) -> Vec<StoreDiagnostics> {
    let succeeded = outcomes.iter().map(|o| StoreDiagnostics {
        source: o.source.clone(),
        unit: Some(o.unit),
        stats: Some(o.resolution.stats),
        failure: None,
    });
    let failed = failures.iter().map(|f| StoreDiagnostics {
        source: f.source.clone(),
        unit: None,
        stats: None,
        failure: Some(f.reason.clone()),
    });
    failed.chain(succeeded).collect()
}
