//! Typed calendar rows and the cancelled-instance set.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// One event row as stored, before any interpretation.
///
/// Timestamps are in the store's native epoch unit. Optional columns stay
/// optional here so resolution never has to guess what a missing value meant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    /// Owning calendar; cancellations are keyed by it.
    pub series_id: String,
    pub raw_start: i64,
    pub raw_end: Option<i64>,
    pub start_zone: Option<String>,
    pub rule: Option<String>,
}

impl EventRecord {
    pub fn new(id: impl Into<String>, series_id: impl Into<String>, raw_start: i64) -> Self {
        Self {
            id: id.into(),
            series_id: series_id.into(),
            raw_start,
            raw_end: None,
            start_zone: None,
            rule: None,
        }
    }

    pub fn with_end(mut self, raw_end: i64) -> Self {
        self.raw_end = Some(raw_end);
        self
    }

    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.start_zone = Some(zone.into());
        self
    }

    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    /// Recurring iff a non-blank rule is attached.
    pub fn is_recurring(&self) -> bool {
        self.rule.as_deref().is_some_and(|r| !r.trim().is_empty())
    }
}

/// A cancelled instance of a recurring series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExceptionKey {
    pub series_id: String,
    /// Instance start, UTC, in the store's epoch unit.
    pub instance: i64,
}

impl ExceptionKey {
    pub fn new(series_id: impl Into<String>, instance: i64) -> Self {
        Self {
            series_id: series_id.into(),
            instance,
        }
    }
}

/// Cancelled instances loaded from one store, grouped by series.
#[derive(Debug, Clone, Default)]
pub struct ExceptionSet {
    by_series: HashMap<String, HashSet<i64>>,
}

impl ExceptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the key was already present.
    pub fn insert(&mut self, key: ExceptionKey) -> bool {
        self.by_series
            .entry(key.series_id)
            .or_default()
            .insert(key.instance)
    }

    pub fn contains(&self, series_id: &str, instance: i64) -> bool {
        self.by_series
            .get(series_id)
            .is_some_and(|instances| instances.contains(&instance))
    }

    pub fn len(&self) -> usize {
        self.by_series.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_series.values().all(HashSet::is_empty)
    }
}

impl FromIterator<ExceptionKey> for ExceptionSet {
    fn from_iter<I: IntoIterator<Item = ExceptionKey>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl Extend<ExceptionKey> for ExceptionSet {
    fn extend<I: IntoIterator<Item = ExceptionKey>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}
