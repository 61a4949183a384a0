//! # agenda-engine
//!
//! Deterministic resolution of "which meetings happen today" from raw calendar
//! rows.
//!
//! The engine is pure: it never touches the filesystem or a database. Callers
//! hand it typed [`EventRecord`]s, the store's cancelled instances and epoch
//! unit, a [`DayWindow`], a [`ZoneProvider`] and a [`RecurrenceOracle`]; it
//! returns concrete [`Occurrence`]s and, across stores, a
//! [`ResolutionResult`].
//!
//! ## Modules
//!
//! - [`units`] — seconds / milliseconds / microseconds inference and conversion
//! - [`zone`] — zone lookup with local fallback, the observer's clock
//! - [`window`] — the local day as a half-open instant range
//! - [`record`] — typed event rows, cancelled-instance keys
//! - [`expander`] — RRULE expansion behind the [`RecurrenceOracle`] trait
//! - [`resolver`] — records → occurrences for one store
//! - [`aggregate`] — cross-store merge, next/remaining projections
//! - [`error`] — Error types

pub mod aggregate;
pub mod error;
pub mod expander;
pub mod record;
pub mod resolver;
pub mod units;
pub mod window;
pub mod zone;

pub use aggregate::{
    aggregate, merge_occurrences, next_start, remaining_count, AggregateOptions,
    ResolutionError, ResolutionResult, StoreDiagnostics, StoreFailure, StoreOutcome,
};
pub use error::EngineError;
pub use expander::{RRuleOracle, RecurrenceOracle};
pub use record::{EventRecord, ExceptionKey, ExceptionSet};
pub use resolver::{resolve, Occurrence, Resolution, ResolveStats, StoreView};
pub use units::EpochUnit;
pub use window::DayWindow;
pub use zone::{FixedZones, SystemZones, ZoneProvider};
