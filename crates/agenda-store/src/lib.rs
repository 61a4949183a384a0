//! # agenda-store
//!
//! Safe, read-only access to local calendar stores that another process may
//! be writing, feeding [`agenda_engine`].
//!
//! ## Modules
//!
//! - [`locator`] — ranked candidate store paths
//! - [`snapshot`] — scoped copies of a store and its `-wal`/`-shm` files
//! - [`reader`] — unit sampling, event rows, cancelled instances
//! - [`pipeline`] — per-store resolution and the full run
//! - [`error`] — Error types

pub mod error;
pub mod locator;
pub mod pipeline;
pub mod reader;
pub mod snapshot;

pub use error::StoreError;
pub use locator::{FixedLocator, ProfileScanLocator, StoreLocator, PROFILES_INI};
pub use pipeline::{resolve_store, resolve_today, StoreOptions};
pub use reader::{RecordBatch, StoreReader, DEFAULT_BUSY_TIMEOUT};
pub use snapshot::Snapshot;
