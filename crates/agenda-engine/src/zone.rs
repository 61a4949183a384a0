//! Timezone lookup and the observer's clock.
//!
//! Every record carries an optional zone identifier. Identifiers that are
//! missing, unknown to the tz database, or the `floating` sentinel all resolve
//! to the observer's local zone.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Identifier stores use for wall-clock times with no attached zone.
pub const FLOATING: &str = "floating";

/// Source of zones and of "now" for a resolution run.
pub trait ZoneProvider {
    /// The observer's local zone.
    fn local_zone(&self) -> Tz;

    /// The current instant, expressed in the local zone.
    fn now(&self) -> DateTime<Tz>;

    /// Resolve a stored zone identifier, falling back to [`ZoneProvider::local_zone`].
    fn resolve(&self, identifier: Option<&str>) -> Tz {
        identifier
            .map(str::trim)
            .filter(|id| !id.is_empty() && !id.eq_ignore_ascii_case(FLOATING))
            .and_then(|id| id.parse::<Tz>().ok())
            .unwrap_or_else(|| self.local_zone())
    }
}

/// Host clock and host timezone.
#[derive(Debug, Clone, Copy)]
pub struct SystemZones {
    local: Tz,
}

impl SystemZones {
    /// Detect the host zone. Hosts whose zone cannot be determined or is not
    /// an IANA name are treated as UTC.
    pub fn detect() -> Self {
        let local = iana_time_zone::get_timezone()
            .ok()
            .and_then(|name| name.parse::<Tz>().ok())
            .unwrap_or(Tz::UTC);
        Self { local }
    }
}

impl ZoneProvider for SystemZones {
    fn local_zone(&self) -> Tz {
        self.local
    }

    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.local)
    }
}

/// A pinned zone and clock, for reproducible runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedZones {
    local: Tz,
    now: DateTime<Utc>,
}

impl FixedZones {
    pub fn new(local: Tz, now: DateTime<Utc>) -> Self {
        Self { local, now }
    }
}

impl ZoneProvider for FixedZones {
    fn local_zone(&self) -> Tz {
        self.local
    }

    fn now(&self) -> DateTime<Tz> {
        self.now.with_timezone(&self.local)
    }
}
