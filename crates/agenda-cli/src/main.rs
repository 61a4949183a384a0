//! `agenda` CLI — today's next meeting and remaining count from a local
//! calendar store, for status bars and scripts.
//!
//! ## Usage
//!
//! ```sh
//! # Waybar module output, scanning ~/.thunderbird profiles
//! agenda
//!
//! # Read explicit stores, print the full result
//! agenda --db ~/work/local.sqlite --db ~/home/local.sqlite --format json
//!
//! # Reproducible run: pinned clock and zone, with per-store diagnostics
//! agenda --now 2026-03-17T10:00:00-04:00 --tz America/New_York --verbose
//! ```
//!
//! A rendered result always exits 0, including "no store found"; the error is
//! part of the output. Only argument and I/O failures exit non-zero.

mod render;

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use agenda_engine::{AggregateOptions, FixedZones, RRuleOracle, SystemZones, ZoneProvider};
use agenda_store::{
    resolve_today, FixedLocator, ProfileScanLocator, StoreLocator, StoreOptions,
    DEFAULT_BUSY_TIMEOUT,
};
use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use render::Format;

#[derive(Parser, Debug)]
#[command(
    name = "agenda",
    version,
    about = "Today's next meeting and remaining count from a local calendar store"
)]
struct Cli {
    /// Calendar store to read; repeat to try several in order. Disables the
    /// profile scan. Without this flag, `AGENDA_DB` is read as a
    /// PATH-style list.
    #[arg(long = "db")]
    db: Vec<PathBuf>,

    /// Directory whose profiles are scanned for calendar stores
    /// [default: ~/.thunderbird]
    #[arg(long, env = "AGENDA_PROFILE_ROOT")]
    profile_root: Option<PathBuf>,

    /// Output format
    #[arg(long, env = "AGENDA_FORMAT", value_enum, default_value_t = Format::Waybar)]
    format: Format,

    /// Attach per-store diagnostics and log at debug level
    #[arg(short, long, env = "AGENDA_DEBUG")]
    verbose: bool,

    /// How long to wait on a locked store snapshot, in milliseconds
    #[arg(
        long,
        env = "AGENDA_BUSY_TIMEOUT_MS",
        default_value_t = DEFAULT_BUSY_TIMEOUT.as_millis() as u64
    )]
    busy_timeout_ms: u64,

    /// Pin the current instant (RFC 3339)
    #[arg(long, env = "AGENDA_NOW", value_parser = parse_now)]
    now: Option<DateTime<FixedOffset>>,

    /// Pin the observer's timezone (IANA name)
    #[arg(long, env = "AGENDA_TZ", value_parser = parse_tz)]
    tz: Option<Tz>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let zones = zones(&cli);
    let locator = locator(&cli);
    let store_options = StoreOptions {
        busy_timeout: Duration::from_millis(cli.busy_timeout_ms),
        ..StoreOptions::default()
    };
    let aggregate_options = AggregateOptions {
        verbose: cli.verbose,
    };

    tracing::debug!(
        zone = %zones.local_zone(),
        now = %zones.now().to_rfc3339(),
        "starting run"
    );

    let result = resolve_today(
        locator.as_ref(),
        zones.as_ref(),
        &RRuleOracle::new(),
        &store_options,
        aggregate_options,
    );

    let output = render::render(&result, cli.format).context("Failed to render result")?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{output}").context("Failed to write to stdout")?;

    Ok(())
}

/// Logs go to stderr; stdout carries only the rendered result.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// The host clock and zone, unless either is pinned.
fn zones(cli: &Cli) -> Box<dyn ZoneProvider> {
    if cli.now.is_none() && cli.tz.is_none() {
        return Box::new(SystemZones::detect());
    }

    let local = cli.tz.unwrap_or_else(|| SystemZones::detect().local_zone());
    let now = cli
        .now
        .map(|now| now.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    Box::new(FixedZones::new(local, now))
}

/// Name of the environment list of stores used when no `--db` is given.
const DB_ENV: &str = "AGENDA_DB";

fn locator(cli: &Cli) -> Box<dyn StoreLocator> {
    if !cli.db.is_empty() {
        return Box::new(FixedLocator::new(cli.db.iter().cloned()));
    }
    if let Some(list) = env::var_os(DB_ENV).filter(|list| !list.is_empty()) {
        return Box::new(FixedLocator::new(env::split_paths(&list)));
    }

    match &cli.profile_root {
        Some(root) => Box::new(ProfileScanLocator::new(root.clone())),
        None => match ProfileScanLocator::thunderbird_default() {
            Some(scan) => Box::new(scan),
            None => {
                tracing::warn!("no home directory, nothing to scan");
                Box::new(FixedLocator::default())
            }
        },
    }
}

fn parse_now(value: &str) -> std::result::Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_rfc3339(value).map_err(|e| format!("expected an RFC 3339 instant: {e}"))
}

fn parse_tz(value: &str) -> std::result::Result<Tz, String> {
    value
        .parse::<Tz>()
        .map_err(|_| format!("unknown timezone '{value}'"))
}
