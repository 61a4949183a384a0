//! Output formats for a [`ResolutionResult`].

use agenda_engine::ResolutionResult;
use clap::ValueEnum;
use serde::Serialize;

/// How the result is written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// One-line JSON object for a Waybar custom module.
    #[default]
    Waybar,
    /// The full result as pretty-printed JSON.
    Json,
    /// A short human-readable line.
    Text,
}

/// Waybar custom-module payload.
#[derive(Debug, Serialize)]
struct WaybarPayload {
    text: String,
    tooltip: String,
    class: &'static str,
}

const NO_TIME: &str = "--";

pub fn render(result: &ResolutionResult, format: Format) -> serde_json::Result<String> {
    match format {
        Format::Waybar => serde_json::to_string(&waybar(result)),
        Format::Json => serde_json::to_string_pretty(result),
        Format::Text => Ok(text(result)),
    }
}

fn waybar(result: &ResolutionResult) -> WaybarPayload {
    if let Some(error) = &result.error {
        return WaybarPayload {
            text: "(!! | -)".to_string(),
            tooltip: format!("Error: {error}"),
            class: "meetings-error",
        };
    }

    let next = next_time(result);
    WaybarPayload {
        text: format!("({next} | {})", result.remaining_count),
        tooltip: format!(
            "Next meeting: {next}\nRemaining today: {}\nTotal today: {}",
            result.remaining_count, result.total_count
        ),
        class: "meetings",
    }
}

fn text(result: &ResolutionResult) -> String {
    if let Some(error) = &result.error {
        return format!("error: {error}");
    }
    match result.next_start {
        Some(_) => format!(
            "next {}, {} remaining",
            next_time(result),
            result.remaining_count
        ),
        None if result.remaining_count > 0 => {
            format!("{} remaining, none starting later", result.remaining_count)
        }
        None => "no more meetings today".to_string(),
    }
}

fn next_time(result: &ResolutionResult) -> String {
    result
        .next_start
        .map(|start| start.format("%H:%M").to_string())
        .unwrap_or_else(|| NO_TIME.to_string())
}
