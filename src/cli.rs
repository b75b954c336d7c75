//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing. Feed and server settings can
//! also come from `QUAKEMAP_*` environment variables.

use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::client::{ClientConfig, REQUEST_TIMEOUT_SECS, TimeRange, USGS_BASE_URL};
use crate::output::Format;

/// Interactive map of recent earthquakes.
#[derive(Parser, Debug)]
#[command(name = "quakemap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Base URL of the earthquake feed service
    #[arg(long, global = true, env = "QUAKEMAP_FEED_URL", default_value = USGS_BASE_URL)]
    pub feed_url: String,

    /// Feed request timeout in seconds
    #[arg(long, global = true, env = "QUAKEMAP_TIMEOUT_SECS", default_value_t = REQUEST_TIMEOUT_SECS)]
    pub timeout_secs: u64,
}

impl Cli {
    /// Feed client settings from the global flags.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.feed_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the web map
    Serve(ServeArgs),

    /// Print recent earthquakes and their stats (one-shot fetch and exit)
    Tail(TailArgs),
}

/// Arguments for the `serve` command.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(long, short = 'p', env = "QUAKEMAP_PORT", default_value = "8080")]
    pub port: u16,

    /// Host to bind to. Popup times are rendered in this machine's local
    /// time zone, so remote viewers see server-local times.
    #[arg(long, env = "QUAKEMAP_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Time range shown when the page first loads
    #[arg(long, default_value = "day", value_parser = parse_time_range)]
    pub range: TimeRange,

    /// Initial minimum magnitude (0.0 - 7.0)
    #[arg(long, default_value = "0")]
    pub min_magnitude: f64,

    /// Open browser automatically
    #[arg(long)]
    pub open: bool,
}

/// Arguments for the `tail` command.
#[derive(Parser, Debug)]
pub struct TailArgs {
    /// Time range to fetch
    #[arg(long, default_value = "day", value_parser = parse_time_range)]
    pub range: TimeRange,

    /// Minimum magnitude to show
    #[arg(long, default_value = "0")]
    pub min_magnitude: f64,

    /// Maximum number of events to show
    #[arg(long, short = 'n', default_value = "50")]
    pub limit: usize,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Parse a time range from string.
fn parse_time_range(s: &str) -> Result<TimeRange, String> {
    s.parse()
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}
