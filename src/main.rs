//! quakemap - Interactive map of recent earthquakes.
//!
//! Fetches a USGS summary feed, filters it by magnitude, and renders the
//! result either as a clustered web map or as a one-shot terminal listing.

use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

mod bands;
mod cli;
mod client;
mod errors;
mod filters;
mod models;
mod output;
mod server;
mod store;
mod view;

use cli::{Cli, Command};
use client::{ClientConfig, FeedClient};
use filters::DerivedStats;
use store::ViewState;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    let client_config = cli.client_config();
    match cli.command {
        Command::Serve(args) => cmd_serve(args, &client_config),
        Command::Tail(args) => cmd_tail(args, &client_config),
    }
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to create tokio runtime")
}

/// Execute the `tail` command - fetch once, filter, print.
fn cmd_tail(args: cli::TailArgs, client_config: &ClientConfig) -> Result<()> {
    let min_magnitude = filters::clamp_min_magnitude(args.min_magnitude)
        .context("minimum magnitude must be a number")?;
    let client = FeedClient::new(client_config).context("failed to create feed client")?;

    let events = runtime()?
        .block_on(client.fetch(args.range))
        .context("failed to fetch earthquake feed")?;

    let mut visible = filters::filter_events(&events, min_magnitude);
    let stats = DerivedStats::from_filtered(&visible);

    // Most recent first
    visible.sort_by(|a, b| b.time_millis.cmp(&a.time_millis));
    visible.truncate(args.limit);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if args.format == output::Format::Human {
        output::write_summary(&mut handle, args.range, min_magnitude, &stats)?;
    }
    output::write_events(&mut handle, &visible, args.format)?;

    Ok(())
}

/// Execute the `serve` command - start the web map.
fn cmd_serve(args: cli::ServeArgs, client_config: &ClientConfig) -> Result<()> {
    let client = FeedClient::new(client_config).context("failed to create feed client")?;

    let config = server::ServerConfig {
        port: args.port,
        host: args.host.clone(),
        initial_view: ViewState {
            min_magnitude: args.min_magnitude,
            time_range: args.range,
        },
    };

    // Print startup message
    let url = format!("http://{}:{}", args.host, args.port);
    println!("\x1b[1m🌍 quakemap\x1b[0m");
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("  Local:   \x1b[96m{url}\x1b[0m");
    println!("  Range:   {}", args.range.label());
    println!("  Feed:    {}", client_config.base_url);
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("\x1b[2mPress Ctrl+C to stop\x1b[0m\n");

    // Open browser if requested (using xdg-open/open command)
    if args.open {
        #[cfg(target_os = "linux")]
        let _ = std::process::Command::new("xdg-open").arg(&url).spawn();
        #[cfg(target_os = "macos")]
        let _ = std::process::Command::new("open").arg(&url).spawn();
        #[cfg(target_os = "windows")]
        let _ = std::process::Command::new("cmd").args(["/c", "start", &url]).spawn();
    }

    runtime()?.block_on(server::run_server(config, client))
}
