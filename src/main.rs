//! # Inkboard Application Entry Point
//!
//! Loads configuration, picks a dashboard and drives it on a schedule. Frames
//! go to a PNG output directory (picked up by the panel driver) or, with
//! `--ascii`, to the terminal for development without hardware.

#[cfg(test)]
mod tests;

use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use inkboard::config::{Config, DEFAULT_CONFIG_PATH};
use inkboard::dashboard::{Dashboard, JokeDashboard, MapDashboard, PhotoDashboard};
use inkboard::display::{DisplaySink, LogIndicator, PngSink};
use inkboard::http::HttpClient;
use inkboard::preview::AsciiSink;
use inkboard::runner::Runner;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum DashboardKind {
    Map,
    Joke,
    Photo,
}

#[derive(Parser, Debug)]
#[command(version, about = "Two-colour e-ink dashboard renderer")]
struct Args {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Which dashboard to draw
    #[arg(long, value_enum, default_value_t = DashboardKind::Map)]
    dashboard: DashboardKind,

    /// Draw a single frame and exit
    #[arg(long)]
    once: bool,

    /// Directory receiving primary.png, accent.png, preview.png and frame.bin
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Print an ASCII preview instead of writing images
    #[arg(long)]
    ascii: bool,
}

fn build_dashboard(kind: DashboardKind, config: &Config, http: &HttpClient) -> Box<dyn Dashboard> {
    match kind {
        DashboardKind::Map => Box::new(MapDashboard::from_config(config, http)),
        DashboardKind::Joke => Box::new(JokeDashboard::from_config(config, http)),
        DashboardKind::Photo => Box::new(PhotoDashboard::from_config(config, http)),
    }
}

fn load_config(args: &Args) -> Config {
    Config::load_from_path(&args.config)
}

fn build_sink(args: &Args) -> Box<dyn DisplaySink> {
    if args.ascii {
        Box::new(AsciiSink::default())
    } else {
        Box::new(PngSink::new(&args.output_dir))
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("inkboard=info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args);
    let http = HttpClient::new().context("failed to start HTTP client")?;

    if !args.ascii {
        std::fs::create_dir_all(&args.output_dir).with_context(|| {
            format!("cannot create output directory {}", args.output_dir.display())
        })?;
    }

    let dashboard = build_dashboard(args.dashboard, &config, &http);
    tracing::info!(dashboard = dashboard.name(), "starting");

    let mut runner = Runner::new(
        dashboard,
        build_sink(&args),
        Box::new(LogIndicator::default()),
        &config.schedule,
    );

    if args.once {
        runner
            .run_cycle(Utc::now())
            .context("failed to draw frame")?;
        return Ok(());
    }

    runner.run_forever()
}
