use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use content_pipeline_core::{AppConfig, ManualClock, PipelineError, Session};
use tracing_subscriber::EnvFilter;

/// Ten years of simulated time.
const MAX_SIMULATED_HOURS: i64 = 24 * 365 * 10;

fn main() -> content_pipeline_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            endpoint,
            limit,
            videos,
            hours,
            countries,
        } => run_pipeline(config, &endpoint, limit, videos, hours, &countries),
        Commands::Niches {
            endpoint,
            limit,
            countries,
        } => list_niches(config, &endpoint, limit, &countries),
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> content_pipeline_core::Result<AppConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading configuration");
            AppConfig::load(path)
        }
        None => Ok(AppConfig::default()),
    }
}

fn open_session(
    config: AppConfig,
    clock: ManualClock,
    endpoint: &str,
    countries: &[String],
) -> content_pipeline_core::Result<Session> {
    let mut session = Session::with_clock(config, clock)?;
    if !countries.is_empty() {
        session.set_target_countries(countries)?;
    }
    session.connect(endpoint)?;
    Ok(session)
}

fn run_pipeline(
    config: AppConfig,
    endpoint: &str,
    limit: usize,
    videos: usize,
    hours: i64,
    countries: &[String],
) -> content_pipeline_core::Result<()> {
    tracing::info!(limit, videos, hours, "running simulated pipeline");

    // Simulated time lets the performance model see the requested elapsed
    // hours without waiting for them.
    let clock = ManualClock::starting_at(Utc::now());
    let mut session = open_session(config, clock.clone(), endpoint, countries)?;

    let niches = session.discover(limit)?;
    for niche in niches.iter().take(videos) {
        let video = session.generate_content(niche.id)?;
        session.produce(video.id)?;
        session.publish(video.id)?;
    }

    let elapsed = Duration::try_hours(hours).ok_or_else(|| {
        PipelineError::invalid_input(format!("{hours} hours is out of range"))
    })?;
    clock.advance(elapsed)?;
    match session.measure(None) {
        Ok(records) => tracing::info!(records = records.len(), "measurement complete"),
        Err(err) => tracing::warn!(%err, "skipping measurement"),
    }

    println!("{}", session.snapshot().to_json()?);
    Ok(())
}

fn list_niches(
    config: AppConfig,
    endpoint: &str,
    limit: usize,
    countries: &[String],
) -> content_pipeline_core::Result<()> {
    let clock = ManualClock::starting_at(Utc::now());
    let mut session = open_session(config, clock, endpoint, countries)?;

    println!(
        "{:<4} {:<28} {:<12} {:>5} {:>11} {:>8}",
        "ID", "NICHE", "CATEGORY", "CPM", "OPPORTUNITY", "LEVEL"
    );
    for niche in session.discover(limit)? {
        println!(
            "{:<4} {:<28} {:<12} {:>5.1} {:>11.2} {:>8}",
            niche.id,
            niche.name,
            niche.category,
            niche.cpm_score,
            niche.opportunity_score,
            niche.opportunity_level().as_str()
        );
    }
    println!("Target countries: {}", session.target_countries().join(", "));
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Simulated content production pipeline", long_about = None)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Discover niches, publish videos and print the resulting session as JSON.
    Run {
        /// Endpoint of the generation backend.
        #[arg(short, long, default_value = "simulated://backend")]
        endpoint: String,
        /// Number of niches to discover.
        #[arg(short, long, default_value_t = 3)]
        limit: usize,
        /// Number of discovered niches to turn into published videos.
        #[arg(short, long, default_value_t = 1)]
        videos: usize,
        /// Simulated hours between publication and measurement.
        #[arg(long, default_value_t = 72, value_parser = clap::value_parser!(i64).range(0..=MAX_SIMULATED_HOURS))]
        hours: i64,
        /// Target countries, overriding the configured defaults.
        #[arg(long, value_delimiter = ',')]
        countries: Vec<String>,
    },
    /// Discover niches and print them as a table.
    Niches {
        /// Endpoint of the generation backend.
        #[arg(short, long, default_value = "simulated://backend")]
        endpoint: String,
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
        /// Target countries, overriding the configured defaults.
        #[arg(long, value_delimiter = ',')]
        countries: Vec<String>,
    },
    /// Print the effective configuration as TOML.
    Config,
}
