//! Batch triage of the configured locations for one forecast date.
//!
//! Usage:
//! ```bash
//! # Assess every configured location for next Saturday
//! thermal-triage --config triage.toml --input-dir bags/
//!
//! # A single date and a subset of the locations, with debug logs
//! thermal-triage --date 2026-03-07 --locations koessen,innsbruck -v
//! ```
//!
//! Every location is read from `<input-dir>/<key>.json`. A file that is missing or cannot be
//! parsed turns that location into an ERROR entry, the other locations are still assessed.

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Duration, Local, NaiveDate, Utc};
use clap::Parser;
use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};
use thermal_triage::{
    load_config, Assessor, Location, LocationReport, LocationSources, TriageError, TriageReport,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "thermal-triage",
    about = "Multi-model paragliding forecast triage",
    long_about = "Merge the fetched model series of each location, find the thermal and flyable windows and rank the locations by status"
)]
struct TriageArgs {
    /// TOML configuration with the locations and thresholds
    #[arg(long, default_value = "triage.toml")]
    config: PathBuf,

    /// Forecast date, YYYY-MM-DD (default: the next Saturday, today on a Saturday)
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Directory holding one `<key>.json` source bag per location
    #[arg(long, default_value = "bags")]
    input_dir: PathBuf,

    /// Comma separated location keys (default: all)
    #[arg(long, value_delimiter = ',')]
    locations: Vec<String>,

    /// Where to write the JSON report (default: triage_<date>.json)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// Today if it is a Saturday, else the coming Saturday.
fn next_saturday(today: NaiveDate) -> NaiveDate {
    let days_ahead = (5 + 7 - today.weekday().num_days_from_monday() as i64) % 7;
    today + Duration::days(days_ahead)
}

fn read_sources(input_dir: &Path, location: &Location) -> thermal_triage::Result<LocationSources> {
    let path = input_dir.join(format!("{}.json", location.key));
    let origin = path.display().to_string();

    let contents = fs::read_to_string(&path).map_err(|err| TriageError::SourceBag {
        origin: origin.clone(),
        reason: err.to_string(),
    })?;

    contents.parse().map_err(|err| match err {
        TriageError::SourceBag { reason, .. } => TriageError::SourceBag { origin, reason },
        other => other,
    })
}

fn main() -> Result<()> {
    let args = TriageArgs::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    let locations: Vec<&Location> = if args.locations.is_empty() {
        config.locations.iter().collect()
    } else {
        args.locations
            .iter()
            .map(|key| config.location(key.trim()))
            .collect::<thermal_triage::Result<_>>()?
    };
    if locations.is_empty() {
        bail!("no locations configured in {}", args.config.display());
    }

    let date = args
        .date
        .unwrap_or_else(|| next_saturday(Local::now().date_naive()));
    info!(%date, locations = locations.len(), "forecast date");

    let assessor = Assessor::new(&config, date);
    let reports: Vec<LocationReport> = locations
        .iter()
        .map(|loc| match read_sources(&args.input_dir, loc) {
            Ok(sources) => assessor.assess_sources(loc, sources),
            Err(err) => {
                error!(location = loc.key.as_str(), %err, "unreadable source bag");
                LocationReport::failed(loc, err.to_string())
            }
        })
        .collect();

    let report = TriageReport::new(&config, date, Utc::now(), reports);

    println!("Triage for {}", date);
    for line in report.summary_lines() {
        println!("{}", line);
    }
    for doubt in &report.doubts {
        println!("  ? {}", doubt.location);
        for issue in &doubt.issues {
            println!("      {}", issue);
        }
    }

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("triage_{}.json", date)));
    let file = File::create(&output).with_context(|| format!("creating {}", output.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &report)
        .with_context(|| format!("writing {}", output.display()))?;
    info!(path = %output.display(), "report written");

    Ok(())
}
