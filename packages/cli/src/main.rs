#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ranks NYC filming permits by the noise complaints filed during them.
//!
//! Validates the requested date range, extracts both datasets from the NYC
//! Open Data Socrata API into audit CSVs, and writes `results.csv` with each
//! permit's complaint count.
//!
//! Logging goes through [`film_noise_cli_utils::init_logger`], so `RUST_LOG`
//! controls verbosity and log lines never fight the progress spinners.

mod config;
mod pipeline;

use std::process::ExitCode;

use clap::Parser;
use film_noise_cli_utils::IndicatifProgress;
use film_noise_dates::{DateRange, MAX_RANGE_DAYS, ValidationError, is_valid_date_format};
use film_noise_source::socrata::HttpSodaClient;

use crate::config::Settings;

#[derive(Parser, Debug)]
#[command(
    name = "film_noise",
    version,
    about = "Tool to analyze filming permit and noise complaint correlations."
)]
struct Cli {
    /// Start date in YYYY-MM-DD format
    start_date: String,

    /// End date in YYYY-MM-DD format
    end_date: String,
}

/// Process exit code for each validation failure. Code 2 is left to `clap`
/// for usage errors.
const fn exit_code(error: &ValidationError) -> u8 {
    match error {
        ValidationError::InvalidStartFormat => 3,
        ValidationError::InvalidEndFormat => 4,
        ValidationError::InvalidRange => 5,
        ValidationError::RangeTooLong { .. } => 6,
    }
}

/// Checks both arguments are `YYYY-MM-DD`, start first.
fn check_formats(start: &str, end: &str) -> Result<(), ValidationError> {
    if !is_valid_date_format(start) {
        return Err(ValidationError::InvalidStartFormat);
    }
    if !is_valid_date_format(end) {
        return Err(ValidationError::InvalidEndFormat);
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let multi = film_noise_cli_utils::init_logger();
    let cli = Cli::parse();

    let range = match check_formats(&cli.start_date, &cli.end_date).and_then(|()| {
        println!("Maximum date range: {MAX_RANGE_DAYS} days");
        DateRange::parse(
            &cli.start_date,
            &cli.end_date,
            chrono::Local::now().naive_local(),
        )
    }) {
        Ok(range) => range,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(exit_code(&e));
        }
    };

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let client = match HttpSodaClient::new(&settings.client) {
        Ok(client) => client,
        Err(e) => {
            log::error!("Failed to build Socrata client: {e}");
            return ExitCode::FAILURE;
        }
    };

    log::info!(
        "Analyzing {} to {} ({} days), output in {}",
        range.start_str(),
        range.end_str(),
        range.days(),
        settings.output_dir.display()
    );

    match pipeline::run(&client, &range, &settings.output_dir, |name| {
        IndicatifProgress::records_bar(&multi, name)
    })
    .await
    {
        Ok(Some(path)) => {
            println!("Results written to {}", path.display());
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Pipeline failed: {e}");
            ExitCode::FAILURE
        }
    }
}
