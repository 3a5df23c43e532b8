//! The `series` command: expand profiles into an hourly CSV time series.
use crate::log;
use crate::profile::{ProfileType, TemporalProfile};
use crate::settings::Settings;
use crate::time_series::{TimeSerie, create_scaling_factors_time_serie, create_time_serie};
use ::log::info;
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::Args;
use itertools::Itertools;
use serde::Serialize;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// The format used for timestamps in the output file
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Options for the series command
#[derive(Args)]
pub struct SeriesOpts {
    /// First hour of the series, as `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM:SS`
    #[arg(value_parser = parse_timestamp)]
    pub start: NaiveDateTime,
    /// Last hour of the series (inclusive)
    #[arg(value_parser = parse_timestamp)]
    pub end: NaiveDateTime,
    /// A profile as `TYPE` (uniform) or `TYPE:r1,r2,...`, e.g. `weekly:0.2,0.2,0.2,0.2,0.2,0,0`
    #[arg(short, long = "profile", required = true)]
    pub profiles: Vec<String>,
    /// Write scaling factors (ratio times profile size) instead of ratios
    #[arg(long)]
    pub scaling_factors: bool,
    /// File to write the series to, instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Directory in which to also write log files
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

/// A row of the output CSV file
#[derive(Serialize)]
struct SerieRow {
    time: String,
    value: f64,
}

/// Parse a date or date and time given on the command line
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map(|date| date.and_time(NaiveTime::MIN))
        })
        .map_err(|_| format!("Invalid timestamp '{s}': expected YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS"))
}

/// Parse a profile given as `TYPE` or `TYPE:r1,r2,...`
pub fn parse_profile(s: &str) -> Result<TemporalProfile> {
    let (type_str, ratios_str) = match s.split_once(':') {
        Some((type_str, ratios_str)) => (type_str, Some(ratios_str)),
        None => (s, None),
    };
    let profile_type: ProfileType = type_str
        .trim()
        .parse()
        .with_context(|| format!("Invalid profile '{s}'"))?;

    let Some(ratios_str) = ratios_str else {
        return Ok(TemporalProfile::uniform(profile_type));
    };

    let ratios: Vec<f64> = ratios_str
        .split(',')
        .map(|ratio| {
            ratio
                .trim()
                .parse::<f64>()
                .with_context(|| format!("Invalid ratio '{ratio}' in profile '{s}'"))
        })
        .try_collect()?;

    TemporalProfile::from_vec(profile_type, ratios).with_context(|| format!("Invalid profile '{s}'"))
}

/// Write a time series as CSV with `time` and `value` columns
pub fn write_time_serie<W: io::Write>(serie: &TimeSerie, writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for (time, value) in serie {
        writer.serialize(SerieRow {
            time: time.format(TIMESTAMP_FORMAT).to_string(),
            value,
        })?;
    }
    writer.flush()?;

    Ok(())
}

/// Handle the `series` command.
pub fn handle_series_command(opts: &SeriesOpts, settings: Option<Settings>) -> Result<()> {
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    if let Some(log_dir) = &opts.log_dir {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create directory: {}", log_dir.display()))?;
    }
    if !log::is_logger_initialised() {
        log::init(Some(&settings.log_level), opts.log_dir.as_deref())
            .context("Failed to initialise logging.")?;
    }

    let profiles: Vec<_> = opts.profiles.iter().map(|s| parse_profile(s)).try_collect()?;
    let serie = if opts.scaling_factors || settings.scaling_factors {
        create_scaling_factors_time_serie(opts.start, opts.end, &profiles)
    } else {
        create_time_serie(opts.start, opts.end, &profiles)
    }
    .context("Failed to create time series.")?;

    match &opts.output {
        Some(path) => {
            write_to_file(&serie, path)?;
            // Only log when not writing the series itself to stdout
            info!(
                "Wrote {} hourly values for profiles {} to {}",
                serie.len(),
                profiles.iter().map(TemporalProfile::profile_type).join(", "),
                path.display()
            );
        }
        None => write_time_serie(&serie, io::stdout().lock())?,
    }

    Ok(())
}

fn write_to_file(serie: &TimeSerie, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Could not create file: {}", path.display()))?;
    write_time_serie(serie, file).with_context(|| format!("Could not write to {}", path.display()))
}
