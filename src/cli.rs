//! The command line interface.
use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};

pub mod series;
use series::{SeriesOpts, handle_series_command};
pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for working with temporal emission profiles.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Write the hourly time series of a set of profiles as CSV.
    Series {
        /// Options for the time series
        #[command(flatten)]
        opts: SeriesOpts,
    },
    /// Manage program settings.
    Settings {
        /// The available subcommands for managing settings.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Series { opts } => handle_series_command(&opts, None),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and run the requested command
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}
