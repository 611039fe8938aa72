use std::path::PathBuf;

use chrono::{Local, NaiveDateTime};
use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use thermite_schedule::*;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Daily schedule codec (48 slots <-> 12 bytes)
    Daily {
        #[command(subcommand)]
        action: CodecAction,
    },
    /// Weekly schedule codec (7 slots <-> 14-bit integer)
    Weekly {
        #[command(subcommand)]
        action: CodecAction,
    },
    /// Print the factory default settings as JSON
    Defaults,
    /// Resolve the target temperature from a settings file
    Target {
        /// Settings JSON file (factory defaults if omitted)
        #[arg(short, long)]
        settings: Option<PathBuf>,
        /// Local time, e.g. 2021-02-01T12:00:00 (now if omitted)
        #[arg(short, long)]
        at: Option<NaiveDateTime>,
        /// Measured temperature; prints the heater decision as well
        #[arg(short, long)]
        temp: Option<f32>,
        /// Hysteresis threshold in degrees Celsius
        #[arg(long, default_value_t = thermostat::DEFAULT_HYSTERESIS)]
        hysteresis: f32,
    },
}

#[derive(Subcommand)]
enum CodecAction {
    /// Expand a packed value into slots
    Decode {
        /// Packed bytes (daily) or integer (weekly), comma separated, decimal or 0x hex
        packed: String,
    },
    /// Pack slot values
    Encode {
        /// Slot values 0-3, comma separated
        slots: String,
    },
}

#[instrument]
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RUST_LOG")
                .unwrap_or_else(|_| EnvFilter::new("thermite_schedule=info")),
        )
        .compact()
        .init();

    color_eyre::install()?;

    let cli = Cli::parse();
    debug!("Parsed command line arguments");

    match cli.command {
        Commands::Daily { action } => {
            let line = match action {
                CodecAction::Decode { packed } => format!("decode_daily:{packed}"),
                CodecAction::Encode { slots } => format!("encode_daily:{slots}"),
            };
            println!("{}", run_codec(&line)?);
        }
        Commands::Weekly { action } => {
            let line = match action {
                CodecAction::Decode { packed } => format!("decode_weekly:{packed}"),
                CodecAction::Encode { slots } => format!("encode_weekly:{slots}"),
            };
            println!("{}", run_codec(&line)?);
        }
        Commands::Defaults => {
            println!("{}", UserSettings::default().to_json()?);
        }
        Commands::Target {
            settings,
            at,
            temp,
            hysteresis,
        } => {
            let settings = match settings {
                Some(path) => UserSettings::load(&path).map_err(|e| {
                    error!("Failed to load settings: {}", e);
                    e
                })?,
                None => UserSettings::default(),
            };
            let at = at.unwrap_or_else(|| Local::now().naive_local());

            let mut thermostat = Thermostat::new(hysteresis);
            thermostat.update_at(&settings, at, temp)?;
            let state = thermostat.state(at);
            info!("Target at {} is {:?}", state.date_time, state.temp_target);
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
    }

    Ok(())
}

/// Runs a codec request through the line protocol
fn run_codec(line: &str) -> Result<String> {
    let command = protocol::Command::parse(line)?;
    Ok(command.execute()?)
}
