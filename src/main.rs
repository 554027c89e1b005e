//! C10: the CLI front end. Argument parsing and dump/info formatting are
//! explicitly out of scope for the core (spec §1); this binary is just a
//! thin consumer of the library surface in §6.2.

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use whisperfile::{AggregationType, WhisperFile};

#[derive(Parser)]
#[command(name = "whisperfile", about = "A fixed-size, round-robin time series file")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new whisper file.
    Create {
        path: String,
        /// Archive specs, e.g. `10s:1h 1m:1d`.
        #[arg(required = true)]
        archives: Vec<String>,
        #[arg(long, default_value = "average")]
        aggregation: String,
        #[arg(long, default_value_t = 0)]
        x_files_factor: u8,
    },
    /// Dump every archive's full contents.
    Dump { path: String },
    /// Print a compact summary of the file's metadata.
    Info { path: String },
}

fn parse_aggregation(name: &str) -> Result<AggregationType, String> {
    match name {
        "average" => Ok(AggregationType::Average),
        "sum" => Ok(AggregationType::Sum),
        "last" => Ok(AggregationType::Last),
        "max" => Ok(AggregationType::Max),
        "min" => Ok(AggregationType::Min),
        other => Err(format!("unknown aggregation method: {other}")),
    }
}

fn run() -> Result<(), String> {
    let cli = Cli::parse();

    match cli.command {
        Command::Create { path, archives, aggregation, x_files_factor } => {
            let aggregation = parse_aggregation(&aggregation)?;
            WhisperFile::create(&path, &archives, aggregation, x_files_factor)
                .map_err(|e| e.to_string())?;
            println!("created {path}");
        }
        Command::Dump { path } => {
            let file = WhisperFile::open(&path).map_err(|e| e.to_string())?;
            print!("{file:?}");
        }
        Command::Info { path } => {
            let file = WhisperFile::open(&path).map_err(|e| e.to_string())?;
            println!("aggregation method: {}", file.header.aggregation);
            println!("max retention: {}s", file.header.max_retention);
            println!("x_files_factor: {}", file.header.x_files_factor);
            println!("archives:");
            for (i, archive) in file.archives.iter().enumerate() {
                println!(
                    "  {i}: {}s/point, {} points, {}s retention",
                    archive.seconds_per_point,
                    archive.points,
                    archive.retention()
                );
            }
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
