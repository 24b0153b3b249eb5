//! CLI entry point for the simulation harness: simulated-time runs, realtime runs and the memory map.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand};

use s32sim::realtime::RealtimeRunner;
use s32sim::shared::config::SimConfig;
use s32sim::simulator::{Board, S32k358Soc, SocConfig};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Simulation Harness CLI
#[derive(Parser, Debug)]
#[command(name = "sim-harness", about = "S32K358 peripheral simulation harness.")]
pub struct Cli {
    /// Path to a TOML config file (overrides defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory for the bus trace
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Run length in milliseconds
    #[arg(long)]
    duration_ms: Option<u64>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the firmware in simulated time (default)
    Run,
    /// Run the firmware against the wall clock until the duration or Ctrl-C
    Realtime,
    /// Print the peripheral address map
    MemoryMap,
}

fn log_level(verbose: u8) -> tracing::Level {
    match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    }
}

fn apply_overrides(cli: &Cli, config: &mut SimConfig) {
    if let Some(output) = &cli.output {
        config.simulation.output_dir = output.display().to_string();
    }
    if let Some(duration) = cli.duration_ms {
        config.simulation.duration_ms = duration;
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(log_level(cli.verbose))
        .init();

    let mut config = s32sim::load_settings(cli.config.as_deref()).map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        Box::new(e) as BoxError
    })?;
    apply_overrides(&cli, &mut config);

    match cli.command.as_ref().unwrap_or(&Commands::Run) {
        Commands::MemoryMap => {
            let soc = S32k358Soc::new(&SocConfig::from(&config));
            println!("{} @ {} Hz", soc.board().name, soc.board().sysclk_hz);
            for region in soc.memory_map() {
                println!("  {}", region);
            }
        }
        Commands::Run => {
            tracing::info!(
                "Running {} ms of simulated time, output in {}",
                config.simulation.duration_ms,
                config.simulation.output_dir
            );
            let report = s32sim::run_simulated(&config).map_err(|e| {
                tracing::error!("Simulation failed: {}", e);
                Box::new(e) as BoxError
            })?;
            print!("{}", report.console);
            tracing::info!(trace_events = report.trace_events, "Stats: {}", serde_json::to_string(&report.stats)?);
        }
        Commands::Realtime => {
            let board = Board::boot(&config).map_err(|e| {
                tracing::error!("Boot failed: {}", e);
                Box::new(e) as BoxError
            })?;
            let runner = RealtimeRunner::new(board, &config);
            let limit = cli
                .duration_ms
                .map(Duration::from_millis);
            match limit {
                Some(limit) => tracing::info!("Running for {:?} of wall-clock time", limit),
                None => tracing::info!("Running until Ctrl-C"),
            }
            let (stats, board) = runner.run(limit).await;
            print!("{}", board.console_output().to_string_lossy());
            tracing::info!("Stats: {}", serde_json::to_string(&stats)?);
        }
    }
    Ok(())
}
