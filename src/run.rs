//! Batch runs in simulated time

use std::path::Path;
use std::time::Duration;

use serde::Serialize;

use s32sim_shared::config::SimConfig;
use s32sim_simulator::{Board, SimError, SimStats, Simulator, TraceWriter};

/// Outcome of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub stats: SimStats,
    /// Text printed on the firmware console
    pub console: String,
    pub trace_events: usize,
}

/// Boot the board, run it for `simulation.duration_ms` of simulated time and
/// write the bus trace into `simulation.output_dir`.
pub fn run_simulated(config: &SimConfig) -> Result<RunReport, SimError> {
    let board = Board::boot(config)?;
    let mut trace = TraceWriter::create(Path::new(&config.simulation.output_dir))?;
    let mut sim = Simulator::new(board, config);

    let limit = Duration::from_millis(config.simulation.duration_ms);
    // Drain the trace once per simulated second so the channel stays short.
    let mut until = Duration::ZERO;
    let stats = loop {
        until = (until + Duration::from_secs(1)).min(limit);
        let stats = sim.run_until(until);
        trace.drain(sim.board().trace_events())?;
        if until >= limit {
            break stats;
        }
    };
    let trace_events = trace.finish()?;

    tracing::info!(
        events = stats.events_processed,
        polls = stats.task_polls,
        "Simulation finished at {:?}",
        sim.now()
    );
    Ok(RunReport {
        stats,
        console: sim.board().console_output().to_string_lossy(),
        trace_events,
    })
}
