//! Wall-clock runner: every firmware task gets its own tokio interval.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};

use s32sim_mcu::FirmwareTask;
use s32sim_shared::config::SimConfig;
use s32sim_simulator::{Board, Lpuart, SimClock, SimStats};

/// Runs the board's tasks on the tokio runtime until a deadline or Ctrl-C.
pub struct RealtimeRunner {
    board: Board,
    rx_script: Vec<u8>,
    rx_interval: Duration,
}

#[derive(Default)]
struct Counters {
    polls: u64,
    injected: u64,
    dropped: u64,
}

impl RealtimeRunner {
    pub fn new(board: Board, config: &SimConfig) -> Self {
        Self {
            board,
            rx_script: config.simulation.rx_script.clone().into_bytes(),
            rx_interval: Duration::from_millis(config.simulation.rx_interval_ms),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Run until `limit` has elapsed, or until Ctrl-C when `limit` is `None`.
    /// Returns the stats and the board so its outputs can be inspected.
    pub async fn run(mut self, limit: Option<Duration>) -> (SimStats, Board) {
        let start = Instant::now();
        let (shutdown_tx, _) = broadcast::channel(1);
        let mut handles = Vec::new();

        for task in self.board.take_tasks() {
            let clock = self.board.clock().clone();
            handles.push(tokio::spawn(drive_task(task, clock, start, shutdown_tx.subscribe())));
        }
        if let (false, Some(uart)) = (self.rx_script.is_empty(), self.board.console_uart()) {
            handles.push(tokio::spawn(feed_serial(
                uart.clone(),
                std::mem::take(&mut self.rx_script),
                self.rx_interval,
                shutdown_tx.subscribe(),
            )));
        }
        tracing::info!(tasks = handles.len(), "Realtime run started");

        match limit {
            Some(limit) => tokio::time::sleep(limit).await,
            None => {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for Ctrl-C: {}", e);
                }
            }
        }
        let _ = shutdown_tx.send(());

        let mut stats = SimStats::default();
        for handle in handles {
            match handle.await {
                Ok(counters) => {
                    stats.task_polls += counters.polls;
                    stats.bytes_injected += counters.injected;
                    stats.bytes_dropped += counters.dropped;
                }
                Err(e) => tracing::error!("Realtime task failed: {}", e),
            }
        }
        stats.events_processed = stats.task_polls + stats.bytes_injected + stats.bytes_dropped;
        let elapsed = start.elapsed();
        self.board.clock().advance_to(elapsed);
        stats.sim_time_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        tracing::info!(polls = stats.task_polls, "Realtime run stopped after {:?}", elapsed);
        (stats, self.board)
    }
}

async fn drive_task(
    mut task: Box<dyn FirmwareTask>,
    clock: SimClock,
    start: Instant,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Counters {
    let mut ticker = tokio::time::interval(task.period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut counters = Counters::default();
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = ticker.tick() => {
                clock.advance_to(start.elapsed());
                tracing::trace!(task = task.name(), "poll");
                task.poll();
                counters.polls += 1;
            }
        }
    }
    counters
}

async fn feed_serial(
    uart: Arc<Mutex<Lpuart>>,
    script: Vec<u8>,
    interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Counters {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    let mut counters = Counters::default();
    let mut bytes = script.into_iter();
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = ticker.tick() => {
                let Some(byte) = bytes.next() else {
                    break;
                };
                if uart.lock().unwrap_or_else(PoisonError::into_inner).offer(byte) {
                    counters.injected += 1;
                } else {
                    counters.dropped += 1;
                }
            }
        }
    }
    counters
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_runs_tasks_until_deadline() {
        let config = SimConfig::default();
        let board = Board::boot(&config).unwrap();
        let runner = RealtimeRunner::new(board, &config);
        let (stats, board) = runner.run(Some(Duration::from_millis(120))).await;

        // Every interval fires immediately once.
        assert!(stats.task_polls >= 3);
        let out = board.console_output().to_string_lossy();
        assert!(out.contains("UART Task running...\r\n"));
        assert!(out.contains("CAN0 sent frame: 00 01 \r\n"));
        assert!(out.contains("Received CAN1 frame: ID=123 Data=00 01 \r\n"));
        assert!(board.clock().now() >= Duration::from_millis(120));
    }
}
