pub mod event_queue;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crossbeam_channel::Receiver;
use serde::Serialize;
use thiserror::Error;

use s32sim_mcu::{CanReceiver, CanSender, Console, ConsoleFrameSink, FirmwareTask, SerialEcho, UartHeartbeat};
use s32sim_shared::board_config::{LPUART_BASE_ADDR, LPUART_STRIDE};
use s32sim_shared::config::{ConfigError, SimConfig};
use s32sim_shared::{FrameError, FrameSink, SinkSet};

use crate::peripherals::lpuart::Lpuart;
use crate::peripherals::sinks::SharedBuffer;
use crate::simulator::event_queue::{SimClock, SimEventQueue, SimEventType};
use crate::soc::{S32k358Soc, SocConfig};
use crate::trace::{BusEvent, TraceError, TraceTap};

#[derive(Debug, Error)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
    #[error("Trace error: {0}")]
    Trace(#[from] TraceError),
    #[error("Missing peripheral: {0}")]
    MissingPeripheral(String),
}

/// The SoC with the demo firmware loaded on it.
pub struct Board {
    soc: Arc<S32k358Soc>,
    console: Arc<Console>,
    console_index: usize,
    console_output: SharedBuffer,
    tasks: Vec<Box<dyn FirmwareTask>>,
    clock: SimClock,
    trace_rx: Receiver<BusEvent>,
}

impl Board {
    /// Build the SoC, bring up the console and create the firmware tasks.
    pub fn boot(config: &SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        let soc = Arc::new(S32k358Soc::new(&SocConfig::from(config)));
        let clock = SimClock::new();
        let (tap, trace_rx) = TraceTap::channel(clock.clone());
        let tap: Arc<dyn FrameSink> = Arc::new(tap);

        let console_index = config.lpuart.console;
        let console_output = soc
            .uart_output(console_index)
            .cloned()
            .ok_or_else(|| missing("lpuart", console_index))?;
        let console_base = LPUART_BASE_ADDR + console_index as u32 * LPUART_STRIDE;
        let console = Arc::new(Console::new(Box::new(soc.window(console_base))));
        console.init();

        let tx_node = soc
            .can_node(config.tasks.can_tx_node)
            .ok_or_else(|| missing("flexcan", config.tasks.can_tx_node))?;
        let rx_node = soc
            .can_node(config.tasks.can_rx_node)
            .ok_or_else(|| missing("flexcan", config.tasks.can_rx_node))?;

        for index in 0..soc.flexcan_count() {
            let Some(node) = soc.can_node(index) else {
                continue;
            };
            let mut sinks = vec![tap.clone()];
            if Arc::ptr_eq(&node, &rx_node) {
                sinks.push(Arc::new(ConsoleFrameSink::new(console.clone())));
            }
            node.set_sink(Arc::new(SinkSet(sinks)));
        }

        let t = &config.tasks;
        let mut tasks: Vec<Box<dyn FirmwareTask>> = Vec::with_capacity(4);
        tasks.push(Box::new(UartHeartbeat::new(console.clone(), ms(t.uart_period_ms))));
        tasks.push(Box::new(CanSender::new(
            tx_node,
            console.clone(),
            t.can_tx_id,
            ms(t.can_tx_period_ms),
        )?));
        tasks.push(Box::new(CanReceiver::new(rx_node, console.clone(), ms(t.can_rx_period_ms))));
        if t.serial_echo {
            tasks.push(Box::new(SerialEcho::new(console.clone(), ms(t.echo_period_ms))));
        }

        tracing::info!(
            tasks = tasks.len(),
            console = console_index,
            "Board booted"
        );
        Ok(Self {
            soc,
            console,
            console_index,
            console_output,
            tasks,
            clock,
            trace_rx,
        })
    }

    pub fn soc(&self) -> &Arc<S32k358Soc> {
        &self.soc
    }

    pub fn console(&self) -> &Arc<Console> {
        &self.console
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Everything the firmware printed on its console.
    pub fn console_output(&self) -> &SharedBuffer {
        &self.console_output
    }

    pub fn console_uart(&self) -> Option<&Arc<Mutex<Lpuart>>> {
        self.soc.lpuart(self.console_index)
    }

    pub fn trace_events(&self) -> &Receiver<BusEvent> {
        &self.trace_rx
    }

    pub fn tasks(&self) -> &[Box<dyn FirmwareTask>] {
        &self.tasks
    }

    /// Hand the firmware tasks to another scheduler.
    pub fn take_tasks(&mut self) -> Vec<Box<dyn FirmwareTask>> {
        std::mem::take(&mut self.tasks)
    }

    /// Offer one byte to the console receiver. Returns `false` if it was
    /// dropped: the previous byte is still unread, or the receiver is off.
    pub fn inject_byte(&self, byte: u8) -> bool {
        match self.console_uart() {
            Some(uart) => uart.lock().unwrap_or_else(PoisonError::into_inner).offer(byte),
            None => false,
        }
    }
}

fn missing(kind: &str, index: usize) -> SimError {
    SimError::MissingPeripheral(format!("{}{}", kind, index))
}

fn ms(period: u64) -> Duration {
    Duration::from_millis(period)
}

/// Counters of one simulation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimStats {
    pub events_processed: u64,
    pub task_polls: u64,
    pub bytes_injected: u64,
    pub bytes_dropped: u64,
    pub sim_time_ms: u64,
}

/// Discrete-event scheduler running the board's tasks in simulated time.
pub struct Simulator {
    board: Board,
    queue: SimEventQueue,
    rx_pending: VecDeque<u8>,
    rx_interval: Duration,
    rx_scheduled: bool,
    stats: SimStats,
}

impl Simulator {
    /// Every task is first polled at time zero, then once per period.
    pub fn new(board: Board, config: &SimConfig) -> Self {
        let mut queue = SimEventQueue::new();
        for index in 0..board.tasks.len() {
            queue.push(board.clock.now(), SimEventType::TaskWake(index));
        }
        tracing::info!("Simulator initialized at time: {:?}", board.clock.now());
        let mut sim = Self {
            board,
            queue,
            rx_pending: VecDeque::new(),
            rx_interval: ms(config.simulation.rx_interval_ms),
            rx_scheduled: false,
            stats: SimStats::default(),
        };
        sim.inject_serial(config.simulation.rx_script.as_bytes());
        sim
    }

    /// Queue bytes for the console receiver, one every `rx_interval`.
    pub fn inject_serial(&mut self, bytes: &[u8]) {
        self.rx_pending.extend(bytes);
        if !self.rx_scheduled && !self.rx_pending.is_empty() {
            let at = self.board.clock.now() + self.rx_interval;
            self.queue.push(at, SimEventType::SerialRx);
            self.rx_scheduled = true;
        }
    }

    /// Process every event due at or before `limit`, then leave the clock at
    /// `limit`. Can be called again to continue the run.
    pub fn run_until(&mut self, limit: Duration) -> SimStats {
        while let Some(at) = self.queue.peek_time() {
            if at > limit {
                break;
            }
            let Some(event) = self.queue.pop() else {
                break;
            };
            self.board.clock.advance_to(event.timestamp);
            self.stats.events_processed += 1;
            match event.event_type {
                SimEventType::TaskWake(index) => self.wake_task(index, event.timestamp),
                SimEventType::SerialRx => self.deliver_serial(event.timestamp),
            }
        }
        self.board.clock.advance_to(limit);
        self.stats.sim_time_ms = u64::try_from(self.board.clock.now().as_millis()).unwrap_or(u64::MAX);
        tracing::debug!(stats = ?self.stats, "run_until {:?} done", limit);
        self.stats.clone()
    }

    fn wake_task(&mut self, index: usize, now: Duration) {
        let Some(task) = self.board.tasks.get_mut(index) else {
            tracing::warn!(index, "wake-up for unknown task");
            return;
        };
        tracing::trace!(task = task.name(), "poll at {:?}", now);
        task.poll();
        self.stats.task_polls += 1;
        let next = now + task.period();
        self.queue.push(next, SimEventType::TaskWake(index));
    }

    fn deliver_serial(&mut self, now: Duration) {
        self.rx_scheduled = false;
        if let Some(byte) = self.rx_pending.pop_front() {
            if self.board.inject_byte(byte) {
                self.stats.bytes_injected += 1;
            } else {
                self.stats.bytes_dropped += 1;
            }
        }
        if !self.rx_pending.is_empty() {
            self.queue.push(now + self.rx_interval, SimEventType::SerialRx);
            self.rx_scheduled = true;
        }
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn now(&self) -> Duration {
        self.board.clock.now()
    }

    pub fn into_board(self) -> Board {
        self.board
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SimConfig {
        SimConfig::default()
    }

    #[test]
    fn test_boot_prints_nothing_before_first_poll() {
        let board = Board::boot(&config()).unwrap();
        assert_eq!(board.tasks().len(), 3);
        assert!(board.console_output().is_empty());
        assert_eq!(board.soc().bus().len(), 2);
    }

    #[test]
    fn test_console_output_is_the_console_uart() {
        let mut config = config();
        config.lpuart.console = 3;
        let board = Board::boot(&config).unwrap();
        board.console().print("x");
        assert_eq!(board.console_output().to_string_lossy(), "x");
        assert_eq!(board.soc().uart_output(3).unwrap().contents(), b"x");
        assert!(board.soc().uart_output(0).unwrap().is_empty());
    }

    #[test]
    fn test_boot_rejects_invalid_config() {
        let mut config = config();
        config.tasks.can_rx_node = 5;
        assert!(matches!(Board::boot(&config), Err(SimError::Config(_))));
    }

    #[test]
    fn test_first_second_of_firmware() {
        let board = Board::boot(&config()).unwrap();
        let mut sim = Simulator::new(board, &config());
        let stats = sim.run_until(Duration::from_millis(999));

        // uart at 0, 500; can_tx at 0; can_rx at 0, 200, 400, 600, 800
        assert_eq!(stats.task_polls, 8);
        assert_eq!(stats.events_processed, 8);
        assert_eq!(stats.sim_time_ms, 999);

        let out = sim.board().console_output().to_string_lossy();
        assert_eq!(out.matches("UART Task running...\r\n").count(), 2);
        assert_eq!(out.matches("CAN0 sent frame: 00 01 \r\n").count(), 1);
        assert!(out.contains("Received CAN1 frame: ID=123 Data=00 01 \r\n"));
        assert!(out.contains("CAN1 Task: frame received count=1\r\n"));

        let events: Vec<_> = sim.board().trace_events().try_iter().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].node, 1);
        assert_eq!(events[0].time_us, 0);
    }

    #[test]
    fn test_run_until_is_resumable() {
        let board = Board::boot(&config()).unwrap();
        let mut sim = Simulator::new(board, &config());
        sim.run_until(Duration::from_millis(500));
        let stats = sim.run_until(Duration::from_millis(2000));
        // uart 0..=2000 step 500: 5, can_tx 0, 1000, 2000: 3, can_rx 0..=2000 step 200: 11
        assert_eq!(stats.task_polls, 19);
        assert_eq!(sim.now(), Duration::from_millis(2000));
    }

    #[test]
    fn test_serial_script_with_echo() {
        let mut config = config();
        config.tasks.serial_echo = true;
        config.simulation.rx_script = "hi".to_string();
        let board = Board::boot(&config).unwrap();
        let mut sim = Simulator::new(board, &config);
        let stats = sim.run_until(Duration::from_millis(200));
        assert_eq!(stats.bytes_injected, 2);
        assert_eq!(stats.bytes_dropped, 0);
        let out = sim.board().console_output().to_string_lossy();
        assert!(out.ends_with("hi"));
    }

    #[test]
    fn test_unread_serial_bytes_are_dropped() {
        let mut config = config();
        config.simulation.rx_script = "abc".to_string();
        let board = Board::boot(&config).unwrap();
        let mut sim = Simulator::new(board, &config);
        let stats = sim.run_until(Duration::from_millis(1000));
        assert_eq!(stats.bytes_injected, 1);
        assert_eq!(stats.bytes_dropped, 2);
        assert!(sim.board().soc().lpuart_irq(0).unwrap().is_raised());
    }
}
