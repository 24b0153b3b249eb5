//! Shared configuration logic for the simulator, firmware tasks and tests.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [bus]
//! capacity = 16
//! rx_queue_size = 16
//!
//! [flexcan]
//! count = 2
//!
//! [lpuart]
//! count = 8
//! console = 0
//!
//! [simulation]
//! duration_ms = 5000
//! output_dir = "./sim_output"
//! rx_script = "hi"
//!
//! [tasks]
//! can_tx_id = 0x123
//! ```
//!
//! Every section and key is optional; missing values take the board defaults.
//! Files are read through `s32sim::load_settings`, which also layers the
//! environment and calls [`SimConfig::validate`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::can::CAN_EFF_MASK;

/// Number of LPUART instances on the SoC
pub const NUM_LPUART: usize = 8;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration struct for the bus, peripherals, firmware tasks and run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SimConfig {
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub flexcan: FlexCanConfig,
    #[serde(default)]
    pub lpuart: LpuartConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub tasks: TaskConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BusConfig {
    #[serde(default = "default_bus_capacity")]
    pub capacity: usize,
    #[serde(default = "default_rx_queue_size")]
    pub rx_queue_size: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            capacity: default_bus_capacity(),
            rx_queue_size: default_rx_queue_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FlexCanConfig {
    #[serde(default = "default_flexcan_count")]
    pub count: usize,
}

impl Default for FlexCanConfig {
    fn default() -> Self {
        Self {
            count: default_flexcan_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LpuartConfig {
    #[serde(default = "default_lpuart_count")]
    pub count: usize,
    /// Instance the firmware console prints to
    #[serde(default)]
    pub console: usize,
}

impl Default for LpuartConfig {
    fn default() -> Self {
        Self {
            count: default_lpuart_count(),
            console: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimulationConfig {
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Bytes fed into the console receiver, one every `rx_interval_ms`
    #[serde(default)]
    pub rx_script: String,
    #[serde(default = "default_rx_interval_ms")]
    pub rx_interval_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_duration_ms(),
            output_dir: default_output_dir(),
            rx_script: String::new(),
            rx_interval_ms: default_rx_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TaskConfig {
    #[serde(default = "default_uart_period_ms")]
    pub uart_period_ms: u64,
    #[serde(default = "default_can_tx_period_ms")]
    pub can_tx_period_ms: u64,
    #[serde(default = "default_can_rx_period_ms")]
    pub can_rx_period_ms: u64,
    #[serde(default = "default_can_tx_id")]
    pub can_tx_id: u32,
    /// FlexCAN instance the sender task transmits from
    #[serde(default)]
    pub can_tx_node: usize,
    /// FlexCAN instance the receiver task drains
    #[serde(default = "default_can_rx_node")]
    pub can_rx_node: usize,
    /// Echo console input back to the console output
    #[serde(default)]
    pub serial_echo: bool,
    #[serde(default = "default_echo_period_ms")]
    pub echo_period_ms: u64,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            uart_period_ms: default_uart_period_ms(),
            can_tx_period_ms: default_can_tx_period_ms(),
            can_rx_period_ms: default_can_rx_period_ms(),
            can_tx_id: default_can_tx_id(),
            can_tx_node: 0,
            can_rx_node: default_can_rx_node(),
            serial_echo: false,
            echo_period_ms: default_echo_period_ms(),
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));
        if self.bus.capacity == 0 {
            return invalid("bus.capacity must be > 0".to_string());
        }
        if self.bus.rx_queue_size < 2 {
            return invalid("bus.rx_queue_size must be at least 2".to_string());
        }
        if self.flexcan.count == 0 || self.flexcan.count > self.bus.capacity {
            return invalid(format!(
                "flexcan.count must be between 1 and bus.capacity ({})",
                self.bus.capacity
            ));
        }
        if self.flexcan.count > u8::MAX as usize + 1 {
            return invalid("flexcan.count must fit in a node id".to_string());
        }
        if self.lpuart.count == 0 || self.lpuart.count > NUM_LPUART {
            return invalid(format!("lpuart.count must be between 1 and {}", NUM_LPUART));
        }
        if self.lpuart.console >= self.lpuart.count {
            return invalid(format!(
                "lpuart.console {} is not below lpuart.count {}",
                self.lpuart.console, self.lpuart.count
            ));
        }
        for (name, node) in [
            ("tasks.can_tx_node", self.tasks.can_tx_node),
            ("tasks.can_rx_node", self.tasks.can_rx_node),
        ] {
            if node >= self.flexcan.count {
                return invalid(format!("{} {} is not below flexcan.count", name, node));
            }
        }
        for (name, period) in [
            ("tasks.uart_period_ms", self.tasks.uart_period_ms),
            ("tasks.can_tx_period_ms", self.tasks.can_tx_period_ms),
            ("tasks.can_rx_period_ms", self.tasks.can_rx_period_ms),
            ("tasks.echo_period_ms", self.tasks.echo_period_ms),
            ("simulation.rx_interval_ms", self.simulation.rx_interval_ms),
        ] {
            if period == 0 {
                return invalid(format!("{} must be > 0", name));
            }
        }
        if self.tasks.can_tx_id > CAN_EFF_MASK {
            return invalid(format!(
                "tasks.can_tx_id 0x{:X} does not fit in 29 bits",
                self.tasks.can_tx_id
            ));
        }
        Ok(())
    }
}

fn default_bus_capacity() -> usize { crate::can::MAX_CAN_NODES }
fn default_rx_queue_size() -> usize { crate::can::RX_BUFFER_SIZE }
fn default_flexcan_count() -> usize { 2 }
fn default_lpuart_count() -> usize { NUM_LPUART }
fn default_duration_ms() -> u64 { 5000 }
fn default_output_dir() -> String { "./sim_output".to_string() }
fn default_rx_interval_ms() -> u64 { 50 }
fn default_uart_period_ms() -> u64 { 500 }
fn default_can_tx_period_ms() -> u64 { 1000 }
fn default_can_rx_period_ms() -> u64 { 200 }
fn default_can_tx_id() -> u32 { 0x123 }
fn default_can_rx_node() -> usize { 1 }
fn default_echo_period_ms() -> u64 { 20 }
