//! Periodic firmware tasks of the demo application

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use s32sim_shared::{CanFrame, CanNode, FrameError};

use crate::console::Console;

/// A periodic unit of firmware work. The scheduler calls `poll` once per
/// `period`; `poll` must not block beyond the peripheral locks it takes.
pub trait FirmwareTask: Send {
    fn name(&self) -> &str;
    fn period(&self) -> Duration;
    fn poll(&mut self);
}

/// Prints a liveness line on every tick.
pub struct UartHeartbeat {
    console: Arc<Console>,
    period: Duration,
}

impl UartHeartbeat {
    pub fn new(console: Arc<Console>, period: Duration) -> Self {
        Self { console, period }
    }
}

impl FirmwareTask for UartHeartbeat {
    fn name(&self) -> &str {
        "uart"
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn poll(&mut self) {
        self.console.print("UART Task running...\r\n");
    }
}

/// Broadcasts a two-byte counter frame on every tick.
pub struct CanSender {
    node: Arc<CanNode>,
    console: Arc<Console>,
    id: u32,
    counter: u8,
    sent: u64,
    period: Duration,
}

impl CanSender {
    pub fn new(
        node: Arc<CanNode>,
        console: Arc<Console>,
        id: u32,
        period: Duration,
    ) -> Result<Self, FrameError> {
        // Reject an unusable identifier up front instead of on every tick.
        CanFrame::new(id, &[])?;
        Ok(Self {
            node,
            console,
            id,
            counter: 0,
            sent: 0,
            period,
        })
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    fn next_payload(&mut self) -> [u8; 2] {
        let payload = [self.counter, self.counter.wrapping_add(1)];
        self.counter = self.counter.wrapping_add(2);
        payload
    }
}

impl FirmwareTask for CanSender {
    fn name(&self) -> &str {
        "can_tx"
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn poll(&mut self) {
        let payload = self.next_payload();
        let frame = match CanFrame::new(self.id, &payload) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!("can_tx: {}", e);
                return;
            }
        };

        let mut line = format!("CAN{} sent frame: ", self.node.id().0);
        for byte in frame.payload() {
            let _ = write!(line, "{:02X} ", byte);
        }
        line.push_str("\r\n");
        self.console.print(&line);

        self.node.transmit(&frame);
        self.sent += 1;
    }
}

/// Drains at most one frame per tick and reports the running count.
pub struct CanReceiver {
    node: Arc<CanNode>,
    console: Arc<Console>,
    received: u64,
    period: Duration,
}

impl CanReceiver {
    pub fn new(node: Arc<CanNode>, console: Arc<Console>, period: Duration) -> Self {
        Self {
            node,
            console,
            received: 0,
            period,
        }
    }

    pub fn received(&self) -> u64 {
        self.received
    }
}

impl FirmwareTask for CanReceiver {
    fn name(&self) -> &str {
        "can_rx"
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn poll(&mut self) {
        if let Some(frame) = self.node.receive() {
            self.received += 1;
            tracing::debug!(node = %self.node.id(), %frame, "frame drained");
            self.console.print(&format!(
                "CAN{} Task: frame received count={}\r\n",
                self.node.id().0,
                self.received
            ));
        }
    }
}

/// Echoes bytes arriving on the console receiver back to its transmitter.
pub struct SerialEcho {
    console: Arc<Console>,
    period: Duration,
}

impl SerialEcho {
    pub fn new(console: Arc<Console>, period: Duration) -> Self {
        Self { console, period }
    }
}

impl FirmwareTask for SerialEcho {
    fn name(&self) -> &str {
        "echo"
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn poll(&mut self) {
        if let Some(byte) = self.console.try_read_byte() {
            self.console.put_byte(byte);
        }
    }
}
