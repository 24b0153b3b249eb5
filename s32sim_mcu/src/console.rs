//! Console shared by firmware tasks

use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use s32sim_shared::{CanFrame, CanNode, FrameSink, RegisterFile};

use crate::lpuart::LpuartDriver;

/// A lock-guarded LPUART driver.
///
/// `print` holds the lock for a whole string so concurrent tasks never
/// interleave characters.
pub struct Console {
    driver: Mutex<LpuartDriver<Box<dyn RegisterFile>>>,
}

impl Console {
    pub fn new(regs: Box<dyn RegisterFile>) -> Self {
        Self {
            driver: Mutex::new(LpuartDriver::new(regs)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LpuartDriver<Box<dyn RegisterFile>>> {
        self.driver.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn init(&self) {
        self.lock().init();
    }

    pub fn print(&self, text: &str) {
        self.lock().print(text);
    }

    pub fn put_byte(&self, byte: u8) {
        self.lock().put_byte(byte);
    }

    pub fn try_read_byte(&self) -> Option<u8> {
        self.lock().try_read_byte()
    }
}

/// Prints every frame delivered to a node, e.g.
/// `Received CAN1 frame: ID=123 Data=01 02 `.
pub struct ConsoleFrameSink {
    console: Arc<Console>,
}

impl ConsoleFrameSink {
    pub fn new(console: Arc<Console>) -> Self {
        Self { console }
    }
}

impl FrameSink for ConsoleFrameSink {
    fn deliver(&self, node: &CanNode, frame: &CanFrame) {
        let mut line = format!("Received CAN{} frame: ID={:03X} Data=", node.id().0, frame.id());
        for byte in frame.payload() {
            let _ = write!(line, "{:02X} ", byte);
        }
        line.push_str("\r\n");
        self.console.print(&line);
    }
}
