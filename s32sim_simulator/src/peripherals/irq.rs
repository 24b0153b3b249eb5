//! Interrupt request line seen by the simulated NVIC

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use s32sim_shared::IrqLine;

/// Level-sensitive IRQ input. Records the current level and how many times
/// it went from low to high.
#[derive(Debug)]
pub struct IrqSignal {
    line: u32,
    level: AtomicBool,
    rising_edges: AtomicU64,
}

impl IrqSignal {
    pub fn new(line: u32) -> Self {
        Self {
            line,
            level: AtomicBool::new(false),
            rising_edges: AtomicU64::new(0),
        }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn is_raised(&self) -> bool {
        self.level.load(Ordering::Acquire)
    }

    pub fn rising_edges(&self) -> u64 {
        self.rising_edges.load(Ordering::Acquire)
    }
}

impl IrqLine for IrqSignal {
    fn set_level(&self, level: bool) {
        let previous = self.level.swap(level, Ordering::AcqRel);
        if level && !previous {
            self.rising_edges.fetch_add(1, Ordering::AcqRel);
            tracing::trace!(irq = self.line, "irq raised");
        } else if !level && previous {
            tracing::trace!(irq = self.line, "irq lowered");
        }
    }
}
