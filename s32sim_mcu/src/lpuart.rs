//! Polling LPUART driver, written against the register interface only

use std::hint;

use s32sim_shared::RegisterFile;
use s32sim_shared::registers::lpuart::{self, Ctrl, Stat};

/// Firmware-side view of one LPUART.
///
/// Output is blocking: `put_byte` spins until the peripheral reports TDRE.
/// Printing before `init` has enabled the transmitter therefore never
/// returns, the same as on hardware.
pub struct LpuartDriver<R> {
    regs: R,
}

impl<R: RegisterFile> LpuartDriver<R> {
    pub fn new(regs: R) -> Self {
        Self { regs }
    }

    /// Program the baud divisor and enable transmitter and receiver.
    pub fn init(&mut self) {
        self.regs.write(lpuart::BAUD, lpuart::RESET_BAUD);
        let ctrl = self.regs.read(lpuart::CTRL);
        self.regs
            .write(lpuart::CTRL, ctrl | (Ctrl::TE | Ctrl::RE).bits());
        tracing::debug!("lpuart initialised");
    }

    pub fn status(&mut self) -> Stat {
        Stat::from_bits_truncate(self.regs.read(lpuart::STAT))
    }

    pub fn put_byte(&mut self, byte: u8) {
        while !self.status().contains(Stat::TDRE) {
            hint::spin_loop();
        }
        self.regs.write(lpuart::DATA, byte as u32);
    }

    pub fn print(&mut self, text: &str) {
        for byte in text.bytes() {
            self.put_byte(byte);
        }
    }

    /// Non-blocking read of the receive latch.
    pub fn try_read_byte(&mut self) -> Option<u8> {
        if self.status().contains(Stat::RDRF) {
            Some(self.regs.read(lpuart::DATA) as u8)
        } else {
            None
        }
    }

    pub fn registers(&mut self) -> &mut R {
        &mut self.regs
    }

    pub fn into_inner(self) -> R {
        self.regs
    }
}
