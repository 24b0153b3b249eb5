//! LPUART register model
//!
//! Only the registers the polling driver touches are modelled. Transmission
//! is instantaneous: a DATA write goes straight to the output sink and TDRE
//! stays asserted.

use std::fmt;
use std::sync::Arc;

use s32sim_shared::registers::lpuart::{self, Ctrl, RESET_BAUD, Stat};
use s32sim_shared::{ByteSink, IrqLine, RegisterFile};

pub struct Lpuart {
    name: String,
    baud: u32,
    stat: Stat,
    ctrl: u32,
    data: u32,
    irq: Arc<dyn IrqLine>,
    output: Box<dyn ByteSink>,
}

impl Lpuart {
    pub fn new(name: impl Into<String>, irq: Arc<dyn IrqLine>, output: Box<dyn ByteSink>) -> Self {
        Self {
            name: name.into(),
            baud: RESET_BAUD,
            stat: Stat::empty(),
            ctrl: 0,
            data: 0,
            irq,
            output,
        }
    }

    /// Restore the reset values of every register and drop the IRQ level.
    pub fn reset(&mut self) {
        self.baud = RESET_BAUD;
        self.stat = Stat::empty();
        self.ctrl = 0;
        self.data = 0;
        self.irq.lower();
        tracing::debug!(uart = %self.name, "reset");
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn ctrl_flags(&self) -> Ctrl {
        Ctrl::from_bits_truncate(self.ctrl)
    }

    pub fn status(&self) -> Stat {
        self.stat
    }

    /// Whether an input source may hand over the next byte.
    pub fn can_receive(&self) -> bool {
        !self.stat.contains(Stat::RDRF)
    }

    /// Latch a byte arriving on the line. Returns `false` if the receiver is
    /// disabled and the byte was dropped.
    ///
    /// A byte arriving before the previous one was read replaces it.
    pub fn receive(&mut self, byte: u8) -> bool {
        if !self.ctrl_flags().contains(Ctrl::RE) {
            tracing::warn!(uart = %self.name, byte, "receiver disabled; byte dropped");
            return false;
        }
        if self.stat.contains(Stat::RDRF) {
            tracing::debug!(uart = %self.name, old = self.data, new = byte, "receive latch overrun");
        }
        self.data = byte as u32;
        self.stat.insert(Stat::RDRF);
        self.irq.raise();
        true
    }

    /// Hand over a byte from a flow-controlled source. The byte is refused
    /// while the previous one is unread.
    pub fn offer(&mut self, byte: u8) -> bool {
        if !self.can_receive() {
            tracing::debug!(uart = %self.name, byte, "receiver full; byte dropped");
            return false;
        }
        self.receive(byte)
    }
}

impl RegisterFile for Lpuart {
    fn read(&mut self, offset: u32) -> u32 {
        let value = match offset {
            lpuart::BAUD => self.baud,
            lpuart::STAT => self.stat.bits(),
            lpuart::CTRL => self.ctrl,
            lpuart::DATA => {
                self.stat.remove(Stat::RDRF);
                self.irq.lower();
                self.data
            }
            _ => {
                tracing::warn!(uart = %self.name, "read of unknown offset 0x{:X}", offset);
                return 0;
            }
        };
        tracing::trace!(uart = %self.name, "read 0x{:02X} -> 0x{:08X}", offset, value);
        value
    }

    fn write(&mut self, offset: u32, value: u32) {
        tracing::trace!(uart = %self.name, "write 0x{:02X} <- 0x{:08X}", offset, value);
        match offset {
            lpuart::BAUD => self.baud = value,
            lpuart::STAT => {
                tracing::warn!(uart = %self.name, value, "STAT is read-only; write ignored");
            }
            lpuart::CTRL => {
                self.ctrl = value;
                if self.ctrl_flags().contains(Ctrl::TE) {
                    self.stat.insert(Stat::TDRE);
                }
            }
            lpuart::DATA => {
                if !self.ctrl_flags().contains(Ctrl::TE) {
                    tracing::warn!(uart = %self.name, value, "transmitter disabled; byte dropped");
                    return;
                }
                self.output.write_byte(value as u8);
                self.stat.insert(Stat::TDRE);
            }
            _ => tracing::warn!(uart = %self.name, "write of unknown offset 0x{:X}", offset),
        }
    }
}

impl fmt::Debug for Lpuart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lpuart")
            .field("name", &self.name)
            .field("baud", &format_args!("0x{:X}", self.baud))
            .field("stat", &self.stat)
            .field("ctrl", &format_args!("0x{:08X}", self.ctrl))
            .field("data", &self.data)
            .finish()
    }
}
