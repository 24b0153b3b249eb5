//! Memory map and interrupt wiring of the S32K3X8EVB board

use std::fmt;

pub const SYSCLK_HZ: u32 = 48_000_000;

pub const LPUART_BASE_ADDR: u32 = 0x4032_8000;
pub const LPUART_STRIDE: u32 = 0x4000;
pub const LPUART0_IRQ: u32 = 141;

pub const FLEXCAN_BASE_ADDR: u32 = 0x4002_4000;
pub const FLEXCAN_STRIDE: u32 = 0x1000;
pub const FLEXCAN0_IRQ: u32 = 87;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeripheralKind {
    Lpuart,
    FlexCan,
}

/// One memory-mapped peripheral window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub name: String,
    pub kind: PeripheralKind,
    /// Instance number within its kind
    pub index: usize,
    pub base: u32,
    pub size: u32,
    pub irq: Option<u32>,
}

impl Region {
    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.base && addr - self.base < self.size
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<10} 0x{:08X}-0x{:08X}",
            self.name,
            self.base,
            self.base + self.size - 1
        )?;
        if let Some(irq) = self.irq {
            write!(f, " irq {}", irq)?;
        }
        Ok(())
    }
}

/// Represents the board the peripherals are mapped on
#[derive(Debug, Clone)]
pub struct BoardConfig {
    pub name: String,
    pub sysclk_hz: u32,
    pub regions: Vec<Region>,
}

impl BoardConfig {
    /// Layout of the evaluation board with `lpuarts` serial ports and
    /// `flexcans` CAN controllers.
    pub fn s32k3x8evb(lpuarts: usize, flexcans: usize) -> Self {
        let mut regions = Vec::with_capacity(lpuarts + flexcans);
        for i in 0..flexcans {
            regions.push(Region {
                name: format!("flexcan{}", i),
                kind: PeripheralKind::FlexCan,
                index: i,
                base: FLEXCAN_BASE_ADDR + i as u32 * FLEXCAN_STRIDE,
                size: FLEXCAN_STRIDE,
                // Only the first controller has its line routed.
                irq: (i == 0).then_some(FLEXCAN0_IRQ),
            });
        }
        for i in 0..lpuarts {
            regions.push(Region {
                name: format!("lpuart{}", i),
                kind: PeripheralKind::Lpuart,
                index: i,
                base: LPUART_BASE_ADDR + i as u32 * LPUART_STRIDE,
                size: LPUART_STRIDE,
                irq: Some(LPUART0_IRQ + i as u32),
            });
        }
        Self {
            name: "S32K3X8EVB-Q289".to_string(),
            sysclk_hz: SYSCLK_HZ,
            regions,
        }
    }

    /// Region decoding `addr`, with the offset into it.
    pub fn decode(&self, addr: u32) -> Option<(&Region, u32)> {
        self.regions
            .iter()
            .find(|r| r.contains(addr))
            .map(|r| (r, addr - r.base))
    }
}
