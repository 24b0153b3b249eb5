//! S32K358 SoC: peripheral instances, bus wiring and the MMIO address map

use std::sync::{Arc, Mutex, PoisonError};

use s32sim_shared::board_config::{BoardConfig, PeripheralKind, Region};
use s32sim_shared::config::SimConfig;
use s32sim_shared::{CanBus, CanNode, NodeId, RegisterFile};

use crate::peripherals::flexcan::FlexCan;
use crate::peripherals::irq::IrqSignal;
use crate::peripherals::lpuart::Lpuart;
use crate::peripherals::sinks::SharedBuffer;

/// Instance counts and bus sizing of one SoC build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocConfig {
    pub flexcans: usize,
    pub lpuarts: usize,
    pub bus_capacity: usize,
    pub rx_queue_size: usize,
}

impl Default for SocConfig {
    fn default() -> Self {
        Self::from(&SimConfig::default())
    }
}

impl From<&SimConfig> for SocConfig {
    fn from(config: &SimConfig) -> Self {
        Self {
            flexcans: config.flexcan.count,
            lpuarts: config.lpuart.count,
            bus_capacity: config.bus.capacity,
            rx_queue_size: config.bus.rx_queue_size,
        }
    }
}

pub struct S32k358Soc {
    board: BoardConfig,
    bus: Arc<CanBus>,
    flexcans: Vec<Arc<Mutex<FlexCan>>>,
    lpuarts: Vec<Arc<Mutex<Lpuart>>>,
    lpuart_irqs: Vec<Arc<IrqSignal>>,
    outputs: Vec<SharedBuffer>,
}

impl S32k358Soc {
    pub fn new(config: &SocConfig) -> Self {
        let board = BoardConfig::s32k3x8evb(config.lpuarts, config.flexcans);
        let bus = Arc::new(CanBus::new(config.bus_capacity));

        let mut flexcans = Vec::with_capacity(config.flexcans);
        for i in 0..config.flexcans {
            let id = NodeId(u8::try_from(i).unwrap_or(u8::MAX));
            let node = Arc::new(CanNode::with_rx_capacity(id, config.rx_queue_size));
            node.set_bus(&bus);
            let mut can = FlexCan::new(node);
            can.realize();
            flexcans.push(Arc::new(Mutex::new(can)));
        }

        let mut lpuarts = Vec::with_capacity(config.lpuarts);
        let mut lpuart_irqs = Vec::with_capacity(config.lpuarts);
        let mut outputs = Vec::with_capacity(config.lpuarts);
        for region in board.regions.iter().filter(|r| r.kind == PeripheralKind::Lpuart) {
            let irq = Arc::new(IrqSignal::new(region.irq.unwrap_or_default()));
            let output = SharedBuffer::new();
            let uart = Lpuart::new(region.name.clone(), irq.clone(), Box::new(output.clone()));
            lpuarts.push(Arc::new(Mutex::new(uart)));
            lpuart_irqs.push(irq);
            outputs.push(output);
        }

        tracing::info!(
            board = %board.name,
            flexcans = flexcans.len(),
            lpuarts = lpuarts.len(),
            "SoC created"
        );
        Self {
            board,
            bus,
            flexcans,
            lpuarts,
            lpuart_irqs,
            outputs,
        }
    }

    pub fn board(&self) -> &BoardConfig {
        &self.board
    }

    pub fn memory_map(&self) -> &[Region] {
        &self.board.regions
    }

    pub fn bus(&self) -> &Arc<CanBus> {
        &self.bus
    }

    pub fn flexcan(&self, index: usize) -> Option<&Arc<Mutex<FlexCan>>> {
        self.flexcans.get(index)
    }

    /// Bus node behind FlexCAN `index`.
    pub fn can_node(&self, index: usize) -> Option<Arc<CanNode>> {
        self.flexcan(index).map(|can| {
            can.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .node()
                .clone()
        })
    }

    pub fn flexcan_count(&self) -> usize {
        self.flexcans.len()
    }

    pub fn lpuart(&self, index: usize) -> Option<&Arc<Mutex<Lpuart>>> {
        self.lpuarts.get(index)
    }

    pub fn lpuart_irq(&self, index: usize) -> Option<&Arc<IrqSignal>> {
        self.lpuart_irqs.get(index)
    }

    /// Everything LPUART `index` has transmitted.
    pub fn uart_output(&self, index: usize) -> Option<&SharedBuffer> {
        self.outputs.get(index)
    }

    pub fn lpuart_count(&self) -> usize {
        self.lpuarts.len()
    }

    fn peripheral(&self, region: &Region) -> Option<Box<dyn RegisterFile>> {
        match region.kind {
            PeripheralKind::Lpuart => self
                .lpuarts
                .get(region.index)
                .map(|p| Box::new(p.clone()) as Box<dyn RegisterFile>),
            PeripheralKind::FlexCan => self
                .flexcans
                .get(region.index)
                .map(|p| Box::new(p.clone()) as Box<dyn RegisterFile>),
        }
    }

    fn decode(&self, addr: u32, size: u32) -> Option<(Box<dyn RegisterFile>, u32)> {
        if size != 4 {
            tracing::warn!("unsupported {}-byte access at 0x{:08X}", size, addr);
            return None;
        }
        match self.board.decode(addr) {
            Some((region, offset)) => self.peripheral(region).map(|p| (p, offset)),
            None => {
                tracing::warn!("access to unmapped address 0x{:08X}", addr);
                None
            }
        }
    }

    /// Bus read of `size` bytes at `addr`. Only word accesses reach a
    /// peripheral; anything else reads 0.
    pub fn mmio_read(&self, addr: u32, size: u32) -> u32 {
        match self.decode(addr, size) {
            Some((mut regs, offset)) => regs.read(offset),
            None => 0,
        }
    }

    pub fn mmio_write(&self, addr: u32, value: u32, size: u32) {
        if let Some((mut regs, offset)) = self.decode(addr, size) {
            regs.write(offset, value);
        }
    }

    /// Register file view of the peripheral window starting at `base`, going
    /// through the address decoder on every access.
    pub fn window(self: &Arc<Self>, base: u32) -> MmioWindow {
        MmioWindow {
            soc: self.clone(),
            base,
        }
    }
}

/// A peripheral as the firmware sees it: absolute addresses through the SoC
/// address map.
#[derive(Clone)]
pub struct MmioWindow {
    soc: Arc<S32k358Soc>,
    base: u32,
}

impl MmioWindow {
    pub fn base(&self) -> u32 {
        self.base
    }
}

impl RegisterFile for MmioWindow {
    fn read(&mut self, offset: u32) -> u32 {
        self.soc.mmio_read(self.base.wrapping_add(offset), 4)
    }

    fn write(&mut self, offset: u32, value: u32) {
        self.soc.mmio_write(self.base.wrapping_add(offset), value, 4)
    }
}
