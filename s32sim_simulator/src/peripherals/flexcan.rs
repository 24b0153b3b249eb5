//! FlexCAN controller model: scratch registers plus a bus node

use std::sync::Arc;

use s32sim_shared::registers::flexcan;
use s32sim_shared::{CanNode, RegisterFile};

/// Register-level front of a [`CanNode`].
///
/// MCR, CTRL, TFR and RFR hold whatever was written to them. Traffic flows
/// through [`FlexCan::node`], the same core the firmware tasks use.
#[derive(Debug)]
pub struct FlexCan {
    node: Arc<CanNode>,
    mcr: u32,
    ctrl: u32,
    tfr: u32,
    rfr: u32,
    realized: bool,
}

impl FlexCan {
    pub fn new(node: Arc<CanNode>) -> Self {
        Self {
            node,
            mcr: 0,
            ctrl: 0,
            tfr: 0,
            rfr: 0,
            realized: false,
        }
    }

    /// Attach the node to the bus it references. Only the first call has an
    /// effect.
    pub fn realize(&mut self) {
        if self.realized {
            return;
        }
        self.realized = true;
        match self.node.bus() {
            Some(bus) => {
                bus.attach(&self.node);
                tracing::info!(node = %self.node.id(), "FlexCAN realized");
            }
            None => {
                tracing::warn!(node = %self.node.id(), "FlexCAN realized without a bus; node stays detached")
            }
        }
    }

    pub fn is_realized(&self) -> bool {
        self.realized
    }

    pub fn node(&self) -> &Arc<CanNode> {
        &self.node
    }

    fn register(&mut self, offset: u32) -> Option<&mut u32> {
        match offset {
            flexcan::MCR => Some(&mut self.mcr),
            flexcan::CTRL => Some(&mut self.ctrl),
            flexcan::TFR => Some(&mut self.tfr),
            flexcan::RFR => Some(&mut self.rfr),
            _ => None,
        }
    }
}

impl RegisterFile for FlexCan {
    fn read(&mut self, offset: u32) -> u32 {
        let node = self.node.id();
        match self.register(offset) {
            Some(reg) => {
                tracing::trace!(%node, "read 0x{:02X} -> 0x{:08X}", offset, *reg);
                *reg
            }
            None => {
                tracing::warn!(%node, "read of unknown offset 0x{:X}", offset);
                0
            }
        }
    }

    fn write(&mut self, offset: u32, value: u32) {
        let node = self.node.id();
        match self.register(offset) {
            Some(reg) => {
                tracing::trace!(%node, "write 0x{:02X} <- 0x{:08X}", offset, value);
                *reg = value;
            }
            None => tracing::warn!(%node, "write of unknown offset 0x{:X}", offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use s32sim_shared::{CanBus, CanFrame, NodeId};

    fn controller(bus: &Arc<CanBus>, id: u8) -> FlexCan {
        let node = Arc::new(CanNode::new(NodeId(id)));
        node.set_bus(bus);
        FlexCan::new(node)
    }

    #[test]
    fn test_scratch_registers() {
        let bus = Arc::new(CanBus::default());
        let mut can = controller(&bus, 0);
        for (offset, value) in [(0x00, 0x5000_000F), (0x04, 0x1), (0x08, 0xAA), (0x0C, 0x55)] {
            can.write(offset, value);
            assert_eq!(can.read(offset), value);
        }
        can.write(0x10, 7);
        assert_eq!(can.read(0x10), 0);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_realize_attaches_once() {
        let bus = Arc::new(CanBus::default());
        let mut can = controller(&bus, 0);
        assert!(!bus.contains(can.node()));
        can.realize();
        can.realize();
        assert!(can.is_realized());
        assert_eq!(bus.len(), 1);
        assert!(bus.contains(can.node()));
    }

    #[test]
    fn test_realize_without_bus() {
        let mut can = FlexCan::new(Arc::new(CanNode::new(NodeId(3))));
        can.realize();
        assert!(can.is_realized());
        assert!(can.node().bus().is_none());
    }

    #[test]
    fn test_traffic_through_realized_nodes() {
        let bus = Arc::new(CanBus::default());
        let mut a = controller(&bus, 0);
        let mut b = controller(&bus, 1);
        a.realize();
        b.realize();
        let frame = CanFrame::new(0x123, &[1, 2]).unwrap();
        a.node().transmit(&frame);
        assert_eq!(b.node().receive(), Some(frame));
        assert_eq!(a.node().receive(), None);
    }
}
