// SoC composition: FlexCAN realize, node traffic through the controllers and the MMIO map

use std::sync::Arc;

use s32sim::shared::board_config::{FLEXCAN_BASE_ADDR, FLEXCAN_STRIDE, LPUART_BASE_ADDR, PeripheralKind};
use s32sim::shared::registers::flexcan;
use s32sim::shared::{CanBus, CanFrame, CanNode, NodeId, RegisterFile};
use s32sim::simulator::{FlexCan, S32k358Soc, SocConfig};

#[test]
fn test_realize_registers_exactly_once() {
    let bus = Arc::new(CanBus::new(2));
    let node = Arc::new(CanNode::new(NodeId(0)));
    assert!(node.set_bus(&bus));
    let mut can = FlexCan::new(node);
    can.realize();
    can.realize();
    assert_eq!(bus.len(), 1);
}

#[test]
fn test_scratch_registers_have_no_side_effects() {
    let bus = Arc::new(CanBus::default());
    let node = Arc::new(CanNode::new(NodeId(0)));
    node.set_bus(&bus);
    let mut can = FlexCan::new(node);
    can.realize();
    can.write(flexcan::TFR, 0xFFFF_FFFF);
    can.write(flexcan::MCR, 0x1);
    assert_eq!(can.read(flexcan::TFR), 0xFFFF_FFFF);
    assert_eq!(can.read(flexcan::MCR), 0x1);
    assert!(can.node().rx().is_empty());
}

#[test]
fn test_soc_with_three_controllers() {
    let soc = S32k358Soc::new(&SocConfig {
        flexcans: 3,
        lpuarts: 1,
        bus_capacity: 3,
        rx_queue_size: 16,
    });
    assert_eq!(soc.bus().len(), 3);
    let nodes: Vec<_> = (0..3).map(|i| soc.can_node(i).unwrap()).collect();
    let x = CanFrame::new(0x123, &[1, 2]).unwrap();
    nodes[0].transmit(&x);
    assert_eq!(nodes[1].receive(), Some(x));
    assert_eq!(nodes[2].receive(), Some(x));
    assert_eq!(nodes[0].receive(), None);
}

#[test]
fn test_controllers_beyond_bus_capacity_stay_detached() {
    let soc = S32k358Soc::new(&SocConfig {
        flexcans: 3,
        lpuarts: 1,
        bus_capacity: 2,
        rx_queue_size: 16,
    });
    assert_eq!(soc.bus().len(), 2);
    let late = soc.can_node(2).unwrap();
    assert!(!soc.bus().contains(&late));
    soc.can_node(0).unwrap().transmit(&CanFrame::new(1, &[]).unwrap());
    assert!(late.rx().is_empty());
}

#[test]
fn test_memory_map() {
    let soc = S32k358Soc::new(&SocConfig::default());
    let map = soc.memory_map();
    let can1 = map.iter().find(|r| r.name == "flexcan1").unwrap();
    assert_eq!(can1.base, FLEXCAN_BASE_ADDR + FLEXCAN_STRIDE);
    assert_eq!(can1.irq, None);
    let uart0 = map.iter().find(|r| r.name == "lpuart0").unwrap();
    assert_eq!(uart0.kind, PeripheralKind::Lpuart);
    assert_eq!(uart0.base, LPUART_BASE_ADDR);
    assert_eq!(uart0.irq, Some(141));
    assert_eq!(uart0.to_string(), "lpuart0    0x40328000-0x4032BFFF irq 141");
}

#[test]
fn test_mmio_scratch_roundtrip() {
    let soc = S32k358Soc::new(&SocConfig::default());
    soc.mmio_write(FLEXCAN_BASE_ADDR + flexcan::RFR, 0x1234, 4);
    assert_eq!(soc.mmio_read(FLEXCAN_BASE_ADDR + flexcan::RFR, 4), 0x1234);
    // Byte accesses are not decoded.
    assert_eq!(soc.mmio_read(FLEXCAN_BASE_ADDR + flexcan::RFR, 1), 0);
}
