// Integration tests for the CAN bus core: registration, fan-out and receive rings

use std::sync::{Arc, Mutex};
use std::thread;

use s32sim::shared::{BusError, CanBus, CanFrame, CanNode, NodeId, RxQueue};

fn node(id: u8) -> Arc<CanNode> {
    Arc::new(CanNode::new(NodeId(id)))
}

fn frame(id: u32, payload: &[u8]) -> CanFrame {
    CanFrame::new(id, payload).unwrap()
}

#[test]
fn test_registry_stops_at_capacity() {
    let bus = Arc::new(CanBus::new(4));
    let nodes: Vec<_> = (0..5).map(node).collect();
    for n in &nodes {
        bus.attach(n);
    }
    assert_eq!(bus.len(), 4);
    assert!(!bus.contains(&nodes[4]));
    assert_eq!(
        bus.try_attach(&nodes[4]),
        Err(BusError::Full { capacity: 4 })
    );
}

#[test]
fn test_attach_is_idempotent() {
    let bus = Arc::new(CanBus::default());
    let a = node(0);
    bus.attach(&a);
    bus.attach(&a);
    assert_eq!(bus.len(), 1);
    assert_eq!(bus.try_attach(&a), Err(BusError::AlreadyAttached(NodeId(0))));
}

#[test]
fn test_transmit_skips_sender_only() {
    let bus = Arc::new(CanBus::default());
    let nodes: Vec<_> = (0..4).map(node).collect();
    for n in &nodes {
        bus.attach(n);
    }
    let f = frame(0x42, &[9]);
    bus.transmit(&nodes[2], &f);
    for (i, n) in nodes.iter().enumerate() {
        let expected = if i == 2 { 0 } else { 1 };
        assert_eq!(n.rx().len(), expected, "node {}", i);
    }
    assert!(nodes[2].receive().is_none());
    assert_eq!(nodes[0].receive(), Some(f));
}

#[test]
fn test_two_nodes_and_sink() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let log = calls.clone();
    let bus = Arc::new(CanBus::default());
    let a = node(0);
    let b = Arc::new(CanNode::new(NodeId(1)).with_sink(Arc::new(
        move |n: &CanNode, f: &CanFrame| {
            // The frame is already queued when the sink runs.
            assert_eq!(n.rx().len(), 1);
            log.lock().unwrap().push(*f);
        },
    )));
    bus.attach(&a);
    bus.attach(&b);

    let x = frame(0x123, &[0x01, 0x02]);
    a.transmit(&x);

    assert_eq!(b.receive(), Some(x));
    assert!(b.receive().is_none());
    assert!(a.receive().is_none());
    assert_eq!(*calls.lock().unwrap(), vec![x]);
}

#[test]
fn test_each_receiver_gets_its_own_copy() {
    let bus = Arc::new(CanBus::default());
    let (a, b, c) = (node(0), node(1), node(2));
    for n in [&a, &b, &c] {
        bus.attach(n);
    }
    let x = frame(0x7FF, &[1, 2, 3, 4, 5, 6, 7, 8]);
    a.transmit(&x);

    assert_eq!(b.receive(), Some(x));
    // Draining B leaves C untouched.
    assert_eq!(c.rx().len(), 1);
    assert_eq!(c.receive(), Some(x));
}

#[test]
fn test_delivery_follows_attach_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let bus = Arc::new(CanBus::default());
    let sender = node(9);
    bus.attach(&sender);
    for id in [3u8, 1, 2] {
        let log = order.clone();
        let n = Arc::new(CanNode::new(NodeId(id)).with_sink(Arc::new(
            move |n: &CanNode, _: &CanFrame| log.lock().unwrap().push(n.id().0),
        )));
        bus.attach(&n);
    }
    sender.transmit(&frame(1, &[]));
    assert_eq!(*order.lock().unwrap(), vec![3, 1, 2]);
}

#[test]
fn test_sink_may_transmit_again() {
    let bus = Arc::new(CanBus::default());
    let a = node(0);
    let b = Arc::new(CanNode::new(NodeId(1)).with_sink(Arc::new(
        |n: &CanNode, f: &CanFrame| {
            if f.id() == 0x100 {
                n.transmit(&CanFrame::new(0x101, f.payload()).unwrap());
            }
        },
    )));
    bus.attach(&a);
    bus.attach(&b);
    a.transmit(&frame(0x100, &[7]));
    assert_eq!(a.receive().map(|f| f.id()), Some(0x101));
    assert_eq!(b.receive().map(|f| f.id()), Some(0x100));
}

#[test]
fn test_dequeue_on_empty_queue() {
    let queue = RxQueue::new();
    assert_eq!(queue.dequeue(), None);
    assert_eq!(queue.dequeue(), None);
    assert!(queue.is_empty());
}

#[test]
fn test_full_ring_overwrites_oldest() {
    let queue = RxQueue::with_capacity(16);
    let frames: Vec<_> = (0..16u32).map(|i| frame(0x100 + i, &[i as u8])).collect();
    for f in &frames {
        queue.enqueue(*f);
    }
    let drained: Vec<_> = (0..15).filter_map(|_| queue.dequeue()).collect();
    // The sixteenth write wrapped onto the read position.
    assert_ne!(drained.first(), Some(&frames[0]));
}

#[test]
fn test_concurrent_transmitters() {
    let bus = Arc::new(CanBus::default());
    let senders: Vec<_> = (0..4).map(node).collect();
    let listener = Arc::new(CanNode::with_rx_capacity(NodeId(10), 64));
    for n in &senders {
        bus.attach(n);
    }
    bus.attach(&listener);

    let handles: Vec<_> = senders
        .iter()
        .cloned()
        .map(|n| {
            thread::spawn(move || {
                for i in 0..10u8 {
                    n.transmit(&CanFrame::new(u32::from(n.id().0), &[i]).unwrap());
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let mut per_sender = [0usize; 4];
    while let Some(f) = listener.receive() {
        per_sender[f.id() as usize] += 1;
    }
    assert_eq!(per_sender, [10; 4]);
}
