//! Bus endpoint: identity, receive ring and optional delivery sink

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};

use super::bus::CanBus;
use super::frame::CanFrame;
use super::rx_queue::RxQueue;
use crate::hardware_traits::FrameSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u8);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "can{}", self.0)
    }
}

/// A CAN controller as seen by the bus.
///
/// The node is created on its own; giving it a bus reference and attaching
/// it to that bus are separate steps done by whoever composes the system.
/// The sink can be set at most once. The bus reference is set once per live
/// bus: after that bus is dropped the node may be given another one.
pub struct CanNode {
    id: NodeId,
    bus: Mutex<Weak<CanBus>>,
    rx: RxQueue,
    sink: OnceLock<Arc<dyn FrameSink>>,
}

impl CanNode {
    pub fn new(id: NodeId) -> Self {
        Self::with_rx_capacity(id, super::rx_queue::RX_BUFFER_SIZE)
    }

    pub fn with_rx_capacity(id: NodeId, capacity: usize) -> Self {
        Self {
            id,
            bus: Mutex::new(Weak::new()),
            rx: RxQueue::with_capacity(capacity),
            sink: OnceLock::new(),
        }
    }

    /// Install the delivery sink while building the node.
    pub fn with_sink(self, sink: Arc<dyn FrameSink>) -> Self {
        // A freshly built node has no sink yet.
        let _ = self.sink.set(sink);
        self
    }

    /// Install the delivery sink later. Returns `false` if one was already set.
    pub fn set_sink(&self, sink: Arc<dyn FrameSink>) -> bool {
        let installed = self.sink.set(sink).is_ok();
        if !installed {
            tracing::warn!(node = %self.id, "frame sink already installed; keeping the first one");
        }
        installed
    }

    pub fn sink(&self) -> Option<&Arc<dyn FrameSink>> {
        self.sink.get()
    }

    /// Point this node at `bus` without attaching it.
    ///
    /// Returns `true` if the node now references `bus`, and `false` if it
    /// already references another live bus.
    pub fn set_bus(&self, bus: &Arc<CanBus>) -> bool {
        let mut current = self.bus.lock().unwrap_or_else(PoisonError::into_inner);
        if current.strong_count() > 0 {
            return std::ptr::eq(current.as_ptr(), Arc::as_ptr(bus));
        }
        *current = Arc::downgrade(bus);
        true
    }

    /// The bus this node references, if it is still alive.
    pub fn bus(&self) -> Option<Arc<CanBus>> {
        self.bus
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .upgrade()
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn rx(&self) -> &RxQueue {
        &self.rx
    }

    /// Pop the oldest received frame.
    pub fn receive(&self) -> Option<CanFrame> {
        self.rx.dequeue()
    }

    /// Broadcast `frame` on the referenced bus. Dropped with a diagnostic if
    /// the node has no live bus.
    pub fn transmit(&self, frame: &CanFrame) {
        match self.bus() {
            Some(bus) => bus.transmit(self, frame),
            None => tracing::warn!(node = %self.id, %frame, "node has no bus; frame dropped"),
        }
    }
}

impl fmt::Debug for CanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanNode")
            .field("id", &self.id)
            .field("has_bus", &self.bus().is_some())
            .field("pending", &self.rx.len())
            .field("has_sink", &self.sink.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_sink_is_set_once() {
        let node = CanNode::new(NodeId(0));
        assert!(node.sink().is_none());
        assert!(node.set_sink(Arc::new(|_: &CanNode, _: &CanFrame| {})));
        assert!(!node.set_sink(Arc::new(|_: &CanNode, _: &CanFrame| {})));
        assert!(node.sink().is_some());
    }

    #[test]
    fn test_bus_reference_is_set_once() {
        let first = Arc::new(CanBus::default());
        let second = Arc::new(CanBus::default());
        let node = CanNode::new(NodeId(1));
        assert!(node.bus().is_none());
        assert!(node.set_bus(&first));
        assert!(node.set_bus(&first));
        assert!(!node.set_bus(&second));
        assert!(Arc::ptr_eq(&node.bus().unwrap(), &first));
    }

    #[test]
    fn test_node_of_dropped_bus_can_move() {
        let node = CanNode::new(NodeId(3));
        let first = Arc::new(CanBus::default());
        assert!(node.set_bus(&first));
        drop(first);
        assert!(node.bus().is_none());

        let second = Arc::new(CanBus::default());
        assert!(node.set_bus(&second));
        assert!(Arc::ptr_eq(&node.bus().unwrap(), &second));
    }

    #[test]
    fn test_transmit_without_bus_is_dropped() {
        let node = CanNode::new(NodeId(2));
        node.transmit(&CanFrame::new(1, &[]).unwrap());
        assert!(node.rx().is_empty());
    }

    #[test]
    fn test_builder_sink_receives_deliveries() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let bus = Arc::new(CanBus::default());
        let a = Arc::new(CanNode::new(NodeId(0)));
        let b = Arc::new(CanNode::new(NodeId(1)).with_sink(Arc::new(
            move |node: &CanNode, frame: &CanFrame| {
                log.lock().unwrap().push((node.id(), *frame));
            },
        )));
        bus.attach(&a);
        bus.attach(&b);

        let frame = CanFrame::new(0x42, &[9]).unwrap();
        a.transmit(&frame);
        assert_eq!(*seen.lock().unwrap(), vec![(NodeId(1), frame)]);
        assert_eq!(b.receive(), Some(frame));
    }
}
