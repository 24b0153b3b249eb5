//! Logical broadcast bus connecting CAN nodes

use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

use super::frame::CanFrame;
use super::node::{CanNode, NodeId};

/// Node limit of the host-side bus model
pub const MAX_CAN_NODES: usize = 16;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("CAN bus node limit reached ({capacity} nodes)")]
    Full { capacity: usize },
    #[error("node {0} is already attached")]
    AlreadyAttached(NodeId),
    #[error("node {0} references a different bus")]
    ForeignNode(NodeId),
}

/// Registry of attached nodes plus the synchronous broadcast.
///
/// Delivery runs on the caller's thread. The registry lock is only held to
/// take a snapshot, so sinks may transmit again from inside a delivery.
#[derive(Debug)]
pub struct CanBus {
    nodes: RwLock<Vec<Arc<CanNode>>>,
    capacity: usize,
}

impl CanBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: RwLock::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    /// Register `node`, reporting why it was refused.
    ///
    /// The node's bus reference is claimed while the registry is locked, so
    /// a node racing onto two buses lands on exactly one of them.
    pub fn try_attach(self: &Arc<Self>, node: &Arc<CanNode>) -> Result<(), BusError> {
        {
            let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
            if nodes.iter().any(|n| Arc::ptr_eq(n, node)) {
                return Err(BusError::AlreadyAttached(node.id()));
            }
            if nodes.len() >= self.capacity {
                return Err(BusError::Full {
                    capacity: self.capacity,
                });
            }
            if !node.set_bus(self) {
                return Err(BusError::ForeignNode(node.id()));
            }
            nodes.push(node.clone());
        }
        tracing::debug!(node = %node.id(), "attached to CAN bus");
        Ok(())
    }

    /// Register `node` for future broadcasts.
    ///
    /// Refusals are reported on the diagnostic channel only.
    pub fn attach(self: &Arc<Self>, node: &Arc<CanNode>) {
        match self.try_attach(node) {
            Ok(()) => {}
            Err(e @ BusError::AlreadyAttached(_)) => tracing::debug!("{}", e),
            Err(e) => tracing::warn!("{}", e),
        }
    }

    /// Deliver a copy of `frame` to every attached node except `sender`,
    /// in attachment order. Each receiver's sink runs after its enqueue.
    pub fn transmit(&self, sender: &CanNode, frame: &CanFrame) {
        let endpoints = self.nodes();
        for node in endpoints
            .iter()
            .filter(|node| !std::ptr::eq(node.as_ref(), sender))
        {
            node.rx().enqueue(*frame);
            tracing::debug!(from = %sender.id(), to = %node.id(), %frame, "frame delivered");
            if let Some(sink) = node.sink() {
                sink.deliver(node, frame);
            }
        }
    }

    /// Snapshot of the attached nodes in delivery order.
    pub fn nodes(&self) -> Vec<Arc<CanNode>> {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn contains(&self, node: &CanNode) -> bool {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|n| std::ptr::eq(n.as_ref(), node))
    }

    pub fn len(&self) -> usize {
        self.nodes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for CanBus {
    fn default() -> Self {
        Self::new(MAX_CAN_NODES)
    }
}
