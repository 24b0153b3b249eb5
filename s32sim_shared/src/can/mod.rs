//! Logical CAN bus core: frames, per-node receive rings and broadcast

pub mod bus;
pub mod frame;
pub mod node;
pub mod rx_queue;

pub use bus::{BusError, CanBus, MAX_CAN_NODES};
pub use frame::{CAN_EFF_MASK, CAN_MAX_DLC, CAN_SFF_MASK, CanFrame, FrameError};
pub use node::{CanNode, NodeId};
pub use rx_queue::{RX_BUFFER_SIZE, RxQueue};
