// s32sim_shared: bus core, peripheral traits and configuration shared by simulator and firmware

pub mod board_config;
pub mod can;
pub mod config;
pub mod hardware_traits;
pub mod registers;

pub use can::{BusError, CanBus, CanFrame, CanNode, FrameError, NodeId, RxQueue};
pub use hardware_traits::{ByteSink, FrameSink, IrqLine, RegisterFile, SinkSet};
