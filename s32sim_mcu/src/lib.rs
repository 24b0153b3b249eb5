// s32sim_mcu: firmware-side drivers and tasks, written against the register
// and bus interfaces so they run unchanged on the simulated board.

pub mod console;
pub mod lpuart;
pub mod tasks;

pub use console::{Console, ConsoleFrameSink};
pub use lpuart::LpuartDriver;
pub use tasks::{CanReceiver, CanSender, FirmwareTask, SerialEcho, UartHeartbeat};
