//! Peripheral register models

pub mod flexcan;
pub mod irq;
pub mod lpuart;
pub mod sinks;

pub use flexcan::FlexCan;
pub use irq::IrqSignal;
pub use lpuart::Lpuart;
pub use sinks::SharedBuffer;
