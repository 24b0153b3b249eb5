// s32sim_simulator: host-side register models of the S32K358 peripherals and the simulation loop

pub mod peripherals;
pub mod simulator;
pub mod soc;
pub mod trace;

pub use peripherals::{FlexCan, IrqSignal, Lpuart, SharedBuffer};
pub use simulator::event_queue::{SimClock, SimEvent, SimEventQueue, SimEventType};
pub use simulator::{Board, SimError, SimStats, Simulator};
pub use soc::{MmioWindow, S32k358Soc, SocConfig};
pub use trace::{BusEvent, TraceError, TraceTap, TraceWriter};
