// s32sim: S32K358 peripheral simulation, facade over the workspace crates

pub use s32sim_mcu as mcu;
pub use s32sim_shared as shared;
pub use s32sim_simulator as simulator;

pub mod realtime;
pub mod run;
pub mod settings;

pub use run::{RunReport, run_simulated};
pub use settings::{SettingsError, load_settings};
