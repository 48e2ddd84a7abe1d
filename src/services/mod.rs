//! Pure and stateful business logic, independent of how it is invoked
//! (daemon loop or one-shot CLI command).

pub mod classifier;
pub mod interventor;
pub mod monitor;
pub mod propagator;
pub mod recovery_planner;

pub use interventor::Interventor;
pub use monitor::{CycleReport, Monitor};
pub use propagator::Propagator;
