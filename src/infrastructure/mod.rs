//! Infrastructure layer: adapters between the domain/services and the
//! outside world (YAML files, subprocesses, HTTP, tracing).

pub mod ai_driver;
pub mod config;
pub mod framework_version;
pub mod intervention_log;
pub mod logging;
pub mod memory;
pub mod process;
pub mod project_state;
pub mod registry_store;
pub mod telegram;
pub mod validation;
