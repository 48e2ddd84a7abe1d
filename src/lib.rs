//! piv-supervisor — a multi-project development supervisor.
//!
//! Watches a fleet of autonomous orchestrator processes, each driving an
//! AI-assisted build inside its own project directory, and intervenes when
//! one stalls: classify the stall, plan a recovery action, and either
//! restart the orchestrator, drive an AI diagnosis-and-fix session, or
//! escalate to a human operator.

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;
