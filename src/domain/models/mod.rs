//! Pure data types shared across the supervisor. No I/O lives here.

pub mod classification;
pub mod config;
pub mod diagnostic;
pub mod failure;
pub mod fix_record;
pub mod hotfix;
pub mod intervention_log;
pub mod intervention_result;
pub mod project;
pub mod propagation;
pub mod recovery;
pub mod registry;

pub use classification::{Confidence, StallClassification, StallType};
pub use config::Config;
pub use diagnostic::{BugLocation, DiagnosticResult};
pub use failure::{ErrorCategory, FailureEntry, ProjectState, Resolution};
pub use fix_record::{FixRecord, FixRecordHit, MetadataValue};
pub use hotfix::HotFixResult;
pub use intervention_log::InterventionLogEntry;
pub use intervention_result::InterventionResult;
pub use project::{CycleMetadata, Project, ProjectStatus};
pub use propagation::{PropagationOutcome, PropagationResult};
pub use recovery::{RecoveryAction, RecoveryActionType};
pub use registry::Registry;
