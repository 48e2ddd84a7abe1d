pub mod logger;
pub mod rotation;
pub mod secret_scrubbing;

pub use logger::LoggerGuard;
pub use rotation::LogRotator;
pub use secret_scrubbing::SecretScrubber;

// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};
