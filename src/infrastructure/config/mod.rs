pub mod loader;

pub use loader::{expand_tilde, ConfigLoader};
