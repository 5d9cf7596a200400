// This module re-exports important pieces for convenience,
// so we can "use crate::config::*" easily.
pub mod logging;
pub mod secret;
pub mod spotify;
pub mod types;

pub use logging::*;
pub use secret::*;
pub use spotify::*;
pub use types::*;
