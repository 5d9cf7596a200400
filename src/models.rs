//! Wire and read models: provider payloads in, normalized payloads out.

pub mod playback;
pub mod token;

pub use playback::*;
pub use token::*;
