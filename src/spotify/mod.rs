//! Spotify accounts and Web API access.
//!
//! [`SpotifyClient`] performs the three outbound calls (token grant,
//! currently-playing, recently-played); [`now_playing`] chains them into the
//! aggregator; [`StateSigner`] protects the authorization-code callback.

pub mod client;
pub mod error;
pub mod now_playing;
pub mod oauth_state;

pub use client::{CurrentlyPlayingResponse, SpotifyClient};
pub use error::{Endpoint, SpotifyError};
pub use now_playing::{now_playing, PlaybackSource};
pub use oauth_state::{StateError, StateSigner};
