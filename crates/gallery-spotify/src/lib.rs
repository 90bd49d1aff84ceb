//! Spotify integration: one process-wide OAuth grant, refreshed lazily,
//! and a handful of read-only Web API calls.

pub mod client;
pub mod error;
pub mod tokens;
mod wire;

pub use client::{SpotifyClient, SpotifyConfig};
pub use error::SpotifyError;
pub use tokens::{TokenSet, TokenStore};
