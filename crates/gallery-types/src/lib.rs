//! Wire types shared by the gallery server and its clients.
//!
//! Everything here serializes with camelCase keys, matching what the
//! browser client expects.

pub mod api;
pub mod models;
pub mod spotify;
