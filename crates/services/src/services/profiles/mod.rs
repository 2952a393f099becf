//! Profile Persistence Service
//!
//! Loads, caches, and persists named JSON configuration documents scoped by a
//! registered storage location. Documents merge against an optional default
//! template on load and self-heal the on-disk copy when the template evolves.

mod profile;
mod store;

pub use profile::Profile;
pub use store::{ProfileError, ProfileStore};
