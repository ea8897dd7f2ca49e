//! Geotagging camera core.
//!
//! A shutter press grabs a frame, tags it with the current position, stores
//! it in a local SQLite database and refreshes the gallery of recent photos.

pub mod capture;
pub mod config;
pub mod gallery;
pub mod logging;
pub mod state;
