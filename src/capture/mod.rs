/// Capture pipeline
///
/// This module handles one shutter press end to end:
/// - Grabbing and encoding a still from the feed (frame.rs)
/// - Asking for the current position (geo.rs)
/// - Running the capture state machine (controller.rs)

pub mod frame;
pub mod geo;
pub mod controller;

use thiserror::Error;

use crate::state::store::StoreError;
use frame::FrameError;
use geo::GeolocationError;

pub use controller::{CaptureController, CaptureOutcome, CapturePhase, CaptureSettings};

/// Everything that can abort a capture. In every case nothing was persisted
/// and the buffer and gallery are unchanged.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CaptureError {
    #[error("validation failed: {0}")]
    ValidationFailed(String),
    #[error("a capture is already in progress")]
    Busy,
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("geolocation failed: {reason}")]
    GeolocationFailed { reason: GeolocationError },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<GeolocationError> for CaptureError {
    fn from(reason: GeolocationError) -> Self {
        CaptureError::GeolocationFailed { reason }
    }
}
