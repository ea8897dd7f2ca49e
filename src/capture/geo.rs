use std::future::Future;
use thiserror::Error;

use crate::state::data::Location;

/// Why a position request failed. Codes follow the usual geolocation API.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum GeolocationError {
    #[error("unknown geolocation error")]
    Unknown,
    #[error("permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    PositionUnavailable,
    #[error("position request timed out")]
    Timeout,
}

impl GeolocationError {
    pub fn code(self) -> u8 {
        match self {
            GeolocationError::Unknown => 0,
            GeolocationError::PermissionDenied => 1,
            GeolocationError::PositionUnavailable => 2,
            GeolocationError::Timeout => 3,
        }
    }

    /// Unrecognised codes map to `Unknown`
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => GeolocationError::PermissionDenied,
            2 => GeolocationError::PositionUnavailable,
            3 => GeolocationError::Timeout,
            _ => GeolocationError::Unknown,
        }
    }
}

/// Source of the device's current position
pub trait Geolocator: Send + Sync + 'static {
    fn current_position(&self) -> impl Future<Output = Result<Location, GeolocationError>> + Send;
}

/// Reports a configured position, or `PositionUnavailable` when there is none
#[derive(Debug, Clone, Default)]
pub struct FixedGeolocator {
    location: Option<Location>,
}

impl FixedGeolocator {
    pub fn new(location: Option<Location>) -> Self {
        Self { location }
    }
}

impl Geolocator for FixedGeolocator {
    async fn current_position(&self) -> Result<Location, GeolocationError> {
        self.location.ok_or(GeolocationError::PositionUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        for code in 0..=3 {
            assert_eq!(GeolocationError::from_code(code).code(), code);
        }
        assert_eq!(GeolocationError::from_code(42), GeolocationError::Unknown);
    }

    #[tokio::test]
    async fn test_fixed_geolocator() {
        let here = Location::new(-22.9068, -43.1729);
        assert_eq!(FixedGeolocator::new(Some(here)).current_position().await, Ok(here));
        assert_eq!(
            FixedGeolocator::default().current_position().await,
            Err(GeolocationError::PositionUnavailable)
        );
    }
}
