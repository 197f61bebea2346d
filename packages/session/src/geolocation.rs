//! Device location lookup.

use async_trait::async_trait;
use issue_map_issue_models::GeoCoordinate;

/// Why the device location could not be determined.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeolocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location unavailable: {message}")]
    Unavailable {
        /// Provider-specific reason.
        message: String,
    },
}

/// Source of the user's current location.
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    /// Returns the current location.
    ///
    /// # Errors
    ///
    /// Returns [`GeolocationError`] if the location cannot be determined.
    async fn current_position(&self) -> Result<GeoCoordinate, GeolocationError>;
}

/// A provider that always reports the same location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedGeolocation(pub GeoCoordinate);

#[async_trait]
impl GeolocationProvider for FixedGeolocation {
    async fn current_position(&self) -> Result<GeoCoordinate, GeolocationError> {
        Ok(self.0)
    }
}

/// A provider for hosts without location services.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeolocation;

#[async_trait]
impl GeolocationProvider for NoGeolocation {
    async fn current_position(&self) -> Result<GeoCoordinate, GeolocationError> {
        Err(GeolocationError::Unavailable {
            message: "no location services on this host".to_string(),
        })
    }
}

/// Asks `provider` for the location, falling back to `fallback` on failure
/// or on an invalid fix.
pub async fn locate_or(provider: &dyn GeolocationProvider, fallback: GeoCoordinate) -> GeoCoordinate {
    match provider.current_position().await {
        Ok(location) if location.is_valid() => location,
        Ok(location) => {
            log::warn!(
                "Geolocation returned invalid fix ({}, {}), using fallback",
                location.latitude,
                location.longitude
            );
            fallback
        }
        Err(e) => {
            log::info!("Geolocation failed ({e}), using fallback location");
            fallback
        }
    }
}
