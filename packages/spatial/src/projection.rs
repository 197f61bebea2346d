//! Geographic to model-space projection.
//!
//! The viewport host owns the real transform; the heatmap only sees it
//! through the [`Projector`] trait. [`EquirectangularProjector`] is a local
//! tangent-plane approximation used when no host transform is available
//! (command-line rendering, tests).

use async_trait::async_trait;
use issue_map_issue_models::GeoCoordinate;

use crate::SpatialPoint;

/// Mean Earth radius in metres.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Errors from projecting a single coordinate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProjectionError {
    /// The coordinate is not a valid WGS84 position.
    #[error("Coordinate out of domain: lat={latitude}, lon={longitude}")]
    OutOfDomain {
        /// Rejected latitude.
        latitude: f64,
        /// Rejected longitude.
        longitude: f64,
    },

    /// The host transform could not produce a model-space point.
    #[error("Projection unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },
}

/// Converts geographic coordinates into the host's model space.
///
/// Projection may suspend (the host resolves it asynchronously), so the
/// trait is async.
#[async_trait]
pub trait Projector: Send + Sync {
    /// Projects one coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] if the coordinate cannot be projected.
    async fn project(&self, coordinate: GeoCoordinate) -> Result<SpatialPoint, ProjectionError>;
}

/// Projects onto a plane tangent at `origin`: `x` metres east, `y` metres
/// north, `z` metres above the origin height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquirectangularProjector {
    origin: GeoCoordinate,
}

impl EquirectangularProjector {
    #[must_use]
    pub const fn new(origin: GeoCoordinate) -> Self {
        Self { origin }
    }

    #[must_use]
    pub const fn origin(&self) -> GeoCoordinate {
        self.origin
    }

    /// Synchronous form of [`Projector::project`].
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::OutOfDomain`] for invalid coordinates.
    pub fn project_sync(&self, coordinate: GeoCoordinate) -> Result<SpatialPoint, ProjectionError> {
        if !coordinate.is_valid() {
            return Err(ProjectionError::OutOfDomain {
                latitude: coordinate.latitude,
                longitude: coordinate.longitude,
            });
        }

        let lat0 = self.origin.latitude.to_radians();
        let dlon = (coordinate.longitude - self.origin.longitude).to_radians();
        let dlat = (coordinate.latitude - self.origin.latitude).to_radians();

        Ok(SpatialPoint::new(
            EARTH_RADIUS_M * dlon * lat0.cos(),
            EARTH_RADIUS_M * dlat,
            coordinate.height - self.origin.height,
        ))
    }
}

#[async_trait]
impl Projector for EquirectangularProjector {
    async fn project(&self, coordinate: GeoCoordinate) -> Result<SpatialPoint, ProjectionError> {
        self.project_sync(coordinate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn origin_projects_to_zero() {
        let origin = GeoCoordinate::new(6.0, 50.0, 0.0);
        let projector = EquirectangularProjector::new(origin);
        let p = projector.project(origin).await.unwrap();
        assert!(p.x.abs() < 1e-9 && p.y.abs() < 1e-9 && p.z.abs() < 1e-9);
    }

    #[test]
    fn north_and_east_are_positive() {
        let projector = EquirectangularProjector::new(GeoCoordinate::new(6.0, 50.0, 0.0));
        let p = projector
            .project_sync(GeoCoordinate::new(6.1, 50.1, 1.0))
            .unwrap();
        assert!(p.x > 0.0);
        assert!(p.y > 0.0);
        // ~0.1 degree of latitude is ~11.1 km
        assert!((p.y - 11_119.5).abs() < 5.0, "{}", p.y);
        assert!((p.z - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_coordinates_are_rejected() {
        let projector = EquirectangularProjector::new(GeoCoordinate::new(0.0, 0.0, 0.0));
        assert!(matches!(
            projector.project_sync(GeoCoordinate::new(0.0, 91.0, 0.0)),
            Err(ProjectionError::OutOfDomain { .. })
        ));
        assert!(projector
            .project_sync(GeoCoordinate::new(f64::INFINITY, 0.0, 0.0))
            .is_err());
    }
}
