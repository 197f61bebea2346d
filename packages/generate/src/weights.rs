//! Distance-based point weighting.
//!
//! A point's raw weight is the sum of squared planar distances to every other
//! point in the set, so isolated points weigh more than clustered ones. Raw
//! weights are min-max normalized into a [`WeightBand`]. When every raw
//! weight is equal (all points coincide, or there is only one point) each
//! point gets the band midpoint.

use issue_map_spatial::SpatialPoint;
use serde::{Deserialize, Serialize};

/// Closed interval that normalized weights are mapped into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightBand {
    pub low: f64,
    pub high: f64,
}

impl Default for WeightBand {
    fn default() -> Self {
        Self {
            low: 0.25,
            high: 1.0,
        }
    }
}

impl WeightBand {
    #[must_use]
    pub fn midpoint(&self) -> f64 {
        f64::midpoint(self.low, self.high)
    }

    #[must_use]
    pub fn contains(&self, weight: f64) -> bool {
        (self.low..=self.high).contains(&weight)
    }

    fn scale(&self, raw: f64, min: f64, max: f64) -> f64 {
        let t = (raw - min) / (max - min);
        t.mul_add(self.high - self.low, self.low)
            .clamp(self.low, self.high)
    }
}

/// Computes one weight per point in the default band `[0.25, 1.0]`.
#[must_use]
pub fn compute_weights(points: &[SpatialPoint]) -> Vec<f64> {
    compute_weights_in(points, WeightBand::default())
}

/// Computes one weight per point, normalized into `band`.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn compute_weights_in(points: &[SpatialPoint], band: WeightBand) -> Vec<f64> {
    let raw: Vec<f64> = points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            points
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, other)| p.distance_squared_xy(other))
                .sum()
        })
        .collect();

    let min = raw.iter().copied().fold(f64::INFINITY, f64::min);
    let max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if raw.is_empty() || max == min || !(max - min).is_finite() {
        return vec![band.midpoint(); raw.len()];
    }

    raw.into_iter().map(|w| band.scale(w, min, max)).collect()
}

/// Returns the points with each weight stored in `z`.
///
/// Weighted points are what the decorator renders when weighting is enabled.
#[must_use]
pub fn apply_weights(points: &[SpatialPoint]) -> Vec<SpatialPoint> {
    let weights = compute_weights(points);
    points
        .iter()
        .zip(weights)
        .map(|(p, w)| p.with_z(w))
        .collect()
}
