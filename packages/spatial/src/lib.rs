#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Model-space geometry for the issue heatmap.
//!
//! Issue reports carry geographic coordinates; everything downstream of
//! projection works in the host's model space. This crate provides the
//! [`SpatialPoint`] and [`Range2d`] types, the bounds calculator used to frame
//! the heatmap surface, and the [`projection::Projector`] seam through which
//! geographic coordinates reach model space.

pub mod projection;

use geo::{BoundingRect, MultiPoint};
use serde::{Deserialize, Serialize};

pub use projection::{EquirectangularProjector, ProjectionError, Projector};

/// Errors from range construction and padding.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RangeError {
    /// A numeric argument was outside its allowed domain.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the rejected value.
        message: String,
    },

    /// Bounds were requested for an empty point set.
    #[error("Cannot compute bounds of an empty point set")]
    EmptyRange,
}

/// A point in model (rendering) space.
///
/// `z` is a height for raw projected points; after weighting it carries the
/// point's normalized weight.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpatialPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl SpatialPoint {
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// A point on the `z = 0` plane.
    #[must_use]
    pub const fn xy(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Squared planar distance to `other`, ignoring `z`.
    #[must_use]
    pub fn distance_squared_xy(&self, other: &Self) -> f64 {
        (self.x - other.x).powi(2) + (self.y - other.y).powi(2)
    }

    /// Returns this point with `z` replaced.
    #[must_use]
    pub const fn with_z(self, z: f64) -> Self {
        Self { z, ..self }
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Axis-aligned rectangle in model space.
///
/// The null range (see [`Range2d::null`]) contains nothing and is what bounds
/// of an empty point set evaluate to. Any non-null range satisfies
/// `min_x <= max_x` and `min_y <= max_y`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range2d {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Default for Range2d {
    fn default() -> Self {
        Self::null()
    }
}

impl Range2d {
    /// Creates a range from two opposite corners in any order.
    #[must_use]
    pub fn from_xyxy(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            min_x: x0.min(x1),
            min_y: y0.min(y1),
            max_x: x0.max(x1),
            max_y: y0.max(y1),
        }
    }

    /// The empty range.
    #[must_use]
    pub const fn null() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        !(self.min_x <= self.max_x && self.min_y <= self.max_y)
            || !self.min_x.is_finite()
            || !self.max_x.is_finite()
            || !self.min_y.is_finite()
            || !self.max_y.is_finite()
    }

    /// Whether the range is null or has zero area.
    ///
    /// A degenerate range cannot frame a heatmap surface on its own.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.is_null() || self.width() <= 0.0 || self.height() <= 0.0
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        if self.is_null() {
            0.0
        } else {
            self.max_x - self.min_x
        }
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        if self.is_null() {
            0.0
        } else {
            self.max_y - self.min_y
        }
    }

    #[must_use]
    pub fn center(&self) -> Option<SpatialPoint> {
        if self.is_null() {
            return None;
        }
        Some(SpatialPoint::xy(
            f64::midpoint(self.min_x, self.max_x),
            f64::midpoint(self.min_y, self.max_y),
        ))
    }

    #[must_use]
    pub fn contains_point(&self, point: &SpatialPoint) -> bool {
        !self.is_null()
            && (self.min_x..=self.max_x).contains(&point.x)
            && (self.min_y..=self.max_y).contains(&point.y)
    }

    /// Whether `other` lies entirely inside this range. The null range is
    /// contained in every range.
    #[must_use]
    pub fn contains_range(&self, other: &Self) -> bool {
        if other.is_null() {
            return true;
        }
        !self.is_null()
            && self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }

    /// Grows the range by `fraction` of its width and height on each side.
    ///
    /// Expanding a null range yields the null range.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError::InvalidArgument`] if `fraction` is negative or
    /// not finite.
    pub fn expand(&self, fraction: f64) -> Result<Self, RangeError> {
        if !fraction.is_finite() || fraction < 0.0 {
            return Err(RangeError::InvalidArgument {
                message: format!("expand fraction must be a non-negative number, got {fraction}"),
            });
        }
        if self.is_null() {
            return Ok(*self);
        }

        let dx = self.width() * fraction;
        let dy = self.height() * fraction;

        Ok(Self {
            min_x: self.min_x - dx,
            min_y: self.min_y - dy,
            max_x: self.max_x + dx,
            max_y: self.max_y + dy,
        })
    }

    /// Widens each zero-length axis by `pad` on both sides.
    ///
    /// Non-degenerate axes are left untouched. The null range stays null.
    #[must_use]
    pub fn pad_degenerate_axes(&self, pad: f64) -> Self {
        if self.is_null() {
            return *self;
        }
        let mut out = *self;
        if out.width() <= 0.0 {
            out.min_x -= pad;
            out.max_x += pad;
        }
        if out.height() <= 0.0 {
            out.min_y -= pad;
            out.max_y += pad;
        }
        out
    }
}

/// Computes the planar bounding box of `points`.
///
/// Returns [`Range2d::null`] for an empty set; never panics. Non-finite
/// points are ignored.
#[must_use]
pub fn compute_bounds(points: &[SpatialPoint]) -> Range2d {
    let multi: MultiPoint<f64> = points
        .iter()
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .map(|p| (p.x, p.y))
        .collect::<Vec<_>>()
        .into();

    multi.bounding_rect().map_or_else(Range2d::null, |rect| {
        Range2d::from_xyxy(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    })
}

/// Like [`compute_bounds`], but surfaces the empty case as an error.
///
/// # Errors
///
/// Returns [`RangeError::EmptyRange`] if `points` has no finite point.
pub fn try_compute_bounds(points: &[SpatialPoint]) -> Result<Range2d, RangeError> {
    let range = compute_bounds(points);
    if range.is_null() {
        return Err(RangeError::EmptyRange);
    }
    Ok(range)
}

/// Bounds of `points`, padded by `fraction` so edge points are not clipped at
/// the surface boundary.
///
/// # Errors
///
/// Returns [`RangeError::EmptyRange`] for an empty set or
/// [`RangeError::InvalidArgument`] for a negative fraction.
pub fn framed_bounds(points: &[SpatialPoint], fraction: f64) -> Result<Range2d, RangeError> {
    let range = try_compute_bounds(points)?.expand(fraction)?;
    log::debug!(
        "Framed {} points in [{:.3}, {:.3}]..[{:.3}, {:.3}]",
        points.len(),
        range.min_x,
        range.min_y,
        range.max_x,
        range.max_y
    );
    Ok(range)
}
