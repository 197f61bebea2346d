#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Point generation and density weighting for the issue heatmap.
//!
//! Two families of generators feed the heatmap decorator:
//!
//! 1. **Shape generators** ([`shapes`]) place `count` points inside a
//!    [`Range2d`] following a pattern (circle, cross, grid, seeded random).
//!    They are synchronous and never fail: a null or zero-area range yields
//!    no points.
//! 2. **Source-derived generation** ([`source`]) produces one point per issue
//!    report by projecting its coordinate into model space. Records that fail
//!    to project are dropped so a single bad coordinate never aborts a batch.
//!
//! [`weights`] turns a generated point set into per-point intensities and is
//! an optional step between generation and decoration.

pub mod shapes;
pub mod source;
pub mod weights;

use issue_map_spatial::{Range2d, SpatialPoint};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use shapes::{CirclePointGenerator, CrossPointGenerator, GridPointGenerator, RandomPointGenerator};
pub use source::{IntensityMarker, SourceDerivedGenerator, replicate_by_intensity};
pub use weights::{WeightBand, apply_weights, compute_weights};

/// Produces points confined to a model-space range.
pub trait PointGenerator: Send + Sync {
    /// Generates up to `count` points inside `range`.
    ///
    /// Returns an empty sequence when `count` is zero or `range` is null or
    /// has zero area.
    fn generate(&self, count: usize, range: &Range2d) -> Vec<SpatialPoint>;
}

/// Which generator a heatmap mode uses.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GeneratorKind {
    /// One point per issue report.
    #[default]
    SourceDerived,
    /// Points evenly spaced on the inscribed circle.
    Circle,
    /// Points along the horizontal and vertical center lines.
    Cross,
    /// Points at the centers of a near-square grid.
    Grid,
    /// Uniformly random points.
    Random,
}

impl GeneratorKind {
    /// Builds the shape generator for this kind.
    ///
    /// Returns `None` for [`GeneratorKind::SourceDerived`], which needs issue
    /// records and a projector instead of a count and a range. `seed` only
    /// affects [`GeneratorKind::Random`]; without one a fresh seed is drawn.
    #[must_use]
    pub fn shape_generator(self, seed: Option<u64>) -> Option<Box<dyn PointGenerator>> {
        match self {
            Self::SourceDerived => None,
            Self::Circle => Some(Box::new(CirclePointGenerator)),
            Self::Cross => Some(Box::new(CrossPointGenerator)),
            Self::Grid => Some(Box::new(GridPointGenerator)),
            Self::Random => Some(Box::new(
                seed.map_or_else(RandomPointGenerator::unseeded, RandomPointGenerator::new),
            )),
        }
    }
}
