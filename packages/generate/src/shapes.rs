//! Range-filling shape generators.

use std::f64::consts::TAU;

use issue_map_spatial::{Range2d, SpatialPoint};
use rand::{Rng as _, SeedableRng as _, rngs::StdRng};

use crate::PointGenerator;

/// Points evenly spaced on the largest circle inscribed in the range.
#[derive(Debug, Clone, Copy, Default)]
pub struct CirclePointGenerator;

impl PointGenerator for CirclePointGenerator {
    #[allow(clippy::cast_precision_loss)]
    fn generate(&self, count: usize, range: &Range2d) -> Vec<SpatialPoint> {
        let Some(center) = usable_center(count, range) else {
            return Vec::new();
        };
        let radius = range.width().min(range.height()) / 2.0;

        (0..count)
            .map(|i| {
                let angle = TAU * i as f64 / count as f64;
                clamp_to(
                    range,
                    SpatialPoint::xy(
                        radius.mul_add(angle.cos(), center.x),
                        radius.mul_add(angle.sin(), center.y),
                    ),
                )
            })
            .collect()
    }
}

/// Points along the horizontal and vertical center lines.
///
/// The first half (rounded up) goes on the horizontal arm, the rest on the
/// vertical arm. Points on an arm with `n` points sit at `k / (n + 1)` of its
/// length, so a single point lands on the center.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossPointGenerator;

impl PointGenerator for CrossPointGenerator {
    #[allow(clippy::cast_precision_loss)]
    fn generate(&self, count: usize, range: &Range2d) -> Vec<SpatialPoint> {
        let Some(center) = usable_center(count, range) else {
            return Vec::new();
        };

        let horizontal = count.div_ceil(2);
        let vertical = count - horizontal;

        let along = |k: usize, n: usize| (k + 1) as f64 / (n + 1) as f64;

        let h = (0..horizontal).map(|k| {
            SpatialPoint::xy(
                range.width().mul_add(along(k, horizontal), range.min_x),
                center.y,
            )
        });
        let v = (0..vertical).map(|k| {
            SpatialPoint::xy(
                center.x,
                range.height().mul_add(along(k, vertical), range.min_y),
            )
        });

        h.chain(v).collect()
    }
}

/// Points at the centers of a near-square grid, filled row by row.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridPointGenerator;

impl PointGenerator for GridPointGenerator {
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn generate(&self, count: usize, range: &Range2d) -> Vec<SpatialPoint> {
        if usable_center(count, range).is_none() {
            return Vec::new();
        }

        let columns = (count as f64).sqrt().ceil().max(1.0) as usize;
        let rows = count.div_ceil(columns);
        let cell_w = range.width() / columns as f64;
        let cell_h = range.height() / rows as f64;

        (0..count)
            .map(|i| {
                let (row, col) = (i / columns, i % columns);
                SpatialPoint::xy(
                    cell_w.mul_add(col as f64 + 0.5, range.min_x),
                    cell_h.mul_add(row as f64 + 0.5, range.min_y),
                )
            })
            .collect()
    }
}

/// Uniformly distributed points from a seeded generator.
///
/// Every call restarts from the seed, so the same generator yields the same
/// points for the same inputs.
#[derive(Debug, Clone, Copy)]
pub struct RandomPointGenerator {
    seed: u64,
}

impl RandomPointGenerator {
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// A generator with a freshly drawn seed.
    #[must_use]
    pub fn unseeded() -> Self {
        Self::new(rand::random())
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }
}

impl PointGenerator for RandomPointGenerator {
    fn generate(&self, count: usize, range: &Range2d) -> Vec<SpatialPoint> {
        if usable_center(count, range).is_none() {
            return Vec::new();
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        (0..count)
            .map(|_| {
                SpatialPoint::xy(
                    rng.random_range(range.min_x..=range.max_x),
                    rng.random_range(range.min_y..=range.max_y),
                )
            })
            .collect()
    }
}

// Finite corners can still span more than f64::MAX.
fn usable_center(count: usize, range: &Range2d) -> Option<SpatialPoint> {
    if count == 0
        || range.is_degenerate()
        || !range.width().is_finite()
        || !range.height().is_finite()
    {
        return None;
    }
    range.center()
}

// Trig rounding can push a point a hair outside the range.
fn clamp_to(range: &Range2d, p: SpatialPoint) -> SpatialPoint {
    SpatialPoint::new(
        p.x.clamp(range.min_x, range.max_x),
        p.y.clamp(range.min_y, range.max_y),
        p.z,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Range2d {
        Range2d::from_xyxy(0.0, 0.0, 4.0, 4.0)
    }

    #[test]
    fn degenerate_ranges_produce_nothing() {
        let generators: [&dyn PointGenerator; 4] = [
            &CirclePointGenerator,
            &CrossPointGenerator,
            &GridPointGenerator,
            &RandomPointGenerator::new(1),
        ];
        for generator in generators {
            assert!(generator.generate(5, &Range2d::null()).is_empty());
            assert!(
                generator
                    .generate(5, &Range2d::from_xyxy(1.0, 1.0, 1.0, 3.0))
                    .is_empty()
            );
            assert!(generator.generate(0, &square()).is_empty());
        }
    }

    #[test]
    fn circle_points_sit_on_inscribed_circle() {
        let points = CirclePointGenerator.generate(8, &square());
        assert_eq!(points.len(), 8);
        for p in &points {
            let r = ((p.x - 2.0).powi(2) + (p.y - 2.0).powi(2)).sqrt();
            assert!((r - 2.0).abs() < 1e-9, "radius {r}");
        }
        assert!((points[0].x - 4.0).abs() < 1e-12);
        assert!((points[0].y - 2.0).abs() < 1e-12);
    }

    #[test]
    fn single_cross_point_is_the_center() {
        let points = CrossPointGenerator.generate(1, &square());
        assert_eq!(points, vec![SpatialPoint::xy(2.0, 2.0)]);
    }

    #[test]
    fn cross_splits_between_arms() {
        let points = CrossPointGenerator.generate(5, &square());
        assert_eq!(points.len(), 5);
        assert!(points[..3].iter().all(|p| p.y == 2.0));
        assert!(points[3..].iter().all(|p| p.x == 2.0));
    }

    #[test]
    fn grid_uses_cell_centers() {
        let points = GridPointGenerator.generate(4, &square());
        assert_eq!(
            points,
            vec![
                SpatialPoint::xy(1.0, 1.0),
                SpatialPoint::xy(3.0, 1.0),
                SpatialPoint::xy(1.0, 3.0),
                SpatialPoint::xy(3.0, 3.0),
            ]
        );
    }

    #[test]
    fn grid_handles_non_square_counts() {
        let points = GridPointGenerator.generate(5, &square());
        assert_eq!(points.len(), 5);
        assert!(points.iter().all(|p| square().contains_point(p)));
    }

    #[test]
    fn random_is_reproducible_for_a_seed() {
        let a = RandomPointGenerator::new(42).generate(20, &square());
        let b = RandomPointGenerator::new(42).generate(20, &square());
        assert_eq!(a, b);
        assert!(a.iter().all(|p| square().contains_point(p)));

        let c = RandomPointGenerator::new(43).generate(20, &square());
        assert_ne!(a, c);
    }

    #[test]
    fn overflowing_extents_produce_nothing() {
        let wide = Range2d::from_xyxy(-f64::MAX, -1.0, f64::MAX, 1.0);
        let tall = Range2d::from_xyxy(-1.0, -f64::MAX, 1.0, f64::MAX);
        let generators: [&dyn PointGenerator; 4] = [
            &CirclePointGenerator,
            &CrossPointGenerator,
            &GridPointGenerator,
            &RandomPointGenerator::new(1),
        ];
        for generator in generators {
            assert!(generator.generate(3, &wide).is_empty());
            assert!(generator.generate(4, &tall).is_empty());
        }
    }
}
