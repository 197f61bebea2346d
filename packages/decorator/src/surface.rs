//! Heatmap overlays and their rasterized density surface.
//!
//! An overlay is what a decorator emits each frame. Hosts with a GPU path
//! consume it directly; [`HeatmapOverlay::rasterize`] turns it into a grid of
//! intensities for hosts that draw a texture or text.
//!
//! Each point contributes a Gaussian kernel whose radius is
//! `spread_factor * max(range width, range height)`, truncated at that radius.
//! Points are bulk-loaded into an R-tree so every cell only visits the points
//! within one radius of its center.

use issue_map_spatial::{Range2d, SpatialPoint};
use rstar::RTree;
use rstar::primitives::GeomWithData;

type WeightedPoint = GeomWithData<[f64; 2], f64>;

/// Render request produced by a decorator for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapOverlay {
    pub points: Vec<SpatialPoint>,
    pub spread_factor: f64,
    /// Z-offset of the overlay plane.
    pub height: f64,
    /// Surface extent. Never degenerate.
    pub range: Range2d,
    /// Whether point `z` values are weights.
    pub weighted: bool,
}

impl HeatmapOverlay {
    /// Kernel radius in model units.
    #[must_use]
    pub fn kernel_radius(&self) -> f64 {
        self.spread_factor * self.range.width().max(self.range.height())
    }

    /// Samples the density surface on a `columns × rows` grid.
    ///
    /// Values are normalized into `[0, 1]`; a surface with no contributing
    /// points is all zeros. Cells are ordered row-major from `min_y`. A grid
    /// whose cell count overflows `usize` yields an empty `0 × 0` surface.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rasterize(&self, columns: usize, rows: usize) -> HeatmapSurface {
        let Some(cells) = columns.checked_mul(rows) else {
            log::warn!("Heatmap grid {columns} x {rows} is too large, drawing nothing");
            return self.empty_surface();
        };
        let mut values = vec![0.0; cells];
        let radius = self.kernel_radius();

        if columns > 0 && rows > 0 && radius > 0.0 && !self.range.is_degenerate() {
            let tree: RTree<WeightedPoint> = RTree::bulk_load(
                self.points
                    .iter()
                    .filter(|p| p.x.is_finite() && p.y.is_finite())
                    .map(|p| {
                        let weight = if self.weighted { p.z.max(0.0) } else { 1.0 };
                        GeomWithData::new([p.x, p.y], weight)
                    })
                    .collect(),
            );

            let sigma = radius / 3.0;
            let two_sigma_sq = 2.0 * sigma * sigma;
            let radius_sq = radius * radius;
            let cell_w = self.range.width() / columns as f64;
            let cell_h = self.range.height() / rows as f64;

            for row in 0..rows {
                let cy = cell_h.mul_add(row as f64 + 0.5, self.range.min_y);
                for col in 0..columns {
                    let cx = cell_w.mul_add(col as f64 + 0.5, self.range.min_x);
                    values[row * columns + col] = tree
                        .locate_within_distance([cx, cy], radius_sq)
                        .map(|p| {
                            let [px, py] = *p.geom();
                            let d_sq = (px - cx).powi(2) + (py - cy).powi(2);
                            p.data * (-d_sq / two_sigma_sq).exp()
                        })
                        .sum();
                }
            }

            let max = values.iter().copied().fold(0.0, f64::max);
            if max > 0.0 {
                for v in &mut values {
                    *v /= max;
                }
            }
        }

        HeatmapSurface {
            columns,
            rows,
            range: self.range,
            height: self.height,
            values,
        }
    }
}

impl HeatmapOverlay {
    const fn empty_surface(&self) -> HeatmapSurface {
        HeatmapSurface {
            columns: 0,
            rows: 0,
            range: self.range,
            height: self.height,
            values: Vec::new(),
        }
    }
}

/// A sampled density grid.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapSurface {
    pub columns: usize,
    pub rows: usize,
    pub range: Range2d,
    pub height: f64,
    values: Vec<f64>,
}

impl HeatmapSurface {
    /// Intensity in `[0, 1]` of the cell at (`column`, `row`).
    #[must_use]
    pub fn value(&self, column: usize, row: usize) -> Option<f64> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        self.values.get(row * self.columns + column).copied()
    }

    /// All cells, row-major from `min_y`.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Iterates rows from `min_y` upwards.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks(self.columns.max(1))
    }

    /// Column and row of the most intense cell.
    #[must_use]
    pub fn hottest_cell(&self) -> Option<(usize, usize)> {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, v)| **v > 0.0)
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, _)| (i % self.columns, i / self.columns))
    }
}
