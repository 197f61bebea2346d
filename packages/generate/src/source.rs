//! Points derived from issue reports.
//!
//! Each report is projected from its geographic coordinate into model space.
//! Projections run concurrently and results keep the input order. A report
//! whose projection fails is logged and skipped.

use futures::future::join_all;
use issue_map_issue_models::IssueReport;
use issue_map_spatial::{Projector, SpatialPoint};

/// Generates one point per issue report, optionally repeated to encode
/// intensity by multiplicity.
#[derive(Debug, Clone, Copy)]
pub struct SourceDerivedGenerator {
    copies_per_record: usize,
}

impl Default for SourceDerivedGenerator {
    fn default() -> Self {
        Self {
            copies_per_record: 1,
        }
    }
}

impl SourceDerivedGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits every projected point `copies` times (minimum once).
    #[must_use]
    pub fn with_copies_per_record(copies: usize) -> Self {
        Self {
            copies_per_record: copies.max(1),
        }
    }

    /// Projects `records` into model space.
    ///
    /// Records that cannot be projected are dropped; the rest keep their
    /// relative order. Filtering by issue type is expected to happen before
    /// this call.
    pub async fn generate<'a, I>(&self, records: I, projector: &dyn Projector) -> Vec<SpatialPoint>
    where
        I: IntoIterator<Item = &'a IssueReport>,
    {
        let records: Vec<&IssueReport> = records.into_iter().collect();
        let total = records.len();

        let projected = join_all(records.iter().map(|report| async move {
            let coordinate = report.coordinate();
            match projector.project(coordinate).await {
                Ok(point) if point.is_finite() => Some(point),
                Ok(point) => {
                    log::debug!("Dropping issue {:?}: non-finite projection {point:?}", report.id);
                    None
                }
                Err(e) => {
                    log::debug!("Dropping issue {:?}: {e}", report.id);
                    None
                }
            }
        }))
        .await;

        let points: Vec<SpatialPoint> = projected
            .into_iter()
            .flatten()
            .flat_map(|p| std::iter::repeat_n(p, self.copies_per_record))
            .collect();

        let dropped = total - points.len() / self.copies_per_record;
        if dropped > 0 {
            log::warn!("Skipped {dropped} of {total} issues that could not be projected");
        }

        points
    }
}

/// A model-space location with an integer intensity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityMarker {
    pub location: SpatialPoint,
    pub intensity: u32,
}

/// Expands markers into points, repeating each location `intensity` times.
///
/// Markers with zero intensity contribute nothing.
#[must_use]
pub fn replicate_by_intensity(markers: &[IntensityMarker]) -> Vec<SpatialPoint> {
    markers
        .iter()
        .flat_map(|m| std::iter::repeat_n(m.location.with_z(0.0), m.intensity as usize))
        .collect()
}
