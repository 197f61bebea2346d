#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Heatmap session orchestration.
//!
//! A [`HeatmapSession`] owns one decorator controller, the issue heatmap
//! decorator, a user-location decorator and the collaborators that feed
//! them (issue backend, projector, geolocation). It runs the load
//! pipeline:
//!
//! ```text
//! fetch ─▶ type filter ─▶ project ─▶ (weights) ─▶ bounds + expand ─▶ decorator ─▶ enable
//! ```
//!
//! Every load takes a ticket from a monotonic counter. When a load finishes
//! after a newer one has started, or after [`HeatmapSession::teardown`], its
//! result is discarded instead of overwriting newer state.

pub mod config;
pub mod geolocation;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use issue_map_backend::{BackendError, IssueBackend, fetch_issues_or_empty};
use issue_map_decorator::{
    DecoratorError, HeatmapDecorator, HeatmapDecoratorController, RenderHost,
};
use issue_map_generate::{
    CrossPointGenerator, PointGenerator, SourceDerivedGenerator, apply_weights,
};
use issue_map_issue_models::{GeoCoordinate, IssueTypeFilter, NewIssue, SubmissionReceipt};
use issue_map_spatial::{
    ProjectionError, Projector, Range2d, RangeError, SpatialPoint, compute_bounds,
};

pub use config::{ConfigError, HeatmapConfig, HeatmapMode};
pub use geolocation::{
    FixedGeolocation, GeolocationError, GeolocationProvider, NoGeolocation, locate_or,
};

/// Errors returned by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session has been torn down.
    #[error("Heatmap session has been torn down")]
    Disposed,

    #[error(transparent)]
    Decorator(#[from] DecoratorError),

    #[error(transparent)]
    Range(#[from] RangeError),

    /// The user location could not be projected into model space.
    #[error("Failed to project user location: {0}")]
    Projection(#[from] ProjectionError),

    /// The backend rejected or failed a submission. Nothing was stored
    /// locally; the caller may offer a retry.
    #[error("Issue submission failed: {0}")]
    Submit(#[source] BackendError),
}

/// Why a finished load did not touch the decorator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// A newer load started while this one was in flight.
    Superseded,
    /// The session was torn down while this load was in flight.
    TornDown,
}

/// What a load applied to the issue heatmap.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSummary {
    pub ticket: u64,
    /// Reports selected by the filter (or synthetic points requested).
    pub selected: usize,
    /// Points handed to the decorator.
    pub points: usize,
    pub range: Range2d,
    pub weighted: bool,
}

/// Result of a load request.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Applied(LoadSummary),
    Discarded { ticket: u64, reason: DiscardReason },
}

impl LoadOutcome {
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Where the user location marker was placed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserLocation {
    /// Geographic location used (the device fix or the configured fallback).
    pub coordinate: GeoCoordinate,
    /// Model-space position of the location.
    pub point: SpatialPoint,
    /// Marker box drawn around the location.
    pub range: Range2d,
}

/// One heatmap view and everything needed to fill it.
pub struct HeatmapSession {
    config: HeatmapConfig,
    controller: HeatmapDecoratorController,
    issues: HeatmapDecorator,
    location: Mutex<Option<HeatmapDecorator>>,
    backend: Arc<dyn IssueBackend>,
    projector: Arc<dyn Projector>,
    geolocation: Arc<dyn GeolocationProvider>,
    tickets: AtomicU64,
    disposed: AtomicBool,
}

impl std::fmt::Debug for HeatmapSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeatmapSession")
            .field("mode", &self.config.mode)
            .field("backend", &self.backend.name())
            .field("issues", &self.issues.id())
            .field("tickets", &self.tickets.load(Ordering::SeqCst))
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

impl HeatmapSession {
    /// Creates a session drawing into `host`.
    ///
    /// The session starts without location services; see
    /// [`Self::with_geolocation`].
    #[must_use]
    pub fn new(
        host: Arc<dyn RenderHost>,
        backend: Arc<dyn IssueBackend>,
        projector: Arc<dyn Projector>,
        config: HeatmapConfig,
    ) -> Self {
        let controller = HeatmapDecoratorController::new(host);
        let issues = controller.setup_decorator();
        Self {
            config,
            controller,
            issues,
            location: Mutex::new(None),
            backend,
            projector,
            geolocation: Arc::new(NoGeolocation),
            tickets: AtomicU64::new(0),
            disposed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_geolocation(mut self, geolocation: Arc<dyn GeolocationProvider>) -> Self {
        self.geolocation = geolocation;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &HeatmapConfig {
        &self.config
    }

    #[must_use]
    pub const fn controller(&self) -> &HeatmapDecoratorController {
        &self.controller
    }

    /// The issue heatmap decorator.
    #[must_use]
    pub const fn decorator(&self) -> &HeatmapDecorator {
        &self.issues
    }

    /// The user location decorator, once [`Self::show_user_location`] ran.
    #[must_use]
    pub fn location_decorator(&self) -> Option<HeatmapDecorator> {
        self.location_slot().clone()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Frames the issue heatmap before any data arrives.
    ///
    /// Uses the host's current view range, or the configured default range
    /// when the host reports none. The overlay height is set to
    /// `view_height`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Disposed`] after teardown.
    pub fn init_view(&self) -> Result<Range2d, SessionError> {
        self.ensure_live()?;

        let range = self
            .controller
            .host()
            .compute_view_range()
            .filter(|r| !r.is_null())
            .unwrap_or_else(|| self.config.default_view_range.to_range());

        self.issues.set_range(range)?;
        self.issues.set_height(self.config.view_height)?;
        self.issues.set_spread_factor(self.config.spread_factor)?;
        log::debug!("Initialized view on {range:?}");
        Ok(range)
    }

    /// Loads heatmap points according to the configured [`HeatmapMode`].
    ///
    /// # Errors
    ///
    /// As [`Self::load_issues`] and [`Self::load_synthetic`].
    pub async fn load(&self) -> Result<LoadOutcome, SessionError> {
        match self.config.mode {
            HeatmapMode::Filter | HeatmapMode::Weighted => {
                self.load_issues(self.config.filter).await
            }
            HeatmapMode::Generator => self.load_synthetic(),
        }
    }

    /// Fetches stored issues, keeps those matching `filter`, and shows them.
    ///
    /// A failed fetch shows an empty heatmap rather than an error. Reports
    /// that cannot be projected are skipped. In [`HeatmapMode::Weighted`]
    /// each point carries its distance weight in `z`.
    ///
    /// # Errors
    ///
    /// * [`SessionError::Disposed`] if called after teardown.
    /// * [`SessionError::Decorator`] if the heatmap cannot be enabled, e.g.
    ///   because the host has no viewport. The decorator still holds the
    ///   loaded points.
    pub async fn load_issues(&self, filter: IssueTypeFilter) -> Result<LoadOutcome, SessionError> {
        self.ensure_live()?;
        let ticket = self.next_ticket();
        log::debug!("Load #{ticket}: fetching {filter} issues");

        let reports = fetch_issues_or_empty(self.backend.as_ref()).await;
        let selected = filter.apply(&reports);
        let selected_count = selected.len();

        let points = SourceDerivedGenerator::new()
            .generate(selected, self.projector.as_ref())
            .await;

        if let Some(reason) = self.discard_reason(ticket) {
            log::debug!("Load #{ticket}: discarded ({reason:?})");
            return Ok(LoadOutcome::Discarded { ticket, reason });
        }

        let weighted = self.config.mode == HeatmapMode::Weighted;
        let points = if weighted {
            apply_weights(&points)
        } else {
            points
        };
        let range = compute_bounds(&points).expand(self.config.expand_fraction)?;

        self.show_points(ticket, selected_count, points, range, weighted)
    }

    /// Fills the current view with synthetic points from the configured
    /// generator.
    ///
    /// Points are generated inside the current surface range, or the
    /// configured default range before [`Self::init_view`]. A
    /// `source_derived` generator kind needs issue records and yields an
    /// empty heatmap here.
    ///
    /// # Errors
    ///
    /// * [`SessionError::Disposed`] if called after teardown.
    /// * [`SessionError::Decorator`] if the heatmap cannot be enabled.
    pub fn load_synthetic(&self) -> Result<LoadOutcome, SessionError> {
        self.ensure_live()?;
        let ticket = self.next_ticket();

        let generator_config = self.config.generator;
        let range = Some(self.issues.range())
            .filter(|r| !r.is_null())
            .unwrap_or_else(|| self.config.default_view_range.to_range());

        let points = match generator_config.kind.shape_generator(generator_config.seed) {
            Some(generator) => generator.generate(generator_config.count, &range),
            None => {
                log::warn!(
                    "Generator kind {} needs issue records; showing no synthetic points",
                    generator_config.kind
                );
                Vec::new()
            }
        };

        self.show_points(ticket, generator_config.count, points, range, false)
    }

    /// Shows a marker heatmap around the user's location.
    ///
    /// Asks the geolocation provider first and falls back to the configured
    /// location. The marker is a single point at the center of a box of
    /// half-size `marker_size / 10`, drawn by its own decorator with the
    /// location spread factor.
    ///
    /// # Errors
    ///
    /// * [`SessionError::Disposed`] if called after teardown.
    /// * [`SessionError::Projection`] if the location cannot be projected.
    /// * [`SessionError::Decorator`] if the marker cannot be enabled.
    pub async fn show_user_location(&self) -> Result<UserLocation, SessionError> {
        self.ensure_live()?;

        let settings = self.config.user_location;
        let located = locate_or(self.geolocation.as_ref(), settings.fallback()).await;
        let coordinate = GeoCoordinate::new(located.longitude, located.latitude, 0.0);
        let point = self.projector.project(coordinate).await?;

        // Teardown may have happened while we were waiting.
        self.ensure_live()?;

        let half = settings.marker_size / 10.0;
        let range = Range2d::from_xyxy(point.x - half, point.y - half, point.x + half, point.y + half);
        let points = CrossPointGenerator.generate(1, &range);

        let decorator = self
            .location_slot()
            .get_or_insert_with(|| self.controller.setup_decorator())
            .clone();
        decorator.set_points(points)?;
        decorator.set_spread_factor(settings.spread_factor)?;
        decorator.set_range(range)?;
        decorator.set_height(0.0)?;
        self.controller.enable_decorations(&decorator)?;

        log::info!(
            "Showing user location ({}, {})",
            coordinate.latitude,
            coordinate.longitude
        );

        Ok(UserLocation {
            coordinate,
            point,
            range,
        })
    }

    /// Shows or hides the issue heatmap. Returns whether it is now shown.
    ///
    /// # Errors
    ///
    /// * [`SessionError::Disposed`] if called after teardown.
    /// * [`SessionError::Decorator`] if showing fails.
    pub fn toggle(&self) -> Result<bool, SessionError> {
        self.ensure_live()?;
        if self.controller.is_registered(&self.issues) {
            self.controller.disable_decorations(&self.issues);
            Ok(false)
        } else {
            self.controller.enable_decorations(&self.issues)?;
            Ok(true)
        }
    }

    /// Submits a new issue to the backend. Never retried.
    ///
    /// # Errors
    ///
    /// * [`SessionError::Disposed`] if called after teardown.
    /// * [`SessionError::Submit`] if the backend rejects or fails the
    ///   submission.
    pub async fn submit_issue(&self, issue: &NewIssue) -> Result<SubmissionReceipt, SessionError> {
        self.ensure_live()?;
        let receipt = self
            .backend
            .submit_issue(issue)
            .await
            .map_err(SessionError::Submit)?;
        log::info!("Issue {} submitted as {}", issue.issue_type, receipt.id);
        Ok(receipt)
    }

    /// Unregisters and disposes both decorators. In-flight loads are
    /// discarded when they finish. Calling this twice is a no-op.
    pub fn teardown(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.controller.teardown(&self.issues);
        if let Some(location) = self.location_slot().take() {
            self.controller.teardown(&location);
        }
        log::debug!("Heatmap session torn down");
    }

    fn show_points(
        &self,
        ticket: u64,
        selected: usize,
        points: Vec<SpatialPoint>,
        range: Range2d,
        weighted: bool,
    ) -> Result<LoadOutcome, SessionError> {
        let count = points.len();
        self.issues.set_points(points)?;
        self.issues.set_weighted(weighted)?;
        self.issues.set_spread_factor(self.config.spread_factor)?;
        self.issues.set_height(self.config.height)?;
        self.issues.set_range(range)?;
        self.controller.enable_decorations(&self.issues)?;

        log::info!("Load #{ticket}: showing {count} points ({selected} selected)");

        Ok(LoadOutcome::Applied(LoadSummary {
            ticket,
            selected,
            points: count,
            range,
            weighted,
        }))
    }

    fn next_ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn discard_reason(&self, ticket: u64) -> Option<DiscardReason> {
        if self.is_disposed() {
            Some(DiscardReason::TornDown)
        } else if self.tickets.load(Ordering::SeqCst) != ticket {
            Some(DiscardReason::Superseded)
        } else {
            None
        }
    }

    fn ensure_live(&self) -> Result<(), SessionError> {
        if self.is_disposed() {
            return Err(SessionError::Disposed);
        }
        Ok(())
    }

    fn location_slot(&self) -> std::sync::MutexGuard<'_, Option<HeatmapDecorator>> {
        self.location.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use issue_map_backend::InMemoryIssueBackend;
    use issue_map_decorator::FrameLoop;
    use issue_map_generate::{GeneratorKind, WeightBand};
    use issue_map_issue_models::{IssueReport, IssueType};
    use issue_map_spatial::EquirectangularProjector;
    use tokio::sync::Notify;

    use super::*;

    const ORIGIN: GeoCoordinate = GeoCoordinate::new(5.0, 50.0, 0.0);

    fn reports() -> Vec<IssueReport> {
        vec![
            IssueReport::new(IssueType::Road, "pothole", 50.10, 5.10),
            IssueReport::new(IssueType::Road, "cracked lane", 50.12, 5.30),
            IssueReport::new(IssueType::Flood, "underpass", 50.20, 5.05),
            IssueReport::new(IssueType::Noise, "bar", 50.05, 5.22),
            IssueReport::new(IssueType::Road, "bogus", 95.0, 5.0),
        ]
    }

    fn host() -> Arc<FrameLoop> {
        Arc::new(FrameLoop::with_viewport(Range2d::from_xyxy(
            -1000.0, -1000.0, 1000.0, 1000.0,
        )))
    }

    fn session_with(
        host: Arc<FrameLoop>,
        backend: Arc<dyn IssueBackend>,
        config: HeatmapConfig,
    ) -> HeatmapSession {
        HeatmapSession::new(
            host,
            backend,
            Arc::new(EquirectangularProjector::new(ORIGIN)),
            config,
        )
    }

    fn applied(outcome: LoadOutcome) -> LoadSummary {
        match outcome {
            LoadOutcome::Applied(summary) => summary,
            LoadOutcome::Discarded { ticket, reason } => {
                panic!("load #{ticket} was discarded: {reason:?}")
            }
        }
    }

    /// Backend whose first fetch waits until released.
    struct GatedBackend {
        inner: InMemoryIssueBackend,
        gate: Notify,
        calls: AtomicUsize,
    }

    impl GatedBackend {
        fn new(reports: Vec<IssueReport>) -> Arc<Self> {
            Arc::new(Self {
                inner: InMemoryIssueBackend::new(reports),
                gate: Notify::new(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl IssueBackend for GatedBackend {
        fn name(&self) -> &str {
            "gated"
        }

        async fn fetch_all_issues(&self) -> Result<Vec<IssueReport>, BackendError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.gate.notified().await;
            }
            self.inner.fetch_all_issues().await
        }

        async fn submit_issue(&self, issue: &NewIssue) -> Result<SubmissionReceipt, BackendError> {
            self.inner.submit_issue(issue).await
        }
    }

    #[tokio::test]
    async fn load_all_issues_end_to_end() {
        let host = host();
        let session = session_with(
            host.clone(),
            Arc::new(InMemoryIssueBackend::new(reports())),
            HeatmapConfig::default(),
        );
        session.init_view().unwrap();

        let summary = applied(session.load_issues(IssueTypeFilter::All).await.unwrap());
        assert_eq!(summary.selected, 5);
        assert_eq!(summary.points, 4);

        let frame = host.tick();
        assert_eq!(frame.overlays.len(), 1);
        let overlay = &frame.overlays[0];
        assert_eq!(overlay.points.len(), 4);
        assert_eq!(overlay.spread_factor, 0.2);
        assert_eq!(overlay.height, 0.0);
        assert!(!overlay.weighted);
        assert!(overlay.points.iter().all(|p| overlay.range.contains_point(p)));

        // Bounds are grown by 10% of the extent on each side.
        let tight = compute_bounds(&overlay.points);
        assert!((overlay.range.width() - tight.width() * 1.2).abs() < 1e-6);
        assert!(overlay.range.contains_range(&tight));
    }

    #[tokio::test]
    async fn filter_narrows_to_one_type() {
        let host = host();
        let session = session_with(
            host.clone(),
            Arc::new(InMemoryIssueBackend::new(reports())),
            HeatmapConfig::default(),
        );

        let summary = applied(
            session
                .load_issues(IssueTypeFilter::Only(IssueType::Road))
                .await
                .unwrap(),
        );
        assert_eq!(summary.selected, 3);
        assert_eq!(summary.points, 2);
        assert_eq!(host.tick().overlays[0].points.len(), 2);
    }

    #[tokio::test]
    async fn weighted_mode_puts_weights_in_z() {
        let host = host();
        let config = HeatmapConfig {
            mode: HeatmapMode::Weighted,
            ..HeatmapConfig::default()
        };
        let session = session_with(
            host.clone(),
            Arc::new(InMemoryIssueBackend::new(reports())),
            config,
        );

        let summary = applied(session.load().await.unwrap());
        assert!(summary.weighted);

        let overlay = host.tick().overlays.remove(0);
        assert!(overlay.weighted);
        let band = WeightBand::default();
        assert!(overlay.points.iter().all(|p| band.contains(p.z)));
        assert!(overlay.points.iter().any(|p| (p.z - 1.0).abs() < 1e-12));
    }

    #[tokio::test]
    async fn unavailable_backend_shows_empty_heatmap() {
        let host = host();
        let backend = Arc::new(InMemoryIssueBackend::new(reports()));
        backend.set_unavailable(true);
        let session = session_with(host.clone(), backend, HeatmapConfig::default());

        let summary = applied(session.load_issues(IssueTypeFilter::All).await.unwrap());
        assert_eq!(summary.points, 0);
        assert!(summary.range.is_null());
        assert!(session.decorator().is_enabled());
        assert!(host.tick().overlays.is_empty());
    }

    #[tokio::test]
    async fn stale_load_is_discarded() {
        let host = host();
        let backend = GatedBackend::new(reports());
        let session = session_with(host.clone(), backend.clone(), HeatmapConfig::default());

        let slow = session.load_issues(IssueTypeFilter::Only(IssueType::Noise));
        let fast = async {
            let outcome = session.load_issues(IssueTypeFilter::All).await;
            backend.gate.notify_one();
            outcome
        };
        let (slow, fast) = tokio::join!(slow, fast);

        assert_eq!(
            slow.unwrap(),
            LoadOutcome::Discarded {
                ticket: 1,
                reason: DiscardReason::Superseded
            }
        );
        assert_eq!(applied(fast.unwrap()).ticket, 2);
        assert_eq!(session.decorator().points().len(), 4);
    }

    #[tokio::test]
    async fn teardown_discards_in_flight_load() {
        let host = host();
        let backend = GatedBackend::new(reports());
        let session = session_with(host.clone(), backend.clone(), HeatmapConfig::default());
        session.toggle().unwrap();
        assert_eq!(host.registration_count(), 1);

        let pending = session.load_issues(IssueTypeFilter::All);
        let teardown = async {
            session.teardown();
            backend.gate.notify_one();
        };
        let (outcome, ()) = tokio::join!(pending, teardown);

        assert_eq!(
            outcome.unwrap(),
            LoadOutcome::Discarded {
                ticket: 1,
                reason: DiscardReason::TornDown
            }
        );
        assert_eq!(host.registration_count(), 0);
        assert!(session.decorator().is_disposed());
        assert!(matches!(
            session.load_issues(IssueTypeFilter::All).await,
            Err(SessionError::Disposed)
        ));
        session.teardown();
    }

    #[tokio::test]
    async fn load_without_viewport_fails_to_enable() {
        let host = Arc::new(FrameLoop::detached());
        let session = session_with(
            host.clone(),
            Arc::new(InMemoryIssueBackend::new(reports())),
            HeatmapConfig::default(),
        );

        assert_eq!(session.init_view().unwrap(), Range2d::from_xyxy(5.0, 50.0, 7.0, 62.0));
        assert_eq!(session.decorator().height(), 1.0);

        assert!(matches!(
            session.load_issues(IssueTypeFilter::All).await,
            Err(SessionError::Decorator(DecoratorError::NoActiveViewport))
        ));
        assert_eq!(session.decorator().points().len(), 4);
        assert!(!session.decorator().is_enabled());

        host.attach_viewport(Range2d::from_xyxy(0.0, 0.0, 1.0, 1.0));
        assert!(session.toggle().unwrap());
        assert_eq!(host.tick().overlays.len(), 1);
    }

    #[tokio::test]
    async fn toggle_hides_and_shows() {
        let host = host();
        let session = session_with(
            host.clone(),
            Arc::new(InMemoryIssueBackend::new(reports())),
            HeatmapConfig::default(),
        );
        session.load_issues(IssueTypeFilter::All).await.unwrap();

        assert!(!session.toggle().unwrap());
        assert!(host.tick().overlays.is_empty());
        assert!(session.toggle().unwrap());
        assert_eq!(host.tick().overlays.len(), 1);
        assert_eq!(host.registration_count(), 1);
    }

    #[tokio::test]
    async fn user_location_falls_back_to_configured_point() {
        let host = host();
        let session = session_with(
            host.clone(),
            Arc::new(InMemoryIssueBackend::default()),
            HeatmapConfig::default(),
        );

        let shown = session.show_user_location().await.unwrap();
        assert_eq!(shown.coordinate, GeoCoordinate::new(6.0, 50.0, 0.0));
        assert!(shown.point.x > 0.0);
        assert!((shown.range.width() - 0.2).abs() < 1e-9);
        let center = shown.range.center().unwrap();
        assert!((center.x - shown.point.x).abs() < 1e-9);
        assert!((center.y - shown.point.y).abs() < 1e-9);

        let overlay = host.tick().overlays.remove(0);
        assert_eq!(overlay.spread_factor, 2.0);
        assert_eq!(overlay.points.len(), 1);
        assert!((overlay.points[0].x - shown.point.x).abs() < 1e-9);
    }

    #[tokio::test]
    async fn user_location_uses_device_fix() {
        let host = host();
        let session = session_with(
            host.clone(),
            Arc::new(InMemoryIssueBackend::default()),
            HeatmapConfig::default(),
        )
        .with_geolocation(Arc::new(FixedGeolocation(ORIGIN)));

        let shown = session.show_user_location().await.unwrap();
        assert_eq!(shown.point, SpatialPoint::new(0.0, 0.0, 0.0));

        // Showing again reuses the same decorator.
        session.show_user_location().await.unwrap();
        assert_eq!(host.registration_count(), 1);
        assert!(session.location_decorator().unwrap().is_enabled());
    }

    #[tokio::test]
    async fn generator_mode_fills_the_view() {
        let host = host();
        let mut config = HeatmapConfig {
            mode: HeatmapMode::Generator,
            ..HeatmapConfig::default()
        };
        config.generator.kind = GeneratorKind::Grid;
        config.generator.count = 9;
        let session = session_with(host.clone(), Arc::new(InMemoryIssueBackend::default()), config);
        let view = session.init_view().unwrap();

        let summary = applied(session.load().await.unwrap());
        assert_eq!(summary.points, 9);
        assert_eq!(summary.range, view);
        let overlay = host.tick().overlays.remove(0);
        assert!(overlay.points.iter().all(|p| view.contains_point(p)));
    }

    #[tokio::test]
    async fn submission_failure_is_distinct_from_success() {
        let backend = Arc::new(InMemoryIssueBackend::default());
        let session = session_with(host(), backend.clone(), HeatmapConfig::default());
        let issue = NewIssue {
            issue_type: IssueType::Garbage,
            description: "overflowing bin".to_string(),
            location: GeoCoordinate::new(6.0, 50.0, 0.0),
            photo: None,
        };

        let receipt = session.submit_issue(&issue).await.unwrap();
        assert_eq!(backend.reports()[0].id.as_deref(), Some(receipt.id.as_str()));

        backend.set_unavailable(true);
        assert!(matches!(
            session.submit_issue(&issue).await,
            Err(SessionError::Submit(BackendError::Unavailable { .. }))
        ));
        assert_eq!(backend.reports().len(), 1);
    }
}
