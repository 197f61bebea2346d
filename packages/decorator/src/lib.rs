#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Heatmap decorator and its lifecycle.
//!
//! A [`HeatmapDecorator`] holds the point set, spread factor, overlay height
//! and surface range of one heatmap. It knows nothing about any rendering
//! backend: when the host invokes its draw callback it emits a
//! [`HeatmapOverlay`] describing what to render, read from the live state at
//! that moment.
//!
//! Registration with the host's frame loop is a separate step driven by the
//! [`HeatmapDecoratorController`]. The registration handle lives in the
//! decorator's own state, so an instance holds at most one registration no
//! matter how many controllers share the host.
//!
//! ```text
//! Constructed ──set_*──▶ Configured ──enable──▶ Enabled ⇄ Disabled
//!       │                     │                    │         │
//!       └──────────── dispose ┴────────────────────┴─────────┴──▶ Disposed
//! ```

pub mod controller;
pub mod host;
pub mod surface;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use issue_map_spatial::{Range2d, SpatialPoint};

pub use controller::HeatmapDecoratorController;
pub use host::{
    DecorateContext, Decoration, Frame, FrameLoop, HostError, RegistrationHandle, RenderHost,
};
pub use surface::{HeatmapOverlay, HeatmapSurface};

/// Spread factor a freshly constructed decorator starts with.
pub const DEFAULT_SPREAD_FACTOR: f64 = 0.2;

/// Errors from decorator operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecoratorError {
    /// A numeric argument was outside its allowed domain.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the rejected value.
        message: String,
    },

    /// No live render context was available when enabling.
    #[error("No active viewport to register the decorator with")]
    NoActiveViewport,

    /// The decorator has been disposed.
    #[error("Decorator {0} has been disposed")]
    AlreadyDisposed(DecoratorId),
}

/// Process-unique decorator identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DecoratorId(u64);

impl DecoratorId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for DecoratorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a decorator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoratorStatus {
    /// Created with defaults, never configured.
    Constructed,
    /// At least one setter has run; never enabled.
    Configured,
    /// Registered with the host frame loop.
    Enabled,
    /// Unregistered, or an enable attempt failed; state preserved.
    Disabled,
    /// Resources released; every further mutation fails.
    Disposed,
}

#[derive(Debug)]
struct DecoratorState {
    points: Vec<SpatialPoint>,
    spread_factor: f64,
    height: f64,
    range: Range2d,
    weighted: bool,
    status: DecoratorStatus,
    registration: Option<RegistrationHandle>,
}

/// Shared handle to one heatmap's render state.
///
/// Clones refer to the same decorator. Setters replace a single field and
/// have no other effect; a change becomes visible on the next frame drawn
/// while the decorator is enabled.
#[derive(Debug, Clone)]
pub struct HeatmapDecorator {
    id: DecoratorId,
    state: Arc<RwLock<DecoratorState>>,
}

impl Default for HeatmapDecorator {
    fn default() -> Self {
        Self::new()
    }
}

impl HeatmapDecorator {
    /// Creates a decorator with no points, the default spread factor, zero
    /// height and a null range.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: DecoratorId::next(),
            state: Arc::new(RwLock::new(DecoratorState {
                points: Vec::new(),
                spread_factor: DEFAULT_SPREAD_FACTOR,
                height: 0.0,
                range: Range2d::null(),
                weighted: false,
                status: DecoratorStatus::Constructed,
                registration: None,
            })),
        }
    }

    #[must_use]
    pub const fn id(&self) -> DecoratorId {
        self.id
    }

    /// Replaces the point set.
    ///
    /// # Errors
    ///
    /// Returns [`DecoratorError::AlreadyDisposed`] after disposal.
    pub fn set_points(&self, points: Vec<SpatialPoint>) -> Result<(), DecoratorError> {
        self.mutate(|state| state.points = points)
    }

    /// Sets the kernel spread factor.
    ///
    /// # Errors
    ///
    /// Returns [`DecoratorError::InvalidArgument`] unless `spread_factor` is
    /// finite and positive, or [`DecoratorError::AlreadyDisposed`] after
    /// disposal.
    pub fn set_spread_factor(&self, spread_factor: f64) -> Result<(), DecoratorError> {
        if !spread_factor.is_finite() || spread_factor <= 0.0 {
            return Err(DecoratorError::InvalidArgument {
                message: format!("spread factor must be positive, got {spread_factor}"),
            });
        }
        self.mutate(|state| state.spread_factor = spread_factor)
    }

    /// Sets the surface range.
    ///
    /// # Errors
    ///
    /// Returns [`DecoratorError::AlreadyDisposed`] after disposal.
    pub fn set_range(&self, range: Range2d) -> Result<(), DecoratorError> {
        self.mutate(|state| state.range = range)
    }

    /// Sets the z-offset of the overlay plane.
    ///
    /// # Errors
    ///
    /// Returns [`DecoratorError::InvalidArgument`] for a non-finite height or
    /// [`DecoratorError::AlreadyDisposed`] after disposal.
    pub fn set_height(&self, height: f64) -> Result<(), DecoratorError> {
        if !height.is_finite() {
            return Err(DecoratorError::InvalidArgument {
                message: format!("height must be finite, got {height}"),
            });
        }
        self.mutate(|state| state.height = height)
    }

    /// Whether each point's `z` carries its weight (see
    /// `issue_map_generate::apply_weights`) rather than a height.
    ///
    /// # Errors
    ///
    /// Returns [`DecoratorError::AlreadyDisposed`] after disposal.
    pub fn set_weighted(&self, weighted: bool) -> Result<(), DecoratorError> {
        self.mutate(|state| state.weighted = weighted)
    }

    #[must_use]
    pub fn points(&self) -> Vec<SpatialPoint> {
        self.read().points.clone()
    }

    #[must_use]
    pub fn spread_factor(&self) -> f64 {
        self.read().spread_factor
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.read().height
    }

    #[must_use]
    pub fn range(&self) -> Range2d {
        self.read().range
    }

    #[must_use]
    pub fn is_weighted(&self) -> bool {
        self.read().weighted
    }

    #[must_use]
    pub fn status(&self) -> DecoratorStatus {
        self.read().status
    }

    /// Handle of the live host registration, if any.
    #[must_use]
    pub fn registration(&self) -> Option<RegistrationHandle> {
        self.read().registration
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.status() == DecoratorStatus::Enabled
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.status() == DecoratorStatus::Disposed
    }

    /// Releases the point set and marks the decorator disposed.
    ///
    /// Disposing twice is a no-op. A disposed decorator that is still
    /// registered draws nothing; callers should disable it first (the
    /// controller's `teardown` does both).
    pub fn dispose(&self) {
        let mut state = self.write();
        if state.status == DecoratorStatus::Disposed {
            return;
        }
        if state.status == DecoratorStatus::Enabled {
            log::warn!("Decorator {} disposed while still enabled", self.id);
        }
        state.points = Vec::new();
        state.status = DecoratorStatus::Disposed;
        log::debug!("Decorator {} disposed", self.id);
    }

    /// Describes what to render for the current state, or `None` when there
    /// is nothing to draw.
    ///
    /// Nothing is drawn after disposal, for an empty point set, or for a null
    /// range. A range that is zero-width or zero-height is widened by the
    /// spread factor on the collapsed axis so a lone point still frames a
    /// surface.
    #[must_use]
    pub fn overlay(&self) -> Option<HeatmapOverlay> {
        let state = self.read();
        if state.status == DecoratorStatus::Disposed
            || state.points.is_empty()
            || state.range.is_null()
        {
            return None;
        }

        Some(HeatmapOverlay {
            points: state.points.clone(),
            spread_factor: state.spread_factor,
            height: state.height,
            range: state.range.pad_degenerate_axes(state.spread_factor),
            weighted: state.weighted,
        })
    }

    /// Registers with `host` unless already registered.
    ///
    /// Returns the new handle, or `None` when a registration already
    /// existed. The state lock is held across the host call so a concurrent
    /// [`dispose`](Self::dispose) or second enable cannot interleave; hosts
    /// must not invoke the decoration from inside `register_decoration`.
    pub(crate) fn register_with(
        &self,
        host: &dyn RenderHost,
    ) -> Result<Option<RegistrationHandle>, DecoratorError> {
        let mut state = self.write();
        if state.status == DecoratorStatus::Disposed {
            return Err(DecoratorError::AlreadyDisposed(self.id));
        }
        if state.registration.is_some() {
            return Ok(None);
        }

        let registered = if host.has_active_viewport() {
            host.register_decoration(Arc::new(self.clone()))
        } else {
            Err(HostError::NoActiveViewport)
        };

        match registered {
            Ok(handle) => {
                state.registration = Some(handle);
                state.status = DecoratorStatus::Enabled;
                drop(state);
                Ok(Some(handle))
            }
            Err(e) => {
                state.status = DecoratorStatus::Disabled;
                drop(state);
                log::warn!("Cannot enable decorator {}: {e}", self.id);
                Err(DecoratorError::NoActiveViewport)
            }
        }
    }

    /// Drops the registration with `host`, if any. Returns whether one was
    /// removed.
    pub(crate) fn unregister_from(&self, host: &dyn RenderHost) -> bool {
        let mut state = self.write();
        let Some(handle) = state.registration.take() else {
            return false;
        };
        host.unregister_decoration(handle);
        if state.status != DecoratorStatus::Disposed {
            state.status = DecoratorStatus::Disabled;
        }
        drop(state);
        true
    }

    fn mutate(&self, f: impl FnOnce(&mut DecoratorState)) -> Result<(), DecoratorError> {
        let mut state = self.write();
        if state.status == DecoratorStatus::Disposed {
            return Err(DecoratorError::AlreadyDisposed(self.id));
        }
        f(&mut *state);
        if state.status == DecoratorStatus::Constructed {
            state.status = DecoratorStatus::Configured;
        }
        drop(state);
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, DecoratorState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DecoratorState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Decoration for HeatmapDecorator {
    fn decorate(&self, context: &mut dyn DecorateContext) {
        if let Some(overlay) = self.overlay() {
            context.add_heatmap(overlay);
        }
    }
}
