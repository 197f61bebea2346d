//! The render-host seam.
//!
//! The viewport host owns a frame loop and a list of registered decorations.
//! Once per frame it hands every registered [`Decoration`] a
//! [`DecorateContext`] to draw into. [`FrameLoop`] is an in-process host used
//! for headless rendering and tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use issue_map_spatial::Range2d;

use crate::surface::HeatmapOverlay;

/// Errors reported by a render host.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// The host has no live viewport / render context.
    #[error("No active viewport")]
    NoActiveViewport,
}

/// Receives render output from decorations during a frame.
pub trait DecorateContext {
    /// Queues a heatmap overlay for this frame.
    fn add_heatmap(&mut self, overlay: HeatmapOverlay);
}

/// A unit of custom rendering invoked once per host frame.
pub trait Decoration: Send + Sync {
    fn decorate(&self, context: &mut dyn DecorateContext);
}

/// Token identifying one registration with a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegistrationHandle(pub u64);

/// What the viewport host provides to the heatmap engine.
pub trait RenderHost: Send + Sync {
    /// Whether a live viewport / render context exists right now.
    fn has_active_viewport(&self) -> bool;

    /// Adds `decoration` to the frame loop.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::NoActiveViewport`] if there is no render context.
    fn register_decoration(
        &self,
        decoration: Arc<dyn Decoration>,
    ) -> Result<RegistrationHandle, HostError>;

    /// Removes a registration. Unknown handles are ignored.
    fn unregister_decoration(&self, handle: RegistrationHandle);

    /// Extent of the current view, used as an initial framing hint.
    fn compute_view_range(&self) -> Option<Range2d>;
}

/// Output of one frame.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Monotonic frame counter, starting at 1.
    pub number: u64,
    /// Overlays drawn during this frame, in registration order.
    pub overlays: Vec<HeatmapOverlay>,
}

impl DecorateContext for Frame {
    fn add_heatmap(&mut self, overlay: HeatmapOverlay) {
        self.overlays.push(overlay);
    }
}

/// In-process render host with an explicit [`FrameLoop::tick`].
pub struct FrameLoop {
    view_range: RwLock<Option<Range2d>>,
    registrations: Mutex<BTreeMap<RegistrationHandle, Arc<dyn Decoration>>>,
    next_handle: AtomicU64,
    frames: AtomicU64,
}

impl std::fmt::Debug for FrameLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameLoop")
            .field("view_range", &self.view_range())
            .field("registrations", &self.registration_count())
            .field("frames", &self.frames.load(Ordering::Relaxed))
            .finish()
    }
}

impl FrameLoop {
    fn new(view_range: Option<Range2d>) -> Self {
        Self {
            view_range: RwLock::new(view_range),
            registrations: Mutex::new(BTreeMap::new()),
            next_handle: AtomicU64::new(1),
            frames: AtomicU64::new(0),
        }
    }

    /// A host with a live viewport showing `view_range`.
    #[must_use]
    pub fn with_viewport(view_range: Range2d) -> Self {
        Self::new(Some(view_range))
    }

    /// A host without a viewport; registration fails until one is attached.
    #[must_use]
    pub fn detached() -> Self {
        Self::new(None)
    }

    pub fn attach_viewport(&self, view_range: Range2d) {
        *self
            .view_range
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(view_range);
    }

    /// Drops the viewport. Existing registrations are kept but nothing is
    /// drawn until a viewport is attached again.
    pub fn detach_viewport(&self) {
        *self
            .view_range
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    #[must_use]
    pub fn view_range(&self) -> Option<Range2d> {
        *self.view_range.read().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn registration_count(&self) -> usize {
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Runs one frame, invoking every registered decoration once.
    pub fn tick(&self) -> Frame {
        let number = self.frames.fetch_add(1, Ordering::Relaxed) + 1;
        let mut frame = Frame {
            number,
            overlays: Vec::new(),
        };

        if !self.has_active_viewport() {
            log::trace!("Frame {number}: no viewport, skipping decorations");
            return frame;
        }

        // Snapshot the list so a decoration may (un)register without deadlock.
        let decorations: Vec<Arc<dyn Decoration>> = self
            .registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        for decoration in decorations {
            decoration.decorate(&mut frame);
        }

        frame
    }
}

impl RenderHost for FrameLoop {
    fn has_active_viewport(&self) -> bool {
        self.view_range().is_some()
    }

    fn register_decoration(
        &self,
        decoration: Arc<dyn Decoration>,
    ) -> Result<RegistrationHandle, HostError> {
        if !self.has_active_viewport() {
            return Err(HostError::NoActiveViewport);
        }
        let handle = RegistrationHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle, decoration);
        log::debug!("Registered decoration {handle:?}");
        Ok(handle)
    }

    fn unregister_decoration(&self, handle: RegistrationHandle) {
        let removed = self
            .registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle);
        if removed.is_some() {
            log::debug!("Unregistered decoration {handle:?}");
        }
    }

    fn compute_view_range(&self) -> Option<Range2d> {
        self.view_range()
    }
}
