//! Decorator lifecycle orchestration.
//!
//! The registration handle is stored on the decorator itself, so any number
//! of controllers sharing one host agree on whether an instance is already
//! registered. Repeated enables never stack duplicate draw callbacks and
//! disables of unregistered instances are harmless. Controllers sharing a
//! decorator must also share its host.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::host::RenderHost;
use crate::{DecoratorError, DecoratorId, HeatmapDecorator};

/// Sets up, enables, disables and tears down heatmap decorators against one
/// shared render host.
pub struct HeatmapDecoratorController {
    host: Arc<dyn RenderHost>,
    /// Decorators this controller registered, released on drop.
    enabled: Mutex<BTreeMap<DecoratorId, HeatmapDecorator>>,
}

impl std::fmt::Debug for HeatmapDecoratorController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeatmapDecoratorController")
            .field("active", &self.active_count())
            .finish_non_exhaustive()
    }
}

impl HeatmapDecoratorController {
    #[must_use]
    pub fn new(host: Arc<dyn RenderHost>) -> Self {
        Self {
            host,
            enabled: Mutex::new(BTreeMap::new()),
        }
    }

    #[must_use]
    pub fn host(&self) -> &Arc<dyn RenderHost> {
        &self.host
    }

    /// Creates a decorator framed on the host's current view, if it has one.
    #[must_use]
    pub fn setup_decorator(&self) -> HeatmapDecorator {
        let decorator = HeatmapDecorator::new();
        if let Some(range) = self.host.compute_view_range().filter(|r| !r.is_null()) {
            // A fresh decorator cannot be disposed yet.
            let _ = decorator.set_range(range);
        }
        log::debug!("Set up decorator {}", decorator.id());
        decorator
    }

    /// Registers `decorator` with the host frame loop.
    ///
    /// Enabling an already registered decorator is a no-op, whichever
    /// controller registered it.
    ///
    /// # Errors
    ///
    /// * [`DecoratorError::AlreadyDisposed`] if the decorator was disposed.
    /// * [`DecoratorError::NoActiveViewport`] if the host has no render
    ///   context. Nothing is registered and the decorator is left
    ///   [`Disabled`](crate::DecoratorStatus::Disabled).
    pub fn enable_decorations(&self, decorator: &HeatmapDecorator) -> Result<(), DecoratorError> {
        match decorator.register_with(self.host.as_ref())? {
            Some(handle) => {
                self.lock().insert(decorator.id(), decorator.clone());
                log::debug!("Enabled decorator {} as {handle:?}", decorator.id());
            }
            None => log::trace!("Decorator {} already enabled", decorator.id()),
        }
        Ok(())
    }

    /// Unregisters `decorator`. Safe to call when it is not registered.
    pub fn disable_decorations(&self, decorator: &HeatmapDecorator) {
        self.lock().remove(&decorator.id());
        if decorator.unregister_from(self.host.as_ref()) {
            log::debug!("Disabled decorator {}", decorator.id());
        }
    }

    /// Disables then disposes `decorator`.
    pub fn teardown(&self, decorator: &HeatmapDecorator) {
        self.disable_decorations(decorator);
        decorator.dispose();
    }

    #[must_use]
    pub fn is_registered(&self, decorator: &HeatmapDecorator) -> bool {
        decorator.registration().is_some()
    }

    /// Number of decorators enabled through this controller that are still
    /// registered.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.lock()
            .values()
            .filter(|d| d.registration().is_some())
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<DecoratorId, HeatmapDecorator>> {
        self.enabled.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for HeatmapDecoratorController {
    fn drop(&mut self) {
        let enabled = std::mem::take(
            self.enabled
                .get_mut()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for decorator in enabled.into_values() {
            decorator.unregister_from(self.host.as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use issue_map_spatial::{Range2d, SpatialPoint};

    use super::*;
    use crate::host::{Decoration, FrameLoop, HostError, RegistrationHandle};
    use crate::DecoratorStatus;

    /// Host that counts registrations and can lose its viewport.
    struct CountingHost {
        viewport: bool,
        registered: AtomicUsize,
        unregistered: AtomicUsize,
    }

    impl CountingHost {
        fn new(viewport: bool) -> Arc<Self> {
            Arc::new(Self {
                viewport,
                registered: AtomicUsize::new(0),
                unregistered: AtomicUsize::new(0),
            })
        }
    }

    impl RenderHost for CountingHost {
        fn has_active_viewport(&self) -> bool {
            self.viewport
        }

        fn register_decoration(
            &self,
            _decoration: Arc<dyn Decoration>,
        ) -> Result<RegistrationHandle, HostError> {
            let n = self.registered.fetch_add(1, Ordering::SeqCst);
            Ok(RegistrationHandle(n as u64))
        }

        fn unregister_decoration(&self, _handle: RegistrationHandle) {
            self.unregistered.fetch_add(1, Ordering::SeqCst);
        }

        fn compute_view_range(&self) -> Option<Range2d> {
            None
        }
    }

    #[test]
    fn double_enable_registers_once() {
        let host = CountingHost::new(true);
        let controller = HeatmapDecoratorController::new(host.clone());
        let d = controller.setup_decorator();

        controller.enable_decorations(&d).unwrap();
        controller.enable_decorations(&d).unwrap();

        assert_eq!(host.registered.load(Ordering::SeqCst), 1);
        assert_eq!(controller.active_count(), 1);
        assert!(d.is_enabled());
    }

    #[test]
    fn disable_on_never_enabled_is_noop() {
        let host = CountingHost::new(true);
        let controller = HeatmapDecoratorController::new(host.clone());
        let d = controller.setup_decorator();

        controller.disable_decorations(&d);
        controller.disable_decorations(&d);

        assert_eq!(host.unregistered.load(Ordering::SeqCst), 0);
        assert_eq!(d.status(), DecoratorStatus::Constructed);
    }

    #[test]
    fn enable_without_viewport_leaves_decorator_unregistered() {
        let host = CountingHost::new(false);
        let controller = HeatmapDecoratorController::new(host.clone());
        let d = controller.setup_decorator();

        assert_eq!(
            controller.enable_decorations(&d),
            Err(DecoratorError::NoActiveViewport)
        );
        assert_eq!(host.registered.load(Ordering::SeqCst), 0);
        assert!(!controller.is_registered(&d));
        assert_eq!(d.status(), DecoratorStatus::Disabled);
        assert_eq!(d.registration(), None);
    }

    #[test]
    fn reenable_after_disable_registers_again_and_keeps_state() {
        let host = CountingHost::new(true);
        let controller = HeatmapDecoratorController::new(host.clone());
        let d = controller.setup_decorator();
        d.set_spread_factor(0.7).unwrap();

        controller.enable_decorations(&d).unwrap();
        controller.disable_decorations(&d);
        assert_eq!(d.status(), DecoratorStatus::Disabled);
        controller.enable_decorations(&d).unwrap();

        assert_eq!(host.registered.load(Ordering::SeqCst), 2);
        assert_eq!(host.unregistered.load(Ordering::SeqCst), 1);
        assert_eq!(d.spread_factor(), 0.7);
    }

    #[test]
    fn teardown_disposes_and_blocks_enable() {
        let host = CountingHost::new(true);
        let controller = HeatmapDecoratorController::new(host.clone());
        let d = controller.setup_decorator();
        controller.enable_decorations(&d).unwrap();

        controller.teardown(&d);

        assert!(d.is_disposed());
        assert_eq!(host.unregistered.load(Ordering::SeqCst), 1);
        assert_eq!(
            controller.enable_decorations(&d),
            Err(DecoratorError::AlreadyDisposed(d.id()))
        );
    }

    #[test]
    fn setup_frames_on_host_view() {
        let view = Range2d::from_xyxy(5.0, 50.0, 7.0, 62.0);
        let controller = HeatmapDecoratorController::new(Arc::new(FrameLoop::with_viewport(view)));
        assert_eq!(controller.setup_decorator().range(), view);
    }

    #[test]
    fn frames_read_live_state() {
        let host = Arc::new(FrameLoop::with_viewport(Range2d::from_xyxy(
            0.0, 0.0, 10.0, 10.0,
        )));
        let controller = HeatmapDecoratorController::new(host.clone());
        let d = controller.setup_decorator();

        let p1 = SpatialPoint::xy(1.0, 1.0);
        let p2 = SpatialPoint::xy(4.0, 3.0);
        d.set_points(vec![p1, p2]).unwrap();
        controller.enable_decorations(&d).unwrap();

        let frame = host.tick();
        assert_eq!(frame.overlays.len(), 1);
        assert_eq!(frame.overlays[0].points, vec![p1, p2]);

        d.set_points(Vec::new()).unwrap();
        let frame = host.tick();
        assert!(frame.overlays.is_empty());

        d.set_points(vec![p2]).unwrap();
        assert_eq!(host.tick().overlays[0].points, vec![p2]);

        controller.disable_decorations(&d);
        assert!(host.tick().overlays.is_empty());
        assert_eq!(host.registration_count(), 0);
    }

    #[test]
    fn dropping_controller_unregisters_everything() {
        let host = Arc::new(FrameLoop::with_viewport(Range2d::from_xyxy(
            0.0, 0.0, 1.0, 1.0,
        )));
        {
            let controller = HeatmapDecoratorController::new(host.clone());
            let a = controller.setup_decorator();
            let b = controller.setup_decorator();
            controller.enable_decorations(&a).unwrap();
            controller.enable_decorations(&b).unwrap();
            assert_eq!(host.registration_count(), 2);
        }
        assert_eq!(host.registration_count(), 0);
    }

    #[test]
    fn controllers_sharing_a_host_register_once() {
        let host = Arc::new(FrameLoop::with_viewport(Range2d::from_xyxy(
            0.0, 0.0, 10.0, 10.0,
        )));
        let a = HeatmapDecoratorController::new(host.clone());
        let b = HeatmapDecoratorController::new(host.clone());
        let d = a.setup_decorator();
        d.set_points(vec![SpatialPoint::xy(1.0, 1.0)]).unwrap();

        a.enable_decorations(&d).unwrap();
        b.enable_decorations(&d).unwrap();

        assert_eq!(host.registration_count(), 1);
        assert_eq!(host.tick().overlays.len(), 1);
        assert!(b.is_registered(&d));
        assert_eq!(a.active_count(), 1);
        assert_eq!(b.active_count(), 0);

        b.disable_decorations(&d);
        assert_eq!(host.registration_count(), 0);
        assert_eq!(a.active_count(), 0);
        assert!(host.tick().overlays.is_empty());

        b.enable_decorations(&d).unwrap();
        drop(b);
        assert_eq!(host.registration_count(), 0);
        assert!(!a.is_registered(&d));
    }

    #[test]
    fn disposed_decorator_is_never_registered() {
        let host = CountingHost::new(true);
        let controller = HeatmapDecoratorController::new(host.clone());
        let d = controller.setup_decorator();
        d.dispose();

        assert_eq!(
            controller.enable_decorations(&d),
            Err(DecoratorError::AlreadyDisposed(d.id()))
        );
        assert_eq!(host.registered.load(Ordering::SeqCst), 0);
        assert_eq!(d.registration(), None::<RegistrationHandle>);
    }
}
