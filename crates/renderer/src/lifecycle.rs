//! Lifecycle orchestration for one mounted background.
//!
//! ```text
//!   Unmounted ──mount──▶ DetectingCapability ──absent──▶ Unsupported
//!       ▲                        │
//!       │                     present
//!       │                        ▼
//!       └──teardown── Ready ◀── Initializing ──error──▶ Failed
//! ```
//!
//! The animation loop is cooperative: every frame callback re-arms the next
//! one, and the scheduled [`AnimationHandle`] doubles as the cancellation
//! token. A callback whose handle does not match is stale and never renders.

use std::fmt;
use std::task::Poll;
use std::time::Instant;

use tracing::{debug, error, info, trace, warn};

use crate::error::{FrameError, InitError, Severity};
use crate::fade::FadeEnvelope;
use crate::gpu::Capability;
use crate::host::{DeviceRequest, FrameRenderer, GpuHost};
use crate::overlay::{DebugOverlay, FrameStats, OverlaySnapshot};
use crate::runtime::{AnimationHandle, FrameScheduler};
use crate::types::{BackgroundOptions, FrameInputs, SurfaceSize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unmounted,
    DetectingCapability,
    Unsupported,
    Initializing,
    Ready,
    Failed,
}

impl LifecycleState {
    fn label(self) -> &'static str {
        match self {
            LifecycleState::Unmounted => "unmounted",
            LifecycleState::DetectingCapability => "detecting",
            LifecycleState::Unsupported => "unsupported",
            LifecycleState::Initializing => "initializing",
            LifecycleState::Ready => "ready",
            LifecycleState::Failed => "failed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What should be on screen at a given instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Presentation {
    /// Opacity of the static dot grid, `0.0..=1.0`.
    pub fallback_opacity: f32,
    /// Whether GPU frames are being presented.
    pub gpu_visible: bool,
}

impl Presentation {
    const FALLBACK_ONLY: Presentation = Presentation {
        fallback_opacity: 1.0,
        gpu_visible: false,
    };
}

/// Orchestrates capability detection, initialization, the frame loop, and
/// teardown for one drawing surface.
pub struct Background<H: GpuHost> {
    host: H,
    options: BackgroundOptions,
    state: LifecycleState,
    capability: Option<Capability>,
    pending: Option<DeviceRequest<H::Device>>,
    renderer: Option<H::Renderer>,
    scheduled: Option<AnimationHandle>,
    visible: bool,
    size: SurfaceSize,
    pointer: [f32; 2],
    scroll: f32,
    overlay: DebugOverlay,
    stats: FrameStats,
    fade: Option<FadeEnvelope>,
    last_error: Option<String>,
}

impl<H: GpuHost> Background<H> {
    pub fn new(host: H, options: BackgroundOptions, size: SurfaceSize) -> Self {
        Self {
            host,
            options,
            state: LifecycleState::Unmounted,
            capability: None,
            pending: None,
            renderer: None,
            scheduled: None,
            visible: true,
            size,
            pointer: [0.0, 0.0],
            scroll: 0.0,
            overlay: DebugOverlay::new(options.flags.enable_debug_overlay),
            stats: FrameStats::new(options.thresholds),
            fade: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Capability flag for the current mount; false before detection ran.
    pub fn is_supported(&self) -> bool {
        self.capability
            .as_ref()
            .map(Capability::is_supported)
            .unwrap_or(false)
    }

    /// Readiness flag: true only while GPU frames are being produced.
    pub fn is_ready(&self) -> bool {
        self.state == LifecycleState::Ready
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    #[cfg(test)]
    fn scheduled_frame(&self) -> Option<AnimationHandle> {
        self.scheduled
    }

    #[cfg(test)]
    fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Runs capability detection and, when supported, starts initialization.
    pub fn mount(&mut self, scheduler: &mut impl FrameScheduler) {
        if self.state != LifecycleState::Unmounted {
            debug!(state = %self.state, "background already mounted; ignoring mount");
            return;
        }

        self.state = LifecycleState::DetectingCapability;
        let capability = self.host.detect_capability();
        debug!(%capability, "GPU capability detected");
        let supported = capability.is_supported();
        self.capability = Some(capability);

        if !supported {
            info!("GPU rendering not supported; showing static background");
            self.state = LifecycleState::Unsupported;
            return;
        }

        self.state = LifecycleState::Initializing;
        self.pending = Some(self.host.request_device());
        self.poll_initialization(scheduler);
    }

    /// Resolves the pending device request, if it has completed.
    ///
    /// Safe to call at any time; only has an effect while initializing.
    pub fn poll_initialization(&mut self, scheduler: &mut impl FrameScheduler) -> LifecycleState {
        if self.state != LifecycleState::Initializing {
            return self.state;
        }
        let Some(pending) = self.pending.take() else {
            return self.state;
        };

        let device = match pending.poll() {
            Poll::Pending => {
                self.pending = Some(pending);
                return self.state;
            }
            Poll::Ready(Ok(device)) => device,
            Poll::Ready(Err(err)) => {
                self.fail(err);
                return self.state;
            }
        };

        match self.host.build_renderer(device, self.size) {
            Ok(renderer) => {
                self.renderer = Some(renderer);
                self.state = LifecycleState::Ready;
                self.fade = if self.options.flags.enable_fallback_transition {
                    FadeEnvelope::new(self.options.fallback_fade, Instant::now())
                } else {
                    None
                };
                debug!(size = %self.size, "GPU background ready");
                self.schedule(scheduler);
            }
            Err(err) => self.fail(err),
        }
        self.state
    }

    fn fail(&mut self, err: InitError) {
        match err.severity() {
            Severity::Environment => {
                warn!(error = %err, "GPU initialization failed; using static background")
            }
            Severity::Programming => {
                error!(error = %err, "GPU initialization failed; using static background")
            }
        }
        self.last_error = Some(err.to_string());
        self.pending = None;
        self.state = LifecycleState::Failed;
    }

    fn schedule(&mut self, scheduler: &mut impl FrameScheduler) {
        if self.state == LifecycleState::Ready && self.visible && self.scheduled.is_none() {
            self.scheduled = Some(scheduler.request_frame());
        }
    }

    fn cancel_scheduled(&mut self, scheduler: &mut impl FrameScheduler) {
        if let Some(handle) = self.scheduled.take() {
            scheduler.cancel_frame(handle);
        }
    }

    /// Frame callback delivered by the host scheduler.
    pub fn on_frame(
        &mut self,
        handle: AnimationHandle,
        time_ms: f64,
        scheduler: &mut impl FrameScheduler,
    ) {
        if self.state != LifecycleState::Ready || self.scheduled != Some(handle) {
            trace!(handle = handle.raw(), "ignoring stale frame callback");
            return;
        }
        self.scheduled = None;

        let now = Instant::now();
        if self.fade.is_some_and(|fade| fade.finished(now)) {
            debug!("fallback fade finished");
            self.fade = None;
        }
        let inputs = self.sample_inputs(time_ms, now);
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        let started = Instant::now();
        match renderer.render(&inputs) {
            Ok(()) => {
                let warnings = self.stats.record(time_ms, started.elapsed());
                if self.options.flags.enable_performance_monitoring {
                    for warning in warnings {
                        warn!(%warning, "performance threshold exceeded");
                    }
                }
            }
            Err(FrameError::Acquire(err)) => {
                if self.options.flags.enable_performance_monitoring {
                    debug!(error = %err, "skipping frame");
                } else {
                    trace!(error = %err, "skipping frame");
                }
            }
            Err(FrameError::Fatal(reason)) => {
                error!(%reason, "GPU renderer stopped; using static background");
                if let Some(mut renderer) = self.renderer.take() {
                    renderer.release();
                }
                self.last_error = Some(reason);
                self.state = LifecycleState::Failed;
                return;
            }
        }

        self.schedule(scheduler);
    }

    fn sample_inputs(&self, time_ms: f64, now: Instant) -> FrameInputs {
        let flags = &self.options.flags;
        FrameInputs {
            time_ms,
            resolution: self.size,
            scroll_offset: if flags.enable_scroll_parallax {
                self.scroll
            } else {
                0.0
            },
            pointer: if flags.enable_mouse_interaction {
                self.pointer
            } else {
                [0.0, 0.0]
            },
            fallback_opacity: self.presentation(now).fallback_opacity,
        }
    }

    /// Records the new surface size; the next frame renders at it.
    pub fn resize(&mut self, size: SurfaceSize) {
        if size == self.size {
            return;
        }
        self.size = size;
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.resize(size);
        }
    }

    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        if self.options.flags.enable_mouse_interaction {
            self.pointer = [x, y];
        }
    }

    pub fn scrolled_to(&mut self, offset: f32) {
        if self.options.flags.enable_scroll_parallax {
            self.scroll = offset.max(0.0);
        }
    }

    pub fn scrolled_by(&mut self, delta: f32) {
        self.scrolled_to(self.scroll + delta);
    }

    /// Stops the loop while hidden and restarts it when shown again.
    pub fn set_visible(&mut self, visible: bool, scheduler: &mut impl FrameScheduler) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        if visible {
            self.stats.restart_window();
            self.schedule(scheduler);
        } else {
            self.cancel_scheduled(scheduler);
        }
        debug!(visible, "background visibility changed");
    }

    /// Flips overlay visibility; returns the new visibility.
    pub fn toggle_debug_overlay(&mut self) -> bool {
        let visible = self.overlay.toggle();
        debug!(visible, "debug overlay toggled");
        visible
    }

    pub fn overlay_visible(&self) -> bool {
        self.overlay.is_visible()
    }

    /// Overlay status line, or `None` while the overlay is hidden.
    pub fn overlay_text(&self) -> Option<String> {
        if !self.overlay.is_visible() {
            return None;
        }
        let snapshot = OverlaySnapshot {
            status: self.state.label(),
            size: self.size,
            pointer: self.pointer,
            scroll: self.scroll,
            fps: self.stats.fps(),
            average_render_time: self.stats.average_render_time(),
            within_budget: self.stats.within_budget(),
            adapter: self
                .renderer
                .as_ref()
                .and_then(|renderer| renderer.adapter_profile()),
        };
        Some(snapshot.to_string())
    }

    /// Composition of fallback and GPU output at `now`.
    pub fn presentation(&self, now: Instant) -> Presentation {
        if self.state != LifecycleState::Ready {
            return Presentation::FALLBACK_ONLY;
        }
        let fallback_opacity = self.fade.map(|fade| fade.opacity(now)).unwrap_or(0.0);
        Presentation {
            fallback_opacity,
            gpu_visible: true,
        }
    }

    /// True while GPU frames still carry a fading fallback layer.
    pub fn transition_active(&self, now: Instant) -> bool {
        self.state == LifecycleState::Ready && self.fade.is_some_and(|fade| !fade.finished(now))
    }

    /// Cancels the loop, abandons initialization, and releases GPU resources.
    ///
    /// Idempotent; a later `mount` starts over with a fresh device.
    pub fn teardown(&mut self, scheduler: &mut impl FrameScheduler) {
        if self.state == LifecycleState::Unmounted {
            return;
        }
        self.cancel_scheduled(scheduler);
        if self.pending.take().is_some() {
            debug!("abandoning pending device request");
        }
        if let Some(mut renderer) = self.renderer.take() {
            renderer.release();
        }
        self.capability = None;
        self.fade = None;
        self.stats.reset();
        self.state = LifecycleState::Unmounted;
        debug!("background torn down");
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use settings::{FeatureFlags, PerformanceThresholds, Profile};

    use super::*;
    use crate::host::DeviceResolver;

    #[derive(Debug, Default)]
    struct Journal {
        device_requests: usize,
        renderers_built: usize,
        frames: Vec<FrameInputs>,
        resizes: Vec<SurfaceSize>,
        releases: usize,
        bind_groups_created: usize,
    }

    type SharedJournal = Rc<RefCell<Journal>>;

    enum DeviceMode {
        Immediate,
        Deferred,
        Fails(fn() -> InitError),
    }

    struct FakeHost {
        supported: bool,
        device_mode: DeviceMode,
        build_error: Option<fn() -> InitError>,
        resolvers: Vec<DeviceResolver<u32>>,
        journal: SharedJournal,
        next_device: u32,
    }

    impl FakeHost {
        fn new(journal: &SharedJournal) -> Self {
            Self {
                supported: true,
                device_mode: DeviceMode::Immediate,
                build_error: None,
                resolvers: Vec::new(),
                journal: Rc::clone(journal),
                next_device: 0,
            }
        }
    }

    struct FakeRenderer {
        journal: SharedJournal,
        bind_group: crate::gpu::BindGroupState<u32>,
        fail_next: Option<FrameError>,
    }

    impl FrameRenderer for FakeRenderer {
        fn render(&mut self, inputs: &FrameInputs) -> Result<(), FrameError> {
            if let Some(err) = self.fail_next.take() {
                return Err(err);
            }
            let journal = Rc::clone(&self.journal);
            self.bind_group.get_or_bind(|| {
                journal.borrow_mut().bind_groups_created += 1;
                1
            });
            self.journal.borrow_mut().frames.push(*inputs);
            Ok(())
        }

        fn resize(&mut self, size: SurfaceSize) {
            self.journal.borrow_mut().resizes.push(size);
        }

        fn release(&mut self) {
            self.journal.borrow_mut().releases += 1;
        }
    }

    impl GpuHost for FakeHost {
        type Device = u32;
        type Renderer = FakeRenderer;

        fn detect_capability(&self) -> Capability {
            if self.supported {
                Capability::Available {
                    backends: wgpu::Backends::VULKAN,
                }
            } else {
                Capability::Absent {
                    reason: "no graphics API".to_string(),
                }
            }
        }

        fn request_device(&mut self) -> DeviceRequest<u32> {
            self.journal.borrow_mut().device_requests += 1;
            self.next_device += 1;
            match self.device_mode {
                DeviceMode::Immediate => DeviceRequest::ready(Ok(self.next_device)),
                DeviceMode::Fails(make) => DeviceRequest::ready(Err(make())),
                DeviceMode::Deferred => {
                    let (resolver, request) = DeviceRequest::channel();
                    self.resolvers.push(resolver);
                    request
                }
            }
        }

        fn build_renderer(
            &mut self,
            _device: u32,
            _size: SurfaceSize,
        ) -> Result<FakeRenderer, InitError> {
            if let Some(make) = self.build_error {
                return Err(make());
            }
            self.journal.borrow_mut().renderers_built += 1;
            Ok(FakeRenderer {
                journal: Rc::clone(&self.journal),
                bind_group: Default::default(),
                fail_next: None,
            })
        }
    }

    #[derive(Debug, Default)]
    struct FakeScheduler {
        next: u64,
        requested: Vec<AnimationHandle>,
        cancelled: Vec<AnimationHandle>,
    }

    impl FakeScheduler {
        fn last(&self) -> AnimationHandle {
            *self.requested.last().expect("a frame was requested")
        }
    }

    impl FrameScheduler for FakeScheduler {
        fn request_frame(&mut self) -> AnimationHandle {
            self.next += 1;
            let handle = AnimationHandle::from_raw(self.next);
            self.requested.push(handle);
            handle
        }

        fn cancel_frame(&mut self, handle: AnimationHandle) {
            self.cancelled.push(handle);
        }
    }

    fn no_adapter() -> InitError {
        InitError::NoAdapter
    }

    fn shader_error() -> InitError {
        InitError::ShaderCompilation("unexpected token".into())
    }

    fn production_options() -> BackgroundOptions {
        BackgroundOptions {
            flags: FeatureFlags::for_profile(Profile::Production),
            thresholds: PerformanceThresholds::default(),
            fallback_fade: Duration::from_secs(1),
        }
    }

    fn mounted(host: FakeHost, options: BackgroundOptions) -> (Background<FakeHost>, FakeScheduler) {
        let mut background = Background::new(host, options, SurfaceSize::new(800, 600));
        let mut scheduler = FakeScheduler::default();
        background.mount(&mut scheduler);
        (background, scheduler)
    }

    fn run_frames(
        background: &mut Background<FakeHost>,
        scheduler: &mut FakeScheduler,
        count: usize,
        start_ms: f64,
    ) {
        for index in 0..count {
            let handle = scheduler.last();
            background.on_frame(handle, start_ms + index as f64 * 16.0, scheduler);
        }
    }

    #[test]
    fn unsupported_host_never_requests_a_device() {
        let journal = SharedJournal::default();
        let mut host = FakeHost::new(&journal);
        host.supported = false;
        let (background, scheduler) = mounted(host, production_options());

        assert_eq!(background.state(), LifecycleState::Unsupported);
        assert!(!background.is_supported());
        assert!(!background.is_ready());
        assert_eq!(journal.borrow().device_requests, 0);
        assert!(scheduler.requested.is_empty());
        assert_eq!(
            background.presentation(Instant::now()),
            Presentation::FALLBACK_ONLY
        );
    }

    #[test]
    fn supported_host_reaches_ready_and_animates() {
        let journal = SharedJournal::default();
        let (mut background, mut scheduler) = mounted(FakeHost::new(&journal), production_options());

        assert!(background.is_supported());
        assert!(background.is_ready());
        assert_eq!(journal.borrow().renderers_built, 1);
        assert_eq!(scheduler.requested.len(), 1);

        run_frames(&mut background, &mut scheduler, 3, 0.0);
        let journal = journal.borrow();
        assert_eq!(journal.frames.len(), 3);
        assert_eq!(journal.frames[2].time_ms, 32.0);
        assert_eq!(scheduler.requested.len(), 4);
    }

    #[test]
    fn teardown_is_idempotent_and_releases_once() {
        let journal = SharedJournal::default();
        let (mut background, mut scheduler) = mounted(FakeHost::new(&journal), production_options());
        run_frames(&mut background, &mut scheduler, 2, 0.0);

        background.teardown(&mut scheduler);
        background.teardown(&mut scheduler);

        assert_eq!(background.state(), LifecycleState::Unmounted);
        assert_eq!(journal.borrow().releases, 1);
        assert_eq!(scheduler.cancelled, vec![scheduler.last()]);
        assert!(background.scheduled_frame().is_none());
    }

    #[test]
    fn callbacks_after_teardown_do_not_render() {
        let journal = SharedJournal::default();
        let (mut background, mut scheduler) = mounted(FakeHost::new(&journal), production_options());
        let handle = scheduler.last();
        background.teardown(&mut scheduler);

        background.on_frame(handle, 16.0, &mut scheduler);
        assert!(journal.borrow().frames.is_empty());
        assert_eq!(scheduler.requested.len(), 1);
    }

    #[test]
    fn frames_sample_the_latest_pointer_and_scroll() {
        let journal = SharedJournal::default();
        let (mut background, mut scheduler) = mounted(FakeHost::new(&journal), production_options());

        background.pointer_moved(10.0, 20.0);
        background.scrolled_to(120.0);
        run_frames(&mut background, &mut scheduler, 1, 0.0);
        background.pointer_moved(30.0, 40.0);
        background.scrolled_by(-500.0);
        run_frames(&mut background, &mut scheduler, 1, 16.0);

        let journal = journal.borrow();
        assert_eq!(journal.frames[0].pointer, [10.0, 20.0]);
        assert_eq!(journal.frames[0].scroll_offset, 120.0);
        assert_eq!(journal.frames[1].pointer, [30.0, 40.0]);
        assert_eq!(journal.frames[1].scroll_offset, 0.0);
    }

    #[test]
    fn disabled_inputs_stay_at_origin() {
        let journal = SharedJournal::default();
        let mut options = production_options();
        options.flags.enable_mouse_interaction = false;
        options.flags.enable_scroll_parallax = false;
        let (mut background, mut scheduler) = mounted(FakeHost::new(&journal), options);

        background.pointer_moved(300.0, 200.0);
        background.scrolled_to(900.0);
        run_frames(&mut background, &mut scheduler, 1, 0.0);

        let frame = journal.borrow().frames[0];
        assert_eq!(frame.pointer, [0.0, 0.0]);
        assert_eq!(frame.scroll_offset, 0.0);
    }

    #[test]
    fn bind_group_is_created_once_across_frames() {
        let journal = SharedJournal::default();
        let (mut background, mut scheduler) = mounted(FakeHost::new(&journal), production_options());
        run_frames(&mut background, &mut scheduler, 10, 0.0);

        let journal = journal.borrow();
        assert_eq!(journal.frames.len(), 10);
        assert_eq!(journal.bind_groups_created, 1);
    }

    #[test]
    fn resize_reaches_next_frame_without_rebuilding() {
        let journal = SharedJournal::default();
        let (mut background, mut scheduler) = mounted(FakeHost::new(&journal), production_options());
        run_frames(&mut background, &mut scheduler, 1, 0.0);

        background.resize(SurfaceSize::new(1600, 1200));
        background.resize(SurfaceSize::new(1600, 1200));
        run_frames(&mut background, &mut scheduler, 1, 16.0);

        let journal = journal.borrow();
        assert_eq!(journal.resizes, vec![SurfaceSize::new(1600, 1200)]);
        assert_eq!(journal.frames.len(), 2);
        assert_eq!(journal.frames[0].resolution, SurfaceSize::new(800, 600));
        assert_eq!(journal.frames[1].resolution, SurfaceSize::new(1600, 1200));
        assert_eq!(journal.renderers_built, 1);
        assert_eq!(journal.device_requests, 1);
    }

    #[test]
    fn late_device_after_teardown_builds_nothing() {
        let journal = SharedJournal::default();
        let mut host = FakeHost::new(&journal);
        host.device_mode = DeviceMode::Deferred;
        let (mut background, mut scheduler) = mounted(host, production_options());
        assert_eq!(background.state(), LifecycleState::Initializing);

        background.teardown(&mut scheduler);
        let resolver = background
            .host_mut()
            .resolvers
            .pop()
            .expect("device request in flight");
        assert!(!resolver.resolve(Ok(9)));
        background.poll_initialization(&mut scheduler);

        assert_eq!(background.state(), LifecycleState::Unmounted);
        assert_eq!(journal.borrow().renderers_built, 0);
        assert!(scheduler.requested.is_empty());
    }

    #[test]
    fn deferred_device_is_picked_up_by_polling() {
        let journal = SharedJournal::default();
        let mut host = FakeHost::new(&journal);
        host.device_mode = DeviceMode::Deferred;
        let (mut background, mut scheduler) = mounted(host, production_options());

        assert_eq!(
            background.poll_initialization(&mut scheduler),
            LifecycleState::Initializing
        );
        assert_eq!(
            background.presentation(Instant::now()),
            Presentation::FALLBACK_ONLY
        );

        let resolver = background.host_mut().resolvers.pop().expect("resolver");
        assert!(resolver.resolve(Ok(1)));
        assert_eq!(
            background.poll_initialization(&mut scheduler),
            LifecycleState::Ready
        );
        assert_eq!(scheduler.requested.len(), 1);
    }

    #[test]
    fn missing_adapter_fails_to_fallback() {
        let journal = SharedJournal::default();
        let mut host = FakeHost::new(&journal);
        host.device_mode = DeviceMode::Fails(no_adapter);
        let (background, scheduler) = mounted(host, production_options());

        assert_eq!(background.state(), LifecycleState::Failed);
        assert!(background.is_supported());
        assert!(!background.is_ready());
        assert!(scheduler.requested.is_empty());
        assert_eq!(journal.borrow().renderers_built, 0);
        assert!(background.last_error().is_some());
    }

    #[test]
    fn shader_errors_fail_without_animating() {
        let journal = SharedJournal::default();
        let mut host = FakeHost::new(&journal);
        host.build_error = Some(shader_error);
        let (mut background, mut scheduler) = mounted(host, production_options());

        assert_eq!(background.state(), LifecycleState::Failed);
        assert!(scheduler.requested.is_empty());

        background.on_frame(AnimationHandle::from_raw(1), 0.0, &mut scheduler);
        assert!(journal.borrow().frames.is_empty());
    }

    #[test]
    fn abandoned_worker_fails_initialization() {
        let journal = SharedJournal::default();
        let mut host = FakeHost::new(&journal);
        host.device_mode = DeviceMode::Deferred;
        let (mut background, mut scheduler) = mounted(host, production_options());

        background.host_mut().resolvers.clear();
        assert_eq!(
            background.poll_initialization(&mut scheduler),
            LifecycleState::Failed
        );
    }

    #[test]
    fn skipped_frames_keep_the_loop_alive() {
        let journal = SharedJournal::default();
        let (mut background, mut scheduler) = mounted(FakeHost::new(&journal), production_options());
        if let Some(renderer) = background.renderer.as_mut() {
            renderer.fail_next = Some(FrameError::Acquire(wgpu::SurfaceError::Timeout));
        }

        run_frames(&mut background, &mut scheduler, 2, 0.0);
        assert_eq!(background.state(), LifecycleState::Ready);
        assert_eq!(journal.borrow().frames.len(), 1);
        assert_eq!(scheduler.requested.len(), 3);
    }

    #[test]
    fn fatal_frame_error_drops_to_fallback() {
        let journal = SharedJournal::default();
        let (mut background, mut scheduler) = mounted(FakeHost::new(&journal), production_options());
        if let Some(renderer) = background.renderer.as_mut() {
            renderer.fail_next = Some(FrameError::Fatal("out of memory".into()));
        }

        run_frames(&mut background, &mut scheduler, 1, 0.0);
        assert_eq!(background.state(), LifecycleState::Failed);
        assert_eq!(journal.borrow().releases, 1);
        assert!(background.scheduled_frame().is_none());

        background.teardown(&mut scheduler);
        assert_eq!(journal.borrow().releases, 1);
    }

    #[test]
    fn stale_handles_are_ignored() {
        let journal = SharedJournal::default();
        let (mut background, mut scheduler) = mounted(FakeHost::new(&journal), production_options());
        let first = scheduler.last();
        background.on_frame(first, 0.0, &mut scheduler);
        background.on_frame(first, 16.0, &mut scheduler);

        assert_eq!(journal.borrow().frames.len(), 1);
        assert_eq!(scheduler.requested.len(), 2);
    }

    #[test]
    fn hidden_background_stops_and_resumes() {
        let journal = SharedJournal::default();
        let (mut background, mut scheduler) = mounted(FakeHost::new(&journal), production_options());
        let before_hide = scheduler.last();

        background.set_visible(false, &mut scheduler);
        assert_eq!(scheduler.cancelled, vec![before_hide]);
        background.on_frame(before_hide, 0.0, &mut scheduler);
        assert!(journal.borrow().frames.is_empty());

        background.set_visible(true, &mut scheduler);
        run_frames(&mut background, &mut scheduler, 1, 16.0);
        assert_eq!(journal.borrow().frames.len(), 1);
        assert_eq!(background.scheduled_frame(), Some(scheduler.last()));
    }

    #[test]
    fn resumed_loop_does_not_count_hidden_time() {
        let journal = SharedJournal::default();
        let mut options = production_options();
        options.flags.enable_performance_monitoring = true;
        let (mut background, mut scheduler) = mounted(FakeHost::new(&journal), options);
        run_frames(&mut background, &mut scheduler, 64, 0.0);
        let before = background.stats.fps();
        assert!(before > 55.0, "fps {before}");

        background.set_visible(false, &mut scheduler);
        background.set_visible(true, &mut scheduler);
        run_frames(&mut background, &mut scheduler, 1, 10_900.0);
        assert_eq!(background.stats.fps(), before);

        run_frames(&mut background, &mut scheduler, 64, 10_916.0);
        assert!(background.stats.fps() > 55.0, "fps {}", background.stats.fps());
        assert!(background.stats.within_budget());
    }

    #[test]
    fn first_frames_carry_the_fading_fallback() {
        let journal = SharedJournal::default();
        let mut options = production_options();
        options.fallback_fade = Duration::from_secs(10);
        let (mut background, mut scheduler) = mounted(FakeHost::new(&journal), options);
        assert!(background.transition_active(Instant::now()));

        run_frames(&mut background, &mut scheduler, 1, 0.0);
        let frame = journal.borrow().frames[0];
        assert!(frame.fallback_opacity > 0.9, "{}", frame.fallback_opacity);
    }

    #[test]
    fn finished_fade_leaves_frames_opaque() {
        let journal = SharedJournal::default();
        let mut options = production_options();
        options.fallback_fade = Duration::from_millis(1);
        let (mut background, mut scheduler) = mounted(FakeHost::new(&journal), options);
        std::thread::sleep(Duration::from_millis(5));

        assert!(!background.transition_active(Instant::now()));
        run_frames(&mut background, &mut scheduler, 1, 0.0);
        assert!(background.fade.is_none());
        assert_eq!(journal.borrow().frames[0].fallback_opacity, 0.0);
    }

    #[test]
    fn no_transition_means_no_fallback_in_frames() {
        let journal = SharedJournal::default();
        let mut options = production_options();
        options.flags.enable_fallback_transition = false;
        let (mut background, mut scheduler) = mounted(FakeHost::new(&journal), options);

        assert!(!background.transition_active(Instant::now()));
        run_frames(&mut background, &mut scheduler, 1, 0.0);
        assert_eq!(journal.borrow().frames[0].fallback_opacity, 0.0);
    }

    #[test]
    fn fallback_states_never_report_a_transition() {
        let journal = SharedJournal::default();
        let mut host = FakeHost::new(&journal);
        host.device_mode = DeviceMode::Deferred;
        let (background, _scheduler) = mounted(host, production_options());

        assert_eq!(background.state(), LifecycleState::Initializing);
        assert!(!background.transition_active(Instant::now()));
        assert!(!background.presentation(Instant::now()).gpu_visible);
    }

    #[test]
    fn remount_creates_a_fresh_device() {
        let journal = SharedJournal::default();
        let (mut background, mut scheduler) = mounted(FakeHost::new(&journal), production_options());
        background.teardown(&mut scheduler);
        background.mount(&mut scheduler);

        assert!(background.is_ready());
        let journal = journal.borrow();
        assert_eq!(journal.device_requests, 2);
        assert_eq!(journal.renderers_built, 2);
    }

    #[test]
    fn mounting_twice_is_ignored() {
        let journal = SharedJournal::default();
        let (mut background, mut scheduler) = mounted(FakeHost::new(&journal), production_options());
        background.mount(&mut scheduler);
        assert_eq!(journal.borrow().device_requests, 1);
        assert_eq!(scheduler.requested.len(), 1);
    }

    #[test]
    fn fallback_fades_out_after_ready() {
        let journal = SharedJournal::default();
        let (background, _scheduler) = mounted(FakeHost::new(&journal), production_options());

        let now = Instant::now();
        let early = background.presentation(now);
        assert!(early.gpu_visible);
        assert!(early.fallback_opacity > 0.5);
        let late = background.presentation(now + Duration::from_secs(2));
        assert_eq!(late.fallback_opacity, 0.0);
    }

    #[test]
    fn fallback_cuts_instantly_without_transition() {
        let journal = SharedJournal::default();
        let mut options = production_options();
        options.flags.enable_fallback_transition = false;
        let (background, _scheduler) = mounted(FakeHost::new(&journal), options);

        let presentation = background.presentation(Instant::now());
        assert_eq!(presentation.fallback_opacity, 0.0);
        assert!(presentation.gpu_visible);
    }

    #[test]
    fn overlay_follows_flag_and_toggle() {
        let journal = SharedJournal::default();
        let (mut hidden, _) = mounted(FakeHost::new(&journal), production_options());
        assert!(hidden.overlay_text().is_none());
        assert!(!hidden.toggle_debug_overlay());

        let mut options = production_options();
        options.flags = options.flags.with_debug();
        let (mut shown, _) = mounted(FakeHost::new(&journal), options);
        let text = shown.overlay_text().expect("overlay visible");
        assert!(text.starts_with("ready | 800x600"), "{text}");
        assert!(!shown.toggle_debug_overlay());
        assert!(shown.overlay_text().is_none());
    }
}
