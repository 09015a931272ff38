use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::ModifiersState;
use winit::window::{Window, WindowBuilder};

use tracing::{debug, info, warn};

use crate::gpu::{backends_with_env, WgpuHost};
use crate::input::{is_debug_chord, scroll_delta_px};
use crate::lifecycle::{Background, LifecycleState};
use crate::runtime::{AnimationHandle, FrameScheduler, SystemTimeSource, TimeSource};
use crate::software::SoftwareSurface;
use crate::types::{RendererConfig, SurfaceSize};

/// How often the event loop wakes to poll a pending device request.
const INIT_POLL_INTERVAL: Duration = Duration::from_millis(16);
/// Wake-up spacing while the fallback fades out over GPU frames.
const FADE_TICK: Duration = Duration::from_millis(16);
/// Minimum spacing between overlay title refreshes.
const TITLE_REFRESH_INTERVAL: Duration = Duration::from_millis(500);

/// Frame scheduler backed by `Window::request_redraw`.
///
/// winit coalesces redraw requests, so at most one handle is outstanding; a
/// redraw arriving with no outstanding handle was requested by the platform
/// and is not a frame callback.
pub(crate) struct RedrawScheduler {
    window: Arc<Window>,
    next: u64,
    outstanding: Option<AnimationHandle>,
}

impl RedrawScheduler {
    pub(crate) fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            next: 0,
            outstanding: None,
        }
    }

    fn take_outstanding(&mut self) -> Option<AnimationHandle> {
        self.outstanding.take()
    }
}

impl FrameScheduler for RedrawScheduler {
    fn request_frame(&mut self) -> AnimationHandle {
        self.next = self.next.wrapping_add(1);
        let handle = AnimationHandle::from_raw(self.next);
        self.outstanding = Some(handle);
        self.window.request_redraw();
        handle
    }

    fn cancel_frame(&mut self, handle: AnimationHandle) {
        if self.outstanding == Some(handle) {
            self.outstanding = None;
        }
    }
}

/// Window title plus its throttled overlay suffix.
struct TitleWriter {
    base: String,
    last_refresh: Option<Instant>,
    showing_overlay: bool,
}

impl TitleWriter {
    fn new(base: String) -> Self {
        Self {
            base,
            last_refresh: None,
            showing_overlay: false,
        }
    }

    fn refresh(&mut self, window: &Window, background: &Background<WgpuHost>, force: bool) {
        let now = Instant::now();
        let due = self
            .last_refresh
            .map_or(true, |last| now.duration_since(last) >= TITLE_REFRESH_INTERVAL);
        if !force && !due {
            return;
        }
        self.last_refresh = Some(now);

        match background.overlay_text() {
            Some(text) => {
                debug!(overlay = %text, "debug overlay");
                window.set_title(&format!("{} | {}", self.base, text));
                self.showing_overlay = true;
            }
            None if self.showing_overlay || force => {
                window.set_title(&self.base);
                self.showing_overlay = false;
            }
            None => {}
        }
    }
}

/// Keeps the CPU fallback on screen whenever GPU frames are not.
///
/// The softbuffer surface only exists while it is needed and is dropped as
/// soon as the GPU path takes over the window.
struct FallbackPainter {
    window: Arc<Window>,
    surface: Option<SoftwareSurface>,
    unavailable: bool,
}

impl FallbackPainter {
    fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            surface: None,
            unavailable: false,
        }
    }

    fn sync(&mut self, background: &Background<WgpuHost>) {
        if background.presentation(Instant::now()).gpu_visible {
            if self.surface.take().is_some() {
                debug!("GPU frames visible; dropped software fallback surface");
            }
            return;
        }
        if self.unavailable {
            return;
        }
        if self.surface.is_none() {
            match SoftwareSurface::new(Arc::clone(&self.window)) {
                Ok(surface) => self.surface = Some(surface),
                Err(err) => {
                    warn!(error = %err, "software fallback unavailable; window left blank");
                    self.unavailable = true;
                    return;
                }
            }
        }
        if let Some(surface) = self.surface.as_mut() {
            let size = SurfaceSize::from(self.window.inner_size());
            if let Err(err) = surface.present(size) {
                warn!(error = %err, "failed to present fallback background");
            }
        }
    }
}

/// Opens the window and drives the background until it is closed.
pub(crate) fn run_window(config: RendererConfig) -> Result<()> {
    let event_loop =
        EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(window_size)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create background window: {err}"))?;
    let window = Arc::new(window);

    let backends = backends_with_env(config.backend);
    let host = WgpuHost::new(
        Arc::clone(&window),
        backends,
        config.power,
        config.gpu_enabled,
    );
    let size = SurfaceSize::from(window.inner_size());
    let mut background = Background::new(host, config.options, size);
    let mut scheduler = RedrawScheduler::new(Arc::clone(&window));
    let mut clock = SystemTimeSource::new();
    let mut title = TitleWriter::new(config.title.clone());
    let mut fallback = FallbackPainter::new(Arc::clone(&window));
    let mut modifiers = ModifiersState::empty();

    clock.reset();
    background.mount(&mut scheduler);
    info!(
        state = %background.state(),
        supported = background.is_supported(),
        "background mounted"
    );
    title.refresh(&window, &background, true);
    window.request_redraw();

    let run_result = event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                background.teardown(&mut scheduler);
                elwt.exit();
            }
            WindowEvent::Resized(new_size) => {
                background.resize(SurfaceSize::from(new_size));
                window.request_redraw();
            }
            WindowEvent::Occluded(occluded) => {
                background.set_visible(!occluded, &mut scheduler);
            }
            WindowEvent::CursorMoved { position, .. } => {
                background.pointer_moved(position.x as f32, position.y as f32);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                background.scrolled_by(scroll_delta_px(delta));
            }
            WindowEvent::ModifiersChanged(state) => {
                modifiers = state.state();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed
                    && !event.repeat
                    && is_debug_chord(modifiers, &event.logical_key)
                {
                    background.toggle_debug_overlay();
                    title.refresh(&window, &background, true);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(handle) = scheduler.take_outstanding() {
                    background.on_frame(handle, clock.now_ms(), &mut scheduler);
                }
                fallback.sync(&background);
            }
            _ => {}
        },
        Event::AboutToWait => {
            let before = background.state();
            let state = background.poll_initialization(&mut scheduler);
            if state != before {
                info!(%state, "background state changed");
                if let Some(reason) = background.last_error() {
                    debug!(%reason, "static background remains visible");
                }
                title.refresh(&window, &background, true);
                window.request_redraw();
            } else {
                title.refresh(&window, &background, false);
            }

            let now = Instant::now();
            if state == LifecycleState::Initializing {
                elwt.set_control_flow(ControlFlow::WaitUntil(now + INIT_POLL_INTERVAL));
            } else if background.transition_active(now) {
                elwt.set_control_flow(ControlFlow::WaitUntil(now + FADE_TICK));
            } else if background.overlay_visible() {
                elwt.set_control_flow(ControlFlow::WaitUntil(
                    Instant::now() + TITLE_REFRESH_INTERVAL,
                ));
            } else {
                elwt.set_control_flow(ControlFlow::Wait);
            }
        }
        Event::LoopExiting => {
            background.teardown(&mut scheduler);
        }
        _ => {}
    });

    run_result.map_err(|err| anyhow!("background event loop error: {err}"))
}
