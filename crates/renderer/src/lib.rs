//! Renderer crate for backdrop, the GPU-accelerated decorative background.
//!
//! The crate decides whether the GPU path can run at all, brings it up off the
//! event loop thread, and keeps a static dot grid on screen whenever it can't.
//! The overall flow is:
//!
//! ```text
//!   CLI / backdrop
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ winit event loop ──▶ Background (lifecycle)
//!                                              │
//!                        GpuHost ◀─────────────┤ mount / poll / teardown
//!                        FrameRenderer ◀───────┘ on_frame ─▶ 32-byte UBO ─▶ draw
//! ```
//!
//! `Background` owns the state machine and never touches wgpu directly; the
//! [`GpuHost`] and [`FrameRenderer`] traits are the only seams, implemented
//! for real by [`gpu::WgpuHost`]. Every initialization failure downgrades to
//! the [`FallbackPresenter`] instead of terminating the host.

mod fade;
mod software;
mod window;

pub mod error;
pub mod fallback;
pub mod gpu;
pub mod host;
pub mod input;
pub mod lifecycle;
pub mod overlay;
pub mod runtime;
pub mod types;

use anyhow::Result;
use image::RgbaImage;
use settings::BackendSetting;

pub use error::{FrameError, InitError, Severity};
pub use fallback::FallbackPresenter;
pub use gpu::Capability;
pub use host::{DeviceRequest, DeviceResolver, FrameRenderer, GpuHost};
pub use lifecycle::{Background, LifecycleState, Presentation};
pub use overlay::{FrameStats, PerformanceWarning};
pub use runtime::{AnimationHandle, FrameScheduler, SystemTimeSource, TimeSource};
pub use types::{
    AdapterProfile, BackgroundOptions, FrameInputs, GpuPowerPreference, RendererConfig,
    SurfaceSize,
};

/// Entry point that owns the configuration and launches the window.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Blocks on the event loop until the window closes.
    pub fn run(self) -> Result<()> {
        window::run_window(self.config)
    }
}

/// Result of [`probe`]: the capability verdict plus every visible adapter.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub capability: Capability,
    pub adapters: Vec<AdapterProfile>,
}

/// Headless capability check that also enumerates adapters.
///
/// No surface is created, so adapters listed here may still fail to present
/// to a particular window.
pub fn probe(backend: BackendSetting, gpu_enabled: bool) -> ProbeReport {
    let backends = gpu::backends_with_env(backend);
    let capability = gpu::detect(backends, gpu_enabled);
    let adapters = if capability.is_supported() {
        let instance = gpu::create_instance(capability.backends());
        instance
            .enumerate_adapters(capability.backends())
            .iter()
            .map(|adapter| AdapterProfile::from_wgpu(&adapter.get_info()))
            .collect()
    } else {
        Vec::new()
    };
    ProbeReport {
        capability,
        adapters,
    }
}

/// Renders the static fallback pattern at `size`.
pub fn render_fallback(size: SurfaceSize) -> RgbaImage {
    FallbackPresenter::new().render(size)
}
