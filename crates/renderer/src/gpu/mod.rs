//! wgpu side of the background renderer.
//!
//! - `capability` answers whether a graphics API entry point exists at all.
//! - `context` acquires adapter and device off the event loop thread, then
//!   binds the window surface at the host-preferred format.
//! - `shader` and `pipeline` compile the fixed WGSL stages into the one render
//!   pipeline the background ever uses.
//! - `resources` uploads the fullscreen quad and allocates the uniform buffer.
//! - `uniforms` packs frame inputs into the 32-byte uniform block.
//! - `state` glues everything together as a [`FrameRenderer`].
//!
//! [`WgpuHost`] is the [`GpuHost`] implementation the winit window drives.

mod capability;
mod context;
mod pipeline;
mod resources;
mod shader;
mod state;
mod uniforms;

use std::sync::Arc;

use winit::window::Window;

use crate::error::InitError;
use crate::host::{DeviceRequest, FrameRenderer, GpuHost};
use crate::types::{GpuPowerPreference, SurfaceSize};

pub use capability::{backends_with_env, detect, requested_backends, Capability};
pub use context::{acquire_device, DeviceGrant};
pub use state::{BackgroundRenderer, BindGroupState};

pub(crate) use context::create_instance;

/// Real GPU host bound to one winit window.
pub struct WgpuHost {
    window: Arc<Window>,
    backends: wgpu::Backends,
    power: GpuPowerPreference,
    gpu_enabled: bool,
}

impl WgpuHost {
    pub fn new(
        window: Arc<Window>,
        backends: wgpu::Backends,
        power: GpuPowerPreference,
        gpu_enabled: bool,
    ) -> Self {
        Self {
            window,
            backends,
            power,
            gpu_enabled,
        }
    }
}

impl GpuHost for WgpuHost {
    type Device = DeviceGrant;
    type Renderer = BackgroundRenderer;

    fn detect_capability(&self) -> Capability {
        detect(self.backends, self.gpu_enabled)
    }

    fn request_device(&mut self) -> DeviceRequest<DeviceGrant> {
        let instance = create_instance(self.backends);
        let surface = match context::create_surface(&instance, Arc::clone(&self.window)) {
            Ok(surface) => surface,
            Err(err) => return DeviceRequest::ready(Err(err)),
        };
        let power = self.power;
        DeviceRequest::spawn("backdrop-device", move || {
            pollster::block_on(acquire_device(instance, surface, power))
        })
    }

    fn build_renderer(
        &mut self,
        device: DeviceGrant,
        size: SurfaceSize,
    ) -> Result<BackgroundRenderer, InitError> {
        let renderer = BackgroundRenderer::new(device, size)?;
        if let Some(profile) = renderer.adapter_profile() {
            tracing::info!(adapter = %profile, "GPU background initialised");
        }
        Ok(renderer)
    }
}
