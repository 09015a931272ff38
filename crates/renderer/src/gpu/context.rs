use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::error::InitError;
use crate::types::{AdapterProfile, GpuPowerPreference, SurfaceSize};

/// Device handle produced by [`acquire_device`]; moved into [`GpuContext`].
pub struct DeviceGrant {
    pub instance: wgpu::Instance,
    pub surface: wgpu::Surface<'static>,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub profile: AdapterProfile,
}

pub(crate) fn create_instance(backends: wgpu::Backends) -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends,
        flags: wgpu::InstanceFlags::default(),
        memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
        backend_options: wgpu::BackendOptions::default(),
    })
}

/// Creates the presentation surface; must run on the thread owning the window.
pub(crate) fn create_surface<T>(
    instance: &wgpu::Instance,
    target: T,
) -> Result<wgpu::Surface<'static>, InitError>
where
    T: HasDisplayHandle + HasWindowHandle + Send + Sync + 'static,
{
    instance
        .create_surface(target)
        .map_err(|err| InitError::NoContext(err.to_string()))
}

/// Requests an adapter compatible with `surface` and a device from it.
///
/// Runs on the device worker thread under `pollster`; nothing global is
/// touched.
pub async fn acquire_device(
    instance: wgpu::Instance,
    surface: wgpu::Surface<'static>,
    power: GpuPowerPreference,
) -> Result<DeviceGrant, InitError> {
    let power_preference = match power {
        GpuPowerPreference::Low => wgpu::PowerPreference::LowPower,
        GpuPowerPreference::High => wgpu::PowerPreference::HighPerformance,
    };
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        })
        .await
        .map_err(|err| {
            tracing::debug!(error = %err, "adapter request failed");
            InitError::NoAdapter
        })?;

    let profile = AdapterProfile::from_wgpu(&adapter.get_info());
    tracing::debug!(
        name = %profile.name,
        backend = ?profile.backend,
        device_type = ?profile.device_type,
        is_software = profile.is_software(),
        "selected GPU adapter"
    );

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("backdrop device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                .using_resolution(adapter.limits()),
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        })
        .await
        .map_err(|err| InitError::Device(err.to_string()))?;

    Ok(DeviceGrant {
        instance,
        surface,
        adapter,
        device,
        queue,
        profile,
    })
}

/// Surface bound to a device, plus its current configuration.
pub(crate) struct GpuContext {
    _instance: wgpu::Instance,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: SurfaceSize,
    pub adapter_profile: AdapterProfile,
    max_dimension: u32,
}

impl GpuContext {
    /// Binds the surface to the device at the host-preferred format.
    pub(crate) fn configure(grant: DeviceGrant, size: SurfaceSize) -> Result<Self, InitError> {
        let DeviceGrant {
            instance,
            surface,
            adapter,
            device,
            queue,
            profile,
        } = grant;

        let caps = surface.get_capabilities(&adapter);
        let format = caps.formats.first().copied().ok_or_else(|| {
            InitError::NoContext(format!(
                "adapter {} cannot present to this surface",
                profile.name
            ))
        })?;

        let alpha_mode = if caps
            .alpha_modes
            .contains(&wgpu::CompositeAlphaMode::PreMultiplied)
        {
            wgpu::CompositeAlphaMode::PreMultiplied
        } else {
            let fallback = caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto);
            tracing::warn!(
                ?fallback,
                "premultiplied alpha not supported by surface; using {:?}",
                fallback
            );
            fallback
        };

        let max_dimension = device.limits().max_texture_dimension_2d;
        let extent = clamp_extent(size, max_dimension);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: extent.width,
            height: extent.height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        tracing::debug!(?format, ?alpha_mode, size = %extent, "configured surface");

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            size: extent,
            adapter_profile: profile,
            max_dimension,
        })
    }

    pub(crate) fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub(crate) fn resize(&mut self, new_size: SurfaceSize) {
        if new_size.is_empty() {
            return;
        }
        let extent = clamp_extent(new_size, self.max_dimension);
        self.size = extent;
        self.config.width = extent.width;
        self.config.height = extent.height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Re-applies the current configuration after the surface was lost.
    pub(crate) fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }
}

fn clamp_extent(size: SurfaceSize, max_dimension: u32) -> SurfaceSize {
    let clamped = SurfaceSize::new(
        size.width.clamp(1, max_dimension.max(1)),
        size.height.clamp(1, max_dimension.max(1)),
    );
    if clamped.width < size.width || clamped.height < size.height {
        tracing::warn!(
            requested = %size,
            max_dimension,
            "surface larger than the GPU texture limit; clamping"
        );
    }
    clamped
}
