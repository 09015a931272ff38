use std::fmt;

use settings::BackendSetting;

/// Outcome of the capability check; computed once per mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    Available { backends: wgpu::Backends },
    Absent { reason: String },
}

impl Capability {
    pub fn is_supported(&self) -> bool {
        matches!(self, Capability::Available { .. })
    }

    pub fn backends(&self) -> wgpu::Backends {
        match self {
            Capability::Available { backends } => *backends,
            Capability::Absent { .. } => wgpu::Backends::empty(),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Available { backends } => write!(f, "available ({backends:?})"),
            Capability::Absent { reason } => write!(f, "absent: {reason}"),
        }
    }
}

/// Backend set named by the settings file, before environment overrides.
pub fn requested_backends(setting: BackendSetting) -> wgpu::Backends {
    match setting {
        BackendSetting::Auto => wgpu::Backends::all(),
        BackendSetting::Vulkan => wgpu::Backends::VULKAN,
        BackendSetting::Metal => wgpu::Backends::METAL,
        BackendSetting::Dx12 => wgpu::Backends::DX12,
        BackendSetting::Gl => wgpu::Backends::GL,
    }
}

/// `WGPU_BACKEND` takes precedence over the configured backend set.
pub fn backends_with_env(setting: BackendSetting) -> wgpu::Backends {
    wgpu::Backends::from_env().unwrap_or_else(|| requested_backends(setting))
}

/// True when a graphics API entry point exists for the requested backends.
///
/// Does not touch the driver: adapter and device failures surface later as
/// initialization errors, never here.
pub fn detect(requested: wgpu::Backends, gpu_enabled: bool) -> Capability {
    detect_with(wgpu::Instance::enabled_backend_features(), requested, gpu_enabled)
}

fn detect_with(
    compiled: wgpu::Backends,
    requested: wgpu::Backends,
    gpu_enabled: bool,
) -> Capability {
    if !gpu_enabled {
        return Capability::Absent {
            reason: "GPU rendering disabled by configuration".to_string(),
        };
    }
    let backends = compiled & requested;
    if backends.is_empty() {
        Capability::Absent {
            reason: format!(
                "no requested backend is available (requested {requested:?}, built with {compiled:?})"
            ),
        }
    } else {
        Capability::Available { backends }
    }
}
