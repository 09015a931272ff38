use std::fmt;
use std::time::Duration;

use settings::{BackendSetting, FeatureFlags, PerformanceThresholds, PowerSetting};
use winit::dpi::PhysicalSize;

/// Drawing surface size in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Zero-area surfaces (minimised windows) cannot be configured.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Size with both dimensions clamped to at least one pixel.
    pub fn clamped(&self) -> Self {
        Self::new(self.width.max(1), self.height.max(1))
    }
}

impl From<PhysicalSize<u32>> for SurfaceSize {
    fn from(size: PhysicalSize<u32>) -> Self {
        Self::new(size.width, size.height)
    }
}

impl fmt::Display for SurfaceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Inputs sampled by the orchestrator at the moment a frame runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInputs {
    /// Host animation timestamp in milliseconds, monotonic for the mount.
    pub time_ms: f64,
    /// Surface size the frame is drawn at, as last reported to the orchestrator.
    pub resolution: SurfaceSize,
    /// Vertical scroll offset in pixels; zero when parallax is disabled.
    pub scroll_offset: f32,
    /// Pointer position in surface-local pixels; origin when disabled.
    pub pointer: [f32; 2],
    /// Opacity of the static dot grid drawn over the frame while it fades out.
    pub fallback_opacity: f32,
}

/// Adapter power hint forwarded to wgpu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    Low,
    #[default]
    High,
}

impl From<PowerSetting> for GpuPowerPreference {
    fn from(value: PowerSetting) -> Self {
        match value {
            PowerSetting::Low => GpuPowerPreference::Low,
            PowerSetting::High => GpuPowerPreference::High,
        }
    }
}

/// Human-readable description of the selected adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
    pub driver: String,
}

impl AdapterProfile {
    pub fn from_wgpu(info: &wgpu::AdapterInfo) -> Self {
        let name = if info.name.trim().is_empty() {
            "Unknown".to_string()
        } else {
            info.name.clone()
        };
        let driver = if info.driver.trim().is_empty() {
            info.driver_info.clone()
        } else {
            format!("{} {}", info.driver, info.driver_info).trim().to_string()
        };
        Self {
            name,
            backend: info.backend,
            device_type: info.device_type,
            driver,
        }
    }

    pub fn is_software(&self) -> bool {
        matches!(self.device_type, wgpu::DeviceType::Cpu)
    }
}

impl fmt::Display for AdapterProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?}, {:?})", self.name, self.backend, self.device_type)
    }
}

/// Options the orchestrator needs; everything else belongs to the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundOptions {
    pub flags: FeatureFlags,
    pub thresholds: PerformanceThresholds,
    pub fallback_fade: Duration,
}

impl Default for BackgroundOptions {
    fn default() -> Self {
        Self {
            flags: FeatureFlags::default(),
            thresholds: PerformanceThresholds::default(),
            fallback_fade: Duration::from_secs(1),
        }
    }
}

/// Immutable configuration passed to the renderer at start-up.
///
/// Built once by the CLI from defaults, the settings file, environment, and
/// flags; nothing downstream re-reads those sources.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Initial window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Window title prefix; the debug overlay appends to it.
    pub title: String,
    pub options: BackgroundOptions,
    /// When false the capability check reports the GPU as absent.
    pub gpu_enabled: bool,
    pub power: GpuPowerPreference,
    pub backend: BackendSetting,
}

impl Default for RendererConfig {
    /// A 1280x720 window with every GPU option at its default.
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            title: "backdrop".to_string(),
            options: BackgroundOptions::default(),
            gpu_enabled: true,
            power: GpuPowerPreference::default(),
            backend: BackendSetting::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_surfaces_are_detected_and_clamped() {
        let size = SurfaceSize::new(0, 600);
        assert!(size.is_empty());
        assert_eq!(size.clamped(), SurfaceSize::new(1, 600));
        assert_eq!(SurfaceSize::new(800, 600).to_string(), "800x600");
    }

    #[test]
    fn software_adapters_are_flagged() {
        let profile = AdapterProfile {
            name: "llvmpipe".into(),
            backend: wgpu::Backend::Vulkan,
            device_type: wgpu::DeviceType::Cpu,
            driver: "Mesa".into(),
        };
        assert!(profile.is_software());
        assert_eq!(profile.to_string(), "llvmpipe (Vulkan, Cpu)");
    }
}
