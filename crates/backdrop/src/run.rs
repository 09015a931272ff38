use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use renderer::{BackgroundOptions, Renderer, RendererConfig, SurfaceSize};
use serde::Serialize;
use settings::{BackendSetting, FeatureFlags, FeatureOverrides, PowerSetting, Profile, Settings};
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;
use crate::paths::AppPaths;

const DEFAULT_SIZE: (u32, u32) = (1280, 720);
const WINDOW_TITLE: &str = "backdrop";

pub fn initialise_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Configuration after defaults, the settings file, environment, and flags.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub profile: Profile,
    pub power: PowerSetting,
    pub renderer: RendererConfig,
}

impl ResolvedConfig {
    pub fn surface_size(&self) -> SurfaceSize {
        let (width, height) = self.renderer.surface_size;
        SurfaceSize::new(width, height)
    }
}

pub fn run(args: &RunArgs) -> Result<()> {
    let resolved = load(args)?;
    tracing::info!(
        profile = %resolved.profile,
        size = %resolved.surface_size(),
        gpu = resolved.renderer.gpu_enabled,
        "starting background"
    );
    Renderer::new(resolved.renderer).run()
}

/// Loads the settings file and resolves every layer on top of it.
pub fn load(args: &RunArgs) -> Result<ResolvedConfig> {
    let settings = load_settings(args)?;
    resolve_config(args, &settings)
}

/// Reads `--config` if given, otherwise `settings.toml` in the config directory.
///
/// A missing default file means built-in defaults; a missing explicit file is
/// an error.
pub fn load_settings(args: &RunArgs) -> Result<Settings> {
    match args.config.as_deref() {
        Some(path) => read_settings(path),
        None => {
            let paths = AppPaths::discover()?;
            let file = paths.settings_file();
            if file.exists() {
                read_settings(&file)
            } else {
                tracing::debug!(
                    config = %paths.config_dir().display(),
                    "no settings.toml; using defaults"
                );
                Ok(Settings::default())
            }
        }
    }
}

fn read_settings(path: &Path) -> Result<Settings> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    let settings = Settings::from_toml_str(&contents)
        .with_context(|| format!("failed to load settings from {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded settings");
    Ok(settings)
}

pub fn resolve_config(args: &RunArgs, settings: &Settings) -> Result<ResolvedConfig> {
    let profile = args
        .profile
        .map(Profile::from)
        .unwrap_or_else(|| settings.profile());

    let mut flags = settings.flags(profile);
    if args.debug {
        flags = flags.with_debug();
    }
    let flags = cli_overrides(args).apply(flags);

    let surface_size = match args.size.as_deref() {
        Some(value) => parse_surface_size(value)?,
        None => DEFAULT_SIZE,
    };
    let power = args.power.map(PowerSetting::from).unwrap_or(settings.gpu.power);
    let gpu_enabled = settings.gpu.enabled && !args.no_gpu;

    let renderer = RendererConfig {
        surface_size,
        title: WINDOW_TITLE.to_string(),
        options: BackgroundOptions {
            flags,
            thresholds: settings.performance,
            fallback_fade: settings.fallback_fade(),
        },
        gpu_enabled,
        power: power.into(),
        backend: settings.gpu.backend,
    };

    Ok(ResolvedConfig {
        profile,
        power,
        renderer,
    })
}

/// Flags only ever switch features off, except the overlay which switches on.
fn cli_overrides(args: &RunArgs) -> FeatureOverrides {
    FeatureOverrides {
        mouse_interaction: args.no_mouse.then_some(false),
        scroll_parallax: args.no_parallax.then_some(false),
        debug_overlay: args.debug_overlay.then_some(true),
        fallback_transition: args.no_fade.then_some(false),
        performance_monitoring: None,
    }
}

pub fn parse_surface_size(value: &str) -> Result<(u32, u32)> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| anyhow::anyhow!("expected WxH format, e.g. 1280x720"))?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid width in size argument"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid height in size argument"))?;

    if width == 0 || height == 0 {
        anyhow::bail!("surface dimensions must be greater than zero");
    }

    Ok((width, height))
}

/// Serializable view of [`ResolvedConfig`] for `backdrop config`.
#[derive(Debug, Serialize)]
pub struct EffectiveConfig {
    pub profile: Profile,
    pub size: String,
    pub fallback_fade_ms: u64,
    pub gpu: EffectiveGpu,
    pub features: FeatureFlags,
    pub performance: EffectivePerformance,
}

#[derive(Debug, Serialize)]
pub struct EffectiveGpu {
    pub enabled: bool,
    pub power: PowerSetting,
    pub backend: BackendSetting,
}

#[derive(Debug, Serialize)]
pub struct EffectivePerformance {
    pub target_fps: f32,
    pub max_render_time_ms: u64,
    pub low_fps: f32,
    pub high_render_time_ms: u64,
}

impl From<&ResolvedConfig> for EffectiveConfig {
    fn from(resolved: &ResolvedConfig) -> Self {
        let options = &resolved.renderer.options;
        let thresholds = &options.thresholds;
        Self {
            profile: resolved.profile,
            size: resolved.surface_size().to_string(),
            fallback_fade_ms: millis(options.fallback_fade),
            gpu: EffectiveGpu {
                enabled: resolved.renderer.gpu_enabled,
                power: resolved.power,
                backend: resolved.renderer.backend,
            },
            features: options.flags,
            performance: EffectivePerformance {
                target_fps: thresholds.target_fps,
                max_render_time_ms: millis(thresholds.max_render_time),
                low_fps: thresholds.low_fps,
                high_render_time_ms: millis(thresholds.high_render_time),
            },
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

pub fn render_effective_config(resolved: &ResolvedConfig) -> Result<String> {
    toml::to_string_pretty(&EffectiveConfig::from(resolved))
        .context("failed to serialise effective configuration")
}
