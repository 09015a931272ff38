//! Background settings: feature flags, GPU preferences, and performance
//! thresholds, parsed from an optional `settings.toml` and resolved once at
//! start-up into immutable values.
//!
//! Resolution order for feature flags is profile defaults, then explicit
//! `[features]` entries from the file. Callers layer environment and CLI
//! overrides on top of the returned [`FeatureFlags`].

use std::fmt;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Upper bound for the fallback fade; anything longer reads as a stall.
const MAX_FALLBACK_FADE: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Build profile the defaults are derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Development,
    Production,
}

impl Profile {
    /// Debug builds behave like a development server, release builds like production.
    pub fn current() -> Self {
        if cfg!(debug_assertions) {
            Profile::Development
        } else {
            Profile::Production
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Development => f.write_str("development"),
            Profile::Production => f.write_str("production"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerSetting {
    Low,
    #[default]
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendSetting {
    #[default]
    Auto,
    Vulkan,
    Metal,
    Dx12,
    Gl,
}

/// Feature toggles consumed by the background orchestrator.
///
/// Values are fixed for the lifetime of a mount; nothing reads them from
/// process-wide state after start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeatureFlags {
    /// Track pointer movement and feed it to the shader.
    pub enable_mouse_interaction: bool,
    /// Sample the scroll offset for the parallax term.
    pub enable_scroll_parallax: bool,
    /// Show the diagnostic overlay (resolution, pointer, FPS).
    pub enable_debug_overlay: bool,
    /// Fade the fallback out instead of hiding it instantly.
    pub enable_fallback_transition: bool,
    /// Collect frame statistics and log slow frames.
    pub enable_performance_monitoring: bool,
}

impl FeatureFlags {
    pub fn for_profile(profile: Profile) -> Self {
        let development = matches!(profile, Profile::Development);
        Self {
            enable_mouse_interaction: true,
            enable_scroll_parallax: true,
            enable_debug_overlay: development,
            enable_fallback_transition: true,
            enable_performance_monitoring: development,
        }
    }

    /// Turns on every diagnostic switch, as the debug query/env toggle does.
    pub fn with_debug(mut self) -> Self {
        self.enable_debug_overlay = true;
        self.enable_performance_monitoring = true;
        self
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self::for_profile(Profile::current())
    }
}

/// Optional per-flag overrides as written in the settings file.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct FeatureOverrides {
    pub mouse_interaction: Option<bool>,
    pub scroll_parallax: Option<bool>,
    pub debug_overlay: Option<bool>,
    pub fallback_transition: Option<bool>,
    pub performance_monitoring: Option<bool>,
}

impl FeatureOverrides {
    pub fn apply(&self, mut flags: FeatureFlags) -> FeatureFlags {
        if let Some(value) = self.mouse_interaction {
            flags.enable_mouse_interaction = value;
        }
        if let Some(value) = self.scroll_parallax {
            flags.enable_scroll_parallax = value;
        }
        if let Some(value) = self.debug_overlay {
            flags.enable_debug_overlay = value;
        }
        if let Some(value) = self.fallback_transition {
            flags.enable_fallback_transition = value;
        }
        if let Some(value) = self.performance_monitoring {
            flags.enable_performance_monitoring = value;
        }
        flags
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GpuSettings {
    /// When false the GPU path is treated as absent and only the fallback is shown.
    pub enabled: bool,
    pub power: PowerSetting,
    pub backend: BackendSetting,
}

impl Default for GpuSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            power: PowerSetting::default(),
            backend: BackendSetting::default(),
        }
    }
}

/// Frame budget figures used by the performance monitor.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PerformanceThresholds {
    #[serde(default = "default_target_fps")]
    pub target_fps: f32,
    #[serde(
        default = "default_max_render_time",
        deserialize_with = "deserialize_duration"
    )]
    pub max_render_time: Duration,
    #[serde(default = "default_low_fps")]
    pub low_fps: f32,
    #[serde(
        default = "default_high_render_time",
        deserialize_with = "deserialize_duration"
    )]
    pub high_render_time: Duration,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            target_fps: default_target_fps(),
            max_render_time: default_max_render_time(),
            low_fps: default_low_fps(),
            high_render_time: default_high_render_time(),
        }
    }
}

fn default_target_fps() -> f32 {
    60.0
}

fn default_max_render_time() -> Duration {
    Duration::from_micros(16_670)
}

fn default_low_fps() -> f32 {
    30.0
}

fn default_high_render_time() -> Duration {
    Duration::from_micros(33_330)
}

fn default_fallback_fade() -> Duration {
    Duration::from_secs(1)
}

fn default_version() -> u32 {
    1
}

/// Contents of `settings.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub profile: Option<Profile>,
    #[serde(default)]
    pub gpu: GpuSettings,
    #[serde(default)]
    pub features: FeatureOverrides,
    #[serde(default, deserialize_with = "deserialize_duration_opt")]
    pub fallback_fade: Option<Duration>,
    #[serde(default)]
    pub performance: PerformanceThresholds,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            profile: None,
            gpu: GpuSettings::default(),
            features: FeatureOverrides::default(),
            fallback_fade: None,
            performance: PerformanceThresholds::default(),
        }
    }
}

impl Settings {
    pub fn from_toml_str(input: &str) -> Result<Self, SettingsError> {
        let raw: Settings = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Profile from the file, or the build profile when unset.
    pub fn profile(&self) -> Profile {
        self.profile.unwrap_or_else(Profile::current)
    }

    /// Flags for `profile` with the file's explicit overrides applied.
    pub fn flags(&self, profile: Profile) -> FeatureFlags {
        self.features.apply(FeatureFlags::for_profile(profile))
    }

    pub fn fallback_fade(&self) -> Duration {
        self.fallback_fade.unwrap_or_else(default_fallback_fade)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.version != 1 {
            return Err(SettingsError::Invalid(format!(
                "unsupported settings version {}; expected 1",
                self.version
            )));
        }

        let perf = &self.performance;
        if perf.target_fps.is_nan() || perf.target_fps <= 0.0 {
            return Err(SettingsError::Invalid(
                "performance.target_fps must be > 0".into(),
            ));
        }
        if perf.low_fps.is_nan() || perf.low_fps <= 0.0 {
            return Err(SettingsError::Invalid(
                "performance.low_fps must be > 0".into(),
            ));
        }
        if perf.low_fps >= perf.target_fps {
            return Err(SettingsError::Invalid(format!(
                "performance.low_fps ({}) must be below target_fps ({})",
                perf.low_fps, perf.target_fps
            )));
        }
        if perf.max_render_time.is_zero() || perf.high_render_time.is_zero() {
            return Err(SettingsError::Invalid(
                "performance render time budgets must be greater than zero".into(),
            ));
        }
        if perf.high_render_time < perf.max_render_time {
            return Err(SettingsError::Invalid(
                "performance.high_render_time must not be below max_render_time".into(),
            ));
        }

        if let Some(fade) = self.fallback_fade {
            if fade > MAX_FALLBACK_FADE {
                return Err(SettingsError::Invalid(format!(
                    "fallback_fade must be at most {}s",
                    MAX_FALLBACK_FADE.as_secs()
                )));
            }
        }

        Ok(())
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_duration_opt(deserializer)?
        .ok_or_else(|| de::Error::custom("expected a duration"))
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs_f64(v)))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(Visitor)
}
