//! Frame statistics and the developer overlay built from them.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use settings::PerformanceThresholds;

use crate::types::{AdapterProfile, SurfaceSize};

const RENDER_TIME_WINDOW: usize = 60;
const FPS_INTERVAL_MS: f64 = 1000.0;

/// Threshold breach detected when the FPS estimate refreshes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PerformanceWarning {
    LowFps { fps: f32, threshold: f32 },
    SlowFrames { average: Duration, threshold: Duration },
}

impl fmt::Display for PerformanceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerformanceWarning::LowFps { fps, threshold } => {
                write!(f, "low FPS detected: {fps:.1} (threshold {threshold:.0})")
            }
            PerformanceWarning::SlowFrames { average, threshold } => write!(
                f,
                "high render time detected: {:.2}ms (threshold {:.2}ms)",
                average.as_secs_f64() * 1000.0,
                threshold.as_secs_f64() * 1000.0
            ),
        }
    }
}

/// Rolling FPS and render time tracker.
///
/// FPS is recomputed once per second of frame time; render times are averaged
/// over the most recent 60 frames.
#[derive(Debug, Clone)]
pub struct FrameStats {
    thresholds: PerformanceThresholds,
    window_start_ms: Option<f64>,
    frames_in_window: u32,
    fps: f32,
    render_times: VecDeque<Duration>,
}

impl FrameStats {
    pub fn new(thresholds: PerformanceThresholds) -> Self {
        Self {
            thresholds,
            window_start_ms: None,
            frames_in_window: 0,
            fps: 0.0,
            render_times: VecDeque::with_capacity(RENDER_TIME_WINDOW),
        }
    }

    /// Records one rendered frame.
    ///
    /// Returns the threshold breaches found when the FPS estimate refreshed on
    /// this frame, so callers warn at most once per second.
    pub fn record(&mut self, time_ms: f64, render_time: Duration) -> Vec<PerformanceWarning> {
        if self.render_times.len() == RENDER_TIME_WINDOW {
            self.render_times.pop_front();
        }
        self.render_times.push_back(render_time);

        let start = *self.window_start_ms.get_or_insert(time_ms);
        self.frames_in_window += 1;
        let elapsed = time_ms - start;
        if elapsed < FPS_INTERVAL_MS {
            return Vec::new();
        }

        self.fps = (self.frames_in_window as f64 * 1000.0 / elapsed) as f32;
        self.frames_in_window = 0;
        self.window_start_ms = Some(time_ms);
        self.breaches()
    }

    fn breaches(&self) -> Vec<PerformanceWarning> {
        let mut warnings = Vec::new();
        if self.fps < self.thresholds.low_fps {
            warnings.push(PerformanceWarning::LowFps {
                fps: self.fps,
                threshold: self.thresholds.low_fps,
            });
        }
        let average = self.average_render_time();
        if average > self.thresholds.high_render_time {
            warnings.push(PerformanceWarning::SlowFrames {
                average,
                threshold: self.thresholds.high_render_time,
            });
        }
        warnings
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn average_render_time(&self) -> Duration {
        if self.render_times.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.render_times.iter().sum();
        total / self.render_times.len() as u32
    }

    /// True when the latest estimate meets the target rate and frame budget.
    ///
    /// Holds until the first estimate exists.
    pub fn within_budget(&self) -> bool {
        if self.fps == 0.0 {
            return true;
        }
        self.fps >= self.thresholds.target_fps
            && self.average_render_time() <= self.thresholds.max_render_time
    }

    /// Starts a fresh FPS window at the next recorded frame.
    ///
    /// Called when the loop resumes so time spent stopped is not counted as
    /// frame time. The last estimate stays visible until the new window closes.
    pub fn restart_window(&mut self) {
        self.window_start_ms = None;
        self.frames_in_window = 0;
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.thresholds);
    }
}

/// Values shown by the overlay; assembled by the orchestrator each time the
/// overlay text is requested.
#[derive(Debug, Clone)]
pub struct OverlaySnapshot<'a> {
    pub status: &'a str,
    pub size: SurfaceSize,
    pub pointer: [f32; 2],
    pub scroll: f32,
    pub fps: f32,
    pub average_render_time: Duration,
    pub within_budget: bool,
    pub adapter: Option<&'a AdapterProfile>,
}

impl fmt::Display for OverlaySnapshot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | pointer {:.0},{:.0} | scroll {:.0} | {:.0} fps | {:.2} ms",
            self.status,
            self.size,
            self.pointer[0],
            self.pointer[1],
            self.scroll,
            self.fps,
            self.average_render_time.as_secs_f64() * 1000.0
        )?;
        if !self.within_budget {
            f.write_str(" (over budget)")?;
        }
        if let Some(adapter) = self.adapter {
            write!(f, " | {}", adapter.name)?;
        }
        Ok(())
    }
}

/// Overlay visibility; toggling only works when the overlay is enabled.
#[derive(Debug, Clone, Copy)]
pub struct DebugOverlay {
    enabled: bool,
    visible: bool,
}

impl DebugOverlay {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            visible: enabled,
        }
    }

    pub fn toggle(&mut self) -> bool {
        if self.enabled {
            self.visible = !self.visible;
        }
        self.visible
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}
