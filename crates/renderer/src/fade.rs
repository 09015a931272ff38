use std::time::{Duration, Instant};

/// Linear fade from fully opaque to transparent over a fixed duration.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FadeEnvelope {
    start: Instant,
    duration: Duration,
}

impl FadeEnvelope {
    /// Returns `None` for a zero duration; callers treat that as an instant cut.
    pub fn new(duration: Duration, now: Instant) -> Option<Self> {
        if duration.is_zero() {
            None
        } else {
            Some(Self {
                start: now,
                duration,
            })
        }
    }

    fn progress(&self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.start);
        let progress = elapsed.as_secs_f32() / self.duration.as_secs_f32().max(f32::EPSILON);
        progress.clamp(0.0, 1.0)
    }

    /// Opacity of the fading layer at `now`.
    pub fn opacity(&self, now: Instant) -> f32 {
        1.0 - self.progress(now)
    }

    pub fn finished(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }
}
