use std::time::Instant;

/// Abstraction over where animation timestamps originate from.
pub trait TimeSource: Send {
    /// Resets the source so the next sample starts near zero.
    fn reset(&mut self);
    /// Milliseconds since the source was created or last reset.
    fn now_ms(&self) -> f64;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        self.origin = Instant::now();
    }

    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Opaque token identifying one requested animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimationHandle(u64);

impl AnimationHandle {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Host facility that delivers one frame callback per request.
///
/// At most one request is outstanding per mounted background; the orchestrator
/// re-arms from inside each frame callback and cancels on teardown.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> AnimationHandle;
    fn cancel_frame(&mut self, handle: AnimationHandle);
}
