use thiserror::Error;

/// Reasons the GPU path could not be brought up.
///
/// Every variant is caught by the orchestrator and downgraded to the static
/// fallback; none of them terminates the host.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("no suitable GPU adapter available")]
    NoAdapter,
    #[error("surface cannot be bound for presentation: {0}")]
    NoContext(String),
    #[error("failed to create GPU device: {0}")]
    Device(String),
    #[error("background shader failed to compile: {0}")]
    ShaderCompilation(String),
    #[error("failed to allocate GPU buffers: {0}")]
    Allocation(String),
    #[error("device request was abandoned before it resolved")]
    Abandoned,
}

/// How loudly an initialization failure should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The environment lacks something; expected on some hosts.
    Environment,
    /// A bug in our shaders or descriptors.
    Programming,
}

impl InitError {
    pub fn severity(&self) -> Severity {
        match self {
            InitError::NoAdapter
            | InitError::NoContext(_)
            | InitError::Device(_)
            | InitError::Abandoned => Severity::Environment,
            InitError::ShaderCompilation(_) | InitError::Allocation(_) => Severity::Programming,
        }
    }
}

/// Per-frame failures.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The surface had no texture for us this tick; the frame is skipped.
    #[error("failed to acquire surface texture: {0}")]
    Acquire(#[from] wgpu::SurfaceError),
    /// The renderer can no longer produce frames.
    #[error("renderer is no longer usable: {0}")]
    Fatal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_failures_are_distinguished_from_bugs() {
        assert_eq!(InitError::NoAdapter.severity(), Severity::Environment);
        assert_eq!(
            InitError::NoContext("offscreen".into()).severity(),
            Severity::Environment
        );
        assert_eq!(
            InitError::ShaderCompilation("bad token".into()).severity(),
            Severity::Programming
        );
        assert_eq!(
            InitError::Allocation("oom".into()).severity(),
            Severity::Programming
        );
    }
}
