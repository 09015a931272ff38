//! Seams between the lifecycle orchestrator and the graphics backend.
//!
//! `Background` only talks to the GPU through these traits so the state
//! machine can be driven by the real wgpu host in `gpu` or by a recording fake
//! in tests.

use std::task::Poll;
use std::thread;

use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::error::{FrameError, InitError};
use crate::gpu::Capability;
use crate::types::{AdapterProfile, FrameInputs, SurfaceSize};

/// Everything the orchestrator needs from a graphics backend.
pub trait GpuHost {
    /// Device handle produced by the asynchronous acquisition step.
    type Device: Send + 'static;
    /// Ready-to-draw renderer built from a device.
    type Renderer: FrameRenderer;

    /// Pure, synchronous capability query.
    fn detect_capability(&self) -> Capability;

    /// Starts acquiring a device; the result is polled later.
    fn request_device(&mut self) -> DeviceRequest<Self::Device>;

    /// Binds the surface, builds the pipeline, and allocates buffers.
    fn build_renderer(
        &mut self,
        device: Self::Device,
        size: SurfaceSize,
    ) -> Result<Self::Renderer, InitError>;
}

/// Per-frame drawing plus the resources it owns.
pub trait FrameRenderer {
    fn render(&mut self, inputs: &FrameInputs) -> Result<(), FrameError>;

    /// Reconfigures the surface; pipeline and buffers are kept.
    fn resize(&mut self, size: SurfaceSize);

    /// Destroys GPU buffers; the renderer must not be used afterwards.
    fn release(&mut self);

    fn adapter_profile(&self) -> Option<&AdapterProfile> {
        None
    }
}

/// Pending result of a device acquisition.
///
/// Dropping the request abandons it: a worker that resolves later finds the
/// channel closed and its device is dropped on that thread.
pub struct DeviceRequest<D> {
    receiver: Receiver<Result<D, InitError>>,
}

/// Sending half handed to whoever completes a [`DeviceRequest`].
pub struct DeviceResolver<D> {
    sender: Sender<Result<D, InitError>>,
}

impl<D> DeviceResolver<D> {
    /// Delivers the result; returns false when the request was abandoned.
    pub fn resolve(self, result: Result<D, InitError>) -> bool {
        self.sender.send(result).is_ok()
    }
}

impl<D: Send + 'static> DeviceRequest<D> {
    pub fn channel() -> (DeviceResolver<D>, Self) {
        let (sender, receiver) = crossbeam_channel::bounded(1);
        (DeviceResolver { sender }, Self { receiver })
    }

    /// A request that has already resolved.
    pub fn ready(result: Result<D, InitError>) -> Self {
        let (resolver, request) = Self::channel();
        resolver.resolve(result);
        request
    }

    /// Runs `acquire` on a named worker thread.
    pub fn spawn<F>(name: &str, acquire: F) -> Self
    where
        F: FnOnce() -> Result<D, InitError> + Send + 'static,
    {
        let (resolver, request) = Self::channel();
        let spawned = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                if !resolver.resolve(acquire()) {
                    tracing::debug!("device request abandoned before it resolved; dropping result");
                }
            });
        match spawned {
            Ok(_) => request,
            Err(err) => Self::ready(Err(InitError::Device(format!(
                "failed to spawn device worker: {err}"
            )))),
        }
    }

    /// Non-blocking check for the result.
    pub fn poll(&self) -> Poll<Result<D, InitError>> {
        match self.receiver.try_recv() {
            Ok(result) => Poll::Ready(result),
            Err(TryRecvError::Empty) => Poll::Pending,
            Err(TryRecvError::Disconnected) => Poll::Ready(Err(InitError::Abandoned)),
        }
    }
}
