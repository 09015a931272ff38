use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{FrameError, InitError};
use crate::host::FrameRenderer;
use crate::types::{AdapterProfile, FrameInputs, SurfaceSize};

use super::context::{DeviceGrant, GpuContext};
use super::pipeline::{build_pipeline, BackgroundPipeline};
use super::resources::{FrameBuffers, QUAD_VERTEX_COUNT};
use super::uniforms::BackgroundUniforms;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.04,
    g: 0.04,
    b: 0.04,
    a: 1.0,
};

/// Bind group created on first use and reused for every later frame.
#[derive(Debug, Default)]
pub enum BindGroupState<T> {
    #[default]
    Uninitialized,
    Bound(T),
}

impl<T> BindGroupState<T> {
    /// Returns the bound value, running `bind` only when nothing is bound yet.
    pub fn get_or_bind(&mut self, bind: impl FnOnce() -> T) -> &T {
        if let BindGroupState::Uninitialized = self {
            *self = BindGroupState::Bound(bind());
        }
        match self {
            BindGroupState::Bound(value) => value,
            BindGroupState::Uninitialized => unreachable!("bind group was just bound"),
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(self, BindGroupState::Bound(_))
    }

    /// Forgets the binding; only needed if the uniform buffer is replaced.
    pub fn reset(&mut self) {
        *self = BindGroupState::Uninitialized;
    }
}

/// Fully initialised wgpu path: surface, pipeline, buffers, bind group.
pub struct BackgroundRenderer {
    context: GpuContext,
    pipeline: BackgroundPipeline,
    buffers: FrameBuffers,
    bind_group: BindGroupState<wgpu::BindGroup>,
    released: bool,
}

impl BackgroundRenderer {
    /// Binds the surface, then builds the pipeline and buffers in that order.
    pub fn new(grant: DeviceGrant, size: SurfaceSize) -> Result<Self, InitError> {
        let started = Instant::now();
        let context = GpuContext::configure(grant, size)?;
        let pipeline = build_pipeline(&context.device, context.format())?;
        let buffers = FrameBuffers::allocate(&context.device)?;
        debug!(
            adapter = %context.adapter_profile,
            size = %context.size,
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "background renderer ready"
        );
        Ok(Self {
            context,
            pipeline,
            buffers,
            bind_group: BindGroupState::Uninitialized,
            released: false,
        })
    }

    fn write_uniforms(&self, inputs: &FrameInputs) {
        let uniforms = BackgroundUniforms::pack(inputs);
        self.context
            .queue
            .write_buffer(&self.buffers.uniform, 0, uniforms.as_bytes());
    }
}

impl FrameRenderer for BackgroundRenderer {
    fn render(&mut self, inputs: &FrameInputs) -> Result<(), FrameError> {
        if self.released {
            return Err(FrameError::Fatal("renderer was released".to_string()));
        }
        self.write_uniforms(inputs);

        let device = &self.context.device;
        let layout = &self.pipeline.uniform_layout;
        let uniform = &self.buffers.uniform;
        let bind_group = self.bind_group.get_or_bind(|| {
            debug!("creating background bind group");
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("background bind group"),
                layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform.as_entire_binding(),
                }],
            })
        });

        let frame = acquire_frame(&self.context)?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("background encoder"),
        });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("background pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&self.pipeline.pipeline);
            render_pass.set_bind_group(0, bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.buffers.geometry.slice(..));
            render_pass.draw(0..QUAD_VERTEX_COUNT, 0..1);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.context.resize(size);
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.bind_group.reset();
        self.buffers.destroy();
        debug!("released background GPU buffers");
    }

    fn adapter_profile(&self) -> Option<&AdapterProfile> {
        Some(&self.context.adapter_profile)
    }
}

fn acquire_frame(context: &GpuContext) -> Result<wgpu::SurfaceTexture, FrameError> {
    let acquisition_start = Instant::now();
    match context.surface.get_current_texture() {
        Ok(frame) => {
            let waited = acquisition_start.elapsed();
            if waited > Duration::from_millis(100) {
                warn!(
                    waited_ms = waited.as_millis(),
                    "acquiring surface texture blocked for over 100ms"
                );
            }
            Ok(frame)
        }
        Err(err @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
            context.reconfigure();
            Err(FrameError::Acquire(err))
        }
        Err(wgpu::SurfaceError::OutOfMemory) => Err(FrameError::Fatal(
            "surface ran out of memory while acquiring a frame".to_string(),
        )),
        Err(err) => Err(FrameError::Acquire(err)),
    }
}
