use wgpu::util::DeviceExt;

use crate::error::InitError;

use super::uniforms::UNIFORM_BLOCK_SIZE;

/// Two triangles covering clip space, `[x, y, u, v]` per vertex.
pub(crate) const QUAD_VERTICES: [[f32; 4]; 6] = [
    [-1.0, -1.0, 0.0, 1.0],
    [1.0, -1.0, 1.0, 1.0],
    [-1.0, 1.0, 0.0, 0.0],
    [1.0, 1.0, 1.0, 0.0],
    [-1.0, 1.0, 0.0, 0.0],
    [1.0, -1.0, 1.0, 1.0],
];

pub(crate) const QUAD_VERTEX_COUNT: u32 = QUAD_VERTICES.len() as u32;

const UNIFORM_ALIGNMENT: u64 = 16;

/// Buffers allocated once per device and destroyed together on teardown.
pub(crate) struct FrameBuffers {
    pub geometry: wgpu::Buffer,
    pub uniform: wgpu::Buffer,
}

impl FrameBuffers {
    pub(crate) fn allocate(device: &wgpu::Device) -> Result<Self, InitError> {
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let geometry = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("background quad"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let uniform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("background uniforms"),
            size: uniform_buffer_size(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let validation = pollster::block_on(device.pop_error_scope());
        let out_of_memory = pollster::block_on(device.pop_error_scope());
        if let Some(err) = out_of_memory.or(validation) {
            geometry.destroy();
            uniform.destroy();
            return Err(InitError::Allocation(err.to_string()));
        }

        Ok(Self { geometry, uniform })
    }

    pub(crate) fn destroy(&self) {
        self.geometry.destroy();
        self.uniform.destroy();
    }
}

pub(crate) fn uniform_buffer_size() -> u64 {
    UNIFORM_BLOCK_SIZE.div_ceil(UNIFORM_ALIGNMENT) * UNIFORM_ALIGNMENT
}
