use bytemuck::{Pod, Zeroable};

use crate::types::FrameInputs;

/// Size in bytes of [`BackgroundUniforms`]; fixed for the pipeline's lifetime.
pub(crate) const UNIFORM_BLOCK_SIZE: u64 = std::mem::size_of::<BackgroundUniforms>() as u64;

/// Scroll offsets arrive in pixels; the shader works in thousands of them.
const SCROLL_SCALE: f32 = 0.001;

/// Uniform block shared with `fs_main`.
///
/// Eight consecutive `f32`s; the WGSL struct declares the same scalar order so
/// no alignment padding is introduced on either side. The seventh slot carries
/// the fallback overlay opacity, zero once the fade has finished.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub(crate) struct BackgroundUniforms {
    pub time: f32,
    pub width: f32,
    pub height: f32,
    pub scroll: f32,
    pub pointer_x: f32,
    pub pointer_y: f32,
    pub fallback_opacity: f32,
    pub _pad: f32,
}

const _: () = assert!(std::mem::size_of::<BackgroundUniforms>() == 32);

impl BackgroundUniforms {
    pub fn pack(inputs: &FrameInputs) -> Self {
        Self {
            time: (inputs.time_ms * 0.001) as f32,
            width: inputs.resolution.width as f32,
            height: inputs.resolution.height as f32,
            scroll: inputs.scroll_offset * SCROLL_SCALE,
            pointer_x: inputs.pointer[0],
            pointer_y: inputs.pointer[1],
            fallback_opacity: inputs.fallback_opacity.clamp(0.0, 1.0),
            _pad: 0.0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}
