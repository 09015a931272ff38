use crate::error::InitError;
use crate::fallback::{BACKGROUND, DOT_ALPHA, DOT_COLOR, DOT_RADIUS, GRID_SPACING};

pub(crate) const VERTEX_ENTRY: &str = "vs_main";
pub(crate) const FRAGMENT_ENTRY: &str = "fs_main";

/// Shared uniform declaration; must match `BackgroundUniforms` field for field.
const UNIFORMS_WGSL: &str = r"
struct Uniforms {
    time: f32,
    width: f32,
    height: f32,
    scroll: f32,
    pointer_x: f32,
    pointer_y: f32,
    fallback_opacity: f32,
    _pad: f32,
}

@group(0) @binding(0) var<uniform> uniforms: Uniforms;
";

const VERTEX_WGSL: &str = r"
struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var output: VertexOutput;
    output.position = vec4<f32>(input.position, 0.0, 1.0);
    output.uv = input.uv;
    return output;
}
";

const FRAGMENT_WGSL: &str = r"
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

fn dot_grid(uv: vec2<f32>, time: f32, scroll: f32) -> f32 {
    let shifted = uv + vec2<f32>(0.0, scroll * 0.1);
    let cell = fract(shifted * 20.0 + sin(time * 0.5) * 0.1);
    return smoothstep(0.8, 0.9, max(cell.x, cell.y));
}

fn gradient(uv: vec2<f32>, pointer: vec2<f32>, time: f32) -> vec3<f32> {
    let glow = 1.0 - length(uv - pointer) * 0.5;
    let base = mix(
        vec3<f32>(0.05, 0.05, 0.1),
        vec3<f32>(0.1, 0.05, 0.15),
        uv.y + sin(time * 0.3) * 0.1,
    );
    return base + glow * vec3<f32>(0.1, 0.05, 0.2);
}

// Same lattice as `FallbackPresenter::render`, evaluated per pixel centre.
fn fallback_grid(pixel: vec2<f32>) -> vec3<f32> {
    let half = FALLBACK_SPACING * 0.5;
    let cell = pixel % vec2<f32>(FALLBACK_SPACING, FALLBACK_SPACING) - vec2<f32>(half, half);
    let coverage = clamp(FALLBACK_RADIUS + 0.5 - length(cell), 0.0, 1.0);
    return mix(FALLBACK_BACKGROUND, FALLBACK_DOT, coverage * FALLBACK_DOT_ALPHA);
}

fn corner_sheen(uv: vec2<f32>, time: f32) -> vec3<f32> {
    let ripple = sin(uv.x * 10.0 + time) * sin(uv.y * 10.0 + time) * 0.1;
    return vec3<f32>(1.0, 1.0, 1.0) * (0.1 + ripple * 0.05);
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let uv = input.uv;
    let time = uniforms.time;
    let resolution = max(vec2<f32>(uniforms.width, uniforms.height), vec2<f32>(1.0, 1.0));
    let pointer = vec2<f32>(uniforms.pointer_x, uniforms.pointer_y) / resolution;

    var color = gradient(uv, pointer, time);
    color += dot_grid(uv, time, uniforms.scroll) * vec3<f32>(0.15, 0.15, 0.15);

    let edge = min(min(uv.x, 1.0 - uv.x), min(uv.y, 1.0 - uv.y));
    if (edge < 0.1) {
        color += corner_sheen(uv, time) * (0.1 - edge) * 10.0;
    }

    let fallback = fallback_grid(input.position.xy);
    color = mix(color, fallback, clamp(uniforms.fallback_opacity, 0.0, 1.0));

    return vec4<f32>(color, 1.0);
}
";

pub(crate) fn vertex_source() -> String {
    format!("{UNIFORMS_WGSL}{VERTEX_WGSL}")
}

/// WGSL constants mirroring the CPU fallback so the fade matches it exactly.
fn fallback_constants() -> String {
    format!(
        "
const FALLBACK_SPACING: f32 = {spacing:?};
const FALLBACK_RADIUS: f32 = {radius:?};
const FALLBACK_DOT_ALPHA: f32 = {alpha:?};
const FALLBACK_BACKGROUND: vec3<f32> = {background};
const FALLBACK_DOT: vec3<f32> = {dot};
",
        spacing = GRID_SPACING as f32,
        radius = DOT_RADIUS,
        alpha = DOT_ALPHA,
        background = wgsl_color(BACKGROUND),
        dot = wgsl_color(DOT_COLOR),
    )
}

fn wgsl_color(rgb: [u8; 3]) -> String {
    let [r, g, b] = rgb.map(|channel| channel as f32 / 255.0);
    format!("vec3<f32>({r:?}, {g:?}, {b:?})")
}

pub(crate) fn fragment_source() -> String {
    format!("{UNIFORMS_WGSL}{}{FRAGMENT_WGSL}", fallback_constants())
}

pub(crate) struct ShaderModules {
    pub vertex: wgpu::ShaderModule,
    pub fragment: wgpu::ShaderModule,
}

/// Compiles both stages inside a validation error scope.
pub(crate) fn compile(device: &wgpu::Device) -> Result<ShaderModules, InitError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let vertex = create_module(device, "background vertex shader", vertex_source());
    let fragment = create_module(device, "background fragment shader", fragment_source());
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(InitError::ShaderCompilation(err.to_string()));
    }
    Ok(ShaderModules { vertex, fragment })
}

fn create_module(device: &wgpu::Device, label: &str, source: String) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}
