//! Static dot-grid background shown whenever the GPU path is not drawing.

use image::{Rgba, RgbaImage};

use crate::types::SurfaceSize;

pub(crate) const BACKGROUND: [u8; 3] = [0x0a, 0x0a, 0x0a];
pub(crate) const DOT_COLOR: [u8; 3] = [0xff, 0xff, 0xff];
pub(crate) const DOT_ALPHA: f32 = 0.15;
pub(crate) const DOT_RADIUS: f32 = 1.5;
pub(crate) const GRID_SPACING: u32 = 24;

/// CPU rasteriser for the fallback pattern.
#[derive(Debug, Clone, Copy)]
pub struct FallbackPresenter {
    spacing: u32,
    radius: f32,
}

impl Default for FallbackPresenter {
    fn default() -> Self {
        Self {
            spacing: GRID_SPACING,
            radius: DOT_RADIUS,
        }
    }
}

impl FallbackPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders the pattern at `size`; zero dimensions are clamped to one pixel.
    pub fn render(&self, size: SurfaceSize) -> RgbaImage {
        let size = size.clamped();
        let spacing = self.spacing.max(1) as f32;
        let half = spacing * 0.5;
        RgbaImage::from_fn(size.width, size.height, |x, y| {
            // Dots sit at the centre of each lattice cell, like a CSS radial
            // gradient repeated with `background-size`.
            let cx = (x as f32 + 0.5) % spacing - half;
            let cy = (y as f32 + 0.5) % spacing - half;
            let distance = (cx * cx + cy * cy).sqrt();
            let coverage = (self.radius + 0.5 - distance).clamp(0.0, 1.0);
            blend(coverage * DOT_ALPHA)
        })
    }
}

fn blend(alpha: f32) -> Rgba<u8> {
    let mix = |base: u8, over: u8| -> u8 {
        let value = base as f32 * (1.0 - alpha) + over as f32 * alpha;
        value.round().clamp(0.0, 255.0) as u8
    };
    Rgba([
        mix(BACKGROUND[0], DOT_COLOR[0]),
        mix(BACKGROUND[1], DOT_COLOR[1]),
        mix(BACKGROUND[2], DOT_COLOR[2]),
        0xff,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_requested_size() {
        let image = FallbackPresenter::new().render(SurfaceSize::new(64, 48));
        assert_eq!(image.dimensions(), (64, 48));
    }

    #[test]
    fn empty_size_renders_single_pixel() {
        let image = FallbackPresenter::new().render(SurfaceSize::new(0, 0));
        assert_eq!(image.dimensions(), (1, 1));
    }

    #[test]
    fn cell_centre_is_brighter_than_cell_corner() {
        let image = FallbackPresenter::new().render(SurfaceSize::new(48, 48));
        let centre = image.get_pixel(12, 12);
        let corner = image.get_pixel(0, 0);
        assert_eq!(corner.0, [0x0a, 0x0a, 0x0a, 0xff]);
        assert!(centre.0[0] > corner.0[0]);
        assert!(centre.0[0] <= 0x0a + 40);
    }

    #[test]
    fn pattern_repeats_on_the_lattice() {
        let image = FallbackPresenter::new().render(SurfaceSize::new(72, 72));
        assert_eq!(image.get_pixel(12, 12), image.get_pixel(36, 60));
        assert_eq!(image.get_pixel(5, 7), image.get_pixel(29, 31));
    }
}
