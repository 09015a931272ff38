//! CPU presentation of the static fallback for windows without a GPU frame.

use std::num::NonZeroU32;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use image::RgbaImage;
use softbuffer::{Context, Surface};
use tracing::debug;
use winit::window::Window;

use crate::fallback::FallbackPresenter;
use crate::types::SurfaceSize;

/// Softbuffer surface that shows the fallback dot grid.
///
/// The rasterised pattern is cached per size; resizes re-render it once.
pub(crate) struct SoftwareSurface {
    _context: Context<Arc<Window>>,
    surface: Surface<Arc<Window>, Arc<Window>>,
    presenter: FallbackPresenter,
    cached: Option<(SurfaceSize, Vec<u32>)>,
}

impl SoftwareSurface {
    pub(crate) fn new(window: Arc<Window>) -> Result<Self> {
        let context = Context::new(Arc::clone(&window))
            .map_err(|err| anyhow!("failed to create software display context: {err}"))?;
        let surface = Surface::new(&context, window)
            .map_err(|err| anyhow!("failed to create software surface: {err}"))?;
        Ok(Self {
            _context: context,
            surface,
            presenter: FallbackPresenter::new(),
            cached: None,
        })
    }

    /// Copies the fallback for `size` into the window and presents it.
    ///
    /// Zero-area (minimised) windows are skipped.
    pub(crate) fn present(&mut self, size: SurfaceSize) -> Result<()> {
        let (Some(width), Some(height)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
        else {
            return Ok(());
        };

        if self.cached.as_ref().map(|(cached, _)| *cached) != Some(size) {
            debug!(%size, "rasterising fallback background");
            let pixels = to_xrgb(&self.presenter.render(size));
            self.cached = Some((size, pixels));
        }
        let Some((_, pixels)) = self.cached.as_ref() else {
            return Ok(());
        };

        self.surface
            .resize(width, height)
            .map_err(|err| anyhow!("failed to resize software surface: {err}"))?;
        let mut buffer = self
            .surface
            .buffer_mut()
            .map_err(|err| anyhow!("failed to map software surface: {err}"))?;
        let len = buffer.len().min(pixels.len());
        buffer[..len].copy_from_slice(&pixels[..len]);
        buffer
            .present()
            .map_err(|err| anyhow!("failed to present software surface: {err}"))
    }
}

/// Packs RGBA pixels into softbuffer's `0RGB` words.
pub(crate) fn to_xrgb(image: &RgbaImage) -> Vec<u32> {
    image
        .pixels()
        .map(|pixel| {
            let [r, g, b, _] = pixel.0;
            (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn pixels_pack_as_zero_rgb() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, Rgba([0x12, 0x34, 0x56, 0xff]));
        image.put_pixel(1, 0, Rgba([0xff, 0x00, 0x80, 0x00]));
        assert_eq!(to_xrgb(&image), vec![0x0012_3456, 0x00ff_0080]);
    }

    #[test]
    fn fallback_background_packs_to_dark_grey() {
        let image = FallbackPresenter::new().render(SurfaceSize::new(48, 48));
        let pixels = to_xrgb(&image);
        assert_eq!(pixels.len(), 48 * 48);
        assert_eq!(pixels[0], 0x000a_0a0a);
        assert!(pixels[12 * 48 + 12] > pixels[0]);
    }
}
