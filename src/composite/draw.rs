//! Canvas drawing primitives for the renderer.

use image::imageops;
use image::{Pixel, Rgba, RgbaImage};

/// Alpha-blends `bitmap` onto `canvas` with its top-left corner at
/// (`left`, `top`). Portions falling outside the canvas are clipped.
pub(crate) fn blit(canvas: &mut RgbaImage, bitmap: &RgbaImage, left: i64, top: i64) {
    imageops::overlay(canvas, bitmap, left, top);
}

/// Source-over blends a full-canvas black fill at the given alpha,
/// reconstructing the dimming a window manager paints behind a modal
/// surface.
pub(crate) fn dim_fill(canvas: &mut RgbaImage, alpha: u8) {
    if alpha == 0 {
        return;
    }
    let scrim = Rgba([0u8, 0, 0, alpha]);
    for pixel in canvas.pixels_mut() {
        pixel.blend(&scrim);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blit_blends_and_clips() {
        let mut canvas = RgbaImage::new(10, 10);
        let bitmap = RgbaImage::from_pixel(4, 4, Rgba([200, 0, 0, 255]));

        blit(&mut canvas, &bitmap, 8, 8);

        assert_eq!(canvas.get_pixel(8, 8), &Rgba([200, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(7, 7), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_dim_fill_over_transparent_background() {
        let mut canvas = RgbaImage::new(2, 2);
        dim_fill(&mut canvas, 102);
        assert_eq!(canvas.get_pixel(0, 0), &Rgba([0, 0, 0, 102]));
    }

    #[test]
    fn test_dim_fill_darkens_opaque_pixels() {
        let mut canvas = RgbaImage::from_pixel(1, 1, Rgba([200, 100, 50, 255]));
        dim_fill(&mut canvas, 102);

        let pixel = canvas.get_pixel(0, 0);
        // 40% black over opaque color leaves 60% of each channel.
        assert_eq!(pixel[3], 255);
        assert!((pixel[0] as i32 - 120).abs() <= 1);
        assert!((pixel[1] as i32 - 60).abs() <= 1);
        assert!((pixel[2] as i32 - 30).abs() <= 1);
    }

    #[test]
    fn test_dim_fill_zero_alpha_is_a_no_op() {
        let mut canvas = RgbaImage::from_pixel(1, 1, Rgba([200, 100, 50, 255]));
        dim_fill(&mut canvas, 0);
        assert_eq!(canvas.get_pixel(0, 0), &Rgba([200, 100, 50, 255]));
    }
}
