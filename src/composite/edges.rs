//! Transparent-margin detection for bottom-sheet bitmaps.
//!
//! Sheet containers frequently capture with transparent letterboxing on the
//! left and right of the visible content. Before drawing, the renderer crops
//! those margins away and rescales the content to fill the recorded frame
//! width, preserving aspect ratio.

use image::RgbaImage;
use image::imageops::{self, FilterType};

use crate::composite::draw;
use crate::geometry::Rect;

/// Leftmost column containing any pixel with non-zero alpha, sampling about
/// `sample_rows` evenly spaced rows. Returns the bitmap width when every
/// sampled pixel is transparent.
pub(crate) fn find_left_edge(bitmap: &RgbaImage, sample_rows: u32) -> u32 {
    let (width, height) = bitmap.dimensions();
    let step = sample_step(height, sample_rows);

    for x in 0..width {
        for y in (0..height).step_by(step) {
            if bitmap.get_pixel(x, y)[3] > 0 {
                return x;
            }
        }
    }
    width
}

/// Exclusive right edge of the sampled content: one past the rightmost
/// column with any non-zero alpha, or 0 when everything sampled is
/// transparent.
pub(crate) fn find_right_edge(bitmap: &RgbaImage, sample_rows: u32) -> u32 {
    let (width, height) = bitmap.dimensions();
    let step = sample_step(height, sample_rows);

    for x in (0..width).rev() {
        for y in (0..height).step_by(step) {
            if bitmap.get_pixel(x, y)[3] > 0 {
                return x + 1;
            }
        }
    }
    0
}

fn sample_step(height: u32, sample_rows: u32) -> usize {
    (height / sample_rows.max(1)).max(1) as usize
}

/// Crops the transparent side margins off `bitmap` and draws the content
/// rescaled to fill the frame width, anchored at the frame's top-left.
///
/// Returns `false` without drawing when no transparent margin exists or the
/// detection is degenerate; the caller then draws the bitmap unmodified.
pub(crate) fn draw_width_filled(
    canvas: &mut RgbaImage,
    bitmap: &RgbaImage,
    frame: Rect,
    sample_rows: u32,
) -> bool {
    let (width, height) = bitmap.dimensions();
    let left_edge = find_left_edge(bitmap, sample_rows);
    let right_edge = find_right_edge(bitmap, sample_rows);

    if right_edge <= left_edge || right_edge > width {
        return false;
    }
    let content_width = right_edge - left_edge;

    if left_edge == 0 && right_edge == width {
        // No transparent margin, nothing to correct.
        return false;
    }

    if frame.width() <= 0 {
        return false;
    }
    let frame_width = frame.width() as u32;

    let scale = frame_width as f32 / content_width as f32;
    let scaled_height = (height as f32 * scale) as u32;
    if scaled_height == 0 {
        return false;
    }

    let content = imageops::crop_imm(bitmap, left_edge, 0, content_width, height).to_image();
    let resized = imageops::resize(&content, frame_width, scaled_height, FilterType::Triangle);
    draw::blit(canvas, &resized, frame.left as i64, frame.top as i64);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// 100x200 bitmap, columns 0-9 and 90-99 fully transparent, the rest
    /// opaque.
    fn letterboxed() -> RgbaImage {
        RgbaImage::from_fn(100, 200, |x, _| {
            if (10..90).contains(&x) {
                Rgba([0, 120, 200, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }

    #[test]
    fn test_edge_detection_finds_content_columns() {
        let bitmap = letterboxed();
        assert_eq!(find_left_edge(&bitmap, 10), 10);
        assert_eq!(find_right_edge(&bitmap, 10), 90);
    }

    #[test]
    fn test_edge_detection_on_fully_transparent_bitmap() {
        let bitmap = RgbaImage::new(50, 50);
        assert_eq!(find_left_edge(&bitmap, 10), 50);
        assert_eq!(find_right_edge(&bitmap, 10), 0);
    }

    #[test]
    fn test_draw_width_filled_crops_and_rescales() {
        let bitmap = letterboxed();
        let mut canvas = RgbaImage::new(200, 450);
        let frame = Rect::from_origin_size(20, 30, 160, 400);

        // Content width 80 scaled to frame width 160 doubles the bitmap:
        // 160x400 drawn at (20, 30).
        assert!(draw_width_filled(&mut canvas, &bitmap, frame, 10));

        assert_eq!(canvas.get_pixel(20, 30)[3], 255);
        assert_eq!(canvas.get_pixel(179, 429)[3], 255);
        // Outside the scaled content the canvas stays untouched.
        assert_eq!(canvas.get_pixel(19, 30)[3], 0);
        assert_eq!(canvas.get_pixel(180, 30)[3], 0);
        assert_eq!(canvas.get_pixel(20, 430)[3], 0);
    }

    #[test]
    fn test_no_margin_falls_back() {
        let bitmap = RgbaImage::from_pixel(100, 200, Rgba([5, 5, 5, 255]));
        let mut canvas = RgbaImage::new(200, 400);
        let frame = Rect::from_origin_size(0, 0, 160, 400);

        assert!(!draw_width_filled(&mut canvas, &bitmap, frame, 10));
        assert_eq!(canvas.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn test_fully_transparent_bitmap_falls_back() {
        let bitmap = RgbaImage::new(100, 200);
        let mut canvas = RgbaImage::new(200, 400);
        let frame = Rect::from_origin_size(0, 0, 160, 400);

        assert!(!draw_width_filled(&mut canvas, &bitmap, frame, 10));
    }

    #[test]
    fn test_zero_width_frame_falls_back() {
        let bitmap = letterboxed();
        let mut canvas = RgbaImage::new(200, 400);
        let frame = Rect::from_origin_size(0, 0, 0, 400);

        assert!(!draw_width_filled(&mut canvas, &bitmap, frame, 10));
    }
}
