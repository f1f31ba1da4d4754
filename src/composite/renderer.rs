//! Flattens captured surfaces into the final composite bitmap.
//!
//! Pure function of its inputs: surfaces are drawn in enumeration order at
//! their recorded frames, with two corrections reconstructing what the user
//! actually saw — full-screen overlay bitmaps land at the origin instead of
//! their recorded offset, and bottom sheets get their transparent side
//! margins cropped away. Between a primary surface and a dimming overlay,
//! the window manager's scrim is re-painted, since no single surface's own
//! pixels contain it.

use image::RgbaImage;
use log::{debug, warn};

use crate::composite::{draw, edges};
use crate::config::CaptureConfig;
use crate::geometry::Rect;
use crate::surface::{CaptureResult, CompositeImage};

/// Merges the captured bitmaps into one image matching the on-screen state.
///
/// Absent captures are skipped; returns `None` when no usable bitmap
/// remains.
pub fn composite(results: &[CaptureResult], config: &CaptureConfig) -> Option<CompositeImage> {
    let Some(reference_height) = reference_height(results) else {
        debug!("no usable bitmaps, nothing to composite");
        return None;
    };

    let (width, height) = canvas_size(results, reference_height);
    if width == 0 || height == 0 {
        return None;
    }
    let mut canvas = RgbaImage::new(width, height);

    for (index, result) in results.iter().enumerate() {
        let Some(bitmap) = &result.bitmap else {
            continue;
        };
        let frame = result.surface.original_frame;
        if frame.is_empty() {
            warn!(
                "surface {:?} has malformed frame {:?}, skipping draw",
                result.surface.handle, frame
            );
            continue;
        }

        draw_surface(&mut canvas, bitmap, frame, reference_height, config);

        // The scrim the window manager painted behind a dimming overlay
        // exists in no captured bitmap; reconstruct it between the primary
        // surface and that overlay.
        if result.surface.is_primary() {
            draw_scrim_before(&mut canvas, results, index + 1, reference_height);
        }
    }

    Some(CompositeImage::new(canvas))
}

/// Height of the primary surface's bitmap when present, otherwise of the
/// first captured bitmap. `None` when every capture failed.
fn reference_height(results: &[CaptureResult]) -> Option<u32> {
    results
        .iter()
        .find(|r| r.surface.is_primary() && r.bitmap.is_some())
        .or_else(|| results.iter().find(|r| r.bitmap.is_some()))
        .and_then(|r| r.bitmap.as_ref())
        .map(|bitmap| bitmap.height())
}

/// Canvas width is the widest bitmap; height fits every surface at its
/// recorded offset. A full-screen bitmap contributes the reference height
/// itself, because it will be drawn at the origin regardless of its
/// recorded offset.
fn canvas_size(results: &[CaptureResult], reference_height: u32) -> (u32, u32) {
    let mut width = 0u32;
    let mut height = reference_height;

    for result in results {
        let Some(bitmap) = &result.bitmap else {
            continue;
        };
        width = width.max(bitmap.width());

        let contribution = if bitmap.height() == reference_height {
            reference_height
        } else {
            let top = result.surface.original_frame.top.max(0) as u32;
            top.saturating_add(bitmap.height())
        };
        height = height.max(contribution);
    }

    (width, height)
}

fn draw_surface(
    canvas: &mut RgbaImage,
    bitmap: &RgbaImage,
    frame: Rect,
    reference_height: u32,
    config: &CaptureConfig,
) {
    // A full-screen bitmap recorded at a vertical offset already contains
    // its own backdrop; honoring the offset would double-shift it.
    if bitmap.height() == reference_height && frame.top > 0 {
        draw::blit(canvas, bitmap, 0, 0);
        return;
    }

    if is_bottom_sheet(frame, reference_height, config)
        && edges::draw_width_filled(canvas, bitmap, frame, config.edge_sample_rows)
    {
        return;
    }

    draw::blit(canvas, bitmap, frame.left as i64, frame.top as i64);
}

/// A surface whose frame reaches the bottom edge of the screen and covers a
/// significant share of its height is treated as a bottom sheet.
fn is_bottom_sheet(frame: Rect, reference_height: u32, config: &CaptureConfig) -> bool {
    let screen_height = reference_height as i32;
    let extends_to_bottom = frame.bottom >= screen_height - config.bottom_edge_tolerance_px;
    let significant_height =
        frame.height() as f32 > screen_height as f32 * config.min_sheet_height_ratio;
    extends_to_bottom && significant_height
}

/// Paints the reconstructed scrim when the surface at `next_index` is a
/// present dimming overlay. Full-screen overlay bitmaps are skipped: their
/// rendering technology paints the dim itself, so it is already in the
/// pixels.
fn draw_scrim_before(
    canvas: &mut RgbaImage,
    results: &[CaptureResult],
    next_index: usize,
    reference_height: u32,
) {
    let Some(next) = results.get(next_index) else {
        return;
    };
    let Some(bitmap) = &next.bitmap else {
        return;
    };
    if !next.surface.is_overlay() || next.surface.dim_amount <= 0.0 {
        return;
    }
    if bitmap.height() == reference_height {
        return;
    }

    let alpha = (255.0 * next.surface.dim_amount).round().clamp(0.0, 255.0) as u8;
    debug!("painting scrim at alpha {alpha} before overlay {:?}", next.surface.handle);
    draw::dim_fill(canvas, alpha);
}
