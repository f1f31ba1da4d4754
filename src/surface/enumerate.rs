//! Surface discovery and geometric normalization.
//!
//! Turns the platform's raw surface roots into an ordered list of
//! [`WindowSurface`] values ready for capture: invisible roots dropped,
//! overlay rectangles refined to their visible content, coordinates
//! normalized so the topmost-leftmost surface sits at (0, 0), and primaries
//! moved in front of the overlays they own.

use log::debug;

use crate::config::CaptureConfig;
use crate::platform::{SurfaceNode, SurfaceProvider};
use crate::surface::{SurfaceKind, WindowSurface};

/// Describes every currently visible rendering surface, in an order where
/// any primary surface precedes the overlays that reference it as owner.
///
/// Never blocks and never fails: when introspection is unavailable the
/// result is simply empty.
pub fn enumerate_surfaces(
    provider: &dyn SurfaceProvider,
    config: &CaptureConfig,
) -> Vec<WindowSurface> {
    let roots = provider.list_visible_surfaces();

    let mut surfaces: Vec<WindowSurface> = Vec::with_capacity(roots.len());
    for root in roots {
        if !root.visible {
            continue;
        }

        let mut rect = root.frame;

        // Overlay containers often pad transparent space above their real
        // content; replace the root rect with the first content node that
        // sits visibly below the top of the screen.
        if root.kind == SurfaceKind::Overlay {
            if let Some(content) = &root.content {
                if let Some(found) = find_sheet_content(content, 0, config) {
                    if !std::ptr::eq(found, content) {
                        debug!(
                            "surface {:?}: refined frame {:?} -> {:?}",
                            root.handle, rect, found.frame
                        );
                        rect = found.frame;
                    }
                }
            }
        }

        surfaces.push(WindowSurface {
            kind: root.kind,
            screen_rect: rect,
            original_frame: rect,
            dim_amount: root.dim_amount,
            owner_token: root.owner_token,
            handle: root.handle,
        });
    }

    offset_to_origin(&mut surfaces);
    ensure_primaries_before_overlays(&mut surfaces);

    debug!("enumerated {} surface(s)", surfaces.len());
    surfaces
}

/// Depth-first search for the overlay's visible sheet: the first node whose
/// vertical screen offset exceeds the content-top threshold. Returns the
/// root itself when the root already qualifies (the caller keeps the root
/// rect in that case).
fn find_sheet_content<'a>(
    node: &'a SurfaceNode,
    depth: u32,
    config: &CaptureConfig,
) -> Option<&'a SurfaceNode> {
    if depth > config.max_content_depth {
        return None;
    }

    if node.frame.top > config.content_top_threshold_px {
        return Some(node);
    }

    for child in &node.children {
        if !child.visible {
            continue;
        }
        if let Some(found) = find_sheet_content(child, depth + 1, config) {
            return Some(found);
        }
    }

    None
}

/// Shifts all rectangles so the minimum top-left across surfaces is (0, 0),
/// making later compositing independent of absolute screen coordinates.
fn offset_to_origin(surfaces: &mut [WindowSurface]) {
    let Some(min_left) = surfaces.iter().map(|s| s.screen_rect.left).min() else {
        return;
    };
    let min_top = surfaces.iter().map(|s| s.screen_rect.top).min().unwrap_or(0);

    for surface in surfaces.iter_mut() {
        surface.screen_rect.offset(-min_left, -min_top);
        surface.original_frame = surface.screen_rect;
    }
}

/// Single forward pass restoring z-order: each overlay with an owner token
/// must be preceded by the primary surface sharing that token. Stable for
/// everything else.
fn ensure_primaries_before_overlays(surfaces: &mut Vec<WindowSurface>) {
    if surfaces.len() <= 1 {
        return;
    }

    for overlay_index in 0..surfaces.len() - 1 {
        let overlay = &surfaces[overlay_index];
        let Some(token) = overlay.owner_token else {
            continue;
        };
        if !overlay.is_overlay() {
            continue;
        }

        let owner_index = surfaces
            .iter()
            .skip(overlay_index + 1)
            .position(|s| s.is_primary() && s.owner_token == Some(token))
            .map(|offset| overlay_index + 1 + offset);

        if let Some(owner_index) = owner_index {
            let owner = surfaces.remove(owner_index);
            surfaces.insert(overlay_index, owner);
        }
    }
}
