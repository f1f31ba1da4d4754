//! Core data model for captured rendering surfaces.

use image::RgbaImage;

use crate::geometry::Rect;
use crate::platform::{OwnerToken, SurfaceHandle};

/// What role a rendering surface plays on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceKind {
    /// The main application window.
    Primary,
    /// Anything else visible at the same time: dialog, bottom sheet, popup.
    Overlay,
}

/// One visible rendering surface at the moment of capture.
#[derive(Clone, Debug)]
pub struct WindowSurface {
    pub kind: SurfaceKind,
    /// On-screen bounding box, normalized so the topmost-leftmost surface in
    /// the enumeration starts at (0, 0).
    pub screen_rect: Rect,
    /// Snapshot of `screen_rect` taken at the end of enumeration. The
    /// renderer draws at this position; it never changes afterwards.
    pub original_frame: Rect,
    /// Scrim strength recorded behind this surface, 0.0..=1.0.
    pub dim_amount: f32,
    /// Correlates an overlay to its owning primary surface. Used for
    /// ordering only, never for drawing.
    pub owner_token: Option<OwnerToken>,
    /// Platform handle the capture primitive reads pixels through.
    pub handle: SurfaceHandle,
}

impl WindowSurface {
    pub fn is_primary(&self) -> bool {
        self.kind == SurfaceKind::Primary
    }

    pub fn is_overlay(&self) -> bool {
        self.kind == SurfaceKind::Overlay
    }
}

/// A surface paired with its captured pixels, or an explicit absence when
/// the capture failed.
#[derive(Clone, Debug)]
pub struct CaptureResult {
    pub surface: WindowSurface,
    pub bitmap: Option<RgbaImage>,
}

/// The flattened screenshot produced by one pipeline run.
///
/// Created once per invocation; ownership transfers to the caller.
#[derive(Clone, Debug)]
pub struct CompositeImage {
    image: RgbaImage,
}

impl CompositeImage {
    pub(crate) fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Borrows the flattened pixels.
    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    /// Consumes the composite, yielding the flattened pixels.
    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}
