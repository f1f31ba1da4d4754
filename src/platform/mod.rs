//! The platform capability seam.
//!
//! Everything the pipeline needs from the host windowing system goes through
//! [`SurfaceProvider`]: enumerating the currently visible rendering surfaces
//! and reading pixels out of one of them. The rest of the crate is platform
//! independent and is tested against in-memory providers.

use image::RgbaImage;

use crate::geometry::Rect;
use crate::surface::{SurfaceKind, WindowSurface};

#[cfg(windows)]
pub mod windows;

#[cfg(test)]
pub(crate) mod mock;

/// Opaque reference to a platform rendering surface. The provider owns the
/// mapping to the real OS handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u64);

/// Opaque identifier correlating an overlay to its owning primary surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OwnerToken(pub u64);

/// One node of a surface's content tree, used to locate the visible sheet
/// inside overlay containers that letterbox their content.
#[derive(Clone, Debug)]
pub struct SurfaceNode {
    /// Absolute on-screen bounds of this node.
    pub frame: Rect,
    pub visible: bool,
    pub children: Vec<SurfaceNode>,
}

/// Raw description of one surface root, as reported by the platform before
/// any normalization or reordering.
#[derive(Clone, Debug)]
pub struct RawSurface {
    pub handle: SurfaceHandle,
    pub kind: SurfaceKind,
    pub visible: bool,
    /// Absolute on-screen bounds of the surface root.
    pub frame: Rect,
    /// Scrim strength the platform recorded behind this surface, 0 if none.
    pub dim_amount: f32,
    pub owner_token: Option<OwnerToken>,
    /// Content tree rooted at the surface's own view, when the platform can
    /// describe it. `None` disables content-rect refinement.
    pub content: Option<SurfaceNode>,
}

/// Completion callback for one asynchronous capture request. Resolved with
/// `Some(pixels)` on success, `None` on any failure. Invoked exactly once,
/// possibly from an arbitrary thread.
pub type CaptureSink = Box<dyn FnOnce(Option<RgbaImage>) + Send + 'static>;

/// Window-system capabilities consumed by the pipeline.
///
/// Implementations must not panic across this boundary: introspection
/// problems surface as an empty (or partial) list, capture problems resolve
/// the sink with `None`.
pub trait SurfaceProvider: Send + Sync {
    /// Describes every currently visible rendering surface. Returns an empty
    /// list when introspection is unavailable.
    fn list_visible_surfaces(&self) -> Vec<RawSurface>;

    /// Starts an asynchronous pixel capture of `surface` and resolves `done`
    /// when it completes. Must never block the calling thread on the capture
    /// itself and must resolve `done` exactly once.
    fn request_capture(&self, surface: &WindowSurface, done: CaptureSink);
}
