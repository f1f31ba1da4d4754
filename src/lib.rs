//! Multi-surface screenshot capture and compositing.
//!
//! Captures every rendering surface the host application currently has on
//! screen — the main window plus any concurrently visible dialogs, bottom
//! sheets and popups — and flattens them into one bitmap matching what the
//! user saw, including the scrim dimming behind modal surfaces. The result
//! is meant to be attached to an in-app feedback report.
//!
//! The pipeline runs in three stages: surface discovery
//! ([`enumerate_surfaces`]), concurrent per-surface capture with a join
//! barrier ([`capture_all`]), and compositing ([`composite`]).
//! [`capture_and_composite`] sequences all three against a
//! [`SurfaceProvider`], the one platform-specific seam. On Windows the
//! crate ships a provider backed by the Windows Graphics Capture API; any
//! other windowing stack plugs in by implementing the trait.

pub mod capture;
pub mod composite;
pub mod config;
pub mod geometry;
pub mod output;
pub mod platform;
pub mod surface;

use std::sync::mpsc;

pub use capture::capture_all;
pub use composite::composite;
pub use config::CaptureConfig;
pub use geometry::Rect;
pub use platform::{
    CaptureSink, OwnerToken, RawSurface, SurfaceHandle, SurfaceNode, SurfaceProvider,
};
#[cfg(windows)]
pub use platform::windows::WindowsSurfaceProvider;
pub use surface::{
    CaptureResult, CompositeImage, SurfaceKind, WindowSurface, enumerate_surfaces,
};

/// Captures everything currently on screen and delivers the flattened
/// screenshot, or `None` when no surface could be captured.
///
/// The completion callback runs on the capture join thread, except for the
/// no-surfaces case, which completes synchronously on the calling thread.
/// Per-surface failures are recovered internally; nothing here panics the
/// hosting process.
pub fn capture_and_composite<F>(provider: &dyn SurfaceProvider, config: &CaptureConfig, on_complete: F)
where
    F: FnOnce(Option<CompositeImage>) + Send + 'static,
{
    let surfaces = enumerate_surfaces(provider, config);
    let render_config = config.clone();
    capture::capture_all(provider, surfaces, config, move |results| {
        on_complete(composite::composite(&results, &render_config));
    });
}

/// Blocking variant of [`capture_and_composite`] for callers without
/// callback plumbing. Waits for the join (bounded by the configured capture
/// timeout) and returns the composite directly.
pub fn capture_and_composite_blocking(
    provider: &dyn SurfaceProvider,
    config: &CaptureConfig,
) -> Option<CompositeImage> {
    let (tx, rx) = mpsc::channel();
    capture_and_composite(provider, config, move |result| {
        let _ = tx.send(result);
    });
    rx.recv().unwrap_or(None)
}
