//! Concurrent per-surface capture with a message-passing join.
//!
//! One capture request is issued per surface; every resolution, success or
//! failure, is funneled through an mpsc channel into a dedicated join
//! thread. That thread is the only writer of the result slots, so no lock
//! guards the join state no matter which threads the platform resolves
//! captures on.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use image::RgbaImage;
use log::warn;

use crate::config::CaptureConfig;
use crate::platform::SurfaceProvider;
use crate::surface::{CaptureResult, WindowSurface};

/// Captures every surface in `surfaces` and invokes `on_complete` exactly
/// once with the full positional result list, absent entries included.
///
/// An empty surface list completes synchronously on the calling thread;
/// otherwise `on_complete` runs on the join thread after all captures have
/// resolved or the configured deadline has passed. A failed capture never
/// aborts its siblings.
pub fn capture_all<F>(
    provider: &dyn SurfaceProvider,
    surfaces: Vec<WindowSurface>,
    config: &CaptureConfig,
    on_complete: F,
) where
    F: FnOnce(Vec<CaptureResult>) + Send + 'static,
{
    if surfaces.is_empty() {
        on_complete(Vec::new());
        return;
    }

    let (tx, rx) = mpsc::channel::<(usize, Option<RgbaImage>)>();

    for (index, surface) in surfaces.iter().enumerate() {
        // Zero-area surfaces cannot produce pixels; resolve them as failures
        // without touching the platform.
        if surface.screen_rect.is_empty() {
            warn!(
                "surface {:?} has zero-area geometry {:?}, skipping capture",
                surface.handle, surface.screen_rect
            );
            let _ = tx.send((index, None));
            continue;
        }

        let resolved = tx.clone();
        provider.request_capture(
            surface,
            Box::new(move |bitmap| {
                // The join thread may already be gone after a timeout; a
                // late resolution is dropped on the floor.
                let _ = resolved.send((index, bitmap));
            }),
        );
    }
    drop(tx);

    let deadline = config
        .capture_timeout_ms
        .map(|ms| Instant::now() + Duration::from_millis(ms));

    thread::spawn(move || {
        let results = join_captures(rx, surfaces, deadline);
        on_complete(results);
    });
}

/// Receives capture resolutions until all slots are filled, the channel
/// disconnects, or the deadline passes. Unresolved slots stay absent.
fn join_captures(
    rx: mpsc::Receiver<(usize, Option<RgbaImage>)>,
    surfaces: Vec<WindowSurface>,
    deadline: Option<Instant>,
) -> Vec<CaptureResult> {
    let count = surfaces.len();
    let mut slots: Vec<Option<RgbaImage>> = (0..count).map(|_| None).collect();
    let mut seen = vec![false; count];
    let mut resolved = 0;

    while resolved < count {
        let message = match deadline {
            Some(deadline) => {
                let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                    break;
                };
                match rx.recv_timeout(remaining) {
                    Ok(message) => message,
                    Err(RecvTimeoutError::Timeout) => break,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match rx.recv() {
                Ok(message) => message,
                Err(_) => break,
            },
        };

        let (index, bitmap) = message;
        if seen[index] {
            warn!("duplicate resolution for capture {index}, ignoring");
            continue;
        }
        seen[index] = true;
        if bitmap.is_none() {
            warn!("capture {} of {count} failed", index + 1);
        }
        slots[index] = bitmap;
        resolved += 1;
    }

    if resolved < count {
        warn!("{} capture(s) unresolved at join, treated as failed", count - resolved);
    }

    surfaces
        .into_iter()
        .zip(slots)
        .map(|(surface, bitmap)| CaptureResult { surface, bitmap })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::platform::mock::{CaptureBehavior, MockProvider};
    use crate::platform::SurfaceHandle;
    use crate::surface::SurfaceKind;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn surface(handle: u64, rect: Rect) -> WindowSurface {
        WindowSurface {
            kind: SurfaceKind::Primary,
            screen_rect: rect,
            original_frame: rect,
            dim_amount: 0.0,
            owner_token: None,
            handle: SurfaceHandle(handle),
        }
    }

    fn image(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]))
    }

    fn wait_for_results(
        provider: &MockProvider,
        surfaces: Vec<WindowSurface>,
        config: &CaptureConfig,
    ) -> Vec<CaptureResult> {
        let (tx, rx) = mpsc::channel();
        capture_all(provider, surfaces, config, move |results| {
            tx.send(results).unwrap();
        });
        rx.recv_timeout(Duration::from_secs(10)).expect("join never completed")
    }

    #[test]
    fn test_empty_list_completes_synchronously() {
        let provider = MockProvider::new(vec![]);
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();

        capture_all(&provider, Vec::new(), &CaptureConfig::default(), move |results| {
            assert!(results.is_empty());
            flag.store(true, Ordering::SeqCst);
        });

        // No thread involved: the callback has already run.
        assert!(fired.load(Ordering::SeqCst));
        assert_eq!(provider.capture_requests(), 0);
    }

    #[test]
    fn test_all_captures_join_in_positional_order() {
        let provider = MockProvider::new(vec![])
            .with_capture(1, CaptureBehavior::SucceedAsync(image(100, 200)))
            .with_capture(2, CaptureBehavior::SucceedAsync(image(50, 50)));
        let surfaces = vec![
            surface(1, Rect::from_origin_size(0, 0, 100, 200)),
            surface(2, Rect::from_origin_size(0, 0, 50, 50)),
        ];

        let results = wait_for_results(&provider, surfaces, &CaptureConfig::default());

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].surface.handle, SurfaceHandle(1));
        assert_eq!(results[0].bitmap.as_ref().unwrap().dimensions(), (100, 200));
        assert_eq!(results[1].surface.handle, SurfaceHandle(2));
        assert_eq!(results[1].bitmap.as_ref().unwrap().dimensions(), (50, 50));
    }

    #[test]
    fn test_failure_does_not_abort_siblings() {
        let provider = MockProvider::new(vec![])
            .with_capture(1, CaptureBehavior::Succeed(image(10, 10)))
            .with_capture(2, CaptureBehavior::Fail)
            .with_capture(3, CaptureBehavior::SucceedAsync(image(20, 20)));
        let surfaces = vec![
            surface(1, Rect::from_origin_size(0, 0, 10, 10)),
            surface(2, Rect::from_origin_size(0, 0, 10, 10)),
            surface(3, Rect::from_origin_size(0, 0, 20, 20)),
        ];

        let results = wait_for_results(&provider, surfaces, &CaptureConfig::default());

        assert!(results[0].bitmap.is_some());
        assert!(results[1].bitmap.is_none());
        assert!(results[2].bitmap.is_some());
    }

    #[test]
    fn test_zero_area_surface_skips_the_platform() {
        let provider = MockProvider::new(vec![])
            .with_capture(2, CaptureBehavior::Succeed(image(10, 10)));
        let surfaces = vec![
            surface(1, Rect::from_origin_size(0, 0, 0, 0)),
            surface(2, Rect::from_origin_size(0, 0, 10, 10)),
        ];

        let results = wait_for_results(&provider, surfaces, &CaptureConfig::default());

        // Only the non-degenerate surface reached the provider.
        assert_eq!(provider.capture_requests(), 1);
        assert!(results[0].bitmap.is_none());
        assert!(results[1].bitmap.is_some());
    }

    #[test]
    fn test_hung_capture_resolves_absent_at_deadline() {
        let provider = MockProvider::new(vec![])
            .with_capture(1, CaptureBehavior::Succeed(image(10, 10)))
            .with_capture(2, CaptureBehavior::Stall);
        let surfaces = vec![
            surface(1, Rect::from_origin_size(0, 0, 10, 10)),
            surface(2, Rect::from_origin_size(0, 0, 10, 10)),
        ];
        let config = CaptureConfig {
            capture_timeout_ms: Some(100),
            ..CaptureConfig::default()
        };

        let results = wait_for_results(&provider, surfaces, &config);

        assert!(results[0].bitmap.is_some());
        assert!(results[1].bitmap.is_none());
    }
}
