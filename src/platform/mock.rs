//! In-memory surface provider used by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use image::RgbaImage;

use crate::platform::{CaptureSink, RawSurface, SurfaceProvider};
use crate::surface::WindowSurface;

/// How a mock capture request resolves.
pub enum CaptureBehavior {
    /// Resolve synchronously with the given pixels.
    Succeed(RgbaImage),
    /// Resolve from a spawned thread after a short delay.
    SucceedAsync(RgbaImage),
    /// Resolve synchronously as a failure.
    Fail,
    /// Never resolve, simulating a hung capture.
    Stall,
}

pub struct MockProvider {
    roots: Vec<RawSurface>,
    behaviors: Mutex<HashMap<u64, CaptureBehavior>>,
    requests: AtomicUsize,
}

impl MockProvider {
    pub fn new(roots: Vec<RawSurface>) -> Self {
        Self {
            roots,
            behaviors: Mutex::new(HashMap::new()),
            requests: AtomicUsize::new(0),
        }
    }

    /// Registers the capture behavior for the surface with the given handle.
    /// Unregistered handles fail their captures.
    pub fn with_capture(self, handle: u64, behavior: CaptureBehavior) -> Self {
        self.behaviors.lock().unwrap().insert(handle, behavior);
        self
    }

    /// Number of capture requests the pipeline actually issued.
    pub fn capture_requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl SurfaceProvider for MockProvider {
    fn list_visible_surfaces(&self) -> Vec<RawSurface> {
        self.roots.clone()
    }

    fn request_capture(&self, surface: &WindowSurface, done: CaptureSink) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let behavior = self.behaviors.lock().unwrap().remove(&surface.handle.0);
        match behavior {
            Some(CaptureBehavior::Succeed(image)) => done(Some(image)),
            Some(CaptureBehavior::SucceedAsync(image)) => {
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(10));
                    done(Some(image));
                });
            }
            Some(CaptureBehavior::Stall) => {
                // Leak the sink so the request stays pending forever, like a
                // hardware capture that never comes back.
                std::mem::forget(done);
            }
            Some(CaptureBehavior::Fail) | None => done(None),
        }
    }
}
