//! Surface data model and discovery.
//!
//! This module provides:
//! - The capture data model (`WindowSurface`, `CaptureResult`,
//!   `CompositeImage`)
//! - Surface discovery and normalization (`enumerate_surfaces`)

pub mod enumerate;
pub mod model;

pub use enumerate::enumerate_surfaces;
pub use model::{CaptureResult, CompositeImage, SurfaceKind, WindowSurface};
