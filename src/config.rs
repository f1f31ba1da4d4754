//! Capture pipeline configuration.
//!
//! All heuristic thresholds used by surface enumeration and compositing live
//! here, with defaults matching the values the pipeline was tuned with.
//! Configuration is instance-scoped: construct one and pass it to the
//! pipeline, there is no global state.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tuning parameters for the capture-and-composite pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Maximum time to wait for all per-surface captures (milliseconds).
    /// `None` waits indefinitely.
    #[serde(default = "default_capture_timeout_ms")]
    pub capture_timeout_ms: Option<u64>,

    /// A surface whose bottom edge is within this many pixels of the screen
    /// bottom is treated as a candidate bottom sheet.
    #[serde(default = "default_bottom_edge_tolerance_px")]
    pub bottom_edge_tolerance_px: i32,

    /// Minimum height of a bottom sheet, as a fraction of screen height.
    /// Shorter surfaces near the bottom edge (toasts, snackbars) are drawn
    /// as-is.
    #[serde(default = "default_min_sheet_height_ratio")]
    pub min_sheet_height_ratio: f32,

    /// Vertical screen offset (pixels) below which a node in an overlay's
    /// content tree is considered letterboxing rather than the visible sheet.
    #[serde(default = "default_content_top_threshold_px")]
    pub content_top_threshold_px: i32,

    /// Maximum depth when walking an overlay's content tree for its visible
    /// sheet.
    #[serde(default = "default_max_content_depth")]
    pub max_content_depth: u32,

    /// Number of rows sampled when scanning a bitmap for transparent side
    /// margins.
    #[serde(default = "default_edge_sample_rows")]
    pub edge_sample_rows: u32,
}

fn default_capture_timeout_ms() -> Option<u64> {
    Some(5000)
}

fn default_bottom_edge_tolerance_px() -> i32 {
    10
}

fn default_min_sheet_height_ratio() -> f32 {
    0.1
}

fn default_content_top_threshold_px() -> i32 {
    100
}

fn default_max_content_depth() -> u32 {
    10
}

fn default_edge_sample_rows() -> u32 {
    10
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            capture_timeout_ms: default_capture_timeout_ms(),
            bottom_edge_tolerance_px: default_bottom_edge_tolerance_px(),
            min_sheet_height_ratio: default_min_sheet_height_ratio(),
            content_top_threshold_px: default_content_top_threshold_px(),
            max_content_depth: default_max_content_depth(),
            edge_sample_rows: default_edge_sample_rows(),
        }
    }
}

impl CaptureConfig {
    /// Loads a configuration from a JSON file.
    ///
    /// Missing fields fall back to their defaults, so a partial file tuning
    /// one threshold is valid.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse config from {}", path.display()))
    }
}
