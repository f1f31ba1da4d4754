//! Writing composites to disk for report attachment.

use anyhow::Context;
use chrono::Local;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

use crate::surface::CompositeImage;

/// Writes the composite as a PNG into `directory` under a unique
/// timestamped filename, creating the directory if needed. Returns the path
/// of the written file.
pub fn write_composite_to_dir(
    composite: &CompositeImage,
    directory: &Path,
) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(directory)
        .with_context(|| format!("failed to create {}", directory.display()))?;

    let path = directory.join(unique_filename("screenshot"));
    composite
        .as_image()
        .save(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;

    debug!("wrote composite to {}", path.display());
    Ok(path)
}

/// Unique filename starting with the prefix: `<prefix>_<timestamp>.png`,
/// millisecond resolution.
fn unique_filename(prefix: &str) -> String {
    format!("{}_{}.png", prefix, Local::now().format("%Y%m%d_%H%M%S%3f"))
}
