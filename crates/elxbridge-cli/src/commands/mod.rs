//! CLI command implementations

pub mod doctor;
pub mod params;
pub mod reconstruct;
pub mod register;
pub mod warp;

use std::path::Path;

use anyhow::{Context, Result};
use elxbridge_image::{nrrd, Image};

/// Reads an NRRD image, naming the file on failure.
pub(crate) fn read_image(path: &Path) -> Result<Image> {
    nrrd::read(path).with_context(|| format!("Failed to read image: {}", path.display()))
}

/// Writes an NRRD image, creating the parent directory.
pub(crate) fn write_image(path: &Path, image: &Image) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    nrrd::write(path, image).with_context(|| format!("Failed to write image: {}", path.display()))
}
