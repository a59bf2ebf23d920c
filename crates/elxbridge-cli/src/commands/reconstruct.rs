//! Reconstruct command implementation
//!
//! Builds a volume from slices listed in a JSON manifest.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;
use elxbridge_backend_elastix::{reconstruct, ReconstructionSlice, RegistrationConfig, SystemRunner};
use elxbridge_image::PixelType;
use serde::Deserialize;

use super::{read_image, write_image};

/// Slice list read from a manifest file.
///
/// ```json
/// {
///   "z_spacing": 0.05,
///   "slices": [
///     { "image": "slice0.nrrd" },
///     { "image": "slice1.nrrd", "transformations": ["slice1/TransformParameters.0.txt"] }
///   ]
/// }
/// ```
///
/// Relative paths are resolved against the manifest's directory.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub slices: Vec<ManifestSlice>,
    #[serde(default = "default_z_spacing")]
    pub z_spacing: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestSlice {
    pub image: PathBuf,
    #[serde(default)]
    pub transformations: Vec<PathBuf>,
}

fn default_z_spacing() -> f64 {
    1.0
}

impl Manifest {
    /// Reads a manifest and makes its paths absolute.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        let mut manifest: Manifest = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse manifest: {}", path.display()))?;

        let base = path.parent().unwrap_or(Path::new("."));
        for slice in &mut manifest.slices {
            slice.image = base.join(&slice.image);
            for transform in &mut slice.transformations {
                *transform = base.join(&*transform);
            }
        }
        Ok(manifest)
    }

    /// Loads every slice image and transformation chain.
    pub fn into_slices(self) -> Result<Vec<ReconstructionSlice>> {
        self.slices
            .into_iter()
            .map(|slice| {
                let chain = slice
                    .transformations
                    .iter()
                    .map(|path| {
                        fs::read_to_string(path).with_context(|| {
                            format!("Failed to read transform file: {}", path.display())
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(ReconstructionSlice::new(read_image(&slice.image)?, chain))
            })
            .collect()
    }
}

/// Run the reconstruct command
pub fn run(
    manifest: &Path,
    output: &Path,
    pixel_type: PixelType,
    order: u8,
    z_spacing: Option<f64>,
    config: RegistrationConfig,
) -> Result<ExitCode> {
    let manifest = Manifest::load(manifest)?;
    let z_spacing = z_spacing.unwrap_or(manifest.z_spacing);
    let slices = manifest.into_slices()?;
    println!(
        "{} {} slice(s), z spacing {}",
        "Reconstructing".cyan().bold(),
        slices.len(),
        z_spacing
    );

    let volume = reconstruct(&config, &SystemRunner, &slices, pixel_type, order, z_spacing)?;
    write_image(output, &volume)?;

    println!(
        "{} {} ({})",
        "SUCCESS".green().bold(),
        output.display(),
        volume.shape()
    );
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use elxbridge_image::{nrrd, Image};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_manifest_paths_are_relative_to_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slices.json");
        fs::write(
            &path,
            r#"{"slices": [{"image": "a.nrrd"}, {"image": "b.nrrd", "transformations": ["b/tp.txt"]}]}"#,
        )
        .unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.z_spacing, 1.0);
        assert_eq!(manifest.slices[0].image, dir.path().join("a.nrrd"));
        assert!(manifest.slices[0].transformations.is_empty());
        assert_eq!(manifest.slices[1].transformations, vec![dir.path().join("b/tp.txt")]);
    }

    #[test]
    fn test_unregistered_slices_are_stacked() {
        let dir = tempfile::tempdir().unwrap();
        for (name, value) in [("a.nrrd", 1.0), ("b.nrrd", 2.0)] {
            let image = Image::from_data(PixelType::F32, &[2, 2], 1, vec![value; 4]).unwrap();
            nrrd::write(dir.path().join(name), &image).unwrap();
        }
        let manifest = dir.path().join("slices.json");
        fs::write(
            &manifest,
            r#"{"z_spacing": 0.5, "slices": [{"image": "a.nrrd"}, {"image": "b.nrrd"}]}"#,
        )
        .unwrap();
        let output = dir.path().join("volume.nrrd");

        run(
            &manifest,
            &output,
            PixelType::F32,
            3,
            None,
            RegistrationConfig::default(),
        )
        .unwrap();

        let volume = nrrd::read(&output).unwrap();
        assert_eq!(volume.dims(), &[2, 2, 2]);
        assert_eq!(volume.geometry().spacing()[2], 0.5);
        assert_eq!(volume.get(&[1, 1, 1], 0), 2.0);
    }
}
