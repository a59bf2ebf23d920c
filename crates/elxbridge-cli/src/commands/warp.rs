//! Warp command implementation
//!
//! Applies a stored transformation chain, or a deformation field, to an
//! image.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use elxbridge_backend_elastix::{RegistrationConfig, RegistrationHelper};
use elxbridge_image::PixelType;

use super::{read_image, write_image};

/// Inputs of one `warp` invocation.
#[derive(Debug, Clone)]
pub struct WarpOptions {
    pub input: PathBuf,
    /// Transform parameter files in chain order.
    pub transforms: Vec<PathBuf>,
    /// Deformation field used instead of transformix.
    pub field: Option<PathBuf>,
    /// Output pixel type; defaults to the input's.
    pub pixel_type: Option<PixelType>,
    pub order: u8,
    pub output: PathBuf,
}

/// Run the warp command
pub fn run(options: &WarpOptions, config: RegistrationConfig) -> Result<ExitCode> {
    if options.transforms.is_empty() && options.field.is_none() {
        bail!("Nothing to apply: pass --transform files or --field");
    }

    let input = read_image(&options.input)?;
    let chain = options
        .transforms
        .iter()
        .map(|path| {
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read transform file: {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut helper = RegistrationHelper::with_config(config);
    helper.set_transformations(chain);
    if let Some(ref path) = options.field {
        helper.set_deformation_field(Some(read_image(path)?));
    }

    let pixel_type = options.pixel_type.unwrap_or(input.pixel_type());
    let warped = helper.warp_image(&input, pixel_type, options.order)?;
    write_image(&options.output, &warped)?;

    println!(
        "{} {} -> {} ({}, {})",
        "SUCCESS".green().bold(),
        options.input.display(),
        options.output.display(),
        pixel_type,
        warped.shape()
    );
    Ok(ExitCode::SUCCESS)
}
