//! Volume reconstruction from individually registered slices.

use elxbridge_image::convert::stack_slices;
use elxbridge_image::{Image, PixelType};
use tracing::info;

use crate::config::RegistrationConfig;
use crate::error::RegistrationResult;
use crate::helper::RegistrationHelper;
use crate::runner::ProcessRunner;

/// A slice and the transformation chain that aligns it.
#[derive(Debug, Clone)]
pub struct ReconstructionSlice {
    pub image: Image,
    /// Empty when the slice is already in the reference space.
    pub transformations: Vec<String>,
}

impl ReconstructionSlice {
    pub fn new(image: Image, transformations: Vec<String>) -> Self {
        Self {
            image,
            transformations,
        }
    }
}

/// Warps each slice with its own chain and stacks the results in order.
///
/// Slices without a chain are stacked unchanged. `z_spacing` becomes the
/// distance between slices of the returned volume.
pub fn reconstruct<R: ProcessRunner>(
    config: &RegistrationConfig,
    runner: &R,
    slices: &[ReconstructionSlice],
    pixel_type: PixelType,
    interpolation_order: u8,
    z_spacing: f64,
) -> RegistrationResult<Image> {
    info!("***** Initialize new volume *****");
    let mut ordered = Vec::with_capacity(slices.len());
    for slice in slices {
        if slice.transformations.is_empty() {
            ordered.push(slice.image.clone());
            continue;
        }
        let mut helper = RegistrationHelper::with_runner(config.clone(), runner);
        helper.set_transformations(slice.transformations.clone());
        ordered.push(helper.warp_image(&slice.image, pixel_type, interpolation_order)?);
    }

    info!("***** Copy data to volume *****");
    Ok(stack_slices(&ordered, z_spacing)?)
}
