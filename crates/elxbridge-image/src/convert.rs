//! Dimensional conversions between host layout and registration layout.
//!
//! The registration tools accept 2D or 3D images. Host images may carry a
//! trailing singleton slice axis or a time axis, so they are reshaped before
//! being written and reshaped back once results are loaded.

use std::borrow::Cow;

use tracing::warn;

use crate::error::{ImageError, ImageResult};
use crate::image::Image;

/// Converts an image into the layout handed to the external tools.
///
/// - 2D and 3D volumes with more than one slice are returned unchanged.
/// - 3D images with a single slice are collapsed to 2D.
/// - 4D images are truncated to their first time step (lossy, logged), then
///   collapsed when that step is a single slice.
///
/// Any other dimensionality is rejected.
pub fn prepare_for_registration(image: &Image) -> ImageResult<Cow<'_, Image>> {
    match image.dimension() {
        2 => Ok(Cow::Borrowed(image)),
        3 if image.size(2) == 1 => Ok(Cow::Owned(collapse_trailing_singleton(image)?)),
        3 => Ok(Cow::Borrowed(image)),
        4 => {
            warn!(
                shape = %image.shape(),
                "3D+t images are not well supported! Time step 0 selected."
            );
            let volume = first_time_step(image)?;
            if volume.size(2) == 1 {
                Ok(Cow::Owned(collapse_trailing_singleton(&volume)?))
            } else {
                Ok(Cow::Owned(volume))
            }
        }
        dimension => Err(ImageError::UnsupportedDimension {
            dimension,
            shape: image.shape(),
        }),
    }
}

/// Returns time step 0 of a 4D image as a 3D volume with the same width,
/// height and depth.
pub fn first_time_step(image: &Image) -> ImageResult<Image> {
    if image.dimension() != 4 {
        return Err(ImageError::UnsupportedDimension {
            dimension: image.dimension(),
            shape: image.shape(),
        });
    }
    let dims = image.dims()[..3].to_vec();
    let len = dims.iter().product::<usize>() * image.components();
    let data = image.data()[..len].to_vec();
    Ok(Image::from_parts(
        image.pixel_type(),
        dims,
        image.components(),
        image.geometry().submatrix(3),
        data,
    ))
}

/// Drops a trailing axis of size 1 from a 3D image.
pub fn collapse_trailing_singleton(image: &Image) -> ImageResult<Image> {
    if image.dimension() != 3 || image.size(2) != 1 {
        return Err(ImageError::UnsupportedDimension {
            dimension: image.dimension(),
            shape: image.shape(),
        });
    }
    Ok(Image::from_parts(
        image.pixel_type(),
        image.dims()[..2].to_vec(),
        image.components(),
        image.geometry().submatrix(2),
        image.data().to_vec(),
    ))
}

/// Converts a registration result back into host layout.
///
/// 2D results become single-slice 3D volumes. The slice spacing is taken
/// from `z_spacing` (usually the spacing of the image that was warped) and
/// defaults to 1.
pub fn to_host_layout(image: Image, z_spacing: Option<f64>) -> Image {
    if image.dimension() != 2 {
        return image;
    }
    let geometry = image
        .geometry()
        .extended(3, z_spacing.filter(|s| *s > 0.0).unwrap_or(1.0));
    let dims = vec![image.size(0), image.size(1), 1];
    let pixel_type = image.pixel_type();
    let components = image.components();
    Image::from_parts(pixel_type, dims, components, geometry, image.into_data())
}

/// Stacks effectively-2D slices into one 3D volume.
///
/// Every slice must share width, height, pixel type and component count with
/// the first. The in-plane geometry of the first slice is kept and
/// `z_spacing` becomes the slice distance.
pub fn stack_slices(slices: &[Image], z_spacing: f64) -> ImageResult<Image> {
    let first = slices.first().ok_or(ImageError::SliceMismatch {
        index: 0,
        message: "no slices given".to_string(),
    })?;
    let flat_first = flatten_slice(first, 0)?;
    let (width, height) = (flat_first.size(0), flat_first.size(1));
    let per_slice = width * height * first.components();

    let mut data = Vec::with_capacity(per_slice * slices.len());
    for (index, slice) in slices.iter().enumerate() {
        let flat = flatten_slice(slice, index)?;
        if flat.size(0) != width || flat.size(1) != height {
            return Err(ImageError::SliceMismatch {
                index,
                message: format!("shape [{}] differs from [{}, {}]", flat.shape(), width, height),
            });
        }
        if flat.pixel_type() != first.pixel_type() || flat.components() != first.components() {
            return Err(ImageError::SliceMismatch {
                index,
                message: format!(
                    "pixel type {} x{} differs from {} x{}",
                    flat.pixel_type(),
                    flat.components(),
                    first.pixel_type(),
                    first.components()
                ),
            });
        }
        data.extend_from_slice(flat.data());
    }

    let spacing = if z_spacing > 0.0 { z_spacing } else { 1.0 };
    Ok(Image::from_parts(
        first.pixel_type(),
        vec![width, height, slices.len()],
        first.components(),
        flat_first.geometry().extended(3, spacing),
        data,
    ))
}

fn flatten_slice(image: &Image, index: usize) -> ImageResult<Cow<'_, Image>> {
    match image.dimension() {
        2 => Ok(Cow::Borrowed(image)),
        3 if image.size(2) == 1 => Ok(Cow::Owned(collapse_trailing_singleton(image)?)),
        _ => Err(ImageError::SliceMismatch {
            index,
            message: format!("shape [{}] is not a single slice", image.shape()),
        }),
    }
}
