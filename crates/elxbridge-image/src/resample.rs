//! Resampling through a dense displacement field.
//!
//! The field lives on the fixed image grid. Each output voxel at physical
//! point `p` takes the moving image's value at `p + field(p)`.

use tracing::debug;

use crate::error::{ImageError, ImageResult};
use crate::image::Image;
use crate::pixel::PixelType;

/// Interpolation used when sampling the moving image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    NearestNeighbor,
    Linear,
}

impl Interpolation {
    /// Nearest neighbor for label-like integer data, linear otherwise.
    pub fn for_pixel_type(pixel_type: PixelType) -> Self {
        if pixel_type.is_integer() {
            Interpolation::NearestNeighbor
        } else {
            Interpolation::Linear
        }
    }
}

/// Warps `moving` onto the grid of `field`.
///
/// The result has the field's shape and geometry, the moving image's
/// component count, and samples converted to `pixel_type`. Points that map
/// outside the moving image are set to 0.
pub fn warp_with_displacement(
    moving: &Image,
    field: &Image,
    interpolation: Interpolation,
    pixel_type: PixelType,
) -> ImageResult<Image> {
    let n = field.dimension();
    if field.components() != n {
        return Err(ImageError::DisplacementMismatch {
            message: format!(
                "field has {} components for {} spatial axes",
                field.components(),
                n
            ),
        });
    }
    if moving.dimension() != n {
        return Err(ImageError::DisplacementMismatch {
            message: format!(
                "moving image has {} axes, field has {}",
                moving.dimension(),
                n
            ),
        });
    }

    debug!(
        shape = %field.shape(),
        ?interpolation,
        pixel_type = %pixel_type,
        "resampling through cached deformation field"
    );

    let mapper = moving.geometry().index_mapper()?;
    let components = moving.components();
    let mut output = Image::new(pixel_type, field.dims(), components)?.with_geometry(field.geometry().clone())?;

    let mut index = vec![0usize; n];
    let mut continuous = vec![0.0; n];
    let mut point = vec![0.0; n];
    let mut samples = vec![0.0; components];

    for offset in 0..field.voxel_count() {
        unravel(offset, field.dims(), &mut index);
        let grid: Vec<f64> = index.iter().map(|&i| i as f64).collect();
        let physical = field.geometry().index_to_physical(&grid);
        let displacement = &field.data()[offset * n..offset * n + n];
        for axis in 0..n {
            point[axis] = physical[axis] + displacement[axis];
        }
        mapper.physical_to_index(&point, &mut continuous);

        let inside = match interpolation {
            Interpolation::NearestNeighbor => sample_nearest(moving, &continuous, &mut samples),
            Interpolation::Linear => sample_linear(moving, &continuous, &mut samples),
        };
        let out = &mut output.data_mut()[offset * components..(offset + 1) * components];
        for (slot, value) in out.iter_mut().zip(&samples) {
            *slot = if inside { pixel_type.saturate(*value) } else { 0.0 };
        }
    }

    Ok(output)
}

fn unravel(mut offset: usize, dims: &[usize], index: &mut [usize]) {
    for (slot, &size) in index.iter_mut().zip(dims) {
        *slot = offset % size;
        offset /= size;
    }
}

/// Continuous indices within half a voxel of the buffer count as inside.
fn is_inside(image: &Image, continuous: &[f64]) -> bool {
    continuous
        .iter()
        .enumerate()
        .all(|(axis, &c)| c >= -0.5 && c < image.size(axis) as f64 - 0.5)
}

fn sample_nearest(image: &Image, continuous: &[f64], out: &mut [f64]) -> bool {
    if !is_inside(image, continuous) {
        return false;
    }
    let index: Vec<usize> = continuous
        .iter()
        .enumerate()
        .map(|(axis, &c)| (c.round().max(0.0) as usize).min(image.size(axis) - 1))
        .collect();
    for (component, slot) in out.iter_mut().enumerate() {
        *slot = image.get(&index, component);
    }
    true
}

fn sample_linear(image: &Image, continuous: &[f64], out: &mut [f64]) -> bool {
    if !is_inside(image, continuous) {
        return false;
    }
    let n = continuous.len();
    let base: Vec<f64> = continuous.iter().map(|c| c.floor()).collect();
    let frac: Vec<f64> = continuous.iter().zip(&base).map(|(c, b)| c - b).collect();

    out.iter_mut().for_each(|v| *v = 0.0);
    let mut corner = vec![0usize; n];
    for mask in 0..(1usize << n) {
        let mut weight = 1.0;
        for axis in 0..n {
            let upper = mask & (1 << axis) != 0;
            let i = base[axis] as i64 + i64::from(upper);
            let max = image.size(axis) as i64 - 1;
            corner[axis] = i.clamp(0, max) as usize;
            weight *= if upper { frac[axis] } else { 1.0 - frac[axis] };
        }
        if weight == 0.0 {
            continue;
        }
        for (component, slot) in out.iter_mut().enumerate() {
            *slot += weight * image.get(&corner, component);
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;

    fn ramp(dims: &[usize], pixel_type: PixelType) -> Image {
        let n: usize = dims.iter().product();
        Image::from_data(pixel_type, dims, 1, (0..n).map(|v| v as f64).collect()).unwrap()
    }

    fn constant_field(dims: &[usize], displacement: &[f64]) -> Image {
        let n: usize = dims.iter().product();
        let data = (0..n).flat_map(|_| displacement.iter().copied()).collect();
        Image::from_data(PixelType::F32, dims, displacement.len(), data).unwrap()
    }

    #[test]
    fn test_zero_field_is_identity() {
        let moving = ramp(&[4, 3], PixelType::F32);
        let field = constant_field(&[4, 3], &[0.0, 0.0]);
        let warped =
            warp_with_displacement(&moving, &field, Interpolation::Linear, PixelType::F32).unwrap();
        assert_eq!(warped.data(), moving.data());
    }

    #[test]
    fn test_shift_with_nearest_neighbor() {
        let moving = ramp(&[4, 1], PixelType::I16);
        let field = constant_field(&[4, 1], &[1.0, 0.0]);
        let warped =
            warp_with_displacement(&moving, &field, Interpolation::NearestNeighbor, PixelType::I16)
                .unwrap();
        assert_eq!(warped.data(), &[1.0, 2.0, 3.0, 0.0]);
    }

    #[test]
    fn test_linear_half_voxel() {
        let moving = ramp(&[4, 1], PixelType::F32);
        let field = constant_field(&[3, 1], &[0.5, 0.0]);
        let warped =
            warp_with_displacement(&moving, &field, Interpolation::Linear, PixelType::F32).unwrap();
        assert_eq!(warped.data(), &[0.5, 1.5, 2.5]);
    }

    #[test]
    fn test_respects_spacing() {
        let geometry = Geometry::new(vec![2.0, 1.0], vec![0.0, 0.0], vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        let moving = ramp(&[4, 1], PixelType::F32).with_geometry(geometry).unwrap();
        // One field voxel per moving voxel, shifted by one moving voxel.
        let field = constant_field(&[4, 1], &[2.0, 0.0])
            .with_geometry(moving.geometry().clone())
            .unwrap();
        let warped =
            warp_with_displacement(&moving, &field, Interpolation::Linear, PixelType::F32).unwrap();
        assert_eq!(warped.data(), &[1.0, 2.0, 3.0, 0.0]);
    }

    #[test]
    fn test_mismatched_field() {
        let moving = ramp(&[4, 3], PixelType::F32);
        let field = constant_field(&[4, 3], &[0.0, 0.0, 0.0]);
        let err = warp_with_displacement(&moving, &field, Interpolation::Linear, PixelType::F32)
            .unwrap_err();
        assert_eq!(err.code(), "IMAGE_010");
    }

    #[test]
    fn test_interpolation_for_pixel_type() {
        assert_eq!(Interpolation::for_pixel_type(PixelType::I16), Interpolation::NearestNeighbor);
        assert_eq!(Interpolation::for_pixel_type(PixelType::F32), Interpolation::Linear);
    }
}
