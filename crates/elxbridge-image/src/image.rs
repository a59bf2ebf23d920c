//! In-memory image representation.

use std::path::{Path, PathBuf};

use crate::error::{ImageError, ImageResult};
use crate::geometry::Geometry;
use crate::pixel::PixelType;

/// An N-dimensional image with interleaved components.
///
/// Samples are stored as `f64` with the first axis varying fastest and all
/// components of a voxel adjacent. The pixel type records what the samples
/// are written as on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pixel_type: PixelType,
    dims: Vec<usize>,
    components: usize,
    geometry: Geometry,
    data: Vec<f64>,
    source_path: Option<PathBuf>,
}

impl Image {
    /// Creates a zero-filled image with identity geometry.
    pub fn new(pixel_type: PixelType, dims: &[usize], components: usize) -> ImageResult<Self> {
        let len = sample_count(dims, components)?;
        Self::from_data(pixel_type, dims, components, vec![0.0; len])
    }

    /// Creates an image from an existing sample buffer.
    pub fn from_data(
        pixel_type: PixelType,
        dims: &[usize],
        components: usize,
        data: Vec<f64>,
    ) -> ImageResult<Self> {
        let expected = sample_count(dims, components)?;
        if data.len() != expected {
            return Err(ImageError::DataLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            pixel_type,
            dims: dims.to_vec(),
            components,
            geometry: Geometry::identity(dims.len()),
            data,
            source_path: None,
        })
    }

    /// Replaces the geometry. Its dimension must match the image.
    pub fn with_geometry(mut self, geometry: Geometry) -> ImageResult<Self> {
        self.set_geometry(geometry)?;
        Ok(self)
    }

    /// Records the file this image was loaded from.
    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    /// Number of spatial (or spatio-temporal) axes.
    pub fn dimension(&self) -> usize {
        self.dims.len()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Size along `axis`, or 1 when the axis does not exist.
    pub fn size(&self, axis: usize) -> usize {
        self.dims.get(axis).copied().unwrap_or(1)
    }

    pub fn components(&self) -> usize {
        self.components
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Mutable geometry. The image no longer matches its source file.
    pub fn geometry_mut(&mut self) -> &mut Geometry {
        self.source_path = None;
        &mut self.geometry
    }

    pub fn set_geometry(&mut self, geometry: Geometry) -> ImageResult<()> {
        if geometry.dimension() != self.dimension() {
            return Err(ImageError::invalid_geometry(format!(
                "geometry has {} axes, image has {}",
                geometry.dimension(),
                self.dimension()
            )));
        }
        self.geometry = geometry;
        self.source_path = None;
        Ok(())
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Mutable samples. The image no longer matches its source file.
    pub fn data_mut(&mut self) -> &mut [f64] {
        self.source_path = None;
        &mut self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    /// Forgets the source file, e.g. once it has been deleted.
    pub fn without_source_path(mut self) -> Self {
        self.source_path = None;
        self
    }

    /// File the image was read from, if any. Cleared by any mutation.
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Number of voxels (product of all axis sizes).
    pub fn voxel_count(&self) -> usize {
        self.dims.iter().product()
    }

    /// Comma-separated axis sizes, e.g. `"64, 64, 1"`.
    pub fn shape(&self) -> String {
        self.dims
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Linear voxel offset of a multi-index.
    pub fn voxel_offset(&self, index: &[usize]) -> usize {
        let mut offset = 0;
        let mut stride = 1;
        for (axis, &i) in index.iter().enumerate() {
            offset += i * stride;
            stride *= self.dims[axis];
        }
        offset
    }

    /// Sample at a multi-index and component.
    pub fn get(&self, index: &[usize], component: usize) -> f64 {
        self.data[self.voxel_offset(index) * self.components + component]
    }

    /// Sets the sample at a multi-index and component.
    pub fn set(&mut self, index: &[usize], component: usize, value: f64) {
        let offset = self.voxel_offset(index) * self.components + component;
        self.data[offset] = value;
        self.source_path = None;
    }

    /// Whether shape and geometry agree with `other`.
    pub fn same_geometry(&self, other: &Image) -> bool {
        self.dims == other.dims && self.geometry.approx_eq(&other.geometry)
    }

    /// Returns a scalar image holding one component.
    pub fn extract_component(&self, component: usize) -> ImageResult<Image> {
        if component >= self.components {
            return Err(ImageError::ComponentOutOfRange {
                component,
                components: self.components,
            });
        }
        let data = self
            .data
            .chunks_exact(self.components)
            .map(|voxel| voxel[component])
            .collect();
        Ok(Image {
            pixel_type: self.pixel_type,
            dims: self.dims.clone(),
            components: 1,
            geometry: self.geometry.clone(),
            data,
            source_path: None,
        })
    }

    /// Builds an image from parts without re-validating the buffer length.
    pub(crate) fn from_parts(
        pixel_type: PixelType,
        dims: Vec<usize>,
        components: usize,
        geometry: Geometry,
        data: Vec<f64>,
    ) -> Image {
        debug_assert_eq!(data.len(), dims.iter().product::<usize>() * components);
        debug_assert_eq!(geometry.dimension(), dims.len());
        Image {
            pixel_type,
            dims,
            components,
            geometry,
            data,
            source_path: None,
        }
    }
}

fn sample_count(dims: &[usize], components: usize) -> ImageResult<usize> {
    if dims.is_empty() || dims.iter().any(|&d| d == 0) || components == 0 {
        return Err(ImageError::invalid_geometry(format!(
            "invalid image shape [{:?}] with {} components",
            dims, components
        )));
    }
    Ok(dims.iter().product::<usize>() * components)
}
