//! elxbridge image model
//!
//! A small N-dimensional image type with physical geometry, plus the file
//! formats and conversions needed to exchange data with elastix and
//! transformix.
//!
//! # Overview
//!
//! - [`Image`], [`Geometry`], [`PixelType`] - in-memory representation
//! - [`nrrd`] - NRRD reader and writer
//! - [`convert`] - 2D/3D/4D layout conversions and slice stacking
//! - [`points`] - landmark files
//! - [`resample`] - warping through a displacement field

pub mod convert;
pub mod error;
pub mod geometry;
pub mod image;
pub mod nrrd;
pub mod pixel;
pub mod points;
pub mod resample;

pub use error::{ImageError, ImageResult};
pub use geometry::{Geometry, IndexMapper, GEOMETRY_TOLERANCE};
pub use image::Image;
pub use pixel::PixelType;
pub use points::{PointKind, PointSet};
pub use resample::{warp_with_displacement, Interpolation};
