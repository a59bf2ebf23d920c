//! Error types for image handling.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for image operations.
pub type ImageResult<T> = Result<T, ImageError>;

/// Errors that can occur while building, converting, reading or writing images.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Failed to read a file.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file.
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// NRRD header is malformed or incomplete.
    #[error("Invalid NRRD header: {message}")]
    InvalidHeader { message: String },

    /// NRRD data encoding is not supported.
    #[error("Unsupported NRRD encoding '{encoding}'. Supported encodings: raw, ascii, gzip")]
    UnsupportedEncoding { encoding: String },

    /// Pixel type is not supported.
    #[error("Unsupported pixel type '{name}'")]
    UnsupportedPixelType { name: String },

    /// Sample buffer length does not match the image shape.
    #[error("Data length mismatch: expected {expected} samples, found {actual}")]
    DataLength { expected: usize, actual: usize },

    /// Image dimensionality is outside what the operation supports.
    #[error("Image [{shape}] has unsupported dimension {dimension}. Shape has to be [NxM], [NxMxK] or [NxMx1]")]
    UnsupportedDimension { dimension: usize, shape: String },

    /// Requested component does not exist.
    #[error("Component {component} out of range for image with {components} components")]
    ComponentOutOfRange { component: usize, components: usize },

    /// Geometry is inconsistent with the image shape.
    #[error("Invalid geometry: {message}")]
    InvalidGeometry { message: String },

    /// Deformation field does not fit the reference image.
    #[error("Displacement field mismatch: {message}")]
    DisplacementMismatch { message: String },

    /// Point file could not be parsed.
    #[error("Invalid point file: {message}")]
    InvalidPoints { message: String },

    /// Slices cannot be stacked into one volume.
    #[error("Slice {index} cannot be stacked: {message}")]
    SliceMismatch { index: usize, message: String },
}

impl ImageError {
    /// Creates a new invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// Creates a new invalid geometry error.
    pub fn invalid_geometry(message: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            message: message.into(),
        }
    }

    /// Creates a new invalid points error.
    pub fn invalid_points(message: impl Into<String>) -> Self {
        Self::InvalidPoints {
            message: message.into(),
        }
    }

    /// Returns a stable error code for reporting.
    pub fn code(&self) -> &'static str {
        match self {
            ImageError::Read { .. } => "IMAGE_001",
            ImageError::Write { .. } => "IMAGE_002",
            ImageError::InvalidHeader { .. } => "IMAGE_003",
            ImageError::UnsupportedEncoding { .. } => "IMAGE_004",
            ImageError::UnsupportedPixelType { .. } => "IMAGE_005",
            ImageError::DataLength { .. } => "IMAGE_006",
            ImageError::UnsupportedDimension { .. } => "IMAGE_007",
            ImageError::ComponentOutOfRange { .. } => "IMAGE_008",
            ImageError::InvalidGeometry { .. } => "IMAGE_009",
            ImageError::DisplacementMismatch { .. } => "IMAGE_010",
            ImageError::InvalidPoints { .. } => "IMAGE_011",
            ImageError::SliceMismatch { .. } => "IMAGE_012",
        }
    }

    /// Returns the error category.
    pub fn category(&self) -> &'static str {
        "image"
    }
}
