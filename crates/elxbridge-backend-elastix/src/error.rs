//! Error types for the elastix backend.

use std::path::PathBuf;

use elxbridge_image::ImageError;
use thiserror::Error;

/// Result type for elastix backend operations.
pub type RegistrationResult<T> = Result<T, RegistrationError>;

/// Errors that can occur while registering or warping images.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// No candidate executable passed the version check.
    #[error("{name} executable not found (tried: {}). Install elastix {major_version}.x or set {env_var}", format_candidates(.candidates))]
    ExecutableNotFound {
        name: String,
        major_version: u32,
        env_var: String,
        candidates: Vec<PathBuf>,
    },

    /// Failed to spawn an external process.
    #[error("Failed to spawn {program}: {source}")]
    SpawnFailed {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Registration was requested before both images were set.
    #[error("No image set for registration! Fixed and moving images are required")]
    MissingImages,

    /// Image and mask geometries differ.
    #[error("Image [{image_shape}] and mask [{mask_shape}]: image geometries of mask image and image have to be equal")]
    GeometryMismatch {
        image_shape: String,
        mask_shape: String,
    },

    /// Image cannot be handed to the external tools.
    #[error("Image [{shape}] has unsupported dimension {dimension}. Shape has to be [NxM], [NxMxK] or [NxMx1]")]
    UnsupportedDimension { dimension: usize, shape: String },

    /// The external tool reported an error in its log.
    #[error("{tool} log file contains error: {line}")]
    ExternalFailure { tool: String, line: String },

    /// An expected output file was not produced.
    #[error("Expected output file not found at {path}: {source}")]
    OutputMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write into the working directory.
    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read a parameter file given as a registration source.
    #[error("Failed to read parameter file {path}: {source}")]
    ReadParameters {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Warping was requested without a transformation chain.
    #[error("No transformation available. Run a registration or set transformations first")]
    NoTransformation,

    /// Image conversion or I/O failed.
    #[error(transparent)]
    Image(#[from] ImageError),
}

impl RegistrationError {
    /// Creates a new external failure error.
    pub fn external_failure(tool: impl Into<String>, line: impl Into<String>) -> Self {
        Self::ExternalFailure {
            tool: tool.into(),
            line: line.into(),
        }
    }

    /// Returns a stable error code for reporting.
    pub fn code(&self) -> &'static str {
        match self {
            RegistrationError::ExecutableNotFound { .. } => "ELX_001",
            RegistrationError::SpawnFailed { .. } => "ELX_002",
            RegistrationError::MissingImages => "ELX_003",
            RegistrationError::GeometryMismatch { .. } => "ELX_004",
            RegistrationError::UnsupportedDimension { .. } => "ELX_005",
            RegistrationError::ExternalFailure { .. } => "ELX_006",
            RegistrationError::OutputMissing { .. } => "ELX_007",
            RegistrationError::WriteFailed { .. } => "ELX_008",
            RegistrationError::ReadParameters { .. } => "ELX_009",
            RegistrationError::NoTransformation => "ELX_010",
            RegistrationError::Image(_) => "ELX_011",
        }
    }

    /// Returns the error category.
    pub fn category(&self) -> &'static str {
        match self {
            RegistrationError::Image(_) => "image",
            _ => "elastix",
        }
    }
}

fn format_candidates(candidates: &[PathBuf]) -> String {
    if candidates.is_empty() {
        return "nothing".to_string();
    }
    candidates
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RegistrationError::ExecutableNotFound {
            name: "elastix".to_string(),
            major_version: 5,
            env_var: "LAB_ELASTIX_HOME".to_string(),
            candidates: vec![PathBuf::from("/opt/elastix/bin/elastix"), PathBuf::from("elastix")],
        };
        let message = err.to_string();
        assert!(message.contains("/opt/elastix/bin/elastix, elastix"));
        assert!(message.contains("elastix 5.x or set LAB_ELASTIX_HOME"));
        assert!(!message.contains("ELASTIX_PATH"));
        assert_eq!(err.code(), "ELX_001");

        let err = RegistrationError::external_failure("elastix", "Error: too many samples map outside");
        assert!(err.to_string().contains("too many samples"));
    }

    #[test]
    fn test_wrapped_image_error() {
        let err: RegistrationError = ImageError::invalid_header("bad magic").into();
        assert_eq!(err.code(), "ELX_011");
        assert_eq!(err.category(), "image");
        assert!(err.to_string().contains("bad magic"));
    }
}
