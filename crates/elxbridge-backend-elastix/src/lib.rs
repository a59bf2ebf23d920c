//! elxbridge elastix backend
//!
//! Registration and warping through the external `elastix` and
//! `transformix` executables.
//!
//! # Architecture
//!
//! 1. **Locator** - finds the executables and validates `--version`
//! 2. **Runner** - launches processes behind the [`ProcessRunner`] trait
//! 3. **Helper** - writes parameter files and images into a per-job working
//!    directory, runs the tools, and reads their outputs back
//!
//! Failure of an external step is detected from the tool's log, not from its
//! exit code.
//!
//! # Example
//!
//! ```ignore
//! use elxbridge_backend_elastix::{RegistrationConfig, RegistrationHelper};
//! use elxbridge_image::{nrrd, PixelType};
//! use elxbridge_params::presets;
//!
//! let mut helper = RegistrationHelper::with_config(
//!     RegistrationConfig::default().binary_search_path("/opt/elastix/bin"),
//! );
//! helper.set_image_data(nrrd::read("fixed.nrrd")?, nrrd::read("moving.nrrd")?)?;
//! helper.set_registration_parameters([presets::rigid(), presets::deformable()]);
//! helper.register()?;
//!
//! let warped = helper.warp_image(&nrrd::read("labels.nrrd")?, PixelType::I16, 3)?;
//! ```
//!
//! # Executable Requirements
//!
//! elastix 5.x. The locator searches, in order:
//!
//! 1. the configured binary search path
//! 2. the `ELASTIX_PATH` environment variable
//! 3. the system PATH
//!
//! # Crate Structure
//!
//! - [`helper`] - registration orchestration
//! - [`reconstruct`] - slice-wise warping and stacking
//! - [`locator`] - executable discovery
//! - [`runner`] - subprocess execution
//! - [`workdir`] - per-job working directories
//! - [`config`] - configuration
//! - [`error`] - error types

pub mod config;
pub mod error;
pub mod helper;
pub mod locator;
pub mod reconstruct;
pub mod runner;
pub mod workdir;

pub use config::RegistrationConfig;
pub use error::{RegistrationError, RegistrationResult};
pub use helper::{ParameterSource, RegistrationHelper, RegistrationState, StatusCallback};
pub use locator::ExecutableLocator;
pub use reconstruct::{reconstruct, ReconstructionSlice};
pub use runner::{ProcessOutput, ProcessRunner, SystemRunner};
pub use workdir::WorkingDirectory;
