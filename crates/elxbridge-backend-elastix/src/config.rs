//! Registration configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::locator::{ExecutableLocator, DEFAULT_ENV_VAR, DEFAULT_MAJOR_VERSION};

/// Configuration for the registration helper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Directory (or file inside it) searched first for the executables.
    pub binary_search_path: Option<PathBuf>,
    /// Environment variable naming the elastix installation.
    pub env_var: String,
    /// Required elastix major version.
    pub major_version: u32,
    /// Shared-library directory of the installation, put on the loader path.
    pub library_dir: Option<PathBuf>,
    /// Parent directory for per-job working directories. Defaults to the
    /// system temp directory.
    pub working_directory: Option<PathBuf>,
    /// Whether working directories are deleted when a job finishes.
    pub remove_working_directory: bool,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            binary_search_path: None,
            env_var: DEFAULT_ENV_VAR.to_string(),
            major_version: DEFAULT_MAJOR_VERSION,
            library_dir: None,
            working_directory: None,
            remove_working_directory: true,
        }
    }
}

impl RegistrationConfig {
    /// Sets the additional binary search path.
    pub fn binary_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.binary_search_path = Some(path.into());
        self
    }

    /// Sets the installation environment variable.
    pub fn env_var(mut self, name: impl Into<String>) -> Self {
        self.env_var = name.into();
        self
    }

    /// Sets the required major version.
    pub fn major_version(mut self, major: u32) -> Self {
        self.major_version = major;
        self
    }

    /// Sets the shared-library directory.
    pub fn library_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_dir = Some(path.into());
        self
    }

    /// Sets the parent directory for working directories.
    pub fn working_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(path.into());
        self
    }

    /// Keeps or removes working directories after each job.
    pub fn remove_working_directory(mut self, remove: bool) -> Self {
        self.remove_working_directory = remove;
        self
    }

    /// Builds the executable locator for this configuration.
    pub fn locator(&self) -> ExecutableLocator {
        let locator = ExecutableLocator::new()
            .env_var(self.env_var.clone())
            .major_version(self.major_version);
        match self.binary_search_path {
            Some(ref path) => locator.search_path(path.clone()),
            None => locator,
        }
    }
}
