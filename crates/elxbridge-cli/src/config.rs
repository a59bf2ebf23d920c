//! Configuration file loading and command-line overrides.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use elxbridge_backend_elastix::RegistrationConfig;
use tracing::debug;

/// Default location: `<config dir>/elxbridge/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("elxbridge").join("config.json"))
}

/// Loads the configuration.
///
/// An explicit `path` must exist. Without one, the default location is used
/// when present and built-in defaults otherwise.
pub fn load(path: Option<&Path>) -> Result<RegistrationConfig> {
    match path {
        Some(path) => read(path),
        None => match default_config_path() {
            Some(path) if path.is_file() => read(&path),
            _ => Ok(RegistrationConfig::default()),
        },
    }
}

fn read(path: &Path) -> Result<RegistrationConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Options shared by every command that runs the external tools.
#[derive(Debug, Clone, Default, Args)]
pub struct ToolArgs {
    /// Configuration file (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory containing the elastix and transformix executables
    #[arg(long, global = true)]
    pub elastix_path: Option<PathBuf>,

    /// Shared-library directory of the elastix installation
    #[arg(long, global = true)]
    pub library_dir: Option<PathBuf>,

    /// Parent directory for per-job working directories
    #[arg(long, global = true)]
    pub work_dir: Option<PathBuf>,

    /// Keep working directories after each job
    #[arg(long, global = true)]
    pub keep_work_dir: bool,
}

impl ToolArgs {
    /// Loads the configuration file and applies the flags on top of it.
    pub fn resolve(&self) -> Result<RegistrationConfig> {
        Ok(self.apply(load(self.config.as_deref())?))
    }

    /// Flags override file values.
    pub fn apply(&self, mut config: RegistrationConfig) -> RegistrationConfig {
        if let Some(ref path) = self.elastix_path {
            config.binary_search_path = Some(path.clone());
        }
        if let Some(ref path) = self.library_dir {
            config.library_dir = Some(path.clone());
        }
        if let Some(ref path) = self.work_dir {
            config.working_directory = Some(path.clone());
        }
        if self.keep_work_dir {
            config.remove_working_directory = false;
        }
        config
    }
}
