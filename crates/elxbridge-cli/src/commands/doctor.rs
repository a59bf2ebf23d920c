//! Doctor command implementation
//!
//! Checks the elastix installation and configuration.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;
use elxbridge_backend_elastix::runner::library_env;
use elxbridge_backend_elastix::{RegistrationConfig, RegistrationError, SystemRunner, WorkingDirectory};

use crate::config::default_config_path;

/// Run the doctor command
///
/// Checks:
/// - Configuration file
/// - elastix and transformix executables
/// - Working directory permissions
///
/// # Returns
/// Exit code: 0 if all checks pass, 1 if any fail
pub fn run(config_path: Option<&Path>, config: &RegistrationConfig) -> Result<ExitCode> {
    println!("{}", "elxbridge Doctor".cyan().bold());
    println!("{}", "================".cyan());
    println!();

    let mut all_ok = true;

    println!("{}", "Versions:".bold());
    println!("  {} elxbridge-cli v{}", "->".green(), env!("CARGO_PKG_VERSION"));
    println!(
        "  {} requires elastix {}.x",
        "->".green(),
        config.major_version
    );
    println!();

    println!("{}", "Configuration:".bold());
    match config_path.map(Path::to_path_buf).or_else(default_config_path) {
        Some(path) if path.is_file() => println!("  {} {}", "ok".green(), path.display()),
        Some(path) => println!(
            "  {} {} (not present, using defaults)",
            "->".green(),
            path.display()
        ),
        None => println!("  {} no configuration directory, using defaults", "->".green()),
    }
    println!();

    println!("{}", "Executables:".bold());
    let env = library_env(config.library_dir.as_deref());
    let locator = config.locator();
    for name in ["elastix", "transformix"] {
        match locator.locate(name, &SystemRunner, &env) {
            Ok(path) => println!("  {} {} ({})", "ok".green(), name, path.display()),
            Err(RegistrationError::ExecutableNotFound { candidates, .. }) => {
                println!("  {} {} not found", "!!".red(), name);
                for candidate in candidates {
                    println!("     {}", format!("tried {}", candidate.display()).dimmed());
                }
                println!(
                    "     {}",
                    format!("Set {} or pass --elastix-path.", config.env_var).dimmed()
                );
                all_ok = false;
            }
            Err(e) => {
                println!("  {} {} check failed: {}", "!!".red(), name, e);
                all_ok = false;
            }
        }
    }
    println!();

    println!("{}", "Permissions:".bold());
    match check_working_directory(config) {
        Ok(parent) => println!("  {} Working directory is writable ({})", "ok".green(), parent),
        Err(e) => {
            println!("  {} Cannot create working directory: {}", "!!".red(), e);
            all_ok = false;
        }
    }
    println!();

    if all_ok {
        println!("{} All checks passed!", "SUCCESS".green().bold());
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "{} Some checks failed. See above for details.",
            "WARNING".yellow().bold()
        );
        Ok(ExitCode::from(1))
    }
}

/// Creates and removes a throwaway working directory, returning the parent
/// it was created in.
fn check_working_directory(config: &RegistrationConfig) -> Result<String, RegistrationError> {
    let workdir = WorkingDirectory::create(config.working_directory.as_deref(), true)?;
    let parent = workdir
        .path()
        .parent()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    workdir.finish();
    Ok(parent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_check_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = RegistrationConfig::default().working_directory(dir.path().join("jobs"));
        let parent = check_working_directory(&config).unwrap();
        assert_eq!(parent, dir.path().join("jobs").display().to_string());
        assert_eq!(std::fs::read_dir(dir.path().join("jobs")).unwrap().count(), 0);
    }
}
