//! Discovery and version validation of the elastix executables.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::{RegistrationError, RegistrationResult};
use crate::runner::ProcessRunner;

/// Environment variable naming an elastix installation.
pub const DEFAULT_ENV_VAR: &str = "ELASTIX_PATH";

/// Major version accepted by default.
pub const DEFAULT_MAJOR_VERSION: u32 = 5;

/// Finds `elastix`/`transformix` and checks their reported version.
///
/// Candidates are tried in order:
///
/// 1. the configured search path (a file path is reduced to its directory)
/// 2. the directory named by the environment variable
/// 3. the bare name on `PATH`, as it was when the locator was created
///
/// A candidate is accepted when `<exe> --version` prints something matching
/// `<name>[a-z:\s]+<major>\.[0-9]+`.
#[derive(Debug, Clone)]
pub struct ExecutableLocator {
    search_path: Option<PathBuf>,
    env_var: String,
    major_version: u32,
    system_path: Option<OsString>,
}

impl Default for ExecutableLocator {
    fn default() -> Self {
        Self {
            search_path: None,
            env_var: DEFAULT_ENV_VAR.to_string(),
            major_version: DEFAULT_MAJOR_VERSION,
            system_path: std::env::var_os("PATH"),
        }
    }
}

impl ExecutableLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an additional directory (or a file inside it) to search first.
    pub fn search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    /// Sets the environment variable consulted second.
    pub fn env_var(mut self, name: impl Into<String>) -> Self {
        self.env_var = name.into();
        self
    }

    /// Sets the required major version.
    pub fn major_version(mut self, major: u32) -> Self {
        self.major_version = major;
        self
    }

    /// Candidate paths for `name`, in search order.
    pub fn candidates(&self, name: &str) -> Vec<PathBuf> {
        let file_name = executable_name(name);
        let mut candidates = Vec::new();

        if let Some(ref path) = self.search_path {
            let dir = if path.is_dir() {
                path.as_path()
            } else {
                path.parent().unwrap_or(path.as_path())
            };
            candidates.push(dir.join(&file_name));
        }

        if let Some(dir) = std::env::var_os(&self.env_var).filter(|v| !v.is_empty()) {
            let dir = PathBuf::from(dir);
            candidates.push(dir.join(&file_name));
            // Installs usually keep the binaries under bin/.
            candidates.push(dir.join("bin").join(&file_name));
        }

        let cwd = std::env::current_dir().unwrap_or_default();
        candidates.push(
            which::which_in(&file_name, self.system_path.as_ref(), cwd)
                .unwrap_or_else(|_| PathBuf::from(&file_name)),
        );
        candidates.dedup();
        candidates
    }

    /// Returns the first candidate that passes the version check.
    pub fn locate<R: ProcessRunner>(
        &self,
        name: &str,
        runner: &R,
        env: &[(OsString, OsString)],
    ) -> RegistrationResult<PathBuf> {
        let pattern = version_pattern(name, self.major_version);
        let candidates = self.candidates(name);

        for candidate in &candidates {
            if check_version(runner, candidate, &pattern, env) {
                info!("Use {} found at [{}]", name, candidate.display());
                return Ok(candidate.clone());
            }
        }

        warn!(
            "{} executables could not be found! Please specify the system variable {}",
            name,
            self.env_var
        );
        Err(RegistrationError::ExecutableNotFound {
            name: name.to_string(),
            major_version: self.major_version,
            env_var: self.env_var.clone(),
            candidates,
        })
    }
}

/// Platform file name of an executable.
pub fn executable_name(name: &str) -> String {
    if cfg!(windows) && !name.ends_with(".exe") {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}

/// Regex matched against `--version` output.
pub fn version_pattern(name: &str, major_version: u32) -> Regex {
    let stem = name.strip_suffix(".exe").unwrap_or(name);
    Regex::new(&format!(
        r"{}[a-z:\s]+{}\.[0-9]+",
        regex::escape(stem),
        major_version
    ))
    .expect("valid regex")
}

/// Runs `<candidate> --version` and matches the output.
pub fn check_version<R: ProcessRunner>(
    runner: &R,
    candidate: &Path,
    pattern: &Regex,
    env: &[(OsString, OsString)],
) -> bool {
    if candidate.components().count() > 1 && !candidate.is_file() {
        debug!(path = %candidate.display(), "candidate does not exist");
        return false;
    }
    match runner.run(candidate, &[OsString::from("--version")], env) {
        Ok(output) => {
            let text = output.combined();
            let pass = pattern.is_match(&text);
            debug!(path = %candidate.display(), pass, output = %text.trim(), "version check");
            pass
        }
        Err(e) => {
            debug!(path = %candidate.display(), error = %e, "version check failed to run");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ProcessOutput;
    use std::cell::RefCell;
    use std::io;

    struct VersionRunner {
        reply: &'static str,
        calls: RefCell<Vec<PathBuf>>,
    }

    impl ProcessRunner for VersionRunner {
        fn run(
            &self,
            program: &Path,
            _args: &[OsString],
            _env: &[(OsString, OsString)],
        ) -> io::Result<ProcessOutput> {
            self.calls.borrow_mut().push(program.to_path_buf());
            Ok(ProcessOutput {
                stdout: self.reply.to_string(),
                ..Default::default()
            })
        }
    }

    #[test]
    fn test_version_pattern() {
        let pattern = version_pattern("elastix", 5);
        assert!(pattern.is_match("elastix version: 5.1.0\n"));
        assert!(pattern.is_match("transformix elastix version: 5.0"));
        assert!(!pattern.is_match("elastix version: 4.9.0"));
        assert!(!version_pattern("transformix", 5).is_match("elastix version: 5.1"));
    }

    #[test]
    fn test_search_path_file_uses_parent() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join(executable_name("elastix"));
        std::fs::write(&exe, "").unwrap();
        let locator = ExecutableLocator::new()
            .search_path(dir.path().join("params.txt"))
            .env_var("ELXBRIDGE_LOCATOR_TEST_UNSET");
        assert_eq!(locator.candidates("elastix")[0], exe);

        let runner = VersionRunner {
            reply: "elastix version: 5.2.0",
            calls: RefCell::new(Vec::new()),
        };
        assert_eq!(locator.locate("elastix", &runner, &[]).unwrap(), exe);
        assert_eq!(runner.calls.borrow().len(), 1);
    }

    #[test]
    fn test_not_found_lists_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let empty = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(executable_name("elastix")), "").unwrap();
        let locator = ExecutableLocator {
            system_path: Some(empty.path().as_os_str().to_os_string()),
            ..ExecutableLocator::new()
                .search_path(dir.path())
                .env_var("ELXBRIDGE_LOCATOR_TEST_UNSET")
        };
        let runner = VersionRunner {
            reply: "elastix version: 4.8",
            calls: RefCell::new(Vec::new()),
        };
        let err = locator.locate("elastix", &runner, &[]).unwrap_err();
        assert!(err.to_string().contains("set ELXBRIDGE_LOCATOR_TEST_UNSET"));
        match err {
            RegistrationError::ExecutableNotFound {
                candidates, env_var, ..
            } => {
                assert_eq!(env_var, "ELXBRIDGE_LOCATOR_TEST_UNSET");
                assert_eq!(
                    candidates,
                    vec![
                        dir.path().join(executable_name("elastix")),
                        PathBuf::from(executable_name("elastix")),
                    ]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(runner.calls.borrow().len(), 2);
    }

    #[test]
    fn test_system_path_lookup() {
        let bin = tempfile::tempdir().unwrap();
        let exe = bin.path().join(executable_name("transformix"));
        std::fs::write(&exe, "").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        let locator = ExecutableLocator {
            system_path: Some(bin.path().as_os_str().to_os_string()),
            ..ExecutableLocator::new().env_var("ELXBRIDGE_LOCATOR_TEST_UNSET")
        };
        assert_eq!(locator.candidates("transformix"), vec![exe]);
    }
}
