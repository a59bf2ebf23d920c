//! Subprocess execution.
//!
//! Every external invocation goes through [`ProcessRunner`] so the
//! orchestration logic can be driven by a fake in tests.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

/// Captured result of one external process run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    /// All stdout lines followed by all stderr lines.
    pub fn combined(&self) -> String {
        self.lines().collect::<Vec<_>>().join("\n")
    }

    /// Iterates stdout lines, then stderr lines.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines().chain(self.stderr.lines())
    }
}

/// Launches external programs and waits for them to finish.
pub trait ProcessRunner {
    /// Runs `program` with `args` and extra environment variables, blocking
    /// until it exits.
    fn run(
        &self,
        program: &Path,
        args: &[OsString],
        env: &[(OsString, OsString)],
    ) -> io::Result<ProcessOutput>;
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    fn run(
        &self,
        program: &Path,
        args: &[OsString],
        env: &[(OsString, OsString)],
    ) -> io::Result<ProcessOutput> {
        (**self).run(program, args, env)
    }
}

/// Runs processes with [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(
        &self,
        program: &Path,
        args: &[OsString],
        env: &[(OsString, OsString)],
    ) -> io::Result<ProcessOutput> {
        let output = Command::new(program)
            .args(args)
            .envs(env.iter().map(|(k, v)| (k, v)))
            .output()?;
        let result = ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        };
        debug!(program = %program.display(), exit_code = ?result.exit_code, "process finished");
        Ok(result)
    }
}

/// Name of the variable the dynamic loader searches for shared libraries.
pub fn library_path_var() -> &'static str {
    if cfg!(windows) {
        "PATH"
    } else if cfg!(target_os = "macos") {
        "DYLD_LIBRARY_PATH"
    } else {
        "LD_LIBRARY_PATH"
    }
}

/// Environment override that puts `library_dir` first on the loader path.
///
/// The current value of the variable is kept after it. Returns no override
/// when `library_dir` is `None`.
pub fn library_env(library_dir: Option<&Path>) -> Vec<(OsString, OsString)> {
    let Some(dir) = library_dir else {
        return Vec::new();
    };
    let var = library_path_var();
    let mut paths: Vec<PathBuf> = vec![dir.to_path_buf()];
    if let Some(current) = std::env::var_os(var) {
        paths.extend(std::env::split_paths(&current));
    }
    let value = std::env::join_paths(paths).unwrap_or_else(|_| dir.as_os_str().to_os_string());
    vec![(OsString::from(var), value)]
}
