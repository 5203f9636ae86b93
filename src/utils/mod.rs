//! Helpers shared by the concrete metric backends: running blocking reads
//! off the async runtime, invoking external tools and reading pseudo files.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use crate::error::{BackendError, BackendResult};

/// Runs a blocking closure on the blocking thread pool
pub(crate) async fn run_blocking<T, F>(task: &str, f: F) -> BackendResult<T>
where
    F: FnOnce() -> BackendResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| BackendError::library(format!("{task}: {e}")))?
}

/// Runs `program` and returns its stdout.
///
/// The child is killed if the returned future is dropped, which is what
/// happens when the caller's timeout fires.
pub(crate) async fn command_output(program: &str, args: &[&str]) -> BackendResult<String> {
    let output = tokio::process::Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| BackendError::from_io(program, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BackendError::unsupported(format!("{program} exited with {}: {}", output.status, stderr.trim())));
    }
    String::from_utf8(output.stdout).map_err(|e| BackendError::parse(format!("{program}: {e}")))
}

/// Reads a whole file, mapping missing files to `ToolMissing`
pub(crate) async fn read_file(path: &Path) -> BackendResult<String> {
    tokio::fs::read_to_string(path).await.map_err(|e| BackendError::from_io(&path.display().to_string(), e))
}

/// Locates an executable on `PATH`
pub(crate) fn find_executable(program: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths).map(|dir| dir.join(program)).find(|candidate| candidate.is_file())
}

/// Parses a number, rejecting anything that is not finite
pub(crate) fn parse_f64(field: &str, raw: &str) -> BackendResult<f64> {
    let value: f64 = raw.trim().parse().map_err(|_| BackendError::parse(format!("{field}: {raw:?}")))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(BackendError::parse(format!("{field} is not finite")))
    }
}
