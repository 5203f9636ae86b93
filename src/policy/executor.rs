use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::traits::ActionExecutor;

const DROP_CACHES_PATH: &str = "/proc/sys/vm/drop_caches";
const MAX_NICE: i32 = 19;

/// Executes corrective actions against the running kernel
#[derive(Debug, Clone)]
pub struct SystemActionExecutor {
    drop_caches_path: PathBuf,
}

impl Default for SystemActionExecutor {
    fn default() -> Self {
        Self { drop_caches_path: PathBuf::from(DROP_CACHES_PATH) }
    }
}

impl SystemActionExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the file written by `reclaim_memory`
    pub fn with_drop_caches_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.drop_caches_path = path.into();
        self
    }
}

impl ActionExecutor for SystemActionExecutor {
    #[cfg(target_os = "linux")]
    fn lower_priority(&self, pid: u32, increment: i32) -> Result<()> {
        let target = pid.to_string();
        let failed = |reason: String| Error::action_failed("lower_priority", target.as_str(), reason);

        // getpriority may legitimately return -1, errno is the only error signal
        let current = unsafe {
            *libc::__errno_location() = 0;
            let value = libc::getpriority(libc::PRIO_PROCESS, pid as libc::id_t);
            if value == -1 && *libc::__errno_location() != 0 {
                return Err(failed(describe_errno(std::io::Error::last_os_error())));
            }
            value
        };

        let wanted = current.saturating_add(increment).min(MAX_NICE);
        if wanted == current {
            debug!(pid, nice = current, "Process already at lowest priority");
            return Ok(());
        }

        let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, pid as libc::id_t, wanted) };
        if rc != 0 {
            return Err(failed(describe_errno(std::io::Error::last_os_error())));
        }
        info!(pid, from = current, to = wanted, "Lowered process priority");
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    fn lower_priority(&self, pid: u32, _increment: i32) -> Result<()> {
        Err(Error::action_failed("lower_priority", pid.to_string(), "unsupported on this platform"))
    }

    fn reclaim_memory(&self) -> Result<()> {
        #[cfg(unix)]
        unsafe {
            libc::sync();
        }
        std::fs::write(&self.drop_caches_path, b"1").map_err(|e| {
            Error::action_failed("reclaim_memory", "host", describe_errno(e))
        })?;
        info!(path = %self.drop_caches_path.display(), "Dropped page cache");
        Ok(())
    }
}

fn describe_errno(err: std::io::Error) -> String {
    match err.raw_os_error() {
        Some(libc::EPERM) | Some(libc::EACCES) => "permission denied".to_string(),
        Some(libc::ESRCH) => "process no longer exists".to_string(),
        Some(libc::ENOENT) => "not supported on this host".to_string(),
        _ => err.to_string(),
    }
}
