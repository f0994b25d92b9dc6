//! Purpose: Obtain enough privilege to mutate the library directory for one run.
//! Exports: `Access`, `Grant`, `Keepalive`, `acquire`, `acquire_with`, `has_direct_access`.
//! Role: Chooses between direct syscalls and `sudo -n` commands for the toggler.
//! Invariants: `sudo -v` prompts at most once per run.
//! Invariants: The keepalive thread never touches files and exits when its handle drops.
use std::ffi::{CString, OsStr, OsString};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::core::error::{Error, ErrorKind};
use crate::core::ops::{FileOps, LocalOps, SudoOps};

const SUDO: &str = "sudo";

/// Well inside sudo's default five minute credential timeout.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Access {
    Direct,
    Sudo,
}

/// Privilege held for the rest of the run.
#[derive(Debug)]
pub struct Grant {
    access: Access,
    sudo: OsString,
    keepalive: Option<Keepalive>,
}

impl Grant {
    pub fn direct() -> Self {
        Self {
            access: Access::Direct,
            sudo: OsString::from(SUDO),
            keepalive: None,
        }
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn ops(&self) -> Box<dyn FileOps> {
        match self.access {
            Access::Direct => Box::new(LocalOps),
            Access::Sudo => Box::new(SudoOps::with_program(&self.sudo)),
        }
    }

    /// Stops the keepalive thread, if any, and waits for it.
    pub fn release(mut self) {
        if let Some(keepalive) = self.keepalive.take() {
            keepalive.stop();
        }
    }
}

/// Background `sudo -v` refresher, cancelled by dropping the handle.
#[derive(Debug)]
pub struct Keepalive {
    stop: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Keepalive {
    /// Calls `refresh` every `interval` until stopped or until `refresh` returns false.
    pub fn spawn<F>(interval: Duration, mut refresh: F) -> io::Result<Self>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("sudo-keepalive".to_string())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            if !refresh() {
                                warn!("sudo credential refresh failed; keepalive stopped");
                                break;
                            }
                            debug!("sudo credentials refreshed");
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })?;
        Ok(Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        drop(self.stop.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Keepalive {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// True when the process can mutate every directory in `dirs` without escalation.
pub fn has_direct_access(dirs: &[&Path]) -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    if unsafe { libc::geteuid() } == 0 {
        return true;
    }
    dirs.iter().all(|dir| is_writable(dir))
}

fn is_writable(dir: &Path) -> bool {
    let Ok(c_path) = CString::new(dir.as_os_str().as_bytes()) else {
        return false;
    };
    // SAFETY: c_path is a valid NUL-terminated string for the duration of the call.
    unsafe { libc::access(c_path.as_ptr(), libc::W_OK) == 0 }
}

/// Ensures mutations on `dirs` will succeed, prompting through sudo if needed.
pub fn acquire(dirs: &[&Path]) -> Result<Grant, Error> {
    acquire_with(OsStr::new(SUDO), dirs)
}

/// `acquire` with an explicit sudo program.
pub fn acquire_with(sudo: &OsStr, dirs: &[&Path]) -> Result<Grant, Error> {
    if has_direct_access(dirs) {
        info!("directories are writable; no privilege escalation needed");
        return Ok(Grant::direct());
    }
    escalate(sudo)
}

fn escalate(sudo: &OsStr) -> Result<Grant, Error> {
    info!("requesting sudo credentials");
    let status = Command::new(sudo)
        .arg("-v")
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|err| {
            let message = if err.kind() == io::ErrorKind::NotFound {
                "sudo is not available and the library directory is not writable"
            } else {
                "failed to run sudo"
            };
            Error::new(ErrorKind::Permission)
                .with_message(message)
                .with_hint("Run as root, or install sudo.")
                .with_source(err)
        })?;
    if !status.success() {
        return Err(Error::new(ErrorKind::Permission)
            .with_message(format!("failed to obtain sudo credentials ({status})")));
    }

    let refresh_program = sudo.to_os_string();
    let keepalive = Keepalive::spawn(REFRESH_INTERVAL, move || refresh_sudo(&refresh_program))
        .map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to start sudo keepalive")
                .with_source(err)
        })?;
    Ok(Grant {
        access: Access::Sudo,
        sudo: sudo.to_os_string(),
        keepalive: Some(keepalive),
    })
}

fn refresh_sudo(sudo: &OsStr) -> bool {
    Command::new(sudo)
        .args(["-n", "-v"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    use super::{Access, Grant, Keepalive, acquire, acquire_with, escalate, has_direct_access};
    use crate::core::error::ErrorKind;
    use crate::core::ops::FileOps;

    #[test]
    fn keepalive_refreshes_until_dropped() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let keepalive = Keepalive::spawn(Duration::from_millis(5), move || {
            seen.fetch_add(1, Ordering::SeqCst);
            true
        })
        .expect("spawn");

        let deadline = Instant::now() + Duration::from_secs(5);
        while count.load(Ordering::SeqCst) < 2 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        drop(keepalive);

        let after_stop = count.load(Ordering::SeqCst);
        assert!(after_stop >= 2);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn keepalive_stops_after_failed_refresh() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let keepalive = Keepalive::spawn(Duration::from_millis(1), move || {
            seen.fetch_add(1, Ordering::SeqCst);
            false
        })
        .expect("spawn");

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        keepalive.stop();
    }

    #[test]
    fn stop_returns_promptly_with_long_interval() {
        let keepalive = Keepalive::spawn(Duration::from_secs(3600), || true).expect("spawn");
        let started = Instant::now();
        keepalive.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn writable_directories_need_no_escalation() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(has_direct_access(&[temp.path()]));

        let grant = acquire(&[temp.path()]).expect("acquire");
        assert_eq!(grant.access(), Access::Direct);
        grant.release();
    }

    #[test]
    fn direct_grant_uses_local_ops() {
        let temp = tempfile::tempdir().expect("tempdir");
        let grant = Grant::direct();
        let dir = temp.path().join("made");
        grant.ops().create_dir_all(&dir).expect("mkdir");
        assert!(dir.is_dir());
    }

    #[test]
    fn missing_sudo_is_a_permission_error() {
        let err = escalate(OsStr::new("/nonexistent/sudo")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
        assert!(err.message().unwrap().contains("not available"), "{err}");
        assert!(err.hint().is_some());
    }

    #[test]
    fn refused_credentials_are_a_permission_error() {
        let err = escalate(OsStr::new("false")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
        assert!(
            err.message().unwrap().starts_with("failed to obtain sudo credentials"),
            "{err}"
        );
    }

    #[test]
    fn granted_credentials_switch_to_sudo_ops() {
        let grant = escalate(OsStr::new("true")).expect("escalate");
        assert_eq!(grant.access(), Access::Sudo);
        grant
            .ops()
            .create_dir_all(std::path::Path::new("/libs/off"))
            .expect("sudo program succeeds");
        grant.release();
    }

    #[test]
    fn writable_directories_skip_the_sudo_program() {
        let temp = tempfile::tempdir().expect("tempdir");
        let grant =
            acquire_with(OsStr::new("/nonexistent/sudo"), &[temp.path()]).expect("acquire");
        assert_eq!(grant.access(), Access::Direct);
    }
}
