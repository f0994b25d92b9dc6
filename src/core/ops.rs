//! Purpose: Filesystem mutations used by the toggler.
//! Exports: `FileOps`, `LocalOps`, `SudoOps`.
//! Role: Direct syscalls when the process may write, `sudo -n` commands otherwise.
//! Invariants: A failed sudo command surfaces its stderr as the I/O error message.
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

pub trait FileOps {
    fn create_dir_all(&self, dir: &Path) -> io::Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn remove_dir(&self, dir: &Path) -> io::Result<()>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LocalOps;

impl FileOps for LocalOps {
    fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        std::fs::create_dir_all(dir)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn remove_dir(&self, dir: &Path) -> io::Result<()> {
        std::fs::remove_dir(dir)
    }
}

/// Runs each mutation through `sudo -n`, relying on cached credentials.
#[derive(Clone, Debug)]
pub struct SudoOps {
    sudo: OsString,
}

impl SudoOps {
    pub fn new() -> Self {
        Self::with_program("sudo")
    }

    pub fn with_program(sudo: impl Into<OsString>) -> Self {
        Self { sudo: sudo.into() }
    }

    fn run(&self, program: &str, flags: &[&str], paths: &[&Path]) -> io::Result<()> {
        let output = sudo_command(&self.sudo, program, flags, paths)
            .stdin(Stdio::null())
            .output()?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = stderr.trim();
        let message = if detail.is_empty() {
            format!("sudo {program} exited with {}", output.status)
        } else {
            detail.to_string()
        };
        Err(io::Error::other(message))
    }
}

impl Default for SudoOps {
    fn default() -> Self {
        Self::new()
    }
}

impl FileOps for SudoOps {
    fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        self.run("mkdir", &["-p"], &[dir])
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.run("mv", &[], &[from, to])
    }

    fn remove_dir(&self, dir: &Path) -> io::Result<()> {
        self.run("rmdir", &[], &[dir])
    }
}

/// `<sudo> -n <program> <flags> -- <paths>`.
pub(crate) fn sudo_command(sudo: &OsStr, program: &str, flags: &[&str], paths: &[&Path]) -> Command {
    let mut cmd = Command::new(sudo);
    cmd.arg("-n").arg(program).args(flags).arg("--").args(paths);
    cmd
}
