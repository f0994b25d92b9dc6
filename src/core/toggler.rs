//! Purpose: Move conflicting glib libraries between the library and disabled directories.
//! Exports: `Toggler`, `PatchState`, `ApplyPlan`, `MovePlan`, `Direction`.
//! Role: Read-only planning (`inspect`, `plan_apply`, `plan_revert`) kept apart from `execute`.
//! Invariants: Patch state is always derived from directory contents, never persisted.
//! Invariants: Planning never mutates; a plan with moves is the only input to `execute`.
//! Invariants: Execution aborts on the first failed syscall and does not roll back.
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::core::config::PatchConfig;
use crate::core::error::{Error, ErrorKind, io_error};
use crate::core::listing::{DirListing, matching_entries, require_dir};
use crate::core::ops::FileOps;

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PatchState {
    /// Library directory itself is absent.
    Missing,
    NotApplied { count: usize },
    Applied { count: usize },
    /// Neither directory holds a conflicting library.
    NoLibraries,
    Inconsistent { in_lib_dir: usize, in_disabled_dir: usize },
}

impl PatchState {
    pub fn is_consistent(&self) -> bool {
        matches!(self, PatchState::NotApplied { .. } | PatchState::Applied { .. })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Apply,
    Revert,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MovePlan {
    pub direction: Direction,
    pub from: PathBuf,
    pub to: PathBuf,
    pub names: Vec<OsString>,
    /// Destination must be created before the first move.
    pub create_dest: bool,
    /// Source must be removed after the last move.
    pub remove_source: bool,
}

impl MovePlan {
    pub fn moves(&self) -> impl Iterator<Item = (PathBuf, PathBuf)> + '_ {
        self.names
            .iter()
            .map(|name| (self.from.join(name), self.to.join(name)))
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ApplyPlan {
    AlreadyApplied { count: usize },
    Move(MovePlan),
}

pub struct Toggler<'a> {
    config: &'a PatchConfig,
    listing: &'a dyn DirListing,
}

impl<'a> Toggler<'a> {
    pub fn new(config: &'a PatchConfig, listing: &'a dyn DirListing) -> Self {
        Self { config, listing }
    }

    pub fn inspect(&self) -> Result<PatchState, Error> {
        if !self.listing.is_dir(self.config.lib_dir()) {
            return Ok(PatchState::Missing);
        }
        let active = matching_entries(self.listing, self.config.lib_dir())?.len();
        let disabled = matching_entries(self.listing, self.config.disabled_dir())?.len();
        Ok(match (active, disabled) {
            (0, 0) => PatchState::NoLibraries,
            (count, 0) => PatchState::NotApplied { count },
            (0, count) => PatchState::Applied { count },
            (in_lib_dir, in_disabled_dir) => PatchState::Inconsistent {
                in_lib_dir,
                in_disabled_dir,
            },
        })
    }

    pub fn plan_apply(&self) -> Result<ApplyPlan, Error> {
        let lib_dir = self.config.lib_dir();
        let disabled_dir = self.config.disabled_dir();
        require_dir(self.listing, lib_dir, "library directory")?;

        let active = matching_entries(self.listing, lib_dir)?;
        let disabled = matching_entries(self.listing, disabled_dir)?;
        if active.is_empty() {
            if disabled.is_empty() {
                return Err(Error::new(ErrorKind::Empty)
                    .with_message("no conflicting libraries found")
                    .with_path(lib_dir)
                    .with_hint("Check that DaVinci Resolve is installed in this directory."));
            }
            return Ok(ApplyPlan::AlreadyApplied {
                count: disabled.len(),
            });
        }
        if !disabled.is_empty() {
            return Err(inconsistent(active.len(), disabled.len(), disabled_dir));
        }

        Ok(ApplyPlan::Move(MovePlan {
            direction: Direction::Apply,
            from: lib_dir.to_path_buf(),
            to: disabled_dir.to_path_buf(),
            names: active,
            create_dest: !self.listing.is_dir(disabled_dir),
            remove_source: false,
        }))
    }

    pub fn plan_revert(&self) -> Result<MovePlan, Error> {
        let lib_dir = self.config.lib_dir();
        let disabled_dir = self.config.disabled_dir();
        if !self.listing.is_dir(disabled_dir) {
            return Err(Error::new(ErrorKind::NotFound)
                .with_message("disabled directory does not exist; nothing to revert")
                .with_path(disabled_dir));
        }
        require_dir(self.listing, lib_dir, "library directory")?;

        let disabled = matching_entries(self.listing, disabled_dir)?;
        if disabled.is_empty() {
            return Err(Error::new(ErrorKind::Empty)
                .with_message("no disabled libraries to restore")
                .with_path(disabled_dir));
        }
        let active = matching_entries(self.listing, lib_dir)?;
        if !active.is_empty() {
            return Err(inconsistent(active.len(), disabled.len(), lib_dir));
        }

        Ok(MovePlan {
            direction: Direction::Revert,
            from: disabled_dir.to_path_buf(),
            to: lib_dir.to_path_buf(),
            names: disabled,
            create_dest: false,
            remove_source: true,
        })
    }

    /// Performs `plan`, returning how many entries moved.
    pub fn execute(plan: &MovePlan, ops: &dyn FileOps) -> Result<usize, Error> {
        if plan.create_dest {
            ops.create_dir_all(&plan.to)
                .map_err(|err| io_error("failed to create directory", &plan.to, err))?;
            debug!(dir = %plan.to.display(), "created directory");
        }

        let mut moved = 0;
        for (from, to) in plan.moves() {
            ops.rename(&from, &to)
                .map_err(|err| io_error("failed to move library", &from, err))?;
            debug!(from = %from.display(), to = %to.display(), "moved");
            moved += 1;
        }

        if plan.remove_source {
            ops.remove_dir(&plan.from).map_err(|err| {
                io_error("failed to remove disabled directory", &plan.from, err)
                    .with_hint("The directory still holds unexpected files; the libraries were restored.")
            })?;
            debug!(dir = %plan.from.display(), "removed directory");
        }
        Ok(moved)
    }
}

fn inconsistent(in_lib_dir: usize, in_disabled_dir: usize, path: &Path) -> Error {
    Error::new(ErrorKind::Inconsistent)
        .with_message(format!(
            "conflicting libraries found in both directories ({in_lib_dir} active, {in_disabled_dir} disabled)"
        ))
        .with_path(path)
        .with_hint("A previous run was interrupted; inspect both directories and resolve by hand.")
}
