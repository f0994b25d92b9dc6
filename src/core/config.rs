//! Purpose: Fixed patch layout plus the run configuration handed to the toggler.
//! Exports: `PatchConfig`, `DEFAULT_LIB_DIR`, `DISABLED_DIR_NAME`, `LIBRARY_PREFIXES`.
//! Role: Single source of the directory layout; no files or environment are read.
//! Invariants: The disabled directory always sits directly beneath the library directory.
use std::path::{Path, PathBuf};

/// Library directory of a stock DaVinci Resolve install.
pub const DEFAULT_LIB_DIR: &str = "/opt/resolve/libs";

/// Holding area created beneath the library directory.
pub const DISABLED_DIR_NAME: &str = "disabled-libraries";

/// Bundled glib family libraries that shadow the system copies.
pub const LIBRARY_PREFIXES: [&str; 4] = ["libgio", "libglib", "libgmodule", "libgobject"];

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PatchConfig {
    pub lib_dir: PathBuf,
    pub disabled_dir: PathBuf,
    pub color: bool,
}

impl PatchConfig {
    pub fn new(lib_dir: impl Into<PathBuf>) -> Self {
        let lib_dir = lib_dir.into();
        let disabled_dir = lib_dir.join(DISABLED_DIR_NAME);
        Self {
            lib_dir,
            disabled_dir,
            color: false,
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn lib_dir(&self) -> &Path {
        &self.lib_dir
    }

    pub fn disabled_dir(&self) -> &Path {
        &self.disabled_dir
    }
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self::new(DEFAULT_LIB_DIR)
    }
}
