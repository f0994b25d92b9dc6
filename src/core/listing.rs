//! Purpose: Discover conflicting libraries in a directory without shell globbing.
//! Exports: `DirListing`, `FsListing`, `is_conflicting_library`, `matching_entries`.
//! Invariants: Matching is case-sensitive, prefix-based, and one level deep.
//! Invariants: An empty match is a normal result, never an error.
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::Path;

use crate::core::config::LIBRARY_PREFIXES;
use crate::core::error::{Error, ErrorKind, io_error};

/// Read-only view of the directories the toggler inspects.
pub trait DirListing {
    fn is_dir(&self, dir: &Path) -> bool;

    /// Entry names directly inside `dir`, in no particular order.
    fn entries(&self, dir: &Path) -> io::Result<Vec<OsString>>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FsListing;

impl DirListing for FsListing {
    fn is_dir(&self, dir: &Path) -> bool {
        dir.is_dir()
    }

    fn entries(&self, dir: &Path) -> io::Result<Vec<OsString>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            names.push(entry?.file_name());
        }
        Ok(names)
    }
}

pub fn is_conflicting_library(name: &OsStr) -> bool {
    let bytes = name.as_encoded_bytes();
    LIBRARY_PREFIXES
        .iter()
        .any(|prefix| bytes.starts_with(prefix.as_bytes()))
}

/// Sorted names of conflicting libraries in `dir`. A missing `dir` yields no matches.
pub fn matching_entries(listing: &dyn DirListing, dir: &Path) -> Result<Vec<OsString>, Error> {
    if !listing.is_dir(dir) {
        return Ok(Vec::new());
    }
    let mut names: Vec<OsString> = listing
        .entries(dir)
        .map_err(|err| io_error("failed to list directory", dir, err))?
        .into_iter()
        .filter(|name| is_conflicting_library(name))
        .collect();
    names.sort();
    Ok(names)
}

pub(crate) fn require_dir(listing: &dyn DirListing, dir: &Path, what: &str) -> Result<(), Error> {
    if listing.is_dir(dir) {
        return Ok(());
    }
    Err(Error::new(ErrorKind::NotFound)
        .with_message(format!("{what} does not exist"))
        .with_path(dir))
}

#[cfg(test)]
mod tests {
    use std::ffi::{OsStr, OsString};
    use std::io;
    use std::path::Path;

    use super::{DirListing, FsListing, is_conflicting_library, matching_entries};
    use crate::core::error::ErrorKind;

    struct FixedListing(Vec<&'static str>);

    impl DirListing for FixedListing {
        fn is_dir(&self, _dir: &Path) -> bool {
            true
        }

        fn entries(&self, _dir: &Path) -> io::Result<Vec<OsString>> {
            Ok(self.0.iter().map(OsString::from).collect())
        }
    }

    struct BrokenListing;

    impl DirListing for BrokenListing {
        fn is_dir(&self, _dir: &Path) -> bool {
            true
        }

        fn entries(&self, _dir: &Path) -> io::Result<Vec<OsString>> {
            Err(io::Error::from_raw_os_error(libc::EACCES))
        }
    }

    #[test]
    fn every_prefix_matches_with_any_suffix() {
        for name in [
            "libgio-2.0.so.0",
            "libglib-2.0.so.0.6800.0",
            "libgmodule-2.0.so",
            "libgobject-2.0.so.0",
            "libglib",
        ] {
            assert!(is_conflicting_library(OsStr::new(name)), "{name}");
        }
    }

    #[test]
    fn unrelated_and_case_variants_do_not_match() {
        for name in [
            "unrelated.so",
            "LibGlib-2.0.so.0",
            "libgi.so",
            "xlibglib.so",
            "libgthread-2.0.so.0",
            ".libglib",
        ] {
            assert!(!is_conflicting_library(OsStr::new(name)), "{name}");
        }
    }

    #[test]
    fn matching_entries_filters_and_sorts() {
        let listing = FixedListing(vec![
            "libgobject-2.0.so.0",
            "unrelated.so",
            "libgio-2.0.so.0",
            "disabled-libraries",
        ]);
        let names = matching_entries(&listing, Path::new("/libs")).expect("list");
        assert_eq!(names, vec!["libgio-2.0.so.0", "libgobject-2.0.so.0"]);
    }

    #[test]
    fn empty_match_is_not_an_error() {
        let listing = FixedListing(vec!["unrelated.so"]);
        let names = matching_entries(&listing, Path::new("/libs")).expect("list");
        assert!(names.is_empty());
    }

    #[test]
    fn listing_failure_is_reported_with_path() {
        let err = matching_entries(&BrokenListing, Path::new("/libs")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
        assert_eq!(err.path(), Some(Path::new("/libs")));
    }

    #[test]
    fn fs_listing_is_one_level_deep() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("libglib-2.0.so.0"), b"glib").expect("write");
        std::fs::create_dir(dir.path().join("nested")).expect("mkdir");
        std::fs::write(dir.path().join("nested").join("libgio-2.0.so.0"), b"gio").expect("write");

        let names = matching_entries(&FsListing, dir.path()).expect("list");
        assert_eq!(names, vec!["libglib-2.0.so.0"]);

        let missing = dir.path().join("missing");
        assert!(matching_entries(&FsListing, &missing).expect("list").is_empty());
    }
}
