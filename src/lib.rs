//! Purpose: Library crate behind the `resolve-glib-patch` CLI and its tests.
//! Exports: `core` (layout config, library discovery, file ops, privilege, toggler, errors).
//! Role: Keeps every filesystem decision testable against injected listings and ops.
//! Invariants: Patch state is recomputed from directory contents on every call.
//! Invariants: Core modules take explicit configuration instead of process-wide constants.
pub mod core;
