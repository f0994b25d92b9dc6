//! Purpose: Core modules for toggling the bundled glib libraries.
//! Exports: `config`, `error`, `listing`, `ops`, `privilege`, `toggler`.
//! Role: Library side of the crate; the binary only parses and renders.
pub mod config;
pub mod error;
pub mod listing;
pub mod ops;
pub mod privilege;
pub mod toggler;
