//! Core data types for the minsel version-selection tool.
//!
//! This crate defines the value types the selection engine operates on:
//! the `(path, version)` module identifier, the requirement-provider trait
//! that supplies the graph and the version ordering, and a file-backed
//! provider for fully-enumerated graphs.
//!
//! This crate is intentionally free of threads and terminal I/O.

pub mod requirements;
pub mod universe;
pub mod version;
