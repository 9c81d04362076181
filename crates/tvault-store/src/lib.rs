//! Persistent object storage for tvault.
//!
//! Objects are named, durable byte blobs keyed by a caller-chosen
//! [`ObjectId`](tvault_types::ObjectId). Unlike a content-addressed store,
//! an object is mutable as a whole: create truncates, writes append, and
//! delete removes it.
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//! - [`FileObjectStore`] -- one file per object under a root directory
//!
//! # Design Rules
//!
//! 1. Every operation goes through an [`ObjectHandle`] whose [`DataFlags`]
//!    were checked when it was created or opened.
//! 2. Writes append; there is no seek.
//! 3. A write that would exceed the quota fails with `NoSpace` and writes
//!    nothing. Cleaning up the partial object is the caller's job.
//! 4. Deleting a missing object reports `false`, not an error.
//! 5. Open handles exclude each other by their access and share flags; a
//!    conflicting create or open fails with `AccessConflict`.
//!    `ACCESS_WRITE_META` is never shared.
//! 6. All I/O errors are propagated, never silently ignored.

pub mod config;
pub mod error;
pub mod file;
pub mod handle;
pub mod memory;
mod open_table;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use file::FileObjectStore;
pub use handle::{DataFlags, ObjectHandle, ObjectInfo};
pub use memory::InMemoryObjectStore;
pub use traits::ObjectStore;
