//! Foundation types for tvault.
//!
//! This crate provides the identifiers, limits, and status codes shared by
//! both sides of the trust boundary. Every other tvault crate depends on
//! `tvault-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] — Opaque, caller-supplied key of a persistent object
//! - [`StatusCode`] — Result code carried back across the boundary
//! - [`limits`] — Constants both sides must agree on exactly

pub mod error;
pub mod limits;
pub mod object;
pub mod status;

pub use error::TypeError;
pub use limits::{AES_BLOCK_SIZE, AES_IV_SIZE, AES_KEY_SIZE, MAX_CHUNK, MAX_OBJECT_ID_LEN};
pub use object::ObjectId;
pub use status::StatusCode;
