use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("object id is empty")]
    EmptyObjectId,

    #[error("object id too long: {actual} bytes (max {max})")]
    ObjectIdTooLong { actual: usize, max: usize },

    #[error("unknown status code: {0:#010x}")]
    UnknownStatus(u32),
}
