use thiserror::Error;
use tvault_crypto::CipherError;
use tvault_protocol::ProtocolError;
use tvault_store::StoreError;
use tvault_types::{ObjectId, StatusCode};

#[derive(Debug, Error)]
pub enum TrustedError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("{command} out of sequence: {reason}")]
    BadState {
        command: &'static str,
        reason: &'static str,
    },

    #[error("write chunk for {got} while {open} is open")]
    IdMismatch { open: ObjectId, got: ObjectId },

    #[error("object of {size} bytes exceeds {max}")]
    TooLarge { size: u64, max: u64 },

    #[error("short read on {id}: got {got} of {expected} bytes")]
    ShortRead { id: ObjectId, got: u64, expected: u64 },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("cipher error: {0}")]
    Cipher(#[from] CipherError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl TrustedError {
    /// The status reported to the caller for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Protocol(e) => e.status(),
            Self::BadState { .. } => StatusCode::BadState,
            Self::IdMismatch { .. } => StatusCode::BadParameters,
            Self::TooLarge { .. } => StatusCode::OutOfMemory,
            Self::Store(e) => e.status(),
            Self::ShortRead { .. } | Self::Cipher(_) | Self::Config(_) => StatusCode::Generic,
        }
    }
}

pub type TrustedResult<T> = Result<T, TrustedError>;
