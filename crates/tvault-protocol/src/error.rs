use thiserror::Error;
use tvault_types::StatusCode;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown opcode: {0:#04x}")]
    UnknownOpcode(u8),

    #[error("chunk too large: {len} bytes (max {max})")]
    ChunkTooLarge { len: usize, max: usize },

    #[error("cipher input of {len} bytes is not block aligned")]
    Unaligned { len: usize },

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("framing error: {0}")]
    FramingError(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),
}

impl ProtocolError {
    /// Status reported to the caller when a frame or command is rejected.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnknownOpcode(_) => StatusCode::NotSupported,
            _ => StatusCode::BadParameters,
        }
    }
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
