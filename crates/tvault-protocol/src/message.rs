use std::fmt;

use serde::{Deserialize, Serialize};
use tvault_types::{ObjectId, StatusCode, AES_BLOCK_SIZE, MAX_CHUNK};

use crate::error::{ProtocolError, ProtocolResult};

/// Largest frame payload either side will encode or accept.
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Bytes a `Reply::Data` payload adds around the object: the bincode
/// variant tag (`u32`) and the byte-vector length (`u64`).
pub const DATA_REPLY_OVERHEAD: usize = 4 + 8;

/// Largest object whose `Data` reply still fits in one frame.
pub const MAX_OBJECT_SIZE: u64 = (MAX_FRAME_SIZE - DATA_REPLY_OVERHEAD) as u64;

/// Stable opcodes. Commands use the low range, replies the high range.
pub mod opcodes {
    pub const WRITE_CHUNK: u8 = 0x01;
    pub const WRITE_FINALIZE: u8 = 0x02;
    pub const WRITE_OBJECT: u8 = 0x03;
    pub const READ: u8 = 0x04;
    pub const DELETE: u8 = 0x05;
    pub const ENCRYPT_CHUNK: u8 = 0x10;
    pub const DECRYPT_CHUNK: u8 = 0x11;
    pub const FINALIZE_TIMING: u8 = 0x12;
    pub const RESET: u8 = 0x13;

    pub const DONE: u8 = 0x80;
    pub const DATA: u8 = 0x81;
    pub const SHORT_BUFFER: u8 = 0x82;
    pub const CIPHER: u8 = 0x83;
    pub const TIMING: u8 = 0x84;
    pub const STATUS: u8 = 0xFF;
}

/// Every command a caller can send across the boundary.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Append one chunk to an object; `is_first` creates or truncates it.
    WriteChunk {
        id: ObjectId,
        chunk: Vec<u8>,
        is_first: bool,
    },
    /// Close the object opened by the current write session.
    WriteFinalize,
    /// Create an object from a single buffer of at most `MAX_CHUNK` bytes.
    WriteObject { id: ObjectId, data: Vec<u8> },
    /// Read a whole object into a buffer of `capacity` bytes.
    Read { id: ObjectId, capacity: u64 },
    Delete { id: ObjectId },
    EncryptChunk { data: Vec<u8>, is_first: bool },
    DecryptChunk { data: Vec<u8>, is_first: bool },
    FinalizeTiming,
    Reset,
}

impl Command {
    pub fn opcode(&self) -> u8 {
        match self {
            Self::WriteChunk { .. } => opcodes::WRITE_CHUNK,
            Self::WriteFinalize => opcodes::WRITE_FINALIZE,
            Self::WriteObject { .. } => opcodes::WRITE_OBJECT,
            Self::Read { .. } => opcodes::READ,
            Self::Delete { .. } => opcodes::DELETE,
            Self::EncryptChunk { .. } => opcodes::ENCRYPT_CHUNK,
            Self::DecryptChunk { .. } => opcodes::DECRYPT_CHUNK,
            Self::FinalizeTiming => opcodes::FINALIZE_TIMING,
            Self::Reset => opcodes::RESET,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::WriteChunk { .. } => "WriteChunk",
            Self::WriteFinalize => "WriteFinalize",
            Self::WriteObject { .. } => "WriteObject",
            Self::Read { .. } => "Read",
            Self::Delete { .. } => "Delete",
            Self::EncryptChunk { .. } => "EncryptChunk",
            Self::DecryptChunk { .. } => "DecryptChunk",
            Self::FinalizeTiming => "FinalizeTiming",
            Self::Reset => "Reset",
        }
    }

    pub fn is_known_opcode(opcode: u8) -> bool {
        matches!(opcode, opcodes::WRITE_CHUNK..=opcodes::DELETE)
            || matches!(opcode, opcodes::ENCRYPT_CHUNK..=opcodes::RESET)
    }

    /// Check the parameter shape before the command touches any state.
    ///
    /// Chunks larger than [`MAX_CHUNK`] and cipher input that is not a whole
    /// number of AES blocks are rejected. `WriteObject` is sized by the
    /// trusted side, which reports oversized data as out of memory.
    pub fn validate(&self) -> ProtocolResult<()> {
        match self {
            Self::WriteChunk { chunk, .. } => check_chunk(chunk.len()),
            Self::EncryptChunk { data, .. } | Self::DecryptChunk { data, .. } => {
                check_chunk(data.len())?;
                if data.len() % AES_BLOCK_SIZE != 0 {
                    return Err(ProtocolError::Unaligned { len: data.len() });
                }
                Ok(())
            }
            Self::WriteFinalize
            | Self::WriteObject { .. }
            | Self::Read { .. }
            | Self::Delete { .. }
            | Self::FinalizeTiming
            | Self::Reset => Ok(()),
        }
    }
}

fn check_chunk(len: usize) -> ProtocolResult<()> {
    if len > MAX_CHUNK {
        return Err(ProtocolError::ChunkTooLarge {
            len,
            max: MAX_CHUNK,
        });
    }
    Ok(())
}

/// Payloads are summarized by length.
impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WriteChunk { id, chunk, is_first } => write!(
                f,
                "WriteChunk {{ id: {id}, len: {}, is_first: {is_first} }}",
                chunk.len()
            ),
            Self::WriteObject { id, data } => {
                write!(f, "WriteObject {{ id: {id}, len: {} }}", data.len())
            }
            Self::Read { id, capacity } => write!(f, "Read {{ id: {id}, capacity: {capacity} }}"),
            Self::Delete { id } => write!(f, "Delete {{ id: {id} }}"),
            Self::EncryptChunk { data, is_first } | Self::DecryptChunk { data, is_first } => {
                write!(
                    f,
                    "{} {{ len: {}, is_first: {is_first} }}",
                    self.name(),
                    data.len()
                )
            }
            Self::WriteFinalize | Self::FinalizeTiming | Self::Reset => f.write_str(self.name()),
        }
    }
}

/// Outcome of a command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reply {
    Done,
    /// Object contents returned by `Read`.
    Data(Vec<u8>),
    /// The read buffer was too small; nothing was transferred.
    ShortBuffer { required: u64 },
    /// Output of one cipher chunk and the time the update took.
    Cipher { data: Vec<u8>, elapsed_micros: u64 },
    /// Cumulative cipher counters.
    Timing {
        encrypt_ms: u64,
        decrypt_ms: u64,
        total_bytes: u64,
    },
    /// The command failed with this status.
    Status(StatusCode),
}

impl Reply {
    pub fn opcode(&self) -> u8 {
        match self {
            Self::Done => opcodes::DONE,
            Self::Data(_) => opcodes::DATA,
            Self::ShortBuffer { .. } => opcodes::SHORT_BUFFER,
            Self::Cipher { .. } => opcodes::CIPHER,
            Self::Timing { .. } => opcodes::TIMING,
            Self::Status(_) => opcodes::STATUS,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Done => "Done",
            Self::Data(_) => "Data",
            Self::ShortBuffer { .. } => "ShortBuffer",
            Self::Cipher { .. } => "Cipher",
            Self::Timing { .. } => "Timing",
            Self::Status(_) => "Status",
        }
    }

    pub fn is_known_opcode(opcode: u8) -> bool {
        matches!(opcode, opcodes::DONE..=opcodes::TIMING | opcodes::STATUS)
    }

    /// The status code this reply carries on the wire.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Status(code) => *code,
            Self::ShortBuffer { .. } => StatusCode::ShortBuffer,
            _ => StatusCode::Success,
        }
    }
}

impl From<StatusCode> for Reply {
    fn from(code: StatusCode) -> Self {
        Self::Status(code)
    }
}
