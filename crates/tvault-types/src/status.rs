use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Outcome of a boundary call, as seen by the caller.
///
/// The numeric values follow the GlobalPlatform TEE result codes so that a
/// code logged on either side of the boundary means the same thing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCode {
    Success,
    /// Unclassified I/O or cipher-engine fault.
    Generic,
    /// Malformed parameter shape or oversized chunk. No state was changed.
    BadParameters,
    /// Command issued out of sequence.
    BadState,
    /// The object is open elsewhere with rights that exclude this access.
    AccessConflict,
    /// Object missing on open, read, or delete.
    ItemNotFound,
    /// Opcode not recognised.
    NotSupported,
    /// Allocation failure.
    OutOfMemory,
    /// Caller buffer too small; the reply carries the required size.
    ShortBuffer,
    /// Backing store has no space left for the write.
    StorageNoSpace,
}

impl StatusCode {
    /// Stable numeric value of this code.
    pub fn code(self) -> u32 {
        match self {
            Self::Success => 0x0000_0000,
            Self::Generic => 0xFFFF_0000,
            Self::BadParameters => 0xFFFF_0006,
            Self::BadState => 0xFFFF_0007,
            Self::AccessConflict => 0xFFFF_0003,
            Self::ItemNotFound => 0xFFFF_0008,
            Self::NotSupported => 0xFFFF_000A,
            Self::OutOfMemory => 0xFFFF_000C,
            Self::ShortBuffer => 0xFFFF_0010,
            Self::StorageNoSpace => 0xFFFF_3041,
        }
    }

    /// Parse a numeric code.
    pub fn from_code(code: u32) -> Result<Self, TypeError> {
        Ok(match code {
            0x0000_0000 => Self::Success,
            0xFFFF_0000 => Self::Generic,
            0xFFFF_0006 => Self::BadParameters,
            0xFFFF_0007 => Self::BadState,
            0xFFFF_0003 => Self::AccessConflict,
            0xFFFF_0008 => Self::ItemNotFound,
            0xFFFF_000A => Self::NotSupported,
            0xFFFF_000C => Self::OutOfMemory,
            0xFFFF_0010 => Self::ShortBuffer,
            0xFFFF_3041 => Self::StorageNoSpace,
            other => return Err(TypeError::UnknownStatus(other)),
        })
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    /// `ShortBuffer` is informational: the caller retries with a bigger buffer.
    pub fn is_informational(self) -> bool {
        self == Self::ShortBuffer
    }

    /// Codes that end a multi-chunk write and trigger rollback.
    pub fn is_exhaustion(self) -> bool {
        matches!(self, Self::OutOfMemory | Self::StorageNoSpace)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Generic => "Generic",
            Self::BadParameters => "BadParameters",
            Self::BadState => "BadState",
            Self::AccessConflict => "AccessConflict",
            Self::ItemNotFound => "ItemNotFound",
            Self::NotSupported => "NotSupported",
            Self::OutOfMemory => "OutOfMemory",
            Self::ShortBuffer => "ShortBuffer",
            Self::StorageNoSpace => "StorageNoSpace",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#010x})", self.name(), self.code())
    }
}
