//! Protocol constants shared by the client and the trusted side.

/// Largest payload a single boundary call may carry, in bytes.
pub const MAX_CHUNK: usize = 16 * 1024;

/// AES block size in bytes. Raw cipher chunks must be a multiple of this.
pub const AES_BLOCK_SIZE: usize = 16;

/// AES-256 key length in bytes.
pub const AES_KEY_SIZE: usize = 32;

/// CBC initialization vector length in bytes.
pub const AES_IV_SIZE: usize = 16;

/// Longest accepted object identifier, in bytes.
pub const MAX_OBJECT_ID_LEN: usize = 64;
