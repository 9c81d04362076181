use tvault_types::AES_BLOCK_SIZE;

/// Errors from cipher operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("input of {len} bytes is not a multiple of the {AES_BLOCK_SIZE}-byte block size")]
    Unaligned { len: usize },

    #[error("invalid key or IV length")]
    InvalidKeyLength,
}
