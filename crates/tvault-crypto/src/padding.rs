//! PKCS#7 padding for the final chunk of a cipher run.

use tvault_types::AES_BLOCK_SIZE;

/// Length `len` becomes once padded. Block-aligned lengths are unchanged,
/// since aligned final chunks are sent as-is.
pub fn padded_len(len: usize) -> usize {
    if len % AES_BLOCK_SIZE == 0 {
        len
    } else {
        len + (AES_BLOCK_SIZE - len % AES_BLOCK_SIZE)
    }
}

/// [`padded_len`] for a length taken from untrusted input. `None` when the
/// padded length does not fit in a `u64`.
pub fn checked_padded_len(len: u64) -> Option<u64> {
    let block = AES_BLOCK_SIZE as u64;
    match len % block {
        0 => Some(len),
        rem => len.checked_add(block - rem),
    }
}

/// Pad `chunk` to the block size with PKCS#7 bytes if it is not already
/// aligned. Returns the number of padding bytes appended.
pub fn pad_final_chunk(chunk: &mut Vec<u8>) -> usize {
    let pad = padded_len(chunk.len()) - chunk.len();
    chunk.resize(chunk.len() + pad, pad as u8);
    pad
}
