//! Encrypted file layout: an 8-byte little-endian plaintext length followed
//! by the CBC ciphertext. The last block is PKCS#7 padded only when the
//! plaintext length is not a multiple of the block size.

use std::io::{self, Read, Write};

use crate::error::{SdkError, SdkResult};

pub const HEADER_LEN: usize = 8;

pub fn write_header<W: Write>(out: &mut W, plaintext_len: u64) -> io::Result<()> {
    out.write_all(&plaintext_len.to_le_bytes())
}

/// Read the plaintext length from the front of a container.
pub fn read_header<R: Read>(input: &mut R) -> SdkResult<u64> {
    let mut header = [0u8; HEADER_LEN];
    input.read_exact(&mut header).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => SdkError::Container("missing length header".into()),
        _ => SdkError::Io(e),
    })?;
    Ok(u64::from_le_bytes(header))
}
