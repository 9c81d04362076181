//! Resumable AES-256-CBC streams.
//!
//! A stream owns the running CBC state (the previous ciphertext block), so
//! each [`update`](CbcEncryptStream::update) continues the chain where the
//! last one stopped. Streams never pad: every update must be a whole number
//! of blocks, and callers pad the final chunk themselves.

use aes::Aes256;
use cbc::cipher::generic_array::GenericArray;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use tvault_types::AES_BLOCK_SIZE;

use crate::error::CipherError;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

fn check_aligned(len: usize) -> Result<(), CipherError> {
    if len % AES_BLOCK_SIZE != 0 {
        return Err(CipherError::Unaligned { len });
    }
    Ok(())
}

/// Encrypting half of the pipeline.
pub struct CbcEncryptStream {
    inner: Aes256CbcEnc,
    processed: u64,
}

impl CbcEncryptStream {
    pub(crate) fn new(key: &[u8], iv: &[u8]) -> Result<Self, CipherError> {
        let inner =
            Aes256CbcEnc::new_from_slices(key, iv).map_err(|_| CipherError::InvalidKeyLength)?;
        Ok(Self {
            inner,
            processed: 0,
        })
    }

    /// Encrypt one block-aligned chunk, continuing the chain.
    pub fn update(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let mut out = plaintext.to_vec();
        self.update_in_place(&mut out)?;
        Ok(out)
    }

    /// Encrypt a block-aligned buffer in place. An unaligned buffer is
    /// rejected before any block is touched.
    pub fn update_in_place(&mut self, buf: &mut [u8]) -> Result<(), CipherError> {
        check_aligned(buf.len())?;
        for block in buf.chunks_exact_mut(AES_BLOCK_SIZE) {
            self.inner
                .encrypt_block_mut(GenericArray::from_mut_slice(block));
        }
        self.processed += buf.len() as u64;
        Ok(())
    }

    /// Bytes encrypted so far on this chain.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// End the chain and return the total bytes it processed.
    ///
    /// Nothing is buffered between updates, so there is no trailing output.
    pub fn finalize(self) -> u64 {
        self.processed
    }
}

/// Decrypting half of the pipeline.
pub struct CbcDecryptStream {
    inner: Aes256CbcDec,
    processed: u64,
}

impl CbcDecryptStream {
    pub(crate) fn new(key: &[u8], iv: &[u8]) -> Result<Self, CipherError> {
        let inner =
            Aes256CbcDec::new_from_slices(key, iv).map_err(|_| CipherError::InvalidKeyLength)?;
        Ok(Self {
            inner,
            processed: 0,
        })
    }

    /// Decrypt one block-aligned chunk, continuing the chain.
    pub fn update(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let mut out = ciphertext.to_vec();
        self.update_in_place(&mut out)?;
        Ok(out)
    }

    pub fn update_in_place(&mut self, buf: &mut [u8]) -> Result<(), CipherError> {
        check_aligned(buf.len())?;
        for block in buf.chunks_exact_mut(AES_BLOCK_SIZE) {
            self.inner
                .decrypt_block_mut(GenericArray::from_mut_slice(block));
        }
        self.processed += buf.len() as u64;
        Ok(())
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// End the chain and return the total bytes it processed.
    pub fn finalize(self) -> u64 {
        self.processed
    }
}

impl std::fmt::Debug for CbcEncryptStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CbcEncryptStream")
            .field("processed", &self.processed)
            .finish()
    }
}

impl std::fmt::Debug for CbcDecryptStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CbcDecryptStream")
            .field("processed", &self.processed)
            .finish()
    }
}
