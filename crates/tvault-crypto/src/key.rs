use rand::RngCore;
use tvault_types::{AES_IV_SIZE, AES_KEY_SIZE};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CipherError;
use crate::stream::{CbcDecryptStream, CbcEncryptStream};

/// AES-256 key and CBC IV owned by one connection.
///
/// The key material never leaves this type: there is no accessor that
/// returns it, `Debug` redacts it, and it is zeroized on drop. Ciphers are
/// obtained through [`SessionKey::encryptor`] and [`SessionKey::decryptor`],
/// each starting a fresh chain from the stored IV.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SessionKey {
    key: [u8; AES_KEY_SIZE],
    iv: [u8; AES_IV_SIZE],
}

impl SessionKey {
    /// Generate a new random key and IV.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut key = [0u8; AES_KEY_SIZE];
        let mut iv = [0u8; AES_IV_SIZE];
        rng.fill_bytes(&mut key);
        rng.fill_bytes(&mut iv);
        Self { key, iv }
    }

    /// Build from explicit material (known-answer tests, benchmarks).
    pub fn from_parts(key: [u8; AES_KEY_SIZE], iv: [u8; AES_IV_SIZE]) -> Self {
        Self { key, iv }
    }

    /// Start an encryption chain at the session IV.
    pub fn encryptor(&self) -> Result<CbcEncryptStream, CipherError> {
        CbcEncryptStream::new(&self.key, &self.iv)
    }

    /// Start a decryption chain at the session IV.
    pub fn decryptor(&self) -> Result<CbcDecryptStream, CipherError> {
        CbcDecryptStream::new(&self.key, &self.iv)
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionKey(<redacted>)")
    }
}
