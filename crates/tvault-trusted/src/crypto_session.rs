use std::time::Instant;

use tracing::{debug, info};
use tvault_crypto::{CbcDecryptStream, CbcEncryptStream, SessionKey};

use crate::error::{TrustedError, TrustedResult};

/// Output of one cipher chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CipherOutput {
    pub data: Vec<u8>,
    pub elapsed_micros: u64,
}

/// Cumulative counters reported by `FinalizeTiming`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimingReport {
    pub encrypt_ms: u64,
    pub decrypt_ms: u64,
    pub total_bytes: u64,
}

/// Resumable AES-CBC pipeline owned by one connection.
///
/// The key and IV are generated on the first encryption of the connection
/// and kept until the session is dropped; [`reset`](Self::reset) discards
/// the running chains and counters but not the key. Each `is_first` chunk
/// restarts its chain at the session IV, so the chaining of a sequence of
/// chunks is the same as for one call over their concatenation.
#[derive(Debug, Default)]
pub struct CryptoSession {
    key: Option<SessionKey>,
    encryptor: Option<CbcEncryptStream>,
    decryptor: Option<CbcDecryptStream>,
    encrypt_micros: u64,
    decrypt_micros: u64,
    total_bytes: u64,
}

impl CryptoSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a key has been generated on this connection.
    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    pub fn encrypt_chunk(&mut self, data: &[u8], is_first: bool) -> TrustedResult<CipherOutput> {
        if is_first {
            let key = self.key.get_or_insert_with(|| {
                info!("session key generated");
                SessionKey::generate()
            });
            if let Some(done) = self.encryptor.replace(key.encryptor()?) {
                debug!(bytes = done.finalize(), "encrypt chain restarted");
            }
            self.encrypt_micros = 0;
            self.total_bytes = 0;
        }
        let encryptor = self.encryptor.as_mut().ok_or(TrustedError::BadState {
            command: "EncryptChunk",
            reason: "no encryption in progress",
        })?;

        let start = Instant::now();
        let out = encryptor.update(data)?;
        let elapsed_micros = start.elapsed().as_micros() as u64;

        self.encrypt_micros += elapsed_micros;
        self.total_bytes += data.len() as u64;
        debug!(len = data.len(), is_first, elapsed_us = elapsed_micros, "chunk encrypted");
        Ok(CipherOutput {
            data: out,
            elapsed_micros,
        })
    }

    /// Decrypt one chunk. Fails with `BadState` until a key exists.
    pub fn decrypt_chunk(&mut self, data: &[u8], is_first: bool) -> TrustedResult<CipherOutput> {
        let key = self.key.as_ref().ok_or(TrustedError::BadState {
            command: "DecryptChunk",
            reason: "no key on this connection",
        })?;
        if is_first {
            if let Some(done) = self.decryptor.replace(key.decryptor()?) {
                debug!(bytes = done.finalize(), "decrypt chain restarted");
            }
            self.decrypt_micros = 0;
        }
        let decryptor = self.decryptor.as_mut().ok_or(TrustedError::BadState {
            command: "DecryptChunk",
            reason: "no decryption in progress",
        })?;

        let start = Instant::now();
        let out = decryptor.update(data)?;
        let elapsed_micros = start.elapsed().as_micros() as u64;

        self.decrypt_micros += elapsed_micros;
        debug!(len = data.len(), is_first, elapsed_us = elapsed_micros, "chunk decrypted");
        Ok(CipherOutput {
            data: out,
            elapsed_micros,
        })
    }

    /// Current counters. Does not reset them.
    pub fn timing(&self) -> TimingReport {
        let report = TimingReport {
            encrypt_ms: self.encrypt_micros / 1000,
            decrypt_ms: self.decrypt_micros / 1000,
            total_bytes: self.total_bytes,
        };
        info!(
            encrypt_ms = report.encrypt_ms,
            decrypt_ms = report.decrypt_ms,
            total_bytes = report.total_bytes,
            "cipher timing"
        );
        report
    }

    /// Drop the running chains and zero the counters. The key stays.
    pub fn reset(&mut self) {
        let encrypted = self.encryptor.take().map_or(0, CbcEncryptStream::finalize);
        let decrypted = self.decryptor.take().map_or(0, CbcDecryptStream::finalize);
        self.encrypt_micros = 0;
        self.decrypt_micros = 0;
        self.total_bytes = 0;
        debug!(
            encrypted,
            decrypted,
            has_key = self.key.is_some(),
            "cipher session reset"
        );
    }
}
