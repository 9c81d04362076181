//! Cipher pipeline for tvault.
//!
//! Provides the per-connection [`SessionKey`] and the resumable AES-256-CBC
//! streams that carry block chaining across independent chunk calls, so a
//! payload split into any block-aligned chunks encrypts to the same bytes as
//! the payload processed in one piece.
//!
//! Block operations come from the RustCrypto `aes` and `cbc` crates.
//! There is no authentication tag: tampered ciphertext decrypts to garbage.

pub mod error;
pub mod key;
pub mod padding;
pub mod stream;

pub use error::CipherError;
pub use key::SessionKey;
pub use padding::{checked_padded_len, pad_final_chunk, padded_len};
pub use stream::{CbcDecryptStream, CbcEncryptStream};
