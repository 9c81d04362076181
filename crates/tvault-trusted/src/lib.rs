//! Trusted side of tvault.
//!
//! Everything here runs behind the trust boundary. A [`TrustedApp`] owns the
//! object store and hands out [`Connection`]s; each connection owns its own
//! [`WriteSession`] and [`CryptoSession`] and processes one [`Command`] at a
//! time, answering with a [`Reply`].
//!
//! [`Command`]: tvault_protocol::Command
//! [`Reply`]: tvault_protocol::Reply

pub mod app;
pub mod config;
pub mod connection;
pub mod crypto_session;
pub mod error;
pub mod objects;
pub mod write_session;

pub use app::TrustedApp;
pub use config::{StorageBackend, TrustedConfig};
pub use connection::Connection;
pub use crypto_session::{CipherOutput, CryptoSession, TimingReport};
pub use error::{TrustedError, TrustedResult};
pub use objects::ReadOutcome;
pub use write_session::{WritePhase, WriteSession};
