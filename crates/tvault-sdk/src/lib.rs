//! Client SDK for tvault.
//!
//! Turns arbitrarily large byte streams into the bounded, chunked calls the
//! trusted side accepts:
//!
//! - [`VaultClient`] -- chunked object writes, two-phase reads, idempotent
//!   deletes, and streaming encryption into the container format
//! - [`Transport`] -- the synchronous call channel, in-process
//!   ([`LocalTransport`]) or through encoded frames ([`FramedTransport`])
//! - [`telemetry`] -- wall clock and CPU measurement around calls

pub mod chunker;
pub mod client;
pub mod container;
pub mod error;
pub mod pattern;
pub mod telemetry;
pub mod transport;

pub use chunker::{Chunk, Chunker};
pub use client::{CipherSummary, Progress, VaultClient, PROGRESS_INTERVAL};
pub use error::{SdkError, SdkResult};
pub use telemetry::{Measurement, Snapshot};
pub use transport::{FramedTransport, LocalTransport, Transport};

// Re-export key types
pub use tvault_trusted::{ReadOutcome, TimingReport, TrustedApp, TrustedConfig};
pub use tvault_types::{ObjectId, StatusCode, MAX_CHUNK};
