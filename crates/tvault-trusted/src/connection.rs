use std::sync::Arc;

use tracing::{debug, info, warn};
use tvault_protocol::{Command, FrameCodec, ProtocolResult, Reply};
use tvault_store::ObjectStore;

use crate::crypto_session::{CryptoSession, TimingReport};
use crate::error::TrustedResult;
use crate::objects::{self, ReadOutcome};
use crate::write_session::WriteSession;

/// One caller's connection to the trusted side.
///
/// Owns the connection's [`WriteSession`] and [`CryptoSession`] and runs one
/// command at a time against them. Dropping the connection rolls back any
/// unfinished write and zeroizes the session key.
pub struct Connection {
    id: u64,
    store: Arc<dyn ObjectStore>,
    writes: WriteSession,
    crypto: CryptoSession,
}

impl Connection {
    pub(crate) fn new(id: u64, store: Arc<dyn ObjectStore>) -> Self {
        info!(conn = id, "connection opened");
        Self {
            id,
            store,
            writes: WriteSession::new(),
            crypto: CryptoSession::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn write_session(&self) -> &WriteSession {
        &self.writes
    }

    pub fn crypto_session(&self) -> &CryptoSession {
        &self.crypto
    }

    /// Run a command and report any failure as a status reply.
    pub fn dispatch(&mut self, command: Command) -> Reply {
        let name = command.name();
        match self.execute(command) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(conn = self.id, command = name, error = %e, "command rejected");
                Reply::Status(e.status())
            }
        }
    }

    /// Run a command. The parameter shape is checked before any state changes.
    pub fn execute(&mut self, command: Command) -> TrustedResult<Reply> {
        command.validate()?;
        debug!(conn = self.id, ?command, "dispatch");
        let store = self.store.as_ref();
        let reply = match command {
            Command::WriteChunk {
                id,
                chunk,
                is_first,
            } => {
                self.writes.write_chunk(store, &id, &chunk, is_first)?;
                Reply::Done
            }
            Command::WriteFinalize => {
                self.writes.finalize(store)?;
                Reply::Done
            }
            Command::WriteObject { id, data } => {
                objects::write_object(store, &id, &data)?;
                Reply::Done
            }
            Command::Read { id, capacity } => match objects::read_object(store, &id, capacity)? {
                ReadOutcome::Data(data) => Reply::Data(data),
                ReadOutcome::NeedsLargerBuffer { required } => Reply::ShortBuffer { required },
            },
            Command::Delete { id } => {
                objects::delete_object(store, &id)?;
                Reply::Done
            }
            Command::EncryptChunk { data, is_first } => {
                let out = self.crypto.encrypt_chunk(&data, is_first)?;
                Reply::Cipher {
                    data: out.data,
                    elapsed_micros: out.elapsed_micros,
                }
            }
            Command::DecryptChunk { data, is_first } => {
                let out = self.crypto.decrypt_chunk(&data, is_first)?;
                Reply::Cipher {
                    data: out.data,
                    elapsed_micros: out.elapsed_micros,
                }
            }
            Command::FinalizeTiming => {
                let TimingReport {
                    encrypt_ms,
                    decrypt_ms,
                    total_bytes,
                } = self.crypto.timing();
                Reply::Timing {
                    encrypt_ms,
                    decrypt_ms,
                    total_bytes,
                }
            }
            Command::Reset => {
                self.crypto.reset();
                Reply::Done
            }
        };
        Ok(reply)
    }

    /// Decode a command frame, run it, and encode the reply frame.
    ///
    /// Frames that cannot be decoded are answered with their status
    /// (`NotSupported` for an unknown opcode, `BadParameters` otherwise).
    pub fn handle_frame(&mut self, frame: &[u8]) -> ProtocolResult<Vec<u8>> {
        let reply = match FrameCodec::decode::<Command>(frame) {
            Ok((command, _)) => self.dispatch(command),
            Err(e) => {
                warn!(conn = self.id, error = %e, "undecodable frame");
                Reply::Status(e.status())
            }
        };
        FrameCodec::encode(&reply)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.writes.in_progress() {
            warn!(conn = self.id, "connection closed with write in progress");
        }
        self.writes.abort(self.store.as_ref());
        info!(conn = self.id, "connection closed");
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("writes", &self.writes)
            .field("crypto", &self.crypto)
            .finish()
    }
}
