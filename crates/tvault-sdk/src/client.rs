use std::fmt;
use std::io::{Read, Write};

use serde::Serialize;
use tracing::{debug, info};
use tvault_crypto::{checked_padded_len, pad_final_chunk};
use tvault_protocol::{Command, Reply};
use tvault_trusted::{ReadOutcome, TimingReport};
use tvault_types::{ObjectId, StatusCode};

use crate::chunker::{Chunk, Chunker};
use crate::container;
use crate::error::{SdkError, SdkResult};
use crate::transport::Transport;

/// Bytes between two progress reports.
pub const PROGRESS_INTERVAL: u64 = 256 * 1024;

/// Emitted every [`PROGRESS_INTERVAL`] bytes and when the source ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub operation: &'static str,
    pub bytes: u64,
}

/// Totals for one encrypt or decrypt run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CipherSummary {
    /// Bytes read from the source (container header excluded).
    pub bytes_in: u64,
    /// Bytes written to the sink (container header excluded).
    pub bytes_out: u64,
    pub chunks: u64,
    /// Sum of the per-chunk times reported by the trusted side.
    pub chunk_micros: u64,
    pub encrypt_ms: u64,
    pub decrypt_ms: u64,
    pub total_bytes: u64,
}

impl CipherSummary {
    fn record(&mut self, bytes_in: usize, bytes_out: usize, micros: u64) {
        self.bytes_in += bytes_in as u64;
        self.bytes_out += bytes_out as u64;
        self.chunks += 1;
        self.chunk_micros += micros;
    }

    fn set_timing(&mut self, timing: TimingReport) {
        self.encrypt_ms = timing.encrypt_ms;
        self.decrypt_ms = timing.decrypt_ms;
        self.total_bytes = timing.total_bytes;
    }
}

type ProgressFn = Box<dyn FnMut(Progress)>;

/// Drives the multi-call protocols over a [`Transport`].
///
/// Every multi-chunk operation stops at the first failed call and reports
/// how many bytes the trusted side had accepted. Nothing is retried.
pub struct VaultClient<T> {
    transport: T,
    progress: Option<ProgressFn>,
}

impl<T: Transport> VaultClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            progress: None,
        }
    }

    /// Call `f` as bytes flow through chunked operations.
    pub fn on_progress(mut self, f: impl FnMut(Progress) + 'static) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    // ---- Objects ----

    /// Store everything `source` yields as object `id`, chunk by chunk.
    ///
    /// An empty source still creates the (empty) object.
    pub fn write_stream<R: Read>(&mut self, id: &ObjectId, source: R) -> SdkResult<u64> {
        let mut chunker = Chunker::new(source);
        let mut sent = 0u64;
        let mut mark = 0u64;
        let mut started = false;
        loop {
            let next = chunker
                .next_chunk()
                .map_err(|e| aborted("write", sent, e.into()))?;
            let chunk = match next {
                Some(chunk) => chunk,
                None if !started => Chunk {
                    data: Vec::new(),
                    is_first: true,
                    offset: 0,
                },
                None => break,
            };
            started = true;
            let len = chunk.data.len() as u64;
            let last = chunk.is_short();
            self.expect_done(Command::WriteChunk {
                id: id.clone(),
                chunk: chunk.data,
                is_first: chunk.is_first,
            })
            .map_err(|e| aborted("write", sent, e))?;
            sent += len;
            self.report("write", sent, &mut mark, last);
        }
        self.expect_done(Command::WriteFinalize)
            .map_err(|e| aborted("write", sent, e))?;
        info!(%id, bytes = sent, "object stored");
        Ok(sent)
    }

    pub fn write_all(&mut self, id: &ObjectId, data: &[u8]) -> SdkResult<u64> {
        self.write_stream(id, data)
    }

    /// Store up to `MAX_CHUNK` bytes in a single call.
    pub fn write_object(&mut self, id: &ObjectId, data: &[u8]) -> SdkResult<()> {
        self.expect_done(Command::WriteObject {
            id: id.clone(),
            data: data.to_vec(),
        })
    }

    /// One `Read` call with a buffer of `capacity` bytes.
    pub fn try_read(&mut self, id: &ObjectId, capacity: u64) -> SdkResult<ReadOutcome> {
        match self.call(Command::Read {
            id: id.clone(),
            capacity,
        })? {
            Reply::Data(data) => Ok(ReadOutcome::Data(data)),
            Reply::ShortBuffer { required } => Ok(ReadOutcome::NeedsLargerBuffer { required }),
            other => Err(unexpected("Read", &other)),
        }
    }

    /// Fetch a whole object: probe its size with a 1-byte buffer, then read.
    pub fn read(&mut self, id: &ObjectId) -> SdkResult<Vec<u8>> {
        let required = match self.try_read(id, 1)? {
            ReadOutcome::Data(data) => return Ok(data),
            ReadOutcome::NeedsLargerBuffer { required } => required,
        };
        debug!(%id, size = required, "object size probed");
        match self.try_read(id, required)? {
            ReadOutcome::Data(data) => Ok(data),
            // The object grew between the two calls.
            ReadOutcome::NeedsLargerBuffer { .. } => Err(SdkError::Status {
                command: "Read",
                status: StatusCode::ShortBuffer,
            }),
        }
    }

    /// Delete an object. Succeeds whether or not it existed.
    pub fn delete(&mut self, id: &ObjectId) -> SdkResult<()> {
        self.expect_done(Command::Delete { id: id.clone() })
    }

    // ---- Cipher ----

    /// Encrypt `source` into the container format on `out`.
    ///
    /// `plaintext_len` goes into the header and must match what `source`
    /// yields. The final chunk is padded only if it is not block aligned.
    pub fn encrypt_stream<R: Read, W: Write>(
        &mut self,
        source: R,
        plaintext_len: u64,
        out: &mut W,
    ) -> SdkResult<CipherSummary> {
        container::write_header(out, plaintext_len)?;
        let mut chunker = Chunker::new(source);
        let mut summary = CipherSummary::default();
        let mut mark = 0u64;
        while let Some(mut chunk) = chunker
            .next_chunk()
            .map_err(|e| aborted("encrypt", summary.bytes_in, e.into()))?
        {
            let len = chunk.data.len();
            let last = chunk.is_short();
            if last {
                pad_final_chunk(&mut chunk.data);
            }
            let (ciphertext, micros) = self
                .cipher(Command::EncryptChunk {
                    data: chunk.data,
                    is_first: chunk.is_first,
                })
                .map_err(|e| aborted("encrypt", summary.bytes_in, e))?;
            out.write_all(&ciphertext)?;
            summary.record(len, ciphertext.len(), micros);
            self.report("encrypt", summary.bytes_in, &mut mark, last);
        }
        if summary.bytes_in != plaintext_len {
            return Err(SdkError::Container(format!(
                "source held {} bytes, header declares {plaintext_len}",
                summary.bytes_in
            )));
        }
        summary.set_timing(self.finalize_timing()?);
        out.flush()?;
        Ok(summary)
    }

    /// Decrypt a container from `source` onto `out`, dropping the padding.
    ///
    /// Must run on the connection that encrypted the data: the key never
    /// leaves it.
    pub fn decrypt_stream<R: Read, W: Write>(
        &mut self,
        mut source: R,
        out: &mut W,
    ) -> SdkResult<CipherSummary> {
        let plaintext_len = container::read_header(&mut source)?;
        let expected = checked_padded_len(plaintext_len).ok_or_else(|| {
            SdkError::Container(format!("header declares {plaintext_len} bytes"))
        })?;
        let mut remaining = plaintext_len;
        let mut chunker = Chunker::new(source);
        let mut summary = CipherSummary::default();
        let mut mark = 0u64;
        while let Some(chunk) = chunker
            .next_chunk()
            .map_err(|e| aborted("decrypt", summary.bytes_in, e.into()))?
        {
            let len = chunk.data.len();
            let last = chunk.is_short();
            if summary.bytes_in + len as u64 > expected {
                return Err(SdkError::Container(format!(
                    "ciphertext exceeds {expected} bytes expected for {plaintext_len} plaintext bytes"
                )));
            }
            let (plaintext, micros) = self
                .cipher(Command::DecryptChunk {
                    data: chunk.data,
                    is_first: chunk.is_first,
                })
                .map_err(|e| aborted("decrypt", summary.bytes_in, e))?;
            let keep = (plaintext.len() as u64).min(remaining) as usize;
            out.write_all(&plaintext[..keep])?;
            remaining -= keep as u64;
            summary.record(len, keep, micros);
            self.report("decrypt", summary.bytes_in, &mut mark, last);
        }
        if summary.bytes_in != expected {
            return Err(SdkError::Container(format!(
                "{} ciphertext bytes, expected {expected} for {plaintext_len} plaintext bytes",
                summary.bytes_in
            )));
        }
        summary.set_timing(self.finalize_timing()?);
        out.flush()?;
        Ok(summary)
    }

    /// Cumulative cipher counters of this connection.
    pub fn finalize_timing(&mut self) -> SdkResult<TimingReport> {
        match self.call(Command::FinalizeTiming)? {
            Reply::Timing {
                encrypt_ms,
                decrypt_ms,
                total_bytes,
            } => Ok(TimingReport {
                encrypt_ms,
                decrypt_ms,
                total_bytes,
            }),
            other => Err(unexpected("FinalizeTiming", &other)),
        }
    }

    /// Discard running cipher chains and counters. The key is kept.
    pub fn reset(&mut self) -> SdkResult<()> {
        self.expect_done(Command::Reset)
    }

    // ---- Plumbing ----

    fn call(&mut self, command: Command) -> SdkResult<Reply> {
        let name = command.name();
        match self.transport.call(command)? {
            Reply::Status(status) => Err(SdkError::Status {
                command: name,
                status,
            }),
            reply => Ok(reply),
        }
    }

    fn expect_done(&mut self, command: Command) -> SdkResult<()> {
        let name = command.name();
        match self.call(command)? {
            Reply::Done => Ok(()),
            other => Err(unexpected(name, &other)),
        }
    }

    fn cipher(&mut self, command: Command) -> SdkResult<(Vec<u8>, u64)> {
        let name = command.name();
        match self.call(command)? {
            Reply::Cipher {
                data,
                elapsed_micros,
            } => Ok((data, elapsed_micros)),
            other => Err(unexpected(name, &other)),
        }
    }

    fn report(&mut self, operation: &'static str, bytes: u64, mark: &mut u64, last: bool) {
        let Some(callback) = self.progress.as_mut() else {
            return;
        };
        let crossed = bytes / PROGRESS_INTERVAL > *mark / PROGRESS_INTERVAL;
        if crossed || (last && bytes != *mark) {
            callback(Progress { operation, bytes });
            *mark = bytes;
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for VaultClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultClient")
            .field("transport", &self.transport)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

fn aborted(operation: &'static str, offset: u64, source: SdkError) -> SdkError {
    SdkError::Aborted {
        operation,
        offset,
        source: Box::new(source),
    }
}

fn unexpected(command: &'static str, reply: &Reply) -> SdkError {
    SdkError::UnexpectedReply {
        command,
        reply: reply.name(),
    }
}
