use std::io::{self, Read};

use tvault_types::MAX_CHUNK;

/// One piece of a source, at most `MAX_CHUNK` bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub data: Vec<u8>,
    /// Set on the first chunk of the source only.
    pub is_first: bool,
    /// Offset of `data[0]` in the source.
    pub offset: u64,
}

impl Chunk {
    /// Whether the source ended inside this chunk.
    pub fn is_short(&self) -> bool {
        self.data.len() < MAX_CHUNK
    }
}

/// Splits a byte source of unknown length into [`Chunk`]s.
///
/// Every chunk except the last is exactly `MAX_CHUNK` bytes, whatever sizes
/// the underlying reader hands back.
pub struct Chunker<R> {
    source: R,
    offset: u64,
    done: bool,
}

impl<R: Read> Chunker<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            offset: 0,
            done: false,
        }
    }

    /// Bytes read from the source so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// The next chunk, or `None` once the source is exhausted.
    pub fn next_chunk(&mut self) -> io::Result<Option<Chunk>> {
        if self.done {
            return Ok(None);
        }
        let mut data = vec![0u8; MAX_CHUNK];
        let n = read_full(&mut self.source, &mut data)?;
        if n < MAX_CHUNK {
            self.done = true;
        }
        if n == 0 {
            return Ok(None);
        }
        data.truncate(n);
        let chunk = Chunk {
            data,
            is_first: self.offset == 0,
            offset: self.offset,
        };
        self.offset += n as u64;
        Ok(Some(chunk))
    }
}

/// Fill `buf` from `reader`, stopping early only at end of input.
pub fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Reader that returns at most `step` bytes per call.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.step).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn collect<R: Read>(source: R) -> Vec<Chunk> {
        let mut chunker = Chunker::new(source);
        let mut chunks = Vec::new();
        while let Some(chunk) = chunker.next_chunk().unwrap() {
            chunks.push(chunk);
        }
        chunks
    }

    #[test]
    fn empty_source_yields_nothing() {
        assert!(collect(io::empty()).is_empty());
    }

    #[test]
    fn exact_multiple_has_no_trailing_chunk() {
        let data = vec![1u8; MAX_CHUNK * 2];
        let chunks = collect(&data[..]);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].is_first);
        assert!(!chunks[1].is_first);
        assert_eq!(chunks[1].offset, MAX_CHUNK as u64);
    }

    #[test]
    fn one_past_boundary() {
        let data = vec![1u8; MAX_CHUNK + 1];
        let chunks = collect(&data[..]);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].data.len(), 1);
        assert!(chunks[1].is_short());
    }

    #[test]
    fn read_full_handles_interrupts() {
        struct Flaky(bool);
        impl Read for Flaky {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                self.0 = !self.0;
                if self.0 {
                    Err(io::ErrorKind::Interrupted.into())
                } else {
                    buf[0] = 9;
                    Ok(1)
                }
            }
        }
        let mut buf = [0u8; 4];
        assert_eq!(read_full(&mut Flaky(false), &mut buf).unwrap(), 4);
        assert_eq!(buf, [9; 4]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]
        #[test]
        fn chunks_reassemble(len in 0usize..MAX_CHUNK * 3, step in 1usize..5000) {
            let data: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let chunks = collect(Trickle { data: &data, step });
            let mut joined = Vec::new();
            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(chunk.is_first, i == 0);
                prop_assert_eq!(chunk.offset as usize, joined.len());
                prop_assert!(chunk.data.len() <= MAX_CHUNK);
                if i + 1 < chunks.len() {
                    prop_assert_eq!(chunk.data.len(), MAX_CHUNK);
                }
                joined.extend_from_slice(&chunk.data);
            }
            prop_assert_eq!(joined, data);
        }
    }
}
