use std::io::{self, Write};

/// Block size used when writing generated data.
pub const PATTERN_BLOCK: usize = 256 * 1024;

/// Byte at offset `i` of the generated test pattern.
pub fn pattern_byte(i: u64) -> u8 {
    (i ^ (i >> 8)) as u8
}

/// Write `size` bytes of the deterministic test pattern.
pub fn write_pattern<W: Write>(out: &mut W, size: u64) -> io::Result<()> {
    let mut block = vec![0u8; PATTERN_BLOCK];
    let mut written = 0u64;
    while written < size {
        let n = (size - written).min(PATTERN_BLOCK as u64) as usize;
        for (j, byte) in block[..n].iter_mut().enumerate() {
            *byte = pattern_byte(written + j as u64);
        }
        out.write_all(&block[..n])?;
        written += n as u64;
    }
    out.flush()
}
