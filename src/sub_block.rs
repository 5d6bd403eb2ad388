//! GIF variable-length data sub-blocks: length-prefixed, zero-terminated
//! chunks of at most 255 bytes.

use crate::byte_reader::ByteReader;
use crate::error::Result;

/// Scratch-backed reader for a chain of GIF sub-blocks.
///
/// Grounded on the teacher's inline `skip_sub_blocks` (`parser.rs`), split
/// out into its own component per the spec so the LZW decoder can pull
/// sub-block payloads without re-implementing the length/terminator dance.
pub struct SubBlockReader {
    scratch: [u8; 255],
}

impl SubBlockReader {
    pub fn new() -> Self {
        SubBlockReader { scratch: [0; 255] }
    }

    /// Reads one sub-block into the scratch buffer and returns its length.
    /// A length of `0` signals the terminating empty sub-block; the
    /// scratch buffer is left untouched in that case.
    pub fn read_block(&mut self, rdr: &mut ByteReader) -> Result<usize> {
        let n = rdr.read_u8()? as usize;
        if n == 0 {
            return Ok(0);
        }
        let bytes = rdr.read_bytes(n)?;
        self.scratch[..n].copy_from_slice(bytes);
        Ok(n)
    }

    pub fn block(&self, n: usize) -> &[u8] {
        &self.scratch[..n]
    }

    /// Skips every sub-block up to and including the terminator, without
    /// copying their payloads anywhere.
    pub fn skip_blocks(rdr: &mut ByteReader) -> Result<()> {
        loop {
            let n = rdr.read_u8()? as usize;
            if n == 0 {
                return Ok(());
            }
            rdr.skip(n)?;
        }
    }
}

impl Default for SubBlockReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_blocks_until_terminator() {
        let data = [3, b'a', b'b', b'c', 2, b'd', b'e', 0];
        let mut rdr = ByteReader::new(&data);
        let mut sub = SubBlockReader::new();

        let n = sub.read_block(&mut rdr).unwrap();
        assert_eq!(sub.block(n), b"abc");

        let n = sub.read_block(&mut rdr).unwrap();
        assert_eq!(sub.block(n), b"de");

        let n = sub.read_block(&mut rdr).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn skip_blocks_consumes_everything() {
        let data = [3, 1, 2, 3, 2, 4, 5, 0, 0xFF];
        let mut rdr = ByteReader::new(&data);
        SubBlockReader::skip_blocks(&mut rdr).unwrap();
        assert_eq!(rdr.read_u8().unwrap(), 0xFF);
    }
}
