//! Color tables.
//!
//! Grounded on the teacher's `color.rs` (`RGB`/`parse_color_table`), but
//! widened from an exact-sized `Vec<RGB>` to an always-256-entry, packed
//! ARGB table: the spec requires every color table to be fully
//! materialized so the compositor never needs a per-pixel bounds check.

use crate::byte_reader::ByteReader;
use crate::error::{GifError, Result};

/// A fully materialized, 256-entry palette of packed `0xAARRGGBB` colors.
///
/// Entries beyond the table's declared size are zero (fully transparent
/// black), which is harmless since well-formed GIFs never index past their
/// declared table size.
#[derive(Clone, Copy)]
pub struct ColorTable(pub [u32; 256]);

impl ColorTable {
    pub fn get(&self, index: u8) -> u32 {
        self.0[index as usize]
    }

    pub fn set(&mut self, index: u8, argb: u32) {
        self.0[index as usize] = argb;
    }
}

#[inline]
pub fn pack_argb(r: u8, g: u8, b: u8) -> u32 {
    0xFF00_0000 | ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

/// Reads `nb_entries` 3-byte RGB triples and returns a zero-padded,
/// 256-entry ARGB table (alpha always `0xFF`).
pub fn parse_color_table(rdr: &mut ByteReader, nb_entries: usize) -> Result<ColorTable> {
    if nb_entries > 256 {
        return Err(GifError::UnexpectedLength {
            block_name: "Color Table",
            expected: 256,
            got: nb_entries as u8,
        });
    }
    let raw = rdr.read_bytes(nb_entries * 3)?;
    let mut table = [0u32; 256];
    for i in 0..nb_entries {
        let base = i * 3;
        table[i] = pack_argb(raw[base], raw[base + 1], raw[base + 2]);
    }
    Ok(ColorTable(table))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_pads() {
        let data = [0xFF, 0x00, 0x00, 0x00, 0xFF, 0x00];
        let mut rdr = ByteReader::new(&data);
        let table = parse_color_table(&mut rdr, 2).unwrap();
        assert_eq!(table.get(0), pack_argb(0xFF, 0x00, 0x00));
        assert_eq!(table.get(1), pack_argb(0x00, 0xFF, 0x00));
        assert_eq!(table.get(2), 0);
        assert_eq!(table.get(255), 0);
    }
}
