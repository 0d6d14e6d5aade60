//! Bit-granular stream with polarity-aware search
//!
//! The demodulator cannot tell which polarity the recording was
//! made with, and tape files are not byte-aligned with respect to
//! the start of the bitstream. A [`BitCursor`] therefore searches
//! for sync patterns one bit at a time, under both the normal and
//! the inverted interpretation of the bits. Once a pattern is
//! found, the cursor remembers the polarity that matched, and all
//! further reads are made under that polarity.
//!
//! The cursor starts *before* the first bit, at position `-1`.
//! All cursor movements report whether the cursor is still within
//! bounds. The position one past the last bit is considered in
//! bounds: a read there returns only padding.

use std::fmt;
use std::iter::FromIterator;

/// Byte-aligned sync marker
///
/// Precedes the address block and the checksum of a tape file.
pub const SYNC_BYTE: u32 = 0xE6;

/// Bit-aligned sync pattern
///
/// Eight zero bits followed by a one bit. Used to locate the
/// start of data when no known file format is present.
pub const SYNC_BIT: u32 = 0x0080;

/// Mask for [`SYNC_BIT`]
pub const SYNC_BIT_MASK: u32 = 0xFF80;

/// Read access to a stream of bits
///
/// The format decoder reads tape files through this trait. It
/// never changes the bits themselves: only the cursor, the
/// polarity, and the consumed prefix.
pub trait BitCursor {
    /// Number of bits in the stream
    fn len(&self) -> usize;

    /// True if there are no bits
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cursor position, in bits
    ///
    /// A position of `-1` is before the first bit.
    fn position(&self) -> isize;

    /// True if reads are inverted
    fn is_inverted(&self) -> bool;

    /// Set the read polarity
    fn set_inverted(&mut self, inverted: bool);

    /// Move the cursor before the first bit and clear inversion
    fn reset(&mut self);

    /// Move the cursor by `bits`
    ///
    /// Returns `true` if the cursor is at most one past the last
    /// bit.
    fn offset(&mut self, bits: isize) -> bool;

    /// Advance by one bit
    fn next_bit(&mut self) -> bool {
        self.offset(1)
    }

    /// Advance by one byte
    fn next_byte(&mut self) -> bool {
        self.offset(8)
    }

    /// Advance by one word
    fn next_word(&mut self) -> bool {
        self.offset(16)
    }

    /// Read `width` bits at the cursor, most significant first
    ///
    /// Bits which lie outside the stream read as zero. If the
    /// stream is inverted, all `width` bits of the result are
    /// inverted, including any padding. `width` must not exceed
    /// 32. The cursor does not move.
    fn hex(&self, width: u32) -> u32;

    /// Read one byte at the cursor
    fn byte(&self) -> u8 {
        self.hex(8) as u8
    }

    /// Read one big-endian word at the cursor
    fn word(&self) -> u16 {
        self.hex(16) as u16
    }

    /// Search for a bit pattern
    ///
    /// Starting one bit past the cursor, tests each position in
    /// turn for `hex(width) & mask == target`: first as-is, then
    /// inverted. On a match, the cursor is left at the start of the
    /// pattern with the matching polarity. Returns `false` when
    /// the stream is exhausted.
    fn find(&mut self, target: u32, mask: u32, width: u32) -> bool {
        while self.next_bit() {
            self.set_inverted(false);
            if self.hex(width) & mask == target {
                return true;
            }

            self.set_inverted(true);
            if self.hex(width) & mask == target {
                return true;
            }
        }
        false
    }

    /// Find the next [`SYNC_BYTE`] and move past it
    fn find_sync(&mut self) -> bool {
        self.find(SYNC_BYTE, 0xFF, 8) && self.offset(8)
    }

    /// Find the next [`SYNC_BIT`] pattern
    ///
    /// The cursor is left at the start of the pattern.
    fn find_sync_bit(&mut self) -> bool {
        self.find(SYNC_BIT, SYNC_BIT_MASK, 16)
    }

    /// Discard all bits before the cursor
    ///
    /// The cursor returns to before the first remaining bit, and
    /// inversion is cleared.
    fn trim(&mut self);

    /// Read unstructured bytes
    ///
    /// Rewinds, finds the [`SYNC_BIT`] pattern, and reads bytes
    /// from there to the end of the stream. The last byte may be
    /// padded. Returns nothing if the pattern is absent.
    fn bytes(&mut self) -> Vec<u8> {
        self.reset();
        let mut out = Vec::new();
        if !self.find_sync_bit() {
            return out;
        }

        out.push(self.byte());
        while self.next_byte() {
            out.push(self.byte());
        }
        out
    }
}

/// Append-only stream of demodulated bits
///
/// ```
/// use tapeload::{BitCursor, Bitstream};
///
/// // 0x19 is the sync byte 0xE6, inverted
/// let mut bits = Bitstream::from_bytes(&[0x00, 0x19, 0xA5]);
/// assert!(bits.find_sync());
/// assert!(bits.is_inverted());
/// assert_eq!(bits.byte(), 0x5A);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Bitstream {
    bits: Vec<bool>,
    cursor: isize,
    inverted: bool,
}

impl Bitstream {
    /// Empty stream
    pub fn new() -> Self {
        Self {
            bits: Vec::new(),
            cursor: -1,
            inverted: false,
        }
    }

    /// Stream of `bytes`, most significant bit first
    pub fn from_bytes(bytes: &[u8]) -> Self {
        bytes
            .iter()
            .flat_map(|byte| (0..8).rev().map(move |i| (byte >> i) & 0x01 == 0x01))
            .collect()
    }

    /// Append one bit
    pub fn add_bit(&mut self, bit: bool) {
        self.bits.push(bit);
    }

    /// Remove all bits and reset the cursor
    pub fn clear(&mut self) {
        self.bits.clear();
        self.reset();
    }

    /// All bits, in order
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    #[inline]
    fn bit_at(&self, index: isize) -> bool {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.bits.get(i).copied())
            .unwrap_or(false)
    }
}

impl BitCursor for Bitstream {
    fn len(&self) -> usize {
        self.bits.len()
    }

    fn position(&self) -> isize {
        self.cursor
    }

    fn is_inverted(&self) -> bool {
        self.inverted
    }

    fn set_inverted(&mut self, inverted: bool) {
        self.inverted = inverted;
    }

    fn reset(&mut self) {
        self.cursor = -1;
        self.inverted = false;
    }

    fn offset(&mut self, bits: isize) -> bool {
        self.cursor += bits;
        self.cursor <= self.bits.len() as isize
    }

    fn hex(&self, width: u32) -> u32 {
        debug_assert!(width <= 32);
        let width = u32::min(width, 32);

        let mut value = 0u64;
        for i in 0..width as isize {
            value = (value << 1) | self.bit_at(self.cursor + i) as u64;
        }
        if self.inverted {
            value ^= (1u64 << width) - 1;
        }
        value as u32
    }

    fn trim(&mut self) {
        let start = usize::try_from(self.cursor).unwrap_or(0);
        if start >= self.bits.len() {
            self.bits.clear();
        } else {
            self.bits.drain(..start);
        }
        self.reset();
    }
}

impl Default for Bitstream {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<bool> for Bitstream {
    fn from_iter<T: IntoIterator<Item = bool>>(iter: T) -> Self {
        Self {
            bits: iter.into_iter().collect(),
            ..Self::new()
        }
    }
}

impl fmt::Display for Bitstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &bit in &self.bits {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl fmt::Debug for Bitstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitstream")
            .field("len", &self.bits.len())
            .field("cursor", &self.cursor)
            .field("inverted", &self.inverted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits_of(pattern: &str) -> Vec<bool> {
        pattern
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c == '1')
            .collect()
    }

    #[test]
    fn test_from_bytes() {
        let bits = Bitstream::from_bytes(&[0xA5, 0x01]);
        assert_eq!(bits.len(), 16);
        assert_eq!(bits.to_string(), "1010010100000001");
        assert_eq!(bits.position(), -1);
        assert!(!bits.is_inverted());
    }

    #[test]
    fn test_hex_padding() {
        let mut bits = Bitstream::from_bytes(&[0xA5]);
        assert!(bits.offset(5));
        assert_eq!(bits.byte(), 0x50);

        bits.set_inverted(true);
        assert_eq!(bits.byte(), 0xAF);

        // before the start reads as padding too
        bits.reset();
        assert_eq!(bits.byte(), 0x52);
        assert_eq!(bits.hex(0), 0);
        assert!(bits.next_bit());
        assert_eq!(bits.hex(32), 0xA500_0000);
    }

    #[test]
    fn test_cursor_end_is_in_bounds() {
        let mut bits = Bitstream::from_bytes(&[0xFF]);
        assert!(bits.next_byte()); // position 7
        assert_eq!(bits.position(), 7);
        assert!(bits.next_bit()); // position 8 == len
        assert_eq!(bits.position(), 8);
        assert_eq!(bits.byte(), 0x00);
        assert!(!bits.next_bit()); // position 9 > len
        assert!(!bits.next_word());
    }

    #[test]
    fn test_find_sync_aligned() {
        let mut bits = Bitstream::from_bytes(&[0x00, 0x00, 0xE6, 0x12, 0x34]);
        assert!(bits.find_sync());
        assert_eq!(bits.position(), 24);
        assert!(!bits.is_inverted());
        assert_eq!(bits.word(), 0x1234);
    }

    #[test]
    fn test_find_sync_inverted_unaligned() {
        // alternating filler can never contain 0xE6 or 0x19,
        // so the only match is the inverted sync at bit 13
        let mut raw = bits_of("1010101010101");
        raw.extend(bits_of("00011001")); // 0xE6, inverted
        raw.extend(bits_of("10100101")); // 0x5A, inverted
        raw.extend(bits_of("0101010101"));
        let mut bits: Bitstream = raw.into_iter().collect();

        assert!(bits.find_sync());
        assert!(bits.is_inverted());
        assert_eq!(bits.position(), 13 + 8);
        assert_eq!(bits.byte(), 0x5A);
    }

    #[test]
    fn test_find_exhausted() {
        let mut bits = Bitstream::from_bytes(&[0x00, 0x00]);
        assert!(!bits.find_sync());
        assert_eq!(bits.position(), 17);
        assert!(!bits.find_sync_bit());

        let mut empty = Bitstream::new();
        assert!(!empty.find_sync());
    }

    #[test]
    fn test_find_resumes_after_cursor() {
        let mut bits = Bitstream::from_bytes(&[0xE6, 0x00, 0xE6]);
        assert!(bits.find_sync());
        assert_eq!(bits.position(), 8);
        assert!(bits.find_sync());
        assert_eq!(bits.position(), 24);
        assert!(!bits.find_sync());
    }

    #[test]
    fn test_find_sync_bit() {
        let mut bits: Bitstream = bits_of("111 00000000 1 0110").into_iter().collect();
        assert!(bits.find_sync_bit());
        assert_eq!(bits.position(), 3);
        assert!(!bits.is_inverted());
    }

    #[test]
    fn test_trim() {
        let mut bits = Bitstream::from_bytes(&[0xE6, 0x3C]);
        assert!(bits.find_sync());
        bits.set_inverted(true);
        bits.trim();
        assert_eq!(bits.len(), 8);
        assert_eq!(bits.position(), -1);
        assert!(!bits.is_inverted());
        assert!(bits.next_bit());
        assert_eq!(bits.byte(), 0x3C);

        // trimming before the start keeps everything
        bits.reset();
        bits.trim();
        assert_eq!(bits.len(), 8);

        // trimming at or past the end empties the stream
        assert!(!bits.offset(100));
        bits.trim();
        assert!(bits.is_empty());
    }

    #[test]
    fn test_bytes_pads_last_byte() {
        let mut bits = Bitstream::from_bytes(&[0xAA, 0x00, 0x80]);
        assert_eq!(bits.bytes(), vec![0x00, 0x80, 0x00]);
        assert!(bits.position() > bits.len() as isize);

        // unaligned
        let mut raw = bits_of("11");
        raw.extend(bits_of("00000000 10110000 1"));
        let mut bits: Bitstream = raw.into_iter().collect();
        assert_eq!(bits.bytes(), vec![0x00, 0xB0, 0x80]);

        let mut bits = Bitstream::from_bytes(&[0x00, 0x00]);
        assert!(bits.bytes().is_empty());
    }
}
