// SPDX-License-Identifier: GPL-3.0-or-later

//! Bit-level reader and writer shared by both codec directions.
//!
//! Bits are packed low-bit-first: the first bit written lands in bit 0 of
//! the first byte. A value written with `write(v, n)` contributes its `n`
//! low-order bits, least significant first. Reading mirrors this exactly, so
//! a reader consuming the same sequence of widths recovers every value.

use crate::{FingerprintError, Result};

/// Appends variable-width values into a growable byte buffer.
#[derive(Debug, Default)]
pub struct BitWriter {
    buf: Vec<u8>,
    acc: u64,
    pending: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer whose buffer can hold `bytes` bytes without reallocating.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            buf: Vec::with_capacity(bytes),
            acc: 0,
            pending: 0,
        }
    }

    /// Append the `bits` low-order bits of `value`. Higher bits are ignored.
    pub fn write(&mut self, value: u32, bits: u32) {
        debug_assert!(bits <= 32, "cannot write {} bits at once", bits);
        if bits == 0 {
            return;
        }

        let masked = u64::from(value) & ((1u64 << bits) - 1);
        self.acc |= masked << self.pending;
        self.pending += bits;

        while self.pending >= 8 {
            self.buf.push(self.acc as u8);
            self.acc >>= 8;
            self.pending -= 8;
        }
    }

    /// Total number of bits written so far, padding excluded.
    pub fn bit_len(&self) -> usize {
        self.buf.len() * 8 + self.pending as usize
    }

    /// Flush the final partial byte (zero-padded) and hand over the buffer.
    pub fn finish(mut self) -> Vec<u8> {
        if self.pending > 0 {
            self.buf.push(self.acc as u8);
        }
        self.buf
    }
}

/// Consumes values from a byte slice in the order [`BitWriter`] produced them.
#[derive(Debug)]
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining_bits(&self) -> usize {
        self.data.len() * 8 - self.pos
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_bits() == 0
    }

    /// Read a `bits`-wide value.
    ///
    /// Fails with [`FingerprintError::TruncatedStream`] when fewer than `bits`
    /// bits remain; the cursor is left untouched in that case.
    pub fn read(&mut self, bits: u32) -> Result<u32> {
        debug_assert!(bits <= 32, "cannot read {} bits at once", bits);
        let needed = bits as usize;
        let available = self.remaining_bits();
        if needed > available {
            return Err(FingerprintError::TruncatedStream { needed, available });
        }

        let mut value = 0u32;
        let mut filled = 0u32;
        while filled < bits {
            let byte = u32::from(self.data[self.pos / 8]);
            let offset = (self.pos % 8) as u32;
            let take = (8 - offset).min(bits - filled);
            let chunk = (byte >> offset) & ((1u32 << take) - 1);
            value |= chunk << filled;
            filled += take;
            self.pos += take as usize;
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_packs_low_bit_first() {
        let mut writer = BitWriter::new();
        writer.write(0b101, 3);
        writer.write(0b11, 2);
        assert_eq!(writer.bit_len(), 5);
        // 0b101 in bits 0..3, 0b11 in bits 3..5
        assert_eq!(writer.finish(), vec![0b0001_1101]);
    }

    #[test]
    fn test_writer_flushes_full_bytes() {
        let mut writer = BitWriter::new();
        writer.write(0xABCD, 16);
        assert_eq!(writer.finish(), vec![0xCD, 0xAB]);
    }

    #[test]
    fn test_writer_ignores_bits_above_width() {
        let mut writer = BitWriter::new();
        writer.write(0xFF, 4);
        assert_eq!(writer.finish(), vec![0x0F]);
    }

    #[test]
    fn test_writer_zero_width_is_noop() {
        let mut writer = BitWriter::new();
        writer.write(0xFFFF_FFFF, 0);
        assert_eq!(writer.bit_len(), 0);
        assert!(writer.finish().is_empty());
    }

    #[test]
    fn test_full_width_values_across_unaligned_boundary() {
        let mut writer = BitWriter::with_capacity(16);
        writer.write(1, 3);
        writer.write(u32::MAX, 32);
        writer.write(0xDEAD_BEEF, 32);
        let bytes = writer.finish();
        assert_eq!(bytes.len(), 9);

        let mut reader = BitReader::new(&bytes);
        assert_eq!(reader.read(3).unwrap(), 1);
        assert_eq!(reader.read(32).unwrap(), u32::MAX);
        assert_eq!(reader.read(32).unwrap(), 0xDEAD_BEEF);
        // Only the zero padding is left.
        assert_eq!(reader.remaining_bits(), 5);
        assert_eq!(reader.read(5).unwrap(), 0);
        assert!(reader.is_exhausted());
    }

    #[test]
    fn test_reader_underrun_is_truncated_stream() {
        let bytes = [0xFFu8];
        let mut reader = BitReader::new(&bytes);
        assert_eq!(reader.read(6).unwrap(), 0b11_1111);

        let err = reader.read(3).unwrap_err();
        assert_eq!(
            err,
            FingerprintError::TruncatedStream {
                needed: 3,
                available: 2
            }
        );
        // A failed read does not move the cursor.
        assert_eq!(reader.read(2).unwrap(), 0b11);
    }

    #[test]
    fn test_reader_on_empty_input() {
        let mut reader = BitReader::new(&[]);
        assert!(reader.is_exhausted());
        assert_eq!(reader.read(0).unwrap(), 0);
        assert!(reader.read(1).is_err());
    }
}
