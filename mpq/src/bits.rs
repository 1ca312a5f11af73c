//! Sequential bit-level reader for the bit-packed HET/BET regions

use crate::{Error, Result};

/// Reads unsigned integers of arbitrary width from a byte buffer
///
/// Bits are consumed least-significant first within each byte and bytes
/// are consumed from low to high addresses. Bits read earlier end up in
/// the lower-order bits of the result.
#[derive(Debug, Clone)]
pub struct BitCursor<'a> {
    data: &'a [u8],
    byte_pos: usize,
    bit_pos: u32,
}

impl<'a> BitCursor<'a> {
    /// Create a cursor at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    /// Number of bits consumed so far
    pub fn position(&self) -> u64 {
        self.byte_pos as u64 * 8 + self.bit_pos as u64
    }

    /// Number of bits left in the buffer
    pub fn remaining(&self) -> u64 {
        self.data.len() as u64 * 8 - self.position()
    }

    fn ensure(&self, width: u32) -> Result<()> {
        let available = self.remaining();
        if (width as u64) > available {
            return Err(Error::OutOfBits {
                requested: width,
                available,
            });
        }
        Ok(())
    }

    /// Read the next `width` bits (at most 64) as an integer
    ///
    /// A width of zero reads nothing and yields zero.
    pub fn next(&mut self, width: u32) -> Result<u64> {
        if width > 64 {
            return Err(Error::invalid_format(format!(
                "bit field of {} bits exceeds 64",
                width
            )));
        }
        self.ensure(width)?;

        let mut result = 0u64;
        let mut filled = 0u32;
        while filled < width {
            let byte = self.data[self.byte_pos] as u64;
            let take = (8 - self.bit_pos).min(width - filled);
            let bits = (byte >> self.bit_pos) & ((1u64 << take) - 1);

            result |= bits << filled;
            filled += take;
            self.bit_pos += take;
            if self.bit_pos == 8 {
                self.bit_pos = 0;
                self.byte_pos += 1;
            }
        }

        Ok(result)
    }

    /// Copy the next `nbits` raw bits into `dst`
    ///
    /// Each destination byte is filled with eight bits in read order; a
    /// final partial byte holds the leftover bits in its low end.
    pub fn next_bytes(&mut self, dst: &mut [u8], nbits: u32) -> Result<()> {
        let needed = nbits.div_ceil(8) as usize;
        if dst.len() < needed {
            return Err(Error::invalid_format(format!(
                "destination of {} bytes cannot hold {} bits",
                dst.len(),
                nbits
            )));
        }
        self.ensure(nbits)?;

        let mut left = nbits;
        for out in dst.iter_mut().take(needed) {
            let take = left.min(8);
            *out = self.next(take)? as u8;
            left -= take;
        }

        Ok(())
    }

    /// Advance past `nbits` bits without decoding them
    pub fn skip(&mut self, nbits: u64) -> Result<()> {
        let available = self.remaining();
        if nbits > available {
            return Err(Error::OutOfBits {
                requested: u32::try_from(nbits).unwrap_or(u32::MAX),
                available,
            });
        }
        let target = self.position() + nbits;
        self.byte_pos = (target / 8) as usize;
        self.bit_pos = (target % 8) as u32;
        Ok(())
    }
}

/// Pack `(value, width)` fields LSB-first, mirroring [`BitCursor`]
#[cfg(test)]
pub(crate) fn pack_bits(fields: &[(u64, u32)]) -> Vec<u8> {
    let total: u64 = fields.iter().map(|&(_, w)| w as u64).sum();
    let mut out = vec![0u8; total.div_ceil(8) as usize];
    let mut pos = 0u64;
    for &(value, width) in fields {
        for bit in 0..width {
            if (value >> bit) & 1 == 1 {
                out[(pos / 8) as usize] |= 1 << (pos % 8);
            }
            pos += 1;
        }
    }
    out
}
