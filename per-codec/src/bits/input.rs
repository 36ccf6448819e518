//! Bit input cursor
//!
//! [`BitInput`] reads a PER bit stream most-significant bit first. The cursor
//! holds the bytes received so far; when a read needs more bits than are
//! buffered it pulls the next chunk from its [`RefillSource`].
//!
//! # Refill
//!
//! On refill the unread tail of the buffer (starting at the octet holding
//! the current bit) is kept and the new chunk is appended right after the
//! last valid bit. If the buffer ended mid-octet the chunk is bit-shifted
//! into place, so the logical stream stays contiguous. A read that cannot be
//! satisfied fails before consuming anything.

use bytes::{BufMut, Bytes, BytesMut};
use per_core::{PerError, PerResult, PerVariant};
use std::fmt;

use super::source::{NoRefill, Refill, RefillSource};
use super::MAX_FEW_BITS;

/// Read cursor over a PER bit stream
#[derive(Debug)]
pub struct BitInput<R = NoRefill> {
    buffer: Bytes,
    /// Offset of the next unread bit within `buffer`
    bit_offset: usize,
    /// Number of valid bits in `buffer`
    bit_count: usize,
    /// Bits consumed since the cursor was created
    bits_moved: usize,
    variant: PerVariant,
    source: R,
}

impl BitInput<NoRefill> {
    /// Create a cursor over a complete buffer
    pub fn new(data: impl Into<Bytes>, variant: PerVariant) -> Self {
        let buffer = data.into();
        let bit_count = buffer.len() * 8;
        Self {
            buffer,
            bit_offset: 0,
            bit_count,
            bits_moved: 0,
            variant,
            source: NoRefill,
        }
    }
}

impl<R: RefillSource> BitInput<R> {
    /// Create a cursor with an empty buffer that pulls everything from `source`
    pub fn from_source(source: R, variant: PerVariant) -> Self {
        Self {
            buffer: Bytes::new(),
            bit_offset: 0,
            bit_count: 0,
            bits_moved: 0,
            variant,
            source,
        }
    }

    /// Attach a refill source behind the current buffer
    pub fn with_source<S: RefillSource>(self, source: S) -> BitInput<S> {
        BitInput {
            buffer: self.buffer,
            bit_offset: self.bit_offset,
            bit_count: self.bit_count,
            bits_moved: self.bits_moved,
            variant: self.variant,
            source,
        }
    }

    /// Limit the initial buffer to `bits` valid bits
    ///
    /// Useful when the last octet of the input is only partially used.
    pub fn with_bit_count(mut self, bits: usize) -> Self {
        self.bit_count = bits.min(self.buffer.len() * 8).max(self.bit_offset);
        self
    }

    pub fn variant(&self) -> PerVariant {
        self.variant
    }

    pub fn bit_offset(&self) -> usize {
        self.bit_offset
    }

    pub fn bit_count(&self) -> usize {
        self.bit_count
    }

    pub fn bits_moved(&self) -> usize {
        self.bits_moved
    }

    /// Bits buffered and not yet consumed
    pub fn remaining_bits(&self) -> usize {
        self.bit_count - self.bit_offset
    }

    pub fn source(&self) -> &R {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut R {
        &mut self.source
    }

    pub fn into_source(self) -> R {
        self.source
    }

    /// Read up to 31 bits, right-aligned in the result
    pub fn get_few_bits(&mut self, nbits: u32) -> PerResult<u32> {
        if nbits > MAX_FEW_BITS {
            return Err(PerError::ContractViolation(format!(
                "Cannot read {} bits at once, maximum is {}",
                nbits, MAX_FEW_BITS
            )));
        }
        if nbits == 0 {
            return Ok(0);
        }
        self.ensure(nbits as usize)?;
        let value = self.read_at(self.bit_offset, nbits as usize);
        self.advance(nbits as usize);
        Ok(value as u32)
    }

    /// Look at the next `nbits` bits (up to 31) without consuming them
    pub fn peek_few_bits(&mut self, nbits: u32) -> PerResult<u32> {
        if nbits > MAX_FEW_BITS {
            return Err(PerError::ContractViolation(format!(
                "Cannot peek {} bits at once, maximum is {}",
                nbits, MAX_FEW_BITS
            )));
        }
        if nbits == 0 {
            return Ok(0);
        }
        self.ensure(nbits as usize)?;
        Ok(self.read_at(self.bit_offset, nbits as usize) as u32)
    }

    /// Rewind the cursor by `nbits`
    ///
    /// Only valid right after a successful read of at least `nbits` bits.
    pub fn get_undo(&mut self, nbits: usize) -> PerResult<()> {
        if nbits > self.bit_offset || nbits > self.bits_moved {
            return Err(PerError::ContractViolation(format!(
                "Cannot undo {} bits, only {} are behind the cursor",
                nbits,
                self.bit_offset.min(self.bits_moved)
            )));
        }
        self.bit_offset -= nbits;
        self.bits_moved -= nbits;
        Ok(())
    }

    /// Read `nbits` bits into `dst`
    ///
    /// With `right_align` the first `nbits % 8` bits land right-justified in
    /// `dst[0]` and the remaining bits fill whole octets. Without it, octets
    /// are filled from the left and the final partial octet is zero-padded
    /// on the right.
    pub fn get_many_bits(&mut self, dst: &mut [u8], right_align: bool, nbits: usize) -> PerResult<()> {
        let needed_bytes = nbits.div_ceil(8);
        if dst.len() < needed_bytes {
            return Err(PerError::ContractViolation(format!(
                "Destination holds {} bytes, {} bits need {}",
                dst.len(),
                nbits,
                needed_bytes
            )));
        }
        self.ensure(nbits)?;

        let mut left = nbits;
        let mut out = 0;
        if right_align && left % 8 != 0 {
            let head = left % 8;
            dst[0] = self.take(head) as u8;
            out = 1;
            left -= head;
        }
        while left >= 24 {
            let value = self.take(24);
            dst[out] = (value >> 16) as u8;
            dst[out + 1] = (value >> 8) as u8;
            dst[out + 2] = value as u8;
            out += 3;
            left -= 24;
        }
        while left >= 8 {
            dst[out] = self.take(8) as u8;
            out += 1;
            left -= 8;
        }
        if left > 0 {
            dst[out] = (self.take(left) << (8 - left)) as u8;
        }
        Ok(())
    }

    /// Make at least `needed` unread bits available, refilling as required
    pub(crate) fn ensure(&mut self, needed: usize) -> PerResult<()> {
        while self.remaining_bits() < needed {
            match self.source.refill()? {
                Refill::Data(chunk) if !chunk.is_empty() => self.append(chunk),
                Refill::Data(_) | Refill::Pending => {
                    return Err(PerError::NeedMoreInput {
                        needed,
                        available: self.remaining_bits(),
                    });
                }
                Refill::Exhausted => {
                    return Err(PerError::EndOfData {
                        needed,
                        available: self.remaining_bits(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Consume `nbits` (at most 64) bits already made available by `ensure`
    pub(crate) fn take(&mut self, nbits: usize) -> u64 {
        let value = self.read_at(self.bit_offset, nbits);
        self.advance(nbits);
        value
    }

    fn advance(&mut self, nbits: usize) {
        self.bit_offset += nbits;
        self.bits_moved += nbits;
    }

    fn read_at(&self, offset: usize, nbits: usize) -> u64 {
        let mut value = 0u64;
        let mut pos = offset;
        let mut left = nbits;
        while left > 0 {
            let byte = self.buffer[pos / 8] as u64;
            let avail = 8 - pos % 8;
            let take = avail.min(left);
            let bits = (byte >> (avail - take)) & ((1u64 << take) - 1);
            value = (value << take) | bits;
            pos += take;
            left -= take;
        }
        value
    }

    fn append(&mut self, chunk: Bytes) {
        let start = self.bit_offset / 8;
        let used = self.bit_count.div_ceil(8);
        let partial = self.bit_count % 8;
        let tail_bits = self.bit_count - start * 8;
        let chunk_len = chunk.len();

        if start == used {
            self.buffer = chunk;
        } else {
            let mut merged = BytesMut::with_capacity(used - start + chunk.len() + 1);
            merged.extend_from_slice(&self.buffer[start..used]);
            if partial == 0 {
                merged.extend_from_slice(&chunk);
            } else {
                let last = merged.len() - 1;
                merged[last] &= 0xFFu8 << (8 - partial);
                for &byte in chunk.iter() {
                    let last = merged.len() - 1;
                    merged[last] |= byte >> partial;
                    merged.put_u8(byte << (8 - partial));
                }
            }
            self.buffer = merged.freeze();
        }

        self.bit_offset -= start * 8;
        self.bit_count = tail_bits + chunk_len * 8;
        log::trace!(
            "PER input refilled with {} bytes, {} bits buffered, {} bits moved",
            chunk_len,
            self.remaining_bits(),
            self.bits_moved
        );
    }
}

impl<R> fmt::Display for BitInput<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bits left ({}+{}) moved {} [",
            self.bit_count - self.bit_offset,
            self.bit_offset,
            self.bit_count,
            self.bits_moved
        )?;
        let from = self.bit_offset / 8;
        let to = self.bit_count.div_ceil(8).min(from + 16);
        for (i, byte) in self.buffer[from..to].iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        write!(f, "]")
    }
}
