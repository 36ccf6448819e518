//! Bit output cursor
//!
//! [`BitOutput`] packs bits most-significant first into a small inline
//! staging buffer. Whenever the next write would not fit, the completed
//! octets are handed to the [`FlushSink`] and the partial octet moves to the
//! front of the staging buffer. Nothing is heap allocated on the write path.

use per_core::{PerError, PerResult, PerVariant};

use super::sink::FlushSink;
use super::MAX_FEW_BITS;

/// Size of the inline staging buffer in bytes
pub const STAGING_CAPACITY: usize = 32;

const STAGING_BITS: usize = STAGING_CAPACITY * 8;

/// Write cursor producing a PER bit stream
#[derive(Debug)]
pub struct BitOutput<S> {
    staging: [u8; STAGING_CAPACITY],
    /// Bits used in `staging`
    bit_offset: usize,
    /// Bytes already handed to the sink
    flushed_bytes: usize,
    variant: PerVariant,
    sink: S,
}

impl<S: FlushSink> BitOutput<S> {
    pub fn new(sink: S, variant: PerVariant) -> Self {
        Self {
            staging: [0; STAGING_CAPACITY],
            bit_offset: 0,
            flushed_bytes: 0,
            variant,
            sink,
        }
    }

    pub fn variant(&self) -> PerVariant {
        self.variant
    }

    /// Bit offset within the staging buffer
    pub fn bit_offset(&self) -> usize {
        self.bit_offset
    }

    /// Free bits left in the staging buffer
    pub fn bits_free(&self) -> usize {
        STAGING_BITS - self.bit_offset
    }

    pub fn flushed_bytes(&self) -> usize {
        self.flushed_bytes
    }

    /// Total bits written, flushed or staged
    pub fn bits_written(&self) -> usize {
        self.flushed_bytes * 8 + self.bit_offset
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Write the `nbits` (at most 31) low bits of `bits`
    pub fn put_few_bits(&mut self, bits: u32, nbits: u32) -> PerResult<()> {
        if nbits > MAX_FEW_BITS {
            return Err(PerError::ContractViolation(format!(
                "Cannot write {} bits at once, maximum is {}",
                nbits, MAX_FEW_BITS
            )));
        }
        if nbits == 0 {
            return Ok(());
        }
        if nbits as usize > self.bits_free() {
            self.flush_complete()?;
        }

        let mut left = nbits as usize;
        let value = bits as u64 & ((1u64 << left) - 1);
        while left > 0 {
            let index = self.bit_offset / 8;
            let free = 8 - self.bit_offset % 8;
            let take = free.min(left);
            let chunk = (value >> (left - take)) & ((1u64 << take) - 1);
            self.staging[index] |= (chunk << (free - take)) as u8;
            self.bit_offset += take;
            left -= take;
        }
        Ok(())
    }

    /// Write the first `nbits` bits of `src`, most significant bit first
    pub fn put_many_bits(&mut self, src: &[u8], nbits: usize) -> PerResult<()> {
        if src.len() * 8 < nbits {
            return Err(PerError::ContractViolation(format!(
                "Source holds {} bytes, {} bits requested",
                src.len(),
                nbits
            )));
        }

        let mut left = nbits;
        let mut chunks = src.chunks(3);
        while left >= 24 {
            if let Some(&[a, b, c]) = chunks.next() {
                self.put_few_bits(u32::from_be_bytes([0, a, b, c]), 24)?;
            }
            left -= 24;
        }
        if left > 0 {
            let rest = chunks.next().unwrap_or(&[]);
            let mut value = 0u32;
            for i in 0..left.div_ceil(8) {
                value = (value << 8) | rest[i] as u32;
            }
            if left % 8 != 0 {
                value >>= 8 - left % 8;
            }
            self.put_few_bits(value, left as u32)?;
        }
        Ok(())
    }

    /// Pad the trailing partial octet with zero bits and drain the staging buffer
    ///
    /// Returns the total number of bytes handed to the sink. Calling it again
    /// without further writes is a no-op.
    pub fn finish(&mut self) -> PerResult<usize> {
        let len = self.bit_offset.div_ceil(8);
        if len > 0 {
            self.sink.accept(&self.staging[..len])?;
            self.flushed_bytes += len;
            self.staging = [0; STAGING_CAPACITY];
            self.bit_offset = 0;
            log::trace!("PER output finished, {} bytes total", self.flushed_bytes);
        }
        Ok(self.flushed_bytes)
    }

    fn flush_complete(&mut self) -> PerResult<()> {
        let complete = self.bit_offset / 8;
        if complete == 0 {
            return Ok(());
        }
        self.sink.accept(&self.staging[..complete])?;
        self.flushed_bytes += complete;
        log::trace!(
            "PER output flushed {} bytes, {} bytes total",
            complete,
            self.flushed_bytes
        );

        let partial = self.bit_offset % 8;
        let carry = if partial > 0 { self.staging[complete] } else { 0 };
        self.staging = [0; STAGING_CAPACITY];
        self.staging[0] = carry;
        self.bit_offset = partial;
        Ok(())
    }
}
