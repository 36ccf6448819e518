//! Octet alignment
//!
//! Aligned PER pads to the next octet boundary before certain fields;
//! unaligned PER never pads, so both operations are no-ops there.

use per_core::PerResult;

use crate::bits::{BitInput, BitOutput, FlushSink, RefillSource};

fn padding_bits(bit_offset: usize) -> u32 {
    ((8 - bit_offset % 8) % 8) as u32
}

impl<R: RefillSource> BitInput<R> {
    /// Whether the cursor sits on an octet boundary
    pub fn is_octet_aligned(&self) -> bool {
        self.bit_offset() % 8 == 0
    }

    /// Skip padding up to the next octet boundary (aligned PER only)
    ///
    /// Returns the number of bits skipped.
    pub fn get_align(&mut self) -> PerResult<usize> {
        if !self.variant().is_aligned() {
            return Ok(0);
        }
        let pad = padding_bits(self.bit_offset());
        self.get_few_bits(pad)?;
        Ok(pad as usize)
    }
}

impl<S: FlushSink> BitOutput<S> {
    /// Whether the cursor sits on an octet boundary
    pub fn is_octet_aligned(&self) -> bool {
        self.bit_offset() % 8 == 0
    }

    /// Write zero padding up to the next octet boundary (aligned PER only)
    ///
    /// Returns the number of bits written.
    pub fn put_align(&mut self) -> PerResult<usize> {
        if !self.variant().is_aligned() {
            return Ok(0);
        }
        let pad = padding_bits(self.bit_offset());
        self.put_few_bits(0, pad)?;
        Ok(pad as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use per_core::PerVariant;

    #[test]
    fn test_put_align_idempotent() {
        let mut output = BitOutput::new(Vec::new(), PerVariant::Aligned);
        output.put_few_bits(0b101, 3).unwrap();
        assert_eq!(output.put_align().unwrap(), 5);
        assert_eq!(output.put_align().unwrap(), 0);
        assert!(output.is_octet_aligned());
        output.put_few_bits(0xFF, 8).unwrap();
        output.finish().unwrap();
        assert_eq!(output.into_sink(), vec![0b1010_0000, 0xFF]);
    }

    #[test]
    fn test_get_align_idempotent() {
        let mut input = BitInput::new(vec![0b1010_0000, 0xFF], PerVariant::Aligned);
        input.get_few_bits(3).unwrap();
        assert_eq!(input.get_align().unwrap(), 5);
        assert_eq!(input.get_align().unwrap(), 0);
        assert_eq!(input.bits_moved(), 8);
        assert_eq!(input.get_few_bits(8).unwrap(), 0xFF);
    }

    #[test]
    fn test_unaligned_is_noop() {
        let mut output = BitOutput::new(Vec::new(), PerVariant::Unaligned);
        output.put_few_bits(1, 1).unwrap();
        assert_eq!(output.put_align().unwrap(), 0);
        assert_eq!(output.bits_written(), 1);

        let mut input = BitInput::new(vec![0xFF], PerVariant::Unaligned);
        input.get_few_bits(1).unwrap();
        assert_eq!(input.get_align().unwrap(), 0);
        assert_eq!(input.bits_moved(), 1);
    }

    #[test]
    fn test_align_across_flush() {
        let mut output = BitOutput::new(Vec::new(), PerVariant::Aligned);
        for _ in 0..32 {
            output.put_few_bits(0, 8).unwrap();
        }
        output.put_few_bits(1, 1).unwrap();
        assert_eq!(output.put_align().unwrap(), 7);
        output.finish().unwrap();
        assert_eq!(output.into_sink().len(), 33);
    }

    #[test]
    fn test_get_align_needs_padding_bits() {
        let mut input = BitInput::new(vec![0xFF], PerVariant::Aligned).with_bit_count(4);
        input.get_few_bits(2).unwrap();
        assert!(input.get_align().is_err());
    }
}
