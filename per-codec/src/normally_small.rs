//! Normally small numbers and lengths (X.691 #11.6, #11.9.3.4)
//!
//! A selector bit picks between a 6-bit direct form and an unbounded form:
//!
//! ```text
//! non-negative whole number   0 vvvvvv             v <= 63
//!                             1 <length> <octets>  otherwise
//! length                      0 llllll             1 <= n <= 64, stores n - 1
//!                             1 <length det>       otherwise
//! ```
//!
//! Extension bitmaps and extension-addition indexes use these.

use per_core::{PerError, PerResult};

use crate::bits::{BitInput, BitOutput, FlushSink, RefillSource};
use crate::length::Length;
use crate::whole_number::{octets_to_unsigned, unsigned_octets};

/// Largest value held by the direct form of a normally small number
pub const NORMALLY_SMALL_MAX: u64 = 63;

/// Largest length held by the direct form of a normally small length
pub const NORMALLY_SMALL_LENGTH_MAX: usize = 64;

impl<R: RefillSource> BitInput<R> {
    /// Read a normally small non-negative whole number
    pub fn get_nsnnwn(&mut self) -> PerResult<u64> {
        if self.peek_few_bits(1)? == 0 {
            return Ok(self.get_few_bits(7)? as u64);
        }
        self.get_few_bits(1)?;
        let octets = self.get_octets()?;
        octets_to_unsigned(&octets)
    }

    /// Read a normally small length
    ///
    /// The long form returns the general determinant as read; a fragment
    /// sets `repeat` and the caller continues with [`get_length`](Self::get_length).
    pub fn get_nslength(&mut self) -> PerResult<Length> {
        if self.peek_few_bits(1)? == 0 {
            let n = self.get_few_bits(7)? as usize;
            return Ok(Length::complete(n + 1));
        }
        self.get_few_bits(1)?;
        self.get_length(None)
    }
}

impl<S: FlushSink> BitOutput<S> {
    /// Write a normally small non-negative whole number
    pub fn put_nsnnwn(&mut self, value: u64) -> PerResult<()> {
        if value <= NORMALLY_SMALL_MAX {
            return self.put_few_bits(value as u32, 7);
        }
        self.put_few_bits(1, 1)?;
        self.put_octets(&unsigned_octets(value))
    }

    /// Write a normally small length, which must not be zero
    ///
    /// Returns the units covered; on a fragment the caller continues with
    /// [`put_length`](Self::put_length) for the rest.
    pub fn put_nslength(&mut self, length: usize) -> PerResult<Length> {
        if length == 0 {
            return Err(PerError::ContractViolation(
                "Normally small length cannot be zero".to_string(),
            ));
        }
        if length <= NORMALLY_SMALL_LENGTH_MAX {
            self.put_few_bits((length - 1) as u32, 7)?;
            return Ok(Length::complete(length));
        }
        self.put_few_bits(1, 1)?;
        self.put_length(length, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use per_core::PerVariant;

    fn encode_nsnnwn(variant: PerVariant, value: u64) -> Vec<u8> {
        let mut output = BitOutput::new(Vec::new(), variant);
        output.put_nsnnwn(value).unwrap();
        output.finish().unwrap();
        output.into_sink()
    }

    #[test]
    fn test_nsnnwn_boundary() {
        let bytes = encode_nsnnwn(PerVariant::Unaligned, 63);
        assert_eq!(bytes, vec![0b0111_1110]);
        let mut input = BitInput::new(bytes, PerVariant::Unaligned);
        assert_eq!(input.get_nsnnwn().unwrap(), 63);

        // 1, length 1, octet 64
        let bytes = encode_nsnnwn(PerVariant::Unaligned, 64);
        assert_eq!(bytes, vec![0b1000_0000, 0b1010_0000, 0b0000_0000]);
        let mut input = BitInput::new(bytes, PerVariant::Unaligned);
        assert_eq!(input.get_nsnnwn().unwrap(), 64);
    }

    #[test]
    fn test_nsnnwn_aligned_large() {
        // 1, pad to octet, length 2, 0x01 0x00
        let bytes = encode_nsnnwn(PerVariant::Aligned, 256);
        assert_eq!(bytes, vec![0x80, 0x02, 0x01, 0x00]);
        let mut input = BitInput::new(bytes, PerVariant::Aligned);
        assert_eq!(input.get_nsnnwn().unwrap(), 256);
    }

    #[test]
    fn test_nsnnwn_round_trip() {
        for variant in [PerVariant::Unaligned, PerVariant::Aligned] {
            let values = [0u64, 1, 62, 63, 64, 255, 256, 65535, 1 << 40, u64::MAX];
            let mut output = BitOutput::new(Vec::new(), variant);
            for &v in &values {
                output.put_nsnnwn(v).unwrap();
            }
            output.finish().unwrap();
            let mut input = BitInput::new(output.into_sink(), variant);
            for &v in &values {
                assert_eq!(input.get_nsnnwn().unwrap(), v);
            }
        }
    }

    #[test]
    fn test_nsnnwn_oversized_content() {
        let mut output = BitOutput::new(Vec::new(), PerVariant::Unaligned);
        output.put_few_bits(1, 1).unwrap();
        output.put_octets(&[1; 9]).unwrap();
        output.finish().unwrap();
        let mut input = BitInput::new(output.into_sink(), PerVariant::Unaligned);
        assert!(matches!(input.get_nsnnwn(), Err(PerError::Malformed(_))));
    }

    #[test]
    fn test_nslength() {
        let mut output = BitOutput::new(Vec::new(), PerVariant::Unaligned);
        assert!(output.put_nslength(0).is_err());
        assert_eq!(output.put_nslength(1).unwrap(), Length::complete(1));
        assert_eq!(output.put_nslength(64).unwrap(), Length::complete(64));
        assert_eq!(output.put_nslength(65).unwrap(), Length::complete(65));
        output.finish().unwrap();
        let bytes = output.into_sink();
        // 0000000 0111111 1 01000001
        assert_eq!(bytes, vec![0b0000_0000, 0b1111_1110, 0b1000_0010]);

        let mut input = BitInput::new(bytes, PerVariant::Unaligned);
        assert_eq!(input.get_nslength().unwrap(), Length::complete(1));
        assert_eq!(input.get_nslength().unwrap(), Length::complete(64));
        assert_eq!(input.get_nslength().unwrap(), Length::complete(65));
    }

    #[test]
    fn test_nslength_fragment() {
        let mut output = BitOutput::new(Vec::new(), PerVariant::Aligned);
        let first = output.put_nslength(20000).unwrap();
        assert_eq!(first, Length::fragment(16384));
        output.put_length(20000 - first.value, None).unwrap();
        output.finish().unwrap();

        let mut input = BitInput::new(output.into_sink(), PerVariant::Aligned);
        let first = input.get_nslength().unwrap();
        assert!(first.repeat);
        let rest = input.get_length(None).unwrap();
        assert_eq!(first.value + rest.value, 20000);
    }
}
