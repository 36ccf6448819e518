//! Constrained whole numbers (X.691 #11.5)
//!
//! A constrained whole number is written as the non-negative offset from the
//! lower bound. Unaligned PER always uses the minimal bit-field of
//! `ceil(log2(ub - lb + 1))` bits. Aligned PER picks the form by range size:
//!
//! | range          | encoding                                           |
//! |----------------|----------------------------------------------------|
//! | 1              | nothing                                            |
//! | 2..=255        | minimal bit-field, no alignment                    |
//! | 256            | one octet, octet-aligned                           |
//! | 257..=65536    | two octets, octet-aligned                          |
//! | larger         | octet count (constrained), then aligned octets     |
//!
//! Widths passed to the raw entry points are trusted: a value that does not
//! fit its width is rejected, but the bounds it was derived from are not
//! re-validated.

use per_core::{PerError, PerResult, PerVariant, RangeConstraint};

use crate::bits::{BitInput, BitOutput, FlushSink, RefillSource, MAX_FEW_BITS};

/// Largest range aligned PER writes without an octet count
pub(crate) const APER_SMALL_RANGE_MAX: u64 = 65536;

/// Number of bits needed to hold `count` distinct values
pub(crate) fn bits_for_count(count: u64) -> u32 {
    if count <= 1 {
        0
    } else {
        64 - (count - 1).leading_zeros()
    }
}

/// Minimal big-endian octets of a non-negative value, at least one
pub(crate) fn unsigned_octets(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let skip = ((value.leading_zeros() / 8) as usize).min(7);
    bytes[skip..].to_vec()
}

/// Minimal two's-complement octets of a signed value, at least one
pub(crate) fn signed_octets(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < 7 {
        let redundant = match bytes[start] {
            0x00 => bytes[start + 1] & 0x80 == 0,
            0xFF => bytes[start + 1] & 0x80 != 0,
            _ => false,
        };
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

pub(crate) fn octets_to_unsigned(octets: &[u8]) -> PerResult<u64> {
    if octets.is_empty() || octets.len() > 8 {
        log::warn!("Integer content of {} octets does not fit 64 bits", octets.len());
        return Err(PerError::Malformed(format!(
            "Integer content of {} octets",
            octets.len()
        )));
    }
    Ok(octets.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
}

pub(crate) fn octets_to_signed(octets: &[u8]) -> PerResult<i64> {
    let raw = octets_to_unsigned(octets)?;
    let shift = 64 - 8 * octets.len() as u32;
    if shift == 0 {
        return Ok(raw as i64);
    }
    Ok(((raw << shift) as i64) >> shift)
}

impl<R: RefillSource> BitInput<R> {
    /// Read an `nbits`-wide (at most 64) unsigned offset
    pub fn get_whole_number_u(&mut self, nbits: u32) -> PerResult<u64> {
        if nbits > 64 {
            return Err(PerError::ContractViolation(format!(
                "Whole number width {} exceeds 64 bits",
                nbits
            )));
        }
        self.ensure(nbits as usize)?;
        let mut value = 0u64;
        let mut left = nbits;
        while left > 0 {
            let take = left.min(MAX_FEW_BITS);
            value = (value << take) | self.get_few_bits(take)? as u64;
            left -= take;
        }
        Ok(value)
    }

    /// Read an `nbits`-wide offset and add it to `lb`
    pub fn get_whole_number(&mut self, lb: i64, nbits: u32) -> PerResult<i64> {
        let raw = self.get_whole_number_u(nbits)?;
        Ok(lb.wrapping_add(raw as i64))
    }

    /// Read a value constrained to `[lower_bound, upper_bound]` of `c`
    pub fn get_constrained_whole_number(&mut self, c: &RangeConstraint) -> PerResult<i64> {
        if !c.is_constrained() {
            return Err(PerError::ContractViolation(
                "Constrained whole number needs both bounds".to_string(),
            ));
        }
        let raw = match self.variant() {
            PerVariant::Unaligned => self.get_whole_number_u(c.range_bits)?,
            PerVariant::Aligned => self.get_aligned_offset(c)?,
        };
        c.unrebase(raw).ok_or_else(|| {
            PerError::Malformed(format!(
                "Offset {} above the range {}..={}",
                raw, c.lower_bound, c.upper_bound
            ))
        })
    }

    /// Read an offset within a range of at most 64K values, aligned PER forms
    pub(crate) fn get_aligned_small_range(&mut self, range: u64) -> PerResult<u64> {
        match range {
            0..=255 => self.get_whole_number_u(bits_for_count(range)),
            256 => {
                self.get_align()?;
                self.get_whole_number_u(8)
            }
            _ => {
                self.get_align()?;
                self.get_whole_number_u(16)
            }
        }
    }

    fn get_aligned_offset(&mut self, c: &RangeConstraint) -> PerResult<u64> {
        match c.range() {
            Some(range) if range <= APER_SMALL_RANGE_MAX => self.get_aligned_small_range(range),
            _ => {
                let max_octets = c.range_bits.div_ceil(8) as u64;
                let len = self.get_whole_number_u(bits_for_count(max_octets))? + 1;
                if len > max_octets {
                    return Err(PerError::Malformed(format!(
                        "Whole number of {} octets exceeds {}",
                        len, max_octets
                    )));
                }
                self.get_align()?;
                self.get_whole_number_u(8 * len as u32)
            }
        }
    }
}

impl<S: FlushSink> BitOutput<S> {
    /// Write `raw` as an `nbits`-wide (at most 64) unsigned offset
    pub fn put_whole_number_u(&mut self, raw: u64, nbits: u32) -> PerResult<()> {
        if nbits > 64 || (nbits < 64 && raw >> nbits != 0) {
            return Err(PerError::ContractViolation(format!(
                "Value {} does not fit in {} bits",
                raw, nbits
            )));
        }
        let mut left = nbits;
        while left > 0 {
            let take = left.min(MAX_FEW_BITS);
            let chunk = (raw >> (left - take)) & ((1u64 << take) - 1);
            self.put_few_bits(chunk as u32, take)?;
            left -= take;
        }
        Ok(())
    }

    /// Write `value - lb` in `nbits` bits
    pub fn put_whole_number(&mut self, value: i64, lb: i64, nbits: u32) -> PerResult<()> {
        self.put_whole_number_u(value.wrapping_sub(lb) as u64, nbits)
    }

    /// Write a value constrained to `[lower_bound, upper_bound]` of `c`
    pub fn put_constrained_whole_number(&mut self, c: &RangeConstraint, value: i64) -> PerResult<()> {
        if !c.is_constrained() {
            return Err(PerError::ContractViolation(
                "Constrained whole number needs both bounds".to_string(),
            ));
        }
        let raw = c.rebase(value).ok_or_else(|| {
            PerError::ContractViolation(format!(
                "Value {} outside {}..={}",
                value, c.lower_bound, c.upper_bound
            ))
        })?;
        match self.variant() {
            PerVariant::Unaligned => self.put_whole_number_u(raw, c.range_bits),
            PerVariant::Aligned => self.put_aligned_offset(c, raw),
        }
    }

    /// Write an offset within a range of at most 64K values, aligned PER forms
    pub(crate) fn put_aligned_small_range(&mut self, raw: u64, range: u64) -> PerResult<()> {
        match range {
            0..=255 => self.put_whole_number_u(raw, bits_for_count(range)),
            256 => {
                self.put_align()?;
                self.put_whole_number_u(raw, 8)
            }
            _ => {
                self.put_align()?;
                self.put_whole_number_u(raw, 16)
            }
        }
    }

    fn put_aligned_offset(&mut self, c: &RangeConstraint, raw: u64) -> PerResult<()> {
        match c.range() {
            Some(range) if range <= APER_SMALL_RANGE_MAX => self.put_aligned_small_range(raw, range),
            _ => {
                let max_octets = c.range_bits.div_ceil(8) as u64;
                let octets = unsigned_octets(raw);
                self.put_whole_number_u(octets.len() as u64 - 1, bits_for_count(max_octets))?;
                self.put_align()?;
                self.put_many_bits(&octets, octets.len() * 8)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn encode<F>(variant: PerVariant, f: F) -> Vec<u8>
    where
        F: FnOnce(&mut BitOutput<Vec<u8>>) -> PerResult<()>,
    {
        let mut output = BitOutput::new(Vec::new(), variant);
        f(&mut output).unwrap();
        output.finish().unwrap();
        output.into_sink()
    }

    #[test]
    fn test_octet_helpers() {
        assert_eq!(unsigned_octets(0), vec![0]);
        assert_eq!(unsigned_octets(0x1234), vec![0x12, 0x34]);
        assert_eq!(unsigned_octets(u64::MAX).len(), 8);
        assert_eq!(signed_octets(0), vec![0]);
        assert_eq!(signed_octets(127), vec![0x7F]);
        assert_eq!(signed_octets(128), vec![0x00, 0x80]);
        assert_eq!(signed_octets(-1), vec![0xFF]);
        assert_eq!(signed_octets(-129), vec![0xFF, 0x7F]);
        assert_eq!(octets_to_signed(&[0xFF, 0x7F]).unwrap(), -129);
        assert_eq!(octets_to_signed(&signed_octets(i64::MIN)).unwrap(), i64::MIN);
        assert!(octets_to_unsigned(&[]).is_err());
        assert!(octets_to_unsigned(&[0; 9]).is_err());
    }

    #[test]
    fn test_byte_range_value() {
        let c = RangeConstraint::constrained(0, 255);
        for variant in [PerVariant::Unaligned, PerVariant::Aligned] {
            let bytes = encode(variant, |o| o.put_constrained_whole_number(&c, 5));
            assert_eq!(bytes, vec![0x05]);
            let mut input = BitInput::new(bytes, variant);
            assert_eq!(input.get_constrained_whole_number(&c).unwrap(), 5);
        }
    }

    #[test]
    fn test_round_trip_fixed_width() {
        let mut rng = StdRng::seed_from_u64(11);
        let ranges = [(0i64, 1i64), (-8, 7), (3, 3), (0, 255), (-1000, 70000), (i64::MIN, i64::MAX)];
        for (lb, ub) in ranges {
            let c = RangeConstraint::constrained(lb, ub);
            let mut values = vec![lb, ub];
            values.extend((0..20).map(|_| rng.gen_range(lb..=ub)));

            let bytes = encode(PerVariant::Unaligned, |o| {
                for &v in &values {
                    o.put_whole_number(v, lb, c.range_bits)?;
                }
                Ok(())
            });
            let mut input = BitInput::new(bytes, PerVariant::Unaligned);
            for &v in &values {
                assert_eq!(input.get_whole_number(lb, c.range_bits).unwrap(), v);
            }
        }
    }

    #[test]
    fn test_width_contract() {
        let mut output = BitOutput::new(Vec::new(), PerVariant::Unaligned);
        assert!(output.put_whole_number_u(8, 3).is_err());
        assert!(output.put_whole_number_u(0, 65).is_err());
        output.put_whole_number_u(u64::MAX, 64).unwrap();
        let c = RangeConstraint::constrained(0, 10);
        assert!(output.put_constrained_whole_number(&c, 11).is_err());
        assert!(output.put_constrained_whole_number(&RangeConstraint::unconstrained(), 1).is_err());
    }

    #[test]
    fn test_unaligned_offset_above_range_is_malformed() {
        let c = RangeConstraint::constrained(0, 4);
        let mut input = BitInput::new(vec![0b1110_0000], PerVariant::Unaligned);
        assert!(matches!(
            input.get_constrained_whole_number(&c),
            Err(PerError::Malformed(_))
        ));
    }

    #[test]
    fn test_aligned_forms() {
        // Small range: bit-field, no padding
        let c = RangeConstraint::constrained(0, 6);
        let bytes = encode(PerVariant::Aligned, |o| {
            o.put_few_bits(1, 1)?;
            o.put_constrained_whole_number(&c, 5)
        });
        assert_eq!(bytes, vec![0b1101_0000]);

        // 256 values: padded to the next octet
        let c = RangeConstraint::constrained(10, 265);
        let bytes = encode(PerVariant::Aligned, |o| {
            o.put_few_bits(1, 1)?;
            o.put_constrained_whole_number(&c, 12)
        });
        assert_eq!(bytes, vec![0x80, 0x02]);

        // Up to 64K values: two aligned octets
        let c = RangeConstraint::constrained(0, 65535);
        let bytes = encode(PerVariant::Aligned, |o| o.put_constrained_whole_number(&c, 0x1234));
        assert_eq!(bytes, vec![0x12, 0x34]);

        // Larger: 2-bit octet count (1..=3), padding, minimal octets
        let c = RangeConstraint::constrained(0, 0xFF_FFFF);
        let bytes = encode(PerVariant::Aligned, |o| o.put_constrained_whole_number(&c, 0x0102));
        assert_eq!(bytes, vec![0b0100_0000, 0x01, 0x02]);
        let mut input = BitInput::new(bytes, PerVariant::Aligned);
        assert_eq!(input.get_constrained_whole_number(&c).unwrap(), 0x0102);
    }

    #[test]
    fn test_aligned_round_trip() {
        let constraints = [
            RangeConstraint::constrained(-3, 3),
            RangeConstraint::constrained(0, 255),
            RangeConstraint::constrained(-40000, 20000),
            RangeConstraint::constrained(0, 1 << 40),
            RangeConstraint::constrained(i64::MIN, i64::MAX),
        ];
        for c in constraints {
            let values = [c.lower_bound, c.upper_bound, c.lower_bound / 2 + c.upper_bound / 2];
            let bytes = encode(PerVariant::Aligned, |o| {
                for &v in &values {
                    o.put_few_bits(1, 1)?;
                    o.put_constrained_whole_number(&c, v)?;
                }
                Ok(())
            });
            let mut input = BitInput::new(bytes, PerVariant::Aligned);
            for &v in &values {
                assert_eq!(input.get_few_bits(1).unwrap(), 1);
                assert_eq!(input.get_constrained_whole_number(&c).unwrap(), v);
            }
        }
    }
}
