//! Length determinants (X.691 #11.9)
//!
//! # General rules
//!
//! ```text
//! n < 128          0nnnnnnn
//! n < 16384        10nnnnnn nnnnnnnn
//! fragment         11mmmmmm            m in 1..=4, covers m * 16K units
//! ```
//!
//! A fragment determinant only announces the first `m * 16384` units. The
//! caller writes or reads that many units and then handles another
//! determinant for the rest; [`Length::repeat`] tells it to loop. When the
//! remainder is exactly zero the loop still ends with a zero-length short
//! form.
//!
//! Under aligned PER the general determinant starts on an octet boundary.

use per_core::{PerError, PerResult, PerVariant, RangeConstraint};

use crate::bits::{BitInput, BitOutput, FlushSink, RefillSource};
use crate::whole_number::APER_SMALL_RANGE_MAX;

/// Units covered by one fragment multiplier step
pub const FRAGMENT_UNIT: usize = 16384;

/// Largest fragment multiplier
pub const MAX_FRAGMENT_MULTIPLIER: usize = 4;

/// Widest effective bound encoded as a plain bit-field
pub const MAX_BOUNDED_LENGTH_BITS: u32 = 16;

const SHORT_FORM_LIMIT: usize = 128;

/// Sizes below this upper bound use a constrained count instead of a determinant
const CONSTRAINED_SIZE_LIMIT: i64 = 65536;

/// One decoded or encoded length determinant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Length {
    /// Units covered by this determinant
    pub value: usize,
    /// A fragment: another determinant follows the units
    pub repeat: bool,
}

impl Length {
    pub fn complete(value: usize) -> Self {
        Self { value, repeat: false }
    }

    pub fn fragment(value: usize) -> Self {
        Self { value, repeat: true }
    }
}

/// Bound of a constrained length determinant
///
/// Unaligned PER writes the count as a bit-field of `effective_bits` when
/// that is at most 16 bits. Aligned PER picks the form from `range`, the
/// number of values the count can take: a bit-field up to 255, one aligned
/// octet for 256, two aligned octets up to 64K. Wider bounds fall back to
/// the general determinant in both variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthBound {
    pub effective_bits: u32,
    pub range: u64,
}

impl LengthBound {
    pub fn new(effective_bits: u32, range: u64) -> Self {
        Self {
            effective_bits,
            range,
        }
    }

    /// Bound covering every value of an `effective_bits`-wide field
    pub fn bits(effective_bits: u32) -> Self {
        let range = 1u64.checked_shl(effective_bits).unwrap_or(u64::MAX);
        Self::new(effective_bits, range)
    }

    /// Bound of a fully constrained size, `None` otherwise
    ///
    /// The determinant carries the offset from `lower_bound`; the caller
    /// subtracts and adds it back.
    pub fn from_constraint(size: &RangeConstraint) -> Option<Self> {
        let range = size.range()?;
        Some(Self::new(size.effective_bits, range))
    }
}

enum BoundedForm {
    BitField(u32),
    Aligned(u64),
    General,
}

fn bounded_form(variant: PerVariant, bound: Option<LengthBound>) -> BoundedForm {
    match bound {
        Some(b) if variant.is_aligned() && b.range <= APER_SMALL_RANGE_MAX => {
            BoundedForm::Aligned(b.range)
        }
        Some(b) if !variant.is_aligned() && b.effective_bits <= MAX_BOUNDED_LENGTH_BITS => {
            BoundedForm::BitField(b.effective_bits)
        }
        _ => BoundedForm::General,
    }
}

fn size_bounds(size: &RangeConstraint) -> PerResult<Option<(usize, usize)>> {
    if !size.is_constrained() || size.upper_bound >= CONSTRAINED_SIZE_LIMIT {
        return Ok(None);
    }
    if size.lower_bound < 0 || size.upper_bound < size.lower_bound {
        return Err(PerError::ContractViolation(format!(
            "Invalid size constraint {}..={}",
            size.lower_bound, size.upper_bound
        )));
    }
    Ok(Some((size.lower_bound as usize, size.upper_bound as usize)))
}

impl<R: RefillSource> BitInput<R> {
    /// Read a length determinant
    ///
    /// A narrow enough [`LengthBound`] reads the count in its constrained
    /// form; otherwise the general determinant is read.
    pub fn get_length(&mut self, bound: Option<LengthBound>) -> PerResult<Length> {
        match bounded_form(self.variant(), bound) {
            BoundedForm::BitField(bits) => Ok(Length::complete(self.get_few_bits(bits)? as usize)),
            BoundedForm::Aligned(range) => {
                let value = self.get_aligned_small_range(range)?;
                if value >= range {
                    return Err(PerError::Malformed(format!(
                        "Length {} outside a range of {} values",
                        value, range
                    )));
                }
                Ok(Length::complete(value as usize))
            }
            BoundedForm::General => self.get_general_length(),
        }
    }

    /// Read the element count of a size-constrained SET OF / SEQUENCE OF
    ///
    /// A size constraint with `ub < 64K` is read as a constrained whole
    /// number (nothing at all when `lb == ub`). Under unaligned PER the
    /// effective width is used, under aligned PER the aligned whole-number
    /// forms. Anything else falls back to the general determinant.
    pub fn get_length_set_of(&mut self, size: &RangeConstraint) -> PerResult<Length> {
        let Some((lb, ub)) = size_bounds(size)? else {
            return self.get_general_length();
        };
        if lb == ub {
            return Ok(Length::complete(lb));
        }
        let value = if self.variant().is_aligned() {
            self.get_constrained_whole_number(size)? as usize
        } else {
            lb + self.get_whole_number_u(size.effective_bits)? as usize
        };
        if value > ub {
            return Err(PerError::Malformed(format!(
                "Count {} above the size bound {}",
                value, ub
            )));
        }
        Ok(Length::complete(value))
    }

    /// Read a length-prefixed octet string, following fragments
    pub fn get_octets(&mut self) -> PerResult<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            let length = self.get_length(None)?;
            let start = out.len();
            out.resize(start + length.value, 0);
            self.get_many_bits(&mut out[start..], false, length.value * 8)?;
            if !length.repeat {
                return Ok(out);
            }
        }
    }

    fn get_general_length(&mut self) -> PerResult<Length> {
        self.get_align()?;
        let first = self.peek_few_bits(8)? as usize;
        if first & 0x80 == 0 {
            self.get_few_bits(8)?;
            return Ok(Length::complete(first));
        }
        if first & 0x40 == 0 {
            let both = self.get_few_bits(16)? as usize;
            return Ok(Length::complete(both & 0x3FFF));
        }

        let multiplier = first & 0x3F;
        if !(1..=MAX_FRAGMENT_MULTIPLIER).contains(&multiplier) {
            log::warn!("Prohibited fragment multiplier {} in length determinant", multiplier);
            return Err(PerError::Malformed(format!(
                "Fragment multiplier {} outside 1..=4",
                multiplier
            )));
        }
        self.get_few_bits(8)?;
        log::debug!("Read fragment determinant: {} x 16K units", multiplier);
        Ok(Length::fragment(multiplier * FRAGMENT_UNIT))
    }
}

impl<S: FlushSink> BitOutput<S> {
    /// Write a length determinant for `length` units
    ///
    /// Returns how many units the determinant covers. When `repeat` is set
    /// the caller writes that many units and calls again with the rest.
    pub fn put_length(&mut self, length: usize, bound: Option<LengthBound>) -> PerResult<Length> {
        match bounded_form(self.variant(), bound) {
            BoundedForm::BitField(bits) => {
                if length >> bits != 0 {
                    return Err(PerError::ContractViolation(format!(
                        "Length {} does not fit in {} bits",
                        length, bits
                    )));
                }
                self.put_few_bits(length as u32, bits)?;
            }
            BoundedForm::Aligned(range) => {
                if length as u64 >= range {
                    return Err(PerError::ContractViolation(format!(
                        "Length {} outside a range of {} values",
                        length, range
                    )));
                }
                self.put_aligned_small_range(length as u64, range)?;
            }
            BoundedForm::General => return self.put_general_length(length),
        }
        Ok(Length::complete(length))
    }

    /// Write the element count of a size-constrained SET OF / SEQUENCE OF
    pub fn put_length_set_of(&mut self, size: &RangeConstraint, length: usize) -> PerResult<Length> {
        let Some((lb, ub)) = size_bounds(size)? else {
            return self.put_general_length(length);
        };
        if length < lb || length > ub {
            return Err(PerError::ContractViolation(format!(
                "Count {} outside the size constraint {}..={}",
                length, lb, ub
            )));
        }
        if lb == ub {
            return Ok(Length::complete(length));
        }
        if self.variant().is_aligned() {
            self.put_constrained_whole_number(size, length as i64)?;
        } else {
            self.put_whole_number_u((length - lb) as u64, size.effective_bits)?;
        }
        Ok(Length::complete(length))
    }

    /// Write a length-prefixed octet string, fragmenting as needed
    pub fn put_octets(&mut self, data: &[u8]) -> PerResult<()> {
        let mut rest = data;
        loop {
            let length = self.put_length(rest.len(), None)?;
            let (head, tail) = rest.split_at(length.value);
            self.put_many_bits(head, head.len() * 8)?;
            rest = tail;
            if !length.repeat {
                return Ok(());
            }
        }
    }

    fn put_general_length(&mut self, length: usize) -> PerResult<Length> {
        self.put_align()?;
        if length < SHORT_FORM_LIMIT {
            self.put_few_bits(length as u32, 8)?;
            return Ok(Length::complete(length));
        }
        if length < FRAGMENT_UNIT {
            self.put_few_bits(0x8000 | length as u32, 16)?;
            return Ok(Length::complete(length));
        }

        let multiplier = (length / FRAGMENT_UNIT).min(MAX_FRAGMENT_MULTIPLIER);
        self.put_few_bits(0xC0 | multiplier as u32, 8)?;
        log::debug!(
            "Wrote fragment determinant: {} x 16K of {} units",
            multiplier,
            length
        );
        Ok(Length::fragment(multiplier * FRAGMENT_UNIT))
    }
}
