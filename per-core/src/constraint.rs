//! Pre-computed PER constraints
//!
//! A schema compiler turns every PER-visible value or size constraint into a
//! [`RangeConstraint`]. Descriptors are immutable and are shared by reference
//! across all encode/decode calls for a given type, so they are plain `Copy`
//! data that can live in a `static`.
//!
//! # Bit widths
//!
//! For a fully constrained range `[lb, ub]` the range width is
//! `ceil(log2(ub - lb + 1))` bits. The effective width may be smaller when a
//! size constraint is known to never need the full range (for example a
//! `SIZE(0..65535)` constraint whose effective bound is only ever 16 bits).

use serde::{Deserialize, Serialize};
use std::fmt;

/// How much of the range is visible to PER
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// No PER-visible constraint
    Unconstrained,
    /// Constrained at the lower bound only
    SemiConstrained,
    /// Both bounds known
    Constrained,
}

/// A value or size constraint with its pre-computed bit widths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeConstraint {
    pub kind: ConstraintKind,
    /// The root may be extended (`...` in the ASN.1 constraint)
    pub extensible: bool,
    /// Full number of bits in the range
    pub range_bits: u32,
    /// Effective bits, never more than `range_bits`
    pub effective_bits: u32,
    pub lower_bound: i64,
    pub upper_bound: i64,
}

impl RangeConstraint {
    /// No PER-visible constraint; bounds are unused
    pub const fn unconstrained() -> Self {
        Self {
            kind: ConstraintKind::Unconstrained,
            extensible: false,
            range_bits: 0,
            effective_bits: 0,
            lower_bound: 0,
            upper_bound: 0,
        }
    }

    /// Constrained at `lb` with no upper bound
    pub const fn semi_constrained(lb: i64) -> Self {
        Self {
            kind: ConstraintKind::SemiConstrained,
            extensible: false,
            range_bits: 0,
            effective_bits: 0,
            lower_bound: lb,
            upper_bound: i64::MAX,
        }
    }

    /// Fully constrained to `[lb, ub]`
    ///
    /// Computes `range_bits = ceil(log2(ub - lb + 1))`; the effective width
    /// starts out equal to it. A range holding a single value needs 0 bits.
    pub const fn constrained(lb: i64, ub: i64) -> Self {
        let bits = Self::bits_for_span(lb, ub);
        Self {
            kind: ConstraintKind::Constrained,
            extensible: false,
            range_bits: bits,
            effective_bits: bits,
            lower_bound: lb,
            upper_bound: ub,
        }
    }

    /// Mark the root as extensible
    pub const fn extensible(mut self) -> Self {
        self.extensible = true;
        self
    }

    /// Override the effective width, clamped to the range width
    pub const fn with_effective_bits(mut self, bits: u32) -> Self {
        self.effective_bits = if bits < self.range_bits {
            bits
        } else {
            self.range_bits
        };
        self
    }

    const fn bits_for_span(lb: i64, ub: i64) -> u32 {
        if ub <= lb {
            return 0;
        }
        let span = (ub as i128 - lb as i128) as u128;
        128 - span.leading_zeros()
    }

    /// Both bounds are PER-visible
    pub fn is_constrained(&self) -> bool {
        self.kind == ConstraintKind::Constrained
    }

    /// Number of values in the range, `None` unless fully constrained
    /// or when the count does not fit in a `u64`
    pub fn range(&self) -> Option<u64> {
        if !self.is_constrained() || self.upper_bound < self.lower_bound {
            return None;
        }
        let span = self.upper_bound as i128 - self.lower_bound as i128 + 1;
        u64::try_from(span).ok()
    }

    /// Whether `value` lies within the PER-visible bounds
    pub fn contains(&self, value: i64) -> bool {
        match self.kind {
            ConstraintKind::Unconstrained => true,
            ConstraintKind::SemiConstrained => value >= self.lower_bound,
            ConstraintKind::Constrained => {
                value >= self.lower_bound && value <= self.upper_bound
            }
        }
    }

    /// Offset of `value` from the lower bound
    ///
    /// Returns `None` when the value is outside the bounds or the
    /// constraint has no lower bound.
    pub fn rebase(&self, value: i64) -> Option<u64> {
        if self.kind == ConstraintKind::Unconstrained || !self.contains(value) {
            return None;
        }
        u64::try_from(value as i128 - self.lower_bound as i128).ok()
    }

    /// Inverse of [`rebase`](Self::rebase)
    pub fn unrebase(&self, raw: u64) -> Option<i64> {
        if self.kind == ConstraintKind::Unconstrained {
            return None;
        }
        let value = i64::try_from(self.lower_bound as i128 + raw as i128).ok()?;
        self.contains(value).then_some(value)
    }
}

impl Default for RangeConstraint {
    fn default() -> Self {
        Self::unconstrained()
    }
}

/// Remapping between enumeration values and their PER codes
///
/// Generated code implements this for ENUMERATED types whose values are not
/// a dense `0..n` sequence.
pub trait CodeMapping: Send + Sync {
    fn value_to_code(&self, value: u32) -> Option<u32>;
    fn code_to_value(&self, code: u32) -> Option<u32>;
}

/// The value and size constraints of one ASN.1 type
#[derive(Clone, Copy, Default)]
pub struct PerConstraints {
    pub value: RangeConstraint,
    pub size: RangeConstraint,
    pub code_map: Option<&'static dyn CodeMapping>,
}

impl PerConstraints {
    pub const fn new(value: RangeConstraint, size: RangeConstraint) -> Self {
        Self {
            value,
            size,
            code_map: None,
        }
    }

    pub const fn with_code_map(mut self, map: &'static dyn CodeMapping) -> Self {
        self.code_map = Some(map);
        self
    }

    /// Map a value to its code; identity without a mapping
    pub fn encode_code(&self, value: u32) -> Option<u32> {
        match self.code_map {
            Some(map) => map.value_to_code(value),
            None => Some(value),
        }
    }

    /// Map a code back to its value; identity without a mapping
    pub fn decode_code(&self, code: u32) -> Option<u32> {
        match self.code_map {
            Some(map) => map.code_to_value(code),
            None => Some(code),
        }
    }
}

impl fmt::Debug for PerConstraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerConstraints")
            .field("value", &self.value)
            .field("size", &self.size)
            .field("code_map", &self.code_map.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sparse;

    impl CodeMapping for Sparse {
        fn value_to_code(&self, value: u32) -> Option<u32> {
            match value {
                10 => Some(0),
                20 => Some(1),
                40 => Some(2),
                _ => None,
            }
        }

        fn code_to_value(&self, code: u32) -> Option<u32> {
            [10, 20, 40].get(code as usize).copied()
        }
    }

    static SPARSE: Sparse = Sparse;

    #[test]
    fn test_range_bits() {
        assert_eq!(RangeConstraint::constrained(0, 255).range_bits, 8);
        assert_eq!(RangeConstraint::constrained(0, 256).range_bits, 9);
        assert_eq!(RangeConstraint::constrained(-1, 1).range_bits, 2);
        assert_eq!(RangeConstraint::constrained(7, 7).range_bits, 0);
        assert_eq!(RangeConstraint::constrained(i64::MIN, i64::MAX).range_bits, 64);
    }

    #[test]
    fn test_effective_bits_clamped() {
        let c = RangeConstraint::constrained(0, 65535).with_effective_bits(20);
        assert_eq!(c.effective_bits, 16);
        let c = RangeConstraint::constrained(0, 65535).with_effective_bits(4);
        assert_eq!(c.effective_bits, 4);
    }

    #[test]
    fn test_range() {
        assert_eq!(RangeConstraint::constrained(-5, 5).range(), Some(11));
        assert_eq!(RangeConstraint::constrained(i64::MIN, i64::MAX).range(), None);
        assert_eq!(RangeConstraint::semi_constrained(0).range(), None);
    }

    #[test]
    fn test_rebase() {
        let c = RangeConstraint::constrained(-100, 100);
        assert_eq!(c.rebase(-100), Some(0));
        assert_eq!(c.rebase(5), Some(105));
        assert_eq!(c.rebase(101), None);
        assert_eq!(c.unrebase(105), Some(5));
        assert_eq!(c.unrebase(201), None);

        let semi = RangeConstraint::semi_constrained(-1);
        assert_eq!(semi.rebase(i64::MAX), Some(i64::MAX as u64 + 1));
        assert_eq!(semi.rebase(-2), None);
        assert_eq!(RangeConstraint::unconstrained().rebase(0), None);
    }

    #[test]
    fn test_code_mapping() {
        let plain = PerConstraints::new(RangeConstraint::constrained(0, 2), RangeConstraint::default());
        assert_eq!(plain.encode_code(2), Some(2));

        let mapped = plain.with_code_map(&SPARSE);
        assert_eq!(mapped.encode_code(40), Some(2));
        assert_eq!(mapped.encode_code(30), None);
        assert_eq!(mapped.decode_code(1), Some(20));
        assert!(format!("{:?}", mapped).contains("code_map: true"));
    }
}
