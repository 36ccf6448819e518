//! INTEGER and ENUMERATED values driven by a constraint descriptor
//!
//! - extensible root: one bit, `1` when the value lies outside the root
//!   and is then written in the unconstrained form
//! - constrained: constrained whole number
//! - semi-constrained: length determinant + minimal octets of `value - lb`
//! - unconstrained: length determinant + minimal two's-complement octets
//!
//! ENUMERATED values go through the optional code mapping first; extension
//! additions are written as a normally small index past the root.

use per_core::{ConstraintKind, PerConstraints, PerError, PerResult, RangeConstraint};

use crate::bits::{BitInput, BitOutput, FlushSink, RefillSource};
use crate::whole_number::{octets_to_signed, octets_to_unsigned, signed_octets, unsigned_octets};

fn enumerated_root(constraints: &PerConstraints) -> PerResult<&RangeConstraint> {
    let root = &constraints.value;
    if !root.is_constrained() {
        return Err(PerError::ContractViolation(
            "ENUMERATED root must be fully constrained".to_string(),
        ));
    }
    Ok(root)
}

impl<R: RefillSource> BitInput<R> {
    /// Read an INTEGER constrained by `c`
    pub fn get_integer(&mut self, c: &RangeConstraint) -> PerResult<i64> {
        if c.extensible && self.get_few_bits(1)? == 1 {
            return octets_to_signed(&self.get_octets()?);
        }
        match c.kind {
            ConstraintKind::Constrained => self.get_constrained_whole_number(c),
            ConstraintKind::SemiConstrained => {
                let raw = octets_to_unsigned(&self.get_octets()?)?;
                c.unrebase(raw).ok_or_else(|| {
                    PerError::Malformed(format!(
                        "Offset {} from {} overflows a 64-bit integer",
                        raw, c.lower_bound
                    ))
                })
            }
            ConstraintKind::Unconstrained => octets_to_signed(&self.get_octets()?),
        }
    }

    /// Read an ENUMERATED value, mapping its code back through the constraints
    pub fn get_enumerated(&mut self, constraints: &PerConstraints) -> PerResult<u32> {
        let root = enumerated_root(constraints)?;
        let code = if root.extensible && self.get_few_bits(1)? == 1 {
            let index = self.get_nsnnwn()?;
            (root.upper_bound as i128 + 1 + index as i128) as u128
        } else {
            self.get_constrained_whole_number(root)? as u128
        };
        u32::try_from(code)
            .ok()
            .and_then(|code| constraints.decode_code(code))
            .ok_or_else(|| PerError::Malformed(format!("Unknown enumeration code {}", code)))
    }
}

impl<S: FlushSink> BitOutput<S> {
    /// Write an INTEGER constrained by `c`
    pub fn put_integer(&mut self, c: &RangeConstraint, value: i64) -> PerResult<()> {
        let in_root = c.contains(value);
        if c.extensible {
            self.put_few_bits(u32::from(!in_root), 1)?;
            if !in_root {
                return self.put_octets(&signed_octets(value));
            }
        } else if !in_root {
            return Err(PerError::ContractViolation(format!(
                "Value {} outside a non-extensible constraint",
                value
            )));
        }
        match c.kind {
            ConstraintKind::Constrained => self.put_constrained_whole_number(c, value),
            ConstraintKind::SemiConstrained => {
                let raw = c.rebase(value).ok_or_else(|| {
                    PerError::ContractViolation(format!("Value {} below {}", value, c.lower_bound))
                })?;
                self.put_octets(&unsigned_octets(raw))
            }
            ConstraintKind::Unconstrained => self.put_octets(&signed_octets(value)),
        }
    }

    /// Write an ENUMERATED value as its mapped code
    pub fn put_enumerated(&mut self, constraints: &PerConstraints, value: u32) -> PerResult<()> {
        let root = enumerated_root(constraints)?;
        let code = constraints.encode_code(value).ok_or_else(|| {
            PerError::ContractViolation(format!("No code for enumeration value {}", value))
        })?;
        let in_root = root.contains(code as i64);
        if root.extensible {
            self.put_few_bits(u32::from(!in_root), 1)?;
            if !in_root {
                let index = u64::try_from(code as i64 - root.upper_bound - 1).map_err(|_| {
                    PerError::ContractViolation(format!("Code {} below the root", code))
                })?;
                return self.put_nsnnwn(index);
            }
        } else if !in_root {
            return Err(PerError::ContractViolation(format!(
                "Code {} outside a non-extensible root",
                code
            )));
        }
        self.put_constrained_whole_number(root, code as i64)
    }
}
