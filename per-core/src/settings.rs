//! Codec settings

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PerError;

/// Default number of bytes a reader-backed source pulls per refill
pub const DEFAULT_REFILL_CHUNK_SIZE: usize = 4096;

/// PER variant
///
/// Aligned PER pads to octet boundaries at the points X.691 defines;
/// Unaligned PER never pads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PerVariant {
    #[default]
    Unaligned,
    Aligned,
}

impl PerVariant {
    pub fn is_aligned(self) -> bool {
        self == PerVariant::Aligned
    }
}

impl fmt::Display for PerVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerVariant::Unaligned => write!(f, "uper"),
            PerVariant::Aligned => write!(f, "aper"),
        }
    }
}

impl FromStr for PerVariant {
    type Err = PerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uper" | "unaligned" => Ok(PerVariant::Unaligned),
            "aper" | "aligned" => Ok(PerVariant::Aligned),
            other => Err(PerError::ContractViolation(format!(
                "Unknown PER variant: {}",
                other
            ))),
        }
    }
}

/// PER codec settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerSettings {
    pub variant: PerVariant,
    pub refill_chunk_size: usize,
}

impl PerSettings {
    /// Create new settings for the given variant
    pub fn new(variant: PerVariant) -> Self {
        Self {
            variant,
            refill_chunk_size: DEFAULT_REFILL_CHUNK_SIZE,
        }
    }

    /// Create settings with a custom refill chunk size
    pub fn with_refill_chunk_size(variant: PerVariant, refill_chunk_size: usize) -> Self {
        Self {
            variant,
            refill_chunk_size: refill_chunk_size.max(1),
        }
    }

    pub fn unaligned() -> Self {
        Self::new(PerVariant::Unaligned)
    }

    pub fn aligned() -> Self {
        Self::new(PerVariant::Aligned)
    }
}

impl Default for PerSettings {
    fn default() -> Self {
        Self::unaligned()
    }
}
