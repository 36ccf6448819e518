//! Bit-level Packed Encoding Rules (ITU-T X.691) support
//!
//! This crate provides the primitives a schema-driven PER encoder/decoder
//! calls field by field, for both the Unaligned (UPER) and Aligned (APER)
//! variants:
//!
//! - [`bits`]: streaming bit cursors and the get/put/undo primitives
//! - [`whole_number`]: constrained whole numbers
//! - [`length`]: length determinants, including fragmentation
//! - [`normally_small`]: normally small numbers and lengths
//! - [`align`]: octet alignment
//! - [`integer`]: constraint-driven INTEGER and ENUMERATED values
//!
//! The engine only turns declared bounds into bit patterns and back; it does
//! not know the order in which a type's fields are written.
//!
//! # Usage Example
//!
//! ```rust
//! use per_codec::{BitInput, BitOutput};
//! use per_core::{PerVariant, RangeConstraint};
//!
//! let c = RangeConstraint::constrained(0, 255);
//! let mut output = BitOutput::new(Vec::new(), PerVariant::Unaligned);
//! output.put_constrained_whole_number(&c, 5)?;
//! output.put_length(300, None)?;
//! output.finish()?;
//! let bytes = output.into_sink();
//! assert_eq!(bytes, vec![0x05, 0x81, 0x2C]);
//!
//! let mut input = BitInput::new(bytes, PerVariant::Unaligned);
//! assert_eq!(input.get_constrained_whole_number(&c)?, 5);
//! assert_eq!(input.get_length(None)?.value, 300);
//! # Ok::<(), per_core::PerError>(())
//! ```

pub mod align;
pub mod bits;
pub mod integer;
pub mod length;
pub mod normally_small;
pub mod whole_number;

pub use per_core::{PerError, PerResult};
pub use bits::{
    BitInput, BitOutput, ChunkedSource, FlushSink, NoRefill, ReaderSource, Refill, RefillSource,
    WriterSink, MAX_FEW_BITS, STAGING_CAPACITY,
};
pub use length::{Length, LengthBound, FRAGMENT_UNIT, MAX_FRAGMENT_MULTIPLIER};
