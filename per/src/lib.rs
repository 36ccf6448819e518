//! per - Rust implementation of ASN.1 Packed Encoding Rules (ITU-T X.691)
//!
//! This library provides the bit-level engine a schema-driven ASN.1 runtime
//! calls to produce and consume Unaligned and Aligned PER.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `per-core`: Error handling, constraint descriptors, settings
//! - `per-codec`: Bit cursors and the PER codecs built on them
//!
//! # Usage
//!
//! ```rust
//! use per::{decode_from_slice, encode_to_vec, PerSettings, RangeConstraint};
//!
//! let settings = PerSettings::aligned();
//! let c = RangeConstraint::constrained(0, 255);
//! let bytes = encode_to_vec(&settings, |out| out.put_constrained_whole_number(&c, 5))?;
//! assert_eq!(bytes, vec![0x05]);
//! let value = decode_from_slice(&bytes, &settings, |input| input.get_constrained_whole_number(&c))?;
//! assert_eq!(value, 5);
//! # Ok::<(), per::PerError>(())
//! ```

use bytes::Bytes;

// Re-export core types
pub use per_core::{
    CodeMapping, ConstraintKind, PerConstraints, PerError, PerResult, PerSettings, PerVariant,
    RangeConstraint,
};

// Re-export the codec
pub use per_codec::{
    BitInput, BitOutput, ChunkedSource, FlushSink, Length, LengthBound, NoRefill, ReaderSource,
    Refill, RefillSource, WriterSink, FRAGMENT_UNIT, MAX_FEW_BITS, STAGING_CAPACITY,
};

pub mod codec {
    pub use per_codec::*;
}

/// Run `encode` against a fresh output cursor and return the complete encoding
///
/// An encoding that produced no bits is replaced by a single zero octet
/// (X.691 #10.1.3).
pub fn encode_to_vec<F>(settings: &PerSettings, encode: F) -> PerResult<Vec<u8>>
where
    F: FnOnce(&mut BitOutput<Vec<u8>>) -> PerResult<()>,
{
    let mut output = BitOutput::new(Vec::new(), settings.variant);
    encode(&mut output)?;
    if output.bits_written() == 0 {
        output.put_few_bits(0, 8)?;
    }
    output.finish()?;
    Ok(output.into_sink())
}

/// Run `decode` against a cursor over a complete buffer
pub fn decode_from_slice<T, F>(data: &[u8], settings: &PerSettings, decode: F) -> PerResult<T>
where
    F: FnOnce(&mut BitInput<NoRefill>) -> PerResult<T>,
{
    let mut input = BitInput::new(Bytes::copy_from_slice(data), settings.variant);
    decode(&mut input)
}
