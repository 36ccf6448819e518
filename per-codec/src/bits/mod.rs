//! Bit cursors and bit primitives
//!
//! PER is a bit-oriented encoding: fields are packed most significant bit
//! first with no regard for octet boundaries (except where the aligned
//! variant asks for padding). This module provides the two cursors every
//! other codec is built on:
//!
//! - [`BitInput`] reads bits and pulls more input from a [`RefillSource`]
//! - [`BitOutput`] writes bits and pushes completed octets to a [`FlushSink`]
//!
//! Both primitives work on at most [`MAX_FEW_BITS`] bits per call;
//! `get_many_bits`/`put_many_bits` handle arbitrary widths.

pub mod input;
pub mod output;
pub mod sink;
pub mod source;

pub use input::BitInput;
pub use output::{BitOutput, STAGING_CAPACITY};
pub use sink::{FlushSink, WriterSink};
pub use source::{ChunkedSource, NoRefill, ReaderSource, Refill, RefillSource};

/// Widest read or write a single primitive call performs
pub const MAX_FEW_BITS: u32 = 31;
