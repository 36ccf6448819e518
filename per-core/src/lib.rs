//! Core types for the PER codec
//!
//! This crate provides the error type, the pre-computed constraint
//! descriptors and the codec settings shared by every layer of the
//! Packed Encoding Rules implementation.

pub mod constraint;
pub mod error;
pub mod settings;

pub use constraint::{CodeMapping, ConstraintKind, PerConstraints, RangeConstraint};
pub use error::{PerError, PerResult};
pub use settings::{PerSettings, PerVariant};
