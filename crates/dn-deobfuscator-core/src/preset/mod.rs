//! Preset field decoding.
//!
//! A preset blob is read against a registry of `FieldRule`s: declarative
//! `(offset, width, encoding, byte order, scale)` descriptors. The rule set
//! is incomplete and partly speculative, so decoding never fails as a
//! whole. Each rule yields either a decoded field or a gap explaining why
//! it could not be read, and the bytes no rule touched stay inspectable as
//! unmapped ranges.
//!
//! The built-in registry is static data (`builtin`). New offsets are added
//! there, or layered at runtime from a JSON overlay, without touching the
//! decoder.

mod builtin;
pub mod decoder;
pub mod error;
pub mod rules;

pub use decoder::{
    DecodeGap, DecodedField, DecodedPreset, FieldOutcome, FieldValue, RegionView, decode_preset,
};
pub use error::{GapReason, RegistryError};
pub use rules::{Encoding, FieldRule, RegionHint, RuleRegistry};
