use serde::Serialize;
use thiserror::Error;

/// Why a rule produced a gap instead of a value.
///
/// # Examples
/// ```
/// use dn_deobfuscator_core::GapReason;
///
/// let reason = GapReason::UnknownEnumValue { raw: 9 };
/// assert_eq!(reason.to_string(), "raw value 9 has no enum label");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GapReason {
    #[error("rule ends at {end:#x}, buffer is {len} bytes")]
    OutOfRange { end: usize, len: usize },
    #[error("invalid width {width}")]
    InvalidWidth { width: usize },
    #[error("raw value {raw} has no enum label")]
    UnknownEnumValue { raw: i64 },
    #[error("value {value} outside declared range {min}..={max}")]
    OutOfDeclaredRange { value: f64, min: f64, max: f64 },
    /// Bias or enum base pushed the raw integer past `i64`.
    #[error("raw value {raw} overflows when adjusted by {adjust}")]
    Overflow { raw: i64, adjust: i64 },
}

/// Errors raised while building or loading a rule registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("I/O error reading rules: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid rules JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid rule '{name}': {reason}")]
    InvalidRule { name: String, reason: String },
}
