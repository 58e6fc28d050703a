use thiserror::Error;

/// Errors returned by `ByteReader`.
///
/// # Examples
/// ```
/// use dn_deobfuscator_core::ReadError;
///
/// let err = ReadError::OutOfRange { offset: 4, width: 2, len: 5 };
/// assert!(err.to_string().contains("out of range"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("read out of range: offset {offset:#x} + width {width} exceeds buffer length {len}")]
    OutOfRange {
        offset: usize,
        width: usize,
        len: usize,
    },
    #[error("invalid integer width: {width} (max 8)")]
    InvalidWidth { width: usize },
    #[error("raw value {raw} at offset {offset:#x} overflows when adjusted by {adjust}")]
    Overflow { offset: usize, raw: i64, adjust: i64 },
}
