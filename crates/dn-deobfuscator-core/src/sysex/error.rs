use thiserror::Error;

/// Framing problems reported by the scanner. Each one covers a single
/// message; scanning continues after it.
///
/// # Examples
/// ```
/// use dn_deobfuscator_core::SysExError;
///
/// let err = SysExError::TruncatedMessage { offset: 16, len: 3, reason: "end of stream" };
/// assert!(err.to_string().contains("offset 0x10"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SysExError {
    #[error("truncated SysEx message at offset {offset:#x} ({len} bytes): {reason}")]
    TruncatedMessage {
        offset: usize,
        len: usize,
        reason: &'static str,
    },
}

impl SysExError {
    pub fn offset(&self) -> usize {
        match self {
            SysExError::TruncatedMessage { offset, .. } => *offset,
        }
    }
}
