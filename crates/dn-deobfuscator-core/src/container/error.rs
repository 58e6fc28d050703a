use thiserror::Error;

/// Errors returned by container extraction. All of them are fatal for the
/// file being extracted.
///
/// # Examples
/// ```
/// use dn_deobfuscator_core::{ContainerError, ContainerKind, extract_container};
///
/// let err = extract_container(b"not a zip", ContainerKind::Dn2Prj).unwrap_err();
/// assert!(matches!(err, ContainerError::UnrecognizedContainer { .. }));
/// ```
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("unrecognized {kind} container: {reason}")]
    UnrecognizedContainer { kind: &'static str, reason: String },
    #[error("damaged central directory: {source}")]
    Directory {
        #[source]
        source: rawzip::Error,
    },
    #[error("entry '{name}' at offset {offset:#x} is out of range: {source}")]
    OutOfRange {
        name: String,
        offset: u64,
        #[source]
        source: rawzip::Error,
    },
    #[error("entry '{name}' uses unsupported compression method {method}")]
    UnsupportedCompression { name: String, method: String },
    #[error("failed to inflate entry '{name}': {source}")]
    Inflate {
        name: String,
        #[source]
        source: std::io::Error,
    },
    /// `actual` is capped at `expected + 1`; inflation stops there.
    #[error("entry '{name}' inflated to {actual} bytes, directory says {expected}")]
    SizeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}
