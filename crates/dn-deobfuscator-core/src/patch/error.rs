use serde::Serialize;
use thiserror::Error;

/// Problems found while decoding a patch header. The patch is kept and the
/// issue is recorded on it.
///
/// # Examples
/// ```
/// use dn_deobfuscator_core::HeaderIssue;
///
/// let issue = HeaderIssue::MalformedHeader { at: 28, reason: "empty name".to_string() };
/// assert_eq!(issue.to_string(), "malformed patch header at byte 28: empty name");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HeaderIssue {
    #[error("malformed patch header at byte {at}: {reason}")]
    MalformedHeader { at: usize, reason: String },
}

impl HeaderIssue {
    pub(crate) fn malformed(at: usize, reason: impl Into<String>) -> Self {
        HeaderIssue::MalformedHeader {
            at,
            reason: reason.into(),
        }
    }
}
