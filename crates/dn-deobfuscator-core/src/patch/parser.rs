use std::borrow::Cow;
use std::collections::BTreeSet;
use std::ops::Range;

use tracing::{debug, warn};

use crate::sysex::{ManufacturerId, SysExError, SysExMessage};

use super::catalog::PatchCatalog;
use super::error::HeaderIssue;
use super::layout;
use super::reader::HeaderReader;

/// Identifies a patch-bearing message: manufacturer, product byte and
/// message type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchSignature {
    pub name: &'static str,
    pub manufacturer: ManufacturerId,
    pub product: u8,
    pub message_type: u8,
}

impl PatchSignature {
    pub const DIGITONE_SOUND: PatchSignature = PatchSignature {
        name: "digitone-sound",
        manufacturer: layout::ELEKTRON,
        product: layout::DIGITONE_PRODUCT,
        message_type: layout::SOUND_DUMP,
    };

    pub fn matches(&self, message: &SysExMessage<'_>) -> bool {
        message.manufacturer == self.manufacturer
            && message.bytes.get(layout::PRODUCT_OFFSET) == Some(&self.product)
            && message.bytes.get(layout::MESSAGE_TYPE_OFFSET) == Some(&self.message_type)
    }
}

/// One sound patch. `message` is the framed SysEx message the patch was
/// decoded from; the payload is a range into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch<'a> {
    /// Display name, `"<prefix>. <name>"` when a category prefix is set.
    pub name: String,
    pub tags: BTreeSet<String>,
    pub bank: u8,
    pub slot: u8,
    pub signature: &'static str,
    /// Offset of the message in the scanned stream.
    pub message_offset: usize,
    pub message: Cow<'a, [u8]>,
    pub payload_range: Range<usize>,
    pub header_issue: Option<HeaderIssue>,
}

impl Patch<'_> {
    pub fn payload(&self) -> &[u8] {
        &self.message[self.payload_range.clone()]
    }

    pub fn is_malformed(&self) -> bool {
        self.header_issue.is_some()
    }

    /// Tags joined with `", "`, in set order.
    pub fn tag_list(&self) -> String {
        self.tags
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Header fields as they appear in the message, before any validation.
struct RawHeader<'a> {
    bank: u8,
    slot: u8,
    prefix: &'a [u8],
    name: &'a [u8],
    tag: &'a [u8],
    payload_start: usize,
}

fn read_header<'a>(reader: &HeaderReader<'a>) -> Result<RawHeader<'a>, HeaderIssue> {
    let bank = reader
        .read_bank()
        .map_err(|_| HeaderIssue::malformed(layout::BANK_OFFSET, "message too short for bank"))?;
    let slot = reader
        .read_slot()
        .map_err(|_| HeaderIssue::malformed(layout::SLOT_OFFSET, "message too short for slot"))?;
    let prefix = reader
        .read_prefix()
        .map_err(|_| HeaderIssue::malformed(layout::PREFIX_OFFSET, "message too short for prefix"))?;
    let (name, after_name) = reader
        .read_name()
        .map_err(|_| HeaderIssue::malformed(layout::NAME_OFFSET, "message too short for name"))?;
    let field = reader
        .read_tag(after_name)
        .map_err(|err| HeaderIssue::malformed(after_name, format!("unterminated tag code ({err})")))?;
    Ok(RawHeader {
        bank,
        slot,
        prefix,
        name,
        tag: field.tag,
        payload_start: field.payload_start,
    })
}

fn printable(bytes: &[u8]) -> Option<&str> {
    if bytes.iter().all(|b| (0x20..=0x7e).contains(b)) {
        std::str::from_utf8(bytes).ok()
    } else {
        None
    }
}

/// Validated text fields of a header.
struct HeaderText {
    name: String,
    tags: BTreeSet<String>,
}

fn header_text(header: &RawHeader<'_>) -> Result<HeaderText, HeaderIssue> {
    let prefix_bytes = trim_nul(header.prefix);
    let prefix = printable(prefix_bytes)
        .ok_or_else(|| HeaderIssue::malformed(layout::PREFIX_OFFSET, "non-printable category prefix"))?
        .trim();
    let name = printable(header.name)
        .ok_or_else(|| HeaderIssue::malformed(layout::NAME_OFFSET, "non-printable byte in name"))?
        .trim();
    if name.is_empty() {
        return Err(HeaderIssue::malformed(layout::NAME_OFFSET, "empty name"));
    }
    let tag = printable(header.tag)
        .ok_or_else(|| HeaderIssue::malformed(layout::NAME_OFFSET, "non-printable byte in tag code"))?
        .trim();

    let mut tags = category_tags(prefix);
    if !tag.is_empty() {
        tags.insert(tag.to_string());
    }
    let name = if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}. {name}")
    };
    Ok(HeaderText { name, tags })
}

fn trim_nul(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|&b| b != layout::NUL)
        .map_or(0, |pos| pos + 1);
    &bytes[..end]
}

/// Tags implied by a category prefix; unknown prefixes imply none.
pub fn category_tags(prefix: &str) -> BTreeSet<String> {
    layout::CATEGORY_TAGS
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(prefix))
        .map(|(_, tags)| tags.iter().map(|tag| tag.to_string()).collect())
        .unwrap_or_default()
}

pub fn placeholder_name(message_offset: usize) -> String {
    format!("{}{message_offset:08X}", layout::PLACEHOLDER_PREFIX)
}

/// Filters SysEx messages down to sound dumps and decodes them into a
/// `PatchCatalog`.
///
/// # Examples
/// ```
/// use dn_deobfuscator_core::{PatchExtractor, scan_sysex};
///
/// let catalog = PatchExtractor::new().extract(scan_sysex(&[0xf0, 0x43, 0x01, 0xf7]));
/// assert!(catalog.is_empty());
/// assert_eq!(catalog.skipped, 1);
/// ```
#[derive(Debug, Clone)]
pub struct PatchExtractor {
    signatures: Vec<PatchSignature>,
}

impl Default for PatchExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PatchExtractor {
    pub fn new() -> Self {
        Self::with_signatures([PatchSignature::DIGITONE_SOUND])
    }

    pub fn with_signatures(signatures: impl IntoIterator<Item = PatchSignature>) -> Self {
        Self {
            signatures: signatures.into_iter().collect(),
        }
    }

    pub fn signatures(&self) -> &[PatchSignature] {
        &self.signatures
    }

    pub fn extract<'a, I>(&self, messages: I) -> PatchCatalog<'a>
    where
        I: IntoIterator<Item = Result<SysExMessage<'a>, SysExError>>,
    {
        let mut catalog = PatchCatalog::default();
        self.extract_into(&mut catalog, messages);
        catalog
    }

    /// Appends the patches of `messages` after the ones already in
    /// `catalog`, in scan order.
    pub fn extract_into<'a, I>(&self, catalog: &mut PatchCatalog<'a>, messages: I)
    where
        I: IntoIterator<Item = Result<SysExMessage<'a>, SysExError>>,
    {
        for item in messages {
            match item {
                Ok(message) => match self.decode(message) {
                    Some(patch) => catalog.patches.push(patch),
                    None => catalog.skipped += 1,
                },
                Err(err) => {
                    warn!(offset = err.offset(), "{err}");
                    catalog.truncated.push(err);
                }
            }
        }
    }

    /// Decodes one message, or `None` when no signature matches.
    pub fn decode<'a>(&self, message: SysExMessage<'a>) -> Option<Patch<'a>> {
        let Some(signature) = self.signatures.iter().find(|sig| sig.matches(&message)) else {
            debug!(
                offset = message.offset,
                manufacturer = %message.manufacturer,
                "skipped non-patch SysEx message"
            );
            return None;
        };

        let body = &message.bytes[..message.bytes.len().saturating_sub(1)];
        let reader = HeaderReader::new(body);
        let header = read_header(&reader);
        let payload_range = match &header {
            Ok(header) => reader.payload_range(header.payload_start),
            Err(_) => reader.payload_range(layout::NAME_OFFSET),
        };
        let bank = header
            .as_ref()
            .map_or_else(|_| reader.read_bank().unwrap_or_default(), |h| h.bank);
        let slot = header
            .as_ref()
            .map_or_else(|_| reader.read_slot().unwrap_or_default(), |h| h.slot);

        let (name, tags, header_issue) = match header.and_then(|header| header_text(&header)) {
            Ok(text) => (text.name, text.tags, None),
            Err(issue) => {
                warn!(offset = message.offset, "{issue}");
                (placeholder_name(message.offset), BTreeSet::new(), Some(issue))
            }
        };

        Some(Patch {
            name,
            tags,
            bank,
            slot,
            signature: signature.name,
            message_offset: message.offset,
            message: message.bytes,
            payload_range,
            header_issue,
        })
    }
}
