use std::borrow::Cow;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use flate2::read::DeflateDecoder;
use rawzip::{CompressionMethod, ZipArchive};
use serde::Serialize;
use tracing::debug;

use super::error::ContainerError;
use super::layout;

/// Container flavours produced by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    /// Project bundle: manifest + project blob (+ optional sidecars).
    Dn2Prj,
    /// Single sound preset, zipped with a text sidecar or bare.
    Dn2Pst,
}

impl ContainerKind {
    pub fn tag(self) -> &'static str {
        match self {
            ContainerKind::Dn2Prj => "dn2prj",
            ContainerKind::Dn2Pst => "dn2pst",
        }
    }

    /// Detect the kind from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ContainerKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "dn2prj" => Ok(ContainerKind::Dn2Prj),
            "dn2pst" => Ok(ContainerKind::Dn2Pst),
            other => Err(format!("unknown container type '{other}'")),
        }
    }
}

/// What a section holds, inferred from its entry name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionRole {
    Manifest,
    Text,
    Xml,
    Binary,
    Other,
}

impl SectionRole {
    fn for_entry(name: &str) -> Self {
        let base = name.rsplit('/').next().unwrap_or(name);
        if base.eq_ignore_ascii_case(layout::MANIFEST_NAME) {
            return SectionRole::Manifest;
        }
        match base.rsplit_once('.') {
            None => SectionRole::Binary,
            Some((_, ext)) if ext.eq_ignore_ascii_case("txt") => SectionRole::Text,
            Some((_, ext)) if ext.eq_ignore_ascii_case("xml") => SectionRole::Xml,
            Some(_) => SectionRole::Other,
        }
    }
}

/// One named sub-blob of a container.
#[derive(Debug, Clone)]
pub struct Section<'a> {
    pub name: String,
    pub role: SectionRole,
    /// Offset of the entry data within the container.
    pub offset: usize,
    /// Whether `data` was inflated rather than sliced.
    pub inflated: bool,
    pub data: Cow<'a, [u8]>,
}

impl Section<'_> {
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Section data as text (ISO-8859-1 fallback for non UTF-8 bytes).
    pub fn text(&self) -> Cow<'_, str> {
        match std::str::from_utf8(&self.data) {
            Ok(text) => Cow::Borrowed(text),
            Err(_) => Cow::Owned(self.data.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

/// Sections of a successfully extracted container, in archive order.
#[derive(Debug, Clone)]
pub struct Container<'a> {
    kind: ContainerKind,
    sections: Vec<Section<'a>>,
    binary_index: usize,
}

impl<'a> Container<'a> {
    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    pub fn sections(&self) -> &[Section<'a>] {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&Section<'a>> {
        self.sections.iter().find(|section| section.name == name)
    }

    pub fn first(&self, role: SectionRole) -> Option<&Section<'a>> {
        self.sections.iter().find(|section| section.role == role)
    }

    /// The sound or project blob; always present after extraction.
    pub fn binary(&self) -> &Section<'a> {
        &self.sections[self.binary_index]
    }

    pub fn into_sections(self) -> Vec<Section<'a>> {
        self.sections
    }
}

/// Split a container into its sections.
///
/// # Errors
/// Returns `ContainerError::UnrecognizedContainer` when the input has no
/// known shape or lacks a required section, and directory or entry errors
/// when the archive structure is damaged.
///
/// # Examples
/// ```
/// use dn_deobfuscator_core::{ContainerKind, SectionRole, extract_container};
///
/// let blob = vec![0u8; 0x100];
/// let container = extract_container(&blob, ContainerKind::Dn2Pst)?;
/// assert_eq!(container.binary().role, SectionRole::Binary);
/// assert_eq!(container.binary().len(), 0x100);
/// # Ok::<(), dn_deobfuscator_core::ContainerError>(())
/// ```
pub fn extract_container(
    bytes: &[u8],
    kind: ContainerKind,
) -> Result<Container<'_>, ContainerError> {
    if bytes.is_empty() {
        return Err(unrecognized(kind, "input is empty"));
    }

    if !bytes.starts_with(layout::LOCAL_HEADER_MAGIC) {
        return match kind {
            ContainerKind::Dn2Pst => {
                debug!(bytes = bytes.len(), "treating dn2pst as bare preset blob");
                Ok(Container {
                    kind,
                    sections: vec![Section {
                        name: layout::BARE_PRESET_SECTION.to_string(),
                        role: SectionRole::Binary,
                        offset: 0,
                        inflated: false,
                        data: Cow::Borrowed(bytes),
                    }],
                    binary_index: 0,
                })
            }
            ContainerKind::Dn2Prj => Err(unrecognized(kind, "missing archive header marker")),
        };
    }

    let sections = read_sections(bytes, kind)?;
    let binary_index = sections
        .iter()
        .position(|section| section.role == SectionRole::Binary)
        .ok_or_else(|| unrecognized(kind, "no binary section"))?;
    if kind == ContainerKind::Dn2Prj
        && !sections
            .iter()
            .any(|section| section.role == SectionRole::Manifest)
    {
        return Err(unrecognized(kind, "no manifest section"));
    }

    Ok(Container {
        kind,
        sections,
        binary_index,
    })
}

fn read_sections(bytes: &[u8], kind: ContainerKind) -> Result<Vec<Section<'_>>, ContainerError> {
    let archive = ZipArchive::from_slice(bytes)
        .map_err(|err| unrecognized(kind, &format!("no readable end of central directory: {err}")))?;

    let mut sections = Vec::new();
    let mut entries = archive.entries();
    while let Some(record) = entries
        .next_entry()
        .map_err(|source| ContainerError::Directory { source })?
    {
        let name = String::from_utf8_lossy(AsRef::<[u8]>::as_ref(&record.file_path())).into_owned();
        if name.ends_with('/') {
            continue;
        }
        let entry = archive
            .get_entry(record.wayfinder())
            .map_err(|source| ContainerError::OutOfRange {
                name: name.clone(),
                offset: record.local_header_offset(),
                source,
            })?;
        let (offset, raw) = rebase(bytes, entry.data());
        let expected = usize::try_from(record.uncompressed_size_hint()).unwrap_or(usize::MAX);

        let section = read_section(name, record.compression_method(), expected, offset, raw)?;
        debug!(
            name = %section.name,
            role = ?section.role,
            bytes = section.len(),
            "extracted container section"
        );
        sections.push(section);
    }
    Ok(sections)
}

/// Re-borrow `part`, a view into `whole`, for as long as `whole` lives.
fn rebase<'a>(whole: &'a [u8], part: &[u8]) -> (usize, &'a [u8]) {
    let offset = part.as_ptr() as usize - whole.as_ptr() as usize;
    (offset, &whole[offset..offset + part.len()])
}

fn read_section(
    name: String,
    method: CompressionMethod,
    expected: usize,
    offset: usize,
    raw: &[u8],
) -> Result<Section<'_>, ContainerError> {
    let (data, inflated) = match method {
        CompressionMethod::Store => (Cow::Borrowed(raw), false),
        CompressionMethod::Deflate => (Cow::Owned(inflate(&name, raw, expected)?), true),
        other => {
            return Err(ContainerError::UnsupportedCompression {
                name,
                method: format!("{other:?}"),
            });
        }
    };
    if data.len() != expected {
        return Err(ContainerError::SizeMismatch {
            name,
            expected,
            actual: data.len(),
        });
    }

    Ok(Section {
        role: SectionRole::for_entry(&name),
        name,
        offset,
        inflated,
        data,
    })
}

/// Inflate at most one byte past `expected` so oversized entries stop early.
fn inflate(name: &str, raw: &[u8], expected: usize) -> Result<Vec<u8>, ContainerError> {
    let mut out = Vec::with_capacity(expected.min(layout::MAX_PREALLOCATION));
    DeflateDecoder::new(raw)
        .take((expected as u64).saturating_add(1))
        .read_to_end(&mut out)
        .map_err(|source| ContainerError::Inflate {
            name: name.to_string(),
            source,
        })?;
    Ok(out)
}

fn unrecognized(kind: ContainerKind, reason: &str) -> ContainerError {
    ContainerError::UnrecognizedContainer {
        kind: kind.tag(),
        reason: reason.to_string(),
    }
}
