//! File-level entry points. These are the only functions in the crate that
//! touch the filesystem.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::container::{ContainerError, ContainerKind, SectionRole, extract_container};
use crate::preset::{DecodedPreset, RuleRegistry, decode_preset};

/// Errors returned by the file-level helpers. Each variant names the file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot tell container type of {} (expected .dn2prj or .dn2pst)", path.display())]
    UnknownKind { path: PathBuf },
    #[error("{}: {source}", path.display())]
    Container {
        path: PathBuf,
        #[source]
        source: ContainerError,
    },
}

pub fn read_input(path: &Path) -> Result<Vec<u8>, LoadError> {
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = bytes.len(), "read input");
    Ok(bytes)
}

/// Preset or project blob pulled out of its container, owned so it can be
/// decoded after the file buffer is gone.
#[derive(Debug, Clone)]
pub struct PresetFile {
    pub path: PathBuf,
    pub kind: ContainerKind,
    /// Entry name of the binary section.
    pub section: String,
    pub binary: Vec<u8>,
    /// Text sidecar, when the container has one.
    pub text: Option<String>,
}

impl PresetFile {
    pub fn decode<'a>(&'a self, registry: &RuleRegistry) -> DecodedPreset<'a> {
        decode_preset(&self.binary, registry)
    }

    /// File name without extension.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.section.clone())
    }

    /// Tags listed in the text sidecar on a `tags:` line, comma separated.
    pub fn tags(&self) -> Vec<String> {
        self.text.as_deref().map(sidecar_tags).unwrap_or_default()
    }
}

fn sidecar_tags(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.split_once(':'))
        .filter(|(key, _)| key.trim().eq_ignore_ascii_case("tags"))
        .flat_map(|(_, value)| value.split(','))
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read a `.dn2prj` / `.dn2pst` file and extract its binary section.
///
/// # Examples
/// ```no_run
/// use std::path::Path;
///
/// use dn_deobfuscator_core::{RuleRegistry, load_preset};
///
/// let file = load_preset(Path::new("hidden-tears.dn2pst"))?;
/// let preset = file.decode(RuleRegistry::builtin());
/// println!("algo = {:?}", preset.value("algo"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn load_preset(path: &Path) -> Result<PresetFile, LoadError> {
    let kind = ContainerKind::from_path(path).ok_or_else(|| LoadError::UnknownKind {
        path: path.to_path_buf(),
    })?;
    let bytes = read_input(path)?;
    let container = extract_container(&bytes, kind).map_err(|source| LoadError::Container {
        path: path.to_path_buf(),
        source,
    })?;

    let binary = container.binary();
    let text = container
        .first(SectionRole::Text)
        .map(|section| section.text().into_owned());
    Ok(PresetFile {
        path: path.to_path_buf(),
        kind,
        section: binary.name.clone(),
        binary: binary.bytes().to_vec(),
        text,
    })
}
