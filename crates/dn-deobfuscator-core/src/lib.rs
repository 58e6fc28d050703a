//! Decoding engine for Elektron Digitone files.
//!
//! This crate reads the binary formats written by the Digitone: `.dn2prj`
//! projects, `.dn2pst` sound presets and `.syx` SysEx dumps. Containers are
//! split into named sections, preset blobs are decoded against a table of
//! field rules, and SysEx streams go through a two-stage pipeline (framing
//! scanner, then patch extractor). Decoding is byte-oriented and side-effect
//! free; file access is limited to the `load` helpers.
//!
//! Invariants:
//! - Every raw read is bounds-checked; malformed input never panics.
//! - Field and message problems are recorded (gaps, truncated messages,
//!   header issues) and decoding carries on; container problems fail the
//!   whole file.
//! - Output order is stable across runs: registry order for fields, scan
//!   order for patches.
//!
//! # Examples
//! ```
//! use dn_deobfuscator_core::{PatchExtractor, render_catalog, scan_sysex};
//!
//! let stream = std::fs::read("dump.syx").unwrap_or_default();
//! let catalog = PatchExtractor::new().extract(scan_sysex(&stream));
//! print!("{}", render_catalog(&catalog));
//! ```

mod bytes;
mod container;
mod load;
mod patch;
mod preset;
mod report;
mod sysex;

pub use bytes::{ByteOrder, ByteReader, ReadError, Scale};
pub use container::{
    Container, ContainerError, ContainerKind, Section, SectionRole, extract_container,
};
pub use load::{LoadError, PresetFile, load_preset, read_input};
pub use patch::{HeaderIssue, Patch, PatchCatalog, PatchExtractor, PatchSignature};
pub use preset::{
    DecodeGap, DecodedField, DecodedPreset, Encoding, FieldOutcome, FieldRule, FieldValue,
    GapReason, RegionHint, RegionView, RegistryError, RuleRegistry, decode_preset,
};
pub use report::{hex_dump, patch_block, render_catalog, render_patch, render_preset};
pub use sysex::{ManufacturerId, SysExError, SysExMessage, SysExScanner, scan_sysex};
