//! Project and preset container extraction.
//!
//! Digitone `.dn2prj` and `.dn2pst` files are ZIP archives. The archive is
//! walked with `rawzip` and every file entry becomes a named section. Stored
//! entries are borrowed views into the input; deflated entries are inflated
//! once, never past the size the directory declares.
//!
//! A `.dn2pst` that does not start with a ZIP local header is treated as a
//! bare preset blob. Extraction either yields every required section or
//! fails for the whole file; downstream decoders rely on section bounds.

pub mod error;
pub mod layout;
pub mod parser;

pub use error::ContainerError;
pub use parser::{Container, ContainerKind, Section, SectionRole, extract_container};
