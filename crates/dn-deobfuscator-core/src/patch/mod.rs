//! Sound patches carried in SysEx dumps.
//!
//! Second stage of the `.syx` pipeline: it takes the framed messages produced
//! by `sysex`, keeps the ones matching a known sound-dump signature and
//! decodes their header (category prefix, name, tag code, bank and slot).
//! The payload stays a view into the message.
//!
//! Header problems never drop a patch. A message whose name or tag bytes do
//! not decode cleanly is kept under an `UNNAMED@<offset>` placeholder and
//! carries a `HeaderIssue`, so every matching message shows up in the
//! catalog.

pub mod catalog;
pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

pub use catalog::PatchCatalog;
pub use error::HeaderIssue;
pub use parser::{Patch, PatchExtractor, PatchSignature};
