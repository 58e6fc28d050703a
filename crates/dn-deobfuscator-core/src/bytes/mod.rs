//! Bounds-checked byte access shared by every decoder.
//!
//! `ByteReader` is the only place in the crate that indexes raw buffers.
//! Reads take an absolute offset and an explicit byte order so that each
//! caller (field rule, container walker, SysEx header) states the
//! convention it relies on. A read that would cross the end of the buffer
//! returns `ReadError::OutOfRange`; it never panics.

pub mod error;
pub mod reader;

pub use error::ReadError;
pub use reader::{ByteOrder, ByteReader, Scale};
