use std::ops::Range;

use crate::bytes::{ByteReader, ReadError};

use super::layout;

/// Tag field located after the name: the tag bytes and where the payload
/// begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagField<'a> {
    pub tag: &'a [u8],
    pub payload_start: usize,
}

/// Reads the header fields of a sound dump. `body` is the framed message
/// without its trailing `F7`.
pub struct HeaderReader<'a> {
    inner: ByteReader<'a>,
}

impl<'a> HeaderReader<'a> {
    pub fn new(body: &'a [u8]) -> Self {
        Self {
            inner: ByteReader::new(body),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn read_bank(&self) -> Result<u8, ReadError> {
        self.inner.read_u8(layout::BANK_OFFSET)
    }

    pub fn read_slot(&self) -> Result<u8, ReadError> {
        self.inner.read_u8(layout::SLOT_OFFSET)
    }

    pub fn read_prefix(&self) -> Result<&'a [u8], ReadError> {
        self.inner.read_bytes(layout::PREFIX_OFFSET, layout::PREFIX_LEN)
    }

    /// Name bytes (terminator excluded) and the offset just past the name
    /// field. A name filling all of its bytes has no terminator.
    pub fn read_name(&self) -> Result<(&'a [u8], usize), ReadError> {
        self.inner.require(layout::NAME_OFFSET, 1)?;
        let field_end = (layout::NAME_OFFSET + layout::NAME_MAX_LEN).min(self.inner.len());
        let field = self.inner.read_slice(layout::NAME_OFFSET..field_end)?;
        Ok(match field.iter().position(|&b| b == layout::NUL) {
            Some(end) => (&field[..end], layout::NAME_OFFSET + end + 1),
            None => (field, field_end),
        })
    }

    /// Skips NUL padding from `from`, then reads a `0x20`-introduced,
    /// NUL-terminated tag code. Without a separator the tag is empty and
    /// the payload starts after the padding.
    pub fn read_tag(&self, from: usize) -> Result<TagField<'a>, ReadError> {
        let bytes = self.inner.bytes();
        let mut pos = from.min(bytes.len());
        while bytes.get(pos) == Some(&layout::NUL) {
            pos += 1;
        }
        if bytes.get(pos) != Some(&layout::TAG_SEPARATOR) {
            return Ok(TagField {
                tag: &[],
                payload_start: pos,
            });
        }

        let start = pos + 1;
        let end = self
            .inner
            .find(&[layout::NUL], start)
            .ok_or(ReadError::OutOfRange {
                offset: start,
                width: bytes.len().saturating_sub(start) + 1,
                len: bytes.len(),
            })?;
        Ok(TagField {
            tag: self.inner.read_slice(start..end)?,
            payload_start: end + 1,
        })
    }

    pub fn payload_range(&self, start: usize) -> Range<usize> {
        start.min(self.inner.len())..self.inner.len()
    }
}
