use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::error::ReadError;

/// Byte order of a multi-byte integer.
///
/// The device stores parameters big-endian as far as observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    Big,
    Little,
}

/// Linear transform from a raw integer to a human value:
/// `(raw + bias) / divisor`, optionally bounded by `[min, max]`.
///
/// # Examples
/// ```
/// use dn_deobfuscator_core::Scale;
///
/// let harm = Scale::signed_hundredths(-26.0, 26.0);
/// assert_eq!(harm.apply(-1450), Some(-14.5));
/// assert_eq!(Scale::centered(1, 0.0, 1.0).apply(i64::MAX), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    /// Interpret the raw bytes as two's complement.
    #[serde(default)]
    pub signed: bool,
    /// Added to the raw integer before dividing.
    #[serde(default)]
    pub bias: i64,
    /// Divisor applied after the bias (1.0 keeps integer steps).
    #[serde(default = "default_divisor")]
    pub divisor: f64,
    /// Lowest valid human value, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Highest valid human value, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

fn default_divisor() -> f64 {
    1.0
}

impl Default for Scale {
    fn default() -> Self {
        Self {
            signed: false,
            bias: 0,
            divisor: 1.0,
            min: None,
            max: None,
        }
    }
}

impl Scale {
    /// Unsigned integer steps bounded by `[min, max]`.
    pub const fn bounded(min: f64, max: f64) -> Self {
        Self {
            signed: false,
            bias: 0,
            divisor: 1.0,
            min: Some(min),
            max: Some(max),
        }
    }

    /// Raw byte centred on `-bias` (e.g. `0..=127` shown as `-64..=63`).
    pub const fn centered(bias: i64, min: f64, max: f64) -> Self {
        Self {
            signed: false,
            bias,
            divisor: 1.0,
            min: Some(min),
            max: Some(max),
        }
    }

    /// Unsigned fixed point with two decimals.
    pub const fn hundredths(min: f64, max: f64) -> Self {
        Self {
            signed: false,
            bias: 0,
            divisor: 100.0,
            min: Some(min),
            max: Some(max),
        }
    }

    /// Two's complement fixed point with two decimals.
    pub const fn signed_hundredths(min: f64, max: f64) -> Self {
        Self {
            signed: true,
            bias: 0,
            divisor: 100.0,
            min: Some(min),
            max: Some(max),
        }
    }

    /// Scaled value, or `None` when the bias overflows the raw integer.
    pub fn apply(&self, raw: i64) -> Option<f64> {
        raw.checked_add(self.bias)
            .map(|biased| biased as f64 / self.divisor)
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }

    /// True when the scaled value is always a whole number.
    pub fn is_integral(&self) -> bool {
        self.divisor == 1.0
    }
}

/// Bounds-checked cursor over a byte buffer.
///
/// Absolute reads (`read_*`) ignore the cursor; the `*_next` variants read
/// at the cursor and advance it.
///
/// # Examples
/// ```
/// use dn_deobfuscator_core::{ByteOrder, ByteReader};
///
/// let reader = ByteReader::new(&[0x12, 0x34, 0xff]);
/// assert_eq!(reader.read_uint(0, 2, ByteOrder::Big).unwrap(), 0x1234);
/// assert_eq!(reader.read_uint(0, 2, ByteOrder::Little).unwrap(), 0x3412);
/// assert_eq!(reader.read_int(2, 1, ByteOrder::Big).unwrap(), -1);
/// assert!(reader.read_uint(2, 2, ByteOrder::Big).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.buf
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    /// Move the cursor to an absolute offset (may equal the length).
    pub fn seek(&mut self, offset: usize) -> Result<(), ReadError> {
        self.require(offset, 0)?;
        self.pos = offset;
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> Result<(), ReadError> {
        self.require(self.pos, count)?;
        self.pos += count;
        Ok(())
    }

    pub fn require(&self, offset: usize, width: usize) -> Result<(), ReadError> {
        match offset.checked_add(width) {
            Some(end) if end <= self.buf.len() => Ok(()),
            _ => Err(ReadError::OutOfRange {
                offset,
                width,
                len: self.buf.len(),
            }),
        }
    }

    pub fn read_slice(&self, range: Range<usize>) -> Result<&'a [u8], ReadError> {
        let width = range.end.saturating_sub(range.start);
        self.buf.get(range.clone()).ok_or(ReadError::OutOfRange {
            offset: range.start,
            width,
            len: self.buf.len(),
        })
    }

    pub fn read_bytes(&self, offset: usize, width: usize) -> Result<&'a [u8], ReadError> {
        self.require(offset, width)?;
        Ok(&self.buf[offset..offset + width])
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8, ReadError> {
        self.buf.get(offset).copied().ok_or(ReadError::OutOfRange {
            offset,
            width: 1,
            len: self.buf.len(),
        })
    }

    pub fn read_uint(&self, offset: usize, width: usize, order: ByteOrder) -> Result<u64, ReadError> {
        if width > 8 {
            return Err(ReadError::InvalidWidth { width });
        }
        let bytes = self.read_bytes(offset, width)?;
        let fold = |acc: u64, byte: &u8| (acc << 8) | u64::from(*byte);
        Ok(match order {
            ByteOrder::Big => bytes.iter().fold(0, fold),
            ByteOrder::Little => bytes.iter().rev().fold(0, fold),
        })
    }

    pub fn read_int(&self, offset: usize, width: usize, order: ByteOrder) -> Result<i64, ReadError> {
        let raw = self.read_uint(offset, width, order)?;
        Ok(sign_extend(raw, width))
    }

    /// Fixed-length ISO-8859-1 string; trailing NUL and space padding is
    /// trimmed, nothing else is altered.
    pub fn read_fixed_string(&self, offset: usize, length: usize) -> Result<String, ReadError> {
        let bytes = self.read_bytes(offset, length)?;
        let text: String = bytes.iter().map(|&b| char::from(b)).collect();
        Ok(text.trim_end_matches(['\0', ' ']).to_string())
    }

    pub fn read_float_scaled(
        &self,
        offset: usize,
        width: usize,
        order: ByteOrder,
        scale: &Scale,
    ) -> Result<f64, ReadError> {
        let raw = self.read_raw(offset, width, order, scale.signed)?;
        scale.apply(raw).ok_or(ReadError::Overflow {
            offset,
            raw,
            adjust: scale.bias,
        })
    }

    /// Integer read whose signedness is decided by the caller.
    pub fn read_raw(
        &self,
        offset: usize,
        width: usize,
        order: ByteOrder,
        signed: bool,
    ) -> Result<i64, ReadError> {
        if signed {
            self.read_int(offset, width, order)
        } else {
            self.read_uint(offset, width, order).map(|v| v as i64)
        }
    }

    pub fn read_next_u8(&mut self) -> Result<u8, ReadError> {
        let value = self.read_u8(self.pos)?;
        self.pos += 1;
        Ok(value)
    }

    pub fn read_next_slice(&mut self, width: usize) -> Result<&'a [u8], ReadError> {
        let bytes = self.read_bytes(self.pos, width)?;
        self.pos += width;
        Ok(bytes)
    }

    /// Offset of the first occurrence of `marker` at or after `from`.
    pub fn find(&self, marker: &[u8], from: usize) -> Option<usize> {
        if marker.is_empty() || from >= self.buf.len() {
            return None;
        }
        self.buf[from..]
            .windows(marker.len())
            .position(|window| window == marker)
            .map(|pos| pos + from)
    }
}

fn sign_extend(raw: u64, width: usize) -> i64 {
    if width == 0 || width >= 8 {
        return raw as i64;
    }
    let shift = 64 - (width as u32 * 8);
    ((raw << shift) as i64) >> shift
}
