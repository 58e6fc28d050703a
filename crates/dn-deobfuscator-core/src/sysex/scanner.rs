use std::borrow::Cow;
use std::fmt;

use tracing::debug;

use super::error::SysExError;
use super::layout;

/// MIDI manufacturer identifier: one byte, or `00 xx yy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManufacturerId {
    Short(u8),
    Extended([u8; 3]),
}

impl ManufacturerId {
    pub const ELEKTRON: ManufacturerId = ManufacturerId::Extended(layout::ELEKTRON_ID);

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ManufacturerId::Short(id) => std::slice::from_ref(id),
            ManufacturerId::Extended(id) => id,
        }
    }
}

impl fmt::Display for ManufacturerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex: Vec<String> = self.as_bytes().iter().map(|b| format!("{b:02X}")).collect();
        f.write_str(&hex.join(" "))
    }
}

/// One framed SysEx message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysExMessage<'a> {
    /// Offset of the `F0` byte in the scanned stream.
    pub offset: usize,
    /// Bytes as they appeared in the stream, framing included.
    pub raw: &'a [u8],
    /// Framed message with interleaved real-time bytes removed; borrowed
    /// unless stripping was needed.
    pub bytes: Cow<'a, [u8]>,
    pub manufacturer: ManufacturerId,
}

impl SysExMessage<'_> {
    /// Bytes between the manufacturer id and `F7`.
    pub fn data(&self) -> &[u8] {
        let start = 1 + self.manufacturer.as_bytes().len();
        &self.bytes[start..self.bytes.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Byte range of the message in the scanned stream.
    pub fn stream_range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.raw.len()
    }
}

/// Lazy, restartable iterator over the SysEx messages of a byte stream.
///
/// # Examples
/// ```
/// use dn_deobfuscator_core::scan_sysex;
///
/// let stream = [0xfe, 0xf0, 0x43, 0x01, 0xf7, 0x00, 0xf0, 0x43];
/// let items: Vec<_> = scan_sysex(&stream).collect();
/// assert_eq!(items.len(), 2);
/// assert_eq!(items[0].as_ref().unwrap().data(), &[0x01]);
/// assert!(items[1].is_err());
/// ```
#[derive(Debug, Clone)]
pub struct SysExScanner<'a> {
    stream: &'a [u8],
    pos: usize,
}

impl<'a> SysExScanner<'a> {
    pub fn new(stream: &'a [u8]) -> Self {
        Self { stream, pos: 0 }
    }

    /// Start over from the beginning of the stream.
    pub fn restart(&mut self) {
        self.pos = 0;
    }

    fn frame(&self, start: usize) -> Frame {
        let mut realtime = false;
        for (index, &byte) in self.stream.iter().enumerate().skip(start + 1) {
            match byte {
                layout::END_OF_EXCLUSIVE => {
                    return Frame::Complete {
                        end: index + 1,
                        realtime,
                    };
                }
                b if b >= layout::REALTIME_FIRST => realtime = true,
                b if b & layout::STATUS_BIT != 0 => return Frame::Interrupted { at: index },
                _ => {}
            }
        }
        Frame::Unterminated
    }
}

enum Frame {
    Complete { end: usize, realtime: bool },
    Interrupted { at: usize },
    Unterminated,
}

impl<'a> Iterator for SysExScanner<'a> {
    type Item = Result<SysExMessage<'a>, SysExError>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.stream.get(self.pos..)?;
        let Some(found) = rest
            .iter()
            .position(|&byte| byte == layout::START_OF_EXCLUSIVE)
        else {
            if !rest.is_empty() {
                debug!(offset = self.pos, bytes = rest.len(), "skipped trailing non-SysEx bytes");
            }
            self.pos = self.stream.len();
            return None;
        };
        if found > 0 {
            debug!(offset = self.pos, bytes = found, "skipped bytes outside SysEx framing");
        }

        let stream = self.stream;
        let start = self.pos + found;
        let item = match self.frame(start) {
            Frame::Complete { end, realtime } => {
                self.pos = end;
                build_message(start, &stream[start..end], realtime)
            }
            Frame::Interrupted { at } => {
                self.pos = at;
                Err(SysExError::TruncatedMessage {
                    offset: start,
                    len: at - start,
                    reason: "status byte before end of exclusive",
                })
            }
            Frame::Unterminated => {
                self.pos = self.stream.len();
                Err(SysExError::TruncatedMessage {
                    offset: start,
                    len: stream.len() - start,
                    reason: "end of stream before end of exclusive",
                })
            }
        };
        Some(item)
    }
}

fn build_message(offset: usize, raw: &[u8], realtime: bool) -> Result<SysExMessage<'_>, SysExError> {
    let bytes: Cow<'_, [u8]> = if realtime {
        Cow::Owned(
            raw.iter()
                .copied()
                .filter(|&byte| byte < layout::REALTIME_FIRST)
                .collect(),
        )
    } else {
        Cow::Borrowed(raw)
    };

    let truncated = |reason| SysExError::TruncatedMessage {
        offset,
        len: raw.len(),
        reason,
    };
    // F0 <id> F7 at minimum.
    let body = &bytes[1..bytes.len() - 1];
    let manufacturer = match body.first() {
        None => return Err(truncated("missing manufacturer id")),
        Some(&layout::EXTENDED_ID_PREFIX) => {
            let id = body
                .get(..layout::EXTENDED_ID_LEN)
                .ok_or_else(|| truncated("short extended manufacturer id"))?;
            ManufacturerId::Extended([id[0], id[1], id[2]])
        }
        Some(&id) => ManufacturerId::Short(id),
    };

    Ok(SysExMessage {
        offset,
        raw,
        bytes,
        manufacturer,
    })
}

/// Scan `stream` for SysEx messages.
pub fn scan_sysex(stream: &[u8]) -> SysExScanner<'_> {
    SysExScanner::new(stream)
}
