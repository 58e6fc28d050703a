//! MIDI System Exclusive framing.
//!
//! The scanner turns a raw `.syx` stream into a lazy sequence of framed
//! messages (`F0 … F7`). It validates framing only: payload bytes are not
//! interpreted here. Noise between messages is skipped, real-time bytes
//! interleaved inside a message are stripped, and a message cut short by
//! another status byte or by the end of the stream is reported as
//! truncated without stopping the scan.

pub mod error;
pub mod layout;
pub mod scanner;

pub use error::SysExError;
pub use scanner::{ManufacturerId, SysExMessage, SysExScanner, scan_sysex};
