pub const LOCAL_HEADER_MAGIC: &[u8; 4] = b"PK\x03\x04";

pub const MANIFEST_NAME: &str = "manifest.json";
pub const BARE_PRESET_SECTION: &str = "preset";

/// Upper bound on the buffer reserved up front for an inflated entry.
pub const MAX_PREALLOCATION: usize = 1 << 20;
