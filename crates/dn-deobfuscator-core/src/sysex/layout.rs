pub const START_OF_EXCLUSIVE: u8 = 0xf0;
pub const END_OF_EXCLUSIVE: u8 = 0xf7;
pub const STATUS_BIT: u8 = 0x80;
pub const REALTIME_FIRST: u8 = 0xf8;

/// First manufacturer byte announcing a three-byte identifier.
pub const EXTENDED_ID_PREFIX: u8 = 0x00;
pub const EXTENDED_ID_LEN: usize = 3;

pub const ELEKTRON_ID: [u8; 3] = [0x00, 0x20, 0x3c];
