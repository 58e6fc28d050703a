//! Offsets are relative to the framed message, `F0` included.

use crate::sysex::ManufacturerId;

pub const PRODUCT_OFFSET: usize = 4;
pub const MESSAGE_TYPE_OFFSET: usize = 6;

pub const DIGITONE_PRODUCT: u8 = 0x0d;
pub const SOUND_DUMP: u8 = 0x53;
pub const ELEKTRON: ManufacturerId = ManufacturerId::ELEKTRON;

pub const BANK_OFFSET: usize = 9;
pub const SLOT_OFFSET: usize = 10;

pub const PREFIX_OFFSET: usize = 24;
pub const PREFIX_LEN: usize = 2;

pub const NAME_OFFSET: usize = 28;
pub const NAME_MAX_LEN: usize = 15;

pub const NUL: u8 = 0x00;
pub const TAG_SEPARATOR: u8 = 0x20;

pub const PLACEHOLDER_PREFIX: &str = "UNNAMED@";

/// Category prefixes as shown on the device, with the tags they imply.
pub const CATEGORY_TAGS: &[(&str, &[&str])] = &[
    ("AR", &["arp"]),
    ("AT", &["atmosphere"]),
    ("BA", &["bass"]),
    ("BD", &["drum", "kick"]),
    ("BR", &["brass"]),
    ("BS", &["bass"]),
    ("CH", &["chord"]),
    ("CP", &["drum", "clap"]),
    ("CY", &["drum", "cymbal"]),
    ("FX", &["fx"]),
    ("HH", &["drum", "hihat"]),
    ("KY", &["keys"]),
    ("LD", &["lead"]),
    ("OR", &["organ"]),
    ("PC", &["drum", "percussion"]),
    ("PD", &["pad"]),
    ("PL", &["pluck"]),
    ("RS", &["drum", "rimshot"]),
    ("SD", &["drum", "snare"]),
    ("SQ", &["sequence"]),
    ("ST", &["strings"]),
    ("TM", &["drum", "tom"]),
    ("TX", &["texture"]),
];
