use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::DeflateEncoder;
use flate2::{Compression, Crc};

const PRESET_LEN: usize = 0x100;

const ZIP_VERSION: u16 = 20;
const ZIP_STORED: u16 = 0;
const ZIP_DEFLATED: u16 = 8;
// 1980-01-01 00:00, the earliest DOS timestamp.
const ZIP_DOS_DATE: u16 = 0x0021;

const SYSEX_HEADER: [u8; 24] = [
    0xf0, 0x00, 0x20, 0x3c, 0x0d, 0x00, 0x53, 0x01, 0x01, 0x00, 0x00, 0x3e, 0x6f, 0x3a, 0x4e, 0x00,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x21,
];
const SYSEX_BANK_OFFSET: usize = 9;
const SYSEX_SLOT_OFFSET: usize = 10;
const SYSEX_PAYLOAD: [u8; 25] = [
    0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x55, 0x0b, 0x73, 0x12, 0x12, 0x00, 0x00, 0x13, 0x00, 0x40,
    0x00, 0x40, 0x00, 0x00, 0x2a, 0x00, 0x2a, 0x00, 0x03,
];
const IDENTITY_REQUEST: [u8; 6] = [0xf0, 0x7e, 0x7f, 0x06, 0x01, 0xf7];
const TIMING_CLOCK: u8 = 0xf8;

fn main() -> Result<(), String> {
    let root = PathBuf::from("tests/fixtures");
    write_presets(&root)?;
    write_project(&root)?;
    write_sysex(&root)?;
    Ok(())
}

fn write_presets(root: &Path) -> Result<(), String> {
    write_file(
        &root.join("hidden-tears.dn2pst"),
        &build_archive(&[
            Entry::stored("HIDDEN TEARS.txt", b"name: HIDDEN TEARS\ntags: pad, ambient\n"),
            Entry::deflated("HIDDEN TEARS", &hidden_tears()),
        ])?,
    )?;

    for (index, name) in ["ALPHA", "BRAVO", "CHARLIE"].into_iter().enumerate() {
        let mut preset = vec![0u8; PRESET_LEN];
        preset[0x69] = index as u8 + 1;
        preset[0x83] = 0x10 * (index as u8 + 1);
        let text = format!("name: {name}\ntags: test\n");
        write_file(
            &root.join("patches").join(format!("{name}.dn2pst")),
            &build_archive(&[
                Entry::stored(&format!("{name}.txt"), text.as_bytes()),
                Entry::deflated(name, &preset),
            ])?,
        )?;
    }
    Ok(())
}

/// Parameter bytes of the HIDDEN TEARS factory sound.
fn hidden_tears() -> Vec<u8> {
    let mut preset = vec![0u8; PRESET_LEN];
    let mut put = |offset: usize, bytes: &[u8]| {
        preset[offset..offset + bytes.len()].copy_from_slice(bytes);
    };

    put(0x69, &[7]);
    for offset in [0x6a, 0x6c, 0x6e, 0x70] {
        put(offset, &100u16.to_be_bytes());
    }
    put(0x72, &(-1450i16).to_be_bytes());
    put(0x74, &3871i16.to_be_bytes());
    put(0x83, &[85, 36]);
    put(0x85, &[0, 124, 0, 115, 0, 127, 0, 127]);
    put(0x8d, &[0, 1, 1, 1, 0, 1, 1]);

    put(0xa0, &[1, 41, 70, 80, 106]);
    put(0xa5, &7868u16.to_be_bytes());
    put(0xa7, &[64, 73]);
    put(0xb0, &[53, 87, 76, 60, 1, 1, 64, 70]);
    put(0xc0, &[0, 76, 0, 0, 0, 127, 59, 0]);

    put(0xd0, &4001i16.to_be_bytes());
    put(0xd2, &[4, 64, 12, 1, 10, 0]);
    put(0xd8, &(-1034i16).to_be_bytes());
    put(0xda, &3273i16.to_be_bytes());
    put(0xdc, &[5, 64, 41, 0, 0, 1]);
    put(0xe2, &(-16i16).to_be_bytes());
    put(0xe7, &[64]);
    preset
}

fn write_project(root: &Path) -> Result<(), String> {
    let project: Vec<u8> = (0..512u32).map(|i| (i * 7) as u8).collect();
    write_file(
        &root.join("AUTOMATIC.dn2prj"),
        &build_archive(&[
            Entry::stored("manifest.json", b"{\"name\":\"AUTOMATIC\",\"format\":\"dn2prj\"}\n"),
            Entry::deflated("AUTOMATIC", &project),
        ])?,
    )
}

fn write_sysex(root: &Path) -> Result<(), String> {
    let mut first = Vec::new();
    for (slot, (prefix, name)) in [("BD", "TEST1"), ("SD", "SNAPPY"), ("HH", "CLOSED")]
        .into_iter()
        .enumerate()
    {
        first.extend(sound_dump(0, slot as u8, prefix, name, "SM"));
    }
    write_file(&root.join("first.syx"), &first)?;

    let mut second = vec![TIMING_CLOCK];
    second.extend_from_slice(&IDENTITY_REQUEST);
    second.extend(sound_dump(1, 0, "CY", "JAZZY", "SM"));
    second.extend(sound_dump(1, 1, "LD", "SAWLEAD", "SY"));
    write_file(&root.join("second.syx"), &second)
}

fn sound_dump(bank: u8, slot: u8, prefix: &str, name: &str, tag: &str) -> Vec<u8> {
    let mut message = SYSEX_HEADER.to_vec();
    message[SYSEX_BANK_OFFSET] = bank;
    message[SYSEX_SLOT_OFFSET] = slot;
    message.extend_from_slice(prefix.as_bytes());
    message.extend_from_slice(&[0x00, 0x20]);
    message.extend_from_slice(name.as_bytes());
    message.extend_from_slice(&[0x00, 0x00, 0x20]);
    message.extend_from_slice(tag.as_bytes());
    message.push(0x00);
    message.extend_from_slice(&SYSEX_PAYLOAD);
    message.push(0xf7);
    message
}

struct Entry {
    name: String,
    data: Vec<u8>,
    deflate: bool,
}

impl Entry {
    fn stored(name: &str, data: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            data: data.to_vec(),
            deflate: false,
        }
    }

    fn deflated(name: &str, data: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            data: data.to_vec(),
            deflate: true,
        }
    }
}

fn build_archive(entries: &[Entry]) -> Result<Vec<u8>, String> {
    let mut out = Vec::new();
    let mut central = Vec::new();
    for entry in entries {
        let mut crc = Crc::new();
        crc.update(&entry.data);
        let (method, payload) = if entry.deflate {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder
                .write_all(&entry.data)
                .map_err(|err| format!("failed to deflate {}: {}", entry.name, err))?;
            let payload = encoder
                .finish()
                .map_err(|err| format!("failed to deflate {}: {}", entry.name, err))?;
            (ZIP_DEFLATED, payload)
        } else {
            (ZIP_STORED, entry.data.clone())
        };
        let name = entry.name.as_bytes();
        let local_offset = out.len() as u32;

        out.extend_from_slice(b"PK\x03\x04");
        out.extend_from_slice(&ZIP_VERSION.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&method.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&ZIP_DOS_DATE.to_le_bytes());
        out.extend_from_slice(&crc.sum().to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&(entry.data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name);
        out.extend_from_slice(&payload);

        central.extend_from_slice(b"PK\x01\x02");
        central.extend_from_slice(&ZIP_VERSION.to_le_bytes());
        central.extend_from_slice(&ZIP_VERSION.to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes());
        central.extend_from_slice(&method.to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes());
        central.extend_from_slice(&ZIP_DOS_DATE.to_le_bytes());
        central.extend_from_slice(&crc.sum().to_le_bytes());
        central.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        central.extend_from_slice(&(entry.data.len() as u32).to_le_bytes());
        central.extend_from_slice(&(name.len() as u16).to_le_bytes());
        central.extend_from_slice(&[0u8; 12]);
        central.extend_from_slice(&local_offset.to_le_bytes());
        central.extend_from_slice(name);
    }

    let dir_offset = out.len() as u32;
    let count = entries.len() as u16;
    out.extend_from_slice(&central);
    out.extend_from_slice(b"PK\x05\x06");
    out.extend_from_slice(&[0u8; 4]);
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&(central.len() as u32).to_le_bytes());
    out.extend_from_slice(&dir_offset.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    Ok(out)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| format!("failed to create {}: {}", parent.display(), err))?;
    }
    fs::write(path, bytes).map_err(|err| format!("failed to write {}: {}", path.display(), err))
}
