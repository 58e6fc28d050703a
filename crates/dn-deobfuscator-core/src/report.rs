//! Markdown rendering for decoded presets and patch catalogs.
//!
//! Output is plain text built in memory; writing it (or appending it to an
//! existing file) is left to the caller.

use crate::patch::{Patch, PatchCatalog};
use crate::preset::{DecodedPreset, FieldValue};

const BYTES_PER_LINE: usize = 16;

/// Classic offset / hex / ASCII dump, 16 bytes per line, upper-case hex.
///
/// # Examples
/// ```
/// use dn_deobfuscator_core::hex_dump;
///
/// let dump = hex_dump(&[0xf0, 0x00, 0x20, 0x3c, 0x41]);
/// assert_eq!(
///     dump,
///     "00000000  F0 00 20 3C 41                                   |.. <A|\n"
/// );
/// ```
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (line, chunk) in bytes.chunks(BYTES_PER_LINE).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02X}")).collect();
        let ascii: String = chunk
            .iter()
            .map(|&b| if (0x20..=0x7e).contains(&b) { char::from(b) } else { '.' })
            .collect();
        out.push_str(&format!(
            "{:08x}  {:<width$}  |{ascii}|\n",
            line * BYTES_PER_LINE,
            hex.join(" "),
            width = BYTES_PER_LINE * 3 - 1
        ));
    }
    out
}

/// One markdown block: name, tags and a fenced dump of `binary`.
pub fn patch_block(name: &str, tags: &str, binary: &[u8]) -> String {
    let mut out = String::new();
    out.push_str(&format!("- patch name: {name}\n"));
    out.push_str(&format!("- patch tags: {tags}\n"));
    out.push_str("- patch binary:\n");
    out.push('\n');
    out.push_str("```\n");
    out.push_str(&hex_dump(binary));
    out.push_str("```\n\n");
    out
}

/// Patch block for a SysEx patch. The dump covers the whole framed message
/// so the header stays visible next to the payload.
pub fn render_patch(patch: &Patch<'_>) -> String {
    patch_block(&patch.name, &patch.tag_list(), &patch.message)
}

pub fn render_catalog(catalog: &PatchCatalog<'_>) -> String {
    catalog.iter().map(render_patch).collect()
}

fn format_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Int(value) => value.to_string(),
        FieldValue::Float(value) => format!("{value:.2}"),
        FieldValue::Bool(true) => "on".to_string(),
        FieldValue::Bool(false) => "off".to_string(),
        FieldValue::Label(label) => label.clone(),
        FieldValue::Text(text) => format!("\"{text}\""),
    }
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Field table for a decoded preset, followed by its gaps, unmapped ranges
/// and region hints.
pub fn render_preset(title: &str, preset: &DecodedPreset<'_>) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {title}\n\n"));
    out.push_str(&format!("{} bytes\n\n", preset.source().len()));

    out.push_str("| Field | Offset | Width | Raw | Value |\n");
    out.push_str("|-------|--------|-------|-----|-------|\n");
    for field in preset.fields() {
        out.push_str(&format!(
            "| {} | 0x{:02X} | {} | {} | {} |\n",
            field.name,
            field.offset,
            field.width,
            hex_bytes(field.raw),
            format_value(&field.value)
        ));
    }

    let gaps: Vec<_> = preset.gaps().collect();
    if !gaps.is_empty() {
        out.push_str("\n## Gaps\n\n");
        out.push_str("| Field | Offset | Width | Reason |\n");
        out.push_str("|-------|--------|-------|--------|\n");
        for gap in gaps {
            out.push_str(&format!(
                "| {} | 0x{:02X} | {} | {} |\n",
                gap.name, gap.offset, gap.width, gap.reason
            ));
        }
    }

    let unmapped = preset.unmapped_ranges();
    if !unmapped.is_empty() {
        out.push_str("\n## Unmapped\n\n");
        for range in unmapped {
            out.push_str(&format!(
                "- 0x{:04X}..0x{:04X} ({} bytes)\n",
                range.start,
                range.end,
                range.end - range.start
            ));
        }
    }

    if !preset.regions().is_empty() {
        out.push_str("\n## Regions\n\n");
        for region in preset.regions() {
            out.push_str(&format!(
                "### {} (0x{:02X}..0x{:02X})\n\n",
                region.name, region.start, region.end
            ));
            out.push_str("```\n");
            out.push_str(&hex_dump(region.bytes));
            out.push_str("```\n\n");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{hex_dump, patch_block, render_catalog, render_preset};
    use crate::patch::PatchExtractor;
    use crate::patch::parser::tests::sound_dump;
    use crate::preset::{RuleRegistry, decode_preset};
    use crate::sysex::scan_sysex;

    #[test]
    fn hex_dump_pads_last_line() {
        let bytes: Vec<u8> = (0x30..0x42).collect();
        assert_eq!(
            hex_dump(&bytes),
            "00000000  30 31 32 33 34 35 36 37 38 39 3A 3B 3C 3D 3E 3F  |0123456789:;<=>?|\n\
             00000010  40 41                                            |@A|\n"
        );
        assert_eq!(hex_dump(&[]), "");
    }

    #[test]
    fn patch_catalog_renders_name_tags_and_dump() {
        let stream = sound_dump(b"BD", b"TEST1", b"SM");
        let catalog = PatchExtractor::new().extract(scan_sysex(&stream));
        let markdown = render_catalog(&catalog);

        assert!(markdown.contains("- patch name: BD. TEST1\n"));
        assert!(markdown.contains("- patch tags: SM, drum, kick\n"));
        assert!(markdown.contains("- patch binary:\n"));
        assert!(markdown.contains("00000000  F0 00 20 3C"));
        assert!(markdown.contains("|.. <..S...x>o:N.|"));
    }

    #[test]
    fn patch_block_without_tags() {
        let block = patch_block("KICK", "", &[0x41]);
        assert!(block.starts_with("- patch name: KICK\n- patch tags: \n"));
        assert!(block.ends_with("```\n\n"));
    }

    #[test]
    fn preset_table_lists_fields_gaps_and_unmapped() {
        let mut blob = vec![0u8; 0x90];
        blob[0x69] = 7;
        blob[0x83] = 85;
        let preset = decode_preset(&blob, RuleRegistry::builtin());
        let markdown = render_preset("TEST", &preset);

        assert!(markdown.starts_with("# TEST\n\n144 bytes\n"));
        assert!(markdown.contains("| algo | 0x69 | 1 | 07 | 7 |"));
        assert!(markdown.contains("| fdbk | 0x83 | 1 | 55 | 85 |"));
        assert!(markdown.contains("## Gaps"));
        assert!(markdown.contains("| filter.type | 0xA0 | 1 |"));
        assert!(markdown.contains("- 0x0000..0x0069 (105 bytes)"));
        assert!(!markdown.contains("## Regions"));
    }
}
