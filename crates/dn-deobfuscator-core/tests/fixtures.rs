use std::fs;
use std::path::PathBuf;

use pretty_assertions::assert_eq;

use dn_deobfuscator_core::{
    ContainerKind, FieldValue, PatchExtractor, RuleRegistry, SectionRole, extract_container,
    load_preset, render_catalog, scan_sysex,
};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn int(value: i64) -> Option<FieldValue> {
    Some(FieldValue::Int(value))
}

fn float(value: f64) -> Option<FieldValue> {
    Some(FieldValue::Float(value))
}

fn label(value: &str) -> Option<FieldValue> {
    Some(FieldValue::Label(value.to_string()))
}

#[test]
fn hidden_tears_synth_page() {
    let file = load_preset(&fixture("hidden-tears.dn2pst")).unwrap();
    assert_eq!(file.kind, ContainerKind::Dn2Pst);
    assert_eq!(file.section, "HIDDEN TEARS");
    assert_eq!(file.tags(), vec!["pad", "ambient"]);

    let preset = file.decode(RuleRegistry::builtin());
    let value = |name: &str| preset.value(name).cloned();

    assert_eq!(value("algo"), int(7));
    assert_eq!(value("fdbk"), int(85));
    assert_eq!(value("ratio.c"), float(1.0));
    assert_eq!(value("ratio.b2"), float(1.0));
    assert_eq!(value("harm"), float(-14.5));
    assert_eq!(value("dtun"), float(38.71));
    assert_eq!(value("mix"), int(-28));
    assert_eq!(value("a_envelope.dec"), int(124));
    assert_eq!(value("a_envelope.lev"), int(115));
    assert_eq!(value("b_envelope.lev"), int(127));
    assert_eq!(value("atrg"), Some(FieldValue::Bool(true)));
    assert_eq!(value("phrt"), label("ALL"));
    assert_eq!(value("ratio_offset.a"), float(0.0));
    assert_eq!(value("key_track.b1"), int(0));
}

#[test]
fn hidden_tears_filter_amp_fx_pages() {
    let file = load_preset(&fixture("hidden-tears.dn2pst")).unwrap();
    let preset = file.decode(RuleRegistry::builtin());
    let value = |name: &str| preset.value(name).cloned();

    assert_eq!(value("filter.type"), label("Lowpass 4"));
    assert_eq!(value("filter.release"), int(106));
    assert_eq!(value("filter.frequency"), float(78.68));
    assert_eq!(value("filter.resonance"), int(64));
    assert_eq!(value("filter.env_amount"), int(9));

    assert_eq!(value("amp.attack"), int(53));
    assert_eq!(value("amp.reset"), Some(FieldValue::Bool(true)));
    assert_eq!(value("amp.mode"), label("ADSR"));
    // Shown as "Center" on the device.
    assert_eq!(value("amp.pan"), int(0));
    assert_eq!(value("amp.volume"), int(70));

    // Bit reduction and delay show as "off" on the device.
    assert_eq!(value("fx.bit_reduction"), int(0));
    assert_eq!(value("fx.overdrive"), int(76));
    assert_eq!(value("fx.delay"), int(0));
    assert_eq!(value("fx.sample_rate_routing"), label("Pre-filter"));
    assert_eq!(value("fx.reverb"), int(127));
    assert_eq!(value("fx.chorus"), int(59));
}

#[test]
fn hidden_tears_lfo_pages() {
    let file = load_preset(&fixture("hidden-tears.dn2pst")).unwrap();
    let preset = file.decode(RuleRegistry::builtin());
    let value = |name: &str| preset.value(name).cloned();

    assert_eq!(value("lfo1.speed"), float(40.01));
    assert_eq!(value("lfo1.multiplier"), label("16"));
    assert_eq!(value("lfo1.fade"), int(0));
    assert_eq!(value("lfo1.waveform"), label("Sine"));
    assert_eq!(value("lfo1.start_phase"), int(10));
    assert_eq!(value("lfo1.mode"), label("Free"));
    assert_eq!(value("lfo1.depth"), float(-10.34));

    assert_eq!(value("lfo2.speed"), float(32.73));
    assert_eq!(value("lfo2.multiplier"), label("32"));
    assert_eq!(value("lfo2.waveform"), label("Triangle"));
    assert_eq!(value("lfo2.mode"), label("Trig"));
    assert_eq!(value("lfo2.depth"), float(-0.16));

    assert_eq!(preset.record("lfo3").len(), 9);
    assert_eq!(preset.gaps().count(), 0);
}

#[test]
fn hidden_tears_exposes_regions() {
    let file = load_preset(&fixture("hidden-tears.dn2pst")).unwrap();
    let preset = file.decode(RuleRegistry::builtin());

    let names: Vec<&str> = preset.regions().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["filter", "amp", "fx", "lfo"]);
    let filter = preset.region("filter").unwrap();
    assert_eq!(filter.bytes.len(), 0x10);
    assert_eq!(filter.bytes[..2], [1u8, 41]);

    let json = preset.to_json();
    assert_eq!(json["length"], 0x100);
    assert_eq!(json["values"]["filter"]["type"], "Lowpass 4");
}

#[test]
fn project_container_has_manifest_and_binary() {
    let bytes = fs::read(fixture("AUTOMATIC.dn2prj")).unwrap();
    let container = extract_container(&bytes, ContainerKind::Dn2Prj).unwrap();

    let manifest = container.first(SectionRole::Manifest).unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(manifest.bytes()).unwrap();
    assert_eq!(parsed["name"], "AUTOMATIC");

    let binary = container.binary();
    assert_eq!(binary.name, "AUTOMATIC");
    assert!(binary.inflated);
    assert_eq!(binary.len(), 512);
    assert_eq!(binary.bytes()[1], 7);
}

#[test]
fn preset_archive_is_rejected_as_project() {
    let bytes = fs::read(fixture("hidden-tears.dn2pst")).unwrap();
    assert!(extract_container(&bytes, ContainerKind::Dn2Prj).is_err());
}

#[test]
fn sysex_append_keeps_first_dump_in_front() {
    let first = fs::read(fixture("first.syx")).unwrap();
    let second = fs::read(fixture("second.syx")).unwrap();
    let extractor = PatchExtractor::new();

    let mut catalog = extractor.extract(scan_sysex(&first));
    assert_eq!(catalog.len(), 3);
    let before: Vec<String> = catalog.iter().map(|p| p.name.clone()).collect();

    extractor.extract_into(&mut catalog, scan_sysex(&second));
    let names: Vec<String> = catalog.iter().map(|p| p.name.clone()).collect();
    assert_eq!(catalog.len(), 5);
    assert_eq!(names[..3], before[..]);
    assert_eq!(
        names,
        vec!["BD. TEST1", "SD. SNAPPY", "HH. CLOSED", "CY. JAZZY", "LD. SAWLEAD"]
    );
    assert_eq!(catalog.skipped, 1);
    assert!(catalog.truncated.is_empty());

    let slots: Vec<(u8, u8)> = catalog.iter().map(|p| (p.bank, p.slot)).collect();
    assert_eq!(slots, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1)]);
}

#[test]
fn sysex_catalog_is_order_independent_and_reproducible() {
    let first = fs::read(fixture("first.syx")).unwrap();
    let second = fs::read(fixture("second.syx")).unwrap();
    let extractor = PatchExtractor::new();

    let mut forward = extractor.extract(scan_sysex(&first));
    forward.append(extractor.extract(scan_sysex(&second)));
    let mut backward = extractor.extract(scan_sysex(&second));
    backward.append(extractor.extract(scan_sysex(&first)));

    let sorted = |catalog: &dn_deobfuscator_core::PatchCatalog<'_>| {
        let mut names: Vec<String> = catalog.iter().map(|p| p.name.clone()).collect();
        names.sort();
        names
    };
    assert_eq!(sorted(&forward), sorted(&backward));

    let again = extractor.extract(scan_sysex(&first));
    assert_eq!(render_catalog(&again), render_catalog(&extractor.extract(scan_sysex(&first))));
}
