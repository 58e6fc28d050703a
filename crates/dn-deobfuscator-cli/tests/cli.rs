use std::fs;

use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use serde_json::Value;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("dn-deobfuscator"))
}

fn repo_root() -> std::path::PathBuf {
    let manifest = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest
        .parent()
        .and_then(|p| p.parent())
        .expect("repo root")
        .to_path_buf()
}

fn fixture(name: &str) -> std::path::PathBuf {
    repo_root().join("tests").join("fixtures").join(name)
}

fn test_dump(name: &str) -> Vec<u8> {
    let mut bytes = vec![
        0xF0, 0x00, 0x20, 0x3C, 0x0D, 0x00, 0x53, 0x01, 0x01, 0x00, 0x78, 0x3E, 0x6F, 0x3A, 0x4E,
        0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x21,
    ];
    bytes.extend_from_slice(name.as_bytes());
    bytes.extend_from_slice(&[
        0x00, 0x00, 0x20, 0x53, 0x4D, 0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x55, 0x0B, 0x73,
        0x12, 0x12, 0x00, 0x00, 0x13, 0x00, 0x40, 0x00, 0x40, 0x00, 0x00, 0x2A, 0x00, 0x2A, 0x00,
        0x03, 0xF7,
    ]);
    bytes
}

#[test]
fn help_lists_subcommands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("preset").and(contains("sysex")).and(contains("batch")));
}

#[test]
fn sysex_writes_patch_markdown() {
    let temp = TempDir::new().expect("tempdir");
    let input = temp.path().join("test.syx");
    fs::write(&input, test_dump("BD\x00\x20TEST1")).expect("write syx");
    let output = temp.path().join("patches.md");

    cmd()
        .arg("sysex")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stderr(contains("OK:"));

    let content = fs::read_to_string(&output).expect("read markdown");
    assert!(content.contains("patch name: BD. TEST1"));
    assert!(content.contains("patch tags:"));
    assert!(content.contains(", "));
    assert!(content.contains("00000000"));
    assert!(content.to_uppercase().contains("F0 00 20 3C"));
    assert!(content.contains("|.. <..S...x>o:N.|"));
}

#[test]
fn sysex_without_patches_fails() {
    let temp = TempDir::new().expect("tempdir");
    let input = temp.path().join("invalid.syx");
    fs::write(&input, [0x00, 0x01, 0x02]).expect("write syx");
    let output = temp.path().join("patches.md");

    cmd()
        .arg("sysex")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .failure()
        .code(2)
        .stderr(contains("No valid patches found").and(contains("hint:")));
    assert!(!output.exists());
}

#[test]
fn sysex_append_keeps_existing_content() {
    let temp = TempDir::new().expect("tempdir");
    let input = temp.path().join("test.syx");
    fs::write(&input, test_dump("CY\x00\x20JAZZY")).expect("write syx");
    let output = temp.path().join("patches.md");
    fs::write(&output, "# Existing Patches\n\n").expect("seed markdown");

    cmd()
        .arg("sysex")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("--append")
        .assert()
        .success();

    let content = fs::read_to_string(&output).expect("read markdown");
    assert!(content.starts_with("# Existing Patches\n\n"));
    assert!(content.contains("patch name: CY. JAZZY"));
    assert!(content.contains("patch tags:"));
}

#[test]
fn sysex_appends_second_dump_after_first() {
    let temp = TempDir::new().expect("tempdir");
    let output = temp.path().join("patches.md");

    cmd()
        .arg("sysex")
        .arg(fixture("first.syx"))
        .arg("-o")
        .arg(&output)
        .assert()
        .success();
    let first = fs::read_to_string(&output).expect("read markdown");

    cmd()
        .arg("sysex")
        .arg(fixture("second.syx"))
        .arg("-o")
        .arg(&output)
        .arg("--append")
        .arg("--quiet")
        .assert()
        .success()
        .stderr(contains("OK:").not());

    let content = fs::read_to_string(&output).expect("read markdown");
    assert!(content.starts_with(&first));
    assert_eq!(content.matches("- patch name:").count(), 5);
}

#[test]
fn sysex_accepts_glob_inputs() {
    let temp = TempDir::new().expect("tempdir");
    let output = temp.path().join("patches.md");
    let pattern = repo_root().join("tests").join("fixtures").join("*.syx");

    cmd()
        .arg("sysex")
        .arg(pattern)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    let content = fs::read_to_string(&output).expect("read markdown");
    assert_eq!(content.matches("- patch name:").count(), 5);
}

#[test]
fn preset_stdout_outputs_json() {
    let assert = cmd()
        .arg("preset")
        .arg(fixture("hidden-tears.dn2pst"))
        .arg("--stdout")
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    let json: Value = serde_json::from_str(&stdout).expect("valid json");
    assert_eq!(json["values"]["algo"], 7);
    assert_eq!(json["values"]["fdbk"], 85);
    assert_eq!(json["source"]["container"], "dn2pst");
}

#[test]
fn preset_markdown_to_file() {
    let temp = TempDir::new().expect("tempdir");
    let output = temp.path().join("hidden-tears.md");

    cmd()
        .arg("preset")
        .arg(fixture("hidden-tears.dn2pst"))
        .arg("--format")
        .arg("markdown")
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    let content = fs::read_to_string(&output).expect("read markdown");
    assert!(content.starts_with("# hidden-tears\n"));
    assert!(content.contains("| algo | 0x69 | 1 | 07 | 7 |"));
    assert!(content.contains("## Regions"));
}

#[test]
fn preset_rules_overlay_adds_fields() {
    let temp = TempDir::new().expect("tempdir");
    let rules = temp.path().join("rules.json");
    fs::write(
        &rules,
        r#"[{"name": "overlay.first", "offset": 0, "width": 2, "encoding": {"kind": "uint"}}]"#,
    )
    .expect("write rules");

    let assert = cmd()
        .arg("preset")
        .arg(fixture("hidden-tears.dn2pst"))
        .arg("--rules")
        .arg(&rules)
        .arg("--stdout")
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    let json: Value = serde_json::from_str(&stdout).expect("valid json");
    assert_eq!(json["values"]["overlay"]["first"], 0);
}

#[test]
fn invalid_rules_show_error_and_hint() {
    let temp = TempDir::new().expect("tempdir");
    let rules = temp.path().join("rules.json");
    fs::write(&rules, "{not json").expect("write rules");

    cmd()
        .arg("preset")
        .arg(fixture("hidden-tears.dn2pst"))
        .arg("--rules")
        .arg(&rules)
        .arg("--stdout")
        .assert()
        .failure()
        .stderr(contains("error:").and(contains("hint:")));
}

#[test]
fn missing_input_shows_error_and_hint() {
    let temp = TempDir::new().expect("tempdir");
    let missing = temp.path().join("missing.dn2pst");
    let output = temp.path().join("out.json");

    cmd()
        .arg("preset")
        .arg(missing)
        .arg("-o")
        .arg(output)
        .assert()
        .failure()
        .stderr(contains("error:").and(contains("hint:")));
}

#[test]
fn stdout_and_output_conflict() {
    let temp = TempDir::new().expect("tempdir");
    let output = temp.path().join("out.json");

    cmd()
        .arg("preset")
        .arg(fixture("hidden-tears.dn2pst"))
        .arg("--stdout")
        .arg("-o")
        .arg(output)
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[test]
fn container_lists_and_extracts_sections() {
    let temp = TempDir::new().expect("tempdir");
    let out_dir = temp.path().join("extracted");

    cmd()
        .arg("container")
        .arg(fixture("AUTOMATIC.dn2prj"))
        .arg("--extract-to")
        .arg(&out_dir)
        .assert()
        .success()
        .stdout(contains("manifest.json").and(contains("AUTOMATIC\tBinary")));

    let manifest = fs::read_to_string(out_dir.join("manifest.json")).expect("manifest");
    let manifest: Value = serde_json::from_str(&manifest).expect("valid manifest");
    assert_eq!(manifest["name"], "AUTOMATIC");
    assert_eq!(fs::read(out_dir.join("AUTOMATIC")).expect("binary").len(), 512);
}

#[test]
fn container_rejects_unknown_extension() {
    let temp = TempDir::new().expect("tempdir");
    let input = temp.path().join("notes.txt");
    fs::write(&input, "hello").expect("write input");

    cmd()
        .arg("container")
        .arg(&input)
        .assert()
        .failure()
        .stderr(contains("unsupported input format").and(contains("hint:")));
}

#[test]
fn batch_summarises_every_preset() {
    let temp = TempDir::new().expect("tempdir");
    let output = temp.path().join("summary.md");
    let extracted = temp.path().join("extracted_dn2pst");

    cmd()
        .arg("batch")
        .arg(fixture("patches"))
        .arg("-o")
        .arg(&output)
        .arg("--extract-to")
        .arg(&extracted)
        .assert()
        .success();

    let content = fs::read_to_string(&output).expect("read markdown");
    for stem in ["ALPHA", "BRAVO", "CHARLIE"] {
        assert!(content.contains(&format!("- patch name: {stem}\n")));
        assert!(extracted.join(stem).exists());
        assert!(extracted.join(format!("{stem}.txt")).exists());
    }
    assert!(content.contains("- patch tags: test\n"));
    assert!(content.contains("- patch binary:"));
    assert!(content.contains("00000000"));
    let alpha = content.find("ALPHA").expect("alpha");
    let charlie = content.find("CHARLIE").expect("charlie");
    assert!(alpha < charlie);
}

#[test]
fn batch_skips_damaged_preset_and_summarises_the_rest() {
    let temp = TempDir::new().expect("tempdir");
    let presets = temp.path().join("presets");
    fs::create_dir_all(&presets).expect("create presets dir");
    for stem in ["ALPHA", "CHARLIE"] {
        let name = format!("{stem}.dn2pst");
        fs::copy(fixture("patches").join(&name), presets.join(&name)).expect("copy preset");
    }
    fs::write(presets.join("BROKEN.dn2pst"), b"PK\x03\x04garbage").expect("write broken");
    let output = temp.path().join("summary.md");

    cmd()
        .env("RUST_LOG", "warn")
        .arg("batch")
        .arg(&presets)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stderr(contains("BROKEN.dn2pst").and(contains("2 presets summarised, 1 skipped")));

    let content = fs::read_to_string(&output).expect("read markdown");
    assert!(content.contains("- patch name: ALPHA\n"));
    assert!(content.contains("- patch name: CHARLIE\n"));
    assert!(!content.contains("BROKEN"));
}

#[test]
fn batch_with_only_damaged_presets_fails() {
    let temp = TempDir::new().expect("tempdir");
    fs::write(temp.path().join("BROKEN.dn2pst"), b"PK\x03\x04garbage").expect("write broken");
    let output = temp.path().join("summary.md");

    cmd()
        .arg("batch")
        .arg(temp.path())
        .arg("-o")
        .arg(&output)
        .assert()
        .code(2)
        .stderr(contains("no readable .dn2pst files").and(contains("hint:")));
    assert!(!output.exists());
}
