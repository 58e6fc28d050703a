//! Built-in rule table for Digitone II sound presets.
//!
//! `algo` (0x69) and `fdbk` (0x83) are confirmed against device screens.
//! Everything else is a hypothesis fitted to the HIDDEN TEARS preset and
//! still needs checking against more presets; the byte order and scaling of
//! the two-byte fields (HARM, DTUN, ratios, filter frequency, LFO speed and
//! depth) are the least certain.
//!
//! Values the device shows as words still decode as numbers here:
//! `amp.pan` is bipolar, so the screen's "Center" is `0`, and the
//! `fx.bit_reduction` and `fx.delay` amounts read `0` where the screen
//! says "off".

use crate::bytes::Scale;

use super::rules::{Encoding, FieldRule, RegionHint};

pub(crate) const VERSION: u32 = 1;

const LFO_BASES: [(&str, usize); 3] = [("lfo1", 0xd0), ("lfo2", 0xda), ("lfo3", 0xe4)];

const MIDI: Scale = Scale::bounded(0.0, 127.0);
const BIPOLAR: Scale = Scale::centered(-64, -64.0, 63.0);
const RATIO: Scale = Scale::hundredths(0.25, 16.0);

pub(crate) fn regions() -> Vec<RegionHint> {
    vec![
        RegionHint::new("filter", 0xa0..0xb0),
        RegionHint::new("amp", 0xb0..0xc0),
        RegionHint::new("fx", 0xc0..0xd0),
        RegionHint::new("lfo", 0xd0..0xf0),
    ]
}

pub(crate) fn rules() -> Vec<FieldRule> {
    let mut rules = Vec::new();
    synth_rules(&mut rules);
    filter_rules(&mut rules);
    amp_rules(&mut rules);
    fx_rules(&mut rules);
    for (name, base) in LFO_BASES {
        lfo_rules(&mut rules, name, base);
    }
    rules
}

fn midi(name: &str, offset: usize) -> FieldRule {
    FieldRule::byte(name, offset).with_scale(MIDI)
}

fn bipolar(name: &str, offset: usize) -> FieldRule {
    FieldRule::byte(name, offset).with_scale(BIPOLAR)
}

fn synth_rules(rules: &mut Vec<FieldRule>) {
    // SYN page 1
    rules.push(FieldRule::byte("algo", 0x69).with_scale(Scale::bounded(1.0, 8.0)));
    rules.push(FieldRule::scaled("ratio.c", 0x6a, 2, RATIO));
    rules.push(FieldRule::scaled("ratio.a", 0x6c, 2, RATIO));
    rules.push(FieldRule::scaled("ratio.b1", 0x6e, 2, RATIO));
    rules.push(FieldRule::scaled("ratio.b2", 0x70, 2, RATIO));
    rules.push(FieldRule::scaled(
        "harm",
        0x72,
        2,
        Scale::signed_hundredths(-26.0, 26.0),
    ));
    rules.push(FieldRule::scaled(
        "dtun",
        0x74,
        2,
        Scale::signed_hundredths(-48.0, 48.0),
    ));
    rules.push(midi("fdbk", 0x83));
    rules.push(bipolar("mix", 0x84));

    // SYN page 2: operator envelopes
    for (record, base) in [("a_envelope", 0x85), ("b_envelope", 0x89)] {
        for (index, stage) in ["atk", "dec", "end", "lev"].into_iter().enumerate() {
            rules.push(midi(&format!("{record}.{stage}"), base + index));
        }
    }

    // SYN page 3
    let phase_reset = Encoding::labels(["OFF", "ALL", "C", "A+B", "A+B2"]);
    rules.push(midi("adel", 0x8d));
    rules.push(FieldRule::flag("atrg", 0x8e));
    rules.push(FieldRule::flag("arst", 0x8f));
    rules.push(FieldRule::new("phrt", 0x90, 1, phase_reset));
    rules.push(midi("bdel", 0x91));
    rules.push(FieldRule::flag("btrg", 0x92));
    rules.push(FieldRule::flag("brst", 0x93));

    // SYN page 4
    let offset_scale = Scale::signed_hundredths(-1.0, 1.0);
    for (index, operator) in ["c", "a", "b1", "b2"].into_iter().enumerate() {
        rules.push(FieldRule::scaled(
            &format!("ratio_offset.{operator}"),
            0x94 + index * 2,
            2,
            offset_scale,
        ));
    }
    for (index, operator) in ["a", "b1", "b2"].into_iter().enumerate() {
        rules.push(midi(&format!("key_track.{operator}"), 0x9c + index));
    }
}

fn filter_rules(rules: &mut Vec<FieldRule>) {
    let types = Encoding::labels([
        "Multimode",
        "Lowpass 4",
        "Legacy LP/HP",
        "Comb-",
        "Comb+",
        "Equalizer",
    ]);
    rules.push(FieldRule::new("filter.type", 0xa0, 1, types));
    rules.push(midi("filter.attack", 0xa1));
    rules.push(midi("filter.decay", 0xa2));
    rules.push(midi("filter.sustain", 0xa3));
    rules.push(midi("filter.release", 0xa4));
    rules.push(FieldRule::scaled(
        "filter.frequency",
        0xa5,
        2,
        Scale::hundredths(0.0, 128.0),
    ));
    rules.push(midi("filter.resonance", 0xa7));
    rules.push(bipolar("filter.env_amount", 0xa8));
}

fn amp_rules(rules: &mut Vec<FieldRule>) {
    rules.push(midi("amp.attack", 0xb0));
    rules.push(midi("amp.decay", 0xb1));
    rules.push(midi("amp.sustain", 0xb2));
    rules.push(midi("amp.release", 0xb3));
    rules.push(FieldRule::flag("amp.reset", 0xb4));
    rules.push(FieldRule::new("amp.mode", 0xb5, 1, Encoding::labels(["AD", "ADSR"])));
    rules.push(bipolar("amp.pan", 0xb6));
    rules.push(midi("amp.volume", 0xb7));
}

fn fx_rules(rules: &mut Vec<FieldRule>) {
    let routing = || Encoding::labels(["Pre-filter", "Post-filter"]);
    rules.push(midi("fx.bit_reduction", 0xc0));
    rules.push(midi("fx.overdrive", 0xc1));
    rules.push(midi("fx.sample_rate_reduction", 0xc2));
    rules.push(FieldRule::new("fx.sample_rate_routing", 0xc3, 1, routing()));
    rules.push(midi("fx.delay", 0xc4));
    rules.push(midi("fx.reverb", 0xc5));
    rules.push(midi("fx.chorus", 0xc6));
    rules.push(FieldRule::new("fx.overdrive_routing", 0xc7, 1, routing()));
}

fn lfo_rules(rules: &mut Vec<FieldRule>, lfo: &str, base: usize) {
    let multipliers = Encoding::labels([
        "1", "2", "4", "8", "16", "32", "64", "128", "256", "512", "1k", "2k",
    ]);
    let waveforms = Encoding::labels([
        "Triangle",
        "Sine",
        "Square",
        "Sawtooth",
        "Exponential",
        "Ramp",
        "Random",
    ]);
    let modes = Encoding::labels(["Free", "Trig", "Hold", "One", "Half"]);
    let depth = Scale::signed_hundredths(-64.0, 64.0);

    rules.push(FieldRule::scaled(&format!("{lfo}.speed"), base, 2, depth));
    rules.push(FieldRule::new(&format!("{lfo}.multiplier"), base + 2, 1, multipliers));
    rules.push(bipolar(&format!("{lfo}.fade"), base + 3));
    // Destination codes map to the device's modulation target list.
    rules.push(FieldRule::byte(&format!("{lfo}.destination"), base + 4));
    rules.push(FieldRule::new(&format!("{lfo}.waveform"), base + 5, 1, waveforms));
    rules.push(midi(&format!("{lfo}.start_phase"), base + 6));
    rules.push(FieldRule::new(&format!("{lfo}.mode"), base + 7, 1, modes));
    rules.push(FieldRule::scaled(&format!("{lfo}.depth"), base + 8, 2, depth));
}
