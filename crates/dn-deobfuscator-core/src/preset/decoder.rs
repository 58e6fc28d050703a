use std::ops::Range;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::bytes::{ByteReader, ReadError};

use super::error::GapReason;
use super::rules::{Encoding, FieldRule, RuleRegistry};

/// Decoded human value of a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Label(String),
    Text(String),
}

impl FieldValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(value) => Some(*value as f64),
            FieldValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Label(value) | FieldValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

/// A field that decoded cleanly, with its raw bytes kept alongside.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedField<'a> {
    pub name: String,
    pub offset: usize,
    pub width: usize,
    #[serde(serialize_with = "serialize_hex")]
    pub raw: &'a [u8],
    /// Integer read before scaling (0 for text fields).
    pub raw_value: i64,
    pub value: FieldValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<(f64, f64)>,
}

impl DecodedField<'_> {
    pub fn span(&self) -> Range<usize> {
        self.offset..self.offset + self.width
    }

    /// Name relative to its record (`filter.attack` -> `attack`).
    pub fn short_name(&self) -> &str {
        self.name
            .split_once('.')
            .map_or(self.name.as_str(), |(_, rest)| rest)
    }
}

/// A rule that could not be decoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodeGap {
    pub name: String,
    pub offset: usize,
    pub width: usize,
    pub reason: GapReason,
}

/// Result of applying one rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FieldOutcome<'a> {
    Decoded(DecodedField<'a>),
    Gap(DecodeGap),
}

impl FieldOutcome<'_> {
    pub fn name(&self) -> &str {
        match self {
            FieldOutcome::Decoded(field) => &field.name,
            FieldOutcome::Gap(gap) => &gap.name,
        }
    }
}

/// Bytes of a region hint, clamped to the buffer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionView<'a> {
    pub name: String,
    pub start: usize,
    pub end: usize,
    #[serde(serialize_with = "serialize_hex")]
    pub bytes: &'a [u8],
}

/// Every rule outcome for one preset blob, in registry order.
#[derive(Debug, Clone)]
pub struct DecodedPreset<'a> {
    source: &'a [u8],
    outcomes: Vec<FieldOutcome<'a>>,
    regions: Vec<RegionView<'a>>,
}

impl<'a> DecodedPreset<'a> {
    pub fn source(&self) -> &'a [u8] {
        self.source
    }

    pub fn outcomes(&self) -> &[FieldOutcome<'a>] {
        &self.outcomes
    }

    pub fn fields(&self) -> impl Iterator<Item = &DecodedField<'a>> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            FieldOutcome::Decoded(field) => Some(field),
            FieldOutcome::Gap(_) => None,
        })
    }

    pub fn gaps(&self) -> impl Iterator<Item = &DecodeGap> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            FieldOutcome::Gap(gap) => Some(gap),
            FieldOutcome::Decoded(_) => None,
        })
    }

    pub fn outcome(&self, name: &str) -> Option<&FieldOutcome<'a>> {
        self.outcomes.iter().find(|outcome| outcome.name() == name)
    }

    pub fn get(&self, name: &str) -> Option<&DecodedField<'a>> {
        self.fields().find(|field| field.name == name)
    }

    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.get(name).map(|field| &field.value)
    }

    /// Decoded fields of a structured record such as `filter` or
    /// `a_envelope`.
    pub fn record(&self, record: &str) -> Vec<&DecodedField<'a>> {
        self.fields()
            .filter(|field| {
                field
                    .name
                    .split_once('.')
                    .is_some_and(|(prefix, _)| prefix == record)
            })
            .collect()
    }

    pub fn regions(&self) -> &[RegionView<'a>] {
        &self.regions
    }

    pub fn region(&self, name: &str) -> Option<&RegionView<'a>> {
        self.regions.iter().find(|region| region.name == name)
    }

    /// Byte spans read by decoded fields, sorted and merged.
    pub fn consumed_ranges(&self) -> Vec<Range<usize>> {
        let mut spans: Vec<Range<usize>> = self.fields().map(DecodedField::span).collect();
        spans.sort_by_key(|span| (span.start, span.end));
        let mut merged: Vec<Range<usize>> = Vec::with_capacity(spans.len());
        for span in spans {
            match merged.last_mut() {
                Some(last) if span.start <= last.end => last.end = last.end.max(span.end),
                _ => merged.push(span),
            }
        }
        merged
    }

    /// Byte ranges no decoded field covers; candidates for new rules.
    pub fn unmapped_ranges(&self) -> Vec<Range<usize>> {
        let mut unmapped = Vec::new();
        let mut cursor = 0;
        for span in self.consumed_ranges() {
            if span.start > cursor {
                unmapped.push(cursor..span.start);
            }
            cursor = cursor.max(span.end);
        }
        if cursor < self.source.len() {
            unmapped.push(cursor..self.source.len());
        }
        unmapped
    }

    /// JSON document: flat field list, nested value records, gaps,
    /// unmapped ranges and region views.
    pub fn to_json(&self) -> Value {
        let mut values = Map::new();
        for field in self.fields() {
            let value = serde_json::to_value(&field.value).unwrap_or(Value::Null);
            match field.name.split_once('.') {
                Some((record, key)) => {
                    let entry = values
                        .entry(record.to_string())
                        .or_insert_with(|| Value::Object(Map::new()));
                    if let Value::Object(map) = entry {
                        map.insert(key.to_string(), value);
                    }
                }
                None => {
                    values.insert(field.name.clone(), value);
                }
            }
        }
        let unmapped: Vec<Value> = self
            .unmapped_ranges()
            .into_iter()
            .map(|range| json!({ "start": range.start, "end": range.end }))
            .collect();

        json!({
            "length": self.source.len(),
            "values": values,
            "fields": self.outcomes,
            "gaps": self.gaps().collect::<Vec<_>>(),
            "unmapped": unmapped,
            "regions": self.regions,
        })
    }
}

/// Decode `blob` against every rule of `registry`.
///
/// Never fails: rules that overrun the buffer or produce invalid values
/// become gaps and the remaining rules are still applied.
///
/// # Examples
/// ```
/// use dn_deobfuscator_core::{FieldValue, RuleRegistry, decode_preset};
///
/// let mut blob = vec![0u8; 0x100];
/// blob[0x69] = 7;
/// blob[0x83] = 85;
/// let preset = decode_preset(&blob, RuleRegistry::builtin());
/// assert_eq!(preset.value("algo"), Some(&FieldValue::Int(7)));
/// assert_eq!(preset.value("fdbk"), Some(&FieldValue::Int(85)));
///
/// let short = decode_preset(&blob[..0x80], RuleRegistry::builtin());
/// assert!(short.get("fdbk").is_none());
/// assert!(short.get("algo").is_some());
/// ```
pub fn decode_preset<'a>(blob: &'a [u8], registry: &RuleRegistry) -> DecodedPreset<'a> {
    let reader = ByteReader::new(blob);
    let outcomes: Vec<FieldOutcome<'a>> = registry
        .rules()
        .iter()
        .map(|rule| match decode_rule(&reader, rule) {
            Ok(field) => FieldOutcome::Decoded(field),
            Err(reason) => {
                debug!(rule = %rule.name, offset = rule.offset, %reason, "decode gap");
                FieldOutcome::Gap(DecodeGap {
                    name: rule.name.clone(),
                    offset: rule.offset,
                    width: rule.width,
                    reason,
                })
            }
        })
        .collect();

    let regions = registry
        .regions()
        .iter()
        .filter(|hint| hint.start < blob.len())
        .map(|hint| {
            let end = hint.end.min(blob.len());
            RegionView {
                name: hint.name.clone(),
                start: hint.start,
                end,
                bytes: &blob[hint.start..end],
            }
        })
        .collect();

    let preset = DecodedPreset {
        source: blob,
        outcomes,
        regions,
    };
    let gaps = preset.gaps().count();
    if gaps > 0 {
        warn!(
            gaps,
            rules = registry.rules().len(),
            bytes = blob.len(),
            "preset decoded with gaps"
        );
    }
    preset
}

fn decode_rule<'a>(reader: &ByteReader<'a>, rule: &FieldRule) -> Result<DecodedField<'a>, GapReason> {
    let raw = reader
        .read_bytes(rule.offset, rule.width)
        .map_err(|err| gap_from_read(err, rule))?;

    let (raw_value, value) = match &rule.encoding {
        Encoding::Ascii => {
            let text = reader
                .read_fixed_string(rule.offset, rule.width)
                .map_err(|err| gap_from_read(err, rule))?;
            (0, FieldValue::Text(sanitize_text(&text)))
        }
        Encoding::Uint | Encoding::Int => {
            let signed = matches!(rule.encoding, Encoding::Int);
            let raw_value = reader
                .read_raw(rule.offset, rule.width, rule.byte_order, signed)
                .map_err(|err| gap_from_read(err, rule))?;
            let bias = rule.scale.map_or(0, |scale| scale.bias);
            let value = raw_value.checked_add(bias).ok_or(GapReason::Overflow {
                raw: raw_value,
                adjust: bias,
            })?;
            (raw_value, FieldValue::Int(value))
        }
        Encoding::Scaled => {
            let scale = rule.scale.unwrap_or_default();
            let raw_value = reader
                .read_raw(rule.offset, rule.width, rule.byte_order, scale.signed)
                .map_err(|err| gap_from_read(err, rule))?;
            let value = scale.apply(raw_value).ok_or(GapReason::Overflow {
                raw: raw_value,
                adjust: scale.bias,
            })?;
            (raw_value, FieldValue::Float(value))
        }
        Encoding::Flag { bit } => {
            let raw_value = reader
                .read_raw(rule.offset, rule.width, rule.byte_order, false)
                .map_err(|err| gap_from_read(err, rule))?;
            let set = match bit {
                Some(bit) => (raw_value >> bit) & 1 == 1,
                None => raw_value != 0,
            };
            (raw_value, FieldValue::Bool(set))
        }
        Encoding::Enum { labels, base } => {
            let raw_value = reader
                .read_raw(rule.offset, rule.width, rule.byte_order, false)
                .map_err(|err| gap_from_read(err, rule))?;
            let index = raw_value.checked_sub(*base).ok_or(GapReason::Overflow {
                raw: raw_value,
                adjust: *base,
            })?;
            let label = usize::try_from(index)
                .ok()
                .and_then(|index| labels.get(index))
                .ok_or(GapReason::UnknownEnumValue { raw: raw_value })?;
            (raw_value, FieldValue::Label(label.clone()))
        }
    };

    let range = rule.scale.and_then(|scale| scale.min.zip(scale.max));
    if let (Some(scale), Some(numeric)) = (rule.scale, value.as_f64()) {
        if !scale.contains(numeric) {
            return Err(GapReason::OutOfDeclaredRange {
                value: numeric,
                min: scale.min.unwrap_or(f64::NEG_INFINITY),
                max: scale.max.unwrap_or(f64::INFINITY),
            });
        }
    }

    Ok(DecodedField {
        name: rule.name.clone(),
        offset: rule.offset,
        width: rule.width,
        raw,
        raw_value,
        value,
        range,
    })
}

fn gap_from_read(err: ReadError, rule: &FieldRule) -> GapReason {
    match err {
        ReadError::OutOfRange { len, .. } => GapReason::OutOfRange {
            end: rule.offset.saturating_add(rule.width),
            len,
        },
        ReadError::InvalidWidth { width } => GapReason::InvalidWidth { width },
        ReadError::Overflow { raw, adjust, .. } => GapReason::Overflow { raw, adjust },
    }
}

fn sanitize_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '.' })
        .collect()
}

fn serialize_hex<S: Serializer>(bytes: &&[u8], serializer: S) -> Result<S::Ok, S::Error> {
    let hex = bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ");
    serializer.serialize_str(&hex)
}
