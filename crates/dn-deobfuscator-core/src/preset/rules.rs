use std::fs;
use std::ops::Range;
use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bytes::{ByteOrder, Scale};

use super::builtin;
use super::error::RegistryError;

/// How the bytes of a rule are turned into a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Encoding {
    /// Unsigned integer; an optional scale may only bias it.
    Uint,
    /// Two's complement integer; an optional scale may only bias it.
    Int,
    /// Fixed-point value `(raw + bias) / divisor`; requires a scale.
    Scaled,
    /// Boolean: a single bit when `bit` is set, otherwise raw != 0.
    Flag {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bit: Option<u8>,
    },
    /// Enumeration over a byte; `labels[raw - base]`.
    Enum {
        labels: Vec<String>,
        #[serde(default)]
        base: i64,
    },
    /// Fixed-length ISO-8859-1 text.
    Ascii,
}

impl Encoding {
    pub fn labels<const N: usize>(labels: [&str; N]) -> Self {
        Encoding::Enum {
            labels: labels.iter().map(|label| label.to_string()).collect(),
            base: 0,
        }
    }

    fn is_integer(&self) -> bool {
        !matches!(self, Encoding::Ascii)
    }
}

/// Declarative decoding rule for one named parameter.
///
/// Dotted names (`filter.attack`) place the field in a structured record.
///
/// # Examples
/// ```
/// use dn_deobfuscator_core::{FieldRule, Scale};
///
/// let fdbk = FieldRule::byte("fdbk", 0x83).with_scale(Scale::bounded(0.0, 127.0));
/// assert_eq!(fdbk.span(), 0x83..0x84);
/// assert_eq!(fdbk.record(), None);
/// assert_eq!(FieldRule::byte("filter.attack", 0xa1).record(), Some("filter"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    pub name: String,
    pub offset: usize,
    pub width: usize,
    pub encoding: Encoding,
    #[serde(default)]
    pub byte_order: ByteOrder,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Scale>,
}

impl FieldRule {
    pub fn new(name: &str, offset: usize, width: usize, encoding: Encoding) -> Self {
        Self {
            name: name.to_string(),
            offset,
            width,
            encoding,
            byte_order: ByteOrder::Big,
            scale: None,
        }
    }

    /// Single unsigned byte.
    pub fn byte(name: &str, offset: usize) -> Self {
        Self::new(name, offset, 1, Encoding::Uint)
    }

    pub fn flag(name: &str, offset: usize) -> Self {
        Self::new(name, offset, 1, Encoding::Flag { bit: None })
    }

    pub fn scaled(name: &str, offset: usize, width: usize, scale: Scale) -> Self {
        Self::new(name, offset, width, Encoding::Scaled).with_scale(scale)
    }

    pub fn with_scale(mut self, scale: Scale) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn with_byte_order(mut self, order: ByteOrder) -> Self {
        self.byte_order = order;
        self
    }

    pub fn span(&self) -> Range<usize> {
        self.offset..self.offset.saturating_add(self.width)
    }

    /// Record prefix of a dotted name.
    pub fn record(&self) -> Option<&str> {
        self.name.split_once('.').map(|(record, _)| record)
    }

    pub fn validate(&self) -> Result<(), RegistryError> {
        let invalid = |reason: &str| RegistryError::InvalidRule {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.name.trim().is_empty() {
            return Err(invalid("empty name"));
        }
        if self.width == 0 {
            return Err(invalid("width must be at least 1"));
        }
        if self.encoding.is_integer() && self.width > 8 {
            return Err(invalid("integer width above 8 bytes"));
        }
        if let Some(scale) = &self.scale {
            if scale.divisor == 0.0 || !scale.divisor.is_finite() {
                return Err(invalid("divisor must be finite and non-zero"));
            }
            if let (Some(min), Some(max)) = (scale.min, scale.max) {
                if min > max {
                    return Err(invalid("min above max"));
                }
            }
        }
        match &self.encoding {
            Encoding::Scaled if self.scale.is_none() => Err(invalid("scaled rule without scale")),
            Encoding::Uint | Encoding::Int
                if self.scale.is_some_and(|scale| !scale.is_integral()) =>
            {
                Err(invalid("integer rule with fractional divisor; use scaled"))
            }
            Encoding::Flag { bit: Some(bit) } if usize::from(*bit) >= self.width * 8 => {
                Err(invalid("flag bit outside rule width"))
            }
            Encoding::Enum { labels, .. } if labels.is_empty() => {
                Err(invalid("enum without labels"))
            }
            _ => Ok(()),
        }
    }
}

/// Approximate byte range known to hold a parameter cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionHint {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

impl RegionHint {
    pub fn new(name: &str, range: Range<usize>) -> Self {
        Self {
            name: name.to_string(),
            start: range.start,
            end: range.end,
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Ordered, validated set of field rules plus region hints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleRegistry {
    version: u32,
    rules: Vec<FieldRule>,
    regions: Vec<RegionHint>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OverlayFile {
    Rules(Vec<FieldRule>),
    Full {
        #[serde(default)]
        version: Option<u32>,
        #[serde(default)]
        rules: Vec<FieldRule>,
        #[serde(default)]
        regions: Vec<RegionHint>,
    },
}

static BUILTIN: OnceLock<RuleRegistry> = OnceLock::new();

impl RuleRegistry {
    pub fn new(
        version: u32,
        rules: Vec<FieldRule>,
        regions: Vec<RegionHint>,
    ) -> Result<Self, RegistryError> {
        for rule in &rules {
            rule.validate()?;
        }
        for region in &regions {
            if region.start > region.end {
                return Err(RegistryError::InvalidRule {
                    name: region.name.clone(),
                    reason: "region start above end".to_string(),
                });
            }
        }
        Ok(Self {
            version,
            rules,
            regions,
        })
    }

    /// The built-in registry, initialised on first use and read-only after.
    ///
    /// # Examples
    /// ```
    /// use dn_deobfuscator_core::RuleRegistry;
    ///
    /// let registry = RuleRegistry::builtin();
    /// assert_eq!(registry.rule("algo").unwrap().offset, 0x69);
    /// assert_eq!(registry.rule("fdbk").unwrap().offset, 0x83);
    /// ```
    pub fn builtin() -> &'static RuleRegistry {
        BUILTIN.get_or_init(|| RuleRegistry {
            version: builtin::VERSION,
            rules: builtin::rules(),
            regions: builtin::regions(),
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    pub fn regions(&self) -> &[RegionHint] {
        &self.regions
    }

    pub fn rule(&self, name: &str) -> Option<&FieldRule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    pub fn region(&self, name: &str) -> Option<&RegionHint> {
        self.regions.iter().find(|region| region.name == name)
    }

    /// Copy of this registry with overlay rules applied: a rule with an
    /// existing name replaces it in place, new names are appended.
    pub fn with_overlay(
        &self,
        rules: Vec<FieldRule>,
        regions: Vec<RegionHint>,
    ) -> Result<Self, RegistryError> {
        let mut merged = self.clone();
        for rule in rules {
            rule.validate()?;
            match merged.rules.iter_mut().find(|existing| existing.name == rule.name) {
                Some(existing) => {
                    debug!(rule = %rule.name, "overlay replaces rule");
                    *existing = rule;
                }
                None => merged.rules.push(rule),
            }
        }
        for region in regions {
            match merged
                .regions
                .iter_mut()
                .find(|existing| existing.name == region.name)
            {
                Some(existing) => *existing = region,
                None => merged.regions.push(region),
            }
        }
        Ok(merged)
    }

    /// Layer a JSON overlay: either an array of rules or an object with
    /// `rules`, `regions` and an optional `version`.
    pub fn with_json_overlay(&self, json: &str) -> Result<Self, RegistryError> {
        let (version, rules, regions) = match serde_json::from_str(json)? {
            OverlayFile::Rules(rules) => (None, rules, Vec::new()),
            OverlayFile::Full {
                version,
                rules,
                regions,
            } => (version, rules, regions),
        };
        let mut merged = self.with_overlay(rules, regions)?;
        if let Some(version) = version {
            merged.version = version;
        }
        Ok(merged)
    }

    /// Built-in registry extended with the overlay file at `path`.
    pub fn load_overlay(path: &Path) -> Result<Self, RegistryError> {
        let json = fs::read_to_string(path)?;
        Self::builtin().with_json_overlay(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::{Encoding, FieldRule, RegionHint, RuleRegistry};
    use crate::bytes::{ByteOrder, Scale};
    use crate::preset::error::RegistryError;

    #[test]
    fn builtin_rules_are_valid_and_unique() {
        let registry = RuleRegistry::builtin();
        let mut names = Vec::new();
        for rule in registry.rules() {
            rule.validate().unwrap();
            assert!(!names.contains(&rule.name), "duplicate rule {}", rule.name);
            names.push(rule.name.clone());
        }
        assert!(registry.region("filter").is_some());
        assert!(registry.region("lfo").is_some());
    }

    #[test]
    fn builtin_anchors_are_pinned() {
        let registry = RuleRegistry::builtin();
        let algo = registry.rule("algo").unwrap();
        assert_eq!((algo.offset, algo.width), (0x69, 1));
        let fdbk = registry.rule("fdbk").unwrap();
        assert_eq!((fdbk.offset, fdbk.width), (0x83, 1));
        assert_eq!(registry.region("filter").unwrap().range(), 0xa0..0xb0);
        assert_eq!(registry.region("amp").unwrap().range(), 0xb0..0xc0);
        assert_eq!(registry.region("fx").unwrap().range(), 0xc0..0xd0);
        assert_eq!(registry.region("lfo").unwrap().range(), 0xd0..0xf0);
    }

    #[test]
    fn overlay_replaces_and_appends() {
        let base = RuleRegistry::builtin();
        let merged = base
            .with_json_overlay(
                r#"{
                    "version": 7,
                    "rules": [
                        {"name": "fdbk", "offset": 132, "width": 1, "encoding": {"kind": "uint"}},
                        {"name": "filter.base", "offset": 169, "width": 2,
                         "encoding": {"kind": "scaled"}, "byte_order": "little",
                         "scale": {"divisor": 10.0}}
                    ],
                    "regions": [{"name": "mod", "start": 240, "end": 256}]
                }"#,
            )
            .unwrap();
        assert_eq!(merged.version(), 7);
        assert_eq!(merged.rules().len(), base.rules().len() + 1);
        let position = |registry: &RuleRegistry, name: &str| {
            registry.rules().iter().position(|rule| rule.name == name)
        };
        assert_eq!(position(&merged, "fdbk"), position(base, "fdbk"));
        assert_eq!(merged.rule("fdbk").unwrap().offset, 132);
        let added = merged.rule("filter.base").unwrap();
        assert_eq!(added.byte_order, ByteOrder::Little);
        assert_eq!(merged.region("mod").unwrap().range(), 240..256);
        assert_eq!(base.rule("fdbk").unwrap().offset, 0x83);
    }

    #[test]
    fn overlay_accepts_bare_rule_array() {
        let merged = RuleRegistry::builtin()
            .with_json_overlay(
                r#"[{"name": "osc.wave", "offset": 240, "width": 1,
                     "encoding": {"kind": "enum", "labels": ["SIN", "SAW"]}}]"#,
            )
            .unwrap();
        assert!(merged.rule("osc.wave").is_some());
    }

    #[test]
    fn invalid_rules_are_rejected() {
        let cases = [
            FieldRule::new("", 0, 1, Encoding::Uint),
            FieldRule::new("wide", 0, 9, Encoding::Uint),
            FieldRule::new("zero", 0, 0, Encoding::Uint),
            FieldRule::new("noscale", 0, 2, Encoding::Scaled),
            FieldRule::new("bit", 0, 1, Encoding::Flag { bit: Some(8) }),
            FieldRule::new("labels", 0, 1, Encoding::Enum { labels: vec![], base: 0 }),
            FieldRule::byte("fraction", 0).with_scale(Scale::hundredths(0.0, 1.0)),
            FieldRule::scaled(
                "div",
                0,
                2,
                Scale {
                    divisor: 0.0,
                    ..Scale::default()
                },
            ),
        ];
        for rule in cases {
            let err = RuleRegistry::new(1, vec![rule], Vec::new()).unwrap_err();
            assert!(matches!(err, RegistryError::InvalidRule { .. }));
        }
    }

    #[test]
    fn invalid_region_is_rejected() {
        let region = RegionHint {
            name: "bad".to_string(),
            start: 10,
            end: 2,
        };
        assert!(RuleRegistry::new(1, Vec::new(), vec![region]).is_err());
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = RuleRegistry::builtin().with_json_overlay("{").unwrap_err();
        assert!(matches!(err, RegistryError::Json(_)));
    }

    #[test]
    fn ascii_rules_may_be_wide() {
        let rule = FieldRule::new("name", 0, 16, Encoding::Ascii);
        rule.validate().unwrap();
    }
}
