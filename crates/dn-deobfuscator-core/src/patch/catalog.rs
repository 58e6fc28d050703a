use std::collections::BTreeMap;

use crate::sysex::SysExError;

use super::parser::Patch;

/// Patches in scan order, plus what the scan could not use.
///
/// Appending never deduplicates: the same name coming from two dumps shows
/// up twice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchCatalog<'a> {
    pub patches: Vec<Patch<'a>>,
    /// Messages cut short in the stream.
    pub truncated: Vec<SysExError>,
    /// Well-formed messages that matched no patch signature.
    pub skipped: usize,
}

impl<'a> PatchCatalog<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Patch<'a>> {
        self.patches.iter()
    }

    /// Moves every entry of `other` after the entries of `self`.
    pub fn append(&mut self, mut other: PatchCatalog<'a>) {
        self.patches.append(&mut other.patches);
        self.truncated.append(&mut other.truncated);
        self.skipped += other.skipped;
    }

    /// Patches grouped by `(bank, slot)`, scan order kept within a group.
    pub fn by_slot(&self) -> BTreeMap<(u8, u8), Vec<&Patch<'a>>> {
        let mut groups: BTreeMap<(u8, u8), Vec<&Patch<'a>>> = BTreeMap::new();
        for patch in &self.patches {
            groups.entry((patch.bank, patch.slot)).or_default().push(patch);
        }
        groups
    }

    pub fn malformed(&self) -> impl Iterator<Item = &Patch<'a>> {
        self.patches.iter().filter(|patch| patch.is_malformed())
    }
}

impl<'c, 'a> IntoIterator for &'c PatchCatalog<'a> {
    type Item = &'c Patch<'a>;
    type IntoIter = std::slice::Iter<'c, Patch<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.patches.iter()
    }
}
