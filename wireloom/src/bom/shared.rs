//! Project-wide BOM shared by all harnesses, plus per-harness multipliers.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use super::{BomEntry, BomKey, HarnessBom};
use crate::core::HarnessError;
use crate::model::NumberAndUnit;

/// Shared BOM. Ids are assigned in first-seen order across merges and are
/// never reused.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SharedBom {
    entries: Vec<BomEntry>,
    #[serde(skip)]
    index: HashMap<BomKey, usize>,
}

impl SharedBom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a harness BOM. Matching entries add their quantity and
    /// designators; new keys get the next free id. The harness BOM is
    /// rewritten to the shared ids. On error nothing is merged.
    pub fn merge(&mut self, bom: &mut HarnessBom) -> Result<(), HarnessError> {
        let mut staged = self.clone();
        let mut mapping = HashMap::with_capacity(bom.entries.len());

        let mut seen: HashSet<&BomKey> = HashSet::with_capacity(bom.entries.len());
        for entry in &bom.entries {
            if !seen.insert(&entry.key) {
                return Err(HarnessError::IdentityStability(format!(
                    "{} appears more than once in the BOM of {}",
                    entry.key.description, bom.harness
                )));
            }
            let pos = match staged.index.get(&entry.key) {
                Some(&pos) => {
                    let shared = &mut staged.entries[pos];
                    shared.qty = shared.qty.try_add(&entry.qty)?;
                    shared.designators.extend(entry.designators.iter().cloned());
                    pos
                }
                None => {
                    let mut shared = entry.clone();
                    shared.id = staged.entries.len() + 1;
                    shared.per_harness.clear();
                    shared.scaled = false;
                    staged.index.insert(entry.key.clone(), staged.entries.len());
                    staged.entries.push(shared);
                    staged.entries.len() - 1
                }
            };
            let shared = &mut staged.entries[pos];
            shared.add_harness_qty(&bom.harness, &entry.qty)?;
            mapping.insert(entry.id, shared.id);
        }

        *self = staged;
        bom.reassign_ids(&mapping);
        tracing::debug!(
            "merged {} into shared BOM ({} entries)",
            bom.harness,
            self.entries.len()
        );
        Ok(())
    }

    /// Replace every entry quantity with `Σ per-harness qty × multiplier`.
    pub fn rescale(&mut self, table: &QtyMultiplierTable) -> Result<(), HarnessError> {
        let mut staged = self.entries.clone();
        for entry in &mut staged {
            if entry.scaled {
                tracing::warn!("BOM entry {} is already scaled", entry.id);
            }
            let mut qty = NumberAndUnit::new(0.0, entry.qty.unit.as_deref());
            for contribution in &mut entry.per_harness {
                let multiplier = table.multiplier_for(&contribution.harness)?;
                contribution.qty = contribution.qty.scale(multiplier);
                qty = qty.try_add(&contribution.qty)?;
            }
            entry.qty = qty;
            entry.scaled = true;
        }
        self.entries = staged;
        Ok(())
    }

    pub fn entries(&self) -> &[BomEntry] {
        &self.entries
    }

    pub fn get(&self, id: usize) -> Option<&BomEntry> {
        id.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    pub fn find(&self, key: &BomKey) -> Option<&BomEntry> {
        self.index.get(key).map(|&pos| &self.entries[pos])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-harness quantity multipliers, keyed by harness name suffix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QtyMultiplierTable {
    pub multipliers: BTreeMap<String, f64>,
}

impl QtyMultiplierTable {
    /// Load a JSON object mapping harness name suffixes to multipliers.
    pub fn from_file(path: &Path) -> Result<Self, HarnessError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, HarnessError> {
        serde_json::from_str(text).map_err(|e| HarnessError::Parse(e.to_string()))
    }

    /// Multiplier for a harness: exactly one table key must be a suffix of its name.
    pub fn multiplier_for(&self, harness: &str) -> Result<f64, HarnessError> {
        let matches: Vec<(&String, &f64)> = self
            .multipliers
            .iter()
            .filter(|(suffix, _)| harness.ends_with(suffix.as_str()))
            .collect();
        match matches.as_slice() {
            [(_, &multiplier)] => Ok(multiplier),
            [] => Err(HarnessError::MultiplierConfiguration(format!(
                "no multiplier found for harness {}",
                harness
            ))),
            many => Err(HarnessError::MultiplierConfiguration(format!(
                "conflicting multipliers for harness {}: {}",
                harness,
                many.iter()
                    .map(|(suffix, _)| suffix.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bom::HarnessQty;
    use crate::model::{BomCategory, PartNumberInfo};
    use std::collections::BTreeSet;

    fn entry(id: usize, description: &str, qty: f64) -> BomEntry {
        BomEntry {
            id,
            key: BomKey::new(PartNumberInfo::default(), description),
            category: BomCategory::Connector,
            qty: NumberAndUnit::unitless(qty),
            designators: BTreeSet::from(["X1".to_string()]),
            per_harness: Vec::new(),
            scaled: false,
        }
    }

    fn harness_bom(name: &str, entries: Vec<BomEntry>) -> HarnessBom {
        HarnessBom {
            harness: name.to_string(),
            entries,
            bom_ids: BTreeMap::from([("X1".to_string(), vec![1])]),
        }
    }

    #[test]
    fn test_merge_assigns_global_ids() {
        let mut shared = SharedBom::new();
        let mut a = harness_bom("A", vec![entry(1, "Connector, a", 1.0), entry(2, "Connector, b", 2.0)]);
        let mut b = harness_bom("B", vec![entry(1, "Connector, b", 3.0), entry(2, "Connector, c", 1.0)]);
        shared.merge(&mut a).unwrap();
        shared.merge(&mut b).unwrap();

        assert_eq!(shared.len(), 3);
        assert_eq!(shared.get(2).unwrap().qty.number, 5.0);
        assert_eq!(shared.get(3).unwrap().description(), "Connector, c");
        assert_eq!(b.entries[0].id, 2);
        assert_eq!(b.entries[1].id, 3);
        assert_eq!(b.bom_ids["X1"], vec![2]);
        assert_eq!(
            shared.get(2).unwrap().per_harness,
            vec![
                HarnessQty { harness: "A".into(), qty: NumberAndUnit::unitless(2.0) },
                HarnessQty { harness: "B".into(), qty: NumberAndUnit::unitless(3.0) },
            ]
        );
    }

    #[test]
    fn test_failed_merge_leaves_shared_untouched() {
        let mut shared = SharedBom::new();
        let mut a = harness_bom("A", vec![entry(1, "Wire", 1.0), entry(2, "Tape", 1.0)]);
        a.entries[1].qty = NumberAndUnit::new(1.0, Some("m"));
        shared.merge(&mut a).unwrap();

        let mut tape = entry(2, "Tape", 2.0);
        tape.qty = NumberAndUnit::new(2.0, Some("ft"));
        let mut b = harness_bom("B", vec![entry(1, "Wire", 4.0), tape]);
        assert!(matches!(
            shared.merge(&mut b),
            Err(HarnessError::UnitMismatch { .. })
        ));
        assert_eq!(shared.len(), 2);
        assert_eq!(shared.get(1).unwrap().qty.number, 1.0);
        assert_eq!(shared.get(1).unwrap().per_harness.len(), 1);
    }

    #[test]
    fn test_duplicate_key_in_harness_bom() {
        let mut shared = SharedBom::new();
        let mut a = harness_bom("A", vec![entry(1, "Connector, a", 1.0)]);
        shared.merge(&mut a).unwrap();

        let mut b = harness_bom("B", vec![entry(1, "Connector, a", 1.0), entry(2, "Connector, a", 2.0)]);
        assert!(matches!(
            shared.merge(&mut b),
            Err(HarnessError::IdentityStability(_))
        ));
        assert_eq!(shared.get(1).unwrap().qty.number, 1.0);
        assert_eq!(b.entries[1].id, 2);
    }

    #[test]
    fn test_rescale_by_suffix() {
        let mut shared = SharedBom::new();
        let mut a = harness_bom("main_A", vec![entry(1, "Connector, a", 2.0)]);
        let mut b = harness_bom("main_B", vec![entry(1, "Connector, a", 1.0)]);
        shared.merge(&mut a).unwrap();
        shared.merge(&mut b).unwrap();

        let table = QtyMultiplierTable::from_json(r#"{"_A": 10, "_B": 3}"#).unwrap();
        shared.rescale(&table).unwrap();
        assert_eq!(shared.get(1).unwrap().qty.number, 23.0);
    }

    #[test]
    fn test_multiplier_lookup_errors() {
        let table = QtyMultiplierTable::from_json(r#"{"A": 1, "_A": 2}"#).unwrap();
        assert!(table.multiplier_for("main_B").is_err());
        assert!(table.multiplier_for("main_A").is_err());
        assert!(QtyMultiplierTable::from_json("[1, 2]").is_err());
    }
}
