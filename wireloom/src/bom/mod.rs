//! BOM Aggregator
//!
//! Builds the per-harness bill of materials from a finalized harness:
//! every procurable item is keyed by its part identity and description,
//! equal keys are merged (quantities add, designators union), and the
//! result is sorted by category and description.

pub mod render;
pub mod shared;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::core::HarnessError;
use crate::harness::Harness;
use crate::model::{
    BomCategory, Cable, CableMetric, Component, Connector, ConnectorMetric, NumberAndUnit,
    PartNumberInfo, QtyMultiplier, Wire,
};

pub use render::{bom_rows, rows_to_tsv, BomRenderOptions};
pub use shared::{QtyMultiplierTable, SharedBom};

/// Aggregation identity of a BOM line. Never mutated once inserted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BomKey {
    #[serde(flatten)]
    pub partnumbers: PartNumberInfo,
    pub description: String,
}

impl BomKey {
    pub fn new(partnumbers: PartNumberInfo, description: impl Into<String>) -> Self {
        Self {
            partnumbers,
            description: description.into(),
        }
    }
}

/// Identity of a designated item: a single key, or one per wire for bundles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemKey {
    Single(BomKey),
    Bundle(Vec<BomKey>),
}

/// Quantity contributed by one harness to a shared entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessQty {
    pub harness: String,
    pub qty: NumberAndUnit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomEntry {
    pub id: usize,
    #[serde(flatten)]
    pub key: BomKey,
    pub category: BomCategory,
    pub qty: NumberAndUnit,
    pub designators: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub per_harness: Vec<HarnessQty>,
    #[serde(skip)]
    pub(crate) scaled: bool,
}

impl BomEntry {
    fn new(key: BomKey, category: BomCategory, qty: NumberAndUnit) -> Self {
        Self {
            id: 0,
            key,
            category,
            qty,
            designators: BTreeSet::new(),
            per_harness: Vec::new(),
            scaled: false,
        }
    }

    pub fn description(&self) -> &str {
        &self.key.description
    }

    pub fn partnumbers(&self) -> &PartNumberInfo {
        &self.key.partnumbers
    }

    /// Record a harness contribution; repeated merges of one harness add up.
    pub fn add_harness_qty(&mut self, harness: &str, qty: &NumberAndUnit) -> Result<(), HarnessError> {
        match self.per_harness.iter_mut().find(|h| h.harness == harness) {
            Some(existing) => existing.qty = existing.qty.try_add(qty)?,
            None => self.per_harness.push(HarnessQty {
                harness: harness.to_string(),
                qty: qty.clone(),
            }),
        }
        Ok(())
    }
}

/// Owner of an additional component, which decides the multipliers it may use.
#[derive(Debug, Clone, Copy)]
pub enum MultiplierOwner<'a> {
    Connector(&'a Connector),
    Cable(&'a Cable),
    TopLevel,
}

/// Everything that can land in a BOM.
#[derive(Debug, Clone, Copy)]
pub enum BomItem<'a> {
    Connector(&'a Connector),
    Cable(&'a Cable),
    Wire(&'a Cable, &'a Wire),
    Shield(&'a Cable, &'a Wire),
    Additional(&'a Component, MultiplierOwner<'a>),
}

/// Items of a harness in aggregation order: connectors, non-bundle cables,
/// bundle wires, top-level additional items, then sub-components.
pub fn enumerate_items(harness: &Harness) -> Vec<BomItem<'_>> {
    let mut items: Vec<BomItem<'_>> = harness.connectors.values().map(BomItem::Connector).collect();
    items.extend(
        harness
            .cables
            .values()
            .filter(|c| !c.is_bundle())
            .map(BomItem::Cable),
    );
    for cable in harness.cables.values().filter(|c| c.is_bundle()) {
        for wire in &cable.wires {
            if wire.is_shield {
                items.push(BomItem::Shield(cable, wire));
            } else {
                items.push(BomItem::Wire(cable, wire));
            }
        }
    }
    items.extend(
        harness
            .additional_items
            .iter()
            .map(|c| BomItem::Additional(c, MultiplierOwner::TopLevel)),
    );
    for connector in harness.connectors.values() {
        items.extend(
            connector
                .additional_components
                .iter()
                .map(|c| BomItem::Additional(c, MultiplierOwner::Connector(connector))),
        );
    }
    for cable in harness.cables.values() {
        items.extend(
            cable
                .additional_components
                .iter()
                .map(|c| BomItem::Additional(c, MultiplierOwner::Cable(cable))),
        );
    }
    items
}

pub fn item_key(item: &BomItem<'_>) -> BomKey {
    match item {
        BomItem::Connector(c) => BomKey::new(c.partnumbers.clone(), c.description()),
        BomItem::Cable(c) => BomKey::new(c.partnumbers.clone(), c.description()),
        BomItem::Wire(_, w) | BomItem::Shield(_, w) => {
            BomKey::new(w.partnumbers.clone(), w.description())
        }
        BomItem::Additional(c, _) => BomKey::new(c.partnumbers.clone(), c.description()),
    }
}

/// Key of a cable as a designated item; bundles yield one key per wire.
pub fn cable_key(cable: &Cable) -> ItemKey {
    if cable.is_bundle() {
        ItemKey::Bundle(
            cable
                .wires
                .iter()
                .map(|w| item_key(&BomItem::Wire(cable, w)))
                .collect(),
        )
    } else {
        ItemKey::Single(item_key(&BomItem::Cable(cable)))
    }
}

pub fn item_category(item: &BomItem<'_>) -> BomCategory {
    match item {
        BomItem::Connector(_) => BomCategory::Connector,
        BomItem::Cable(_) => BomCategory::Cable,
        BomItem::Wire(..) | BomItem::Shield(..) => BomCategory::Wire,
        BomItem::Additional(..) => BomCategory::Additional,
    }
}

fn item_ignored(item: &BomItem<'_>) -> bool {
    match item {
        BomItem::Connector(c) => c.ignore_in_bom,
        BomItem::Cable(c) => c.ignore_in_bom,
        BomItem::Wire(c, _) | BomItem::Shield(c, _) => c.ignore_in_bom,
        BomItem::Additional(c, _) => c.ignore_in_bom,
    }
}

fn item_designators(item: &BomItem<'_>) -> BTreeSet<String> {
    match item {
        BomItem::Connector(c) => BTreeSet::from([c.designator.clone()]),
        BomItem::Cable(c) | BomItem::Wire(c, _) | BomItem::Shield(c, _) => {
            BTreeSet::from([c.designator.clone()])
        }
        BomItem::Additional(c, _) => c.designators.clone(),
    }
}

fn connector_metric(connector: &Connector, metric: ConnectorMetric) -> f64 {
    match metric {
        ConnectorMetric::Pincount => connector.pincount() as f64,
        ConnectorMetric::Populated => connector.populated_pins() as f64,
        ConnectorMetric::Connections => connector.total_connections() as f64,
    }
}

fn cable_metric(cable: &Cable, metric: CableMetric) -> f64 {
    match metric {
        CableMetric::Wirecount => cable.wirecount() as f64,
        CableMetric::Terminations => cable.terminations() as f64,
        CableMetric::Length => cable.length.as_ref().map_or(0.0, |l| l.number),
        CableMetric::TotalLength => cable.total_length(),
    }
}

/// Quantity of an additional component after resolving its multiplier.
fn component_qty(component: &Component, owner: MultiplierOwner<'_>) -> Result<NumberAndUnit, HarnessError> {
    let mut qty = match &component.amount {
        Some(amount) => component.qty.try_mul(amount)?,
        None => component.qty.clone(),
    };
    let misconfigured = |what: &str| {
        HarnessError::MultiplierConfiguration(format!(
            "{} used on {} ({})",
            what,
            component.parent.as_deref().unwrap_or("a top-level item"),
            component.description()
        ))
    };
    let factor = match (component.qty_multiplier, owner) {
        (QtyMultiplier::Factor(factor), _) => factor,
        (QtyMultiplier::Connector(metric), MultiplierOwner::Connector(connector)) => {
            connector_metric(connector, metric)
        }
        (QtyMultiplier::Cable(metric), MultiplierOwner::Cable(cable)) => {
            if metric.is_length() {
                if qty.unit.is_some() {
                    return Err(HarnessError::MultiplierConfiguration(format!(
                        "no unit may be given with a {:?} multiplier ({})",
                        metric,
                        component.description()
                    )));
                }
                qty.unit = cable.length.as_ref().and_then(|l| l.unit.clone());
            }
            cable_metric(cable, metric)
        }
        (QtyMultiplier::Connector(_), MultiplierOwner::Cable(_)) => {
            return Err(misconfigured("a connector multiplier"))
        }
        (QtyMultiplier::Cable(_), MultiplierOwner::Connector(_)) => {
            return Err(misconfigured("a cable multiplier"))
        }
        (_, MultiplierOwner::TopLevel) => return Err(misconfigured("a symbolic multiplier")),
    };
    Ok(qty.scale(factor))
}

/// BOM quantity of an item: `qty × amount × multiplier`.
pub fn item_qty(item: &BomItem<'_>) -> Result<NumberAndUnit, HarnessError> {
    match item {
        BomItem::Connector(c) => Ok(c.qty.clone()),
        BomItem::Cable(c) => match &c.length {
            Some(length) => c.qty.try_mul(length),
            None => Ok(c.qty.clone()),
        },
        BomItem::Wire(_, w) | BomItem::Shield(_, w) => Ok(w
            .length
            .clone()
            .unwrap_or_else(|| NumberAndUnit::unitless(1.0))),
        BomItem::Additional(c, owner) => component_qty(c, *owner),
    }
}

/// BOM of one harness, with ids local to it until merged into a [`SharedBom`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessBom {
    pub harness: String,
    pub entries: Vec<BomEntry>,
    /// BOM ids per connector/cable designator, for diagram bubbles.
    pub bom_ids: BTreeMap<String, Vec<usize>>,
}

impl HarnessBom {
    /// Aggregate the BOM of a finalized harness.
    pub fn build(harness: &Harness) -> Result<Self, HarnessError> {
        if !harness.is_finalized() {
            return Err(HarnessError::InvalidDefinition {
                designator: harness.name.clone(),
                reason: "harness must be finalized before its BOM is built".to_string(),
            });
        }

        let mut entries: Vec<BomEntry> = Vec::new();
        let mut index: HashMap<BomKey, usize> = HashMap::new();
        for item in enumerate_items(harness) {
            if item_ignored(&item) {
                continue;
            }
            let key = item_key(&item);
            let qty = item_qty(&item)?;
            let designators = item_designators(&item);
            match index.get(&key) {
                Some(&pos) => {
                    let entry = &mut entries[pos];
                    entry.qty = entry.qty.try_add(&qty)?;
                    entry.designators.extend(designators);
                }
                None => {
                    let mut entry = BomEntry::new(key.clone(), item_category(&item), qty);
                    entry.designators = designators;
                    index.insert(key, entries.len());
                    entries.push(entry);
                }
            }
        }

        entries.sort_by(|a, b| {
            (a.category, &a.key.description).cmp(&(b.category, &b.key.description))
        });
        for (i, entry) in entries.iter_mut().enumerate() {
            entry.id = i + 1;
        }

        let mut bom = HarnessBom {
            harness: harness.name.clone(),
            entries,
            bom_ids: BTreeMap::new(),
        };
        bom.collect_bom_ids(harness);
        tracing::debug!("harness {}: {} BOM entries", bom.harness, bom.entries.len());
        Ok(bom)
    }

    fn collect_bom_ids(&mut self, harness: &Harness) {
        let mut ids = BTreeMap::new();
        for connector in harness.connectors.values().filter(|c| !c.ignore_in_bom) {
            let key = item_key(&BomItem::Connector(connector));
            if let Some(entry) = self.entry(&key) {
                ids.insert(connector.designator.clone(), vec![entry.id]);
            }
        }
        for cable in harness.cables.values().filter(|c| !c.ignore_in_bom) {
            let keys = match cable_key(cable) {
                ItemKey::Single(key) => vec![key],
                ItemKey::Bundle(keys) => keys,
            };
            let mut found: Vec<usize> = keys.iter().filter_map(|k| self.entry(k)).map(|e| e.id).collect();
            found.sort_unstable();
            found.dedup();
            if !found.is_empty() {
                ids.insert(cable.designator.clone(), found);
            }
        }
        self.bom_ids = ids;
    }

    pub fn entry(&self, key: &BomKey) -> Option<&BomEntry> {
        self.entries.iter().find(|e| &e.key == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite ids after a shared merge, keeping `bom_ids` in step.
    pub(crate) fn reassign_ids(&mut self, mapping: &HashMap<usize, usize>) {
        for entry in &mut self.entries {
            if let Some(&id) = mapping.get(&entry.id) {
                entry.id = id;
            }
        }
        for ids in self.bom_ids.values_mut() {
            for id in ids.iter_mut() {
                if let Some(&new_id) = mapping.get(id) {
                    *id = new_id;
                }
            }
            ids.sort_unstable();
        }
        self.entries.sort_by_key(|e| e.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::cable::{CableSpec, ShieldSpec};
    use crate::model::connector::ConnectorSpec;
    use crate::resolver::ConnectionResolver;

    fn two_pin(pn: &str) -> ConnectorSpec {
        ConnectorSpec {
            pincount: Some(2),
            type_: Some("Molex".into()),
            partnumbers: PartNumberInfo::new(pn, "", "", "", ""),
            ..Default::default()
        }
    }

    #[test]
    fn test_identical_connectors_merge() {
        let mut h = Harness::new("A");
        h.add_connector("X1", two_pin("123")).unwrap();
        h.add_connector("X2", two_pin("123")).unwrap();
        h.add_connector("X3", two_pin("456")).unwrap();
        h.finalize();
        let bom = HarnessBom::build(&h).unwrap();
        assert_eq!(bom.len(), 2);
        let merged = &bom.entries[0];
        assert_eq!(merged.qty.number, 2.0);
        assert_eq!(
            merged.designators.iter().cloned().collect::<Vec<_>>(),
            vec!["X1", "X2"]
        );
        assert_eq!(bom.bom_ids["X2"], vec![1]);
    }

    #[test]
    fn test_requires_finalized_harness() {
        let h = Harness::new("A");
        assert!(HarnessBom::build(&h).is_err());
    }

    #[test]
    fn test_cable_qty_uses_length() {
        let mut h = Harness::new("A");
        let spec = CableSpec {
            wirecount: Some(2),
            length: Some(NumberAndUnit::new(0.5, Some("m"))),
            qty: Some(NumberAndUnit::unitless(3.0)),
            ..Default::default()
        };
        h.add_cable("W1", spec).unwrap();
        h.finalize();
        let bom = HarnessBom::build(&h).unwrap();
        assert_eq!(bom.entries[0].qty, NumberAndUnit::new(1.5, Some("m")));
        assert_eq!(bom.entries[0].category, BomCategory::Cable);
    }

    #[test]
    fn test_ignored_items_are_dropped() {
        let mut h = Harness::new("A");
        let mut spec = two_pin("1");
        spec.ignore_in_bom = true;
        h.add_connector("X1", spec).unwrap();
        h.finalize();
        assert!(HarnessBom::build(&h).unwrap().is_empty());
    }

    fn extra(type_: &str, parent: &str, multiplier: QtyMultiplier) -> Component {
        Component::new(Some(type_.into()), PartNumberInfo::default())
            .with_parent(parent)
            .with_multiplier(multiplier)
    }

    fn qty_of(bom: &HarnessBom, description: &str) -> NumberAndUnit {
        bom.entries
            .iter()
            .find(|e| e.description() == description)
            .map(|e| e.qty.clone())
            .unwrap()
    }

    #[test]
    fn test_cable_metric_multipliers() {
        let mut h = Harness::new("A");
        h.add_connector("X1", two_pin("1")).unwrap();
        h.add_connector("X2", two_pin("1")).unwrap();
        let spec = CableSpec {
            wirecount: Some(3),
            length: Some(NumberAndUnit::new(2.0, Some("m"))),
            shield: ShieldSpec::Plain,
            additional_components: vec![
                extra("Marker", "W1", QtyMultiplier::Cable(CableMetric::Wirecount)),
                extra("Ferrule", "W1", QtyMultiplier::Cable(CableMetric::Terminations)),
                extra("Sleeve", "W1", QtyMultiplier::Cable(CableMetric::Length)),
                extra("Tape", "W1", QtyMultiplier::Cable(CableMetric::TotalLength)),
            ],
            ..Default::default()
        };
        h.add_cable("W1", spec).unwrap();
        ConnectionResolver::connect(&mut h, Some(("X1", "1")), ("W1", "1"), Some(("X2", "1")))
            .unwrap();
        ConnectionResolver::connect(&mut h, Some(("X1", "2")), ("W1", "2"), None).unwrap();
        h.finalize();

        let bom = HarnessBom::build(&h).unwrap();
        // Shield excluded from wirecount and total length
        assert_eq!(qty_of(&bom, "Marker"), NumberAndUnit::unitless(3.0));
        assert_eq!(qty_of(&bom, "Ferrule"), NumberAndUnit::unitless(3.0));
        assert_eq!(qty_of(&bom, "Sleeve"), NumberAndUnit::new(2.0, Some("m")));
        assert_eq!(qty_of(&bom, "Tape"), NumberAndUnit::new(6.0, Some("m")));
    }

    #[test]
    fn test_length_multiplier_rejects_unit() {
        let mut h = Harness::new("A");
        let sleeve = extra("Sleeve", "W1", QtyMultiplier::Cable(CableMetric::Length))
            .with_qty(NumberAndUnit::new(1.0, Some("m")));
        let spec = CableSpec {
            wirecount: Some(1),
            length: Some(NumberAndUnit::new(2.0, Some("m"))),
            additional_components: vec![sleeve],
            ..Default::default()
        };
        h.add_cable("W1", spec).unwrap();
        h.finalize();
        assert!(matches!(
            HarnessBom::build(&h),
            Err(HarnessError::MultiplierConfiguration(_))
        ));
    }

    #[test]
    fn test_connector_metric_on_cable_item() {
        let mut h = Harness::new("A");
        let spec = CableSpec {
            wirecount: Some(2),
            additional_components: vec![extra(
                "Label",
                "W1",
                QtyMultiplier::Connector(ConnectorMetric::Pincount),
            )],
            ..Default::default()
        };
        h.add_cable("W1", spec).unwrap();
        h.finalize();
        assert!(matches!(
            HarnessBom::build(&h),
            Err(HarnessError::MultiplierConfiguration(_))
        ));
    }

    #[test]
    fn test_cable_metric_on_connector_item() {
        let mut h = Harness::new("A");
        let mut spec = two_pin("1");
        spec.additional_components = vec![extra(
            "Seal",
            "X1",
            QtyMultiplier::Cable(CableMetric::Wirecount),
        )];
        h.add_connector("X1", spec).unwrap();
        h.finalize();
        assert!(matches!(
            HarnessBom::build(&h),
            Err(HarnessError::MultiplierConfiguration(_))
        ));
    }

    #[test]
    fn test_symbolic_multiplier_on_top_level_item() {
        let mut h = Harness::new("A");
        let item = Component::new(Some("Label".into()), PartNumberInfo::default())
            .with_multiplier(QtyMultiplier::Connector(ConnectorMetric::Pincount));
        h.add_additional_item(item);
        h.finalize();
        assert!(matches!(
            HarnessBom::build(&h),
            Err(HarnessError::MultiplierConfiguration(_))
        ));
    }
}
