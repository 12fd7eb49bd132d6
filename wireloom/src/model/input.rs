//! Deserialized harness description.
//!
//! These structures mirror the nested mappings and sequences produced by
//! the upstream parser (YAML in the CLI). Pin ids, labels and part numbers
//! may arrive as integers or strings; both are accepted and normalized to
//! strings when the model is built.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::cable::{CablePartFields, CableSpec, PartField, ShieldSpec};
use super::component::{BomCategory, Component, QtyMultiplier};
use super::connector::ConnectorSpec;
use super::numbers::{NumberAndUnit, QuantityInput};
use super::partnumber::PartNumberInfo;
use crate::core::HarnessError;

/// An integer, float or string scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(n) => write!(f, "{}", n),
            Scalar::Float(n) => write!(f, "{}", n),
            Scalar::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Int(n)
    }
}

fn strings(values: &[Scalar]) -> Vec<String> {
    values.iter().map(Scalar::to_string).collect()
}

fn text(value: &Option<Scalar>) -> String {
    value.as_ref().map(Scalar::to_string).unwrap_or_default()
}

fn quantity(
    value: &Option<QuantityInput>,
    default_unit: Option<&str>,
) -> Result<Option<NumberAndUnit>, HarnessError> {
    value
        .as_ref()
        .map(|q| NumberAndUnit::from_input(q, default_unit))
        .transpose()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HarnessInput {
    #[serde(default)]
    pub connectors: BTreeMap<String, ConnectorInput>,
    #[serde(default)]
    pub cables: BTreeMap<String, CableInput>,
    #[serde(default)]
    pub connections: Vec<Vec<ConnectionItem>>,
    #[serde(default)]
    pub additional_bom_items: Vec<ComponentInput>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectorInput {
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub pincount: Option<usize>,
    #[serde(default)]
    pub pins: Vec<Scalar>,
    #[serde(default)]
    pub pinlabels: Vec<Scalar>,
    #[serde(default)]
    pub pincolors: Vec<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub loops: Vec<Vec<Scalar>>,
    #[serde(default)]
    pub pn: Option<Scalar>,
    #[serde(default)]
    pub manufacturer: Option<Scalar>,
    #[serde(default)]
    pub mpn: Option<Scalar>,
    #[serde(default)]
    pub supplier: Option<Scalar>,
    #[serde(default)]
    pub spn: Option<Scalar>,
    #[serde(default)]
    pub qty: Option<QuantityInput>,
    #[serde(default)]
    pub ignore_in_bom: bool,
    #[serde(default)]
    pub additional_components: Vec<ComponentInput>,
    #[serde(default)]
    pub show_name: Option<bool>,
    #[serde(default)]
    pub show_pincount: Option<bool>,
    #[serde(default)]
    pub hide_disconnected_pins: bool,
}

impl ConnectorInput {
    pub fn to_spec(&self, designator: &str) -> Result<ConnectorSpec, HarnessError> {
        Ok(ConnectorSpec {
            type_: self.type_.clone(),
            subtype: self.subtype.clone(),
            style: self.style.clone(),
            pincount: self.pincount,
            pins: strings(&self.pins),
            pinlabels: strings(&self.pinlabels),
            pincolors: self.pincolors.clone(),
            color: self.color.clone(),
            partnumbers: PartNumberInfo::new(
                text(&self.pn),
                text(&self.manufacturer),
                text(&self.mpn),
                text(&self.supplier),
                text(&self.spn),
            ),
            qty: quantity(&self.qty, None)?,
            ignore_in_bom: self.ignore_in_bom,
            additional_components: self
                .additional_components
                .iter()
                .map(|c| c.to_component(Some(designator)))
                .collect::<Result<_, _>>()?,
            show_name: self.show_name,
            show_pincount: self.show_pincount,
            hide_disconnected_pins: self.hide_disconnected_pins,
        })
    }
}

/// `shield: true` or `shield: <color>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ShieldInput {
    Flag(bool),
    Color(String),
}

impl Default for ShieldInput {
    fn default() -> Self {
        ShieldInput::Flag(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartFieldInput {
    One(Scalar),
    Many(Vec<Scalar>),
}

impl PartFieldInput {
    fn to_field(&self) -> PartField {
        match self {
            PartFieldInput::One(value) => PartField::One(value.to_string()),
            PartFieldInput::Many(values) => PartField::Many(strings(values)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CableInput {
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub gauge: Option<QuantityInput>,
    #[serde(default)]
    pub length: Option<QuantityInput>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub color_code: Option<String>,
    #[serde(default)]
    pub wirecount: Option<usize>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub wirelabels: Vec<Scalar>,
    #[serde(default)]
    pub shield: ShieldInput,
    #[serde(default)]
    pub pn: Option<PartFieldInput>,
    #[serde(default)]
    pub manufacturer: Option<PartFieldInput>,
    #[serde(default)]
    pub mpn: Option<PartFieldInput>,
    #[serde(default)]
    pub supplier: Option<PartFieldInput>,
    #[serde(default)]
    pub spn: Option<PartFieldInput>,
    #[serde(default)]
    pub qty: Option<QuantityInput>,
    #[serde(default)]
    pub ignore_in_bom: bool,
    #[serde(default)]
    pub additional_components: Vec<ComponentInput>,
    #[serde(default)]
    pub show_name: Option<bool>,
    #[serde(default)]
    pub show_equiv: bool,
    #[serde(default)]
    pub show_wirecount: Option<bool>,
}

impl CableInput {
    pub fn to_spec(&self, designator: &str) -> Result<CableSpec, HarnessError> {
        let field = |f: &Option<PartFieldInput>| f.as_ref().map(PartFieldInput::to_field);
        let shield = match &self.shield {
            ShieldInput::Flag(false) => ShieldSpec::None,
            ShieldInput::Flag(true) => ShieldSpec::Plain,
            ShieldInput::Color(color) => ShieldSpec::Colored(color.clone()),
        };
        Ok(CableSpec {
            type_: self.type_.clone(),
            subtype: self.subtype.clone(),
            category: self.category.clone(),
            gauge: quantity(&self.gauge, Some("mm2"))?,
            length: quantity(&self.length, Some("m"))?,
            color: self.color.clone(),
            color_code: self.color_code.clone(),
            wirecount: self.wirecount,
            colors: self.colors.clone(),
            wirelabels: strings(&self.wirelabels),
            shield,
            partnumbers: CablePartFields {
                pn: field(&self.pn),
                manufacturer: field(&self.manufacturer),
                mpn: field(&self.mpn),
                supplier: field(&self.supplier),
                spn: field(&self.spn),
            },
            qty: quantity(&self.qty, None)?,
            ignore_in_bom: self.ignore_in_bom,
            additional_components: self
                .additional_components
                .iter()
                .map(|c| c.to_component(Some(designator)))
                .collect::<Result<_, _>>()?,
            show_name: self.show_name,
            show_equiv: self.show_equiv,
            show_wirecount: self.show_wirecount,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentInput {
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub qty: Option<QuantityInput>,
    /// Amount per unit of `qty`, e.g. `0.5 m` of heat shrink.
    #[serde(default)]
    pub amount: Option<QuantityInput>,
    #[serde(default)]
    pub qty_multiplier: Option<Scalar>,
    #[serde(default)]
    pub designators: Vec<String>,
    #[serde(default)]
    pub pn: Option<Scalar>,
    #[serde(default)]
    pub manufacturer: Option<Scalar>,
    #[serde(default)]
    pub mpn: Option<Scalar>,
    #[serde(default)]
    pub supplier: Option<Scalar>,
    #[serde(default)]
    pub spn: Option<Scalar>,
    #[serde(default)]
    pub ignore_in_bom: bool,
}

impl ComponentInput {
    /// Build a component owned by `parent`, or a top-level item when `None`.
    pub fn to_component(&self, parent: Option<&str>) -> Result<Component, HarnessError> {
        if let Some(category) = &self.category {
            if category.parse::<BomCategory>()? != BomCategory::Additional {
                return Err(HarnessError::InvalidDefinition {
                    designator: parent.unwrap_or_default().to_string(),
                    reason: format!("additional item with category '{}'", category),
                });
            }
        }
        let partnumbers = PartNumberInfo::new(
            text(&self.pn),
            text(&self.manufacturer),
            text(&self.mpn),
            text(&self.supplier),
            text(&self.spn),
        );
        let multiplier = match &self.qty_multiplier {
            None => QtyMultiplier::default(),
            Some(Scalar::Int(n)) => QtyMultiplier::Factor(*n as f64),
            Some(Scalar::Float(n)) => QtyMultiplier::Factor(*n),
            Some(Scalar::Text(symbol)) => symbol.parse()?,
        };
        let mut component = Component::new(self.type_.clone(), partnumbers)
            .with_multiplier(multiplier);
        component.subtype = self.subtype.clone();
        component.ignore_in_bom = self.ignore_in_bom;
        if let Some(qty) = quantity(&self.qty, None)? {
            component = component.with_qty(qty);
        }
        component.amount = quantity(&self.amount, None)?;
        component.designators.extend(self.designators.iter().cloned());
        if let Some(parent) = parent {
            component = component.with_parent(parent);
        }
        Ok(component)
    }
}

/// A pin or wire reference list: one scalar or a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefList {
    One(Scalar),
    Many(Vec<Scalar>),
}

impl RefList {
    pub fn scalars(&self) -> Vec<&Scalar> {
        match self {
            RefList::One(s) => vec![s],
            RefList::Many(list) => list.iter().collect(),
        }
    }
}

/// One item of a connection set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConnectionItem {
    /// A designator (connector or cable) or an arrow such as `-->`.
    Bare(String),
    /// `designator: [pins or wires]`.
    Refs(BTreeMap<String, RefList>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_multiplier_and_parent() {
        let input = ComponentInput {
            type_: Some("Crimp".into()),
            qty_multiplier: Some(Scalar::Text("populated".into())),
            ..Default::default()
        };
        let c = input.to_component(Some("X1")).unwrap();
        assert_eq!(c.parent.as_deref(), Some("X1"));
        assert!(c.designators.contains("X1"));
        assert!(matches!(c.qty_multiplier, QtyMultiplier::Connector(_)));
    }

    #[test]
    fn test_component_amount() {
        let input = ComponentInput {
            type_: Some("Heat shrink".into()),
            amount: Some(QuantityInput::Text("0.5 m".into())),
            ..Default::default()
        };
        let c = input.to_component(None).unwrap();
        assert_eq!(c.amount, Some(NumberAndUnit::new(0.5, Some("m"))));
    }

    #[test]
    fn test_component_rejects_other_category() {
        let input = ComponentInput {
            category: Some("connector".into()),
            ..Default::default()
        };
        assert!(input.to_component(None).is_err());
    }

    #[test]
    fn test_cable_defaults_units() {
        let input = CableInput {
            gauge: Some(QuantityInput::Number(0.25)),
            length: Some(QuantityInput::Number(2.0)),
            shield: ShieldInput::Color("CU".into()),
            ..Default::default()
        };
        let spec = input.to_spec("W1").unwrap();
        assert_eq!(spec.gauge.unwrap().unit.as_deref(), Some("mm2"));
        assert_eq!(spec.length.unwrap().unit.as_deref(), Some("m"));
        assert_eq!(spec.shield, ShieldSpec::Colored("CU".into()));
    }
}
