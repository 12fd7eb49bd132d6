//! Connectors and their pins.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use super::colors::MultiColor;
use super::component::Component;
use super::numbers::NumberAndUnit;
use super::partnumber::PartNumberInfo;
use crate::core::HarnessError;

/// Side of a connector node a pin row is exposed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pin {
    /// Zero-based position in the connector.
    pub index: usize,
    pub id: String,
    pub label: Option<String>,
    pub color: MultiColor,
    /// Designator of the owning connector.
    pub parent: String,
    pub connection_count: usize,
    pub mated: bool,
}

impl Pin {
    pub fn is_connected(&self) -> bool {
        self.connection_count > 0
    }

    /// Port name used for the given side, e.g. `p3r`.
    pub fn port(&self, side: Side) -> String {
        let suffix = match side {
            Side::Left => 'l',
            Side::Right => 'r',
        };
        format!("p{}{}", self.index + 1, suffix)
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.parent, self.id)?;
        if let Some(label) = self.label.as_deref().filter(|l| !l.is_empty()) {
            write!(f, ":{}", label)?;
        }
        Ok(())
    }
}

/// A pair of pins jumpered inside the connector, stored as pin indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loop {
    pub first: usize,
    pub second: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connector {
    pub designator: String,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub subtype: Option<String>,
    /// `simple` connectors have a single pin and no pin table.
    pub simple: bool,
    pub pins: Vec<Pin>,
    pub loops: Vec<Loop>,
    pub color: MultiColor,
    pub partnumbers: PartNumberInfo,
    pub qty: NumberAndUnit,
    pub ignore_in_bom: bool,
    pub additional_components: Vec<Component>,
    pub show_name: bool,
    pub show_pincount: bool,
    pub hide_disconnected_pins: bool,
    pub ports_left: bool,
    pub ports_right: bool,
    ports_left_set: bool,
    ports_right_set: bool,
}

/// Everything needed to build a [`Connector`]; filled from the input schema.
#[derive(Debug, Clone, Default)]
pub struct ConnectorSpec {
    pub type_: Option<String>,
    pub subtype: Option<String>,
    pub style: Option<String>,
    pub pincount: Option<usize>,
    pub pins: Vec<String>,
    pub pinlabels: Vec<String>,
    pub pincolors: Vec<String>,
    pub color: Option<String>,
    pub partnumbers: PartNumberInfo,
    pub qty: Option<NumberAndUnit>,
    pub ignore_in_bom: bool,
    pub additional_components: Vec<Component>,
    pub show_name: Option<bool>,
    pub show_pincount: Option<bool>,
    pub hide_disconnected_pins: bool,
}

impl Connector {
    pub fn new(designator: impl Into<String>, spec: ConnectorSpec) -> Result<Self, HarnessError> {
        let designator = designator.into();
        let invalid = |reason: &str| HarnessError::InvalidDefinition {
            designator: designator.clone(),
            reason: reason.to_string(),
        };

        let simple = match spec.style.as_deref() {
            None => false,
            Some("simple") => true,
            Some(other) => return Err(invalid(&format!("unknown style '{}'", other))),
        };

        let mut pincount = spec.pincount.filter(|&n| n > 0);
        if simple {
            if pincount.is_some_and(|n| n > 1) {
                return Err(invalid("connectors with style simple may only have one pin"));
            }
            pincount = Some(1);
        }
        let pincount = match pincount {
            Some(n) => n,
            None => {
                let implied = spec
                    .pins
                    .len()
                    .max(spec.pinlabels.len())
                    .max(spec.pincolors.len());
                if implied == 0 {
                    return Err(invalid(
                        "specify at least one of pincount, pins, pinlabels or pincolors",
                    ));
                }
                implied
            }
        };

        let pin_ids: Vec<String> = if spec.pins.is_empty() {
            (1..=pincount).map(|n| n.to_string()).collect()
        } else {
            spec.pins.clone()
        };
        let mut seen = HashSet::new();
        if let Some(dup) = pin_ids.iter().find(|id| !seen.insert(id.as_str())) {
            return Err(invalid(&format!("pin '{}' is not unique", dup)));
        }

        let rows = pin_ids.len().max(spec.pinlabels.len()).max(spec.pincolors.len());
        if rows > pin_ids.len() {
            return Err(invalid("more pin labels or pin colors than pins"));
        }
        let mut pins = Vec::with_capacity(pin_ids.len());
        for (index, id) in pin_ids.into_iter().enumerate() {
            let label = spec.pinlabels.get(index).filter(|l| !l.is_empty()).cloned();
            let color = MultiColor::parse(spec.pincolors.get(index).map(String::as_str))?;
            pins.push(Pin {
                index,
                id,
                label,
                color,
                parent: designator.clone(),
                connection_count: 0,
                mated: false,
            });
        }

        Ok(Connector {
            type_: spec.type_,
            subtype: spec.subtype,
            simple,
            pins,
            loops: Vec::new(),
            color: MultiColor::parse(spec.color.as_deref())?,
            partnumbers: spec.partnumbers,
            qty: spec.qty.unwrap_or_else(|| NumberAndUnit::unitless(1.0)),
            ignore_in_bom: spec.ignore_in_bom,
            additional_components: spec.additional_components,
            show_name: spec.show_name.unwrap_or(!simple),
            show_pincount: spec.show_pincount.unwrap_or(!simple),
            hide_disconnected_pins: spec.hide_disconnected_pins,
            ports_left: true,
            ports_right: false,
            ports_left_set: false,
            ports_right_set: false,
            designator,
        })
    }

    pub fn pincount(&self) -> usize {
        self.pins.len()
    }

    pub fn pin(&self, index: usize) -> Option<&Pin> {
        self.pins.get(index)
    }

    pub fn has_pinlabels(&self) -> bool {
        self.pins.iter().any(|p| p.label.is_some())
    }

    pub fn has_pincolors(&self) -> bool {
        self.pins.iter().any(|p| !p.color.is_empty())
    }

    /// Record activity on a pin. `side` marks the connector side that
    /// carries it; `is_connection` bumps the pin's connection counter.
    pub fn activate_pin(&mut self, index: usize, side: Option<Side>, is_connection: bool) {
        if let Some(pin) = self.pins.get_mut(index) {
            if is_connection {
                pin.connection_count += 1;
            }
        }
        match side {
            Some(Side::Left) => self.ports_left_set = true,
            Some(Side::Right) => self.ports_right_set = true,
            None => {}
        }
        self.apply_orientation();
    }

    pub fn mark_mated(&mut self, index: usize) {
        if let Some(pin) = self.pins.get_mut(index) {
            pin.mated = true;
        }
    }

    /// Exposed sides are the union of activated sides; with none, left only.
    fn apply_orientation(&mut self) {
        self.ports_right = self.ports_right_set;
        self.ports_left = self.ports_left_set || !self.ports_right_set;
    }

    pub fn finalize(&mut self) {
        self.apply_orientation();
    }

    pub fn should_show_pin(&self, pin: &Pin) -> bool {
        !self.hide_disconnected_pins || pin.is_connected()
    }

    pub fn pins_to_show(&self) -> impl Iterator<Item = &Pin> {
        self.pins.iter().filter(move |p| self.should_show_pin(p))
    }

    pub fn populated_pins(&self) -> usize {
        self.pins.iter().filter(|p| p.is_connected()).count()
    }

    pub fn total_connections(&self) -> usize {
        self.pins.iter().map(|p| p.connection_count).sum()
    }

    /// BOM description: `Connector, <type>, <subtype>, <n> pins, <color>`.
    pub fn description(&self) -> String {
        let pincount = self
            .show_pincount
            .then(|| format!("{} pins", self.pincount()));
        let color = (!self.color.is_empty()).then(|| self.color.to_string());
        let parts = [
            Some("Connector".to_string()),
            self.type_.clone(),
            self.subtype.clone(),
            pincount,
            color,
        ];
        join_present(parts)
    }
}

pub(crate) fn join_present<I>(parts: I) -> String
where
    I: IntoIterator<Item = Option<String>>,
{
    parts
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labelled(labels: &[&str]) -> ConnectorSpec {
        ConnectorSpec {
            pinlabels: labels.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_pincount_implied_by_labels() {
        let c = Connector::new("X1", labelled(&["GND", "VCC", "SIG"])).unwrap();
        assert_eq!(c.pincount(), 3);
        assert_eq!(c.pins[2].id, "3");
        assert_eq!(c.pins[1].label.as_deref(), Some("VCC"));
    }

    #[test]
    fn test_missing_pincount() {
        let err = Connector::new("X1", ConnectorSpec::default()).unwrap_err();
        assert!(matches!(err, HarnessError::InvalidDefinition { .. }));
    }

    #[test]
    fn test_duplicate_pins_rejected() {
        let spec = ConnectorSpec {
            pins: vec!["1".into(), "2".into(), "1".into()],
            ..Default::default()
        };
        assert!(Connector::new("X1", spec).is_err());
    }

    #[test]
    fn test_simple_forces_one_pin() {
        let spec = ConnectorSpec {
            style: Some("simple".into()),
            ..Default::default()
        };
        let c = Connector::new("F1", spec).unwrap();
        assert_eq!(c.pincount(), 1);
        assert!(!c.show_name);

        let spec = ConnectorSpec {
            style: Some("simple".into()),
            pincount: Some(2),
            ..Default::default()
        };
        assert!(Connector::new("F1", spec).is_err());
    }

    #[test]
    fn test_orientation_is_union_of_sides() {
        let spec = ConnectorSpec {
            pincount: Some(2),
            ..Default::default()
        };
        let mut c = Connector::new("X1", spec).unwrap();
        c.finalize();
        assert!(c.ports_left && !c.ports_right);

        c.activate_pin(0, Some(Side::Right), true);
        assert!(!c.ports_left && c.ports_right);
        c.activate_pin(1, Some(Side::Left), true);
        assert!(c.ports_left && c.ports_right);
        assert_eq!(c.total_connections(), 2);
    }

    #[test]
    fn test_description() {
        let spec = ConnectorSpec {
            type_: Some("Molex KK 254".into()),
            subtype: Some("female".into()),
            pincount: Some(4),
            color: Some("BK".into()),
            ..Default::default()
        };
        let c = Connector::new("X1", spec).unwrap();
        assert_eq!(c.description(), "Connector, Molex KK 254, female, 4 pins, BK");
    }
}
