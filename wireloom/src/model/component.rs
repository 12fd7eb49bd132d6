//! Generic BOM components: additional items and sub-components of
//! connectors and cables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

use super::connector::join_present;
use super::numbers::NumberAndUnit;
use super::partnumber::PartNumberInfo;
use crate::core::HarnessError;

/// BOM category. Declaration order is the BOM sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BomCategory {
    Connector,
    Cable,
    Wire,
    Pin,
    Additional,
    Bundle,
}

impl FromStr for BomCategory {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "connector" => Ok(BomCategory::Connector),
            "cable" => Ok(BomCategory::Cable),
            "wire" => Ok(BomCategory::Wire),
            "pin" => Ok(BomCategory::Pin),
            "additional" => Ok(BomCategory::Additional),
            "bundle" => Ok(BomCategory::Bundle),
            _ => Err(HarnessError::InvalidDefinition {
                designator: s.to_string(),
                reason: "unknown category".to_string(),
            }),
        }
    }
}

/// Metrics of a finalized connector usable as quantity multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectorMetric {
    Pincount,
    Populated,
    Connections,
}

/// Metrics of a finalized cable usable as quantity multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CableMetric {
    Wirecount,
    Terminations,
    Length,
    TotalLength,
}

impl CableMetric {
    pub fn is_length(self) -> bool {
        matches!(self, CableMetric::Length | CableMetric::TotalLength)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum QtyMultiplier {
    Factor(f64),
    Connector(ConnectorMetric),
    Cable(CableMetric),
}

impl Default for QtyMultiplier {
    fn default() -> Self {
        QtyMultiplier::Factor(1.0)
    }
}

impl FromStr for QtyMultiplier {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let symbol = s.trim();
        if let Ok(factor) = symbol.parse::<f64>() {
            return Ok(QtyMultiplier::Factor(factor));
        }
        let multiplier = match symbol.to_ascii_uppercase().as_str() {
            "PINCOUNT" => QtyMultiplier::Connector(ConnectorMetric::Pincount),
            "POPULATED" => QtyMultiplier::Connector(ConnectorMetric::Populated),
            "CONNECTIONS" => QtyMultiplier::Connector(ConnectorMetric::Connections),
            "WIRECOUNT" => QtyMultiplier::Cable(CableMetric::Wirecount),
            "TERMINATIONS" => QtyMultiplier::Cable(CableMetric::Terminations),
            "LENGTH" => QtyMultiplier::Cable(CableMetric::Length),
            "TOTAL_LENGTH" => QtyMultiplier::Cable(CableMetric::TotalLength),
            _ => {
                return Err(HarnessError::MultiplierConfiguration(format!(
                    "unknown quantity multiplier '{}'",
                    s
                )))
            }
        };
        Ok(multiplier)
    }
}

/// An additional BOM item, either top-level or attached to a connector or cable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub subtype: Option<String>,
    pub partnumbers: PartNumberInfo,
    pub qty: NumberAndUnit,
    pub amount: Option<NumberAndUnit>,
    pub qty_multiplier: QtyMultiplier,
    pub designators: BTreeSet<String>,
    pub ignore_in_bom: bool,
    /// Designator of the owning connector or cable, `None` for top-level items.
    pub parent: Option<String>,
}

impl Component {
    pub fn new(type_: Option<String>, partnumbers: PartNumberInfo) -> Self {
        Self {
            type_,
            subtype: None,
            partnumbers,
            qty: NumberAndUnit::unitless(1.0),
            amount: None,
            qty_multiplier: QtyMultiplier::default(),
            designators: BTreeSet::new(),
            ignore_in_bom: false,
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        let parent = parent.into();
        self.designators.insert(parent.clone());
        self.parent = Some(parent);
        self
    }

    pub fn with_qty(mut self, qty: NumberAndUnit) -> Self {
        self.qty = qty;
        self
    }

    pub fn with_multiplier(mut self, multiplier: QtyMultiplier) -> Self {
        self.qty_multiplier = multiplier;
        self
    }

    pub fn description(&self) -> String {
        join_present([self.type_.clone(), self.subtype.clone()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_ordering() {
        assert!(BomCategory::Connector < BomCategory::Cable);
        assert!(BomCategory::Additional < BomCategory::Bundle);
        assert_eq!("Bundle".parse::<BomCategory>().unwrap(), BomCategory::Bundle);
        assert!("harness".parse::<BomCategory>().is_err());
    }

    #[test]
    fn test_parse_multiplier() {
        assert_eq!(
            "populated".parse::<QtyMultiplier>().unwrap(),
            QtyMultiplier::Connector(ConnectorMetric::Populated)
        );
        assert_eq!("2".parse::<QtyMultiplier>().unwrap(), QtyMultiplier::Factor(2.0));
        assert!(matches!(
            "PINS".parse::<QtyMultiplier>(),
            Err(HarnessError::MultiplierConfiguration(_))
        ));
    }

    #[test]
    fn test_description() {
        let mut c = Component::new(Some("Crimp".into()), PartNumberInfo::default());
        c.subtype = Some("0.5 mm2".into());
        assert_eq!(c.description(), "Crimp, 0.5 mm2");
    }
}
