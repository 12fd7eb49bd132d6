//! A single harness: connectors, cables, mates and additional BOM items.

use std::collections::BTreeMap;

use crate::core::HarnessError;
use crate::model::cable::CableSpec;
use crate::model::connector::ConnectorSpec;
use crate::model::{Cable, Component, Connector, HarnessInput, Mate};
use crate::resolver::ConnectionResolver;

#[derive(Debug, Clone, Default)]
pub struct Harness {
    pub name: String,
    pub connectors: BTreeMap<String, Connector>,
    pub cables: BTreeMap<String, Cable>,
    pub mates: Vec<Mate>,
    pub additional_items: Vec<Component>,
    finalized: bool,
}

impl Harness {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Build, connect and finalize a harness from its deserialized description.
    pub fn from_input(name: impl Into<String>, input: &HarnessInput) -> Result<Self, HarnessError> {
        let mut harness = Self::new(name);

        // Pass 1: Connectors, including their internal loops
        for (designator, connector_input) in &input.connectors {
            let spec = connector_input.to_spec(designator)?;
            let connector = harness.add_connector(designator, spec)?;
            for pins in &connector_input.loops {
                let pins: Vec<String> = pins.iter().map(|p| p.to_string()).collect();
                ConnectionResolver::add_loop(connector, &pins)?;
            }
        }

        // Pass 2: Cables
        for (designator, cable_input) in &input.cables {
            let spec = cable_input.to_spec(designator)?;
            harness.add_cable(designator, spec)?;
        }

        // Pass 3: Top-level additional BOM items
        for item in &input.additional_bom_items {
            harness.add_additional_item(item.to_component(None)?);
        }

        // Pass 4: Connection sets
        for set in &input.connections {
            ConnectionResolver::apply_connection_set(&mut harness, set)?;
        }

        harness.finalize();
        tracing::info!(
            "harness {}: {} connectors, {} cables, {} mates",
            harness.name,
            harness.connectors.len(),
            harness.cables.len(),
            harness.mates.len()
        );
        Ok(harness)
    }

    fn check_designator(&self, designator: &str) -> Result<(), HarnessError> {
        if self.connectors.contains_key(designator) || self.cables.contains_key(designator) {
            return Err(HarnessError::InvalidDefinition {
                designator: designator.to_string(),
                reason: "designator is already in use".to_string(),
            });
        }
        Ok(())
    }

    pub fn add_connector(
        &mut self,
        designator: &str,
        spec: ConnectorSpec,
    ) -> Result<&mut Connector, HarnessError> {
        self.check_designator(designator)?;
        let connector = Connector::new(designator, spec)?;
        Ok(self
            .connectors
            .entry(designator.to_string())
            .or_insert(connector))
    }

    pub fn add_cable(&mut self, designator: &str, spec: CableSpec) -> Result<&mut Cable, HarnessError> {
        self.check_designator(designator)?;
        let cable = Cable::new(designator, spec)?;
        Ok(self.cables.entry(designator.to_string()).or_insert(cable))
    }

    pub fn add_additional_item(&mut self, item: Component) {
        self.additional_items.push(item);
    }

    /// Settle connector orientation once all connections are made. BOM
    /// multipliers and diagram ports read the finalized state.
    pub fn finalize(&mut self) {
        for connector in self.connectors.values_mut() {
            connector.finalize();
        }
        self.finalized = true;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn connector(&self, designator: &str) -> Option<&Connector> {
        self.connectors.get(designator)
    }

    pub fn cable(&self, designator: &str) -> Option<&Cable> {
        self.cables.get(designator)
    }

    /// Whether any non-shield wire carries more than one color.
    pub fn has_multicolor_wires(&self) -> bool {
        self.cables
            .values()
            .flat_map(|c| c.conductors())
            .any(|w| w.color.is_multicolor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_designator() {
        let mut h = Harness::new("test");
        let spec = ConnectorSpec {
            pincount: Some(2),
            ..Default::default()
        };
        h.add_connector("X1", spec.clone()).unwrap();
        assert!(h.add_connector("X1", spec).is_err());

        let cable = CableSpec {
            wirecount: Some(1),
            ..Default::default()
        };
        assert!(h.add_cable("X1", cable).is_err());
    }

    #[test]
    fn test_finalize_defaults_to_left() {
        let mut h = Harness::new("test");
        let spec = ConnectorSpec {
            pincount: Some(2),
            ..Default::default()
        };
        h.add_connector("X1", spec).unwrap();
        h.finalize();
        let x1 = h.connector("X1").unwrap();
        assert!(x1.ports_left);
        assert!(!x1.ports_right);
        assert!(h.is_finalized());
    }
}
