//! Connection Resolver
//!
//! Turns symbolic wiring statements into concrete pin/wire links. Pin
//! references may be a pin id, a pin label, or `LABEL__NUMBER`; wire
//! references may be a 1-based wire number, a wire color, a wire label, or
//! `s` for the shield. Every resolved connection activates the pins it
//! touches, which later drives connector orientation and BOM multipliers.

use regex::Regex;
use std::sync::LazyLock;

use crate::core::HarnessError;
use crate::harness::Harness;
use crate::model::input::{ConnectionItem, RefList, Scalar};
use crate::model::{
    ArrowDirection, Cable, Connection, Connector, Loop, Mate, MultiColor, PinRef, Side, WireRef,
    SHIELD_ID,
};

static ARROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<?[-=]+>?$").expect("invalid arrow regex"));
static RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)-(\d+)$").expect("invalid range regex"));

/// Whether a connection-set item is a mate arrow such as `-->` or `<==>`.
pub fn is_arrow(token: &str) -> bool {
    ARROW_RE.is_match(token)
}

/// Split a pin reference into its label and number parts.
fn parse_pin_token(token: &str) -> (Option<&str>, Option<&str>) {
    if let Some((label, number)) = token.split_once("__") {
        (Some(label), Some(number))
    } else if token.parse::<i64>().is_ok() {
        (None, Some(token))
    } else {
        (Some(token), None)
    }
}

/// Resolve a pin reference on `connector` to a zero-based pin index.
pub fn resolve_pin(connector: &Connector, token: &str) -> Result<usize, HarnessError> {
    let not_found = || HarnessError::ReferenceNotFound {
        kind: "pin",
        scope: connector.designator.clone(),
        token: token.to_string(),
    };
    let (label, mut number) = parse_pin_token(token);

    let mut label_matches = None;
    if let Some(label) = label {
        let matches: Vec<usize> = connector
            .pins
            .iter()
            .filter(|p| p.label.as_deref() == Some(label))
            .map(|p| p.index)
            .collect();
        if !matches.is_empty() {
            label_matches = Some(matches);
        } else if number.is_none() && connector.pins.iter().any(|p| p.id == label) {
            // not a label, but a valid pin id
            number = Some(label);
        } else {
            return Err(not_found());
        }
    }

    if let Some(number) = number {
        let index = connector
            .pins
            .iter()
            .position(|p| p.id == number)
            .ok_or_else(not_found)?;
        if let Some(matches) = &label_matches {
            if !matches.contains(&index) {
                return Err(HarnessError::InconsistentReference {
                    designator: connector.designator.clone(),
                    label: label.unwrap_or_default().to_string(),
                    number: number.to_string(),
                    actual: connector.pins[index].label.clone().unwrap_or_default(),
                });
            }
        }
        return Ok(index);
    }

    match label_matches {
        Some(matches) if matches.len() > 1 => Err(HarnessError::AmbiguousReference {
            designator: connector.designator.clone(),
            token: token.to_string(),
            detail: "pin label is not unique; use LABEL__NUMBER to disambiguate".to_string(),
        }),
        Some(matches) => Ok(matches[0]),
        None => Err(not_found()),
    }
}

/// Resolve a wire reference on `cable` to a zero-based wire index.
pub fn resolve_wire(cable: &Cable, token: &str) -> Result<usize, HarnessError> {
    if token == SHIELD_ID {
        if let Some(shield) = cable.shield() {
            return Ok(shield.index);
        }
    }
    let ambiguous = |detail: &str| HarnessError::AmbiguousReference {
        designator: cable.designator.clone(),
        token: token.to_string(),
        detail: detail.to_string(),
    };

    let color = MultiColor::parse(Some(token)).ok().filter(|c| !c.is_empty());
    let color_matches: Vec<usize> = match &color {
        Some(color) => cable
            .conductors()
            .filter(|w| &w.color == color)
            .map(|w| w.index)
            .collect(),
        None => Vec::new(),
    };
    let label_matches: Vec<usize> = cable
        .conductors()
        .filter(|w| w.label.as_deref() == Some(token))
        .map(|w| w.index)
        .collect();

    if let (Some(c), Some(l)) = (color_matches.first(), label_matches.first()) {
        if c != l {
            return Err(ambiguous(
                "defined both in colors and wire labels, for different wires",
            ));
        }
    }
    for matches in [&color_matches, &label_matches] {
        match matches.len() {
            0 => continue,
            1 => return Ok(matches[0]),
            _ => return Err(ambiguous("used for more than one wire")),
        }
    }

    match token.parse::<usize>() {
        Ok(n) if (1..=cable.wirecount()).contains(&n) => Ok(n - 1),
        _ => Err(HarnessError::ReferenceNotFound {
            kind: "wire",
            scope: cable.designator.clone(),
            token: token.to_string(),
        }),
    }
}

fn connector_not_found(harness: &Harness, designator: &str) -> HarnessError {
    HarnessError::ReferenceNotFound {
        kind: "connector",
        scope: harness.name.clone(),
        token: designator.to_string(),
    }
}

/// One parsed item of a connection set.
#[derive(Debug, Clone)]
enum SetEntry {
    Connector {
        designator: String,
        pins: Option<Vec<String>>,
    },
    Cable {
        designator: String,
        wires: Vec<String>,
    },
    Arrow(String),
}

impl SetEntry {
    fn len(&self) -> usize {
        match self {
            SetEntry::Connector { pins: Some(p), .. } => p.len(),
            SetEntry::Cable { wires, .. } => wires.len(),
            _ => 1,
        }
    }
}

/// Pick element `i` of a reference list, broadcasting single-element lists.
fn pick(list: &[String], i: usize) -> &str {
    if list.len() == 1 {
        &list[0]
    } else {
        &list[i]
    }
}

/// Expand scalars and `a-b` ranges into a flat list of reference tokens.
fn expand_refs(list: &RefList) -> Vec<String> {
    let mut tokens = Vec::new();
    for scalar in list.scalars() {
        let token = scalar.to_string();
        let range = match scalar {
            Scalar::Text(text) => RANGE_RE.captures(text).and_then(|caps| {
                let start = caps[1].parse::<i64>().ok()?;
                let end = caps[2].parse::<i64>().ok()?;
                Some((start, end))
            }),
            _ => None,
        };
        match range {
            Some((start, end)) if start <= end => tokens.extend((start..=end).map(|n| n.to_string())),
            Some((start, end)) => tokens.extend((end..=start).rev().map(|n| n.to_string())),
            None => tokens.push(token),
        }
    }
    tokens
}

/// Connection resolver operating on a harness under construction.
pub struct ConnectionResolver;

impl ConnectionResolver {
    /// Connect `from` pin to `to` pin through wire `via` of a cable. Either
    /// endpoint may be absent.
    pub fn connect(
        harness: &mut Harness,
        from: Option<(&str, &str)>,
        via: (&str, &str),
        to: Option<(&str, &str)>,
    ) -> Result<Connection, HarnessError> {
        let from_ref = from
            .map(|(designator, pin)| Self::pin_ref(harness, designator, pin))
            .transpose()?;
        let to_ref = to
            .map(|(designator, pin)| Self::pin_ref(harness, designator, pin))
            .transpose()?;

        let (cable_designator, wire_token) = via;
        let scope = harness.name.clone();
        let cable = harness
            .cables
            .get_mut(cable_designator)
            .ok_or_else(|| HarnessError::ReferenceNotFound {
                kind: "cable",
                scope,
                token: cable_designator.to_string(),
            })?;
        let wire_index = resolve_wire(cable, wire_token)?;
        let via_ref = WireRef {
            cable: cable.designator.clone(),
            index: wire_index,
            id: cable.wires[wire_index].id.clone(),
        };
        let connection = Connection {
            from: from_ref,
            via: via_ref,
            to: to_ref,
        };
        cable.add_connection(connection.clone());

        if let Some(pin) = &connection.from {
            if let Some(connector) = harness.connectors.get_mut(&pin.designator) {
                connector.activate_pin(pin.index, Some(Side::Right), true);
            }
        }
        if let Some(pin) = &connection.to {
            if let Some(connector) = harness.connectors.get_mut(&pin.designator) {
                connector.activate_pin(pin.index, Some(Side::Left), true);
            }
        }
        tracing::debug!(
            "connected {} via {}:{} to {}",
            connection.from.as_ref().map(|p| p.to_string()).unwrap_or_default(),
            connection.via.cable,
            connection.via.id,
            connection.to.as_ref().map(|p| p.to_string()).unwrap_or_default()
        );
        Ok(connection)
    }

    fn pin_ref(harness: &Harness, designator: &str, pin: &str) -> Result<PinRef, HarnessError> {
        let connector = harness
            .connectors
            .get(designator)
            .ok_or_else(|| connector_not_found(harness, designator))?;
        let index = resolve_pin(connector, pin)?;
        let pin = &connector.pins[index];
        Ok(PinRef {
            designator: designator.to_string(),
            index,
            id: pin.id.clone(),
            label: pin.label.clone(),
        })
    }

    /// Mate two pins directly. Sides are activated and both pins marked
    /// mated; connection counters are left alone.
    pub fn add_pin_mate(
        harness: &mut Harness,
        from: (&str, &str),
        to: (&str, &str),
        direction: ArrowDirection,
    ) -> Result<(), HarnessError> {
        let from_ref = Self::pin_ref(harness, from.0, from.1)?;
        let to_ref = Self::pin_ref(harness, to.0, to.1)?;
        for (pin, side) in [(&from_ref, Side::Right), (&to_ref, Side::Left)] {
            if let Some(connector) = harness.connectors.get_mut(&pin.designator) {
                connector.activate_pin(pin.index, Some(side), false);
                connector.mark_mated(pin.index);
            }
        }
        harness.mates.push(Mate::Pin {
            from: from_ref.designator,
            from_pin: from_ref.index,
            to: to_ref.designator,
            to_pin: to_ref.index,
            direction,
        });
        Ok(())
    }

    pub fn add_component_mate(
        harness: &mut Harness,
        from: &str,
        to: &str,
        direction: ArrowDirection,
    ) -> Result<(), HarnessError> {
        for designator in [from, to] {
            if !harness.connectors.contains_key(designator) {
                return Err(connector_not_found(harness, designator));
            }
        }
        harness.mates.push(Mate::Component {
            from: from.to_string(),
            to: to.to_string(),
            direction,
        });
        Ok(())
    }

    /// Jumper two pins inside `connector`. Both endpoints count as connections.
    pub fn add_loop(connector: &mut Connector, pins: &[String]) -> Result<(), HarnessError> {
        let [first, second] = pins else {
            return Err(HarnessError::InvalidDefinition {
                designator: connector.designator.clone(),
                reason: format!("loops must be between exactly two pins, got {}", pins.len()),
            });
        };
        let first = resolve_pin(connector, first)?;
        let second = resolve_pin(connector, second)?;
        connector.loops.push(Loop { first, second });
        connector.activate_pin(first, None, true);
        connector.activate_pin(second, None, true);
        Ok(())
    }

    /// Apply one connection set: a sequence of connectors, cables and arrows.
    pub fn apply_connection_set(
        harness: &mut Harness,
        items: &[ConnectionItem],
    ) -> Result<(), HarnessError> {
        // Step 1: Classify items and expand their reference lists
        let entries = items
            .iter()
            .map(|item| Self::parse_item(harness, item))
            .collect::<Result<Vec<_>, _>>()?;

        // Step 2: All lists must share one length, or broadcast from one
        let count = entries.iter().map(SetEntry::len).max().unwrap_or(0);
        for entry in &entries {
            let len = entry.len();
            if len != 1 && len != count {
                return Err(Self::invalid_set(
                    harness,
                    format!("reference lists of unequal length ({} and {})", len, count),
                ));
            }
        }

        // Step 3: Walk the items once per position
        for i in 0..count {
            for (j, entry) in entries.iter().enumerate() {
                let prev = j.checked_sub(1).and_then(|k| entries.get(k));
                let next = entries.get(j + 1);
                match entry {
                    SetEntry::Cable { designator, wires } => {
                        let from = Self::cable_neighbour(harness, prev, i)?;
                        let to = Self::cable_neighbour(harness, next, i)?;
                        Self::connect(
                            harness,
                            from.as_ref().map(|(d, p)| (d.as_str(), p.as_str())),
                            (designator.as_str(), pick(wires, i)),
                            to.as_ref().map(|(d, p)| (d.as_str(), p.as_str())),
                        )?;
                    }
                    SetEntry::Arrow(arrow) => {
                        Self::apply_arrow(harness, arrow, prev, next, i)?;
                    }
                    SetEntry::Connector { designator, .. } => {
                        if let Some(SetEntry::Connector { designator: other, .. }) = next {
                            return Err(Self::invalid_set(
                                harness,
                                format!(
                                    "connectors {} and {} are adjacent without a cable or arrow",
                                    designator, other
                                ),
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn parse_item(harness: &Harness, item: &ConnectionItem) -> Result<SetEntry, HarnessError> {
        let (designator, refs) = match item {
            ConnectionItem::Bare(token) if is_arrow(token) => {
                return Ok(SetEntry::Arrow(token.clone()));
            }
            ConnectionItem::Bare(designator) => (designator.clone(), None),
            ConnectionItem::Refs(map) => {
                let mut iter = map.iter();
                match (iter.next(), iter.next()) {
                    (Some((designator, list)), None) => (designator.clone(), Some(expand_refs(list))),
                    _ => {
                        return Err(Self::invalid_set(
                            harness,
                            "each item must name exactly one designator".to_string(),
                        ))
                    }
                }
            }
        };

        if harness.connectors.contains_key(&designator) {
            return Ok(SetEntry::Connector {
                designator,
                pins: refs,
            });
        }
        if harness.cables.contains_key(&designator) {
            return match refs {
                Some(wires) if !wires.is_empty() => Ok(SetEntry::Cable { designator, wires }),
                _ => Err(HarnessError::InvalidDefinition {
                    designator,
                    reason: "cable in a connection set needs a list of wires".to_string(),
                }),
            };
        }
        Err(HarnessError::ReferenceNotFound {
            kind: "designator",
            scope: harness.name.clone(),
            token: designator,
        })
    }

    /// Connector pin at position `i` next to a cable, if the neighbour is a connector.
    fn cable_neighbour(
        harness: &Harness,
        neighbour: Option<&SetEntry>,
        i: usize,
    ) -> Result<Option<(String, String)>, HarnessError> {
        match neighbour {
            None => Ok(None),
            Some(SetEntry::Connector { designator, pins }) => {
                let pin = Self::connector_pin(harness, designator, pins.as_deref(), i)?;
                Ok(Some((designator.clone(), pin)))
            }
            Some(_) => Err(Self::invalid_set(
                harness,
                "a cable must be followed or preceded by a connector".to_string(),
            )),
        }
    }

    /// Pin token for position `i`; a bare single-pin connector implies its only pin.
    fn connector_pin(
        harness: &Harness,
        designator: &str,
        pins: Option<&[String]>,
        i: usize,
    ) -> Result<String, HarnessError> {
        if let Some(pins) = pins {
            return Ok(pick(pins, i).to_string());
        }
        let connector = harness
            .connectors
            .get(designator)
            .ok_or_else(|| connector_not_found(harness, designator))?;
        match connector.pins.as_slice() {
            [only] => Ok(only.id.clone()),
            _ => Err(HarnessError::InvalidDefinition {
                designator: designator.to_string(),
                reason: "pins must be listed unless the connector has a single pin".to_string(),
            }),
        }
    }

    fn apply_arrow(
        harness: &mut Harness,
        arrow: &str,
        prev: Option<&SetEntry>,
        next: Option<&SetEntry>,
        i: usize,
    ) -> Result<(), HarnessError> {
        let (
            Some(SetEntry::Connector { designator: from, pins: from_pins }),
            Some(SetEntry::Connector { designator: to, pins: to_pins }),
        ) = (prev, next)
        else {
            return Err(Self::invalid_set(
                harness,
                format!("arrow '{}' must sit between two connectors", arrow),
            ));
        };
        let direction = ArrowDirection::from_arrow(arrow);

        if arrow.contains('=') || (from_pins.is_none() && to_pins.is_none()) {
            if i == 0 {
                Self::add_component_mate(harness, from, to, direction)?;
            }
            return Ok(());
        }
        let from_pin = Self::connector_pin(harness, from, from_pins.as_deref(), i)?;
        let to_pin = Self::connector_pin(harness, to, to_pins.as_deref(), i)?;
        Self::add_pin_mate(
            harness,
            (from.as_str(), from_pin.as_str()),
            (to.as_str(), to_pin.as_str()),
            direction,
        )
    }

    fn invalid_set(harness: &Harness, reason: String) -> HarnessError {
        HarnessError::InvalidDefinition {
            designator: harness.name.clone(),
            reason: format!("connection set: {}", reason),
        }
    }
}
