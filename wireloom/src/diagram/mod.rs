//! Diagram Graph Assembler
//!
//! Derives the node/port/edge topology of a harness diagram from a finalized
//! harness. Connectors and cables become nodes of a petgraph graph; wire,
//! shield, mate and loop links become edges between node ports. The result
//! is renderer-neutral; see [`dot`] for Graphviz output.

pub mod dot;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::bom::{item_qty, BomItem, MultiplierOwner};
use crate::core::HarnessError;
use crate::harness::Harness;
use crate::model::cable::gauge_str_with_equiv;
use crate::model::colors::{BORDER_COLOR_HEX, DEFAULT_COLOR_HEX, MAX_WIRE_COLORS};
use crate::model::partnumber::{fold_for_display, PartNumberParent};
use crate::model::{ArrowDirection, Cable, Component, Connector, Mate, MultiColor, PinRef, Side};

pub use dot::to_dot;

/// Rendering parameters computed once per harness before any node is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderContext {
    /// Stripe count every wire is padded to.
    pub padding: usize,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self { padding: 1 }
    }
}

impl RenderContext {
    pub fn for_harness(harness: &Harness) -> Self {
        let padding = if harness.has_multicolor_wires() {
            MAX_WIRE_COLORS
        } else {
            1
        };
        Self { padding }
    }

    /// Color stripes of a wire, padded with filler stripes split around the
    /// wire's own colors.
    pub fn wire_stripes(&self, color: &MultiColor) -> Vec<String> {
        let mut own = color.hex_list();
        if own.is_empty() {
            own.push(DEFAULT_COLOR_HEX.to_string());
        }
        let deficit = self.padding.saturating_sub(own.len());
        let before = deficit / 2;
        let after = deficit - before;
        let filler = || DEFAULT_COLOR_HEX.to_string();
        std::iter::repeat_with(filler)
            .take(before)
            .chain(own)
            .chain(std::iter::repeat_with(filler).take(after))
            .collect()
    }

    /// Stripes framed by black borders, as drawn on the wire row.
    pub fn framed_stripes(&self, color: &MultiColor) -> Vec<String> {
        std::iter::once(BORDER_COLOR_HEX.to_string())
            .chain(self.wire_stripes(color))
            .chain(std::iter::once(BORDER_COLOR_HEX.to_string()))
            .collect()
    }

    /// Graphviz edge color: framed stripes joined with `:`.
    pub fn edge_color(&self, color: &MultiColor) -> String {
        self.framed_stripes(color).join(":")
    }
}

/// Framed shield color, or a thin black line when uncolored.
pub fn shield_stripes(color: &MultiColor) -> Vec<String> {
    match color.hex_list().first() {
        Some(hex) => vec![
            BORDER_COLOR_HEX.to_string(),
            hex.clone(),
            BORDER_COLOR_HEX.to_string(),
        ],
        None => vec![BORDER_COLOR_HEX.to_string()],
    }
}

const LOOP_COLOR: &str = "#000000:#ffffff:#000000";
const PIN_MATE_COLOR: &str = "#000000";
const COMPONENT_MATE_COLOR: &str = "#000000:#000000";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinRow {
    pub index: usize,
    pub id: String,
    pub label: Option<String>,
    pub color: Option<String>,
    pub color_hex: Option<String>,
    pub left_port: Option<String>,
    pub right_port: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorNode {
    pub designator: String,
    pub title: Option<String>,
    pub partnumber_lines: Vec<String>,
    pub attributes: Vec<String>,
    pub simple: bool,
    pub ports_left: bool,
    pub ports_right: bool,
    pub pin_rows: Vec<PinRow>,
    pub bom_ids: Vec<usize>,
    pub additional_lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRow {
    pub index: usize,
    pub port: String,
    pub info: String,
    pub ins: Vec<String>,
    pub outs: Vec<String>,
    /// Stripe colors including the black borders.
    pub stripes: Vec<String>,
    pub partnumber_lines: Vec<String>,
    pub shield: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CableNode {
    pub designator: String,
    pub title: Option<String>,
    pub partnumber_lines: Vec<String>,
    pub attributes: Vec<String>,
    pub bundle: bool,
    pub wire_rows: Vec<WireRow>,
    pub bom_ids: Vec<usize>,
    pub additional_lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiagramNode {
    Connector(ConnectorNode),
    Cable(CableNode),
}

impl DiagramNode {
    pub fn designator(&self) -> &str {
        match self {
            DiagramNode::Connector(c) => &c.designator,
            DiagramNode::Cable(c) => &c.designator,
        }
    }

    pub fn as_connector(&self) -> Option<&ConnectorNode> {
        match self {
            DiagramNode::Connector(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_cable(&self) -> Option<&CableNode> {
        match self {
            DiagramNode::Cable(c) => Some(c),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compass {
    East,
    West,
}

impl Compass {
    pub fn as_dot(&self) -> &'static str {
        match self {
            Compass::East => "e",
            Compass::West => "w",
        }
    }
}

/// One end of an edge: a node, an optional port on it, and the compass side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub node: String,
    pub port: Option<String>,
    pub compass: Compass,
}

impl Endpoint {
    fn new(node: &str, port: Option<String>, compass: Compass) -> Self {
        Self {
            node: node.to_string(),
            port,
            compass,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.node)?;
        if let Some(port) = &self.port {
            write!(f, ":{}", port)?;
        }
        write!(f, ":{}", self.compass.as_dot())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeKind {
    Wire,
    Shield,
    PinMate,
    ComponentMate,
    Loop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramEdge {
    pub kind: EdgeKind,
    pub tail: Endpoint,
    pub head: Endpoint,
    pub color: String,
    pub dashed: bool,
    pub direction: Option<ArrowDirection>,
}

impl DiagramEdge {
    fn solid(kind: EdgeKind, tail: Endpoint, head: Endpoint, color: impl Into<String>) -> Self {
        Self {
            kind,
            tail,
            head,
            color: color.into(),
            dashed: false,
            direction: None,
        }
    }
}

/// Diagram of one harness.
#[derive(Debug, Clone, Serialize)]
pub struct Diagram {
    pub name: String,
    pub context: RenderContext,
    graph: DiGraph<DiagramNode, DiagramEdge>,
    #[serde(skip)]
    indices: HashMap<String, NodeIndex>,
}

impl Diagram {
    fn new(name: &str, context: RenderContext) -> Self {
        Self {
            name: name.to_string(),
            context,
            graph: DiGraph::new(),
            indices: HashMap::new(),
        }
    }

    /// Assemble the diagram of a finalized harness. `bom_ids` maps designators
    /// to the BOM ids shown on their nodes.
    pub fn assemble(
        harness: &Harness,
        bom_ids: &BTreeMap<String, Vec<usize>>,
    ) -> Result<Self, HarnessError> {
        if !harness.is_finalized() {
            return Err(HarnessError::InvalidDefinition {
                designator: harness.name.clone(),
                reason: "harness must be finalized before its diagram is assembled".to_string(),
            });
        }

        // Step 1: Stripe padding from a full scan of wire colors
        let mut diagram = Self::new(&harness.name, RenderContext::for_harness(harness));
        let ids = |designator: &str| bom_ids.get(designator).cloned().unwrap_or_default();

        // Step 2: Connector nodes and their loops
        for connector in harness.connectors.values() {
            let node = connector_node(connector, ids(&connector.designator))?;
            diagram.add_node(DiagramNode::Connector(node));
            diagram.add_loops(connector)?;
        }

        // Step 3: Cable nodes and wire edges
        for cable in harness.cables.values() {
            let node = cable_node(harness, cable, &diagram.context, ids(&cable.designator))?;
            diagram.add_node(DiagramNode::Cable(node));
            diagram.add_wire_edges(harness, cable);
        }

        // Step 4: Mates
        for mate in &harness.mates {
            diagram.add_mate(harness, mate);
        }

        tracing::debug!(
            "diagram {}: {} nodes, {} edges",
            diagram.name,
            diagram.node_count(),
            diagram.edge_count()
        );
        Ok(diagram)
    }

    fn add_node(&mut self, node: DiagramNode) -> NodeIndex {
        let designator = node.designator().to_string();
        let idx = self.graph.add_node(node);
        self.indices.insert(designator, idx);
        idx
    }

    fn add_edge(&mut self, edge: DiagramEdge) {
        if let (Some(&from), Some(&to)) = (
            self.indices.get(&edge.tail.node),
            self.indices.get(&edge.head.node),
        ) {
            self.graph.add_edge(from, to, edge);
        }
    }

    fn add_loops(&mut self, connector: &Connector) -> Result<(), HarnessError> {
        if connector.loops.is_empty() {
            return Ok(());
        }
        let (side, compass) = if connector.ports_left {
            (Side::Left, Compass::West)
        } else if connector.ports_right {
            (Side::Right, Compass::East)
        } else {
            return Err(HarnessError::InvalidDefinition {
                designator: connector.designator.clone(),
                reason: "no side available for loops".to_string(),
            });
        };
        for lp in &connector.loops {
            let port = |index: usize| connector.pin(index).map(|p| p.port(side));
            let tail = Endpoint::new(&connector.designator, port(lp.first), compass);
            let head = Endpoint::new(&connector.designator, port(lp.second), compass);
            self.add_edge(DiagramEdge::solid(EdgeKind::Loop, tail, head, LOOP_COLOR));
        }
        Ok(())
    }

    fn add_wire_edges(&mut self, harness: &Harness, cable: &Cable) {
        for connection in &cable.connections {
            let Some(wire) = cable.wire(connection.via.index) else {
                continue;
            };
            let (kind, color) = if wire.is_shield {
                (EdgeKind::Shield, shield_stripes(&wire.color).join(":"))
            } else {
                (EdgeKind::Wire, self.context.edge_color(&wire.color))
            };
            if let Some(from) = &connection.from {
                let tail = Endpoint::new(
                    &from.designator,
                    pin_port(harness, from, Side::Right),
                    Compass::East,
                );
                let head = Endpoint::new(&cable.designator, Some(wire.port()), Compass::West);
                self.add_edge(DiagramEdge::solid(kind, tail, head, color.clone()));
            }
            if let Some(to) = &connection.to {
                let tail = Endpoint::new(&cable.designator, Some(wire.port()), Compass::East);
                let head = Endpoint::new(
                    &to.designator,
                    pin_port(harness, to, Side::Left),
                    Compass::West,
                );
                self.add_edge(DiagramEdge::solid(kind, tail, head, color.clone()));
            }
        }
    }

    fn add_mate(&mut self, harness: &Harness, mate: &Mate) {
        let simple = |designator: &str| harness.connector(designator).map_or(true, |c| c.simple);
        let (kind, tail, head, color) = match mate {
            Mate::Pin {
                from,
                from_pin,
                to,
                to_pin,
                ..
            } => {
                let from_port = (!simple(from)).then(|| format!("p{}r", from_pin + 1));
                let to_port = (!simple(to)).then(|| format!("p{}l", to_pin + 1));
                (
                    EdgeKind::PinMate,
                    Endpoint::new(from, from_port, Compass::East),
                    Endpoint::new(to, to_port, Compass::West),
                    PIN_MATE_COLOR,
                )
            }
            Mate::Component { from, to, .. } => (
                EdgeKind::ComponentMate,
                Endpoint::new(from, None, Compass::East),
                Endpoint::new(to, None, Compass::West),
                COMPONENT_MATE_COLOR,
            ),
        };
        self.add_edge(DiagramEdge {
            kind,
            tail,
            head,
            color: color.to_string(),
            dashed: true,
            direction: Some(mate.direction()),
        });
    }

    pub fn node(&self, designator: &str) -> Option<&DiagramNode> {
        self.indices
            .get(designator)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    pub fn connector(&self, designator: &str) -> Option<&ConnectorNode> {
        self.node(designator).and_then(DiagramNode::as_connector)
    }

    pub fn cable(&self, designator: &str) -> Option<&CableNode> {
        self.node(designator).and_then(DiagramNode::as_cable)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &DiagramNode> {
        self.graph.node_weights()
    }

    pub fn edges(&self) -> impl Iterator<Item = &DiagramEdge> {
        self.graph.edge_weights()
    }

    /// Edges leaving a node, e.g. all wires from a connector's right side.
    pub fn edges_from(&self, designator: &str) -> Vec<&DiagramEdge> {
        match self.indices.get(designator) {
            Some(&idx) => self
                .graph
                .edges_directed(idx, Direction::Outgoing)
                .map(|e| e.weight())
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

/// Port of a referenced pin; `simple` connectors attach to the node itself.
fn pin_port(harness: &Harness, pin: &PinRef, side: Side) -> Option<String> {
    let connector = harness.connector(&pin.designator)?;
    if connector.simple {
        return None;
    }
    connector.pin(pin.index).map(|p| p.port(side))
}

/// Title cell text, shown only when the item's name is visible.
fn title(designator: &str, show: bool) -> Option<String> {
    show.then(|| designator.to_string())
}

fn additional_lines(
    components: &[Component],
    owner: MultiplierOwner<'_>,
) -> Result<Vec<String>, HarnessError> {
    components
        .iter()
        .map(|c| {
            let qty = item_qty(&BomItem::Additional(c, owner))?;
            Ok(format!("{} x {}", qty, c.description()))
        })
        .collect()
}

fn connector_node(connector: &Connector, bom_ids: Vec<usize>) -> Result<ConnectorNode, HarnessError> {
    let mut attributes: Vec<String> = [connector.type_.clone(), connector.subtype.clone()]
        .into_iter()
        .flatten()
        .collect();
    if connector.show_pincount {
        attributes.push(format!("{}-pin", connector.pincount()));
    }
    if !connector.color.is_empty() {
        attributes.push(connector.color.to_string());
    }

    let pin_rows = if connector.simple {
        Vec::new()
    } else {
        let with_colors = connector.has_pincolors();
        connector
            .pins_to_show()
            .map(|pin| PinRow {
                index: pin.index,
                id: pin.id.clone(),
                label: pin.label.clone(),
                color: (with_colors && !pin.color.is_empty()).then(|| pin.color.to_string()),
                color_hex: pin.color.hex_list().into_iter().next(),
                left_port: connector.ports_left.then(|| pin.port(Side::Left)),
                right_port: connector.ports_right.then(|| pin.port(Side::Right)),
            })
            .collect()
    };

    Ok(ConnectorNode {
        designator: connector.designator.clone(),
        title: title(&connector.designator, connector.show_name),
        partnumber_lines: connector.partnumbers.str_list(),
        attributes,
        simple: connector.simple,
        ports_left: connector.ports_left,
        ports_right: connector.ports_right,
        pin_rows,
        bom_ids,
        additional_lines: additional_lines(
            &connector.additional_components,
            MultiplierOwner::Connector(connector),
        )?,
    })
}

/// Endpoint texts next to a wire; pins of connectors without a visible
/// name are left blank.
fn endpoint_texts(harness: &Harness, pins: Vec<&PinRef>) -> Vec<String> {
    pins.into_iter()
        .filter(|p| harness.connector(&p.designator).map_or(true, |c| c.show_name))
        .map(ToString::to_string)
        .collect()
}

fn cable_node(
    harness: &Harness,
    cable: &Cable,
    context: &RenderContext,
    bom_ids: Vec<usize>,
) -> Result<CableNode, HarnessError> {
    let mut attributes: Vec<String> = cable.type_.iter().cloned().collect();
    if cable.show_wirecount {
        attributes.push(format!("{}x", cable.wirecount()));
    }
    if let Some(gauge) = &cable.gauge {
        attributes.push(if cable.show_equiv {
            gauge_str_with_equiv(gauge)
        } else {
            crate::model::cable::gauge_str(gauge)
        });
    }
    if cable.is_shielded() {
        attributes.push("+ S".to_string());
    }
    if let Some(length) = cable.length.as_ref().filter(|l| l.number > 0.0) {
        attributes.push(length.to_string());
    }
    if !cable.color.is_empty() {
        attributes.push(cable.color.to_string());
    }

    let wire_rows = cable
        .wires
        .iter()
        .map(|wire| {
            let (info, stripes, partnumber_lines) = if wire.is_shield {
                ("Shield".to_string(), shield_stripes(&wire.color), Vec::new())
            } else {
                let lines = if cable.is_bundle() {
                    fold_for_display(
                        std::slice::from_ref(&wire.partnumbers),
                        Some(PartNumberParent::Single(&cable.partnumbers)),
                    )
                    .into_iter()
                    .flatten()
                    .collect()
                } else {
                    Vec::new()
                };
                (
                    wire.wireinfo(cable.is_bundle()),
                    context.framed_stripes(&wire.color),
                    lines,
                )
            };
            WireRow {
                index: wire.index,
                port: wire.port(),
                info,
                ins: endpoint_texts(harness, cable.wire_ins(wire.index)),
                outs: endpoint_texts(harness, cable.wire_outs(wire.index)),
                stripes,
                partnumber_lines,
                shield: wire.is_shield,
            }
        })
        .collect();

    Ok(CableNode {
        designator: cable.designator.clone(),
        title: title(&cable.designator, cable.show_name),
        partnumber_lines: cable.partnumbers.str_list(),
        attributes,
        bundle: cable.is_bundle(),
        wire_rows,
        bom_ids,
        additional_lines: additional_lines(
            &cable.additional_components,
            MultiplierOwner::Cable(cable),
        )?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::cable::CableSpec;
    use crate::model::connector::ConnectorSpec;
    use crate::resolver::ConnectionResolver;

    fn color(code: &str) -> MultiColor {
        MultiColor::parse(Some(code)).unwrap()
    }

    fn connector(pincount: usize) -> ConnectorSpec {
        ConnectorSpec {
            pincount: Some(pincount),
            ..Default::default()
        }
    }

    fn wired_harness(colors: &[&str]) -> Harness {
        let mut h = Harness::new("test");
        h.add_connector("X1", connector(colors.len())).unwrap();
        h.add_connector("X2", connector(colors.len())).unwrap();
        let spec = CableSpec {
            colors: colors.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        h.add_cable("W1", spec).unwrap();
        for i in 1..=colors.len() {
            let n = i.to_string();
            ConnectionResolver::connect(
                &mut h,
                Some(("X1", n.as_str())),
                ("W1", n.as_str()),
                Some(("X2", n.as_str())),
            )
            .unwrap();
        }
        h.finalize();
        h
    }

    #[test]
    fn test_single_color_stripes() {
        let ctx = RenderContext::default();
        assert_eq!(ctx.edge_color(&color("RD")), "#000000:#ff0000:#000000");
    }

    #[test]
    fn test_padded_stripes() {
        let ctx = RenderContext { padding: 3 };
        assert_eq!(
            ctx.wire_stripes(&color("RD")),
            vec!["#ffffff", "#ff0000", "#ffffff"]
        );
        assert_eq!(ctx.wire_stripes(&color("GNYE")).len(), 3);
        assert_eq!(ctx.wire_stripes(&color("BKRDWH")).len(), 3);
    }

    #[test]
    fn test_uniform_stripe_count_with_multicolor_wire() {
        let h = wired_harness(&["RD", "BK", "GNYE"]);
        let diagram = Diagram::assemble(&h, &BTreeMap::new()).unwrap();
        assert_eq!(diagram.context.padding, 3);
        let cable = diagram.cable("W1").unwrap();
        assert!(cable.wire_rows.iter().all(|r| r.stripes.len() == 5));
    }

    #[test]
    fn test_ports_follow_sides() {
        let h = wired_harness(&["RD", "BK"]);
        let diagram = Diagram::assemble(&h, &BTreeMap::new()).unwrap();

        let x1 = diagram.connector("X1").unwrap();
        assert!(x1.ports_right && !x1.ports_left);
        assert_eq!(x1.pin_rows[0].right_port.as_deref(), Some("p1r"));
        assert_eq!(x1.pin_rows[0].left_port, None);

        let edges = diagram.edges_from("X1");
        assert_eq!(edges.len(), 2);
        assert_eq!(edges.iter().filter(|e| e.tail.to_string() == "X1:p1r:e").count(), 1);

        let w1 = diagram.cable("W1").unwrap();
        assert_eq!(w1.wire_rows[0].ins, vec!["X1:1"]);
        assert_eq!(w1.wire_rows[1].outs, vec!["X2:2"]);
        assert_eq!(diagram.edge_count(), 4);
    }

    #[test]
    fn test_hidden_pins_keep_port_index() {
        let mut h = Harness::new("test");
        let spec = ConnectorSpec {
            pincount: Some(4),
            hide_disconnected_pins: true,
            ..Default::default()
        };
        h.add_connector("X1", spec).unwrap();
        h.add_cable(
            "W1",
            CableSpec {
                wirecount: Some(1),
                ..Default::default()
            },
        )
        .unwrap();
        ConnectionResolver::connect(&mut h, Some(("X1", "3")), ("W1", "1"), None).unwrap();
        h.finalize();

        let diagram = Diagram::assemble(&h, &BTreeMap::new()).unwrap();
        let x1 = diagram.connector("X1").unwrap();
        assert_eq!(x1.pin_rows.len(), 1);
        assert_eq!(x1.pin_rows[0].right_port.as_deref(), Some("p3r"));
    }

    #[test]
    fn test_loop_on_left_side() {
        let mut h = Harness::new("test");
        let x1 = h.add_connector("X1", connector(3)).unwrap();
        ConnectionResolver::add_loop(x1, &["1".to_string(), "3".to_string()]).unwrap();
        h.finalize();

        let diagram = Diagram::assemble(&h, &BTreeMap::new()).unwrap();
        let edge = diagram.edges().next().unwrap();
        assert_eq!(edge.kind, EdgeKind::Loop);
        assert_eq!(edge.tail.to_string(), "X1:p1l:w");
        assert_eq!(edge.head.to_string(), "X1:p3l:w");
        assert_eq!(edge.color, "#000000:#ffffff:#000000");
    }

    #[test]
    fn test_component_mate_is_dashed() {
        let mut h = Harness::new("test");
        h.add_connector("X1", connector(2)).unwrap();
        h.add_connector("X2", connector(2)).unwrap();
        ConnectionResolver::add_component_mate(&mut h, "X1", "X2", ArrowDirection::Forward).unwrap();
        h.finalize();

        let diagram = Diagram::assemble(&h, &BTreeMap::new()).unwrap();
        let edge = diagram.edges().next().unwrap();
        assert_eq!(edge.kind, EdgeKind::ComponentMate);
        assert!(edge.dashed);
        assert_eq!(edge.color, "#000000:#000000");
        assert_eq!(edge.direction, Some(ArrowDirection::Forward));
    }

    #[test]
    fn test_unfinalized_harness_is_rejected() {
        let h = Harness::new("test");
        assert!(Diagram::assemble(&h, &BTreeMap::new()).is_err());
    }
}
