//! Graphviz DOT serialization of a [`Diagram`].

use std::fmt::Write;

use super::{CableNode, ConnectorNode, Diagram, DiagramEdge, DiagramNode, Endpoint};

const BACKGROUND: &str = "#ffffff";
const CONNECTOR_FILL: &str = "#ffffff";
const CABLE_FILL: &str = "#ffffff";
const BUNDLE_FILL: &str = "#eeeeee";
const FONT: &str = "arial";

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn quoted(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

fn endpoint(ep: &Endpoint) -> String {
    match &ep.port {
        Some(port) => format!("{}:{}:{}", quoted(&ep.node), port, ep.compass.as_dot()),
        None => format!("{}:{}", quoted(&ep.node), ep.compass.as_dot()),
    }
}

/// Outer label table: one nested single-row table per non-empty row.
fn nested_table(rows: &[Vec<String>]) -> String {
    let mut html = String::from("<table border=\"0\" cellspacing=\"0\" cellpadding=\"0\">\n");
    for row in rows.iter().filter(|r| !r.is_empty()) {
        html.push_str(" <tr><td>\n");
        html.push_str("  <table border=\"0\" cellspacing=\"0\" cellpadding=\"3\" cellborder=\"1\"><tr>\n");
        for cell in row {
            if cell.starts_with('<') {
                let _ = writeln!(html, "   <td>{}</td>", cell);
            } else {
                let _ = writeln!(html, "   <td balign=\"left\">{}</td>", escape(cell));
            }
        }
        html.push_str("  </tr></table>\n");
        html.push_str(" </td></tr>\n");
    }
    html.push_str("</table>");
    html
}

fn header_rows(
    title: &Option<String>,
    bom_ids: &[usize],
    partnumber_lines: &[String],
    attributes: &[String],
) -> Vec<Vec<String>> {
    let mut first: Vec<String> = title.iter().cloned().collect();
    if !bom_ids.is_empty() {
        let ids: Vec<String> = bom_ids.iter().map(|id| format!("#{}", id)).collect();
        first.push(ids.join(", "));
    }
    vec![first, partnumber_lines.to_vec(), attributes.to_vec()]
}

fn pin_table(node: &ConnectorNode) -> String {
    let mut html = String::from("<table border=\"0\" cellspacing=\"0\" cellpadding=\"3\" cellborder=\"1\">\n");
    let with_colors = node.pin_rows.iter().any(|p| p.color.is_some());
    for pin in &node.pin_rows {
        html.push_str("<tr>");
        if let Some(port) = &pin.left_port {
            let _ = write!(html, "<td port=\"{}\">{}</td>", port, escape(&pin.id));
        }
        if let Some(label) = &pin.label {
            let _ = write!(html, "<td>{}</td>", escape(label));
        }
        if with_colors {
            match (&pin.color, &pin.color_hex) {
                (Some(name), Some(hex)) => {
                    let _ = write!(
                        html,
                        "<td sides=\"tbl\">{}</td><td sides=\"tbr\" bgcolor=\"{}\" width=\"8\"></td>",
                        escape(name),
                        hex
                    );
                }
                _ => html.push_str("<td colspan=\"2\"></td>"),
            }
        }
        if let Some(port) = &pin.right_port {
            let _ = write!(html, "<td port=\"{}\">{}</td>", port, escape(&pin.id));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>");
    html
}

fn connector_label(node: &ConnectorNode) -> String {
    let mut rows = header_rows(&node.title, &node.bom_ids, &node.partnumber_lines, &node.attributes);
    if !node.simple {
        rows.push(vec![pin_table(node)]);
    }
    rows.extend(node.additional_lines.iter().map(|l| vec![l.clone()]));
    nested_table(&rows)
}

fn wire_table(node: &CableNode) -> String {
    let mut html = String::from("<table border=\"0\" cellspacing=\"0\" cellborder=\"0\">\n<tr><td>&nbsp;</td></tr>\n");
    for wire in &node.wire_rows {
        if wire.shield {
            html.push_str("<tr><td>&nbsp;</td></tr>\n");
        }
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&wire.ins.join(", ")),
            escape(&wire.info),
            escape(&wire.outs.join(", "))
        );
        let _ = writeln!(
            html,
            "<tr><td colspan=\"3\" border=\"0\" cellspacing=\"0\" cellpadding=\"0\" port=\"{}\" height=\"{}\">",
            wire.port,
            2 * wire.stripes.len()
        );
        html.push_str("<table cellspacing=\"0\" cellborder=\"0\" border=\"0\">\n");
        for stripe in wire.stripes.iter().rev() {
            let _ = writeln!(
                html,
                "<tr><td colspan=\"3\" cellpadding=\"0\" height=\"2\" bgcolor=\"{}\" border=\"0\"></td></tr>",
                stripe
            );
        }
        html.push_str("</table>\n</td></tr>\n");
        if !wire.partnumber_lines.is_empty() {
            let cells: Vec<String> = wire
                .partnumber_lines
                .iter()
                .map(|l| format!("<td>{}</td>", escape(l)))
                .collect();
            let _ = writeln!(
                html,
                "<tr><td colspan=\"3\"><table border=\"0\" cellspacing=\"0\" cellborder=\"0\"><tr>{}</tr></table></td></tr>",
                cells.concat()
            );
        }
    }
    html.push_str("<tr><td>&nbsp;</td></tr>\n</table>");
    html
}

fn cable_label(node: &CableNode) -> String {
    let mut rows = header_rows(&node.title, &node.bom_ids, &node.partnumber_lines, &node.attributes);
    rows.push(vec![wire_table(node)]);
    rows.extend(node.additional_lines.iter().map(|l| vec![l.clone()]));
    nested_table(&rows)
}

fn edge_line(edge: &DiagramEdge) -> String {
    let mut attrs = vec![format!("color={}", quoted(&edge.color))];
    if edge.dashed {
        attrs.push("style=dashed".to_string());
    }
    if let Some(direction) = edge.direction {
        attrs.push(format!("dir={}", direction.as_dot()));
    }
    format!(
        "\t{} -- {} [{}]",
        endpoint(&edge.tail),
        endpoint(&edge.head),
        attrs.join(" ")
    )
}

/// Render the diagram as an undirected Graphviz graph with HTML-like labels.
pub fn to_dot(diagram: &Diagram) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "graph {} {{", quoted(&diagram.name));
    let _ = writeln!(
        out,
        "\tgraph [bgcolor=\"{}\" fontname=\"{}\" nodesep=0.33 rankdir=LR ranksep=2]",
        BACKGROUND, FONT
    );
    let _ = writeln!(
        out,
        "\tnode [fillcolor=\"{}\" fontname=\"{}\" height=0 margin=0 shape=none style=filled width=0]",
        BACKGROUND, FONT
    );
    let _ = writeln!(out, "\tedge [fontname=\"{}\" style=bold]", FONT);

    for node in diagram.nodes() {
        let (label, style, fill) = match node {
            DiagramNode::Connector(c) => (connector_label(c), "filled", CONNECTOR_FILL),
            DiagramNode::Cable(c) if c.bundle => (cable_label(c), "filled,dashed", BUNDLE_FILL),
            DiagramNode::Cable(c) => (cable_label(c), "filled", CABLE_FILL),
        };
        let _ = writeln!(
            out,
            "\t{} [label=<\n{}\n> fillcolor=\"{}\" shape=box style=\"{}\"]",
            quoted(node.designator()),
            label,
            fill,
            style
        );
    }

    for edge in diagram.edges() {
        let _ = writeln!(out, "{}", edge_line(edge));
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::{Compass, EdgeKind};
    use crate::model::ArrowDirection;

    #[test]
    fn test_escape() {
        assert_eq!(escape("A<B & \"C\">"), "A&lt;B &amp; &quot;C&quot;&gt;");
    }

    #[test]
    fn test_edge_line() {
        let edge = DiagramEdge {
            kind: EdgeKind::PinMate,
            tail: Endpoint {
                node: "X1".into(),
                port: Some("p1r".into()),
                compass: Compass::East,
            },
            head: Endpoint {
                node: "X2".into(),
                port: None,
                compass: Compass::West,
            },
            color: "#000000".into(),
            dashed: true,
            direction: Some(ArrowDirection::Both),
        };
        assert_eq!(
            edge_line(&edge),
            "\t\"X1\":p1r:e -- \"X2\":w [color=\"#000000\" style=dashed dir=both]"
        );
    }

    #[test]
    fn test_nested_table_skips_empty_rows() {
        let html = nested_table(&[vec![], vec!["X1".into()], vec![]]);
        assert_eq!(html.matches("<tr><td>").count(), 1);
        assert!(html.contains("X1"));
    }
}
