//! Direct connector-to-connector mates, drawn as arrows.

use serde::{Deserialize, Serialize};

/// Arrow head placement of a mate edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrowDirection {
    Forward,
    Back,
    Both,
    None,
}

impl ArrowDirection {
    /// `<...>` both, `<...` back, `...>` forward, anything else none.
    pub fn from_arrow(arrow: &str) -> Self {
        match (arrow.starts_with('<'), arrow.ends_with('>')) {
            (true, true) => ArrowDirection::Both,
            (true, false) => ArrowDirection::Back,
            (false, true) => ArrowDirection::Forward,
            (false, false) => ArrowDirection::None,
        }
    }

    /// Graphviz `dir` attribute value.
    pub fn as_dot(&self) -> &'static str {
        match self {
            ArrowDirection::Forward => "forward",
            ArrowDirection::Back => "back",
            ArrowDirection::Both => "both",
            ArrowDirection::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mate {
    /// Pin-to-pin mate; pins are stored as zero-based indices.
    Pin {
        from: String,
        from_pin: usize,
        to: String,
        to_pin: usize,
        direction: ArrowDirection,
    },
    /// Whole-connector mate.
    Component {
        from: String,
        to: String,
        direction: ArrowDirection,
    },
}

impl Mate {
    pub fn direction(&self) -> ArrowDirection {
        match self {
            Mate::Pin { direction, .. } | Mate::Component { direction, .. } => *direction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrow_direction() {
        assert_eq!(ArrowDirection::from_arrow("<-->"), ArrowDirection::Both);
        assert_eq!(ArrowDirection::from_arrow("<=="), ArrowDirection::Back);
        assert_eq!(ArrowDirection::from_arrow("-->"), ArrowDirection::Forward);
        assert_eq!(ArrowDirection::from_arrow("=="), ArrowDirection::None);
    }
}
