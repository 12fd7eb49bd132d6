//! WireLoom - wiring harness documentation library
//!
//! This library models wiring harnesses (connectors, cables, bundles and the
//! connections between them), resolves symbolic wiring statements into
//! concrete pin/wire links, aggregates a bill of materials per harness and
//! across a project, and assembles a diagram graph ready for Graphviz.
//!
//! # Quick Start
//!
//! ```no_run
//! use wireloom::{HarnessInput, WireloomCore};
//!
//! let input: HarnessInput = serde_json::from_str(r#"{
//!     "connectors": {"X1": {"pincount": 2}, "X2": {"pincount": 2}},
//!     "cables": {"W1": {"wirecount": 2, "length": 0.5}},
//!     "connections": [[{"X1": [1, 2]}, {"W1": [1, 2]}, {"X2": [1, 2]}]]
//! }"#).unwrap();
//!
//! let output = WireloomCore::build_harness("example", &input).unwrap();
//! for entry in &output.bom.entries {
//!     println!("{} x {}", entry.qty, entry.description());
//! }
//! println!("{}", wireloom::diagram::to_dot(&output.diagram));
//! ```
//!
//! # Features
//!
//! - **Connection resolver**: pin ids, labels, `LABEL__NUMBER`, wire colors and labels
//! - **BOM aggregation**: per-harness and shared BOMs with quantity multipliers
//! - **Diagram assembly**: nodes, ports and colored wire edges; DOT output

pub mod bom;
pub mod core;
pub mod diagram;
pub mod harness;
pub mod model;
pub mod resolver;

// Re-export main types
pub use bom::{BomEntry, BomKey, BomRenderOptions, HarnessBom, QtyMultiplierTable, SharedBom};
pub use core::{
    discover_harness_files, harness_name, BuildOptions, HarnessError, HarnessOutput,
    ProjectOutput, WireloomCore,
};
pub use diagram::{Diagram, RenderContext};
pub use harness::Harness;
pub use model::HarnessInput;
pub use resolver::ConnectionResolver;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        BomEntry, BomRenderOptions, BuildOptions, Diagram, Harness, HarnessError, HarnessInput,
        SharedBom, WireloomCore,
    };
}
