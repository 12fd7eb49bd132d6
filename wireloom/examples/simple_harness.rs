//! Simple harness example: build one harness and print its BOM and diagram summary.

use std::path::Path;
use wireloom::prelude::*;

fn main() -> Result<(), HarnessError> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/fixtures/striped.yml".to_string());
    let path = Path::new(&path);

    if !path.exists() {
        eprintln!("File not found: {}", path.display());
        eprintln!("Usage: cargo run --example simple_harness [path/to/harness.yml]");
        std::process::exit(1);
    }

    let text = std::fs::read_to_string(path)?;
    let input: HarnessInput =
        serde_yaml::from_str(&text).map_err(|e| HarnessError::Parse(e.to_string()))?;
    let output = WireloomCore::build_harness(&wireloom::harness_name(path), &input)?;

    println!("Harness: {}", output.name());
    println!("BOM entries: {}", output.bom.len());
    for entry in &output.bom.entries {
        println!("  #{:<3} {:>8}  {}", entry.id, entry.qty.to_string(), entry.description());
    }

    println!();
    println!(
        "Diagram: {} nodes, {} edges",
        output.diagram.node_count(),
        output.diagram.edge_count()
    );
    Ok(())
}
