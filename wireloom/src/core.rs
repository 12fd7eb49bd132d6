//! Core build pipeline shared by the CLI and library users.
//! Harness in, BOM and diagram out; no file format dependencies.

use std::path::{Path, PathBuf};

use crate::bom::{BomRenderOptions, HarnessBom, QtyMultiplierTable, SharedBom};
use crate::diagram::Diagram;
use crate::harness::Harness;
use crate::model::HarnessInput;

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("{kind} {token} not found in {scope}")]
    ReferenceNotFound {
        kind: &'static str,
        scope: String,
        token: String,
    },
    #[error("{designator}:{token} is ambiguous: {detail}")]
    AmbiguousReference {
        designator: String,
        token: String,
        detail: String,
    },
    #[error("{designator}: pin {number} is labelled {actual:?}, not {label:?}")]
    InconsistentReference {
        designator: String,
        label: String,
        number: String,
        actual: String,
    },
    #[error("cannot combine {left} and {right}: units differ")]
    UnitMismatch { left: String, right: String },
    #[error("Quantity multiplier error: {0}")]
    MultiplierConfiguration(String),
    #[error("BOM identity error: {0}")]
    IdentityStability(String),
    #[error("{designator}: {reason}")]
    InvalidDefinition { designator: String, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Options for a project build (CLI or library).
#[derive(Clone, Debug, Default)]
pub struct BuildOptions {
    pub bom_render: BomRenderOptions,
    /// Rescale the shared BOM with per-harness multipliers after merging.
    pub use_qty_multipliers: bool,
    /// JSON multiplier table, required with `use_qty_multipliers`.
    pub multiplier_file: Option<PathBuf>,
}

/// Per-harness build output.
#[derive(Debug, Clone)]
pub struct HarnessOutput {
    pub harness: Harness,
    pub bom: HarnessBom,
    pub diagram: Diagram,
}

impl HarnessOutput {
    pub fn name(&self) -> &str {
        &self.harness.name
    }

    /// BOM rows of this harness, ids as of the last shared merge.
    pub fn bom_rows(&self, options: &BomRenderOptions) -> Vec<Vec<String>> {
        crate::bom::bom_rows(&self.bom.entries, options)
    }
}

#[derive(Debug, Clone)]
pub struct ProjectOutput {
    pub harnesses: Vec<HarnessOutput>,
    pub shared_bom: SharedBom,
    /// Render options the project was built with.
    pub bom_render: BomRenderOptions,
}

impl ProjectOutput {
    pub fn shared_bom_rows(&self) -> Vec<Vec<String>> {
        crate::bom::bom_rows(self.shared_bom.entries(), &self.bom_render)
    }

    pub fn harness_bom_rows(&self, harness: &HarnessOutput) -> Vec<Vec<String>> {
        harness.bom_rows(&self.bom_render)
    }
}

const MAX_SEARCH_DEPTH: usize = 20;

/// Recursively discover harness description files (`.yml`, `.yaml`) in a
/// directory. Hidden directories are skipped.
pub fn discover_harness_files(dir: &Path) -> Result<Vec<PathBuf>, HarnessError> {
    let mut files = Vec::new();
    let mut pending = vec![(dir.to_path_buf(), 0)];
    while let Some((dir, depth)) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                if depth < MAX_SEARCH_DEPTH && !is_hidden(&path) {
                    pending.push((path, depth + 1));
                }
            } else if is_harness_file(&path) {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

fn is_harness_file(path: &Path) -> bool {
    path.is_file()
        && matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("yml" | "yaml")
        )
}

/// Harness name of a description file: its file stem.
pub fn harness_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("harness")
        .to_string()
}

/// Core build API used by the CLI.
pub struct WireloomCore;

impl WireloomCore {
    /// Build one harness: model, connections, BOM and diagram.
    pub fn build_harness(name: &str, input: &HarnessInput) -> Result<HarnessOutput, HarnessError> {
        let harness = Harness::from_input(name, input)?;
        let bom = HarnessBom::build(&harness)?;
        let diagram = Diagram::assemble(&harness, &bom.bom_ids)?;
        Ok(HarnessOutput {
            harness,
            bom,
            diagram,
        })
    }

    /// Build every harness in ascending name order and merge their BOMs into
    /// one shared BOM. Diagrams carry the shared BOM ids.
    pub fn build_project(
        mut inputs: Vec<(String, HarnessInput)>,
        options: &BuildOptions,
    ) -> Result<ProjectOutput, HarnessError> {
        inputs.sort_by(|a, b| a.0.cmp(&b.0));

        let mut shared_bom = SharedBom::new();
        let mut harnesses = Vec::with_capacity(inputs.len());
        for (name, input) in &inputs {
            let harness = Harness::from_input(name.as_str(), input)?;
            let mut bom = HarnessBom::build(&harness)?;
            shared_bom.merge(&mut bom)?;
            let diagram = Diagram::assemble(&harness, &bom.bom_ids)?;
            harnesses.push(HarnessOutput {
                harness,
                bom,
                diagram,
            });
        }

        if options.use_qty_multipliers {
            let path = options.multiplier_file.as_deref().ok_or_else(|| {
                HarnessError::MultiplierConfiguration(
                    "no multiplier file given for quantity multipliers".to_string(),
                )
            })?;
            let table = QtyMultiplierTable::from_file(path)?;
            shared_bom.rescale(&table)?;
        }

        tracing::info!(
            "built {} harnesses, {} shared BOM entries",
            harnesses.len(),
            shared_bom.len()
        );
        Ok(ProjectOutput {
            harnesses,
            shared_bom,
            bom_render: options.bom_render,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let e = HarnessError::ReferenceNotFound {
            kind: "pin",
            scope: "X1".into(),
            token: "VCC".into(),
        };
        assert_eq!(e.to_string(), "pin VCC not found in X1");

        let e = HarnessError::UnitMismatch {
            left: "1 m".into(),
            right: "2 ft".into(),
        };
        assert!(e.to_string().contains("units differ"));
    }

    #[test]
    fn test_harness_name_from_path() {
        assert_eq!(harness_name(Path::new("dir/main_A.yml")), "main_A");
    }

    #[test]
    fn test_discover_harness_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.yml"), "").unwrap();
        std::fs::write(dir.path().join("a.yaml"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join(".hidden")).unwrap();
        std::fs::write(dir.path().join(".hidden").join("c.yml"), "").unwrap();

        std::fs::write(dir.path().join("d.json"), "{}").unwrap();

        let files = discover_harness_files(dir.path()).unwrap();
        let names: Vec<String> = files.iter().map(|p| harness_name(p)).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_discover_in_build_and_target_dirs() {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["build", "target"] {
            std::fs::create_dir(dir.path().join(sub)).unwrap();
        }
        std::fs::write(dir.path().join("build").join("loom.yml"), "").unwrap();
        std::fs::write(dir.path().join("target").join("pigtail.yaml"), "").unwrap();

        let files = discover_harness_files(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![
                dir.path().join("build").join("loom.yml"),
                dir.path().join("target").join("pigtail.yaml"),
            ]
        );
    }

    #[test]
    fn test_multipliers_need_a_file() {
        let options = BuildOptions {
            use_qty_multipliers: true,
            ..Default::default()
        };
        let result = WireloomCore::build_project(Vec::new(), &options);
        assert!(matches!(result, Err(HarnessError::MultiplierConfiguration(_))));
    }
}
