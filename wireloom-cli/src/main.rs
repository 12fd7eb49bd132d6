//! WireLoom CLI - wiring harness BOMs and diagrams from the command line.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;
use wireloom::bom::rows_to_tsv;
use wireloom::diagram::to_dot;
use wireloom::model::colors::{known_colors, COLOR_CODES};
use wireloom::{
    discover_harness_files, harness_name, BomRenderOptions, BuildOptions, HarnessInput,
    ProjectOutput, WireloomCore,
};

#[derive(Parser)]
#[command(name = "wireloom")]
#[command(about = "Wiring harness BOM and diagram generator", long_about = None)]
#[command(version)]
struct Cli {
    /// Verbose logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build BOM, diagram and JSON outputs for each harness
    Build {
        /// Harness files (.yml, .yaml, .json), or directories searched for .yml/.yaml files
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,

        /// Output directory (defaults to each file's directory)
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Also write shared_bom.tsv across all harnesses
        #[arg(long)]
        shared_bom: bool,

        /// JSON table of harness-name suffix to quantity multiplier
        #[arg(long, value_name = "FILE", requires = "shared_bom")]
        multipliers: Option<PathBuf>,
    },

    /// Print the shared BOM of one or more harnesses
    Bom {
        /// Harness files (.yml, .yaml, .json), or directories searched for .yml/.yaml files
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// JSON table of harness-name suffix to quantity multiplier
        #[arg(long, value_name = "FILE")]
        multipliers: Option<PathBuf>,

        /// Do not shorten descriptions and designator lists
        #[arg(long)]
        full: bool,
    },

    /// List known color codes and wire color palettes
    Colors,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Aligned columns
    Human,
    /// Tab separated values
    Tsv,
    /// JSON entries
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Build {
            files,
            output_dir,
            shared_bom,
            multipliers,
        } => handle_build(&files, output_dir.as_deref(), shared_bom, multipliers),
        Commands::Bom {
            files,
            format,
            multipliers,
            full,
        } => handle_bom(&files, format, multipliers, full),
        Commands::Colors => {
            handle_colors();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "wireloom=debug" } else { "wireloom=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Expand directories and return harness files in ascending path order.
fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let found = discover_harness_files(path)
                .with_context(|| format!("failed to search {}", path.display()))?;
            files.extend(found);
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            bail!("{} does not exist", path.display());
        }
    }
    files.sort();
    files.dedup();
    if files.is_empty() {
        bail!("no harness files found");
    }
    tracing::debug!("processing {} harness files", files.len());
    Ok(files)
}

fn load_input(path: &Path) -> Result<HarnessInput> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let input = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&text)
            .with_context(|| format!("invalid harness file {}", path.display()))?,
        Some("yml") | Some("yaml") => serde_yaml::from_str(&text)
            .with_context(|| format!("invalid harness file {}", path.display()))?,
        _ => bail!("{}: file must be .yml, .yaml or .json", path.display()),
    };
    Ok(input)
}

fn build_project(
    files: &[PathBuf],
    multipliers: Option<PathBuf>,
    bom_render: BomRenderOptions,
) -> Result<ProjectOutput> {
    let mut inputs = Vec::with_capacity(files.len());
    for file in files {
        inputs.push((harness_name(file), load_input(file)?));
    }
    let mut names: Vec<&str> = inputs.iter().map(|(name, _)| name.as_str()).collect();
    names.sort_unstable();
    if let Some(pair) = names.windows(2).find(|w| w[0] == w[1]) {
        bail!("harness name {} is used by more than one file", pair[0]);
    }

    let options = BuildOptions {
        bom_render,
        use_qty_multipliers: multipliers.is_some(),
        multiplier_file: multipliers,
    };
    Ok(WireloomCore::build_project(inputs, &options)?)
}

fn handle_build(
    paths: &[PathBuf],
    output_dir: Option<&Path>,
    shared_bom: bool,
    multipliers: Option<PathBuf>,
) -> Result<()> {
    let files = collect_files(paths)?;
    let project = build_project(&files, multipliers, BomRenderOptions::full())?;

    if let Some(dir) = output_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    for output in &project.harnesses {
        let source = files
            .iter()
            .find(|f| harness_name(f) == output.name())
            .map(|f| f.parent().unwrap_or_else(|| Path::new(".")).to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        let dir = output_dir.map(Path::to_path_buf).unwrap_or(source);
        let file = |ext: &str| dir.join(format!("{}.{}", output.name(), ext));

        let tsv = rows_to_tsv(&project.harness_bom_rows(output))?;
        write_file(&file("tsv"), &tsv)?;
        write_file(&file("gv"), &to_dot(&output.diagram))?;
        let json = serde_json::json!({
            "harness": output.name(),
            "bom": output.bom,
            "diagram": output.diagram,
        });
        write_file(&file("json"), &serde_json::to_string_pretty(&json)?)?;
        println!("Built {}", output.name());
    }

    if shared_bom {
        let dir = output_dir.map(Path::to_path_buf).unwrap_or_else(|| {
            files[0]
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf()
        });
        let tsv = rows_to_tsv(&project.shared_bom_rows())?;
        write_file(&dir.join("shared_bom.tsv"), &tsv)?;
        println!("Shared BOM: {} entries", project.shared_bom.len());
    }
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

fn handle_bom(
    paths: &[PathBuf],
    format: OutputFormat,
    multipliers: Option<PathBuf>,
    full: bool,
) -> Result<()> {
    let files = collect_files(paths)?;
    let render = if full {
        BomRenderOptions::full()
    } else {
        BomRenderOptions {
            no_per_harness: files.len() < 2,
            ..BomRenderOptions::default()
        }
    };
    let project = build_project(&files, multipliers, render)?;

    match format {
        OutputFormat::Human => output_human(&project.shared_bom_rows()),
        OutputFormat::Tsv => print!("{}", rows_to_tsv(&project.shared_bom_rows())?),
        OutputFormat::Json => {
            let output = serde_json::json!({
                "harnesses": project.harnesses.iter().map(|h| h.name()).collect::<Vec<_>>(),
                "entries": project.shared_bom.entries(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn output_human(rows: &[Vec<String>]) {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|i| {
            rows.iter()
                .filter_map(|r| r.get(i))
                .map(|c| c.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    for (n, row) in rows.iter().enumerate() {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect();
        println!("{}", cells.join("  ").trim_end());
        if n == 0 {
            println!("{}", "─".repeat(widths.iter().sum::<usize>() + 2 * columns.saturating_sub(1)));
        }
    }
}

fn handle_colors() {
    println!("Known colors:\n");
    for (code, hex, name) in known_colors() {
        println!("  {}  {}  {}", code, hex, name);
    }

    println!("\nColor codes:\n");
    for (code, palette) in COLOR_CODES {
        println!("  {:<6} {}", code, palette.join(" "));
    }
}
