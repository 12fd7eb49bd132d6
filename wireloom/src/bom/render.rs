//! Tabular BOM output.

use serde::{Deserialize, Serialize};

use super::BomEntry;
use crate::core::HarnessError;
use crate::model::partnumber::PART_NUMBER_COLUMNS;

pub const MAX_PRINTED_DESCRIPTION: usize = 40;
pub const MAX_PRINTED_DESIGNATORS: usize = 2;

const LEADING_COLUMNS: [&str; 6] = ["#", "Qty", "Unit", "Description", "Designators", "Per Harness"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomRenderOptions {
    /// Shorten long descriptions and designator lists.
    pub restrict_printed_lengths: bool,
    /// Drop columns that are empty for every entry.
    pub filter_entries: bool,
    /// Omit the per-harness breakdown column.
    pub no_per_harness: bool,
}

impl Default for BomRenderOptions {
    fn default() -> Self {
        Self {
            restrict_printed_lengths: true,
            filter_entries: false,
            no_per_harness: true,
        }
    }
}

impl BomRenderOptions {
    /// Full, untruncated listing, as written to the BOM file.
    pub fn full() -> Self {
        Self {
            restrict_printed_lengths: false,
            filter_entries: false,
            no_per_harness: false,
        }
    }
}

fn description_cell(description: &str, restrict: bool) -> String {
    if restrict && description.chars().count() >= MAX_PRINTED_DESCRIPTION {
        let short: String = description.chars().take(MAX_PRINTED_DESCRIPTION).collect();
        format!("{} (...)", short)
    } else {
        description.to_string()
    }
}

fn designators_cell(entry: &BomEntry, restrict: bool) -> String {
    let designators: Vec<&str> = entry.designators.iter().map(String::as_str).collect();
    if restrict && designators.len() > MAX_PRINTED_DESIGNATORS {
        format!("{}, ...", designators[..MAX_PRINTED_DESIGNATORS].join(", "))
    } else {
        designators.join(", ")
    }
}

fn per_harness_cell(entry: &BomEntry) -> String {
    entry
        .per_harness
        .iter()
        .map(|h| format!("{}: {}", h.harness, h.qty.number_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn entry_row(entry: &BomEntry, options: &BomRenderOptions) -> Vec<String> {
    let mut row = vec![
        entry.id.to_string(),
        entry.qty.number_str(),
        entry.qty.unit_str().to_string(),
        description_cell(entry.description(), options.restrict_printed_lengths),
        designators_cell(entry, options.restrict_printed_lengths),
        per_harness_cell(entry),
    ];
    row.extend(entry.partnumbers().columns());
    row
}

/// Header row followed by one row per entry.
pub fn bom_rows<'a, I>(entries: I, options: &BomRenderOptions) -> Vec<Vec<String>>
where
    I: IntoIterator<Item = &'a BomEntry>,
{
    let header: Vec<String> = LEADING_COLUMNS
        .iter()
        .chain(PART_NUMBER_COLUMNS.iter())
        .map(|c| c.to_string())
        .collect();
    let body: Vec<Vec<String>> = entries.into_iter().map(|e| entry_row(e, options)).collect();

    let keep: Vec<bool> = header
        .iter()
        .enumerate()
        .map(|(col, name)| {
            if name == "Per Harness" && options.no_per_harness {
                return false;
            }
            !options.filter_entries || body.is_empty() || body.iter().any(|row| !row[col].is_empty())
        })
        .collect();

    std::iter::once(header)
        .chain(body)
        .map(|row| {
            row.into_iter()
                .zip(&keep)
                .filter_map(|(cell, &k)| k.then_some(cell))
                .collect()
        })
        .collect()
}

/// Tab-separated text of the given rows.
pub fn rows_to_tsv(rows: &[Vec<String>]) -> Result<String, HarnessError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_writer(Vec::new());
    for row in rows {
        writer.write_record(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| HarnessError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| HarnessError::Parse(e.to_string()))
}
