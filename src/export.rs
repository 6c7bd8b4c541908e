//! Flattening of comparison results for CSV, JSON and terminal output.

use std::{io::Write, path::Path};

use anyhow::{Context, Result};

use crate::{
    io_utils,
    reconcile::{ComparisonResult, LineFields, Status, Summary},
    table,
};

pub const RESULT_HEADERS: [&str; 11] = [
    "status",
    "original_code",
    "original_quantity",
    "original_description",
    "original_revision",
    "original_category",
    "partial_code",
    "partial_quantity",
    "partial_description",
    "partial_revision",
    "partial_category",
];

pub fn result_headers() -> Vec<String> {
    RESULT_HEADERS.iter().map(|h| h.to_string()).collect()
}

fn side_cells(fields: Option<&LineFields>) -> [String; 5] {
    match fields {
        Some(f) => [
            f.code.clone(),
            f.quantity.to_string(),
            f.description.clone().unwrap_or_default(),
            f.revision.clone().unwrap_or_default(),
            f.category.clone().unwrap_or_default(),
        ],
        None => Default::default(),
    }
}

/// One positional record per result, in [`RESULT_HEADERS`] order. Absent
/// values render as empty strings.
pub fn result_records(results: &[ComparisonResult]) -> Vec<Vec<String>> {
    results
        .iter()
        .map(|result| {
            let mut record = Vec::with_capacity(RESULT_HEADERS.len());
            record.push(result.status.to_string());
            record.extend(side_cells(result.original.as_ref()));
            record.extend(side_cells(result.partial.as_ref()));
            record
        })
        .collect()
}

pub fn write_csv(results: &[ComparisonResult], path: Option<&Path>, delimiter: u8) -> Result<()> {
    io_utils::write_records(path, delimiter, &result_headers(), &result_records(results))
}

pub fn write_json(results: &[ComparisonResult], path: Option<&Path>) -> Result<()> {
    let mut output = io_utils::open_output(path)?;
    serde_json::to_writer_pretty(&mut output, results).context("Serializing results to JSON")?;
    writeln!(output)?;
    output.flush().context("Flushing output")?;
    Ok(())
}

pub fn render_results(results: &[ComparisonResult]) -> String {
    table::render_table(&result_headers(), &result_records(results))
}

pub fn render_summary(summary: &Summary) -> String {
    let rows = Status::ALL
        .iter()
        .map(|status| vec![status.to_string(), summary.count(*status).to_string()])
        .chain(std::iter::once(vec![
            "TOTAL".to_string(),
            summary.total.to_string(),
        ]))
        .collect::<Vec<_>>();
    table::render_table(&["status".to_string(), "count".to_string()], &rows)
}
