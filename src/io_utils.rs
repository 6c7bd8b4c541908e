//! Table intake and CSV output.
//!
//! Bills of materials usually reach us as spreadsheet exports: a few banner
//! lines, then a header row, then ragged data rows. [`read_table`] turns such
//! a file into a [`Table`]; the writers emit quoted CSV.
//!
//! - **Delimiters** are picked from the extension (`.tsv` → tab, else comma)
//!   unless given explicitly.
//! - **Encodings** are decoded with `encoding_rs`, defaulting to UTF-8.
//!   Windows-1252 is the common alternative for Excel exports.
//! - **stdin/stdout** are addressed with the `-` path.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::data::Table;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'")),
        None => Ok(UTF_8),
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn resolve_output_delimiter(path: Option<&Path>, provided: Option<u8>, fallback: u8) -> u8 {
    if let Some(delimiter) = provided {
        return delimiter;
    }
    match path.and_then(|p| p.extension()).and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        Some(ext) if ext.eq_ignore_ascii_case("csv") => DEFAULT_CSV_DELIMITER,
        _ => fallback,
    }
}

fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    if is_dash(path) {
        Ok(Box::new(std::io::stdin().lock()))
    } else {
        let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(p) if !is_dash(p) => Ok(Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        ))),
        _ => Ok(Box::new(std::io::stdout())),
    }
}

fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| {
            let (text, _, had_errors) = encoding.decode(field);
            if had_errors {
                Err(anyhow!(
                    "Failed to decode text with encoding {}",
                    encoding.name()
                ))
            } else {
                Ok(text.into_owned())
            }
        })
        .collect()
}

/// Reads a delimited file into a [`Table`]. The first `skip_rows` records
/// are discarded, the next one supplies the headers, and every later
/// record becomes a row padded with empty strings. Blank lines are not
/// records and are not counted as skipped rows.
pub fn read_table(
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
    skip_rows: usize,
) -> Result<Table> {
    let reader = open_input(path)?;
    read_table_from(reader, delimiter, encoding, skip_rows)
        .with_context(|| format!("Reading table from {path:?}"))
}

pub fn read_table_from<R: Read>(
    reader: R,
    delimiter: u8,
    encoding: &'static Encoding,
    skip_rows: usize,
) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(reader);

    let mut headers: Option<Vec<String>> = None;
    let mut records = Vec::new();
    for (ordinal, result) in reader.byte_records().enumerate() {
        let record = result.with_context(|| format!("Reading record {}", ordinal + 1))?;
        if ordinal < skip_rows {
            continue;
        }
        let decoded = decode_record(&record, encoding)
            .with_context(|| format!("Decoding record {}", ordinal + 1))?;
        match headers {
            None => headers = Some(decoded),
            Some(_) => records.push(decoded),
        }
    }

    let headers = headers.unwrap_or_default();
    debug!(
        "Read {} header(s) and {} row(s) after skipping {skip_rows} record(s)",
        headers.len(),
        records.len()
    );
    Ok(Table::from_records(headers, records))
}

pub fn csv_writer(output: Box<dyn Write>, delimiter: u8) -> csv::Writer<Box<dyn Write>> {
    csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Always)
        .double_quote(true)
        .from_writer(output)
}

pub fn write_records(
    path: Option<&Path>,
    delimiter: u8,
    headers: &[String],
    records: &[Vec<String>],
) -> Result<()> {
    let mut writer = csv_writer(open_output(path)?, delimiter);
    writer
        .write_record(headers)
        .context("Writing output headers")?;
    for (idx, record) in records.iter().enumerate() {
        writer
            .write_record(record)
            .with_context(|| format!("Writing output row {}", idx + 2))?;
    }
    writer.flush().context("Flushing output")?;
    Ok(())
}

pub fn write_table(path: Option<&Path>, delimiter: u8, table: &Table) -> Result<()> {
    write_records(path, delimiter, &table.headers, &table.records())
}
