//! In-memory table model shared by the rule engine and the reconciler.
//!
//! A [`Table`] owns a fixed header list and a sequence of [`Row`]s. Each row
//! maps header names to raw [`Cell`] values exactly as they were read from
//! the spreadsheet export; nothing is typed or validated on intake.

use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn as_display(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => format_number(*n),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

/// Renders integral values without a fractional part ("5", not "5.0").
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        (value as i64).to_string()
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    cells: HashMap<String, Cell>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Cell>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            cells: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.cells.get(column)
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Cell>) {
        self.cells.insert(column.into(), value.into());
    }

    /// Stringified cell content, `None` when the column is absent.
    pub fn text(&self, column: &str) -> Option<String> {
        self.cells.get(column).map(Cell::as_display)
    }

    /// Trimmed stringified content for an optional role column. Unmapped
    /// roles, missing cells and blank cells all read as `None`.
    pub fn field(&self, column: Option<&str>) -> Option<String> {
        let value = self.text(column?)?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Trimmed code string; an absent code reads as the empty string.
    pub fn code(&self, column: &str) -> String {
        self.text(column)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    /// Builds a table from positional records, padding short records with
    /// empty strings so every header key is present on every row.
    pub fn from_records(headers: Vec<String>, records: Vec<Vec<String>>) -> Self {
        let rows = records
            .into_iter()
            .map(|record| {
                let mut row = Row::new();
                for (idx, header) in headers.iter().enumerate() {
                    let value = record.get(idx).cloned().unwrap_or_default();
                    row.set(header.clone(), Cell::Text(value));
                }
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Positional string records in header order, for rendering and export.
    pub fn records(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                self.headers
                    .iter()
                    .map(|h| row.text(h).unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}
