//! Applies transformation rules to a table before comparison.
//!
//! Exclusions run first and are evaluated independently against every row.
//! Merges then run in rule order, each seeing the table produced by the
//! previous merge, and append one synthetic row per rule that fired.

use std::collections::HashSet;

use log::debug;

use crate::{
    data::{Cell, Row, Table},
    mapping::ResolvedMapping,
    quantity::normalize,
    rules::{ExcludeKind, TransformationRule, split_codes},
};

enum Exclusion<'r> {
    CodeIn(HashSet<String>),
    CodePrefix(&'r str),
    DescriptionContains(String),
    DescriptionPrefix(String),
    CategoryIs(&'r str),
}

impl<'r> Exclusion<'r> {
    fn compile(kind: ExcludeKind, value: &'r str) -> Self {
        match kind {
            ExcludeKind::CodeExact => Exclusion::CodeIn(split_codes(value).into_iter().collect()),
            ExcludeKind::CodePrefix => Exclusion::CodePrefix(value),
            ExcludeKind::DescriptionContains => Exclusion::DescriptionContains(value.to_uppercase()),
            ExcludeKind::DescriptionPrefix => Exclusion::DescriptionPrefix(value.to_uppercase()),
            ExcludeKind::CategoryExact => Exclusion::CategoryIs(value),
        }
    }

    fn matches(&self, row: &Row, columns: &ResolvedMapping<'_>) -> bool {
        match self {
            Exclusion::CodeIn(codes) => codes.contains(&row.code(columns.code)),
            Exclusion::CodePrefix(prefix) => row.code(columns.code).starts_with(*prefix),
            Exclusion::DescriptionContains(needle) => {
                description_upper(row, columns).is_some_and(|d| d.contains(needle.as_str()))
            }
            Exclusion::DescriptionPrefix(prefix) => {
                description_upper(row, columns).is_some_and(|d| d.starts_with(prefix.as_str()))
            }
            Exclusion::CategoryIs(category) => columns
                .category
                .and_then(|column| row.text(column))
                .is_some_and(|value| value.trim() == *category),
        }
    }
}

fn description_upper(row: &Row, columns: &ResolvedMapping<'_>) -> Option<String> {
    let column = columns.description?;
    Some(row.text(column).unwrap_or_default().to_uppercase())
}

/// Returns a new table with the active rules applied. Headers are copied
/// unchanged; disabled rules are ignored.
pub fn apply_rules(
    table: &Table,
    rules: &[TransformationRule],
    columns: &ResolvedMapping<'_>,
) -> Table {
    let active = rules.iter().filter(|rule| rule.is_enabled()).collect::<Vec<_>>();

    let exclusions = active
        .iter()
        .filter_map(|rule| match *rule {
            TransformationRule::Exclude { kind, value, .. } => Some(Exclusion::compile(*kind, value)),
            TransformationRule::Merge { .. } => None,
        })
        .collect::<Vec<_>>();

    let mut rows = table
        .rows
        .iter()
        .filter(|row| !exclusions.iter().any(|rule| rule.matches(row, columns)))
        .cloned()
        .collect::<Vec<_>>();
    let excluded = table.rows.len() - rows.len();
    if excluded > 0 {
        debug!("Exclusion rules removed {excluded} row(s)");
    }

    for rule in active {
        if let TransformationRule::Merge {
            source_codes,
            result_code,
            result_description,
            ..
        } = rule
        {
            apply_merge(
                &table.headers,
                &mut rows,
                source_codes,
                result_code,
                result_description,
                columns,
            );
        }
    }

    Table::new(table.headers.clone(), rows)
}

fn apply_merge(
    headers: &[String],
    rows: &mut Vec<Row>,
    source_codes: &[String],
    result_code: &str,
    result_description: &str,
    columns: &ResolvedMapping<'_>,
) {
    let sources = source_codes.iter().map(String::as_str).collect::<HashSet<_>>();
    let (merged, kept): (Vec<Row>, Vec<Row>) = std::mem::take(rows)
        .into_iter()
        .partition(|row| sources.contains(row.code(columns.code).as_str()));
    *rows = kept;
    if merged.is_empty() {
        return;
    }

    // A code listed twice in the table is one logical item; only its first
    // occurrence contributes to the merged quantity.
    let mut counted = HashSet::new();
    let mut total = 0.0;
    for row in &merged {
        if counted.insert(row.code(columns.code)) {
            total += normalize(row.get(columns.quantity)).unwrap_or(0.0);
        }
    }

    let mut synthesized = Row::new();
    for header in headers {
        synthesized.set(header.clone(), Cell::Text(String::new()));
    }
    synthesized.set(columns.code, Cell::Text(result_code.to_string()));
    synthesized.set(columns.quantity, Cell::Number(total));
    if let Some(description) = columns.description {
        synthesized.set(description, Cell::Text(result_description.to_string()));
    }
    debug!(
        "Merged {} row(s) into '{result_code}' with quantity {total}",
        merged.len()
    );
    rows.push(synthesized);
}
