//! Matching and classification of source rows against the target list.
//!
//! [`compare`] runs in three steps:
//!
//! 1. index the partial list ([`TargetIndex`]);
//! 2. walk the original list, row by row or grouped by key, classifying each
//!    unit as an exact key match, a revision fallback, missing from the
//!    target, or carrying an unreadable quantity;
//! 3. independently of how step 2 walked, collect the target keys touched by
//!    the original list and report every other target entry as missing from
//!    the original. Keeping this pass separate makes the target-only results
//!    identical in both walking modes.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    data::{Table, format_number},
    error::ReconcileError,
    index::{RevisionEntry, TargetEntry, TargetIndex},
    key::key_of,
    mapping::{Mappings, ResolvedMapping, Side},
    quantity::{normalize, quantities_equal},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    QuantityEqual,
    QuantityDifferent,
    RevisionDifferent,
    Absent,
    AbsentInOriginal,
    InvalidQuantity,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Status::QuantityEqual,
        Status::QuantityDifferent,
        Status::RevisionDifferent,
        Status::Absent,
        Status::AbsentInOriginal,
        Status::InvalidQuantity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::QuantityEqual => "QUANTITY_EQUAL",
            Status::QuantityDifferent => "QUANTITY_DIFFERENT",
            Status::RevisionDifferent => "REVISION_DIFFERENT",
            Status::Absent => "ABSENT",
            Status::AbsentInOriginal => "ABSENT_IN_ORIGINAL",
            Status::InvalidQuantity => "INVALID_QUANTITY",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A quantity as reported in results: parsed, or the raw text when it
/// could not be parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Number(f64),
    Raw(String),
}

impl Quantity {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Quantity::Number(n) => Some(*n),
            Quantity::Raw(_) => None,
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantity::Number(n) => f.write_str(&format_number(*n)),
            Quantity::Raw(raw) => f.write_str(raw),
        }
    }
}

/// One side of a result line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineFields {
    pub code: String,
    pub quantity: Quantity,
    pub description: Option<String>,
    pub revision: Option<String>,
    pub category: Option<String>,
}

impl From<&TargetEntry> for LineFields {
    fn from(entry: &TargetEntry) -> Self {
        LineFields {
            code: entry.code.clone(),
            quantity: Quantity::Number(entry.quantity),
            description: entry.description.clone(),
            revision: entry.revision.clone(),
            category: entry.category.clone(),
        }
    }
}

impl LineFields {
    fn from_revision(code: &str, entry: &RevisionEntry) -> Self {
        LineFields {
            code: code.to_string(),
            quantity: Quantity::Number(entry.quantity),
            description: entry.description.clone(),
            revision: entry.revision.clone(),
            category: entry.category.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub original: Option<LineFields>,
    pub partial: Option<LineFields>,
    pub status: Status,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareOptions {
    pub ignore_revision: bool,
    /// Treat every key match as equal regardless of quantities.
    pub ignore_quantity: bool,
}

#[derive(Debug, Clone)]
struct SourceLine {
    key: String,
    code: String,
    quantity: Option<f64>,
    raw_quantity: String,
    description: Option<String>,
    revision: Option<String>,
    category: Option<String>,
}

impl SourceLine {
    fn read(table: &Table, columns: &ResolvedMapping<'_>, ignore_revision: bool) -> Vec<Self> {
        table
            .rows
            .iter()
            .map(|row| {
                let code = row.code(columns.code);
                let revision = row.field(columns.revision);
                SourceLine {
                    key: key_of(&code, revision.as_deref(), ignore_revision),
                    quantity: normalize(row.get(columns.quantity)),
                    raw_quantity: row.text(columns.quantity).unwrap_or_default(),
                    description: row.field(columns.description),
                    category: row.field(columns.category),
                    revision,
                    code,
                }
            })
            .collect()
    }

    fn fields(&self, quantity: Quantity) -> LineFields {
        LineFields {
            code: self.code.clone(),
            quantity,
            description: self.description.clone(),
            revision: self.revision.clone(),
            category: self.category.clone(),
        }
    }

    fn invalid(&self) -> ComparisonResult {
        ComparisonResult {
            original: Some(self.fields(Quantity::Raw(self.raw_quantity.clone()))),
            partial: None,
            status: Status::InvalidQuantity,
        }
    }
}

struct Classifier<'a> {
    index: &'a TargetIndex,
    options: &'a CompareOptions,
}

impl Classifier<'_> {
    fn quantity_status(&self, source: f64, target: f64) -> Status {
        if self.options.ignore_quantity || quantities_equal(source, target) {
            Status::QuantityEqual
        } else {
            Status::QuantityDifferent
        }
    }

    fn matched(&self, line: &SourceLine, quantity: f64, target: &TargetEntry) -> ComparisonResult {
        ComparisonResult {
            original: Some(line.fields(Quantity::Number(quantity))),
            partial: Some(target.into()),
            status: self.quantity_status(quantity, target.quantity),
        }
    }

    fn revision_fallback(
        &self,
        line: &SourceLine,
        quantity: f64,
        fallback: &RevisionEntry,
    ) -> ComparisonResult {
        ComparisonResult {
            original: Some(line.fields(Quantity::Number(quantity))),
            partial: Some(LineFields::from_revision(&line.code, fallback)),
            status: Status::RevisionDifferent,
        }
    }

    fn absent(&self, line: &SourceLine, quantity: f64) -> ComparisonResult {
        ComparisonResult {
            original: Some(line.fields(Quantity::Number(quantity))),
            partial: None,
            status: Status::Absent,
        }
    }

    /// Row-by-row walk. Unmatched rows are summed per key and reported
    /// after every matched row.
    fn walk_rows(&self, lines: &[SourceLine], out: &mut Vec<ComparisonResult>) {
        let mut pending: Vec<(&SourceLine, f64)> = Vec::new();
        let mut pending_pos: HashMap<&str, usize> = HashMap::new();

        for line in lines {
            let Some(quantity) = line.quantity else {
                out.push(line.invalid());
                continue;
            };
            if let Some(target) = self.index.get(&line.key) {
                out.push(self.matched(line, quantity, target));
            } else if let Some(fallback) = self.index.fallback(&line.code) {
                out.push(self.revision_fallback(line, quantity, fallback));
            } else {
                match pending_pos.get(line.key.as_str()) {
                    Some(&pos) => pending[pos].1 += quantity,
                    None => {
                        pending_pos.insert(line.key.as_str(), pending.len());
                        pending.push((line, quantity));
                    }
                }
            }
        }

        out.extend(
            pending
                .into_iter()
                .map(|(template, total)| self.absent(template, total)),
        );
    }

    /// Grouped walk: same-key rows are summed and compared once. A group
    /// whose sum disagrees with the target is expanded back into its rows.
    fn walk_groups(&self, lines: &[SourceLine], out: &mut Vec<ComparisonResult>) {
        for group in group_by_key(lines) {
            let valid = group
                .iter()
                .filter_map(|line| line.quantity.map(|q| (*line, q)))
                .collect::<Vec<_>>();
            let invalid = group.iter().filter(|line| line.quantity.is_none());

            let Some(&(template, _)) = valid.first() else {
                out.extend(invalid.map(|line| line.invalid()));
                continue;
            };
            let total: f64 = valid.iter().map(|(_, q)| q).sum();

            if let Some(target) = self.index.get(&template.key) {
                if self.quantity_status(total, target.quantity) == Status::QuantityEqual {
                    out.push(self.matched(template, total, target));
                    out.extend(invalid.map(|line| line.invalid()));
                } else {
                    for line in &group {
                        match line.quantity {
                            Some(q) => out.push(self.matched(line, q, target)),
                            None => out.push(line.invalid()),
                        }
                    }
                }
            } else if let Some(fallback) = self.index.fallback(&template.code) {
                out.push(self.revision_fallback(template, total, fallback));
                out.extend(invalid.map(|line| line.invalid()));
            } else {
                out.push(self.absent(template, total));
                out.extend(invalid.map(|line| line.invalid()));
            }
        }
    }

    /// Target entries never reached from the original list, whichever way
    /// it was walked.
    fn absent_in_original(&self, lines: &[SourceLine]) -> Vec<ComparisonResult> {
        let mut processed: HashSet<String> = HashSet::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for line in lines.iter().filter(|line| line.quantity.is_some()) {
            if !seen.insert(line.key.as_str()) {
                continue;
            }
            if self.index.get(&line.key).is_some() {
                processed.insert(line.key.clone());
            } else {
                processed.extend(self.index.revision_keys(&line.code));
            }
        }

        self.index
            .iter()
            .filter(|(key, _)| !processed.contains(*key))
            .map(|(_, entry)| ComparisonResult {
                original: None,
                partial: Some(entry.into()),
                status: Status::AbsentInOriginal,
            })
            .collect()
    }
}

fn group_by_key(lines: &[SourceLine]) -> Vec<Vec<&SourceLine>> {
    let mut groups: Vec<Vec<&SourceLine>> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for line in lines {
        match positions.get(line.key.as_str()) {
            Some(&pos) => groups[pos].push(line),
            None => {
                positions.insert(line.key.as_str(), groups.len());
                groups.push(vec![line]);
            }
        }
    }
    groups
}

/// Reconciles the original list against the partial list.
///
/// Fails only when either side lacks a usable `code` or `quantity` column;
/// every row is otherwise classified into exactly one [`Status`].
pub fn compare(
    original: &Table,
    partial: &Table,
    mappings: &Mappings,
    aggregate: bool,
    options: &CompareOptions,
) -> Result<Vec<ComparisonResult>, ReconcileError> {
    let original_columns = mappings.original.resolve(Side::Original, original)?;
    let partial_columns = mappings.partial.resolve(Side::Partial, partial)?;

    let index = TargetIndex::build(partial, &partial_columns, options.ignore_revision);
    let lines = SourceLine::read(original, &original_columns, options.ignore_revision);
    debug!(
        "Comparing {} original row(s) against {} partial key(s) (aggregate: {aggregate}, ignore revision: {})",
        lines.len(),
        index.len(),
        options.ignore_revision
    );

    let classifier = Classifier {
        index: &index,
        options,
    };
    let mut results = Vec::with_capacity(lines.len() + index.len());
    if aggregate {
        classifier.walk_groups(&lines, &mut results);
    } else {
        classifier.walk_rows(&lines, &mut results);
    }
    results.extend(classifier.absent_in_original(&lines));
    Ok(results)
}

/// Result counts per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub by_status: BTreeMap<Status, usize>,
}

impl Summary {
    pub fn count(&self, status: Status) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }

    /// Number of results that need attention (everything but equal matches).
    pub fn discrepancies(&self) -> usize {
        self.total - self.count(Status::QuantityEqual)
    }
}

pub fn summarize(results: &[ComparisonResult]) -> Summary {
    let mut summary = Summary {
        total: results.len(),
        by_status: Status::ALL.iter().map(|status| (*status, 0)).collect(),
    };
    for result in results {
        *summary.by_status.entry(result.status).or_insert(0) += 1;
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::Mapping;

    fn table(rows: &[(&str, &str)]) -> Table {
        Table::from_records(
            vec!["code".into(), "qty".into()],
            rows.iter()
                .map(|(c, q)| vec![c.to_string(), q.to_string()])
                .collect(),
        )
    }

    fn mappings() -> Mappings {
        Mappings::new(Mapping::new("code", "qty"), Mapping::new("code", "qty"))
    }

    fn statuses(results: &[ComparisonResult]) -> Vec<Status> {
        results.iter().map(|r| r.status).collect()
    }

    #[test]
    fn duplicate_absent_rows_collapse_into_one_result() {
        let original = table(&[("Y", "2"), ("Y", "3")]);
        let partial = table(&[]);
        let results = compare(&original, &partial, &mappings(), false, &CompareOptions::default())
            .unwrap();
        assert_eq!(statuses(&results), vec![Status::Absent]);
        let quantity = &results[0].original.as_ref().unwrap().quantity;
        assert_eq!(quantity, &Quantity::Number(5.0));
    }

    #[test]
    fn invalid_quantity_keeps_raw_text() {
        let original = table(&[("A", "12x")]);
        let partial = table(&[("A", "12")]);
        let results = compare(&original, &partial, &mappings(), false, &CompareOptions::default())
            .unwrap();
        assert_eq!(
            statuses(&results),
            vec![Status::InvalidQuantity, Status::AbsentInOriginal]
        );
        assert_eq!(
            results[0].original.as_ref().unwrap().quantity,
            Quantity::Raw("12x".into())
        );
        assert!(results[0].partial.is_none());
    }

    #[test]
    fn ignore_quantity_forces_equal_matches() {
        let original = table(&[("A", "1"), ("A", "2")]);
        let partial = table(&[("A", "10")]);
        let options = CompareOptions {
            ignore_quantity: true,
            ..CompareOptions::default()
        };
        let grouped = compare(&original, &partial, &mappings(), true, &options).unwrap();
        assert_eq!(statuses(&grouped), vec![Status::QuantityEqual]);
        let flat = compare(&original, &partial, &mappings(), false, &options).unwrap();
        assert_eq!(
            statuses(&flat),
            vec![Status::QuantityEqual, Status::QuantityEqual]
        );
    }

    #[test]
    fn grouped_mode_reports_invalid_rows_beside_the_aggregate() {
        let original = table(&[("A", "4"), ("A", "?"), ("A", "6")]);
        let partial = table(&[("A", "10")]);
        let results =
            compare(&original, &partial, &mappings(), true, &CompareOptions::default()).unwrap();
        assert_eq!(
            statuses(&results),
            vec![Status::QuantityEqual, Status::InvalidQuantity]
        );
        assert_eq!(
            results[0].original.as_ref().unwrap().quantity,
            Quantity::Number(10.0)
        );
    }

    #[test]
    fn summary_counts_every_status() {
        let original = table(&[("A", "1"), ("B", "x"), ("C", "1")]);
        let partial = table(&[("A", "2"), ("D", "1")]);
        let results = compare(&original, &partial, &mappings(), false, &CompareOptions::default())
            .unwrap();
        let summary = summarize(&results);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.count(Status::QuantityDifferent), 1);
        assert_eq!(summary.count(Status::InvalidQuantity), 1);
        assert_eq!(summary.count(Status::Absent), 1);
        assert_eq!(summary.count(Status::AbsentInOriginal), 1);
        assert_eq!(summary.count(Status::RevisionDifferent), 0);
        assert_eq!(summary.discrepancies(), 4);
    }
}
