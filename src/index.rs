//! Keyed lookup structures over the partial (target) list.
//!
//! [`TargetIndex`] holds two maps built in a single pass:
//!
//! - by comparison key, summing quantities of duplicate rows and keeping
//!   the first-seen descriptive fields;
//! - by bare code (only when revisions are honoured), one entry per distinct
//!   revision with its own quantity sum, used when a source row's exact
//!   code+revision key is missing but the code exists under another revision.
//!
//! Rows with an empty code or an unparseable quantity never enter either map.

use std::collections::HashMap;

use crate::{data::Table, key::key_of, mapping::ResolvedMapping, quantity::normalize};

#[derive(Debug, Clone, PartialEq)]
pub struct TargetEntry {
    pub code: String,
    pub quantity: f64,
    pub description: Option<String>,
    pub revision: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RevisionEntry {
    pub revision: Option<String>,
    pub description: Option<String>,
    pub quantity: f64,
    pub category: Option<String>,
}

#[derive(Debug, Default)]
pub struct TargetIndex {
    entries: Vec<(String, TargetEntry)>,
    positions: HashMap<String, usize>,
    by_code: HashMap<String, Vec<RevisionEntry>>,
}

impl TargetIndex {
    pub fn build(table: &Table, columns: &ResolvedMapping<'_>, ignore_revision: bool) -> Self {
        let mut index = TargetIndex::default();
        for row in &table.rows {
            let code = row.code(columns.code);
            if code.is_empty() {
                continue;
            }
            let Some(quantity) = normalize(row.get(columns.quantity)) else {
                continue;
            };
            let description = row.field(columns.description);
            let revision = row.field(columns.revision);
            let category = row.field(columns.category);
            let key = key_of(&code, revision.as_deref(), ignore_revision);

            match index.positions.get(&key) {
                Some(&pos) => index.entries[pos].1.quantity += quantity,
                None => {
                    index.positions.insert(key.clone(), index.entries.len());
                    index.entries.push((
                        key,
                        TargetEntry {
                            code: code.clone(),
                            quantity,
                            description: description.clone(),
                            revision: revision.clone(),
                            category: category.clone(),
                        },
                    ));
                }
            }

            if !ignore_revision {
                let variants = index.by_code.entry(code).or_default();
                match variants.iter_mut().find(|v| v.revision == revision) {
                    Some(existing) => existing.quantity += quantity,
                    None => variants.push(RevisionEntry {
                        revision,
                        description,
                        quantity,
                        category,
                    }),
                }
            }
        }
        index
    }

    pub fn get(&self, key: &str) -> Option<&TargetEntry> {
        self.positions.get(key).map(|&pos| &self.entries[pos].1)
    }

    /// Revision variants recorded for a bare code, in first-seen order.
    pub fn revisions(&self, code: &str) -> Option<&[RevisionEntry]> {
        self.by_code
            .get(code)
            .map(Vec::as_slice)
            .filter(|variants| !variants.is_empty())
    }

    /// The first revision variant of a code, used as the fallback pairing.
    pub fn fallback(&self, code: &str) -> Option<&RevisionEntry> {
        self.revisions(code).and_then(|variants| variants.first())
    }

    /// Full keys of every revision variant of a code.
    pub fn revision_keys(&self, code: &str) -> Vec<String> {
        self.revisions(code)
            .unwrap_or_default()
            .iter()
            .map(|variant| key_of(code, variant.revision.as_deref(), false))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TargetEntry)> {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
