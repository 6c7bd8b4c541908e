//! Transformation rules and the rule-table interpreter.
//!
//! A rule table is an ordinary [`Table`] whose rows describe either a MERGE
//! (collapse several codes into one synthetic line) or an EXCLUDE (drop rows
//! whose code, description or category match). Older rule sheets describe
//! exclusions in free text; [`legacy::classify`] recognises those phrasings
//! and never leaks into the canonical [`TransformationRule`] shape.

use std::{fmt, str::FromStr};

use anyhow::{Result, anyhow};
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::data::{Row, Table};

pub const TYPE_COLUMN: &str = "Tipo";
pub const CODES_COLUMN: &str = "Codici da unire";
pub const VALUE_COLUMN: &str = "Valore";
pub const RESULT_CODE_COLUMN: &str = "Codice risultante";
pub const RESULT_DESCRIPTION_COLUMN: &str = "Descrizione risultante";
pub const SUBTYPE_COLUMN: &str = "Sotto-tipo";
pub const ENABLED_COLUMN: &str = "Attivo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExcludeKind {
    CodeExact,
    CodePrefix,
    DescriptionContains,
    DescriptionPrefix,
    CategoryExact,
}

impl ExcludeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExcludeKind::CodeExact => "CODE_EXACT",
            ExcludeKind::CodePrefix => "CODE_PREFIX",
            ExcludeKind::DescriptionContains => "DESCRIPTION_CONTAINS",
            ExcludeKind::DescriptionPrefix => "DESCRIPTION_PREFIX",
            ExcludeKind::CategoryExact => "CATEGORY_EXACT",
        }
    }
}

impl FromStr for ExcludeKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CODE_EXACT" => Ok(ExcludeKind::CodeExact),
            "CODE_PREFIX" => Ok(ExcludeKind::CodePrefix),
            "DESCRIPTION_CONTAINS" => Ok(ExcludeKind::DescriptionContains),
            "DESCRIPTION_PREFIX" => Ok(ExcludeKind::DescriptionPrefix),
            "CATEGORY_EXACT" => Ok(ExcludeKind::CategoryExact),
            other => Err(anyhow!("Unknown exclusion sub-type '{other}'")),
        }
    }
}

impl fmt::Display for ExcludeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransformationRule {
    Merge {
        source_codes: Vec<String>,
        result_code: String,
        result_description: String,
        enabled: bool,
    },
    Exclude {
        kind: ExcludeKind,
        value: String,
        enabled: bool,
    },
}

impl TransformationRule {
    pub fn merge(
        source_codes: impl IntoIterator<Item = impl Into<String>>,
        result_code: impl Into<String>,
        result_description: impl Into<String>,
    ) -> Self {
        TransformationRule::Merge {
            source_codes: source_codes.into_iter().map(Into::into).collect(),
            result_code: result_code.into(),
            result_description: result_description.into(),
            enabled: true,
        }
    }

    pub fn exclude(kind: ExcludeKind, value: impl Into<String>) -> Self {
        TransformationRule::Exclude {
            kind,
            value: value.into(),
            enabled: true,
        }
    }

    pub fn is_enabled(&self) -> bool {
        match self {
            TransformationRule::Merge { enabled, .. } | TransformationRule::Exclude { enabled, .. } => {
                *enabled
            }
        }
    }

    pub fn set_enabled(&mut self, value: bool) {
        match self {
            TransformationRule::Merge { enabled, .. } | TransformationRule::Exclude { enabled, .. } => {
                *enabled = value
            }
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            TransformationRule::Merge { .. } => "MERGE",
            TransformationRule::Exclude { .. } => "EXCLUDE",
        }
    }
}

impl fmt::Display for TransformationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformationRule::Merge {
                source_codes,
                result_code,
                result_description,
                ..
            } => {
                write!(f, "{} -> {result_code}", source_codes.iter().join(" + "))?;
                if !result_description.is_empty() {
                    write!(f, " ({result_description})")?;
                }
                Ok(())
            }
            TransformationRule::Exclude { kind, value, .. } => match kind {
                ExcludeKind::CodeExact => write!(f, "code in {{{}}}", split_codes(value).join(", ")),
                ExcludeKind::CodePrefix => write!(f, "code starts with \"{value}\""),
                ExcludeKind::DescriptionContains => write!(f, "description contains \"{value}\""),
                ExcludeKind::DescriptionPrefix => write!(f, "description starts with \"{value}\""),
                ExcludeKind::CategoryExact => write!(f, "category is \"{value}\""),
            },
        }
    }
}

/// Splits a `+`-joined code list, trimming tokens and dropping empties.
pub fn split_codes(value: &str) -> Vec<String> {
    value
        .split('+')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleType {
    Merge,
    Exclude,
}

fn parse_rule_type(value: &str) -> Option<RuleType> {
    match value {
        "MERGE" | "UNISCI" => Some(RuleType::Merge),
        "EXCLUDE" | "ESCLUDI" => Some(RuleType::Exclude),
        _ => None,
    }
}

fn cell(row: &Row, column: &str) -> String {
    row.text(column)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn parse_enabled(row: &Row) -> bool {
    let flag = cell(row, ENABLED_COLUMN).to_ascii_uppercase();
    !matches!(flag.as_str(), "NO" | "N" | "FALSE" | "0")
}

/// Interprets a rule table. Rows that do not describe a usable rule are
/// skipped rather than reported.
pub fn parse_rules(table: &Table) -> Vec<TransformationRule> {
    let mut rules = Vec::new();
    for (idx, row) in table.rows.iter().enumerate() {
        match parse_rule_row(row) {
            Some(rule) => rules.push(rule),
            None => debug!("Skipping rule row {}", idx + 1),
        }
    }
    rules
}

fn parse_rule_row(row: &Row) -> Option<TransformationRule> {
    let rule_type = cell(row, TYPE_COLUMN).to_uppercase();
    let codes = cell(row, CODES_COLUMN);
    let codes_or_value = if codes.is_empty() {
        cell(row, VALUE_COLUMN)
    } else {
        codes
    };
    if rule_type.is_empty() || codes_or_value.is_empty() {
        return None;
    }

    let mut rule = match parse_rule_type(&rule_type)? {
        RuleType::Merge => {
            let source_codes = split_codes(&codes_or_value);
            let result_code = cell(row, RESULT_CODE_COLUMN);
            if source_codes.is_empty() || result_code.is_empty() {
                return None;
            }
            TransformationRule::merge(
                source_codes,
                result_code,
                cell(row, RESULT_DESCRIPTION_COLUMN),
            )
        }
        RuleType::Exclude => {
            let explicit = cell(row, SUBTYPE_COLUMN).parse::<ExcludeKind>().ok();
            let (kind, value) = match explicit {
                Some(kind) => (kind, codes_or_value),
                None => legacy::classify(&codes_or_value)
                    .unwrap_or((ExcludeKind::CodeExact, codes_or_value)),
            };
            TransformationRule::exclude(kind, value)
        }
    };
    rule.set_enabled(parse_enabled(row));
    Some(rule)
}

/// Free-text exclusion phrasings from older rule sheets.
pub mod legacy {
    use std::sync::OnceLock;

    use regex::Regex;

    use super::ExcludeKind;

    static PATTERNS: OnceLock<Vec<(ExcludeKind, Regex)>> = OnceLock::new();

    // Order matters: the first template that matches decides the sub-type.
    const TEMPLATES: &[(ExcludeKind, &str)] = &[
        (
            ExcludeKind::DescriptionContains,
            r#"(?i)^\s*(?:(?:TUTTE\s+LE|ALL)\s+)?(?:DESCRIZIONI\s+CHE\s+CONTENGONO|DESCRIPTIONS\s+CONTAINING)\s+"([^"]+)"\s*$"#,
        ),
        (
            ExcludeKind::DescriptionPrefix,
            r#"(?i)^\s*(?:(?:TUTTE\s+LE|ALL)\s+)?(?:DESCRIZIONI\s+CHE\s+INIZIANO\s+(?:CON|PER)|DESCRIPTIONS\s+STARTING\s+WITH)\s+"([^"]+)"\s*$"#,
        ),
        (
            ExcludeKind::CodePrefix,
            r#"(?i)^\s*(?:(?:TUTTI\s+I|ALL)\s+)?(?:CODICI\s+CHE\s+INIZIANO\s+(?:CON|PER)|CODES\s+STARTING\s+WITH)\s+"([^"]+)"\s*$"#,
        ),
        (
            ExcludeKind::CategoryExact,
            r#"(?i)^\s*(?:CATEGORIA(?:\s+UGUALE\s+A)?|CATEGORY(?:\s+EQUAL\s+TO|\s+EQUALS)?)\s+"([^"]+)"\s*$"#,
        ),
    ];

    fn patterns() -> &'static [(ExcludeKind, Regex)] {
        PATTERNS.get_or_init(|| {
            TEMPLATES
                .iter()
                .filter_map(|(kind, source)| Regex::new(source).ok().map(|re| (*kind, re)))
                .collect()
        })
    }

    /// Returns the inferred sub-type and the quoted literal, or `None` when
    /// the text is not one of the known phrasings.
    pub fn classify(text: &str) -> Option<(ExcludeKind, String)> {
        patterns().iter().find_map(|(kind, regex)| {
            regex
                .captures(text)
                .and_then(|caps| caps.get(1))
                .map(|literal| (*kind, literal.as_str().to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_table(rows: Vec<Vec<&str>>) -> Table {
        let headers = vec![
            TYPE_COLUMN,
            CODES_COLUMN,
            RESULT_CODE_COLUMN,
            RESULT_DESCRIPTION_COLUMN,
            SUBTYPE_COLUMN,
        ];
        Table::from_records(
            headers.into_iter().map(String::from).collect(),
            rows.into_iter()
                .map(|r| r.into_iter().map(String::from).collect())
                .collect(),
        )
    }

    #[test]
    fn merge_row_splits_and_trims_codes() {
        let table = rule_table(vec![vec!["merge", " A + B ++ C ", "ABC", "Kit", ""]]);
        let rules = parse_rules(&table);
        assert_eq!(
            rules,
            vec![TransformationRule::merge(["A", "B", "C"], "ABC", "Kit")]
        );
    }

    #[test]
    fn merge_without_result_code_is_skipped() {
        let table = rule_table(vec![
            vec!["MERGE", "A+B", "", "Kit", ""],
            vec!["MERGE", " + ", "X", "", ""],
        ]);
        assert!(parse_rules(&table).is_empty());
    }

    #[test]
    fn unknown_type_and_blank_rows_are_skipped() {
        let table = rule_table(vec![
            vec!["RENAME", "A", "B", "", ""],
            vec!["", "A", "", "", ""],
            vec!["EXCLUDE", "", "", "", ""],
        ]);
        assert!(parse_rules(&table).is_empty());
    }

    #[test]
    fn explicit_subtype_wins_over_legacy_text() {
        let table = rule_table(vec![vec![
            "EXCLUDE",
            "DESCRIZIONI CHE CONTENGONO \"VITE\"",
            "",
            "",
            "code_exact",
        ]]);
        let rules = parse_rules(&table);
        assert_eq!(
            rules,
            vec![TransformationRule::exclude(
                ExcludeKind::CodeExact,
                "DESCRIZIONI CHE CONTENGONO \"VITE\""
            )]
        );
    }

    #[test]
    fn legacy_text_infers_subtype() {
        let cases = [
            ("Tutte le descrizioni che contengono \"vite\"", ExcludeKind::DescriptionContains, "vite"),
            ("DESCRIZIONI CHE INIZIANO CON \"DADO\"", ExcludeKind::DescriptionPrefix, "DADO"),
            ("all codes starting with \"99\"", ExcludeKind::CodePrefix, "99"),
            ("CATEGORIA \"IMBALLO\"", ExcludeKind::CategoryExact, "IMBALLO"),
        ];
        for (text, kind, literal) in cases {
            assert_eq!(
                legacy::classify(text),
                Some((kind, literal.to_string())),
                "classifying {text}"
            );
        }
    }

    #[test]
    fn unrecognised_exclusion_defaults_to_code_exact() {
        let table = rule_table(vec![vec!["ESCLUDI", "X1 + X2", "", "", ""]]);
        assert_eq!(
            parse_rules(&table),
            vec![TransformationRule::exclude(ExcludeKind::CodeExact, "X1 + X2")]
        );
    }

    #[test]
    fn value_column_is_used_when_codes_column_is_blank() {
        let table = Table::from_records(
            vec![TYPE_COLUMN.into(), VALUE_COLUMN.into(), ENABLED_COLUMN.into()],
            vec![vec!["EXCLUDE".into(), "CODICI CHE INIZIANO PER \"7\"".into(), "no".into()]],
        );
        let rules = parse_rules(&table);
        assert_eq!(rules.len(), 1);
        assert!(!rules[0].is_enabled());
        assert!(matches!(
            &rules[0],
            TransformationRule::Exclude { kind: ExcludeKind::CodePrefix, value, .. } if value == "7"
        ));
    }
}
