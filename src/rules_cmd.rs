//! `rules` and `apply` commands.

use std::path::Path;

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::{info, warn};

use crate::{
    apply::apply_rules,
    cli::{ApplyArgs, RulesArgs},
    io_utils,
    mapping::{Mapping, Side},
    rules::{self, TransformationRule},
    table,
};

/// Reads and interprets a rule sheet.
pub fn load_rules(
    path: &Path,
    delimiter: Option<u8>,
    encoding: &'static Encoding,
    skip_rows: usize,
) -> Result<Vec<TransformationRule>> {
    let delimiter = io_utils::resolve_input_delimiter(path, delimiter);
    let sheet = io_utils::read_table(path, delimiter, encoding, skip_rows)
        .with_context(|| format!("Loading rule sheet {path:?}"))?;
    if !sheet.has_column(rules::TYPE_COLUMN) {
        warn!(
            "Rule sheet {path:?} has no '{}' column; no rules will be read",
            rules::TYPE_COLUMN
        );
    }
    let parsed = rules::parse_rules(&sheet);
    if parsed.len() < sheet.len() {
        info!(
            "Ignored {} rule row(s) in {path:?} that describe no usable rule",
            sheet.len() - parsed.len()
        );
    }
    Ok(parsed)
}

pub fn execute_rules(args: &RulesArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let parsed = load_rules(&args.rules, args.delimiter, encoding, args.skip_rows)?;

    if args.json {
        let rendered = serde_json::to_string_pretty(&parsed).context("Serializing rules")?;
        println!("{rendered}");
        return Ok(());
    }

    let headers = vec![
        "#".to_string(),
        "type".to_string(),
        "active".to_string(),
        "rule".to_string(),
    ];
    let rows = parsed
        .iter()
        .enumerate()
        .map(|(idx, rule)| {
            vec![
                (idx + 1).to_string(),
                match rule {
                    TransformationRule::Merge { .. } => rule.type_name().to_string(),
                    TransformationRule::Exclude { kind, .. } => format!("{} {kind}", rule.type_name()),
                },
                if rule.is_enabled() { "yes" } else { "no" }.to_string(),
                rule.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    info!("Interpreted {} rule(s) from {:?}", parsed.len(), args.rules);
    Ok(())
}

pub fn execute_apply(args: &ApplyArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let input = io_utils::read_table(&args.input, delimiter, encoding, args.skip_rows)?;
    let parsed = load_rules(&args.rules, args.delimiter, encoding, args.rules_skip_rows)?;

    let mut mapping = Mapping {
        code: args.code.clone(),
        quantity: args.quantity.clone(),
        description: args.description.clone(),
        category: args.category.clone(),
        revision: None,
    };
    mapping.guess(&input.headers);
    let columns = mapping
        .resolve(Side::Original, &input)
        .with_context(|| format!("Resolving columns of {:?}", args.input))?;

    let cleaned = apply_rules(&input, &parsed, &columns);
    info!(
        "Applied {} rule(s) to {:?}: {} row(s) in, {} row(s) out",
        parsed.len(),
        args.input,
        input.len(),
        cleaned.len()
    );

    if args.table {
        table::print_table(&cleaned.headers, &cleaned.records());
        return Ok(());
    }
    let output_delimiter =
        io_utils::resolve_output_delimiter(args.output.as_deref(), args.output_delimiter, delimiter);
    io_utils::write_table(args.output.as_deref(), output_delimiter, &cleaned)
}
