use std::{io::Write, path::Path};

use anyhow::{Context, Result, bail};
use encoding_rs::Encoding;
use log::{debug, info};

use crate::{
    apply::apply_rules,
    cli::{CompareArgs, OutputFormat},
    config::JobConfig,
    data::Table,
    export, io_utils,
    mapping::{Mapping, Side},
    reconcile::{self, Status},
    rules::TransformationRule,
    rules_cmd,
};

pub fn execute(args: &CompareArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => JobConfig::load(path)?,
        None => JobConfig::default(),
    };
    apply_overrides(&mut config, args);

    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let original_delimiter = io_utils::resolve_input_delimiter(&args.original, args.delimiter);
    info!(
        "Comparing '{}' against '{}' (delimiter '{}')",
        args.original.display(),
        args.partial.display(),
        crate::printable_delimiter(original_delimiter)
    );

    let mut original = read_side(
        &args.original,
        original_delimiter,
        encoding,
        config.original_skip_rows,
        &mut config.mappings.original,
    )?;
    let mut partial = read_side(
        &args.partial,
        io_utils::resolve_input_delimiter(&args.partial, args.delimiter),
        encoding,
        config.partial_skip_rows,
        &mut config.mappings.partial,
    )?;

    if let Some(rules_path) = &config.rules {
        let rules = rules_cmd::load_rules(rules_path, args.delimiter, encoding, config.rules_skip_rows)?;
        let active = rules.iter().filter(|rule| rule.is_enabled()).count();
        info!(
            "Applying {active} active rule(s) of {} from {:?}",
            rules.len(),
            rules_path
        );
        original = clean(&original, &rules, &config.mappings.original, Side::Original)?;
        partial = clean(&partial, &rules, &config.mappings.partial, Side::Partial)?;
    }

    let results = reconcile::compare(
        &original,
        &partial,
        &config.mappings,
        config.aggregate,
        &config.options,
    )?;
    let summary = reconcile::summarize(&results);

    let output_path = args.output.as_deref();
    match args.format {
        OutputFormat::Csv => {
            let delimiter =
                io_utils::resolve_output_delimiter(output_path, args.output_delimiter, original_delimiter);
            export::write_csv(&results, output_path, delimiter)?;
        }
        OutputFormat::Json => export::write_json(&results, output_path)?,
        OutputFormat::Table => {
            let mut output = io_utils::open_output(output_path)?;
            output
                .write_all(export::render_results(&results).as_bytes())
                .context("Writing result table")?;
            output.flush().context("Flushing output")?;
        }
    }

    if args.summary {
        eprint!("{}", export::render_summary(&summary));
    }
    info!(
        "{} result(s): {} equal, {} different, {} revision mismatch, {} absent, {} absent in original, {} invalid",
        summary.total,
        summary.count(Status::QuantityEqual),
        summary.count(Status::QuantityDifferent),
        summary.count(Status::RevisionDifferent),
        summary.count(Status::Absent),
        summary.count(Status::AbsentInOriginal),
        summary.count(Status::InvalidQuantity),
    );

    if let Some(path) = &args.save_config {
        config.save(path)?;
        info!("Saved job settings to {path:?}");
    }

    if args.fail_on_discrepancy && summary.discrepancies() > 0 {
        bail!(
            "{} of {} result(s) are not QUANTITY_EQUAL",
            summary.discrepancies(),
            summary.total
        );
    }
    Ok(())
}

fn read_side(
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
    skip_rows: usize,
    mapping: &mut Mapping,
) -> Result<Table> {
    let table = io_utils::read_table(path, delimiter, encoding, skip_rows)?;
    mapping.guess(&table.headers);
    debug!("Mapping for {path:?}: {mapping:?}");
    Ok(table)
}

fn clean(
    table: &Table,
    rules: &[TransformationRule],
    mapping: &Mapping,
    side: Side,
) -> Result<Table> {
    let columns = mapping
        .resolve(side, table)
        .with_context(|| format!("Applying rules to the {side} list"))?;
    let cleaned = apply_rules(table, rules, &columns);
    debug!(
        "Rules turned {} {side} row(s) into {}",
        table.len(),
        cleaned.len()
    );
    Ok(cleaned)
}

fn apply_overrides(config: &mut JobConfig, args: &CompareArgs) {
    fn set(slot: &mut Option<String>, value: &Option<String>) {
        if let Some(value) = value {
            *slot = Some(value.clone());
        }
    }

    let original = &mut config.mappings.original;
    set(&mut original.code, &args.original_code);
    set(&mut original.quantity, &args.original_quantity);
    set(&mut original.description, &args.original_description);
    set(&mut original.revision, &args.original_revision);
    set(&mut original.category, &args.original_category);

    let partial = &mut config.mappings.partial;
    set(&mut partial.code, &args.partial_code);
    set(&mut partial.quantity, &args.partial_quantity);
    set(&mut partial.description, &args.partial_description);
    set(&mut partial.revision, &args.partial_revision);
    set(&mut partial.category, &args.partial_category);

    if let Some(rows) = args.original_skip_rows {
        config.original_skip_rows = rows;
    }
    if let Some(rows) = args.partial_skip_rows {
        config.partial_skip_rows = rows;
    }
    if let Some(rows) = args.rules_skip_rows {
        config.rules_skip_rows = rows;
    }
    if let Some(rules) = &args.rules {
        config.rules = Some(rules.clone());
    }
    config.aggregate |= args.aggregate;
    config.options.ignore_revision |= args.ignore_revision;
    config.options.ignore_quantity |= args.ignore_quantity;
}
