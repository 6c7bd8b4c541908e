pub mod apply;
pub mod cli;
pub mod compare;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod index;
pub mod io_utils;
pub mod key;
pub mod mapping;
pub mod preview;
pub mod quantity;
pub mod reconcile;
pub mod rules;
pub mod rules_cmd;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

pub use crate::{
    apply::apply_rules,
    data::{Cell, Row, Table},
    error::ReconcileError,
    mapping::{Mapping, Mappings},
    reconcile::{CompareOptions, ComparisonResult, Status, compare},
    rules::{ExcludeKind, TransformationRule, parse_rules},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("bom_reconcile", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Compare(args) => compare::execute(&args),
        Commands::Apply(args) => rules_cmd::execute_apply(&args),
        Commands::Rules(args) => rules_cmd::execute_rules(&args),
        Commands::Preview(args) => preview::execute(&args),
    }
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
