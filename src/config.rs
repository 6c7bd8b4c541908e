//! YAML job files.
//!
//! A job file records everything needed to repeat a reconciliation: both
//! column mappings, how many banner rows precede each header, the rule
//! sheet, and the comparison switches. Command-line flags override it.
//!
//! ```yaml
//! mappings:
//!   original: { code: Codice, quantity: Quantità, revision: Rev }
//!   partial: { code: Code, quantity: Qty }
//! original_skip_rows: 2
//! aggregate: true
//! options:
//!   ignore_revision: false
//! ```

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{mapping::Mappings, reconcile::CompareOptions};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub mappings: Mappings,
    pub original_skip_rows: usize,
    pub partial_skip_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<PathBuf>,
    pub rules_skip_rows: usize,
    pub aggregate: bool,
    pub options: CompareOptions,
}

impl JobConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening job file {path:?}"))?;
        let mut config: JobConfig = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing job file {path:?}"))?;
        // Rule sheet paths are relative to the job file.
        if let (Some(rules), Some(parent)) = (config.rules.as_mut(), path.parent()) {
            if rules.is_relative() {
                *rules = parent.join(&*rules);
            }
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating job file {path:?}"))?;
        let mut writer = BufWriter::new(file);
        serde_yaml::to_writer(&mut writer, self)
            .with_context(|| format!("Serializing job file {path:?}"))?;
        writer.flush()?;
        Ok(())
    }
}
