//! Run configuration.

use std::path::PathBuf;

use tracing::debug;

use crate::display::{show_list, show_nodes};
use crate::extract::{ExtractMode, ExtractOptions, Extractor, DEFAULT_ROOT};
use crate::output::{Output, OutputFormat};
use crate::stats::ResourceStats;
use crate::version::decode_version;
use crate::{Resources, Result};

/// Which operations to run, and where extracted files go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Run every operation.
    pub all: bool,
    pub info: bool,
    pub list: bool,
    pub statistics: bool,
    pub extract: bool,
    /// Use synthesized paths as file names. Implies `extract`.
    pub named_extract: bool,
    pub version: bool,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            all: false,
            info: false,
            list: false,
            statistics: false,
            extract: false,
            named_extract: false,
            version: false,
            output_dir: PathBuf::from(DEFAULT_ROOT),
            format: OutputFormat::default(),
        }
    }
}

impl RunConfig {
    /// Whether any operation is selected.
    pub fn has_operation(&self) -> bool {
        self.all
            || self.info
            || self.list
            || self.statistics
            || self.extract
            || self.named_extract
            || self.version
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            root: self.output_dir.clone(),
            mode: if self.named_extract {
                ExtractMode::Named
            } else {
                ExtractMode::Numeric
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Info,
    Statistics,
    List,
    Extract,
    Version,
}

fn plan(config: &RunConfig) -> Vec<Operation> {
    use Operation::*;

    if config.all {
        return vec![Info, Statistics, List, Extract, Version];
    }

    [
        (config.extract || config.named_extract, Extract),
        (config.info, Info),
        (config.list, List),
        (config.statistics, Statistics),
        (config.version, Version),
    ]
    .into_iter()
    .filter_map(|(enabled, op)| enabled.then_some(op))
    .collect()
}

/// Run the selected operations inside one output document.
pub fn run(res: Resources<'_>, config: &RunConfig, out: &mut dyn Output) -> Result<()> {
    out.open_document()?;

    for op in plan(config) {
        debug!(?op, "running");
        match op {
            Operation::Info => show_nodes(res, out)?,
            Operation::Statistics => ResourceStats::collect(res).emit(out)?,
            Operation::List => show_list(res, out)?,
            Operation::Extract => {
                let options = config.extract_options();
                Extractor::new(res, &options).extract_all(out)?;
            }
            Operation::Version => {
                decode_version(res, out)?;
            }
        }
    }

    out.close_document()?;
    Ok(())
}
