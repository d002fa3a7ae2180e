//! resdir CLI - inspect and extract the resource directory of PE images.
//!
//! This is the main entry point for the resdir command-line application.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, warn};

use resdir::pe;
use resdir::prelude::*;

/// Show information about the resource section of a PE file and extract it
#[derive(Parser)]
#[command(name = "resdir")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Example: resdir -a putty.exe")]
struct Cli {
    /// Show all information, statistics and extract resources
    #[arg(short, long)]
    all: bool,

    /// Change output format
    #[arg(short, long, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Show resources information
    #[arg(short, long)]
    info: bool,

    /// Show list view
    #[arg(short, long)]
    list: bool,

    /// Show resources statistics
    #[arg(short, long)]
    statistics: bool,

    /// Extract resources
    #[arg(short = 'x', long)]
    extract: bool,

    /// Extract resources with path names
    #[arg(short = 'X', long)]
    named_extract: bool,

    /// Show File Version from PE resource directory
    #[arg(short = 'v', long)]
    file_version: bool,

    /// Directory extracted resources are written to
    #[arg(short, long, env = "RESDIR_OUTPUT_DIR", default_value = resdir::extract::DEFAULT_ROOT)]
    output_dir: PathBuf,

    /// PE file to inspect
    file: PathBuf,
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        RunConfig {
            all: self.all,
            info: self.info,
            list: self.list,
            statistics: self.statistics,
            extract: self.extract || self.named_extract,
            named_extract: self.named_extract,
            version: self.file_version,
            output_dir: self.output_dir.clone(),
            format: self.format,
        }
    }
}

fn set_up_tracing() {
    use tracing_subscriber::fmt;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    set_up_tracing();
    let cli = Cli::parse();

    let config = cli.run_config();
    if !config.has_operation() {
        anyhow::bail!("no operation selected, try '--help' for more information");
    }

    cmd_inspect(&cli.file, &config)
}

fn cmd_inspect(path: &Path, config: &RunConfig) -> Result<()> {
    let image = PeImage::open(path)
        .with_context(|| format!("Failed to load PE file {}", path.display()))?;
    debug!(
        sections = image.sections().len(),
        pe32_plus = image.is_pe32_plus(),
        "loaded {}",
        image.name()
    );

    let tree = match ResourceTree::parse(&image) {
        Ok(tree) => tree,
        Err(pe::Error::NoResources) => {
            warn!("{} has no resources", image.name());
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to read resource directory"),
    };

    let resources = Resources::new(&image, &tree);
    let mut out = create_output(config.format, Box::new(io::stdout().lock()));
    resdir::run(resources, config, out.as_mut()).context("Failed to write report")?;

    Ok(())
}
