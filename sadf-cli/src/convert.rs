//! `sadf convert`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tracing::warn;

use sadf_core::convert::{convert, ConvertOptions, IgnoreFlags};
use sadf_core::safile::ActivityCatalog;

use crate::output::{self, ReportFormat};

/// Record classes `--ignore` accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IgnoreKind {
    /// Drop restart records
    Restart,
    /// Drop activities that cannot be translated losslessly
    Volatile,
    /// Drop comment records
    Comment,
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    /// Legacy activity file
    pub source: PathBuf,

    /// File to write in the current format
    pub target: PathBuf,

    /// Record classes to drop, comma separated
    #[arg(short, long, value_enum, value_delimiter = ',')]
    pub ignore: Vec<IgnoreKind>,

    /// Replace the target if it exists
    #[arg(long)]
    pub force: bool,

    /// Keep going on a damaged or unexpected file layout
    #[arg(long, env = "SADF_TOLERANT")]
    pub tolerant: bool,

    /// Report format (text or json)
    #[arg(short, long, default_value = "text")]
    pub format: ReportFormat,
}

#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub source: PathBuf,
    pub target: PathBuf,
    pub options: ConvertOptions,
    pub format: ReportFormat,
}

impl From<ConvertArgs> for ConvertConfig {
    fn from(value: ConvertArgs) -> Self {
        let mut ignore = IgnoreFlags::default();
        for kind in &value.ignore {
            match kind {
                IgnoreKind::Restart => ignore.restart = true,
                IgnoreKind::Volatile => ignore.volatile = true,
                IgnoreKind::Comment => ignore.comment = true,
            }
        }

        Self {
            source: value.source,
            target: value.target,
            options: ConvertOptions {
                ignore,
                tolerant: value.tolerant,
                overwrite: value.force,
            },
            format: value.format,
        }
    }
}

// LCOV_EXCL_START - Integration function requires real activity files
pub fn run(config: ConvertConfig) -> Result<()> {
    let report = convert(
        &config.source,
        &config.target,
        &config.options,
        &ActivityCatalog::builtin(),
    )
    .with_context(|| {
        format!(
            "failed to convert {} to {}",
            config.source.display(),
            config.target.display()
        )
    })?;

    if !report.warnings.is_empty() {
        warn!(warnings = report.warnings.len(), "Converted with format warnings");
    }
    println!("{}", output::format_convert_report(&config.target, &report, config.format));
    Ok(())
}
// LCOV_EXCL_STOP
