//! `sadf render`

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{debug, warn};

use sadf_core::render::{render, ActivitySelection, FormatOptions, OutputFormat};
use sadf_core::safile::{ActivityCatalog, ActivityFile};

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// System activity data file
    pub file: PathBuf,

    /// Output format: table, raw, xml, json or header
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,

    /// Activities to render, comma separated (default: all in the file)
    #[arg(short, long, value_delimiter = ',')]
    pub activities: Vec<String>,

    /// All samples of one activity before the next activity
    #[arg(short, long)]
    pub grouped: bool,

    /// Only print the file header
    #[arg(long)]
    pub header_only: bool,

    /// Keep going on a damaged or unexpected file layout
    #[arg(long, env = "SADF_TOLERANT")]
    pub tolerant: bool,

    /// Print times in the local timezone instead of UTC
    #[arg(short = 'T', long)]
    pub local_time: bool,

    /// All activities of a sample on one line (raw format)
    #[arg(long)]
    pub horizontal: bool,

    /// Print times as seconds since the epoch
    #[arg(short, long)]
    pub epoch: bool,

    /// Print a field-name line before rows (raw format)
    #[arg(long)]
    pub field_list: bool,
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub file: PathBuf,
    pub format: OutputFormat,
    /// `None` renders every decodable activity of the file
    pub activities: Option<Vec<String>>,
    pub options: FormatOptions,
}

impl From<RenderArgs> for RenderConfig {
    fn from(value: RenderArgs) -> Self {
        let requested = FormatOptions {
            grouped_stats: value.grouped,
            header_only: value.header_only,
            tolerant: value.tolerant,
            local_time: value.local_time,
            horizontal: value.horizontal,
            epoch_seconds: value.epoch,
            field_list: value.field_list,
            test_markup: false,
        };
        let all = value.activities.is_empty()
            || value
                .activities
                .iter()
                .any(|name| name.eq_ignore_ascii_case("ALL"));

        Self {
            file: value.file,
            format: value.format,
            activities: (!all).then_some(value.activities),
            options: FormatOptions::resolve(value.format, requested),
        }
    }
}

// LCOV_EXCL_START - Integration function requires real activity files
pub fn run(config: RenderConfig) -> Result<()> {
    let catalog = ActivityCatalog::builtin();
    let file = ActivityFile::open(&config.file, &catalog, config.options.tolerant)
        .with_context(|| format!("failed to open {}", config.file.display()))?;

    let selection = match &config.activities {
        Some(names) => ActivitySelection::from_names(names, &catalog)?,
        None => ActivitySelection::all_in(&file),
    };
    debug!(
        format = %config.format,
        options = %config.options,
        activities = selection.len(),
        "Rendering",
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let report = render(&file, config.format, config.options, &selection, &mut out)
        .with_context(|| format!("failed to render {}", config.file.display()))?;
    out.flush()?;

    let warnings = file.warnings().len() + report.warnings.len();
    if warnings > 0 {
        warn!(warnings, "Rendered with format warnings");
    }
    Ok(())
}
// LCOV_EXCL_STOP

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    fn args(format: OutputFormat) -> RenderArgs {
        RenderArgs {
            file: PathBuf::from("sa14"),
            format,
            activities: Vec::new(),
            grouped: false,
            header_only: false,
            tolerant: false,
            local_time: false,
            horizontal: false,
            epoch: false,
            field_list: false,
        }
    }

    #[test]
    fn test_render_config__all_keyword__then_no_explicit_selection() {
        let mut value = args(OutputFormat::Raw);
        value.activities = vec!["cpu".into(), "ALL".into()];
        let config = RenderConfig::from(value);
        assert!(config.activities.is_none());
    }

    #[test]
    fn test_render_config__names__then_kept_in_order() {
        let mut value = args(OutputFormat::Raw);
        value.activities = vec!["memory".into(), "cpu".into()];
        let config = RenderConfig::from(value);
        assert_eq!(
            config.activities,
            Some(vec!["memory".to_string(), "cpu".to_string()])
        );
    }

    #[test]
    fn test_render_config__flags__then_resolved_against_format() {
        let mut value = args(OutputFormat::Markup);
        value.horizontal = true;
        value.tolerant = true;
        let config = RenderConfig::from(value);
        assert!(!config.options.horizontal);
        assert!(config.options.tolerant);
        assert!(config.options.test_markup);
    }
}
