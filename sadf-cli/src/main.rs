//! sadf - System activity data formatter
//!
//! Renders binary system activity files and migrates legacy files to the
//! current format revision.
//!
//! # Commands
//!
//! - `sadf render` - Render a file as table, raw, xml, json or header summary
//! - `sadf convert` - Rewrite a file in the current format revision
//! - `sadf activities` - List the activities this build can decode

mod activities;
mod convert;
mod output;
mod render;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// sadf - System activity data formatter
#[derive(Parser)]
#[command(name = "sadf")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render an activity file
    ///
    /// Examples:
    ///   sadf render /var/log/sa/sa14
    ///   sadf render /var/log/sa/sa14 -f xml -a cpu,memory
    ///   sadf render /var/log/sa/sa14 -f raw --horizontal --field-list
    ///   sadf render /var/log/sa/sa14 -f header
    Render(render::RenderArgs),

    /// Convert an activity file to the current format revision
    ///
    /// Examples:
    ///   sadf convert sa14.old sa14
    ///   sadf convert sa14.old sa14 --ignore volatile,comment --force
    Convert(convert::ConvertArgs),

    /// List the activities this build can decode
    Activities {
        /// Output format (text or json)
        #[arg(short, long, default_value = "text")]
        format: output::ReportFormat,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Render(args) => render::run(args.into()),
        Commands::Convert(args) => convert::run(args.into()),
        Commands::Activities { format } => activities::run(format),
    }
}
