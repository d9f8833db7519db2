//! `sadf activities`

use anyhow::Result;

use sadf_core::safile::ActivityCatalog;

use crate::output::{self, ReportFormat};

pub fn run(format: ReportFormat) -> Result<()> {
    let catalog = ActivityCatalog::builtin();
    println!("{}", output::format_activities(&catalog, format));
    Ok(())
}
