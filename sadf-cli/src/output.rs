//! Output formatters for command reports
//!
//! Supports text and JSON output formats.

use std::path::Path;

use serde::Serialize;

use sadf_core::convert::ConvertReport;
use sadf_core::safile::{ActivityCatalog, FormatVersion};

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            _ => Err(format!("Unknown format '{}'. Use 'text' or 'json'", s)),
        }
    }
}

/// Format the outcome of a conversion
pub fn format_convert_report(target: &Path, report: &ConvertReport, format: ReportFormat) -> String {
    match format {
        ReportFormat::Text => format_convert_report_text(target, report),
        ReportFormat::Json => format_convert_report_json(target, report),
    }
}

fn format_convert_report_text(target: &Path, report: &ConvertReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("Target:     {}\n", target.display()));
    output.push_str(&format!("Records:    {}\n", report.records_written));
    output.push_str(&format!("Activities: {}\n", report.activities_written));
    if report.volatile_dropped > 0 {
        output.push_str(&format!("Dropped volatile:    {}\n", report.volatile_dropped));
    }
    if report.unsupported_dropped > 0 {
        output.push_str(&format!("Dropped unsupported: {}\n", report.unsupported_dropped));
    }
    for warning in &report.warnings {
        output.push_str(&format!("Warning: {}\n", warning));
    }

    output.trim_end().to_string()
}

fn format_convert_report_json(target: &Path, report: &ConvertReport) -> String {
    #[derive(Serialize)]
    struct JsonReport {
        target: String,
        records_written: u64,
        activities_written: usize,
        volatile_dropped: usize,
        unsupported_dropped: usize,
        warnings: Vec<String>,
    }

    let json_report = JsonReport {
        target: target.display().to_string(),
        records_written: report.records_written,
        activities_written: report.activities_written,
        volatile_dropped: report.volatile_dropped,
        unsupported_dropped: report.unsupported_dropped,
        warnings: report.warnings.iter().map(|w| w.to_string()).collect(),
    };

    serde_json::to_string_pretty(&json_report).unwrap_or_else(|_| "{}".to_string())
}

/// Format the activity catalog
pub fn format_activities(catalog: &ActivityCatalog, format: ReportFormat) -> String {
    match format {
        ReportFormat::Text => format_activities_text(catalog),
        ReportFormat::Json => format_activities_json(catalog),
    }
}

fn format_activities_text(catalog: &ActivityCatalog) -> String {
    let mut output = String::new();
    output.push_str(&format!("Activities ({}):\n\n", catalog.len()));
    for spec in catalog.iter() {
        output.push_str(&format!(
            "{:>3}  {:<8} {:<28} v1 item {:>3} B  v2 item {:>3} B{}\n",
            spec.id,
            spec.name,
            spec.markup,
            spec.layout(FormatVersion::V1).item_size(),
            spec.layout(FormatVersion::V2).item_size(),
            if spec.volatile { "  volatile" } else { "" }
        ));
    }
    output.trim_end().to_string()
}

fn format_activities_json(catalog: &ActivityCatalog) -> String {
    #[derive(Serialize)]
    struct JsonActivity {
        id: u16,
        name: &'static str,
        markup: &'static str,
        volatile: bool,
        fields: Vec<&'static str>,
    }

    let activities: Vec<_> = catalog
        .iter()
        .map(|spec| JsonActivity {
            id: spec.id,
            name: spec.name,
            markup: spec.markup,
            volatile: spec.volatile,
            fields: spec
                .layout(FormatVersion::CURRENT)
                .fields
                .iter()
                .map(|f| f.name)
                .collect(),
        })
        .collect();

    serde_json::to_string_pretty(&activities).unwrap_or_else(|_| "[]".to_string())
}
