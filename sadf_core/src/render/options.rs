// Output format selection and presentation flags

use std::fmt;
use std::str::FromStr;

use tracing::warn;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// Tabular/property text, one value per line
    Table,
    /// Semicolon separated field dump
    Raw,
    /// XML
    Markup,
    Json,
    /// Header summary and activity list only
    Summary,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 5] = [
        OutputFormat::Table,
        OutputFormat::Raw,
        OutputFormat::Markup,
        OutputFormat::Json,
        OutputFormat::Summary,
    ];

    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Table => "table",
            OutputFormat::Raw => "raw",
            OutputFormat::Markup => "xml",
            OutputFormat::Json => "json",
            OutputFormat::Summary => "header",
        }
    }

    /// Flags the format always sets, and flags it honours when requested
    pub fn capabilities(self) -> Capabilities {
        let none = FormatOptions::default();
        match self {
            OutputFormat::Table => Capabilities {
                intrinsic: FormatOptions {
                    grouped_stats: true,
                    ..none
                },
                accepted: FormatOptions {
                    header_only: true,
                    tolerant: true,
                    local_time: true,
                    epoch_seconds: true,
                    ..none
                },
            },
            OutputFormat::Raw => Capabilities {
                intrinsic: none,
                accepted: FormatOptions {
                    grouped_stats: true,
                    header_only: true,
                    tolerant: true,
                    local_time: true,
                    horizontal: true,
                    epoch_seconds: true,
                    field_list: true,
                    test_markup: false,
                },
            },
            OutputFormat::Markup | OutputFormat::Json => Capabilities {
                intrinsic: FormatOptions {
                    test_markup: true,
                    ..none
                },
                accepted: FormatOptions {
                    grouped_stats: true,
                    header_only: true,
                    tolerant: true,
                    local_time: true,
                    ..none
                },
            },
            OutputFormat::Summary => Capabilities {
                intrinsic: FormatOptions {
                    header_only: true,
                    ..none
                },
                accepted: FormatOptions {
                    tolerant: true,
                    local_time: true,
                    ..none
                },
            },
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "ppc" => Ok(OutputFormat::Table),
            "raw" | "db" => Ok(OutputFormat::Raw),
            "xml" | "markup" => Ok(OutputFormat::Markup),
            "json" => Ok(OutputFormat::Json),
            "header" | "hdr" | "summary" => Ok(OutputFormat::Summary),
            _ => Err(format!(
                "Unknown format '{s}'. Use 'table', 'raw', 'xml', 'json' or 'header'"
            )),
        }
    }
}

/// Presentation flags for one render. Resolved once and never mutated
/// while rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatOptions {
    /// All timestamps of one activity before the next activity
    pub grouped_stats: bool,
    pub header_only: bool,
    /// Downgrade structural errors to warnings
    pub tolerant: bool,
    pub local_time: bool,
    /// All activities of a timestamp on one line
    pub horizontal: bool,
    pub epoch_seconds: bool,
    /// Field-name line before rows
    pub field_list: bool,
    /// Call the close hook for activities that need an explicit close
    pub test_markup: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub intrinsic: FormatOptions,
    pub accepted: FormatOptions,
}

impl FormatOptions {
    /// Keep the requested flags `format` accepts and add its intrinsic ones.
    /// Dropped flags are logged.
    pub fn resolve(format: OutputFormat, requested: FormatOptions) -> FormatOptions {
        let caps = format.capabilities();
        let kept = requested.intersect(caps.accepted);
        let dropped = requested.difference(caps.accepted.union(caps.intrinsic));
        if dropped != FormatOptions::default() {
            warn!(format = %format, ignored = %dropped, "Options not supported by this format");
        }
        kept.union(caps.intrinsic)
    }

    fn flags(self) -> [(&'static str, bool); 8] {
        [
            ("grouped", self.grouped_stats),
            ("header-only", self.header_only),
            ("tolerant", self.tolerant),
            ("local-time", self.local_time),
            ("horizontal", self.horizontal),
            ("epoch", self.epoch_seconds),
            ("field-list", self.field_list),
            ("test-markup", self.test_markup),
        ]
    }

    fn combine(self, other: FormatOptions, op: impl Fn(bool, bool) -> bool) -> FormatOptions {
        FormatOptions {
            grouped_stats: op(self.grouped_stats, other.grouped_stats),
            header_only: op(self.header_only, other.header_only),
            tolerant: op(self.tolerant, other.tolerant),
            local_time: op(self.local_time, other.local_time),
            horizontal: op(self.horizontal, other.horizontal),
            epoch_seconds: op(self.epoch_seconds, other.epoch_seconds),
            field_list: op(self.field_list, other.field_list),
            test_markup: op(self.test_markup, other.test_markup),
        }
    }

    pub fn union(self, other: FormatOptions) -> FormatOptions {
        self.combine(other, |a, b| a || b)
    }

    pub fn intersect(self, other: FormatOptions) -> FormatOptions {
        self.combine(other, |a, b| a && b)
    }

    pub fn difference(self, other: FormatOptions) -> FormatOptions {
        self.combine(other, |a, b| a && !b)
    }
}

impl fmt::Display for FormatOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self
            .flags()
            .into_iter()
            .filter(|(_, set)| *set)
            .map(|(name, _)| name)
            .collect();
        f.write_str(&names.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format__aliases__then_parsed() {
        assert_eq!("ppc".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert_eq!("DB".parse::<OutputFormat>().unwrap(), OutputFormat::Raw);
        assert_eq!("xml".parse::<OutputFormat>().unwrap(), OutputFormat::Markup);
        assert_eq!("hdr".parse::<OutputFormat>().unwrap(), OutputFormat::Summary);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_resolve__table__then_always_grouped() {
        let options = FormatOptions::resolve(OutputFormat::Table, FormatOptions::default());
        assert!(options.grouped_stats);
        assert!(!options.test_markup);
    }

    #[test]
    fn test_resolve__unsupported_flags__then_dropped() {
        let requested = FormatOptions {
            horizontal: true,
            field_list: true,
            local_time: true,
            ..FormatOptions::default()
        };
        let options = FormatOptions::resolve(OutputFormat::Json, requested);
        assert!(!options.horizontal);
        assert!(!options.field_list);
        assert!(options.local_time);
        assert!(options.test_markup);
    }

    #[test]
    fn test_resolve__summary__then_header_only() {
        let options = FormatOptions::resolve(
            OutputFormat::Summary,
            FormatOptions {
                grouped_stats: true,
                ..FormatOptions::default()
            },
        );
        assert!(options.header_only);
        assert!(!options.grouped_stats);
    }

    #[test]
    fn test_format_options__display__then_set_flags_listed() {
        let options = FormatOptions {
            tolerant: true,
            epoch_seconds: true,
            ..FormatOptions::default()
        };
        assert_eq!(options.to_string(), "tolerant,epoch");
    }
}
