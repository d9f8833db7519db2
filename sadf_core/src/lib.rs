//! System activity data formatter
//!
//! Decodes binary system activity files, renders them through one of
//! several output backends and migrates legacy files to the current format
//! revision.

pub mod convert;
pub mod render;
pub mod safile;

pub use convert::{convert, ConvertOptions, ConvertReport, IgnoreFlags};
pub use render::{render, ActivitySelection, FormatOptions, OutputFormat, RenderReport};
