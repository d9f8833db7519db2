// System activity file format: decoding and encoding across the supported
// format revisions, with per-activity layouts supplied by the catalog.

pub mod bytes;
pub mod catalog;
pub mod descriptors;
pub mod error;
pub mod file;
pub mod header;
pub mod scanner;
pub mod types;
pub mod writer;

// Re-export main types
pub use bytes::Endian;
pub use catalog::{ActivityCatalog, ActivitySpec, ActivityStats, StatItem};
pub use descriptors::ActivityDescriptor;
pub use error::{FormatError, Result};
pub use file::ActivityFile;
pub use header::{parse_header, parse_magic};
pub use scanner::{RecordEvent, RecordScanner, RestartKind, RestartMarker};
pub use types::{FileHeader, FileMagic, FormatVersion, RecordTime};
pub use writer::ActivityFileWriter;
