// Type definitions for the system activity file format (all revisions)

use std::fmt;

use super::bytes::Endian;

/// Identifies the file family; stored in the producer's byte order
pub const SYSSTAT_MAGIC: u16 = 0xd596;
/// `SYSSTAT_MAGIC` as seen when reading a big-endian file little-endian
pub const SYSSTAT_MAGIC_SWAPPED: u16 = 0x96d5;

pub const FORMAT_MAGIC_V1: u16 = 0x2171;
pub const FORMAT_MAGIC_V2: u16 = 0x2173;

/// Version triple stamped into files written by this crate
pub const PRODUCER_VERSION: (u8, u8, u8) = (12, 7, 1);

pub const FILE_MAGIC_SIZE: usize = 16;
pub const MAX_ACTIVITIES: u32 = 64;
pub const MAX_COMMENT_LEN: usize = 64;

/// Header flag: restart records may appear in the record stream
pub const FILE_FLAG_RESTARTS: u32 = 1 << 0;

// Record types
pub const R_STATS: u8 = 1;
pub const R_RESTART: u8 = 2;
pub const R_COMMENT: u8 = 3;

/// Byte sizes of every fixed structure for one format revision
#[derive(Debug, PartialEq, Eq)]
pub struct VersionLayout {
    pub header_size: usize,
    pub descriptor_size: usize,
    pub record_header_size: usize,
    pub restart_size: usize,
}

static LAYOUT_V1: VersionLayout = VersionLayout {
    header_size: 128,
    descriptor_size: 8,
    record_header_size: 12,
    restart_size: 4,
};

static LAYOUT_V2: VersionLayout = VersionLayout {
    header_size: 192,
    descriptor_size: 16,
    record_header_size: 24,
    restart_size: 8,
};

/// File format revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatVersion {
    V1,
    V2,
    Unknown(u16),
}

impl FormatVersion {
    pub const CURRENT: FormatVersion = FormatVersion::V2;

    pub fn from_magic(format_magic: u16) -> Self {
        match format_magic {
            FORMAT_MAGIC_V1 => FormatVersion::V1,
            FORMAT_MAGIC_V2 => FormatVersion::V2,
            other => FormatVersion::Unknown(other),
        }
    }

    pub fn format_magic(self) -> u16 {
        match self {
            FormatVersion::V1 => FORMAT_MAGIC_V1,
            FormatVersion::V2 => FORMAT_MAGIC_V2,
            FormatVersion::Unknown(magic) => magic,
        }
    }

    pub fn is_known(self) -> bool {
        !matches!(self, FormatVersion::Unknown(_))
    }

    pub fn is_current(self) -> bool {
        self == Self::CURRENT
    }

    /// Structure sizes; unknown revisions are read with the current widths
    pub fn layout(self) -> &'static VersionLayout {
        match self {
            FormatVersion::V1 => &LAYOUT_V1,
            FormatVersion::V2 | FormatVersion::Unknown(_) => &LAYOUT_V2,
        }
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatVersion::V1 => write!(f, "v1 ({FORMAT_MAGIC_V1:#06x})"),
            FormatVersion::V2 => write!(f, "v2 ({FORMAT_MAGIC_V2:#06x})"),
            FormatVersion::Unknown(magic) => write!(f, "unknown ({magic:#06x})"),
        }
    }
}

/// Identification block at the start of every file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMagic {
    pub endian: Endian,
    pub version: FormatVersion,
    /// Producer version triple (major, minor, patch)
    pub producer: (u8, u8, u8),
    /// Set when the file was written by a format conversion
    pub upgraded: bool,
    /// Byte length of the header block that follows
    pub header_size: u32,
}

impl FileMagic {
    /// Magic block for a file written by this crate
    pub fn for_version(version: FormatVersion, endian: Endian) -> Self {
        Self {
            endian,
            version,
            producer: PRODUCER_VERSION,
            upgraded: false,
            header_size: version.layout().header_size as u32,
        }
    }
}

/// Revision-independent view of the header block
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileHeader {
    /// Recording start, epoch seconds (UTC)
    pub start_time: u64,
    /// Sampling interval in seconds
    pub interval: u64,
    pub activity_count: u32,
    pub flags: u32,
    pub cpu_count: u32,
    pub hz: u32,
    pub sysname: String,
    pub nodename: String,
    pub release: String,
    pub machine: String,
}

impl FileHeader {
    pub fn may_contain_restarts(&self) -> bool {
        (self.flags & FILE_FLAG_RESTARTS) != 0
    }
}

/// Time carried by every record header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordTime {
    /// Epoch seconds (UTC)
    pub time: u64,
    /// Machine uptime in hundredths of a second
    pub uptime_cs: u64,
}
