// Decoding session: a memory-mapped activity file with its parsed header
// and descriptor table.

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::{debug, warn};

use super::bytes::Endian;
use super::catalog::ActivityCatalog;
use super::descriptors::{self, ActivityDescriptor};
use super::error::{FormatError, Result};
use super::header::{parse_header, parse_header_best_effort, parse_magic};
use super::scanner::RecordScanner;
use super::types::{FileHeader, FileMagic, FormatVersion, FILE_MAGIC_SIZE};

/// An opened activity file. Header and descriptors are immutable for the
/// lifetime of the session; records are read through [`ActivityFile::scanner`].
pub struct ActivityFile {
    path: PathBuf,
    mmap: Mmap,
    magic: FileMagic,
    header: FileHeader,
    descriptors: Vec<ActivityDescriptor>,
    records_offset: usize,
    warnings: Vec<FormatError>,
}

impl ActivityFile {
    /// Open and memory-map `path`, decoding magic, header and activity list.
    ///
    /// With `tolerant`, an unknown revision or a header/descriptor layout
    /// mismatch on a genuine activity file is recorded as a warning and the
    /// file is decoded with best-effort widths.
    pub fn open(path: &Path, catalog: &ActivityCatalog, tolerant: bool) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len() as usize;
        if len < FILE_MAGIC_SIZE {
            return Err(FormatError::FileTooSmall {
                expected: FILE_MAGIC_SIZE,
                actual: len,
            });
        }

        // SAFETY: the mapping is read-only and lives as long as the session;
        // activity files are not modified while being formatted.
        let mmap = unsafe { Mmap::map(&file)? };

        let magic = parse_magic(&mmap)?;
        let mut warnings = Vec::new();

        let header_bytes = &mmap[FILE_MAGIC_SIZE..];
        let header = match parse_header(header_bytes, &magic) {
            Ok(header) => header,
            Err(err) if tolerant && err.is_tolerable() => {
                warn!(path = %path.display(), error = %err, "Bad file format, decoding with best-effort widths");
                warnings.push(err);
                parse_header_best_effort(header_bytes, &magic)?
            }
            Err(err) => return Err(err),
        };

        let descriptors_offset = FILE_MAGIC_SIZE + magic.header_size as usize;
        if descriptors_offset > mmap.len() {
            return Err(FormatError::bad_header(format!(
                "header of {} bytes extends past end of file ({} bytes)",
                magic.header_size,
                mmap.len()
            )));
        }

        let descriptors = descriptors::build(
            &mmap[descriptors_offset..],
            &magic,
            &header,
            catalog,
            tolerant,
            &mut warnings,
        )?;
        let records_offset =
            descriptors_offset + descriptors.len() * magic.version.layout().descriptor_size;

        debug!(
            path = %path.display(),
            version = %magic.version,
            endian = %magic.endian,
            activities = descriptors.len(),
            records_offset,
            "Opened activity file",
        );

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            magic,
            header,
            descriptors,
            records_offset,
            warnings,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn magic(&self) -> &FileMagic {
        &self.magic
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn version(&self) -> FormatVersion {
        self.magic.version
    }

    pub fn endian(&self) -> Endian {
        self.magic.endian
    }

    pub fn descriptors(&self) -> &[ActivityDescriptor] {
        &self.descriptors
    }

    pub fn descriptor(&self, id: u16) -> Option<&ActivityDescriptor> {
        self.descriptors.iter().find(|d| d.id == id)
    }

    /// Problems downgraded to warnings while opening in tolerant mode
    pub fn warnings(&self) -> &[FormatError] {
        &self.warnings
    }

    /// Move the open-time warnings out, e.g. into a conversion report
    pub fn take_warnings(&mut self) -> Vec<FormatError> {
        std::mem::take(&mut self.warnings)
    }

    /// A fresh cursor at the first record. Each call re-opens the stream,
    /// which is how multi-pass consumers start over.
    pub fn scanner(&self) -> RecordScanner<'_> {
        RecordScanner::new(
            &self.mmap,
            self.records_offset,
            self.magic.version,
            self.magic.endian,
            &self.descriptors,
            self.header.interval,
        )
    }
}

impl std::fmt::Debug for ActivityFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityFile")
            .field("path", &self.path)
            .field("magic", &self.magic)
            .field("activities", &self.descriptors.len())
            .field("len", &self.mmap.len())
            .finish()
    }
}
