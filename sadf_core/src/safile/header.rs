// Magic and header block decoding/encoding for every accepted revision

use super::bytes::{ByteCursor, ByteSink, Endian};
use super::error::{FormatError, Result};
use super::types::{
    FileHeader, FileMagic, FormatVersion, FILE_MAGIC_SIZE, MAX_ACTIVITIES, SYSSTAT_MAGIC,
    SYSSTAT_MAGIC_SWAPPED,
};

/// Parse the fixed-size identification block
pub fn parse_magic(bytes: &[u8]) -> Result<FileMagic> {
    if bytes.len() < FILE_MAGIC_SIZE {
        return Err(FormatError::FileTooSmall {
            expected: FILE_MAGIC_SIZE,
            actual: bytes.len(),
        });
    }

    let raw_magic = Endian::Little.read_u16(&bytes[0..2]);
    let endian = match raw_magic {
        SYSSTAT_MAGIC => Endian::Little,
        SYSSTAT_MAGIC_SWAPPED => Endian::Big,
        got => {
            return Err(FormatError::BadMagic {
                expected: SYSSTAT_MAGIC,
                got,
            })
        }
    };

    let mut cursor = ByteCursor::at(bytes, 2, endian);
    let format_magic = cursor.u16()?;
    let producer = (cursor.u8()?, cursor.u8()?, cursor.u8()?);
    let upgraded = cursor.u8()? != 0;
    let header_size = cursor.u32()?;

    Ok(FileMagic {
        endian,
        version: FormatVersion::from_magic(format_magic),
        producer,
        upgraded,
        header_size,
    })
}

/// Parse the header block that follows the magic.
///
/// Strict: the revision must be known and `header_size` must match the
/// revision's layout exactly.
pub fn parse_header(bytes: &[u8], magic: &FileMagic) -> Result<FileHeader> {
    if let FormatVersion::Unknown(format_magic) = magic.version {
        return Err(FormatError::UnknownVersion(format_magic));
    }

    let expected = magic.version.layout().header_size;
    if magic.header_size as usize != expected {
        return Err(FormatError::bad_header(format!(
            "header size {} does not match {} layout ({expected} bytes)",
            magic.header_size, magic.version
        )));
    }
    if bytes.len() < expected {
        return Err(FormatError::bad_header(format!(
            "header block is {} bytes, expected {expected}",
            bytes.len()
        )));
    }

    let header = decode_fields(&bytes[..expected], magic.version, magic.endian)?;
    validate(&header)?;
    Ok(header)
}

/// Decode the header with the widths of the file's revision (current widths
/// for unknown revisions) over whatever `header_size` bytes are present.
/// Missing bytes read as zero.
pub fn parse_header_best_effort(bytes: &[u8], magic: &FileMagic) -> Result<FileHeader> {
    let expected = magic.version.layout().header_size;
    let present = bytes.len().min(magic.header_size as usize).min(expected);

    let mut padded = vec![0u8; expected];
    padded[..present].copy_from_slice(&bytes[..present]);

    let header = decode_fields(&padded, magic.version, magic.endian)?;
    validate(&header)?;
    Ok(header)
}

fn decode_fields(bytes: &[u8], version: FormatVersion, endian: Endian) -> Result<FileHeader> {
    let mut cursor = ByteCursor::new(bytes, endian);
    let header = match version {
        FormatVersion::V1 => {
            let start_time = cursor.u32()? as u64;
            let interval = cursor.u16()? as u64;
            let activity_count = cursor.u16()? as u32;
            let flags = cursor.u8()? as u32;
            let cpu_count = cursor.u8()? as u32;
            let hz = cursor.u16()? as u32;
            cursor.skip(4)?;
            FileHeader {
                start_time,
                interval,
                activity_count,
                flags,
                cpu_count,
                hz,
                sysname: cursor.text(16)?,
                nodename: cursor.text(48)?,
                release: cursor.text(24)?,
                machine: cursor.text(24)?,
            }
        }
        FormatVersion::V2 | FormatVersion::Unknown(_) => {
            let start_time = cursor.u64()?;
            let interval = cursor.u32()? as u64;
            let activity_count = cursor.u32()?;
            let flags = cursor.u32()?;
            let cpu_count = cursor.u32()?;
            let hz = cursor.u32()?;
            cursor.skip(4)?;
            FileHeader {
                start_time,
                interval,
                activity_count,
                flags,
                cpu_count,
                hz,
                sysname: cursor.text(32)?,
                nodename: cursor.text(64)?,
                release: cursor.text(32)?,
                machine: cursor.text(32)?,
            }
        }
    };
    Ok(header)
}

fn validate(header: &FileHeader) -> Result<()> {
    if header.activity_count > MAX_ACTIVITIES {
        return Err(FormatError::bad_header(format!(
            "activity count {} exceeds maximum {MAX_ACTIVITIES}",
            header.activity_count
        )));
    }
    Ok(())
}

pub fn encode_magic(magic: &FileMagic) -> Vec<u8> {
    let mut sink = ByteSink::with_capacity(magic.endian, FILE_MAGIC_SIZE);
    sink.u16(SYSSTAT_MAGIC)
        .u16(magic.version.format_magic())
        .u8(magic.producer.0)
        .u8(magic.producer.1)
        .u8(magic.producer.2)
        .u8(u8::from(magic.upgraded))
        .u32(magic.header_size)
        .zeros(4);
    sink.into_bytes()
}

/// Encode `header` in the layout of `version`. Narrow V1 fields are
/// truncated to their on-disk width.
pub fn encode_header(header: &FileHeader, version: FormatVersion, endian: Endian) -> Vec<u8> {
    let mut sink = ByteSink::with_capacity(endian, version.layout().header_size);
    match version {
        FormatVersion::V1 => {
            sink.u32(header.start_time as u32)
                .u16(header.interval as u16)
                .u16(header.activity_count as u16)
                .u8(header.flags as u8)
                .u8(header.cpu_count as u8)
                .u16(header.hz as u16)
                .zeros(4)
                .text(&header.sysname, 16)
                .text(&header.nodename, 48)
                .text(&header.release, 24)
                .text(&header.machine, 24);
        }
        FormatVersion::V2 | FormatVersion::Unknown(_) => {
            sink.u64(header.start_time)
                .u32(header.interval as u32)
                .u32(header.activity_count)
                .u32(header.flags)
                .u32(header.cpu_count)
                .u32(header.hz)
                .zeros(4)
                .text(&header.sysname, 32)
                .text(&header.nodename, 64)
                .text(&header.release, 32)
                .text(&header.machine, 32);
        }
    }
    sink.into_bytes()
}
