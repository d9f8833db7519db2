// Sequential encoder for activity files in any known revision

use std::io::{BufWriter, Write};

use super::bytes::{ByteSink, Endian};
use super::descriptors::{self, ActivityDescriptor};
use super::error::{FormatError, Result};
use super::header::{encode_header, encode_magic};
use super::types::{
    FileHeader, FileMagic, FormatVersion, RecordTime, MAX_COMMENT_LEN, R_COMMENT, R_RESTART,
    R_STATS,
};

/// Writes magic, header and descriptor list up front, then appends records.
///
/// The writer does not check that a statistics record is followed by one
/// payload per descriptor; callers write exactly `descriptors.len()`
/// payloads after each [`ActivityFileWriter::write_timestamp`].
pub struct ActivityFileWriter<W: Write> {
    out: BufWriter<W>,
    version: FormatVersion,
    endian: Endian,
    records_written: u64,
}

impl<W: Write> ActivityFileWriter<W> {
    pub fn new(
        out: W,
        magic: FileMagic,
        header: &FileHeader,
        descriptors: &[ActivityDescriptor],
    ) -> Result<Self> {
        let FileMagic {
            version, endian, ..
        } = magic;
        if !version.is_known() {
            return Err(FormatError::UnknownVersion(version.format_magic()));
        }

        let header = FileHeader {
            activity_count: descriptors.len() as u32,
            ..header.clone()
        };

        let mut out = BufWriter::new(out);
        out.write_all(&encode_magic(&magic))?;
        out.write_all(&encode_header(&header, version, endian))?;
        for descriptor in descriptors {
            out.write_all(&descriptors::encode(descriptor, version, endian))?;
        }

        Ok(Self {
            out,
            version,
            endian,
            records_written: 0,
        })
    }

    fn record_header(&self, record_type: u8, time: RecordTime) -> ByteSink {
        let layout = self.version.layout();
        let mut sink = ByteSink::with_capacity(
            self.endian,
            layout.record_header_size + MAX_COMMENT_LEN,
        );
        sink.u8(record_type).zeros(3);
        match self.version {
            FormatVersion::V1 => {
                sink.u32(time.time as u32).u32(time.uptime_cs as u32);
            }
            FormatVersion::V2 | FormatVersion::Unknown(_) => {
                sink.zeros(4).u64(time.time).u64(time.uptime_cs);
            }
        }
        sink
    }

    /// Start a statistics record; payloads follow in descriptor order
    pub fn write_timestamp(&mut self, time: RecordTime) -> Result<()> {
        let sink = self.record_header(R_STATS, time);
        self.out.write_all(&sink.into_bytes())?;
        self.records_written += 1;
        Ok(())
    }

    pub fn write_payload(&mut self, payload: &[u8]) -> Result<()> {
        self.out.write_all(payload)?;
        Ok(())
    }

    pub fn write_restart(&mut self, time: RecordTime, interval: u64, cpu_count: u32) -> Result<()> {
        let mut sink = self.record_header(R_RESTART, time);
        match self.version {
            FormatVersion::V1 => {
                sink.u16(interval as u16).u16(cpu_count as u16);
            }
            FormatVersion::V2 | FormatVersion::Unknown(_) => {
                sink.u32(interval as u32).u32(cpu_count);
            }
        }
        self.out.write_all(&sink.into_bytes())?;
        self.records_written += 1;
        Ok(())
    }

    /// Comments longer than the record's text field are cut
    pub fn write_comment(&mut self, time: RecordTime, text: &str) -> Result<()> {
        let mut sink = self.record_header(R_COMMENT, time);
        sink.text(text, MAX_COMMENT_LEN);
        self.out.write_all(&sink.into_bytes())?;
        self.records_written += 1;
        Ok(())
    }

    /// Statistics, restart and comment records written so far
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn finish(self) -> Result<W> {
        self.out
            .into_inner()
            .map_err(|err| FormatError::Io(err.into_error()))
    }
}
