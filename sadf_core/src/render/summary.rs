// Header summary: file identification and the declared activity list

use std::io::{self, BufWriter, Write};

use crate::safile::{ActivitySpec, ActivityStats};

use super::backend::{HeaderInfo, OutputBackend, RestartStamp, Stamp};

pub struct SummaryBackend<W: Write> {
    out: BufWriter<W>,
}

impl<W: Write> SummaryBackend<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: BufWriter::new(out),
        }
    }
}

impl<W: Write> OutputBackend for SummaryBackend<W> {
    fn header(&mut self, info: &HeaderInfo<'_>) -> io::Result<()> {
        let magic = info.magic;
        let header = info.header;
        let (major, minor, patch) = magic.producer;

        writeln!(self.out, "File format version: {}", magic.version)?;
        writeln!(self.out, "Producer version: {major}.{minor}.{patch}")?;
        writeln!(self.out, "Byte order: {}", magic.endian)?;
        writeln!(
            self.out,
            "Upgraded: {}",
            if magic.upgraded { "yes" } else { "no" }
        )?;
        writeln!(
            self.out,
            "Host: {} {} ({}) {} - {} CPU",
            header.sysname, header.release, header.nodename, header.machine, header.cpu_count
        )?;
        writeln!(
            self.out,
            "Start: {} {} ({})",
            info.start.date, info.start.time, info.start.epoch
        )?;
        writeln!(self.out, "Interval: {} s", header.interval)?;
        writeln!(
            self.out,
            "Restart records: {}",
            if header.may_contain_restarts() { "yes" } else { "no" }
        )?;
        writeln!(self.out, "Number of activities in file: {}", info.activities.len())?;
        writeln!(self.out, "List of activities:")?;
        for descriptor in info.activities {
            write!(
                self.out,
                "{:02}: {}\t(x{}) {} bytes",
                descriptor.id,
                descriptor.name(),
                descriptor.item_count,
                descriptor.record_size
            )?;
            if !descriptor.supported() {
                write!(self.out, " [unsupported]")?;
            }
            writeln!(self.out)?;
        }
        Ok(())
    }

    fn timestamp(&mut self, _stamp: &Stamp) -> io::Result<()> {
        Ok(())
    }

    fn statistics(&mut self, _activity: &ActivitySpec, _stats: &ActivityStats) -> io::Result<()> {
        Ok(())
    }

    fn comment(&mut self, _stamp: &Stamp, _text: &str) -> io::Result<()> {
        Ok(())
    }

    fn restart(&mut self, _stamp: &RestartStamp) -> io::Result<()> {
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::time::TimeFormatter;
    use crate::safile::bytes::Endian;
    use crate::safile::catalog::CPU;
    use crate::safile::{ActivityDescriptor, FileHeader, FileMagic, FormatVersion};

    #[test]
    fn test_summary__header__then_activity_list_with_unsupported_marker() {
        let mut magic = FileMagic::for_version(FormatVersion::V1, Endian::Big);
        magic.upgraded = true;
        let header = FileHeader {
            interval: 60,
            cpu_count: 2,
            nodename: "edge".into(),
            sysname: "Linux".into(),
            ..FileHeader::default()
        };
        let activities = [
            ActivityDescriptor::for_spec(&CPU, FormatVersion::V1, 3),
            ActivityDescriptor::opaque(42, 16, 1),
        ];

        let mut buf = Vec::new();
        let mut backend = SummaryBackend::new(&mut buf);
        backend
            .header(&HeaderInfo {
                magic: &magic,
                header: &header,
                activities: &activities,
                start: TimeFormatter::new(false, false).format(0),
            })
            .unwrap();
        backend.comment(&Stamp { time: TimeFormatter::default().format(1), interval: 60 }, "ignored").unwrap();
        backend.finish().unwrap();
        drop(backend);

        let output = String::from_utf8(buf).unwrap();
        assert!(output.contains("File format version: v1 (0x2171)\n"));
        assert!(output.contains("Byte order: big-endian\n"));
        assert!(output.contains("Upgraded: yes\n"));
        assert!(output.contains("Start: 1970-01-01 00:00:00 (0)\n"));
        assert!(output.contains("01: cpu\t(x3) 72 bytes\n"));
        assert!(output.contains("42: unknown\t(x1) 16 bytes [unsupported]\n"));
        assert!(!output.contains("ignored"));
    }
}
