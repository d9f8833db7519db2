// Raw field dump: semicolon separated rows for loading into other tools

use std::io::{self, BufWriter, Write};

use crate::safile::{ActivitySpec, ActivityStats};

use super::backend::{HeaderInfo, OutputBackend, RestartStamp, Stamp};
use super::options::FormatOptions;

const SEP: &str = ";";
const FIELD_LIST_PREFIX: &str = "# hostname;interval;timestamp";

/// One output line being assembled in horizontal mode
#[derive(Debug, Default)]
struct PendingLine {
    prefix: String,
    names: Vec<String>,
    values: Vec<String>,
}

pub struct RawBackend<W: Write> {
    out: BufWriter<W>,
    horizontal: bool,
    field_list: bool,
    host: String,
    prefix: String,
    /// Field names of the last field-list line
    listed: Option<Vec<String>>,
    pending: Option<PendingLine>,
}

impl<W: Write> RawBackend<W> {
    pub fn new(out: W, options: FormatOptions) -> Self {
        Self {
            out: BufWriter::new(out),
            horizontal: options.horizontal,
            field_list: options.field_list,
            host: String::new(),
            prefix: String::new(),
            listed: None,
            pending: None,
        }
    }

    fn line_prefix(&self, interval: u64, time: &str) -> String {
        [self.host.as_str(), &interval.to_string(), time].join(SEP)
    }

    fn write_field_list(&mut self, names: &[String]) -> io::Result<()> {
        if !self.field_list || self.listed.as_deref() == Some(names) {
            return Ok(());
        }
        if names.is_empty() {
            writeln!(self.out, "{FIELD_LIST_PREFIX}")?;
        } else {
            writeln!(self.out, "{FIELD_LIST_PREFIX}{SEP}{}", names.join(SEP))?;
        }
        self.listed = Some(names.to_vec());
        Ok(())
    }

    fn write_row(&mut self, prefix: &str, values: &[String]) -> io::Result<()> {
        if values.is_empty() {
            writeln!(self.out, "{prefix}")
        } else {
            writeln!(self.out, "{prefix}{SEP}{}", values.join(SEP))
        }
    }

    fn flush_pending(&mut self) -> io::Result<()> {
        if let Some(line) = self.pending.take() {
            self.write_field_list(&line.names)?;
            self.write_row(&line.prefix, &line.values)?;
        }
        Ok(())
    }
}

/// Column names and values of one item, label first
fn item_columns(
    activity: &ActivitySpec,
    label: Option<&str>,
    values: &[(&'static str, u64)],
) -> (Vec<String>, Vec<String>) {
    let mut names = Vec::with_capacity(values.len() + 1);
    let mut cells = Vec::with_capacity(values.len() + 1);
    if let Some(label) = label {
        names.push(activity.item_column.to_string());
        cells.push(label.to_string());
    }
    for (field, value) in values {
        names.push((*field).to_string());
        cells.push(value.to_string());
    }
    (names, cells)
}

impl<W: Write> OutputBackend for RawBackend<W> {
    fn header(&mut self, info: &HeaderInfo<'_>) -> io::Result<()> {
        self.host = info.header.nodename.clone();
        Ok(())
    }

    fn timestamp(&mut self, stamp: &Stamp) -> io::Result<()> {
        self.flush_pending()?;
        self.prefix = self.line_prefix(stamp.interval, &stamp.time.text);
        if self.horizontal {
            self.pending = Some(PendingLine {
                prefix: self.prefix.clone(),
                ..PendingLine::default()
            });
        }
        Ok(())
    }

    fn statistics(&mut self, activity: &ActivitySpec, stats: &ActivityStats) -> io::Result<()> {
        if let Some(line) = self.pending.as_mut() {
            for item in &stats.items {
                let (names, cells) = item_columns(activity, item.label.as_deref(), &item.values);
                line.names.extend(names);
                line.values.extend(cells);
            }
            return Ok(());
        }

        for item in &stats.items {
            let (names, cells) = item_columns(activity, item.label.as_deref(), &item.values);
            self.write_field_list(&names)?;
            let prefix = self.prefix.clone();
            self.write_row(&prefix, &cells)?;
        }
        Ok(())
    }

    fn comment(&mut self, stamp: &Stamp, text: &str) -> io::Result<()> {
        self.flush_pending()?;
        let prefix = self.line_prefix(stamp.interval, &stamp.time.text);
        writeln!(self.out, "{prefix}{SEP}COM {text}")
    }

    fn restart(&mut self, stamp: &RestartStamp) -> io::Result<()> {
        self.flush_pending()?;
        let prefix = self.line_prefix(stamp.interval, &stamp.time.text);
        writeln!(self.out, "{prefix}{SEP}LINUX-RESTART\t({} CPU)", stamp.cpu_count)
    }

    fn finish(&mut self) -> io::Result<()> {
        self.flush_pending()?;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::time::TimeFormatter;
    use crate::safile::bytes::Endian;
    use crate::safile::catalog::{MEMORY, NET_DEV, PCSW};
    use crate::safile::{FileHeader, FileMagic, FormatVersion, StatItem};

    fn single(values: Vec<(&'static str, u64)>) -> ActivityStats {
        ActivityStats {
            items: vec![StatItem { label: None, values }],
        }
    }

    fn render(options: FormatOptions, f: impl FnOnce(&mut RawBackend<&mut Vec<u8>>)) -> String {
        let mut buf = Vec::new();
        let mut backend = RawBackend::new(&mut buf, options);
        let header = FileHeader {
            nodename: "db-01".into(),
            ..FileHeader::default()
        };
        let magic = FileMagic::for_version(FormatVersion::V2, Endian::Little);
        backend
            .header(&HeaderInfo {
                magic: &magic,
                header: &header,
                activities: &[],
                start: TimeFormatter::new(false, true).format(0),
            })
            .unwrap();
        f(&mut backend);
        backend.finish().unwrap();
        drop(backend);
        String::from_utf8(buf).unwrap()
    }

    fn stamp(epoch: u64) -> Stamp {
        Stamp {
            time: TimeFormatter::new(false, true).format(epoch),
            interval: 10,
        }
    }

    fn two_samples(backend: &mut RawBackend<&mut Vec<u8>>) {
        for epoch in [100, 110] {
            backend.timestamp(&stamp(epoch)).unwrap();
            backend
                .statistics(&PCSW, &single(vec![("proc", 1), ("cswch", 2)]))
                .unwrap();
            backend
                .statistics(&MEMORY, &single(vec![("frmkb", 3)]))
                .unwrap();
        }
    }

    #[test]
    fn test_raw__vertical__then_row_per_activity() {
        let output = render(FormatOptions::default(), two_samples);
        assert_eq!(
            output,
            "db-01;10;100;1;2\ndb-01;10;100;3\ndb-01;10;110;1;2\ndb-01;10;110;3\n"
        );
    }

    #[test]
    fn test_raw__field_list__then_names_when_activity_changes() {
        let options = FormatOptions {
            field_list: true,
            ..FormatOptions::default()
        };
        let output = render(options, two_samples);
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines[0], "# hostname;interval;timestamp;proc;cswch");
        assert_eq!(lines[1], "db-01;10;100;1;2");
        assert_eq!(lines[2], "# hostname;interval;timestamp;frmkb");
        assert_eq!(lines.len(), 8);
    }

    #[test]
    fn test_raw__horizontal__then_one_line_per_timestamp() {
        let options = FormatOptions {
            horizontal: true,
            field_list: true,
            ..FormatOptions::default()
        };
        let output = render(options, two_samples);
        assert_eq!(
            output,
            "# hostname;interval;timestamp;proc;cswch;frmkb\n\
             db-01;10;100;1;2;3\n\
             db-01;10;110;1;2;3\n"
        );
    }

    #[test]
    fn test_raw__labelled_item__then_label_column() {
        let output = render(FormatOptions::default(), |backend| {
            backend.timestamp(&stamp(100)).unwrap();
            let stats = ActivityStats {
                items: vec![StatItem {
                    label: Some("eth0".into()),
                    values: vec![("rxpck", 5)],
                }],
            };
            backend.statistics(&NET_DEV, &stats).unwrap();
        });
        assert_eq!(output, "db-01;10;100;eth0;5\n");
    }

    #[test]
    fn test_raw__comment_in_horizontal__then_pending_line_flushed_first() {
        let options = FormatOptions {
            horizontal: true,
            ..FormatOptions::default()
        };
        let output = render(options, |backend| {
            backend.timestamp(&stamp(100)).unwrap();
            backend
                .statistics(&MEMORY, &single(vec![("frmkb", 3)]))
                .unwrap();
            backend.comment(&stamp(105), "swap added").unwrap();
        });
        assert_eq!(output, "db-01;10;100;3\ndb-01;10;105;COM swap added\n");
    }
}
