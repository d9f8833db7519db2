// JSON output with an explicit frame stack.
//
// Each frame remembers whether a member was already written so separators
// go before every member but the first; trailing commas never occur.

use std::io::{self, BufWriter, Write};

use serde_json::Value;

use crate::safile::{ActivitySpec, ActivityStats, StatItem};

use super::backend::{HeaderInfo, OutputBackend, RestartStamp, Stamp, SYSDATA_VERSION};
use super::time::SampleTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Level {
    Document,
    Sysstat,
    Hosts,
    Host,
    Statistics,
    Record,
    Activity,
}

#[derive(Debug)]
struct Frame {
    key: Option<&'static str>,
    level: Level,
    closer: char,
    has_members: bool,
}

pub struct JsonBackend<W: Write> {
    out: BufWriter<W>,
    stack: Vec<Frame>,
}

impl<W: Write> JsonBackend<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: BufWriter::new(out),
            stack: Vec::new(),
        }
    }

    /// Number of objects/arrays opened and not yet closed
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn newline(&mut self) -> io::Result<()> {
        write!(self.out, "\n{:width$}", "", width = self.stack.len() * 2)
    }

    /// Separator, indentation and key of the next member of the top frame
    fn begin_member(&mut self, key: Option<&str>) -> io::Result<()> {
        if let Some(frame) = self.stack.last_mut() {
            let separate = frame.has_members;
            frame.has_members = true;
            if separate {
                write!(self.out, ",")?;
            }
            self.newline()?;
        }
        if let Some(key) = key {
            serde_json::to_writer(&mut self.out, key)?;
            write!(self.out, ": ")?;
        }
        Ok(())
    }

    fn open(&mut self, key: Option<&'static str>, level: Level, array: bool) -> io::Result<()> {
        self.begin_member(key)?;
        let (opener, closer) = if array { ('[', ']') } else { ('{', '}') };
        write!(self.out, "{opener}")?;
        self.stack.push(Frame {
            key,
            level,
            closer,
            has_members: false,
        });
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        if let Some(frame) = self.stack.pop() {
            if frame.has_members {
                self.newline()?;
            }
            write!(self.out, "{}", frame.closer)?;
        }
        Ok(())
    }

    fn unwind_to(&mut self, level: Level) -> io::Result<()> {
        while self.stack.last().is_some_and(|f| f.level > level) {
            self.close()?;
        }
        Ok(())
    }

    fn enter_statistics(&mut self) -> io::Result<()> {
        if self.stack.iter().any(|f| f.level == Level::Statistics) {
            self.unwind_to(Level::Statistics)
        } else {
            self.unwind_to(Level::Host)?;
            self.open(Some("statistics"), Level::Statistics, true)
        }
    }

    fn value(&mut self, key: &str, value: &Value) -> io::Result<()> {
        self.begin_member(Some(key))?;
        serde_json::to_writer(&mut self.out, value)?;
        Ok(())
    }

    /// A flat object written on a single line
    fn inline_object(&mut self, key: Option<&str>, fields: &[(&str, Value)]) -> io::Result<()> {
        self.begin_member(key)?;
        write!(self.out, "{{")?;
        for (index, (name, value)) in fields.iter().enumerate() {
            if index > 0 {
                write!(self.out, ", ")?;
            }
            serde_json::to_writer(&mut self.out, name)?;
            write!(self.out, ": ")?;
            serde_json::to_writer(&mut self.out, value)?;
        }
        write!(self.out, "}}")
    }

    /// `{"<key>": {...}}` entry of the statistics array
    fn event_entry(&mut self, key: &'static str, fields: &[(&str, Value)]) -> io::Result<()> {
        self.enter_statistics()?;
        self.open(None, Level::Record, false)?;
        self.inline_object(Some(key), fields)?;
        self.close()
    }
}

fn time_fields(time: &SampleTime) -> Vec<(&'static str, Value)> {
    vec![
        ("date", Value::from(time.date.clone())),
        ("time", Value::from(time.time.clone())),
        ("utc", Value::from(u8::from(time.utc))),
    ]
}

fn item_fields<'a>(activity: &'a ActivitySpec, item: &'a StatItem) -> Vec<(&'a str, Value)> {
    let mut fields = Vec::with_capacity(item.values.len() + 1);
    if let Some(label) = &item.label {
        fields.push((activity.item_column, Value::from(label.clone())));
    }
    fields.extend(item.values.iter().map(|(f, v)| (*f, Value::from(*v))));
    fields
}

impl<W: Write> OutputBackend for JsonBackend<W> {
    fn header(&mut self, info: &HeaderInfo<'_>) -> io::Result<()> {
        self.open(None, Level::Document, false)?;
        self.open(Some("sysstat"), Level::Sysstat, false)?;
        self.value("sysdata-version", &Value::from(SYSDATA_VERSION))?;
        self.open(Some("hosts"), Level::Hosts, true)?;
        self.open(None, Level::Host, false)?;

        let header = info.header;
        self.value("nodename", &Value::from(header.nodename.clone()))?;
        self.value("sysname", &Value::from(header.sysname.clone()))?;
        self.value("release", &Value::from(header.release.clone()))?;
        self.value("machine", &Value::from(header.machine.clone()))?;
        self.value("number-of-cpus", &Value::from(header.cpu_count))?;
        self.value("file-date", &Value::from(info.start.date.clone()))?;
        let time_key = if info.start.utc {
            "file-utc-time"
        } else {
            "file-time"
        };
        self.value(time_key, &Value::from(info.start.time.clone()))
    }

    fn timestamp(&mut self, stamp: &Stamp) -> io::Result<()> {
        self.enter_statistics()?;
        self.open(None, Level::Record, false)?;
        let mut fields = time_fields(&stamp.time);
        fields.push(("interval", Value::from(stamp.interval)));
        self.inline_object(Some("timestamp"), &fields)
    }

    fn statistics(&mut self, activity: &ActivitySpec, stats: &ActivityStats) -> io::Result<()> {
        self.unwind_to(Level::Record)?;
        if !activity.close_markup && stats.items.len() == 1 {
            let fields = item_fields(activity, &stats.items[0]);
            return self.inline_object(Some(activity.markup), &fields);
        }

        self.open(Some(activity.markup), Level::Activity, true)?;
        for item in &stats.items {
            let fields = item_fields(activity, item);
            self.inline_object(None, &fields)?;
        }
        Ok(())
    }

    fn close_markup(&mut self, activity: &ActivitySpec) -> io::Result<()> {
        if self
            .stack
            .last()
            .is_some_and(|f| f.level == Level::Activity && f.key == Some(activity.markup))
        {
            self.close()?;
        }
        Ok(())
    }

    fn comment(&mut self, stamp: &Stamp, text: &str) -> io::Result<()> {
        let mut fields = time_fields(&stamp.time);
        fields.push(("com", Value::from(text)));
        self.event_entry("comment", &fields)
    }

    fn restart(&mut self, stamp: &RestartStamp) -> io::Result<()> {
        let mut fields = time_fields(&stamp.time);
        fields.push(("interval", Value::from(stamp.interval)));
        fields.push(("cpu_count", Value::from(stamp.cpu_count)));
        fields.push(("interval-change", Value::from(stamp.interval_change_flag())));
        self.event_entry("boot", &fields)
    }

    fn finish(&mut self) -> io::Result<()> {
        let wrote_anything = !self.stack.is_empty();
        while !self.stack.is_empty() {
            self.close()?;
        }
        if wrote_anything {
            writeln!(self.out)?;
        }
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::time::TimeFormatter;
    use crate::safile::bytes::Endian;
    use crate::safile::catalog::{CPU, MEMORY};
    use crate::safile::{FileHeader, FileMagic, FormatVersion, RestartKind};

    fn start(backend: &mut JsonBackend<&mut Vec<u8>>) {
        let magic = FileMagic::for_version(FormatVersion::V2, Endian::Little);
        let header = FileHeader {
            nodename: "db-\"01\"".into(),
            cpu_count: 2,
            ..FileHeader::default()
        };
        backend
            .header(&HeaderInfo {
                magic: &magic,
                header: &header,
                activities: &[],
                start: TimeFormatter::new(false, false).format(1_700_000_000),
            })
            .unwrap();
    }

    fn stamp(epoch: u64) -> Stamp {
        Stamp {
            time: TimeFormatter::new(false, false).format(epoch),
            interval: 10,
        }
    }

    fn parse(buf: Vec<u8>) -> Value {
        serde_json::from_slice(&buf).unwrap()
    }

    #[test]
    fn test_json__header_only__then_valid_document() {
        let mut buf = Vec::new();
        let mut backend = JsonBackend::new(&mut buf);
        start(&mut backend);
        assert_eq!(backend.depth(), 4);
        backend.finish().unwrap();
        assert_eq!(backend.depth(), 0);
        drop(backend);

        let doc = parse(buf);
        let host = &doc["sysstat"]["hosts"][0];
        assert_eq!(host["nodename"], "db-\"01\"");
        assert_eq!(host["number-of-cpus"], 2);
        assert_eq!(host["file-utc-time"], "22:13:20");
        assert!(host.get("statistics").is_none());
    }

    #[test]
    fn test_json__records__then_statistics_array_in_order() {
        let mut buf = Vec::new();
        let mut backend = JsonBackend::new(&mut buf);
        start(&mut backend);
        backend.timestamp(&stamp(100)).unwrap();
        let cpu = ActivityStats {
            items: vec![
                StatItem {
                    label: Some("all".into()),
                    values: vec![("user", 5)],
                },
                StatItem {
                    label: Some("0".into()),
                    values: vec![("user", 6)],
                },
            ],
        };
        backend.statistics(&CPU, &cpu).unwrap();
        backend.close_markup(&CPU).unwrap();
        let memory = ActivityStats {
            items: vec![StatItem {
                label: None,
                values: vec![("frmkb", 9)],
            }],
        };
        backend.statistics(&MEMORY, &memory).unwrap();
        backend.comment(&stamp(105), "line\nbreak").unwrap();
        backend
            .restart(&RestartStamp {
                time: TimeFormatter::new(false, false).format(106),
                kind: RestartKind::Normal,
                interval: 10,
                cpu_count: 2,
            })
            .unwrap();
        backend.timestamp(&stamp(110)).unwrap();
        backend.statistics(&CPU, &cpu).unwrap();
        backend.finish().unwrap();
        drop(backend);

        let doc = parse(buf);
        let stats = doc["sysstat"]["hosts"][0]["statistics"].as_array().unwrap();
        assert_eq!(stats.len(), 4);
        assert_eq!(stats[0]["timestamp"]["interval"], 10);
        assert_eq!(stats[0]["cpu-load"][1]["cpu"], "0");
        assert_eq!(stats[0]["memory"]["frmkb"], 9);
        assert_eq!(stats[1]["comment"]["com"], "line\nbreak");
        assert_eq!(stats[2]["boot"]["cpu_count"], 2);
        assert_eq!(stats[2]["boot"]["interval-change"], 0);
        assert_eq!(stats[3]["cpu-load"][0]["user"], 5);
        assert_eq!(doc["sysstat"]["sysdata-version"], "3.1");
    }

    #[test]
    fn test_json__restart_with_new_interval__then_marked_as_interval_change() {
        let mut buf = Vec::new();
        let mut backend = JsonBackend::new(&mut buf);
        start(&mut backend);
        backend
            .restart(&RestartStamp {
                time: TimeFormatter::new(false, false).format(106),
                kind: RestartKind::IntervalChange,
                interval: 60,
                cpu_count: 2,
            })
            .unwrap();
        backend.finish().unwrap();
        drop(backend);

        let doc = parse(buf);
        let boot = &doc["sysstat"]["hosts"][0]["statistics"][0]["boot"];
        assert_eq!(boot["interval"], 60);
        assert_eq!(boot["interval-change"], 1);
    }
}
