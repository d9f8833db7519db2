// XML output with an explicit open-element stack

use std::io::{self, BufWriter, Write};

use crate::safile::{ActivitySpec, ActivityStats, StatItem};

use super::backend::{HeaderInfo, OutputBackend, RestartStamp, Stamp, SYSDATA_VERSION};
use super::time::SampleTime;

/// Nesting levels, outermost first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Level {
    Document,
    Host,
    Statistics,
    Timestamp,
    Activity,
}

#[derive(Debug)]
struct OpenElement {
    name: &'static str,
    level: Level,
}

pub struct MarkupBackend<W: Write> {
    out: BufWriter<W>,
    stack: Vec<OpenElement>,
}

type Attrs<'a> = [(&'a str, String)];

const DTD_BASE_URL: &str = "http://pagesperso-orange.fr/sebastien.godard";

impl<W: Write> MarkupBackend<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: BufWriter::new(out),
            stack: Vec::new(),
        }
    }

    /// Number of elements opened and not yet closed
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn indent(&mut self) -> io::Result<()> {
        write!(self.out, "{:width$}", "", width = self.stack.len() * 2)
    }

    fn write_attrs(&mut self, attrs: &Attrs<'_>) -> io::Result<()> {
        for (name, value) in attrs {
            write!(self.out, " {}=\"{}\"", name, escape(value))?;
        }
        Ok(())
    }

    fn open(&mut self, name: &'static str, level: Level, attrs: &Attrs<'_>) -> io::Result<()> {
        self.indent()?;
        write!(self.out, "<{name}")?;
        self.write_attrs(attrs)?;
        writeln!(self.out, ">")?;
        self.stack.push(OpenElement { name, level });
        Ok(())
    }

    fn empty(&mut self, name: &str, attrs: &Attrs<'_>) -> io::Result<()> {
        self.indent()?;
        write!(self.out, "<{name}")?;
        self.write_attrs(attrs)?;
        writeln!(self.out, "/>")
    }

    fn text(&mut self, name: &str, value: &str) -> io::Result<()> {
        self.indent()?;
        writeln!(self.out, "<{name}>{}</{name}>", escape(value))
    }

    fn close(&mut self) -> io::Result<()> {
        if let Some(element) = self.stack.pop() {
            self.indent()?;
            writeln!(self.out, "</{}>", element.name)?;
        }
        Ok(())
    }

    /// Close elements nested deeper than `level`
    fn unwind_to(&mut self, level: Level) -> io::Result<()> {
        while self.stack.last().is_some_and(|e| e.level > level) {
            self.close()?;
        }
        Ok(())
    }

    /// Make `<statistics>` the innermost open element, opening it on first use
    fn enter_statistics(&mut self) -> io::Result<()> {
        if self.stack.iter().any(|e| e.level == Level::Statistics) {
            self.unwind_to(Level::Statistics)
        } else {
            self.unwind_to(Level::Host)?;
            self.open("statistics", Level::Statistics, &[])
        }
    }

    fn item(&mut self, activity: &ActivitySpec, item: &StatItem) -> io::Result<()> {
        let mut attrs = Vec::with_capacity(item.values.len() + 1);
        if let Some(label) = &item.label {
            attrs.push((activity.item_column, label.clone()));
        }
        attrs.extend(item.values.iter().map(|(f, v)| (*f, v.to_string())));
        let name = if activity.close_markup {
            activity.name
        } else {
            activity.markup
        };
        self.empty(name, &attrs)
    }
}

fn time_attrs(time: &SampleTime) -> Vec<(&'static str, String)> {
    vec![
        ("date", time.date.clone()),
        ("time", time.time.clone()),
        ("utc", u8::from(time.utc).to_string()),
    ]
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            // Kept as references so attribute normalization does not fold them
            '\t' => escaped.push_str("&#x9;"),
            '\n' => escaped.push_str("&#xA;"),
            '\r' => escaped.push_str("&#xD;"),
            // Not allowed anywhere in an XML 1.0 document
            c if c < '\u{20}' => {}
            c => escaped.push(c),
        }
    }
    escaped
}

impl<W: Write> OutputBackend for MarkupBackend<W> {
    fn header(&mut self, info: &HeaderInfo<'_>) -> io::Result<()> {
        writeln!(self.out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
        writeln!(
            self.out,
            "<!DOCTYPE sysstat PUBLIC \"DTD v{SYSDATA_VERSION} sysstat //EN\" \"{DTD_BASE_URL}/sysstat-{SYSDATA_VERSION}.dtd\">"
        )?;
        self.open("sysstat", Level::Document, &[])?;
        self.text("sysdata-version", SYSDATA_VERSION)?;
        self.open(
            "host",
            Level::Host,
            &[("nodename", info.header.nodename.clone())],
        )?;
        self.text("sysname", &info.header.sysname)?;
        self.text("release", &info.header.release)?;
        self.text("machine", &info.header.machine)?;
        self.text("number-of-cpus", &info.header.cpu_count.to_string())?;
        self.text("file-date", &info.start.date)?;
        let time_tag = if info.start.utc {
            "file-utc-time"
        } else {
            "file-time"
        };
        self.text(time_tag, &info.start.time)
    }

    fn timestamp(&mut self, stamp: &Stamp) -> io::Result<()> {
        self.enter_statistics()?;
        let mut attrs = time_attrs(&stamp.time);
        attrs.push(("interval", stamp.interval.to_string()));
        self.open("timestamp", Level::Timestamp, &attrs)
    }

    fn statistics(&mut self, activity: &ActivitySpec, stats: &ActivityStats) -> io::Result<()> {
        self.unwind_to(Level::Timestamp)?;
        if activity.close_markup {
            self.open(activity.markup, Level::Activity, &[])?;
        }
        for item in &stats.items {
            self.item(activity, item)?;
        }
        Ok(())
    }

    fn close_markup(&mut self, activity: &ActivitySpec) -> io::Result<()> {
        if self
            .stack
            .last()
            .is_some_and(|e| e.level == Level::Activity && e.name == activity.markup)
        {
            self.close()?;
        }
        Ok(())
    }

    fn comment(&mut self, stamp: &Stamp, text: &str) -> io::Result<()> {
        self.enter_statistics()?;
        let mut attrs = time_attrs(&stamp.time);
        attrs.push(("com", text.to_string()));
        self.empty("comment", &attrs)
    }

    fn restart(&mut self, stamp: &RestartStamp) -> io::Result<()> {
        self.enter_statistics()?;
        let mut attrs = time_attrs(&stamp.time);
        attrs.push(("interval", stamp.interval.to_string()));
        attrs.push(("cpu_count", stamp.cpu_count.to_string()));
        attrs.push(("interval-change", stamp.interval_change_flag().to_string()));
        self.empty("boot", &attrs)
    }

    fn finish(&mut self) -> io::Result<()> {
        while !self.stack.is_empty() {
            self.close()?;
        }
        self.out.flush()
    }
}
