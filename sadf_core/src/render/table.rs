// Tabular/property output: one value per line, tab separated

use std::io::{self, BufWriter, Write};

use crate::safile::{ActivitySpec, ActivityStats};

use super::backend::{HeaderInfo, OutputBackend, RestartStamp, Stamp};

/// `host\tinterval\ttime\tactivity\titem\tfield\tvalue`; single-item
/// activities print `-` as item.
pub struct TableBackend<W: Write> {
    out: BufWriter<W>,
    host: String,
    /// `host\tinterval\ttime` of the current sample
    prefix: String,
}

impl<W: Write> TableBackend<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: BufWriter::new(out),
            host: String::new(),
            prefix: String::new(),
        }
    }

    fn line_prefix(&self, stamp: &Stamp) -> String {
        format!("{}\t{}\t{}", self.host, stamp.interval, stamp.time.text)
    }
}

impl<W: Write> OutputBackend for TableBackend<W> {
    fn header(&mut self, info: &HeaderInfo<'_>) -> io::Result<()> {
        self.host = info.header.nodename.clone();
        Ok(())
    }

    fn timestamp(&mut self, stamp: &Stamp) -> io::Result<()> {
        self.prefix = self.line_prefix(stamp);
        Ok(())
    }

    fn statistics(&mut self, activity: &ActivitySpec, stats: &ActivityStats) -> io::Result<()> {
        for item in &stats.items {
            let label = item.label.as_deref().unwrap_or("-");
            for (field, value) in &item.values {
                writeln!(
                    self.out,
                    "{}\t{}\t{}\t{}\t{}",
                    self.prefix, activity.name, label, field, value
                )?;
            }
        }
        Ok(())
    }

    fn comment(&mut self, stamp: &Stamp, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}\tCOM {}", self.line_prefix(stamp), text)
    }

    fn restart(&mut self, stamp: &RestartStamp) -> io::Result<()> {
        writeln!(
            self.out,
            "{}\t{}\t{}\tLINUX-RESTART\t({} CPU)",
            self.host, stamp.interval, stamp.time.text, stamp.cpu_count
        )
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
