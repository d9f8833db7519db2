// Output backend protocol and the closed set of implementations

use std::io::{self, Write};

use crate::safile::{
    ActivityDescriptor, ActivitySpec, ActivityStats, FileHeader, FileMagic, RestartKind,
};

use super::json::JsonBackend;
use super::markup::MarkupBackend;
use super::options::{FormatOptions, OutputFormat};
use super::raw::RawBackend;
use super::summary::SummaryBackend;
use super::table::TableBackend;
use super::time::SampleTime;

/// Document schema version written by the structured outputs
pub const SYSDATA_VERSION: &str = "3.1";

/// Everything `header()` may describe
#[derive(Debug, Clone)]
pub struct HeaderInfo<'a> {
    pub magic: &'a FileMagic,
    pub header: &'a FileHeader,
    /// Every activity declared by the file, selected or not
    pub activities: &'a [ActivityDescriptor],
    /// Recording start
    pub start: SampleTime,
}

/// Time context of a statistics record or comment
#[derive(Debug, Clone)]
pub struct Stamp {
    pub time: SampleTime,
    /// Sampling interval in effect, seconds
    pub interval: u64,
}

#[derive(Debug, Clone)]
pub struct RestartStamp {
    pub time: SampleTime,
    pub kind: RestartKind,
    /// New sampling interval, seconds
    pub interval: u64,
    pub cpu_count: u32,
}

impl RestartStamp {
    /// `1` when the collector came back with a different interval
    pub fn interval_change_flag(&self) -> u8 {
        u8::from(self.kind == RestartKind::IntervalChange)
    }
}

/// Calls made by the dispatch engine, in this order:
/// `header`, then any of `timestamp`/`statistics`/`close_markup`/`comment`/
/// `restart`, then `finish` exactly once.
pub trait OutputBackend {
    fn header(&mut self, info: &HeaderInfo<'_>) -> io::Result<()>;

    /// Start of the payload set of one sample time
    fn timestamp(&mut self, stamp: &Stamp) -> io::Result<()>;

    fn statistics(&mut self, activity: &ActivitySpec, stats: &ActivityStats) -> io::Result<()>;

    /// Explicit close for activities with nested items
    fn close_markup(&mut self, _activity: &ActivitySpec) -> io::Result<()> {
        Ok(())
    }

    fn comment(&mut self, stamp: &Stamp, text: &str) -> io::Result<()>;

    fn restart(&mut self, stamp: &RestartStamp) -> io::Result<()>;

    /// Close every open structure and flush
    fn finish(&mut self) -> io::Result<()>;
}

pub enum Backend<W: Write> {
    Table(TableBackend<W>),
    Raw(RawBackend<W>),
    Markup(MarkupBackend<W>),
    Json(JsonBackend<W>),
    Summary(SummaryBackend<W>),
}

impl<W: Write> Backend<W> {
    pub fn new(format: OutputFormat, out: W, options: FormatOptions) -> Self {
        match format {
            OutputFormat::Table => Backend::Table(TableBackend::new(out)),
            OutputFormat::Raw => Backend::Raw(RawBackend::new(out, options)),
            OutputFormat::Markup => Backend::Markup(MarkupBackend::new(out)),
            OutputFormat::Json => Backend::Json(JsonBackend::new(out)),
            OutputFormat::Summary => Backend::Summary(SummaryBackend::new(out)),
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $backend:ident => $call:expr) => {
        match $self {
            Backend::Table($backend) => $call,
            Backend::Raw($backend) => $call,
            Backend::Markup($backend) => $call,
            Backend::Json($backend) => $call,
            Backend::Summary($backend) => $call,
        }
    };
}

impl<W: Write> OutputBackend for Backend<W> {
    fn header(&mut self, info: &HeaderInfo<'_>) -> io::Result<()> {
        dispatch!(self, backend => backend.header(info))
    }

    fn timestamp(&mut self, stamp: &Stamp) -> io::Result<()> {
        dispatch!(self, backend => backend.timestamp(stamp))
    }

    fn statistics(&mut self, activity: &ActivitySpec, stats: &ActivityStats) -> io::Result<()> {
        dispatch!(self, backend => backend.statistics(activity, stats))
    }

    fn close_markup(&mut self, activity: &ActivitySpec) -> io::Result<()> {
        dispatch!(self, backend => backend.close_markup(activity))
    }

    fn comment(&mut self, stamp: &Stamp, text: &str) -> io::Result<()> {
        dispatch!(self, backend => backend.comment(stamp, text))
    }

    fn restart(&mut self, stamp: &RestartStamp) -> io::Result<()> {
        dispatch!(self, backend => backend.restart(stamp))
    }

    fn finish(&mut self) -> io::Result<()> {
        dispatch!(self, backend => backend.finish())
    }
}
