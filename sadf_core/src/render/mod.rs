//! Format dispatch engine
//!
//! Drives exactly one output backend through its protocol for a decoded
//! activity file:
//!
//! - `header` once, then `finish` right away in header-only mode
//! - interleaved ordering: one pass, all selected activities of a sample
//!   time before the next sample time
//! - grouped ordering: one pass per selected activity, each re-opening the
//!   record stream
//! - comments and restarts at their position in the stream
//! - `finish` exactly once, on error paths too

pub mod backend;
pub mod json;
pub mod markup;
pub mod options;
pub mod raw;
pub mod selection;
pub mod summary;
pub mod table;
pub mod time;

use std::io::Write;

use tracing::{debug, warn};

use crate::safile::{ActivityFile, FormatError, RecordEvent, RecordTime, Result};

pub use backend::{Backend, HeaderInfo, OutputBackend, RestartStamp, Stamp};
pub use options::{Capabilities, FormatOptions, OutputFormat};
pub use selection::{ActivitySelection, SelectedActivity};
pub use time::{SampleTime, TimeFormatter};

/// What a render produced
#[derive(Debug, Default)]
pub struct RenderReport {
    pub timestamps: u64,
    pub statistics: u64,
    pub comments: u64,
    pub restarts: u64,
    /// Structural problems downgraded by tolerant mode
    pub warnings: Vec<FormatError>,
}

/// Render `file` as `format` into `out`.
///
/// `options` are used as given; resolve them with [`FormatOptions::resolve`]
/// first to apply the format's capabilities.
pub fn render<W: Write>(
    file: &ActivityFile,
    format: OutputFormat,
    options: FormatOptions,
    selection: &ActivitySelection,
    out: W,
) -> Result<RenderReport> {
    let mut engine = Engine {
        file,
        options,
        selection,
        backend: Backend::new(format, out, options),
        times: TimeFormatter::new(options.local_time, options.epoch_seconds),
        report: RenderReport::default(),
    };

    let result = engine.run();
    let finished = engine.backend.finish();
    result?;
    finished?;

    debug!(
        format = %format,
        timestamps = engine.report.timestamps,
        statistics = engine.report.statistics,
        comments = engine.report.comments,
        restarts = engine.report.restarts,
        "Render complete",
    );
    Ok(engine.report)
}

struct Engine<'a, W: Write> {
    file: &'a ActivityFile,
    options: FormatOptions,
    selection: &'a ActivitySelection,
    backend: Backend<W>,
    times: TimeFormatter,
    report: RenderReport,
}

impl<W: Write> Engine<'_, W> {
    fn run(&mut self) -> Result<()> {
        let file = self.file;
        let header = file.header();
        self.backend.header(&HeaderInfo {
            magic: file.magic(),
            header,
            activities: file.descriptors(),
            start: self.times.format(header.start_time),
        })?;

        if self.options.header_only {
            return Ok(());
        }

        // Strict mode fails before any statistics are written
        if !self.options.tolerant {
            validate(file)?;
        }

        if self.options.grouped_stats {
            let selection = self.selection;
            for selected in selection.iter() {
                let supported = file
                    .descriptor(selected.id)
                    .is_some_and(|descriptor| descriptor.supported());
                if !supported {
                    debug!(activity = selected.id, "Selected activity not decodable in this file");
                    continue;
                }
                self.pass(Some(*selected))?;
            }
            Ok(())
        } else {
            self.pass(None)
        }
    }

    /// One walk over the record stream. `only` restricts statistics to one
    /// activity. A damaged tail is reported once even across grouped passes.
    fn pass(&mut self, only: Option<SelectedActivity>) -> Result<()> {
        let file = self.file;
        let mut interval = file.header().interval;
        let mut pending: Option<RecordTime> = None;

        for event in file.scanner() {
            let event = match event {
                Ok(event) => event,
                Err(err) if self.options.tolerant && err.is_tolerable() => {
                    if self.report.warnings.is_empty() {
                        warn!(path = %file.path().display(), error = %err, "Stopping at damaged record");
                        self.report.warnings.push(err);
                    }
                    return Ok(());
                }
                Err(err) => return Err(err),
            };

            match event {
                RecordEvent::Timestamp(time) => pending = Some(time),
                RecordEvent::Statistics {
                    descriptor,
                    payload,
                } => {
                    let selected = match only {
                        Some(only) if only.id == descriptor.id => only,
                        Some(_) => continue,
                        None => match self.selection.get(descriptor.id) {
                            Some(selected) => *selected,
                            None => continue,
                        },
                    };
                    let Some(spec) = descriptor.spec else {
                        continue;
                    };
                    let stats = spec.decode(file.version(), file.endian(), payload)?;

                    if let Some(time) = pending.take() {
                        self.backend.timestamp(&Stamp {
                            time: self.times.format(time.time),
                            interval,
                        })?;
                        self.report.timestamps += 1;
                    }
                    self.backend.statistics(spec, &stats)?;
                    self.report.statistics += 1;
                    if self.options.test_markup && selected.close_markup {
                        self.backend.close_markup(spec)?;
                    }
                }
                RecordEvent::Comment { time, text } => {
                    self.backend.comment(
                        &Stamp {
                            time: self.times.format(time.time),
                            interval,
                        },
                        &text,
                    )?;
                    self.report.comments += 1;
                }
                RecordEvent::Restart(marker) => {
                    interval = marker.interval;
                    self.backend.restart(&RestartStamp {
                        time: self.times.format(marker.time.time),
                        kind: marker.kind,
                        interval: marker.interval,
                        cpu_count: marker.cpu_count,
                    })?;
                    self.report.restarts += 1;
                }
            }
        }
        Ok(())
    }
}

/// Walk the stream once without rendering; the first structural error wins
fn validate(file: &ActivityFile) -> Result<()> {
    for event in file.scanner() {
        event?;
    }
    Ok(())
}
