//! Format migration
//!
//! Rewrites an activity file of any known revision into the current
//! revision. Payloads are decoded with the source layout and re-encoded with
//! the current one; restart and comment records are carried over unless the
//! caller asks to drop them.

use std::fs::{self, File, Metadata, OpenOptions};
use std::io;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::safile::{
    bytes::Endian, ActivityCatalog, ActivityDescriptor, ActivityFile, ActivityFileWriter,
    FileMagic, FormatError, FormatVersion, RecordEvent, RecordTime, Result,
};

/// Record classes the converter may drop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IgnoreFlags {
    pub restart: bool,
    /// Drop activities that cannot be translated losslessly
    pub volatile: bool,
    pub comment: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    pub ignore: IgnoreFlags,
    pub tolerant: bool,
    /// Replace an existing target instead of failing
    pub overwrite: bool,
}

#[derive(Debug, Default)]
pub struct ConvertReport {
    /// Statistics, restart and comment records in the target
    pub records_written: u64,
    pub activities_written: usize,
    pub volatile_dropped: usize,
    pub unsupported_dropped: usize,
    /// Structural problems downgraded by tolerant mode
    pub warnings: Vec<FormatError>,
}

/// What happens to each source activity
#[derive(Debug)]
struct ConversionPlan {
    /// Target descriptors, in source order
    descriptors: Vec<ActivityDescriptor>,
    /// Per source position: whether its payloads are carried over
    keep: Vec<bool>,
    volatile_dropped: usize,
    unsupported_dropped: usize,
}

impl ConversionPlan {
    fn new(source: &ActivityFile, ignore: IgnoreFlags) -> Result<Self> {
        let from = source.version();
        let mut plan = ConversionPlan {
            descriptors: Vec::with_capacity(source.descriptors().len()),
            keep: Vec::with_capacity(source.descriptors().len()),
            volatile_dropped: 0,
            unsupported_dropped: 0,
        };

        for descriptor in source.descriptors() {
            let Some(spec) = descriptor.spec else {
                info!(activity = descriptor.id, "Dropping unsupported activity");
                plan.unsupported_dropped += 1;
                plan.keep.push(false);
                continue;
            };
            if spec.is_lossy_from(from) {
                if !ignore.volatile {
                    return Err(FormatError::ConversionLossy {
                        id: spec.id,
                        name: spec.name,
                    });
                }
                info!(activity = spec.name, "Dropping volatile activity");
                plan.volatile_dropped += 1;
                plan.keep.push(false);
                continue;
            }

            let mut target =
                ActivityDescriptor::for_spec(spec, FormatVersion::CURRENT, descriptor.item_count);
            target.position = plan.descriptors.len();
            plan.descriptors.push(target);
            plan.keep.push(true);
        }

        Ok(plan)
    }
}

/// Convert `source` into a current-revision file at `target`.
///
/// Conflicts and lossy activities are reported before the target is
/// created. A failure after that point removes the partial target.
pub fn convert(
    source: &Path,
    target: &Path,
    options: &ConvertOptions,
    catalog: &ActivityCatalog,
) -> Result<ConvertReport> {
    if is_same_file(source, target)? {
        return Err(FormatError::ConversionTargetConflict {
            path: target.to_path_buf(),
            reason: "source and target are the same file".to_string(),
        });
    }

    // Header failures take precedence over any per-activity policy
    let mut file = ActivityFile::open(source, catalog, options.tolerant)?;

    if !options.overwrite && target.exists() {
        return Err(FormatError::ConversionTargetConflict {
            path: target.to_path_buf(),
            reason: "target already exists".to_string(),
        });
    }

    let plan = ConversionPlan::new(&file, options.ignore)?;
    let mut report = ConvertReport {
        activities_written: plan.descriptors.len(),
        volatile_dropped: plan.volatile_dropped,
        unsupported_dropped: plan.unsupported_dropped,
        warnings: file.take_warnings(),
        ..ConvertReport::default()
    };

    if let Some(err) = validate(&file, options.tolerant)? {
        warn!(path = %source.display(), error = %err, "Source ends with a damaged record, converting up to it");
        report.warnings.push(err);
    }

    let out = create_target(target, options.overwrite)?;
    match write_records(&file, &plan, options.ignore, out) {
        Ok(records) => {
            report.records_written = records;
            info!(
                source = %source.display(),
                target = %target.display(),
                from = %file.version(),
                records = records,
                activities = report.activities_written,
                volatile_dropped = report.volatile_dropped,
                unsupported_dropped = report.unsupported_dropped,
                "Converted activity file",
            );
            Ok(report)
        }
        Err(err) => {
            if let Err(remove_err) = fs::remove_file(target) {
                warn!(target = %target.display(), error = %remove_err, "Failed to remove partial target");
            }
            Err(err)
        }
    }
}

/// Sizing pass: walk the whole stream once so structural errors surface
/// before anything is written. Returns the terminal error in tolerant mode.
fn validate(file: &ActivityFile, tolerant: bool) -> Result<Option<FormatError>> {
    let mut records = 0u64;
    for event in file.scanner() {
        match event {
            Ok(RecordEvent::Statistics { .. }) => {}
            Ok(_) => records += 1,
            Err(err) if tolerant && err.is_tolerable() => return Ok(Some(err)),
            Err(err) => return Err(err),
        }
    }
    debug!(records, "Source record stream validated");
    Ok(None)
}

fn write_records(
    file: &ActivityFile,
    plan: &ConversionPlan,
    ignore: IgnoreFlags,
    out: File,
) -> Result<u64> {
    let magic = FileMagic {
        upgraded: !file.version().is_current() || file.magic().upgraded,
        ..FileMagic::for_version(FormatVersion::CURRENT, Endian::Little)
    };
    let mut writer = ActivityFileWriter::new(out, magic, file.header(), &plan.descriptors)?;
    let mut pending = PendingRecord::default();

    for event in file.scanner() {
        let event = match event {
            Ok(event) => event,
            // Already reported by the sizing pass
            Err(_) => break,
        };
        match event {
            RecordEvent::Timestamp(time) => {
                pending.flush(&mut writer, file.descriptors().len())?;
                pending.start(time);
            }
            RecordEvent::Statistics { descriptor, payload } => {
                pending.seen += 1;
                if !plan.keep[descriptor.position] {
                    continue;
                }
                // The plan only keeps activities with a known layout
                let spec = descriptor
                    .spec
                    .ok_or(FormatError::UnsupportedActivity(descriptor.id))?;
                let stats = spec.decode(file.version(), file.endian(), payload)?;
                pending
                    .bytes
                    .extend(spec.encode(FormatVersion::CURRENT, Endian::Little, &stats));
            }
            RecordEvent::Comment { time, text } => {
                pending.flush(&mut writer, file.descriptors().len())?;
                if !ignore.comment {
                    writer.write_comment(time, &text)?;
                }
            }
            RecordEvent::Restart(marker) => {
                pending.flush(&mut writer, file.descriptors().len())?;
                if !ignore.restart {
                    writer.write_restart(marker.time, marker.interval, marker.cpu_count)?;
                }
            }
        }
    }
    pending.flush(&mut writer, file.descriptors().len())?;

    let records = writer.records_written();
    writer.finish()?;
    Ok(records)
}

/// A statistics record being assembled. It is only written once every
/// source payload was read, so a damaged tail never leaves a partial
/// record in the target.
#[derive(Debug, Default)]
struct PendingRecord {
    time: Option<RecordTime>,
    bytes: Vec<u8>,
    seen: usize,
}

impl PendingRecord {
    fn start(&mut self, time: RecordTime) {
        self.time = Some(time);
        self.bytes.clear();
        self.seen = 0;
    }

    fn flush<W: io::Write>(
        &mut self,
        writer: &mut ActivityFileWriter<W>,
        expected: usize,
    ) -> Result<()> {
        if let Some(time) = self.time.take() {
            if self.seen == expected {
                writer.write_timestamp(time)?;
                writer.write_payload(&self.bytes)?;
            }
        }
        self.bytes.clear();
        self.seen = 0;
        Ok(())
    }
}

fn create_target(target: &Path, overwrite: bool) -> Result<File> {
    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    options.open(target).map_err(|err| match err.kind() {
        io::ErrorKind::AlreadyExists => FormatError::ConversionTargetConflict {
            path: target.to_path_buf(),
            reason: "target already exists".to_string(),
        },
        _ => FormatError::Io(err),
    })
}

/// Whether `target` names the same file as `source`. Hard links and
/// alternate spellings of one path both count. A missing target never does.
fn is_same_file(source: &Path, target: &Path) -> Result<bool> {
    let source_meta = fs::metadata(source)?;
    let target_meta = match fs::metadata(target) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err.into()),
    };
    same_identity(source, &source_meta, target, &target_meta)
}

#[cfg(unix)]
fn same_identity(_: &Path, source: &Metadata, _: &Path, target: &Metadata) -> Result<bool> {
    use std::os::unix::fs::MetadataExt;
    Ok(source.dev() == target.dev() && source.ino() == target.ino())
}

#[cfg(not(unix))]
fn same_identity(source: &Path, _: &Metadata, target: &Path, _: &Metadata) -> Result<bool> {
    Ok(fs::canonicalize(source)? == fs::canonicalize(target)?)
}
