// Activity descriptor table: which activities a file carries and how many
// bytes each one occupies per statistics record.

use std::collections::HashSet;

use tracing::{info, warn};

use super::bytes::{ByteCursor, ByteSink, Endian};
use super::catalog::{ActivityCatalog, ActivitySpec};
use super::error::{FormatError, Result};
use super::types::{FileHeader, FileMagic, FormatVersion};

#[derive(Debug, Clone)]
pub struct ActivityDescriptor {
    pub id: u16,
    /// Per-activity layout revision (V2 files only, zero otherwise)
    pub layout: u16,
    /// Payload bytes per statistics record, as declared by the file
    pub record_size: u32,
    pub item_count: u32,
    /// Position in the on-disk descriptor order
    pub position: usize,
    /// Decoding layout; `None` for activities kept only structurally
    pub spec: Option<&'static ActivitySpec>,
}

impl ActivityDescriptor {
    /// Descriptor for a known activity written in `version`
    pub fn for_spec(spec: &'static ActivitySpec, version: FormatVersion, item_count: u32) -> Self {
        let layout = match version {
            FormatVersion::V1 => 0,
            _ => spec.layout(version).revision,
        };
        Self {
            id: spec.id,
            layout,
            record_size: spec.record_size(version, item_count) as u32,
            item_count,
            position: 0,
            spec: Some(spec),
        }
    }

    /// Descriptor for an activity whose layout is not known
    pub fn opaque(id: u16, record_size: u32, item_count: u32) -> Self {
        Self {
            id,
            layout: 0,
            record_size,
            item_count,
            position: 0,
            spec: None,
        }
    }

    pub fn supported(&self) -> bool {
        self.spec.is_some()
    }

    pub fn name(&self) -> &'static str {
        self.spec.map_or("unknown", |spec| spec.name)
    }
}

/// Read `header.activity_count` descriptors from `bytes` (the region right
/// after the header block).
///
/// Unknown ids are kept with the size the file declares so the scanner can
/// skip them. A known activity whose declared size disagrees with the
/// catalog layout is a `BadHeader`; in tolerant mode it is downgraded to a
/// warning and the activity is kept structurally only.
pub fn build(
    bytes: &[u8],
    magic: &FileMagic,
    header: &FileHeader,
    catalog: &ActivityCatalog,
    tolerant: bool,
    warnings: &mut Vec<FormatError>,
) -> Result<Vec<ActivityDescriptor>> {
    let entry_size = magic.version.layout().descriptor_size;
    let count = header.activity_count as usize;
    if bytes.len() < entry_size * count {
        return Err(FormatError::bad_header(format!(
            "activity list needs {} bytes, {} available",
            entry_size * count,
            bytes.len()
        )));
    }

    let mut cursor = ByteCursor::new(bytes, magic.endian);
    let mut seen = HashSet::with_capacity(count);
    let mut descriptors = Vec::with_capacity(count);

    for position in 0..count {
        let (id, layout, record_size, item_count) = match magic.version {
            FormatVersion::V1 => {
                let id = cursor.u16()?;
                let record_size = cursor.u16()? as u32;
                let item_count = cursor.u16()? as u32;
                cursor.skip(2)?;
                (id, 0, record_size, item_count)
            }
            FormatVersion::V2 | FormatVersion::Unknown(_) => {
                let id = cursor.u16()?;
                let layout = cursor.u16()?;
                let record_size = cursor.u32()?;
                let item_count = cursor.u32()?;
                cursor.skip(4)?;
                (id, layout, record_size, item_count)
            }
        };

        if record_size == 0 {
            return Err(FormatError::bad_header(format!(
                "activity {id} declares an empty record"
            )));
        }
        if !seen.insert(id) {
            return Err(FormatError::bad_header(format!(
                "activity {id} is declared twice"
            )));
        }

        let spec = match catalog.get(id) {
            None => {
                info!(activity = id, record_size, "Unsupported activity, skipping its records");
                None
            }
            Some(spec) => match check_layout(spec, magic.version, layout, record_size, item_count) {
                Ok(()) => Some(spec),
                Err(err) if tolerant => {
                    warn!(activity = spec.name, error = %err, "Treating activity as unsupported");
                    warnings.push(err);
                    None
                }
                Err(err) => return Err(err),
            },
        };

        descriptors.push(ActivityDescriptor {
            id,
            layout,
            record_size,
            item_count,
            position,
            spec,
        });
    }

    Ok(descriptors)
}

fn check_layout(
    spec: &ActivitySpec,
    version: FormatVersion,
    layout: u16,
    record_size: u32,
    item_count: u32,
) -> Result<()> {
    let expected = spec.layout(version);
    if version != FormatVersion::V1 && layout != expected.revision {
        return Err(FormatError::bad_header(format!(
            "activity {} has layout revision {layout:#06x}, expected {:#06x}",
            spec.name, expected.revision
        )));
    }
    let expected_size = expected.item_size() as u64 * item_count as u64;
    if expected_size != record_size as u64 {
        return Err(FormatError::bad_header(format!(
            "activity {} declares {record_size} bytes for {item_count} items, expected {expected_size}",
            spec.name
        )));
    }
    Ok(())
}

/// Encode one descriptor in the layout of `version`
pub fn encode(descriptor: &ActivityDescriptor, version: FormatVersion, endian: Endian) -> Vec<u8> {
    let mut sink = ByteSink::with_capacity(endian, version.layout().descriptor_size);
    match version {
        FormatVersion::V1 => {
            sink.u16(descriptor.id)
                .u16(descriptor.record_size as u16)
                .u16(descriptor.item_count as u16)
                .zeros(2);
        }
        FormatVersion::V2 | FormatVersion::Unknown(_) => {
            sink.u16(descriptor.id)
                .u16(descriptor.layout)
                .u32(descriptor.record_size)
                .u32(descriptor.item_count)
                .zeros(4);
        }
    }
    sink.into_bytes()
}
