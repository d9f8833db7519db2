// Per-activity record layouts keyed by (format revision, activity id).
//
// The catalog is the seam to the per-activity decoding tables: the decoder
// asks it for the layout of an activity in a given revision and never
// hard-codes offsets itself.

use super::bytes::{ByteCursor, ByteSink, Endian};
use super::error::Result;
use super::types::FormatVersion;

pub const A_CPU: u16 = 1;
pub const A_PCSW: u16 = 2;
pub const A_MEMORY: u16 = 7;
pub const A_QUEUE: u16 = 9;
pub const A_SERIAL: u16 = 10;
pub const A_NET_DEV: u16 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Counter32,
    Counter64,
    /// NUL-padded name of fixed width; used as the item label
    Text(usize),
}

impl FieldKind {
    pub const fn size(self) -> usize {
        match self {
            FieldKind::Counter32 => 4,
            FieldKind::Counter64 => 8,
            FieldKind::Text(len) => len,
        }
    }
}

#[derive(Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn c32(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Counter32,
    }
}

const fn c64(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Counter64,
    }
}

const fn text(name: &'static str, len: usize) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Text(len),
    }
}

/// Layout of one item of an activity record in one revision
#[derive(Debug)]
pub struct RecordLayout {
    /// Layout revision stamped into V2 descriptors
    pub revision: u16,
    pub fields: &'static [FieldSpec],
}

impl RecordLayout {
    pub fn item_size(&self) -> usize {
        self.fields.iter().map(|f| f.kind.size()).sum()
    }

    /// Counter field names, in layout order
    pub fn counter_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields
            .iter()
            .filter(|f| !matches!(f.kind, FieldKind::Text(_)))
            .map(|f| f.name)
    }
}

/// How the items of a multi-item record are labelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemLabel {
    /// Exactly one unlabelled item
    Single,
    /// First item is the "all" aggregate, then one per CPU
    CpuIndex,
    /// Items numbered from zero
    Index,
    /// Label taken from the layout's text field
    NameField,
}

#[derive(Debug)]
pub struct ActivitySpec {
    pub id: u16,
    pub name: &'static str,
    /// Element/key name used by the markup and object-notation outputs
    pub markup: &'static str,
    /// Column/attribute name of the item label
    pub item_column: &'static str,
    pub items: ItemLabel,
    /// Multi-item payloads need an explicit closing element in markup output
    pub close_markup: bool,
    /// Cannot be translated losslessly between revisions
    pub volatile: bool,
    pub v1: RecordLayout,
    pub v2: RecordLayout,
}

/// One decoded item: optional label plus named counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatItem {
    pub label: Option<String>,
    pub values: Vec<(&'static str, u64)>,
}

impl StatItem {
    pub fn value(&self, name: &str) -> Option<u64> {
        self.values
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| *value)
    }
}

/// Decoded payload of one Statistics record
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActivityStats {
    pub items: Vec<StatItem>,
}

impl ActivitySpec {
    /// Layout for `version`; unknown revisions are read with the current one
    pub fn layout(&self, version: FormatVersion) -> &RecordLayout {
        match version {
            FormatVersion::V1 => &self.v1,
            FormatVersion::V2 | FormatVersion::Unknown(_) => &self.v2,
        }
    }

    pub fn record_size(&self, version: FormatVersion, item_count: u32) -> usize {
        self.layout(version).item_size() * item_count as usize
    }

    /// Converting a record of this activity from `from` would lose data
    pub fn is_lossy_from(&self, from: FormatVersion) -> bool {
        self.volatile && !from.is_current()
    }

    /// Decode a payload written in `version`. The caller guarantees the
    /// payload is a whole number of items.
    pub fn decode(&self, version: FormatVersion, endian: Endian, payload: &[u8]) -> Result<ActivityStats> {
        let layout = self.layout(version);
        let item_size = layout.item_size();
        let mut items = Vec::with_capacity(payload.len() / item_size.max(1));

        for (index, chunk) in payload.chunks_exact(item_size).enumerate() {
            let mut cursor = ByteCursor::new(chunk, endian);
            let mut name = None;
            let mut values = Vec::with_capacity(layout.fields.len());
            for field in layout.fields {
                match field.kind {
                    FieldKind::Counter32 => values.push((field.name, cursor.u32()? as u64)),
                    FieldKind::Counter64 => values.push((field.name, cursor.u64()?)),
                    FieldKind::Text(len) => name = Some(cursor.text(len)?),
                }
            }
            let label = match self.items {
                ItemLabel::Single => None,
                ItemLabel::CpuIndex if index == 0 => Some("all".to_string()),
                ItemLabel::CpuIndex => Some((index - 1).to_string()),
                ItemLabel::Index => Some(index.to_string()),
                ItemLabel::NameField => name,
            };
            items.push(StatItem { label, values });
        }

        Ok(ActivityStats { items })
    }

    /// Encode `stats` in the layout of `version`. Counters are matched by
    /// field name; counters missing from `stats` are written as zero.
    pub fn encode(&self, version: FormatVersion, endian: Endian, stats: &ActivityStats) -> Vec<u8> {
        let layout = self.layout(version);
        let mut sink = ByteSink::with_capacity(endian, layout.item_size() * stats.items.len());
        for item in &stats.items {
            for field in layout.fields {
                match field.kind {
                    FieldKind::Counter32 => {
                        sink.u32(item.value(field.name).unwrap_or(0) as u32);
                    }
                    FieldKind::Counter64 => {
                        sink.u64(item.value(field.name).unwrap_or(0));
                    }
                    FieldKind::Text(len) => {
                        sink.text(item.label.as_deref().unwrap_or(""), len);
                    }
                }
            }
        }
        sink.into_bytes()
    }
}

static CPU_V1: [FieldSpec; 6] = [
    c32("user"),
    c32("nice"),
    c32("system"),
    c32("iowait"),
    c32("steal"),
    c32("idle"),
];
static CPU_V2: [FieldSpec; 6] = [
    c64("user"),
    c64("nice"),
    c64("system"),
    c64("iowait"),
    c64("steal"),
    c64("idle"),
];
static PCSW_V1: [FieldSpec; 2] = [c32("proc"), c32("cswch")];
static PCSW_V2: [FieldSpec; 2] = [c64("proc"), c64("cswch")];
static MEMORY_V1: [FieldSpec; 4] = [c32("frmkb"), c32("bufkb"), c32("camkb"), c32("tlmkb")];
static MEMORY_V2: [FieldSpec; 4] = [c64("frmkb"), c64("bufkb"), c64("camkb"), c64("tlmkb")];
static QUEUE_V1: [FieldSpec; 4] = [
    c32("runq-sz"),
    c32("plist-sz"),
    c32("ldavg-1"),
    c32("ldavg-5"),
];
static QUEUE_V2: [FieldSpec; 4] = [
    c64("runq-sz"),
    c64("plist-sz"),
    c64("ldavg-1"),
    c64("ldavg-5"),
];
static SERIAL_V1: [FieldSpec; 4] = [c32("rcvin"), c32("xmtin"), c32("framerr"), c32("prtyerr")];
static SERIAL_V2: [FieldSpec; 5] = [
    c64("rcvin"),
    c64("xmtin"),
    c64("framerr"),
    c64("prtyerr"),
    c64("overrun"),
];
static NET_DEV_V1: [FieldSpec; 5] = [
    text("iface", 8),
    c32("rxpck"),
    c32("txpck"),
    c32("rxkB"),
    c32("txkB"),
];
static NET_DEV_V2: [FieldSpec; 5] = [
    text("iface", 16),
    c64("rxpck"),
    c64("txpck"),
    c64("rxkB"),
    c64("txkB"),
];

pub static CPU: ActivitySpec = ActivitySpec {
    id: A_CPU,
    name: "cpu",
    markup: "cpu-load",
    item_column: "cpu",
    items: ItemLabel::CpuIndex,
    close_markup: true,
    volatile: false,
    v1: RecordLayout { revision: 0, fields: &CPU_V1 },
    v2: RecordLayout { revision: 0x8001, fields: &CPU_V2 },
};

pub static PCSW: ActivitySpec = ActivitySpec {
    id: A_PCSW,
    name: "pcsw",
    markup: "process-and-context-switch",
    item_column: "",
    items: ItemLabel::Single,
    close_markup: false,
    volatile: false,
    v1: RecordLayout { revision: 0, fields: &PCSW_V1 },
    v2: RecordLayout { revision: 0x8001, fields: &PCSW_V2 },
};

pub static MEMORY: ActivitySpec = ActivitySpec {
    id: A_MEMORY,
    name: "memory",
    markup: "memory",
    item_column: "",
    items: ItemLabel::Single,
    close_markup: false,
    volatile: false,
    v1: RecordLayout { revision: 0, fields: &MEMORY_V1 },
    v2: RecordLayout { revision: 0x8002, fields: &MEMORY_V2 },
};

pub static QUEUE: ActivitySpec = ActivitySpec {
    id: A_QUEUE,
    name: "queue",
    markup: "queue",
    item_column: "",
    items: ItemLabel::Single,
    close_markup: false,
    volatile: false,
    v1: RecordLayout { revision: 0, fields: &QUEUE_V1 },
    v2: RecordLayout { revision: 0x8001, fields: &QUEUE_V2 },
};

pub static SERIAL: ActivitySpec = ActivitySpec {
    id: A_SERIAL,
    name: "serial",
    markup: "serial",
    item_column: "line",
    items: ItemLabel::Index,
    close_markup: true,
    volatile: true,
    v1: RecordLayout { revision: 0, fields: &SERIAL_V1 },
    v2: RecordLayout { revision: 0x8002, fields: &SERIAL_V2 },
};

pub static NET_DEV: ActivitySpec = ActivitySpec {
    id: A_NET_DEV,
    name: "net-dev",
    markup: "network",
    item_column: "iface",
    items: ItemLabel::NameField,
    close_markup: true,
    volatile: false,
    v1: RecordLayout { revision: 0, fields: &NET_DEV_V1 },
    v2: RecordLayout { revision: 0x8003, fields: &NET_DEV_V2 },
};

static BUILTIN: [&ActivitySpec; 6] = [&CPU, &PCSW, &MEMORY, &QUEUE, &SERIAL, &NET_DEV];

/// Lookup of activity layouts by id
#[derive(Debug, Clone)]
pub struct ActivityCatalog {
    specs: Vec<&'static ActivitySpec>,
}

impl ActivityCatalog {
    /// Catalog of the well-known activities
    pub fn builtin() -> Self {
        Self {
            specs: BUILTIN.to_vec(),
        }
    }

    pub fn empty() -> Self {
        Self { specs: Vec::new() }
    }

    /// Add or replace the spec registered for `spec.id`
    pub fn with(mut self, spec: &'static ActivitySpec) -> Self {
        self.specs.retain(|s| s.id != spec.id);
        self.specs.push(spec);
        self
    }

    pub fn get(&self, id: u16) -> Option<&'static ActivitySpec> {
        self.specs.iter().copied().find(|s| s.id == id)
    }

    pub fn by_name(&self, name: &str) -> Option<&'static ActivitySpec> {
        self.specs
            .iter()
            .copied()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn layout(&self, version: FormatVersion, id: u16) -> Option<&'static RecordLayout> {
        self.get(id).map(|spec| spec.layout(version))
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static ActivitySpec> + '_ {
        self.specs.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for ActivityCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
