// Sequential record scanner over the mapped record stream

use std::borrow::Cow;

use super::bytes::{decode_text, ByteCursor, Endian};
use super::descriptors::ActivityDescriptor;
use super::error::{FormatError, Result};
use super::types::{
    FormatVersion, RecordTime, VersionLayout, MAX_COMMENT_LEN, R_COMMENT, R_RESTART, R_STATS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartKind {
    Normal,
    /// The collector came back with a different sampling interval
    IntervalChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartMarker {
    pub time: RecordTime,
    pub kind: RestartKind,
    pub interval: u64,
    pub cpu_count: u32,
}

/// One decoded unit of the record stream. Borrows from the mapped file.
#[derive(Debug, Clone)]
pub enum RecordEvent<'a> {
    Timestamp(RecordTime),
    Statistics {
        descriptor: &'a ActivityDescriptor,
        payload: &'a [u8],
    },
    Comment {
        time: RecordTime,
        text: Cow<'a, str>,
    },
    Restart(RestartMarker),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Next bytes are a record header (or the end of the stream)
    RecordHeader,
    /// Inside a statistics record, next payload belongs to descriptor `index`
    Payload { index: usize },
    Done,
}

/// Streams records in on-disk order: a timestamp, then one payload per
/// descriptor in descriptor order; comments and restarts only between
/// statistics records.
///
/// A structural error is yielded once as the terminal item; the iterator is
/// fused afterwards.
pub struct RecordScanner<'a> {
    cursor: ByteCursor<'a>,
    version: FormatVersion,
    layout: &'static VersionLayout,
    descriptors: &'a [ActivityDescriptor],
    interval: u64,
    state: ScanState,
}

impl<'a> RecordScanner<'a> {
    pub fn new(
        data: &'a [u8],
        records_offset: usize,
        version: FormatVersion,
        endian: Endian,
        descriptors: &'a [ActivityDescriptor],
        interval: u64,
    ) -> Self {
        Self {
            cursor: ByteCursor::at(data, records_offset, endian),
            version,
            layout: version.layout(),
            descriptors,
            interval,
            state: ScanState::RecordHeader,
        }
    }

    fn fail(&mut self, err: FormatError) -> Option<Result<RecordEvent<'a>>> {
        self.state = ScanState::Done;
        Some(Err(err))
    }

    fn read_record(&mut self) -> Result<Option<RecordEvent<'a>>> {
        if self.cursor.is_at_end() {
            return Ok(None);
        }

        let offset = self.cursor.position();
        let header = self.cursor.take(self.layout.record_header_size)?;
        let mut fields = ByteCursor::new(header, self.endian());
        let record_type = fields.u8()?;
        fields.skip(3)?;
        let time = match self.version {
            FormatVersion::V1 => RecordTime {
                time: fields.u32()? as u64,
                uptime_cs: fields.u32()? as u64,
            },
            FormatVersion::V2 | FormatVersion::Unknown(_) => {
                fields.skip(4)?;
                RecordTime {
                    time: fields.u64()?,
                    uptime_cs: fields.u64()?,
                }
            }
        };

        match record_type {
            R_STATS => {
                self.state = ScanState::Payload { index: 0 };
                Ok(Some(RecordEvent::Timestamp(time)))
            }
            R_RESTART => {
                let body = self.cursor.take(self.layout.restart_size)?;
                let mut fields = ByteCursor::new(body, self.endian());
                let (interval, cpu_count) = match self.version {
                    FormatVersion::V1 => (fields.u16()? as u64, fields.u16()? as u32),
                    FormatVersion::V2 | FormatVersion::Unknown(_) => {
                        (fields.u32()? as u64, fields.u32()?)
                    }
                };
                let kind = if interval != self.interval {
                    RestartKind::IntervalChange
                } else {
                    RestartKind::Normal
                };
                self.interval = interval;
                Ok(Some(RecordEvent::Restart(RestartMarker {
                    time,
                    kind,
                    interval,
                    cpu_count,
                })))
            }
            R_COMMENT => {
                let raw = self.cursor.take(MAX_COMMENT_LEN)?;
                Ok(Some(RecordEvent::Comment {
                    time,
                    text: decode_text(raw),
                }))
            }
            other => Err(FormatError::BadRecord {
                offset,
                record_type: other,
            }),
        }
    }

    fn endian(&self) -> Endian {
        self.cursor.endian()
    }
}

impl<'a> Iterator for RecordScanner<'a> {
    type Item = Result<RecordEvent<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state {
                ScanState::Done => return None,
                ScanState::Payload { index } => {
                    let descriptors = self.descriptors;
                    let Some(descriptor) = descriptors.get(index) else {
                        self.state = ScanState::RecordHeader;
                        continue;
                    };
                    return match self.cursor.take(descriptor.record_size as usize) {
                        Ok(payload) => {
                            self.state = ScanState::Payload { index: index + 1 };
                            Some(Ok(RecordEvent::Statistics {
                                descriptor,
                                payload,
                            }))
                        }
                        Err(err) => self.fail(err),
                    };
                }
                ScanState::RecordHeader => {
                    return match self.read_record() {
                        Ok(Some(event)) => Some(Ok(event)),
                        Ok(None) => {
                            self.state = ScanState::Done;
                            None
                        }
                        Err(err) => self.fail(err),
                    };
                }
            }
        }
    }
}

impl std::iter::FusedIterator for RecordScanner<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safile::bytes::ByteSink;
    use crate::safile::catalog::{MEMORY, PCSW};

    fn record_header(version: FormatVersion, endian: Endian, record_type: u8, time: u64) -> Vec<u8> {
        let mut sink = ByteSink::new(endian);
        sink.u8(record_type).zeros(3);
        match version {
            FormatVersion::V1 => {
                sink.u32(time as u32).u32(0);
            }
            _ => {
                sink.zeros(4).u64(time).u64(0);
            }
        }
        sink.into_bytes()
    }

    fn two_activities(version: FormatVersion) -> Vec<ActivityDescriptor> {
        vec![
            ActivityDescriptor::for_spec(&PCSW, version, 1),
            ActivityDescriptor::for_spec(&MEMORY, version, 1),
        ]
    }

    fn collect(scanner: RecordScanner<'_>) -> Vec<Result<RecordEvent<'_>>> {
        scanner.collect()
    }

    #[test]
    fn test_scanner__stats_record__then_timestamp_then_payloads_in_order() {
        let version = FormatVersion::V2;
        let descriptors = two_activities(version);
        let mut data = record_header(version, Endian::Little, R_STATS, 100);
        data.extend(vec![1u8; descriptors[0].record_size as usize]);
        data.extend(vec![2u8; descriptors[1].record_size as usize]);

        let scanner = RecordScanner::new(&data, 0, version, Endian::Little, &descriptors, 10);
        let events = collect(scanner);
        assert_eq!(events.len(), 3);
        assert!(matches!(
            events[0],
            Ok(RecordEvent::Timestamp(RecordTime { time: 100, .. }))
        ));
        match &events[1] {
            Ok(RecordEvent::Statistics { descriptor, payload }) => {
                assert_eq!(descriptor.id, PCSW.id);
                assert!(payload.iter().all(|&b| b == 1));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        match &events[2] {
            Ok(RecordEvent::Statistics { descriptor, .. }) => assert_eq!(descriptor.id, MEMORY.id),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_scanner__restart_with_new_interval__then_interval_change() {
        let version = FormatVersion::V1;
        let mut data = record_header(version, Endian::Big, R_RESTART, 50);
        let mut body = ByteSink::new(Endian::Big);
        body.u16(30).u16(8);
        data.extend(body.into_bytes());
        let mut again = record_header(version, Endian::Big, R_RESTART, 60);
        let mut body = ByteSink::new(Endian::Big);
        body.u16(30).u16(8);
        again.extend(body.into_bytes());
        data.extend(again);

        let scanner = RecordScanner::new(&data, 0, version, Endian::Big, &[], 10);
        let markers: Vec<_> = scanner
            .map(|e| match e.unwrap() {
                RecordEvent::Restart(marker) => marker,
                other => panic!("unexpected event: {other:?}"),
            })
            .collect();
        assert_eq!(
            markers,
            vec![
                RestartMarker {
                    time: RecordTime { time: 50, uptime_cs: 0 },
                    kind: RestartKind::IntervalChange,
                    interval: 30,
                    cpu_count: 8,
                },
                RestartMarker {
                    time: RecordTime { time: 60, uptime_cs: 0 },
                    kind: RestartKind::Normal,
                    interval: 30,
                    cpu_count: 8,
                },
            ]
        );
    }

    #[test]
    fn test_scanner__comment__then_text_trimmed() {
        let version = FormatVersion::V2;
        let mut data = record_header(version, Endian::Little, R_COMMENT, 7);
        let mut body = ByteSink::new(Endian::Little);
        body.text("disk replaced", MAX_COMMENT_LEN);
        data.extend(body.into_bytes());

        let scanner = RecordScanner::new(&data, 0, version, Endian::Little, &[], 10);
        let events: Vec<_> = scanner.map(|e| e.unwrap()).collect();
        assert_eq!(events.len(), 1);
        match &events[0] {
            RecordEvent::Comment { time, text } => {
                assert_eq!(time.time, 7);
                assert_eq!(text, "disk replaced");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_scanner__payload_cut_short__then_truncated_and_fused() {
        let version = FormatVersion::V2;
        let descriptors = two_activities(version);
        let mut data = record_header(version, Endian::Little, R_STATS, 100);
        data.extend(vec![0u8; descriptors[0].record_size as usize]);
        data.extend(vec![0u8; descriptors[1].record_size as usize - 3]);

        let mut scanner = RecordScanner::new(&data, 0, version, Endian::Little, &descriptors, 10);
        assert!(matches!(scanner.next(), Some(Ok(RecordEvent::Timestamp(_)))));
        assert!(matches!(scanner.next(), Some(Ok(RecordEvent::Statistics { .. }))));
        match scanner.next() {
            Some(Err(FormatError::Truncated { needed, available, .. })) => {
                assert_eq!(needed, descriptors[1].record_size as usize);
                assert_eq!(available, needed - 3);
            }
            other => panic!("unexpected item: {other:?}"),
        }
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }

    #[test]
    fn test_scanner__unknown_record_type__then_bad_record() {
        let version = FormatVersion::V2;
        let data = record_header(version, Endian::Little, 9, 1);
        let mut scanner = RecordScanner::new(&data, 0, version, Endian::Little, &[], 10);
        assert!(matches!(
            scanner.next(),
            Some(Err(FormatError::BadRecord { offset: 0, record_type: 9 }))
        ));
        assert!(scanner.next().is_none());
    }

    #[test]
    fn test_scanner__empty_stream__then_ends_cleanly() {
        let data = vec![0u8; 16];
        let mut scanner =
            RecordScanner::new(&data, 16, FormatVersion::V2, Endian::Little, &[], 10);
        assert!(scanner.next().is_none());
    }
}
