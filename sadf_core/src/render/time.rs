// Sample time pre-formatting, resolved once per render

use chrono::{DateTime, Local, Utc};
use tracing::warn;

/// A record time in every shape the backends print
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleTime {
    /// Epoch seconds (UTC)
    pub epoch: u64,
    /// `YYYY-MM-DD`, empty when the epoch has no calendar date
    pub date: String,
    /// `HH:MM:SS`, or the raw seconds when there is no calendar date
    pub time: String,
    /// False when `date`/`time` are in the local timezone
    pub utc: bool,
    /// Value of the time column of flat outputs
    pub text: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeFormatter {
    local_time: bool,
    epoch_seconds: bool,
}

impl TimeFormatter {
    pub fn new(local_time: bool, epoch_seconds: bool) -> Self {
        Self {
            local_time,
            epoch_seconds,
        }
    }

    pub fn format(&self, epoch: u64) -> SampleTime {
        let Some(utc) = i64::try_from(epoch)
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        else {
            warn!(epoch, "Record time outside the calendar range, printing raw seconds");
            let raw = epoch.to_string();
            return SampleTime {
                epoch,
                date: String::new(),
                time: raw.clone(),
                utc: !self.local_time,
                text: raw,
            };
        };

        let (date, time, zone) = if self.local_time {
            let local = utc.with_timezone(&Local);
            (
                local.format("%Y-%m-%d").to_string(),
                local.format("%H:%M:%S").to_string(),
                local.format("%Z").to_string(),
            )
        } else {
            (
                utc.format("%Y-%m-%d").to_string(),
                utc.format("%H:%M:%S").to_string(),
                "UTC".to_string(),
            )
        };

        let text = if self.epoch_seconds {
            epoch.to_string()
        } else {
            format!("{date} {time} {zone}")
        };

        SampleTime {
            epoch,
            date,
            time,
            utc: !self.local_time,
            text,
        }
    }
}
