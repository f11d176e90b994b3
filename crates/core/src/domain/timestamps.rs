// Offset schedules and stream windows
//
// Turns the offset attributes of a file identifier (or the FGAT window
// of a SOCA application) into the ordered list of times to stage.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cycle::Cycle;
use super::error::{DomainError, Result};

/// Upper bound on the number of steps of an offset range
pub const MAX_RANGE_STEPS: i64 = 100_000;

/// Offsets (seconds) relative to the analysis cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetSchedule {
    /// Explicit offsets
    #[serde(default, rename = "offset_seconds")]
    pub offsets: Vec<i64>,

    /// Inclusive range start
    #[serde(default, rename = "offset_start_seconds")]
    pub start: Option<i64>,

    /// Inclusive range stop (reached only on an exact step)
    #[serde(default, rename = "offset_stop_seconds")]
    pub stop: Option<i64>,

    #[serde(default, rename = "offset_interval_seconds")]
    pub interval: Option<i64>,
}

impl OffsetSchedule {
    pub fn range(start: i64, stop: i64, interval: i64) -> Self {
        Self {
            offsets: Vec::new(),
            start: Some(start),
            stop: Some(stop),
            interval: Some(interval),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
            && self.start.is_none()
            && self.stop.is_none()
            && self.interval.is_none()
    }

    /// Expand to a sorted, de-duplicated set of offsets
    pub fn expand(&self) -> Result<BTreeSet<i64>> {
        let mut offsets: BTreeSet<i64> = self.offsets.iter().copied().collect();

        match (self.start, self.stop, self.interval) {
            (None, None, None) => {}
            (Some(start), Some(stop), Some(interval)) => {
                if interval <= 0 {
                    return Err(DomainError::InvalidSchedule(format!(
                        "offset interval must be positive, got {interval}"
                    )));
                }
                if start > stop {
                    return Err(DomainError::InvalidSchedule(format!(
                        "offset start {start} is after offset stop {stop}"
                    )));
                }

                let steps = (i128::from(stop) - i128::from(start)) / i128::from(interval);
                if steps > i128::from(MAX_RANGE_STEPS) {
                    return Err(DomainError::InvalidSchedule(format!(
                        "offset range {start}..={stop} by {interval} \
                         exceeds {MAX_RANGE_STEPS} steps"
                    )));
                }

                let mut offset = start;
                loop {
                    offsets.insert(offset);
                    match offset.checked_add(interval) {
                        Some(next) if next <= stop => offset = next,
                        _ => break,
                    }
                }
            }
            _ => {
                return Err(DomainError::InvalidSchedule(
                    "offset_start_seconds, offset_stop_seconds and offset_interval_seconds \
                     must be given together"
                        .to_string(),
                ))
            }
        }

        Ok(offsets)
    }
}

/// Valid period of a data stream (inclusive, open when `None`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamWindow {
    #[serde(default, rename = "valid_start")]
    pub start: Option<Cycle>,

    #[serde(default, rename = "valid_stop")]
    pub stop: Option<Cycle>,
}

impl StreamWindow {
    pub fn contains(&self, at: &Cycle) -> bool {
        self.start.map_or(true, |start| *at >= start) && self.stop.map_or(true, |stop| *at <= stop)
    }
}

/// Build the ordered list of times for `cycle` under `schedule`, keeping
/// only those inside `window`.
///
/// An empty schedule yields the cycle itself. The result may be empty
/// when the window excludes every candidate.
pub fn build_timestamps(
    cycle: &Cycle,
    schedule: &OffsetSchedule,
    window: &StreamWindow,
) -> Result<Vec<Cycle>> {
    let offsets = if schedule.is_empty() {
        BTreeSet::from([0])
    } else {
        schedule.expand()?
    };

    let mut timestamps = Vec::with_capacity(offsets.len());
    for offset in offsets {
        let at = cycle.offset(offset)?;
        if !window.contains(&at) {
            debug!(timestamp = %at, "Timestamp outside the valid stream window; dropped");
            continue;
        }
        timestamps.push(at);
    }

    Ok(timestamps)
}
