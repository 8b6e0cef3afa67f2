//! Data model for per-frame telemetry readings.
//!
//! A channel is one overlay quantity (e.g. booster altitude) sampled once per
//! extracted video frame. Frames are identified by the zero-padded stem of the
//! frame file name, so lexicographic order is temporal order.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordering key for a sampled video frame.
///
/// Opaque to the repair algorithms; derived from the frame file name by the
/// ingest stage. Callers guarantee zero-padded, fixed-width numbering so that
/// string order coincides with temporal order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FrameId(pub String);

impl FrameId {
    pub fn new(id: impl Into<String>) -> Self {
        FrameId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A channel's value at one frame; `None` means OCR produced nothing usable.
pub type Reading = Option<i64>;

/// One `(frame, reading)` pair of a channel's time series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub frame: FrameId,
    pub value: Reading,
}

impl Sample {
    pub fn new(frame: FrameId, value: Reading) -> Self {
        Sample { frame, value }
    }
}

/// One correction applied during repair, kept for the audit log.
///
/// `old` is the flagged value for outlier corrections and `None` for filled
/// gaps (there was nothing numeric to replace).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionLogEntry {
    pub frame: FrameId,
    pub old: Reading,
    pub new: i64,
}

impl fmt::Display for CorrectionLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.old {
            Some(old) => write!(f, "Corrected {} from \"{}\" to {}", self.frame, old, self.new),
            None => write!(f, "Corrected {} from \"\" to {}", self.frame, self.new),
        }
    }
}

/// One telemetry channel: its name, the series as parsed from OCR output,
/// and the repaired series.
///
/// `raw` is immutable once ingested. `corrected` starts as a copy of `raw`
/// and is rewritten by the repair pipeline; frames the pipeline could not
/// repair are dropped from it, so it may end up shorter than `raw`.
#[derive(Debug, Clone)]
pub struct Channel {
    pub name: String,
    pub raw: Vec<Sample>,
    pub corrected: Vec<Sample>,
}

impl Channel {
    pub fn new(name: impl Into<String>, raw: Vec<Sample>) -> Self {
        Channel {
            name: name.into(),
            corrected: Vec::new(),
            raw,
        }
    }
}

/// Per-channel counts reported after repair.
#[derive(Debug, Default, Serialize)]
pub struct ChannelSummary {
    pub timestamp: DateTime<Utc>,
    pub channel: String,
    pub frames: usize,
    pub unparsed: usize,
    pub gap_filled: usize,
    pub outliers_corrected: usize,
    pub dropped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_id_orders_lexicographically() {
        let a = FrameId::new("frame_0009");
        let b = FrameId::new("frame_0010");
        assert!(a < b);
    }

    #[test]
    fn test_log_entry_display_for_gap_fill() {
        let entry = CorrectionLogEntry {
            frame: FrameId::new("frame_0003"),
            old: None,
            new: 20,
        };
        assert_eq!(entry.to_string(), "Corrected frame_0003 from \"\" to 20");
    }

    #[test]
    fn test_log_entry_display_for_outlier() {
        let entry = CorrectionLogEntry {
            frame: FrameId::new("frame_0003"),
            old: Some(999),
            new: 103,
        };
        assert_eq!(entry.to_string(), "Corrected frame_0003 from \"999\" to 103");
    }
}
