//! Multi-channel aggregation into one wide table.
//!
//! Channels are repaired independently; aggregation is a read-only merge
//! performed once all of them are done. The row set is the union of every
//! frame id seen in any channel's raw or corrected series, ascending, and
//! each channel contributes a `_Raw` and a `_Corrected` column.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::series::{Channel, FrameId, Sample};

/// All repaired channels keyed by name, ready for export.
///
/// A `BTreeMap` keeps the channel column order deterministic (sorted by
/// name) between runs.
#[derive(Debug, Default)]
pub struct Table {
    pub channels: BTreeMap<String, Channel>,
}

impl Table {
    pub fn from_channels(channels: Vec<Channel>) -> Self {
        Table {
            channels: channels.into_iter().map(|c| (c.name.clone(), c)).collect(),
        }
    }

    /// Sorted union of frame ids across all channels' raw and corrected
    /// series. This is the export row key set.
    pub fn frame_ids(&self) -> BTreeSet<FrameId> {
        let mut ids = BTreeSet::new();
        for channel in self.channels.values() {
            for sample in channel.raw.iter().chain(channel.corrected.iter()) {
                ids.insert(sample.frame.clone());
            }
        }
        ids
    }

    /// Header row: `FrameId`, then two columns per channel.
    pub fn header(&self) -> Vec<String> {
        let mut header = vec!["FrameId".to_string()];
        for name in self.channels.keys() {
            header.push(format!("{}_Raw", name));
            header.push(format!("{}_Corrected", name));
        }
        header
    }

    /// Data rows ascending by frame id; cells are empty where a channel has
    /// no reading for that frame.
    pub fn rows(&self) -> Vec<Vec<String>> {
        let raw_lookup: Vec<HashMap<&FrameId, i64>> = self
            .channels
            .values()
            .map(|c| value_lookup(&c.raw))
            .collect();
        let corrected_lookup: Vec<HashMap<&FrameId, i64>> = self
            .channels
            .values()
            .map(|c| value_lookup(&c.corrected))
            .collect();

        self.frame_ids()
            .iter()
            .map(|frame| {
                let mut row = vec![frame.to_string()];
                for (raw, corrected) in raw_lookup.iter().zip(corrected_lookup.iter()) {
                    row.push(cell(raw.get(frame)));
                    row.push(cell(corrected.get(frame)));
                }
                row
            })
            .collect()
    }
}

fn value_lookup(series: &[Sample]) -> HashMap<&FrameId, i64> {
    series
        .iter()
        .filter_map(|s| s.value.map(|v| (&s.frame, v)))
        .collect()
}

fn cell(value: Option<&i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
