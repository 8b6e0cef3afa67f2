//! Outlier detection over a gap-free series.
//!
//! A reading is an outlier when the delta it implies against the last
//! accepted reading disagrees with the recent average delta by more than a
//! distance-scaled margin. Detection is a read-only pass; flagged runs are
//! interpolated afterwards in a separate phase so the detector never reads
//! values it has itself rewritten.

use std::collections::VecDeque;

use tracing::debug;

use super::interpolate::{fill, flagged_runs};
use crate::series::{CorrectionLogEntry, Sample};

/// Accepted deltas kept as the velocity baseline: one second of frames at
/// the nominal 30 fps capture rate.
const DELTA_WINDOW: usize = 30;

/// Multiplier on the distance-scaled tolerance before a delta counts as
/// anomalous.
const ERROR_MARGIN_MULTIPLIER: f64 = 1.0;

/// Detection pass: returns the sorted indices whose deltas are inconsistent
/// with the moving average. `values` must be gap-free.
///
/// Index 0 only seeds the delta window and is never evaluated, so an outlier
/// in the very first reading cannot be detected. Fewer than two values means
/// there is no history to judge against and nothing is flagged.
pub fn detect(values: &[i64]) -> Vec<usize> {
    if values.len() < 2 {
        return Vec::new();
    }

    let mut window: VecDeque<i64> = VecDeque::with_capacity(DELTA_WINDOW + 1);
    let mut flagged: Vec<usize> = Vec::new();

    for i in 0..values.len() {
        if window.is_empty() {
            window.push_back(values[i + 1] - values[i]);
            continue;
        }

        let moving_average = window.iter().sum::<i64>() as f64 / window.len() as f64;

        // Nearest earlier index that was not itself flagged; deltas are
        // always measured against accepted data.
        let mut last_valid = i as isize - 1;
        while last_valid >= 0 && flagged.contains(&(last_valid as usize)) {
            last_valid -= 1;
        }
        if last_valid < 0 {
            continue;
        }
        let last_valid = last_valid as usize;

        let delta = values[i] - values[last_valid];
        let distance = (i - last_valid) as f64;
        let margin = (moving_average * distance).abs().max(1.0) * ERROR_MARGIN_MULTIPLIER;

        if (moving_average.abs() - (delta as f64).abs()).abs() > margin {
            flagged.push(i);
        } else {
            window.push_back(delta);
        }

        if window.len() > DELTA_WINDOW {
            window.pop_front();
        }
    }

    flagged
}

/// Flags outliers in an already gap-filled series and repairs them by
/// interpolating each flagged run between its surrounding accepted values.
///
/// A flagged run at the very end of the series has no accepted closing
/// anchor; those readings are left as they are rather than re-introducing
/// absence. Returns one log entry per corrected index.
pub fn correct_outliers(series: &mut [Sample]) -> Vec<CorrectionLogEntry> {
    if series.len() < 2 {
        return Vec::new();
    }

    let values: Vec<i64> = series.iter().filter_map(|s| s.value).collect();
    debug_assert_eq!(values.len(), series.len(), "outlier pass requires a gap-free series");

    let flagged = detect(&values);
    if flagged.is_empty() {
        return Vec::new();
    }
    debug!(outliers = flagged.len(), "outliers flagged");

    let mut log = Vec::new();
    for run in flagged_runs(&flagged, series.len()) {
        fill(series, run);
        for i in run.start..run.end {
            if let Some(new) = series[i].value {
                log.push(CorrectionLogEntry {
                    frame: series[i].frame.clone(),
                    old: Some(values[i]),
                    new,
                });
            }
        }
    }

    log
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::FrameId;

    fn series(values: &[i64]) -> Vec<Sample> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Sample::new(FrameId::new(format!("frame_{:04}", i + 1)), Some(*v)))
            .collect()
    }

    #[test]
    fn test_detect_nothing_on_steady_climb() {
        let values: Vec<i64> = (0..60).map(|i| 100 + i * 3).collect();
        assert!(detect(&values).is_empty());
    }

    #[test]
    fn test_detect_single_spike() {
        assert_eq!(detect(&[100, 101, 102, 999, 104, 105]), vec![3]);
    }

    #[test]
    fn test_detect_skips_short_series() {
        assert!(detect(&[42]).is_empty());
        assert!(detect(&[]).is_empty());
    }

    #[test]
    fn test_detect_tolerance_scales_with_distance() {
        // After 999 is flagged, index 4 is measured against index 2 at
        // distance 2: delta 2 vs average 1 stays inside the widened margin.
        let flagged = detect(&[100, 101, 102, 999, 104, 105]);
        assert!(!flagged.contains(&4));
    }

    #[test]
    fn test_detect_consecutive_spikes_flagged_as_run() {
        assert_eq!(detect(&[100, 101, 102, 999, 998, 105, 106]), vec![3, 4]);
    }

    #[test]
    fn test_correct_outliers_interpolates_spike() {
        let mut s = series(&[100, 101, 102, 999, 104, 105]);
        let log = correct_outliers(&mut s);

        assert_eq!(s[3].value, Some(103));
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].old, Some(999));
        assert_eq!(log[0].new, 103);
        assert_eq!(log[0].frame, FrameId::new("frame_0004"));
    }

    #[test]
    fn test_correct_outliers_is_idempotent() {
        let mut s = series(&[100, 101, 102, 999, 104, 105]);
        correct_outliers(&mut s);

        let repaired: Vec<i64> = s.iter().filter_map(|x| x.value).collect();
        assert!(detect(&repaired).is_empty());
        assert!(correct_outliers(&mut s).is_empty());
    }

    #[test]
    fn test_trailing_spike_left_in_place() {
        let mut s = series(&[100, 101, 102, 103, 999]);
        let log = correct_outliers(&mut s);

        assert_eq!(s[4].value, Some(999));
        assert!(log.is_empty());
    }

    #[test]
    fn test_insufficient_history_is_skipped() {
        let mut s = series(&[42]);
        assert!(correct_outliers(&mut s).is_empty());
        assert_eq!(s[0].value, Some(42));
    }
}
