//! Linear interpolation over runs of absent or flagged samples.

use crate::series::Sample;

/// A maximal index range `[start, end)` scheduled for interpolation, with a
/// known value at `end` serving as the closing anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub start: usize,
    pub end: usize,
}

/// Computes the maximal runs of absent readings that have a closing known
/// value. A trailing run of absent readings has no anchor to interpolate
/// toward and is not reported; those frames stay absent.
pub fn absent_runs(series: &[Sample]) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;

    for (i, sample) in series.iter().enumerate() {
        match (sample.value, start) {
            (None, None) => start = Some(i),
            (Some(_), Some(s)) => {
                runs.push(Run { start: s, end: i });
                start = None;
            }
            _ => {}
        }
    }

    runs
}

/// Converts a sorted list of flagged indices into maximal contiguous runs,
/// again dropping a trailing run that reaches the end of the series.
pub fn flagged_runs(flagged: &[usize], len: usize) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;
    let mut prev = 0usize;

    for &i in flagged {
        match start {
            None => start = Some(i),
            Some(_) if i == prev + 1 => {}
            Some(s) => {
                runs.push(Run { start: s, end: prev + 1 });
                start = Some(i);
            }
        }
        prev = i;
    }

    if let Some(s) = start {
        if prev + 1 < len {
            runs.push(Run { start: s, end: prev + 1 });
        }
    }

    runs
}

/// Fills `[run.start, run.end)` by linear interpolation between the known
/// value just before the run (or `0` when the run starts the series) and the
/// known value at `run.end`.
///
/// The step is real-valued; each filled value truncates toward zero, so
/// interpolated points track the straight line without ever overshooting the
/// closing anchor. Only the run itself is mutated.
pub fn fill(series: &mut [Sample], run: Run) {
    let before = if run.start > 0 {
        series[run.start - 1].value.unwrap_or(0)
    } else {
        0
    };
    let after = match series[run.end].value {
        Some(v) => v,
        None => return,
    };

    let gap = run.end - run.start;
    let step = (after - before) as f64 / (gap + 1) as f64;

    for i in 0..gap {
        series[run.start + i].value = Some(before + (step * (i + 1) as f64) as i64);
    }
}
