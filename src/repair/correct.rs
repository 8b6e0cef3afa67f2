//! Per-channel correction orchestration: gap-fill, then outlier repair.

use std::path::Path;

use anyhow::Result;
use tracing::{debug, info};

use super::interpolate::{absent_runs, fill};
use super::outlier::correct_outliers;
use crate::parser::{build_series, read_channel_dir};
use crate::series::{Channel, ChannelSummary, CorrectionLogEntry, Sample};

/// Known samples that must follow a leading gap before it is considered
/// stable enough to interpolate. Overlay text tends to flicker while it is
/// first fading in, so the first few recovered values are not trusted.
const LEADING_GAP_STABILITY: usize = 5;

/// Repairs one channel's raw series.
///
/// The input is copied, gaps are filled by linear interpolation, frames that
/// stayed absent (trailing gaps, unstable leading gaps) are dropped, and the
/// outlier pass runs over the now gap-free result. The raw series is never
/// mutated; corrections come back as pure values together with an audit log
/// entry for every rewritten frame.
///
/// An empty input produces an empty series and an empty log.
pub fn correct(raw: &[Sample]) -> (Vec<Sample>, Vec<CorrectionLogEntry>) {
    let mut corrected: Vec<Sample> = raw.to_vec();
    let mut log = Vec::new();

    for run in absent_runs(&corrected) {
        if run.start == 0 && !leading_gap_stable(&corrected, run.end) {
            debug!(gap = run.end, "leading gap not yet stable, left absent");
            continue;
        }
        fill(&mut corrected, run);
        for i in run.start..run.end {
            if let Some(new) = corrected[i].value {
                log.push(CorrectionLogEntry {
                    frame: corrected[i].frame.clone(),
                    old: None,
                    new,
                });
            }
        }
    }

    // Whatever is still absent has no closing anchor and cannot be repaired;
    // those frames are dropped rather than exported as empty.
    corrected.retain(|s| s.value.is_some());

    log.extend(correct_outliers(&mut corrected));

    (corrected, log)
}

/// A leading gap closes only once enough consecutive known samples follow
/// it, anchored at zero when it finally does.
fn leading_gap_stable(series: &[Sample], from: usize) -> bool {
    series[from..]
        .iter()
        .take_while(|s| s.value.is_some())
        .count()
        >= LEADING_GAP_STABILITY
}

/// Runs the full pipeline for one channel: read the OCR dump directory,
/// parse readings, repair the series, and summarize what changed.
pub fn correct_channel_dir(
    name: &str,
    dir: &Path,
) -> Result<(Channel, Vec<CorrectionLogEntry>, ChannelSummary)> {
    let pairs = read_channel_dir(dir)?;
    let raw = build_series(&pairs);
    let unparsed = raw.iter().filter(|s| s.value.is_none()).count();

    if unparsed > 0 {
        info!(channel = name, unparsed, "unreadable frames, attempting correction");
    }

    let (corrected, log) = correct(&raw);

    let summary = ChannelSummary {
        timestamp: chrono::Utc::now(),
        channel: name.to_string(),
        frames: raw.len(),
        unparsed,
        gap_filled: log.iter().filter(|e| e.old.is_none()).count(),
        outliers_corrected: log.iter().filter(|e| e.old.is_some()).count(),
        dropped: raw.len() - corrected.len(),
    };

    let mut channel = Channel::new(name, raw);
    channel.corrected = corrected;

    Ok((channel, log, summary))
}
