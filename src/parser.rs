//! Ingest of per-channel OCR text dumps.
//!
//! The OCR stage leaves one `.txt` file per cropped frame in a directory per
//! channel; the file stem is the frame id and the content is whatever the
//! recognizer produced for that crop. Anything that does not parse as an
//! integer after whitespace stripping counts as an absent reading.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::series::{FrameId, Sample};

/// Parses raw OCR text into a reading.
///
/// Strips all whitespace first (the recognizer pads digits with stray spaces
/// and newlines), then attempts a signed integer parse. Failure is not an
/// error; it simply means the frame has no usable value.
pub fn parse_reading(text: &str) -> Option<i64> {
    let stripped: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    stripped.parse::<i64>().ok()
}

/// Reads one channel's OCR dump directory into `(frame, text)` pairs.
///
/// Files are ordered by name; the zero-padded frame numbering makes that the
/// temporal order. A missing directory yields an empty channel rather than an
/// error, matching how an overlay that never appears on screen behaves.
pub fn read_channel_dir(path: &Path) -> Result<Vec<(FrameId, String)>> {
    if !path.is_dir() {
        warn!(path = %path.display(), "channel directory missing, treating as empty");
        return Ok(Vec::new());
    }

    let mut pairs = Vec::new();
    for entry in fs::read_dir(path).with_context(|| format!("reading {}", path.display()))? {
        let entry = entry?;
        let file_path = entry.path();
        if file_path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }
        let stem = match file_path.file_stem().and_then(|s| s.to_str()) {
            Some(s) => s.to_string(),
            None => continue,
        };
        let text = fs::read_to_string(&file_path)
            .with_context(|| format!("reading {}", file_path.display()))?;
        pairs.push((FrameId::new(stem), text));
    }

    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    debug!(path = %path.display(), frames = pairs.len(), "channel dump read");
    Ok(pairs)
}

/// Converts `(frame, text)` pairs into a raw series, one sample per frame.
pub fn build_series(pairs: &[(FrameId, String)]) -> Vec<Sample> {
    pairs
        .iter()
        .map(|(frame, text)| Sample::new(frame.clone(), parse_reading(text)))
        .collect()
}
