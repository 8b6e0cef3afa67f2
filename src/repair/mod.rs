//! Time-series repair for OCR-sourced telemetry.
//!
//! Raw readings come out of the recognizer gappy (frames where no number
//! parsed) and occasionally wrong (misread digits). Repair runs in two fixed
//! stages per channel: gap-fill interpolation, then outlier correction, each
//! recording what it changed for the audit log.

pub mod correct;
pub mod interpolate;
pub mod outlier;

pub use correct::{correct, correct_channel_dir};
