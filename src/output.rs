//! Wide-table persistence and the correction audit log.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use csv::{Reader, Writer};
use tracing::{debug, info};

use crate::aggregate::Table;
use crate::series::{Channel, FrameId, Sample};

/// Writes the aggregated wide table as CSV: one row per frame id, a `_Raw`
/// and `_Corrected` column per channel, empty cells for absent readings.
pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    let mut writer =
        Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;

    writer.write_record(table.header())?;
    for row in table.rows() {
        writer.write_record(&row)?;
    }
    writer.flush()?;

    info!(path = %path.display(), channels = table.channels.len(), "table written");
    Ok(())
}

/// Re-imports a previously written wide table.
///
/// Empty cells are absent readings: the frame is simply omitted from that
/// channel's series, so a write/read round trip reconstructs the per-channel
/// raw and corrected series exactly.
pub fn read_table(path: &Path) -> Result<Table> {
    let mut reader =
        Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;

    let header = reader.headers()?.clone();
    if header.get(0) != Some("FrameId") {
        bail!("{}: not a telemetry table, first column must be FrameId", path.display());
    }

    let mut names = Vec::new();
    for i in (1..header.len()).step_by(2) {
        let raw_col = header.get(i).unwrap_or_default();
        let name = match raw_col.strip_suffix("_Raw") {
            Some(name) => name,
            None => bail!("{}: unexpected column {:?}", path.display(), raw_col),
        };
        let corrected_col = header.get(i + 1).unwrap_or_default();
        if corrected_col != format!("{}_Corrected", name) {
            bail!("{}: unexpected column {:?}", path.display(), corrected_col);
        }
        names.push(name.to_string());
    }

    let mut channels: Vec<Channel> = names.iter().map(|n| Channel::new(n.clone(), vec![])).collect();

    for record in reader.records() {
        let record = record?;
        let frame = FrameId::new(record.get(0).unwrap_or_default());

        for (j, channel) in channels.iter_mut().enumerate() {
            let raw_cell = record.get(1 + j * 2).unwrap_or_default();
            let corrected_cell = record.get(2 + j * 2).unwrap_or_default();

            if !raw_cell.is_empty() {
                let value = raw_cell
                    .parse::<i64>()
                    .with_context(|| format!("bad raw cell {:?} for {}", raw_cell, frame))?;
                channel.raw.push(Sample::new(frame.clone(), Some(value)));
            }
            if !corrected_cell.is_empty() {
                let value = corrected_cell.parse::<i64>().with_context(|| {
                    format!("bad corrected cell {:?} for {}", corrected_cell, frame)
                })?;
                channel
                    .corrected
                    .push(Sample::new(frame.clone(), Some(value)));
            }
        }
    }

    debug!(path = %path.display(), channels = channels.len(), "table read");
    Ok(Table::from_channels(channels))
}

/// Appends one channel's correction lines to the audit log, grouped under a
/// channel header. Callers serialize access; workers never write here
/// concurrently.
pub fn append_audit_log(path: &Path, channel: &str, lines: &[String]) -> Result<()> {
    if lines.is_empty() {
        return Ok(());
    }

    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;

    writeln!(file, "=== {} ===", channel)?;
    for line in lines {
        writeln!(file, "{}", line)?;
    }
    writeln!(file)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn sample(frame: &str, value: i64) -> Sample {
        Sample::new(FrameId::new(frame), Some(value))
    }

    fn test_table() -> Table {
        let mut altitude = Channel::new(
            "Altitude",
            vec![
                sample("frame_0001", 10),
                Sample::new(FrameId::new("frame_0002"), None),
                sample("frame_0003", 30),
            ],
        );
        altitude.corrected = vec![
            sample("frame_0001", 10),
            sample("frame_0002", 20),
            sample("frame_0003", 30),
        ];

        let mut velocity = Channel::new(
            "Velocity",
            vec![sample("frame_0002", 200), sample("frame_0003", 300)],
        );
        velocity.corrected = vec![sample("frame_0002", 200), sample("frame_0003", 300)];

        Table::from_channels(vec![altitude, velocity])
    }

    #[test]
    fn test_write_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.csv");

        let table = test_table();
        write_table(&path, &table).unwrap();
        let reread = read_table(&path).unwrap();

        assert_eq!(reread.channels.len(), 2);
        let altitude = &reread.channels["Altitude"];
        // the absent raw frame_0002 is omitted on re-import
        assert_eq!(altitude.raw.len(), 2);
        assert_eq!(altitude.corrected.len(), 3);
        assert_eq!(altitude.corrected[1], sample("frame_0002", 20));

        let velocity = &reread.channels["Velocity"];
        assert_eq!(velocity.raw, table.channels["Velocity"].raw);
        assert_eq!(velocity.corrected, table.channels["Velocity"].corrected);
    }

    #[test]
    fn test_written_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.csv");

        write_table(&path, &test_table()).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(
            lines[0],
            "FrameId,Altitude_Raw,Altitude_Corrected,Velocity_Raw,Velocity_Corrected"
        );
        assert_eq!(lines[1], "frame_0001,10,10,,");
        assert_eq!(lines[2], "frame_0002,,20,200,200");
        assert_eq!(lines[3], "frame_0003,30,30,300,300");
    }

    #[test]
    fn test_read_rejects_foreign_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.csv");
        fs::write(&path, "a,b,c\n1,2,3\n").unwrap();

        assert!(read_table(&path).is_err());
    }

    #[test]
    fn test_audit_log_groups_under_channel_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrections.log");

        append_audit_log(
            &path,
            "Altitude",
            &["Corrected frame_0002 from \"\" to 20".to_string()],
        )
        .unwrap();
        append_audit_log(
            &path,
            "Velocity",
            &["Corrected frame_0005 from \"999\" to 103".to_string()],
        )
        .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("=== Altitude ===\n"));
        assert!(content.contains("=== Velocity ===\n"));
        assert!(content.contains("Corrected frame_0002 from \"\" to 20\n"));
    }

    #[test]
    fn test_audit_log_skips_channels_without_corrections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrections.log");

        append_audit_log(&path, "Altitude", &[]).unwrap();
        assert!(!path.exists());
    }
}
