//! Per-run CSV report of binned sensor hits.
//!
//! One file per run, `sipm_hits_run<RUNID>.csv`, holding one row per hit in
//! sensor-then-time order. A run without hits produces no file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use fibertrace_types::RunId;
use tracing::info;

use crate::binning::ReportRow;

/// Header line of every report.
pub const REPORT_HEADER: &str =
    "SipmName,Time(ns),X(mm),Y(mm),Z(mm),Energy(eV),Wavelength(nm),TimeBin(ns),PhotonsInBin";

/// Errors that can occur while writing a report file.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// The output directory or file could not be created.
    #[error("failed to create report {path}: {source}")]
    Create {
        /// Path that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// Writing or flushing the report failed.
    #[error("failed to write report {path}: {source}")]
    Write {
        /// Path being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
}

/// File name of the report for `run_id`.
pub fn report_file_name(run_id: RunId) -> String {
    format!("sipm_hits_run{run_id}.csv")
}

/// Write the header and one line per row.
pub fn write_rows<W: Write>(out: &mut W, rows: &[ReportRow]) -> io::Result<()> {
    writeln!(out, "{REPORT_HEADER}")?;
    for row in rows {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{}-{},{}",
            row.sensor_name,
            row.time,
            row.position.x,
            row.position.y,
            row.position.z,
            row.energy,
            row.wavelength,
            row.bin_start,
            row.bin_end,
            row.photons_in_bin,
        )?;
    }
    Ok(())
}

/// Write the report for `run_id` into `dir`.
///
/// Returns the written path, or `None` when `rows` is empty (no file is
/// created in that case).
///
/// # Errors
///
/// Returns [`ReportError::Create`] if the directory or file cannot be
/// created, or [`ReportError::Write`] if writing fails.
pub fn write_report(
    dir: &Path,
    run_id: RunId,
    rows: &[ReportRow],
) -> Result<Option<PathBuf>, ReportError> {
    if rows.is_empty() {
        info!(%run_id, "no sensor hits recorded in this run");
        return Ok(None);
    }

    let path = dir.join(report_file_name(run_id));
    std::fs::create_dir_all(dir).map_err(|source| ReportError::Create {
        path: dir.to_path_buf(),
        source,
    })?;
    let file = File::create(&path).map_err(|source| ReportError::Create {
        path: path.clone(),
        source,
    })?;

    let mut out = BufWriter::new(file);
    write_rows(&mut out, rows)
        .and_then(|()| out.flush())
        .map_err(|source| ReportError::Write {
            path: path.clone(),
            source,
        })?;

    info!(%run_id, rows = rows.len(), path = %path.display(), "sensor hit report written");
    Ok(Some(path))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use fibertrace_types::{Hit, SensorId, Vec3};

    use super::*;
    use crate::binning::{DEFAULT_BIN_WIDTH_NS, bin_hits};

    /// Build a hit on `sensor` at `time`.
    fn hit(sensor: &str, time: f64) -> Hit {
        Hit {
            sensor_id: SensorId::new(1),
            sensor_name: sensor.to_owned(),
            time,
            position: Vec3::new(1.5, -2.0, 0.0),
            energy: 2.5,
            wavelength: 495.936_772,
        }
    }

    /// Fresh scratch directory unique to this test.
    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "fibertrace-report-{name}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn file_name_embeds_run_id() {
        assert_eq!(report_file_name(RunId::new(0)), "sipm_hits_run0.csv");
        assert_eq!(report_file_name(RunId::new(12)), "sipm_hits_run12.csv");
    }

    #[test]
    fn rows_render_with_bin_range() {
        let rows = bin_hits(&[hit("S1", 120.0), hit("S1", 50.0)], DEFAULT_BIN_WIDTH_NS);
        let mut out = Vec::new();
        write_rows(&mut out, &rows).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], REPORT_HEADER);
        assert_eq!(lines[1], "S1,50,1.5,-2,0,2.5,495.936772,0-100,1");
        assert_eq!(lines[2], "S1,120,1.5,-2,0,2.5,495.936772,100-200,1");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn negative_bins_render() {
        let rows = bin_hits(&[hit("S1", -5.0)], DEFAULT_BIN_WIDTH_NS);
        let mut out = Vec::new();
        write_rows(&mut out, &rows).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.lines().nth(1).unwrap().ends_with(",-100-0,1"));
    }

    #[test]
    fn empty_rows_write_no_file() {
        let dir = scratch("empty");
        let written = write_report(&dir, RunId::new(0), &[]).unwrap();
        assert!(written.is_none());
        assert!(!dir.join(report_file_name(RunId::new(0))).exists());
    }

    #[test]
    fn report_is_written_into_created_directory() {
        let dir = scratch("write").join("nested");
        let rows = bin_hits(&[hit("S2", 10.0)], DEFAULT_BIN_WIDTH_NS);
        let path = write_report(&dir, RunId::new(4), &rows).unwrap().unwrap();
        assert_eq!(path, dir.join("sipm_hits_run4.csv"));
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        let _ = std::fs::remove_dir_all(dir.parent().unwrap());
    }

    #[test]
    fn unwritable_directory_is_a_create_error() {
        let dir = scratch("blocked");
        std::fs::create_dir_all(&dir).unwrap();
        let blocker = dir.join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let rows = bin_hits(&[hit("S1", 1.0)], DEFAULT_BIN_WIDTH_NS);
        let err = write_report(&blocker, RunId::new(0), &rows).unwrap_err();
        assert!(matches!(err, ReportError::Create { .. }));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
