//! End-of-run summary returned by the coordinator.
//!
//! `Display` renders the console summary: per-volume step counts, the
//! trapping efficiency, per-volume creation and interaction process counts,
//! per-sensor hit occupancy and the report location.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use fibertrace_types::{CounterKey, Process, RunId, Tally, Volume};

use crate::binning::TimeBin;
use crate::counters::MasterTotals;
use crate::metrics::FiberYield;

/// Result of one completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// The run that finished.
    pub run_id: RunId,
    /// Merged counters and tallies.
    pub totals: MasterTotals,
    /// Fibre transition counts and trapping efficiency.
    pub fiber: FiberYield,
    /// Hits in the end-of-run snapshot.
    pub hit_count: usize,
    /// Occupied time bins per sensor.
    pub sensor_bins: BTreeMap<String, Vec<TimeBin>>,
    /// Report file, when one was written.
    pub report_path: Option<PathBuf>,
    /// When the coordinator finished the run.
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    /// The most populated bin of a sensor, earliest first on ties.
    pub fn peak_bin(&self, sensor: &str) -> Option<TimeBin> {
        self.sensor_bins
            .get(sensor)?
            .iter()
            .copied()
            .reduce(|best, bin| if bin.count > best.count { bin } else { best })
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "=== Run {} summary ({}) ===",
            self.run_id,
            self.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(f, "Workers merged: {}", self.totals.workers_merged())?;

        writeln!(f)?;
        writeln!(f, "Volume step counts:")?;
        for tally in [
            Tally::TileSteps,
            Tally::CladSteps,
            Tally::CoreSteps,
            Tally::SipmSteps,
            Tally::OtherSteps,
        ] {
            writeln!(f, "  {:<12} {}", tally.name(), self.totals.tally(tally))?;
        }

        writeln!(f)?;
        writeln!(
            f,
            "Fibre photons: entered {}, exited {}, absorbed {}",
            self.fiber.entered, self.fiber.exited, self.fiber.absorbed
        )?;
        writeln!(f, "Trapping efficiency: {:.2}%", self.fiber.as_percent())?;

        for volume in Volume::COUNTED {
            writeln!(f)?;
            writeln!(f, "Volume: {volume}")?;
            writeln!(f, "  Creation processes:")?;
            for process in Process::CREATION_DEFAULTS {
                let value = self.totals.value(CounterKey::creation(volume, process));
                writeln!(f, "{:>17}: {value}", process.as_str())?;
            }
            writeln!(f, "  Interaction processes:")?;
            for process in Process::INTERACTION_DEFAULTS {
                let value = self.totals.value(CounterKey::interaction(volume, process));
                writeln!(f, "{:>17}: {value}", process.as_str())?;
            }
        }

        writeln!(f)?;
        writeln!(f, "Sensor hits: {}", self.hit_count)?;
        for (sensor, bins) in &self.sensor_bins {
            let hits: u64 = bins.iter().map(|b| u64::from(b.count)).sum();
            match self.peak_bin(sensor) {
                Some(peak) => writeln!(
                    f,
                    "  {sensor}: {hits} hits, peak {}-{} ns ({})",
                    peak.start, peak.end, peak.count
                )?,
                None => writeln!(f, "  {sensor}: {hits} hits")?,
            }
        }
        let report = self
            .report_path
            .as_ref()
            .map_or_else(|| "none".to_owned(), |path| path.display().to_string());
        writeln!(f, "Report: {report}")
    }
}
