//! Grouping and fixed-width time binning of recorded hits.
//!
//! Hits are partitioned by sensor name (lexicographic group order), sorted
//! by arrival time inside each group, and counted per bin of width
//! `bin_width`. Bins are left-closed: `index = floor(time / width)`.
//!
//! Output depends only on the multiset of hits, never on their append order.

use std::collections::BTreeMap;

use fibertrace_types::{Hit, Vec3};
use serde::Serialize;

/// Default bin width in nanoseconds.
pub const DEFAULT_BIN_WIDTH_NS: f64 = 100.0;

/// One fixed-width time bin of a single sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeBin {
    /// `floor(time / width)`.
    pub index: i64,
    /// Inclusive lower edge (ns).
    pub start: f64,
    /// Exclusive upper edge (ns).
    pub end: f64,
    /// Hits of the sensor falling into this bin.
    pub count: u32,
}

impl TimeBin {
    /// Build the bin with the given index and width.
    #[allow(clippy::cast_precision_loss)]
    const fn new(index: i64, width: f64, count: u32) -> Self {
        let start = index as f64 * width;
        Self {
            index,
            start,
            end: start + width,
            count,
        }
    }
}

/// One line of the per-run report: a hit annotated with its bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    /// Sensor the hit was recorded on.
    pub sensor_name: String,
    /// Arrival time (ns).
    pub time: f64,
    /// Hit position (mm).
    pub position: Vec3,
    /// Photon energy (eV).
    pub energy: f64,
    /// Photon wavelength (nm).
    pub wavelength: f64,
    /// Lower edge of the hit's bin (ns).
    pub bin_start: f64,
    /// Upper edge of the hit's bin (ns).
    pub bin_end: f64,
    /// Hits of the same sensor in the same bin.
    pub photons_in_bin: u32,
}

/// Bin index of `time` for the given width.
///
/// Non-finite times land in bin 0; out-of-range quotients saturate.
#[allow(clippy::cast_possible_truncation)]
pub fn bin_index(time: f64, width: f64) -> i64 {
    let quotient = (time / width).floor();
    if quotient.is_finite() {
        quotient as i64
    } else {
        0
    }
}

/// Partition hits by sensor name and sort each group by time.
fn group_by_sensor(hits: &[Hit]) -> BTreeMap<&str, Vec<&Hit>> {
    let mut groups: BTreeMap<&str, Vec<&Hit>> = BTreeMap::new();
    for hit in hits {
        groups.entry(hit.sensor_name.as_str()).or_default().push(hit);
    }
    for group in groups.values_mut() {
        group.sort_by(|a, b| a.time.total_cmp(&b.time));
    }
    groups
}

/// Count hits per bin index for one sorted group.
fn count_bins(group: &[&Hit], width: f64) -> BTreeMap<i64, u32> {
    let mut counts: BTreeMap<i64, u32> = BTreeMap::new();
    for hit in group {
        let count = counts.entry(bin_index(hit.time, width)).or_insert(0);
        *count = count.saturating_add(1);
    }
    counts
}

/// Occupied bins per sensor, bins ascending.
pub fn sensor_bins(hits: &[Hit], width: f64) -> BTreeMap<String, Vec<TimeBin>> {
    group_by_sensor(hits)
        .into_iter()
        .map(|(sensor, group)| {
            let bins = count_bins(&group, width)
                .into_iter()
                .map(|(index, count)| TimeBin::new(index, width, count))
                .collect();
            (sensor.to_owned(), bins)
        })
        .collect()
}

/// Annotate every hit with its bin, grouped by sensor then time-ascending.
///
/// Produces exactly one row per input hit.
pub fn bin_hits(hits: &[Hit], width: f64) -> Vec<ReportRow> {
    let mut rows = Vec::with_capacity(hits.len());
    for group in group_by_sensor(hits).values() {
        let counts = count_bins(group, width);
        for hit in group {
            let index = bin_index(hit.time, width);
            let bin = TimeBin::new(index, width, counts.get(&index).copied().unwrap_or(0));
            rows.push(ReportRow {
                sensor_name: hit.sensor_name.clone(),
                time: hit.time,
                position: hit.position,
                energy: hit.energy,
                wavelength: hit.wavelength,
                bin_start: bin.start,
                bin_end: bin.end,
                photons_in_bin: bin.count,
            });
        }
    }
    rows
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use fibertrace_types::SensorId;

    use super::*;

    /// Build a hit on `sensor` at `time` with otherwise fixed values.
    fn hit(sensor: &str, time: f64) -> Hit {
        Hit {
            sensor_id: SensorId::new(0),
            sensor_name: sensor.to_owned(),
            time,
            position: Vec3::new(1.0, 2.0, 3.0),
            energy: 2.4,
            wavelength: 516.6,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    // ---- bin_index ----

    #[test]
    fn bins_are_left_closed() {
        assert_eq!(bin_index(100.0, DEFAULT_BIN_WIDTH_NS), 1);
        assert_eq!(bin_index(199.999, DEFAULT_BIN_WIDTH_NS), 1);
        assert_eq!(bin_index(200.0, DEFAULT_BIN_WIDTH_NS), 2);
        assert_eq!(bin_index(0.0, DEFAULT_BIN_WIDTH_NS), 0);
    }

    #[test]
    fn negative_times_floor_downwards() {
        assert_eq!(bin_index(-0.5, DEFAULT_BIN_WIDTH_NS), -1);
        assert_eq!(bin_index(-100.0, DEFAULT_BIN_WIDTH_NS), -1);
        assert_eq!(bin_index(-100.5, DEFAULT_BIN_WIDTH_NS), -2);
    }

    #[test]
    fn non_finite_time_lands_in_bin_zero() {
        assert_eq!(bin_index(f64::NAN, DEFAULT_BIN_WIDTH_NS), 0);
        assert_eq!(bin_index(f64::INFINITY, DEFAULT_BIN_WIDTH_NS), 0);
    }

    // ---- bin_hits ----

    #[test]
    fn empty_input_yields_no_rows() {
        assert!(bin_hits(&[], DEFAULT_BIN_WIDTH_NS).is_empty());
        assert!(sensor_bins(&[], DEFAULT_BIN_WIDTH_NS).is_empty());
    }

    #[test]
    fn single_hit_has_count_one() {
        let rows = bin_hits(&[hit("S1", 42.0)], DEFAULT_BIN_WIDTH_NS);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].photons_in_bin, 1);
        assert!(close(rows[0].bin_start, 0.0));
        assert!(close(rows[0].bin_end, 100.0));
    }

    #[test]
    fn two_sensor_example() {
        let hits = vec![
            hit("S1", 125.0),
            hit("S2", 10.0),
            hit("S1", 50.0),
            hit("S1", 120.0),
        ];
        let rows = bin_hits(&hits, DEFAULT_BIN_WIDTH_NS);
        let summary: Vec<(&str, f64, f64, u32)> = rows
            .iter()
            .map(|r| (r.sensor_name.as_str(), r.time, r.bin_start, r.photons_in_bin))
            .collect();

        assert_eq!(summary.len(), 4);
        let expected = [
            ("S1", 50.0, 0.0, 1),
            ("S1", 120.0, 100.0, 2),
            ("S1", 125.0, 100.0, 2),
            ("S2", 10.0, 0.0, 1),
        ];
        for (got, want) in summary.iter().zip(expected) {
            assert_eq!(got.0, want.0);
            assert!(close(got.1, want.1));
            assert!(close(got.2, want.2));
            assert_eq!(got.3, want.3);
        }
    }

    #[test]
    fn custom_width_changes_grouping() {
        let hits = vec![hit("S1", 5.0), hit("S1", 14.0), hit("S1", 25.0)];
        let rows = bin_hits(&hits, 10.0);
        let counts: Vec<u32> = rows.iter().map(|r| r.photons_in_bin).collect();
        assert_eq!(counts, vec![1, 1, 1]);

        let rows = bin_hits(&hits, 20.0);
        let counts: Vec<u32> = rows.iter().map(|r| r.photons_in_bin).collect();
        assert_eq!(counts, vec![2, 2, 1]);
    }

    #[test]
    fn equal_times_keep_append_order() {
        let mut first = hit("S1", 10.0);
        first.energy = 1.0;
        let mut second = hit("S1", 10.0);
        second.energy = 2.0;
        let rows = bin_hits(&[first, second], DEFAULT_BIN_WIDTH_NS);
        assert!(close(rows[0].energy, 1.0));
        assert!(close(rows[1].energy, 2.0));
    }

    // ---- sensor_bins ----

    #[test]
    fn sensor_bins_lists_occupied_bins() {
        let hits = vec![hit("S1", 50.0), hit("S1", 120.0), hit("S1", 125.0), hit("S2", 10.0)];
        let bins = sensor_bins(&hits, DEFAULT_BIN_WIDTH_NS);
        assert_eq!(bins.len(), 2);
        let s1: Vec<(i64, u32)> = bins["S1"].iter().map(|b| (b.index, b.count)).collect();
        assert_eq!(s1, vec![(0, 1), (1, 2)]);
        assert_eq!(bins["S2"][0].count, 1);
    }
}
