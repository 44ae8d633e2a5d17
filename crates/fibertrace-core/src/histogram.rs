//! Histogram collaborator: the catalogue of per-step distributions and the
//! sink trait the controller fills them through.
//!
//! The histogram storage itself lives behind [`HistogramSink`]. Every
//! controller books the full catalogue into its sink once, when it is built;
//! after that the core only decides which histogram receives which value.
//! [`NullSink`] discards everything and [`MemorySink`] bins fills against the
//! booked axes, keeping underflow and overflow apart.

use std::fmt;

use fibertrace_types::{RunId, Vec3};
use tracing::debug;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by a histogram backend when opening or closing its output.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The backend could not open its output for a run.
    #[error("failed to open histogram output for run {run_id}: {reason}")]
    Open {
        /// Run being opened.
        run_id: RunId,
        /// Backend-specific reason.
        reason: String,
    },

    /// The backend could not flush or close its output.
    #[error("failed to close histogram output: {reason}")]
    Close {
        /// Backend-specific reason.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Catalogue
// ---------------------------------------------------------------------------

/// Binning of one histogram axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Axis {
    /// Number of bins.
    pub bins: u32,
    /// Lower edge.
    pub min: f64,
    /// Upper edge.
    pub max: f64,
}

impl Axis {
    const fn new(bins: u32, min: f64, max: f64) -> Self {
        Self { bins, min, max }
    }

    /// Place `value` on the axis. Bins are left-closed; `max` itself and NaN
    /// land in the overflow.
    pub fn locate(self, value: f64) -> AxisSlot {
        if value < self.min {
            return AxisSlot::Underflow;
        }
        if value >= self.max || value.is_nan() || self.bins == 0 {
            return AxisSlot::Overflow;
        }
        let width = (self.max - self.min) / f64::from(self.bins);
        // In range, so the quotient is in `0..bins` up to rounding.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let bin = ((value - self.min) / width).floor() as u32;
        AxisSlot::Bin(bin.min(self.bins.saturating_sub(1)))
    }
}

/// Where a value falls on an [`Axis`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisSlot {
    /// Below the lower edge.
    Underflow,
    /// Inside, with the zero-based bin index.
    Bin(u32),
    /// At or above the upper edge.
    Overflow,
}

/// Wide transverse axis (mm).
const WIDE: Axis = Axis::new(100, -400.0, 300.0);
/// Narrow depth axis (mm).
const DEPTH: Axis = Axis::new(100, -40.0, 40.0);

/// One-dimensional histograms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum H1 {
    /// Energy deposited per step, in mega-electronvolts.
    EnergyDeposit,
    /// Global time of each step (ns).
    Time,
    /// Energy of photons absorbed by WLS (eV).
    PhotonEnergyBeforeWls,
    /// Energy of WLS re-emitted photons (eV).
    PhotonEnergyAfterWls,
    /// Wavelength of photons absorbed by WLS (nm).
    PhotonWavelengthBeforeWls,
    /// Wavelength of WLS re-emitted photons (nm).
    PhotonWavelengthAfterWls,
    /// Photon wavelength in the cladding (nm).
    CladdingWavelength,
    /// Photon energy in the cladding (eV).
    CladdingEnergy,
    /// Photon wavelength in the core (nm).
    CoreWavelength,
    /// Photon energy in the core (eV).
    CoreEnergy,
    /// Wavelength spectrum of WLS re-emission (nm).
    WlsEmissionSpectrum,
    /// Arrival times at the sensor (ns).
    SipmTimeSpectrum,
    /// Wavelength at the sensor (nm).
    SipmWavelength,
}

impl H1 {
    /// Every 1D histogram in booking order.
    pub const ALL: [Self; 13] = [
        Self::EnergyDeposit,
        Self::Time,
        Self::PhotonEnergyBeforeWls,
        Self::PhotonEnergyAfterWls,
        Self::PhotonWavelengthBeforeWls,
        Self::PhotonWavelengthAfterWls,
        Self::CladdingWavelength,
        Self::CladdingEnergy,
        Self::CoreWavelength,
        Self::CoreEnergy,
        Self::WlsEmissionSpectrum,
        Self::SipmTimeSpectrum,
        Self::SipmWavelength,
    ];

    /// Number of 1D histograms.
    pub const COUNT: usize = Self::ALL.len();

    /// Booking index.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Short name used as the storage key.
    pub const fn name(self) -> &'static str {
        match self {
            Self::EnergyDeposit => "edep",
            Self::Time => "time",
            Self::PhotonEnergyBeforeWls => "PhotonEnergyBeforeWLS",
            Self::PhotonEnergyAfterWls => "PhotonEnergyAfterWLS",
            Self::PhotonWavelengthBeforeWls => "PhotonWavelengthBeforeWLS",
            Self::PhotonWavelengthAfterWls => "PhotonWavelengthAfterWLS",
            Self::CladdingWavelength => "CladdingWavelength",
            Self::CladdingEnergy => "CladdingEnergy",
            Self::CoreWavelength => "CoreWavelength",
            Self::CoreEnergy => "CoreEnergy",
            Self::WlsEmissionSpectrum => "WLSEmissionSpectrum",
            Self::SipmTimeSpectrum => "SipmTimeSpectrum",
            Self::SipmWavelength => "SipmWavelength",
        }
    }

    /// Human-readable title.
    pub const fn title(self) -> &'static str {
        match self {
            Self::EnergyDeposit => "Energy Deposition Distribution",
            Self::Time => "Time Distribution",
            Self::PhotonEnergyBeforeWls => "Photon Energy Before WLS",
            Self::PhotonEnergyAfterWls => "Photon Energy After WLS",
            Self::PhotonWavelengthBeforeWls => "Photon Wavelength Before WLS",
            Self::PhotonWavelengthAfterWls => "Photon Wavelength After WLS",
            Self::CladdingWavelength => "Photon Wavelength in Cladding",
            Self::CladdingEnergy => "Photon Energy in Cladding",
            Self::CoreWavelength => "Photon Wavelength in Core",
            Self::CoreEnergy => "Photon Energy in Core",
            Self::WlsEmissionSpectrum => "WLS Emission Spectrum",
            Self::SipmTimeSpectrum => "Sipm Time Spectrum",
            Self::SipmWavelength => "Photon Wavelength in Sipm",
        }
    }

    /// Axis binning.
    pub const fn axis(self) -> Axis {
        match self {
            Self::EnergyDeposit => Axis::new(100, 0.0, 2.0e-5),
            Self::Time => Axis::new(100, 0.0, 3.0),
            Self::PhotonEnergyBeforeWls | Self::PhotonEnergyAfterWls => Axis::new(100, 2.0, 3.5),
            Self::PhotonWavelengthBeforeWls | Self::PhotonWavelengthAfterWls => {
                Axis::new(100, 350.0, 600.0)
            }
            Self::CladdingWavelength | Self::CoreWavelength => Axis::new(100, 300.0, 600.0),
            Self::CladdingEnergy | Self::CoreEnergy => Axis::new(100, 1.5, 4.1),
            Self::WlsEmissionSpectrum | Self::SipmWavelength => Axis::new(200, 300.0, 600.0),
            Self::SipmTimeSpectrum => Axis::new(100, 0.0, 300.0),
        }
    }
}

impl fmt::Display for H1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Two-dimensional (weighted) histograms: projections of step positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum H2 {
    /// XY projection weighted by time.
    TimingXy,
    /// YZ projection weighted by time.
    TimingYz,
    /// XZ projection weighted by time.
    TimingXz,
    /// XY projection weighted by energy deposit.
    EdepXy,
    /// YZ projection weighted by energy deposit.
    EdepYz,
    /// XZ projection weighted by energy deposit.
    EdepXz,
    /// Cladding XY projection weighted by energy deposit.
    CladXy,
    /// Cladding YZ projection weighted by energy deposit.
    CladYz,
    /// Cladding XZ projection weighted by energy deposit.
    CladXz,
    /// Core XY projection weighted by energy deposit.
    CoreXy,
    /// Core YZ projection weighted by energy deposit.
    CoreYz,
    /// Core XZ projection weighted by energy deposit.
    CoreXz,
    /// Sensor-hit XY projection weighted by arrival time.
    SipmTimingXy,
    /// Sensor-hit YZ projection weighted by arrival time.
    SipmTimingYz,
    /// Sensor-hit XZ projection weighted by arrival time.
    SipmTimingXz,
}

impl H2 {
    /// Every 2D histogram in booking order.
    pub const ALL: [Self; 15] = [
        Self::TimingXy,
        Self::TimingYz,
        Self::TimingXz,
        Self::EdepXy,
        Self::EdepYz,
        Self::EdepXz,
        Self::CladXy,
        Self::CladYz,
        Self::CladXz,
        Self::CoreXy,
        Self::CoreYz,
        Self::CoreXz,
        Self::SipmTimingXy,
        Self::SipmTimingYz,
        Self::SipmTimingXz,
    ];

    /// Number of 2D histograms.
    pub const COUNT: usize = Self::ALL.len();

    /// XY/YZ/XZ triple for timing.
    pub const TIMING: [Self; 3] = [Self::TimingXy, Self::TimingYz, Self::TimingXz];
    /// XY/YZ/XZ triple for energy deposit.
    pub const EDEP: [Self; 3] = [Self::EdepXy, Self::EdepYz, Self::EdepXz];
    /// XY/YZ/XZ triple for the cladding.
    pub const CLAD: [Self; 3] = [Self::CladXy, Self::CladYz, Self::CladXz];
    /// XY/YZ/XZ triple for the core.
    pub const CORE: [Self; 3] = [Self::CoreXy, Self::CoreYz, Self::CoreXz];
    /// XY/YZ/XZ triple for sensor timing.
    pub const SIPM_TIMING: [Self; 3] = [Self::SipmTimingXy, Self::SipmTimingYz, Self::SipmTimingXz];

    /// Booking index.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Short name used as the storage key.
    pub const fn name(self) -> &'static str {
        match self {
            Self::TimingXy => "timing_xy",
            Self::TimingYz => "timing_yz",
            Self::TimingXz => "timing_xz",
            Self::EdepXy => "edep_xy",
            Self::EdepYz => "edep_yz",
            Self::EdepXz => "edep_xz",
            Self::CladXy => "clad_xy",
            Self::CladYz => "clad_yz",
            Self::CladXz => "clad_xz",
            Self::CoreXy => "core_xy",
            Self::CoreYz => "core_yz",
            Self::CoreXz => "core_xz",
            Self::SipmTimingXy => "Sipm_Timing_xy",
            Self::SipmTimingYz => "Sipm_Timing_yz",
            Self::SipmTimingXz => "Sipm_Timing_xz",
        }
    }

    /// X and Y axis binning.
    pub const fn axes(self) -> (Axis, Axis) {
        match self {
            Self::TimingXy | Self::EdepXy | Self::CladXy | Self::CoreXy | Self::SipmTimingXy => {
                (WIDE, WIDE)
            }
            _ => (WIDE, DEPTH),
        }
    }
}

impl fmt::Display for H2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Sink trait
// ---------------------------------------------------------------------------

/// Storage backend for the per-step histograms.
///
/// Each controller owns its own sink, so implementations need no internal
/// synchronization. Fills never fail; only opening and closing the output
/// can, and those failures are non-fatal to the run.
pub trait HistogramSink: Send {
    /// Declare the histograms this sink will receive, with their titles and
    /// axes. Called once before the first run; fills into histograms that
    /// were never booked may be dropped.
    fn book(&mut self, h1: &[H1], h2: &[H2]);

    /// Prepare output for a run.
    fn open(&mut self, run_id: RunId) -> Result<(), SinkError>;

    /// Drop every accumulated entry.
    fn reset(&mut self);

    /// Add one entry to a 1D histogram.
    fn fill_1d(&mut self, histogram: H1, value: f64);

    /// Add one weighted entry to a 2D histogram.
    fn fill_2d(&mut self, histogram: H2, x: f64, y: f64, weight: f64);

    /// Flush and close the run's output.
    fn close(&mut self) -> Result<(), SinkError>;
}

/// Fill the XY, YZ and XZ projections of `position` into a triple.
pub fn fill_projections<S: HistogramSink + ?Sized>(
    sink: &mut S,
    triple: [H2; 3],
    position: Vec3,
    weight: f64,
) {
    let [xy, yz, xz] = triple;
    sink.fill_2d(xy, position.x, position.y, weight);
    sink.fill_2d(yz, position.y, position.z, weight);
    sink.fill_2d(xz, position.x, position.z, weight);
}

impl<S: HistogramSink + ?Sized> HistogramSink for Box<S> {
    fn book(&mut self, h1: &[H1], h2: &[H2]) {
        (**self).book(h1, h2);
    }

    fn open(&mut self, run_id: RunId) -> Result<(), SinkError> {
        (**self).open(run_id)
    }

    fn reset(&mut self) {
        (**self).reset();
    }

    fn fill_1d(&mut self, histogram: H1, value: f64) {
        (**self).fill_1d(histogram, value);
    }

    fn fill_2d(&mut self, histogram: H2, x: f64, y: f64, weight: f64) {
        (**self).fill_2d(histogram, x, y, weight);
    }

    fn close(&mut self) -> Result<(), SinkError> {
        (**self).close()
    }
}

/// Sink that discards every fill.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl HistogramSink for NullSink {
    fn book(&mut self, _h1: &[H1], _h2: &[H2]) {}

    fn open(&mut self, _run_id: RunId) -> Result<(), SinkError> {
        Ok(())
    }

    fn reset(&mut self) {}

    fn fill_1d(&mut self, _histogram: H1, _value: f64) {}

    fn fill_2d(&mut self, _histogram: H2, _x: f64, _y: f64, _weight: f64) {}

    fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Bin contents of one booked 1D histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Counts1d {
    /// Booked binning.
    pub axis: Axis,
    /// Entries per bin.
    pub bins: Vec<u64>,
    /// Entries below the axis.
    pub underflow: u64,
    /// Entries at or above the axis end.
    pub overflow: u64,
}

impl Counts1d {
    fn new(axis: Axis) -> Self {
        Self {
            axis,
            bins: vec![0; usize::try_from(axis.bins).unwrap_or(0)],
            underflow: 0,
            overflow: 0,
        }
    }

    fn clear(&mut self) {
        self.bins.fill(0);
        self.underflow = 0;
        self.overflow = 0;
    }

    fn fill(&mut self, value: f64) {
        let counter = match self.axis.locate(value) {
            AxisSlot::Underflow => &mut self.underflow,
            AxisSlot::Overflow => &mut self.overflow,
            AxisSlot::Bin(bin) => {
                let Some(count) = usize::try_from(bin).ok().and_then(|b| self.bins.get_mut(b))
                else {
                    return;
                };
                count
            }
        };
        *counter = counter.saturating_add(1);
    }

    /// All entries, underflow and overflow included.
    pub fn entries(&self) -> u64 {
        self.bins
            .iter()
            .fold(0_u64, |acc, n| acc.saturating_add(*n))
            .saturating_add(self.underflow)
            .saturating_add(self.overflow)
    }
}

/// Entry counts of one booked 2D histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Counts2d {
    /// Booked X and Y binning.
    pub axes: (Axis, Axis),
    /// Entries inside both axes.
    pub inside: u64,
    /// Entries outside either axis.
    pub outside: u64,
}

impl Counts2d {
    const fn new(axes: (Axis, Axis)) -> Self {
        Self {
            axes,
            inside: 0,
            outside: 0,
        }
    }

    fn fill(&mut self, x: f64, y: f64) {
        let (ax, ay) = self.axes;
        let counter = match (ax.locate(x), ay.locate(y)) {
            (AxisSlot::Bin(_), AxisSlot::Bin(_)) => &mut self.inside,
            _ => &mut self.outside,
        };
        *counter = counter.saturating_add(1);
    }

    /// All entries.
    pub const fn entries(&self) -> u64 {
        self.inside.saturating_add(self.outside)
    }
}

/// In-memory sink binning fills against the booked axes.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    /// Run currently open, if any.
    run_id: Option<RunId>,
    /// Booked 1D histograms, by index.
    booked_1d: [Option<Counts1d>; H1::COUNT],
    /// Booked 2D histograms, by index.
    booked_2d: [Option<Counts2d>; H2::COUNT],
}

impl MemorySink {
    /// Create a sink with nothing booked.
    pub fn new() -> Self {
        Self::default()
    }

    /// A booked 1D histogram.
    pub fn histogram_1d(&self, histogram: H1) -> Option<&Counts1d> {
        self.booked_1d.get(histogram.index())?.as_ref()
    }

    /// A booked 2D histogram.
    pub fn histogram_2d(&self, histogram: H2) -> Option<&Counts2d> {
        self.booked_2d.get(histogram.index())?.as_ref()
    }

    /// Entries filled into a 1D histogram since the last reset.
    pub fn entries_1d(&self, histogram: H1) -> u64 {
        self.histogram_1d(histogram).map_or(0, Counts1d::entries)
    }

    /// Entries filled into a 2D histogram since the last reset.
    pub fn entries_2d(&self, histogram: H2) -> u64 {
        self.histogram_2d(histogram).map_or(0, Counts2d::entries)
    }

    /// Number of booked histograms, 1D and 2D together.
    pub fn booked(&self) -> usize {
        let h1 = self.booked_1d.iter().flatten().count();
        let h2 = self.booked_2d.iter().flatten().count();
        h1.saturating_add(h2)
    }

    /// Whether a run is currently open.
    pub const fn is_open(&self) -> bool {
        self.run_id.is_some()
    }
}

impl HistogramSink for MemorySink {
    fn book(&mut self, h1: &[H1], h2: &[H2]) {
        for &histogram in h1 {
            if let Some(slot) = self.booked_1d.get_mut(histogram.index()) {
                slot.get_or_insert_with(|| Counts1d::new(histogram.axis()));
            }
        }
        for &histogram in h2 {
            if let Some(slot) = self.booked_2d.get_mut(histogram.index()) {
                slot.get_or_insert_with(|| Counts2d::new(histogram.axes()));
            }
        }
        debug!(booked = self.booked(), "histograms booked");
    }

    fn open(&mut self, run_id: RunId) -> Result<(), SinkError> {
        if self.booked() == 0 {
            return Err(SinkError::Open {
                run_id,
                reason: "no histograms booked".to_owned(),
            });
        }
        self.run_id = Some(run_id);
        Ok(())
    }

    fn reset(&mut self) {
        for counts in self.booked_1d.iter_mut().flatten() {
            counts.clear();
        }
        for counts in self.booked_2d.iter_mut().flatten() {
            counts.inside = 0;
            counts.outside = 0;
        }
    }

    fn fill_1d(&mut self, histogram: H1, value: f64) {
        if let Some(Some(counts)) = self.booked_1d.get_mut(histogram.index()) {
            counts.fill(value);
        }
    }

    fn fill_2d(&mut self, histogram: H2, x: f64, y: f64, _weight: f64) {
        if let Some(Some(counts)) = self.booked_2d.get_mut(histogram.index()) {
            counts.fill(x, y);
        }
    }

    fn close(&mut self) -> Result<(), SinkError> {
        let Some(run_id) = self.run_id.take() else {
            return Err(SinkError::Close {
                reason: "no run is open".to_owned(),
            });
        };
        for histogram in H1::ALL {
            if let Some(counts) = self.histogram_1d(histogram) {
                debug!(
                    %run_id,
                    histogram = %histogram,
                    title = histogram.title(),
                    entries = counts.entries(),
                    underflow = counts.underflow,
                    overflow = counts.overflow,
                    "1d histogram closed"
                );
            }
        }
        for histogram in H2::ALL {
            if let Some(counts) = self.histogram_2d(histogram) {
                debug!(
                    %run_id,
                    histogram = %histogram,
                    entries = counts.entries(),
                    outside = counts.outside,
                    "2d histogram closed"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn catalogue_names_are_unique() {
        let h1: HashSet<&str> = H1::ALL.iter().map(|h| h.name()).collect();
        let h2: HashSet<&str> = H2::ALL.iter().map(|h| h.name()).collect();
        assert_eq!(h1.len(), H1::COUNT);
        assert_eq!(h2.len(), H2::COUNT);
    }

    #[test]
    fn catalogue_indices_follow_booking_order() {
        for (i, h) in H1::ALL.iter().enumerate() {
            assert_eq!(h.index(), i);
        }
        for (i, h) in H2::ALL.iter().enumerate() {
            assert_eq!(h.index(), i);
        }
    }

    #[test]
    fn axes_are_well_formed() {
        for h in H1::ALL {
            let axis = h.axis();
            assert!(axis.bins > 0);
            assert!(axis.min < axis.max, "{h}");
        }
        for h in H2::ALL {
            let (x, y) = h.axes();
            assert!(x.min < x.max && y.min < y.max, "{h}");
        }
    }

    fn booked_sink() -> MemorySink {
        let mut sink = MemorySink::new();
        sink.book(&H1::ALL, &H2::ALL);
        sink
    }

    #[test]
    fn memory_sink_counts_and_resets() {
        let mut sink = booked_sink();
        assert_eq!(sink.booked(), H1::COUNT + H2::COUNT);
        sink.open(RunId::new(3)).unwrap();
        assert!(sink.is_open());
        sink.fill_1d(H1::Time, 1.0);
        sink.fill_1d(H1::Time, 2.0);
        fill_projections(&mut sink, H2::TIMING, Vec3::new(1.0, 2.0, 3.0), 0.5);
        assert_eq!(sink.entries_1d(H1::Time), 2);
        assert_eq!(sink.entries_2d(H2::TimingYz), 1);
        assert_eq!(sink.entries_2d(H2::EdepXy), 0);

        sink.reset();
        assert_eq!(sink.entries_1d(H1::Time), 0);
        sink.close().unwrap();
        assert!(!sink.is_open());
    }

    #[test]
    fn closing_an_unopened_memory_sink_fails() {
        let mut sink = booked_sink();
        assert!(matches!(sink.close(), Err(SinkError::Close { .. })));
    }

    #[test]
    fn opening_without_bookings_fails() {
        let mut sink = MemorySink::new();
        let err = sink.open(RunId::new(5)).unwrap_err();
        assert!(matches!(err, SinkError::Open { run_id, .. } if run_id == RunId::new(5)));
        assert!(!sink.is_open());
    }

    #[test]
    fn unbooked_histograms_drop_fills() {
        let mut sink = MemorySink::new();
        sink.book(&[H1::Time], &[H2::CoreXy]);
        sink.fill_1d(H1::Time, 1.0);
        sink.fill_1d(H1::CoreEnergy, 2.4);
        sink.fill_2d(H2::CoreXy, 0.0, 0.0, 1.0);
        sink.fill_2d(H2::CoreYz, 0.0, 0.0, 1.0);
        assert_eq!(sink.booked(), 2);
        assert_eq!(sink.entries_1d(H1::Time), 1);
        assert_eq!(sink.entries_1d(H1::CoreEnergy), 0);
        assert!(sink.histogram_2d(H2::CoreYz).is_none());
        assert_eq!(sink.entries_2d(H2::CoreXy), 1);
    }

    #[test]
    fn fills_are_binned_against_booked_axes() {
        let mut sink = booked_sink();
        // Time axis: 100 bins over [0, 3) ns.
        sink.fill_1d(H1::Time, -0.5);
        sink.fill_1d(H1::Time, 0.0);
        sink.fill_1d(H1::Time, 0.031);
        sink.fill_1d(H1::Time, 2.999);
        sink.fill_1d(H1::Time, 3.0);
        sink.fill_1d(H1::Time, f64::NAN);

        let time = sink.histogram_1d(H1::Time).unwrap();
        assert_eq!(time.bins.len(), 100);
        assert_eq!(time.underflow, 1);
        assert_eq!(time.overflow, 2);
        assert_eq!(time.bins[0], 1);
        assert_eq!(time.bins[1], 1);
        assert_eq!(time.bins[99], 1);
        assert_eq!(time.entries(), 6);

        // YZ projections use the narrow depth axis for Z.
        sink.fill_2d(H2::CoreYz, 0.0, 10.0, 1.0);
        sink.fill_2d(H2::CoreYz, 0.0, 90.0, 1.0);
        let core = sink.histogram_2d(H2::CoreYz).unwrap();
        assert_eq!((core.inside, core.outside), (1, 1));

        sink.reset();
        assert_eq!(sink.entries_1d(H1::Time), 0);
        assert_eq!(sink.booked(), H1::COUNT + H2::COUNT);
    }

    #[test]
    fn axis_locates_edges() {
        let axis = H1::SipmTimeSpectrum.axis();
        assert_eq!(axis.locate(-1.0), AxisSlot::Underflow);
        assert_eq!(axis.locate(0.0), AxisSlot::Bin(0));
        assert_eq!(axis.locate(150.0), AxisSlot::Bin(50));
        assert_eq!(axis.locate(300.0), AxisSlot::Overflow);
    }

    #[test]
    fn boxed_sink_forwards() {
        let mut sink: Box<dyn HistogramSink> = Box::new(MemorySink::new());
        sink.book(&H1::ALL, &[]);
        sink.open(RunId::new(1)).unwrap();
        sink.fill_1d(H1::CoreEnergy, 2.4);
        sink.close().unwrap();
        assert!(sink.close().is_err());
    }

    #[test]
    fn null_sink_accepts_everything() {
        let mut sink = NullSink;
        sink.book(&H1::ALL, &H2::ALL);
        sink.open(RunId::new(0)).unwrap();
        sink.fill_1d(H1::EnergyDeposit, 0.0);
        sink.fill_2d(H2::CoreXz, 0.0, 0.0, 1.0);
        sink.close().unwrap();
    }
}
