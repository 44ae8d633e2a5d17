//! Core data structs: positions, counter keys, step events, and hits.

use serde::{Deserialize, Serialize};

use crate::enums::{Namespace, ParticleKind, Process, Volume};
use crate::ids::SensorId;

// ---------------------------------------------------------------------------
// Vec3
// ---------------------------------------------------------------------------

/// A point in detector coordinates, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// X coordinate (mm).
    pub x: f64,
    /// Y coordinate (mm).
    pub y: f64,
    /// Z coordinate (mm).
    pub z: f64,
}

impl Vec3 {
    /// Create a position from its components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

// ---------------------------------------------------------------------------
// CounterKey
// ---------------------------------------------------------------------------

/// Strongly-typed composite key of a process counter.
///
/// The key space is the full cross-product of namespaces, volumes and
/// processes, so every key maps to a fixed dense slot (see
/// [`CounterKey::slot`]) and lookups never hash or concatenate strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CounterKey {
    /// Creation or interaction family.
    pub namespace: Namespace,
    /// Volume the step started in.
    pub volume: Volume,
    /// Creator process or step-limiting process.
    pub process: Process,
}

impl CounterKey {
    /// Total number of distinct keys.
    pub const KEY_SPACE: usize = Namespace::COUNT * Volume::COUNT * Process::COUNT;

    /// Create a key.
    pub const fn new(namespace: Namespace, volume: Volume, process: Process) -> Self {
        Self {
            namespace,
            volume,
            process,
        }
    }

    /// Shorthand for a creation-namespace key.
    pub const fn creation(volume: Volume, process: Process) -> Self {
        Self::new(Namespace::Creation, volume, process)
    }

    /// Shorthand for an interaction-namespace key.
    pub const fn interaction(volume: Volume, process: Process) -> Self {
        Self::new(Namespace::Interaction, volume, process)
    }

    /// Dense slot in `0..KEY_SPACE`.
    ///
    /// Each factor is bounded by its enum's `COUNT`, so the result is always
    /// below [`Self::KEY_SPACE`].
    #[allow(clippy::arithmetic_side_effects)]
    pub const fn slot(self) -> usize {
        (self.namespace.index() * Volume::COUNT + self.volume.index()) * Process::COUNT
            + self.process.index()
    }

    /// Display name, e.g. `Tile_Creation_Cerenkov`.
    pub fn name(self) -> String {
        self.to_string()
    }
}

impl core::fmt::Display for CounterKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.volume.as_str(),
            self.namespace.label(),
            self.process.as_str()
        )
    }
}

// ---------------------------------------------------------------------------
// StepEvent
// ---------------------------------------------------------------------------

/// One simulation step as handed to the per-step callback.
///
/// Volume names are already resolved by the geometry service; `None` means
/// the navigator found no volume for that step point. Units: times in ns,
/// positions in mm, energies in eV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEvent {
    /// Kind of the tracked particle.
    pub particle: ParticleKind,
    /// Logical volume name at the pre-step point.
    #[serde(default)]
    pub pre_volume: Option<String>,
    /// Logical volume name at the post-step point.
    #[serde(default)]
    pub post_volume: Option<String>,
    /// Name of the process that created the track (`None` for primaries).
    #[serde(default)]
    pub creator_process: Option<String>,
    /// Name of the process that limited this step.
    #[serde(default)]
    pub interaction_process: Option<String>,
    /// Global time of the post-step point (ns). Sensor hits carry this time.
    pub global_time: f64,
    /// Global time of the pre-step point (ns), when the engine supplies it.
    #[serde(default)]
    pub pre_global_time: Option<f64>,
    /// Local (track) time of the post-step point (ns).
    #[serde(default)]
    pub local_time: f64,
    /// Pre-step position (mm). Sensor hits record this position.
    pub position: Vec3,
    /// Post-step position (mm), when the engine supplies it.
    #[serde(default)]
    pub post_position: Option<Vec3>,
    /// Total energy of the track (eV).
    pub total_energy: f64,
    /// Energy deposited during the step (eV).
    #[serde(default)]
    pub deposited_energy: f64,
    /// Copy number of the post-step physical volume.
    #[serde(default)]
    pub sensor_copy_number: i32,
    /// Full name of the post-step physical volume.
    #[serde(default)]
    pub sensor_name: Option<String>,
}

impl StepEvent {
    /// Creator process name, defaulting to `"Primary"`.
    pub fn creator_name(&self) -> &str {
        self.creator_process.as_deref().unwrap_or("Primary")
    }

    /// Step-limiting process name, defaulting to `"Unknown"`.
    pub fn interaction_name(&self) -> &str {
        self.interaction_process.as_deref().unwrap_or("Unknown")
    }

    /// Time the step started: the pre-step time, or the post-step time
    /// when the engine did not supply it.
    pub fn start_time(&self) -> f64 {
        self.pre_global_time.unwrap_or(self.global_time)
    }

    /// Where the step ended: the post-step position, or the pre-step
    /// position when the engine did not supply it.
    pub fn end_position(&self) -> Vec3 {
        self.post_position.unwrap_or(self.position)
    }

    /// Whether the step belongs to an optical photon.
    pub fn is_optical_photon(&self) -> bool {
        self.particle == ParticleKind::OpticalPhoton
    }
}

// ---------------------------------------------------------------------------
// Hit
// ---------------------------------------------------------------------------

/// A photon reaching a sensor.
///
/// Hits are immutable once built and are moved into the shared hit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Sensor copy number.
    pub sensor_id: SensorId,
    /// Full sensor name, the grouping key of the report.
    pub sensor_name: String,
    /// Global arrival time (ns).
    pub time: f64,
    /// Position of the step that entered the sensor (mm).
    pub position: Vec3,
    /// Total photon energy (eV).
    pub energy: f64,
    /// Photon wavelength (nm).
    pub wavelength: f64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn counter_slots_are_unique_and_bounded() {
        let mut seen = BTreeSet::new();
        for ns in Namespace::ALL {
            for v in Volume::ALL {
                for p in Process::ALL {
                    let slot = CounterKey::new(ns, v, p).slot();
                    assert!(slot < CounterKey::KEY_SPACE);
                    assert!(seen.insert(slot), "duplicate slot {slot}");
                }
            }
        }
        assert_eq!(seen.len(), CounterKey::KEY_SPACE);
    }

    #[test]
    fn counter_name_format() {
        let key = CounterKey::creation(Volume::Tile, Process::Cerenkov);
        assert_eq!(key.name(), "Tile_Creation_Cerenkov");
        let key = CounterKey::interaction(Volume::FiberCore, Process::OpWls);
        assert_eq!(key.to_string(), "FiberCore_Interaction_OpWLS");
    }

    #[test]
    fn step_event_defaults_from_sparse_json() {
        let json = r#"{
            "particle": "optical_photon",
            "pre_volume": "Tile",
            "global_time": 1.5,
            "position": {"x": 0.0, "y": 1.0, "z": 2.0},
            "total_energy": 3.0
        }"#;
        let step: StepEvent = serde_json::from_str(json).unwrap();
        assert!(step.is_optical_photon());
        assert_eq!(step.creator_name(), "Primary");
        assert_eq!(step.interaction_name(), "Unknown");
        assert!(step.post_volume.is_none());
        assert_eq!(step.sensor_copy_number, 0);
        assert!((step.start_time() - 1.5).abs() < f64::EPSILON);
        assert_eq!(step.end_position(), Vec3::new(0.0, 1.0, 2.0));
    }

    #[test]
    fn step_endpoints_prefer_explicit_pre_and_post_points() {
        let json = r#"{
            "particle": "optical_photon",
            "global_time": 4.0,
            "pre_global_time": 3.25,
            "position": {"x": 0.0, "y": 1.0, "z": 2.0},
            "post_position": {"x": 0.0, "y": 1.0, "z": 7.5},
            "total_energy": 2.4
        }"#;
        let step: StepEvent = serde_json::from_str(json).unwrap();
        assert!((step.start_time() - 3.25).abs() < f64::EPSILON);
        assert_eq!(step.end_position(), Vec3::new(0.0, 1.0, 7.5));
        assert_eq!(step.position, Vec3::new(0.0, 1.0, 2.0));
    }
}
