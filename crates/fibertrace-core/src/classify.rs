//! Pure classification of a step event.
//!
//! Turns the string-typed fields the engine hands over into typed volumes
//! and processes, and evaluates the fibre boundary conditions. Nothing here
//! touches counters, the hit log or any sink.

use std::fmt;

use fibertrace_types::{Hit, Process, SensorId, StepEvent, Volume, wavelength_nm};

/// Why a step was not processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The track is not an optical photon.
    NotOpticalPhoton,
    /// The navigator found no volume at the pre-step point.
    UnresolvedVolume,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotOpticalPhoton => f.write_str("not an optical photon"),
            Self::UnresolvedVolume => f.write_str("unresolved pre-step volume"),
        }
    }
}

/// Fibre boundary conditions met by one step.
///
/// `entered_fiber`, `absorbed_fiber` and `sensor_hit` are the classic fibre
/// counting rules. `exited_fiber` is an extra rule added here so that
/// `PhotonsExitedFiber` is filled; it counts any photon, shifted or not,
/// that leaves the fibre for the tile or the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Transitions {
    /// A non-WLS photon crossed Tile -> `FiberClad` or `FiberClad` -> `FiberCore`.
    pub entered_fiber: bool,
    /// A photon left the fibre into the tile or the world.
    pub exited_fiber: bool,
    /// A WLS photon moved from the fibre into anything but the tile or world.
    pub absorbed_fiber: bool,
    /// A WLS photon moved from the fibre into the sensor.
    pub sensor_hit: bool,
}

/// Typed view of a processable step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepClass {
    /// Pre-step volume, `None` when the name is not a known volume.
    pub volume: Option<Volume>,
    /// Creator process, `None` when the name is not a known process.
    pub creator: Option<Process>,
    /// Step-limiting process, `None` when the name is not a known process.
    pub interaction: Option<Process>,
    /// The photon was re-emitted by wavelength shifting.
    pub wls_created: bool,
    /// Boundary conditions met by the step.
    pub transitions: Transitions,
}

impl StepClass {
    /// The step ends with the photon being absorbed by the shifter.
    pub const fn absorbed_by_wls(self) -> bool {
        matches!(self.interaction, Some(Process::OpWls))
    }
}

/// Classify a step.
///
/// Non-photon tracks and steps without a pre-step volume are rejected.
/// Transitions are evaluated only when both volumes are resolved and differ.
pub fn classify(step: &StepEvent) -> Result<StepClass, SkipReason> {
    if !step.is_optical_photon() {
        return Err(SkipReason::NotOpticalPhoton);
    }
    let Some(pre_name) = step.pre_volume.as_deref() else {
        return Err(SkipReason::UnresolvedVolume);
    };

    let creator_name = step.creator_name();
    let wls_created = creator_name == Process::OpWls.as_str();
    let volume = Volume::from_name(pre_name);

    let transitions = match step.post_volume.as_deref() {
        Some(post_name) if post_name != pre_name => {
            transitions(volume, Volume::from_name(post_name), wls_created)
        }
        _ => Transitions::default(),
    };

    Ok(StepClass {
        volume,
        creator: Process::from_name(creator_name),
        interaction: Process::from_name(step.interaction_name()),
        wls_created,
        transitions,
    })
}

/// Evaluate the boundary rules for a step crossing from `pre` into `post`.
fn transitions(pre: Option<Volume>, post: Option<Volume>, wls_created: bool) -> Transitions {
    let from_fiber = pre.is_some_and(Volume::is_fiber);
    let into_tile_or_world = matches!(post, Some(Volume::Tile | Volume::World));
    let entered = matches!(
        (pre, post),
        (Some(Volume::FiberClad), Some(Volume::FiberCore))
            | (Some(Volume::Tile), Some(Volume::FiberClad))
    );

    Transitions {
        entered_fiber: entered && !wls_created,
        exited_fiber: from_fiber && into_tile_or_world,
        absorbed_fiber: from_fiber && wls_created && !into_tile_or_world,
        sensor_hit: from_fiber && wls_created && post == Some(Volume::Sipm),
    }
}

/// Build the hit record for a step that met the sensor-hit condition.
///
/// The sensor name falls back to the post-step volume name when the engine
/// does not supply the physical volume name.
pub fn build_hit(step: &StepEvent) -> Hit {
    let sensor_name = step
        .sensor_name
        .as_deref()
        .or(step.post_volume.as_deref())
        .unwrap_or(Volume::Sipm.as_str())
        .to_owned();
    Hit {
        sensor_id: SensorId::new(step.sensor_copy_number),
        sensor_name,
        time: step.global_time,
        position: step.position,
        energy: step.total_energy,
        wavelength: wavelength_nm(step.total_energy),
    }
}
