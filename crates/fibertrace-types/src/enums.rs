//! Enumeration types for the fibertrace aggregation layer.
//!
//! Volume and process names arrive from the simulation engine as free-form
//! strings. They are parsed into these closed enums at the edge so that the
//! counter key space is fixed and enumerable at compile time. Names that do
//! not parse are not errors: the caller simply skips the counter update.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Detector volumes
// ---------------------------------------------------------------------------

/// A named logical volume of the detector geometry.
///
/// The geometry is a scintillating tile with an embedded wavelength-shifting
/// fibre (core and cladding) read out at one end by a silicon photomultiplier,
/// all placed inside a world volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Volume {
    /// The plastic scintillator tile.
    Tile,
    /// Outer cladding of the WLS fibre.
    FiberClad,
    /// Inner core of the WLS fibre.
    FiberCore,
    /// Silicon photomultiplier sensor.
    Sipm,
    /// The enclosing world volume.
    World,
}

impl Volume {
    /// Every volume, in dense-index order.
    pub const ALL: [Self; 5] = [
        Self::Tile,
        Self::FiberClad,
        Self::FiberCore,
        Self::Sipm,
        Self::World,
    ];

    /// Number of volume variants.
    pub const COUNT: usize = Self::ALL.len();

    /// Volumes that carry process counters, in summary print order.
    pub const COUNTED: [Self; 4] = [Self::Tile, Self::FiberCore, Self::FiberClad, Self::Sipm];

    /// Parse a logical volume name as reported by the geometry service.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Tile" => Some(Self::Tile),
            "FiberClad" => Some(Self::FiberClad),
            "FiberCore" => Some(Self::FiberCore),
            "Sipm" => Some(Self::Sipm),
            "World" => Some(Self::World),
            _ => None,
        }
    }

    /// The logical volume name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tile => "Tile",
            Self::FiberClad => "FiberClad",
            Self::FiberCore => "FiberCore",
            Self::Sipm => "Sipm",
            Self::World => "World",
        }
    }

    /// Dense index in `0..COUNT`.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Whether this volume is part of the WLS fibre (core or cladding).
    pub const fn is_fiber(self) -> bool {
        matches!(self, Self::FiberClad | Self::FiberCore)
    }
}

impl core::fmt::Display for Volume {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Physics processes
// ---------------------------------------------------------------------------

/// A physics process that created a photon or ended one of its steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Process {
    /// Cherenkov radiation.
    Cerenkov,
    /// Scintillation light emission.
    Scintillation,
    /// Wavelength-shifting absorption and re-emission.
    #[serde(rename = "OpWLS")]
    OpWls,
    /// Bulk optical absorption.
    OpAbsorption,
    /// Geometric transport to a volume boundary.
    Transportation,
    /// Optical boundary interaction (reflection, refraction).
    OpBoundary,
    /// Rayleigh scattering.
    OpRayleigh,
    /// Mie scattering.
    #[serde(rename = "OpMieHG")]
    OpMieHg,
    /// Pseudo-process for tracks without a creator (primaries).
    Primary,
}

impl Process {
    /// Every process, in dense-index order.
    pub const ALL: [Self; 9] = [
        Self::Cerenkov,
        Self::Scintillation,
        Self::OpWls,
        Self::OpAbsorption,
        Self::Transportation,
        Self::OpBoundary,
        Self::OpRayleigh,
        Self::OpMieHg,
        Self::Primary,
    ];

    /// Number of process variants.
    pub const COUNT: usize = Self::ALL.len();

    /// Creation processes counted per volume by default.
    pub const CREATION_DEFAULTS: [Self; 3] = [Self::Cerenkov, Self::Scintillation, Self::OpWls];

    /// Interaction processes counted per volume by default.
    pub const INTERACTION_DEFAULTS: [Self; 3] =
        [Self::OpAbsorption, Self::OpWls, Self::Transportation];

    /// Parse a process name as reported by the simulation engine.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Cerenkov" => Some(Self::Cerenkov),
            "Scintillation" => Some(Self::Scintillation),
            "OpWLS" => Some(Self::OpWls),
            "OpAbsorption" => Some(Self::OpAbsorption),
            "Transportation" => Some(Self::Transportation),
            "OpBoundary" => Some(Self::OpBoundary),
            "OpRayleigh" => Some(Self::OpRayleigh),
            "OpMieHG" => Some(Self::OpMieHg),
            "Primary" => Some(Self::Primary),
            _ => None,
        }
    }

    /// The engine-side process name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cerenkov => "Cerenkov",
            Self::Scintillation => "Scintillation",
            Self::OpWls => "OpWLS",
            Self::OpAbsorption => "OpAbsorption",
            Self::Transportation => "Transportation",
            Self::OpBoundary => "OpBoundary",
            Self::OpRayleigh => "OpRayleigh",
            Self::OpMieHg => "OpMieHG",
            Self::Primary => "Primary",
        }
    }

    /// Dense index in `0..COUNT`.
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl core::fmt::Display for Process {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Counter namespaces and tallies
// ---------------------------------------------------------------------------

/// Which of the two process-counter families a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Namespace {
    /// How the photon was created.
    Creation,
    /// Which process ended the step.
    Interaction,
}

impl Namespace {
    /// Both namespaces, in dense-index order.
    pub const ALL: [Self; 2] = [Self::Creation, Self::Interaction];

    /// Number of namespaces.
    pub const COUNT: usize = Self::ALL.len();

    /// Dense index in `0..COUNT`.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Human-readable label used in counter names and summaries.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Creation => "Creation",
            Self::Interaction => "Interaction",
        }
    }
}

/// Scalar run tallies kept next to the process counters.
///
/// Unlike process counters these are not registered: every worker copy and
/// the master always carry all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tally {
    /// Photon steps that started in the tile.
    TileSteps,
    /// Photon steps that started in the fibre cladding.
    CladSteps,
    /// Photon steps that started in the fibre core.
    CoreSteps,
    /// Photon steps that started in the sensor.
    SipmSteps,
    /// Photon steps that started anywhere else.
    OtherSteps,
    /// Non-shifted photons crossing into the fibre.
    PhotonsEnteredFiber,
    /// Photons leaving the fibre into the tile or the world.
    PhotonsExitedFiber,
    /// Shifted photons leaving the fibre towards the readout side.
    PhotonsAbsorbedFiber,
}

impl Tally {
    /// Every tally, in dense-index order.
    pub const ALL: [Self; 8] = [
        Self::TileSteps,
        Self::CladSteps,
        Self::CoreSteps,
        Self::SipmSteps,
        Self::OtherSteps,
        Self::PhotonsEnteredFiber,
        Self::PhotonsExitedFiber,
        Self::PhotonsAbsorbedFiber,
    ];

    /// Number of tallies.
    pub const COUNT: usize = Self::ALL.len();

    /// Dense index in `0..COUNT`.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Counter name as printed in run summaries.
    pub const fn name(self) -> &'static str {
        match self {
            Self::TileSteps => "TileCount",
            Self::CladSteps => "CladCount",
            Self::CoreSteps => "CoreCount",
            Self::SipmSteps => "SipmCount",
            Self::OtherSteps => "OtherCount",
            Self::PhotonsEnteredFiber => "PhotonsEnteredFiber",
            Self::PhotonsExitedFiber => "PhotonsExitedFiber",
            Self::PhotonsAbsorbedFiber => "PhotonsAbsorbedFiber",
        }
    }

    /// The per-volume step tally for a step starting in `volume`.
    ///
    /// Unknown volumes (`None`) and the world count as "other".
    pub const fn for_volume(volume: Option<Volume>) -> Self {
        match volume {
            Some(Volume::Tile) => Self::TileSteps,
            Some(Volume::FiberClad) => Self::CladSteps,
            Some(Volume::FiberCore) => Self::CoreSteps,
            Some(Volume::Sipm) => Self::SipmSteps,
            Some(Volume::World) | None => Self::OtherSteps,
        }
    }
}

// ---------------------------------------------------------------------------
// Particles and roles
// ---------------------------------------------------------------------------

/// Kind of particle a step belongs to.
///
/// Only optical photons are aggregated; everything else is filtered out
/// before any counter or hit logic runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticleKind {
    /// An optical photon.
    OpticalPhoton,
    /// Any other particle (electrons, gammas, ...).
    #[serde(other)]
    Other,
}

/// Role of a run controller within the engine's thread layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkerRole {
    /// The single context that drives run boundaries and emits the report.
    Coordinator,
    /// A worker context that processes simulation steps.
    Participant,
}

impl WorkerRole {
    /// Whether this is the coordinating context.
    pub const fn is_coordinator(self) -> bool {
        matches!(self, Self::Coordinator)
    }
}

impl core::fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Coordinator => f.write_str("coordinator"),
            Self::Participant => f.write_str("participant"),
        }
    }
}
