//! Shared type definitions for the fibertrace aggregation layer.
//!
//! This crate is the single source of truth for the vocabulary shared by the
//! core aggregation crate and the engine binary: detector volumes, physics
//! process names, counter keys, step events handed over by the simulation
//! engine, and the sensor hits recorded from them.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe wrappers for run and sensor identifiers
//! - [`enums`] -- Volumes, processes, counter namespaces, tallies, roles
//! - [`structs`] -- Step events, hits, positions, counter keys

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{Namespace, ParticleKind, Process, Tally, Volume, WorkerRole};
pub use ids::{RunId, SensorId};
pub use structs::{CounterKey, Hit, StepEvent, Vec3};

/// Photon energy-to-wavelength constant, `h * c` in `eV * nm`.
pub const HC_EV_NM: f64 = 1_239.841_93;

/// Convert a photon energy in eV to its vacuum wavelength in nm.
///
/// Returns `0.0` for non-positive or non-finite energies so that a malformed
/// step never produces an infinite wavelength in a report.
pub const fn wavelength_nm(energy_ev: f64) -> f64 {
    if energy_ev.is_finite() && energy_ev > 0.0 {
        HC_EV_NM / energy_ev
    } else {
        0.0
    }
}
