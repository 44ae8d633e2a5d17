//! Derived metrics computed from merged run totals.

use fibertrace_types::Tally;
use serde::Serialize;
use tracing::info;

use crate::counters::MasterTotals;

/// Fraction of photons that entered the fibre and were absorbed there.
///
/// Returns `0.0` when nothing entered.
#[allow(clippy::cast_precision_loss)]
pub fn trapping_efficiency(entered: u64, absorbed: u64) -> f64 {
    info!(entered, absorbed, "computing trapping efficiency");
    if entered == 0 {
        return 0.0;
    }
    absorbed as f64 / entered as f64
}

/// Fibre transition counts of one run with the derived efficiency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FiberYield {
    /// Photons that crossed into the fibre.
    pub entered: u64,
    /// Photons that left the fibre into the tile or the world.
    pub exited: u64,
    /// WLS photons that ended inside the fibre.
    pub absorbed: u64,
    /// `absorbed / entered`, `0.0` when nothing entered.
    pub trapping_efficiency: f64,
}

impl FiberYield {
    /// Derive the yield from merged totals.
    pub fn from_totals(totals: &MasterTotals) -> Self {
        let entered = totals.tally(Tally::PhotonsEnteredFiber);
        let absorbed = totals.tally(Tally::PhotonsAbsorbedFiber);
        Self {
            entered,
            exited: totals.tally(Tally::PhotonsExitedFiber),
            absorbed,
            trapping_efficiency: trapping_efficiency(entered, absorbed),
        }
    }

    /// Trapping efficiency as a percentage.
    pub const fn as_percent(&self) -> f64 {
        self.trapping_efficiency * 100.0
    }
}
