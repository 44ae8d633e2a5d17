//! Run lifecycle controller.
//!
//! One [`RunController`] exists per worker context. Participants classify
//! steps and update their private counters; the single coordinator clears
//! the shared hit log, merges participant counters after the engine has
//! joined its workers, and produces the run report.
//!
//! # State machine
//!
//! ```text
//! Idle --begin_run--> RunActive --finish_worker / end_run--> Merging --> Idle
//! ```
//!
//! Calling an operation in the wrong state or from the wrong role returns a
//! [`ControllerError`] and leaves the controller unchanged.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use fibertrace_types::{Hit, Namespace, RunId, StepEvent, Tally, Volume, WorkerRole, wavelength_nm};
use tracing::{debug, info, trace, warn};

use crate::binning::{bin_hits, sensor_bins};
use crate::classify::{SkipReason, StepClass, Transitions, build_hit, classify};
use crate::config::ReportConfig;
use crate::counters::{CounterRegistry, WorkerCounters};
use crate::histogram::{H1, H2, HistogramSink, NullSink, fill_projections};
use crate::hits::HitLog;
use crate::metrics::FiberYield;
use crate::report::write_report;
use crate::summary::RunSummary;

/// Electronvolts per mega-electronvolt; energy deposits are histogrammed in
/// mega-electronvolts.
const EV_PER_MEV: f64 = 1.0e6;

/// Lifecycle state of one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Between runs.
    Idle,
    /// Processing steps of a run.
    RunActive {
        /// The active run.
        run_id: RunId,
    },
    /// Handing over or reducing counters at end of run.
    Merging {
        /// The run being finished.
        run_id: RunId,
    },
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("Idle"),
            Self::RunActive { run_id } => write!(f, "RunActive(run {run_id})"),
            Self::Merging { run_id } => write!(f, "Merging(run {run_id})"),
        }
    }
}

/// Result of dispatching one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step was not processed.
    Skipped(SkipReason),
    /// Counters were updated; the transitions the step met are attached.
    Recorded(Transitions),
}

/// Lifecycle misuse by the caller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ControllerError {
    /// The operation belongs to the other role.
    #[error("{operation} is not available to a {role} controller")]
    WrongRole {
        /// Role of the controller that was called.
        role: WorkerRole,
        /// The rejected operation.
        operation: &'static str,
    },

    /// The operation is not valid in the current state.
    #[error("{operation} is not valid in state {state}")]
    InvalidState {
        /// State the controller was in.
        state: RunState,
        /// The rejected operation.
        operation: &'static str,
    },
}

/// Per-worker run lifecycle driver.
#[derive(Debug)]
pub struct RunController<S = NullSink> {
    /// Coordinator or participant.
    role: WorkerRole,
    /// Current lifecycle state.
    state: RunState,
    /// This worker's private counters.
    counters: WorkerCounters,
    /// Log shared by every controller of the process.
    hit_log: Arc<HitLog>,
    /// Hits recorded by this worker in the current run.
    worker_hits: Vec<Hit>,
    /// Histogram backend owned by this worker.
    sink: S,
    /// Report settings used by the coordinator.
    report: ReportConfig,
}

impl RunController<NullSink> {
    /// Create a controller that discards histogram fills.
    pub fn new(
        role: WorkerRole,
        registry: &Arc<CounterRegistry>,
        hit_log: Arc<HitLog>,
        report: ReportConfig,
    ) -> Self {
        Self::with_sink(role, registry, hit_log, report, NullSink)
    }
}

impl<S: HistogramSink> RunController<S> {
    /// Create a controller filling histograms into `sink`.
    ///
    /// The whole histogram catalogue is booked into the sink here, once per
    /// controller.
    pub fn with_sink(
        role: WorkerRole,
        registry: &Arc<CounterRegistry>,
        hit_log: Arc<HitLog>,
        report: ReportConfig,
        mut sink: S,
    ) -> Self {
        sink.book(&H1::ALL, &H2::ALL);
        Self {
            role,
            state: RunState::Idle,
            counters: registry.worker_counters(),
            hit_log,
            worker_hits: Vec::new(),
            sink,
            report,
        }
    }

    /// Role fixed at construction.
    pub const fn role(&self) -> WorkerRole {
        self.role
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// This worker's counters for the current (or last) run.
    pub const fn counters(&self) -> &WorkerCounters {
        &self.counters
    }

    /// Hits recorded by this worker in the current (or last) run.
    pub fn worker_hits(&self) -> &[Hit] {
        &self.worker_hits
    }

    /// The histogram backend.
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Reject calls from the wrong role.
    const fn require_role(
        &self,
        role: WorkerRole,
        operation: &'static str,
    ) -> Result<(), ControllerError> {
        if self.role.is_coordinator() == role.is_coordinator() {
            Ok(())
        } else {
            Err(ControllerError::WrongRole {
                role: self.role,
                operation,
            })
        }
    }

    /// The active run, or an error naming `operation`.
    const fn active_run(&self, operation: &'static str) -> Result<RunId, ControllerError> {
        match self.state {
            RunState::RunActive { run_id } => Ok(run_id),
            state => Err(ControllerError::InvalidState { state, operation }),
        }
    }

    /// Close the sink, downgrading failure to a warning.
    fn close_sink(&mut self, run_id: RunId) {
        if let Err(e) = self.sink.close() {
            warn!(%run_id, role = %self.role, error = %e, "failed to close histogram output");
        }
    }

    // -----------------------------------------------------------------------
    // Begin of run
    // -----------------------------------------------------------------------

    /// Start a run.
    ///
    /// Zeroes this worker's counters and hit buffer. The coordinator also
    /// clears the shared hit log. A sink that fails to open is a warning.
    pub fn begin_run(&mut self, run_id: RunId) -> Result<(), ControllerError> {
        if self.state != RunState::Idle {
            return Err(ControllerError::InvalidState {
                state: self.state,
                operation: "begin_run",
            });
        }

        self.counters.reset();
        self.worker_hits.clear();
        if self.role.is_coordinator() {
            self.hit_log.clear();
        }

        self.sink.reset();
        if let Err(e) = self.sink.open(run_id) {
            warn!(%run_id, role = %self.role, error = %e, "failed to open histogram output");
        }

        self.state = RunState::RunActive { run_id };
        debug!(%run_id, role = %self.role, "run started");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Per-step dispatch
    // -----------------------------------------------------------------------

    /// Dispatch one step into counters, hit log and histograms.
    pub fn on_step(&mut self, step: &StepEvent) -> Result<StepOutcome, ControllerError> {
        self.require_role(WorkerRole::Participant, "on_step")?;
        self.active_run("on_step")?;

        let class = match classify(step) {
            Ok(class) => class,
            Err(reason) => {
                trace!(%reason, "step skipped");
                return Ok(StepOutcome::Skipped(reason));
            }
        };

        self.count(class);

        let transitions = class.transitions;
        if transitions.sensor_hit {
            let hit = build_hit(step);
            debug!(
                sensor = %hit.sensor_name,
                copy = %hit.sensor_id,
                time_ns = hit.time,
                local_time_ns = step.local_time,
                x = hit.position.x,
                y = hit.position.y,
                z = hit.position.z,
                wavelength_nm = hit.wavelength,
                pre_volume = step.pre_volume.as_deref().unwrap_or_default(),
                "sensor hit"
            );
            self.fill_sensor_hit(step, &hit);
            self.worker_hits.push(hit.clone());
            self.hit_log.append(hit);
        }

        self.fill_step(step, class);
        Ok(StepOutcome::Recorded(transitions))
    }

    /// Update process counters and tallies for a classified step.
    fn count(&mut self, class: StepClass) {
        if let Some(volume) = class.volume {
            if let Some(process) = class.creator {
                self.counters.increment(Namespace::Creation, volume, process);
            }
            if let Some(process) = class.interaction {
                self.counters.increment(Namespace::Interaction, volume, process);
            }
        }
        self.counters.bump(Tally::for_volume(class.volume));

        let transitions = class.transitions;
        if transitions.entered_fiber {
            self.counters.bump(Tally::PhotonsEnteredFiber);
        }
        if transitions.exited_fiber {
            self.counters.bump(Tally::PhotonsExitedFiber);
        }
        if transitions.absorbed_fiber {
            self.counters.bump(Tally::PhotonsAbsorbedFiber);
        }
    }

    /// Per-step histogram fills.
    fn fill_step(&mut self, step: &StepEvent, class: StepClass) {
        let sink = &mut self.sink;
        let energy = step.total_energy;
        let wavelength = wavelength_nm(energy);
        let edep_mev = step.deposited_energy / EV_PER_MEV;

        if class.wls_created {
            sink.fill_1d(H1::PhotonEnergyAfterWls, energy);
            sink.fill_1d(H1::PhotonWavelengthAfterWls, wavelength);
            sink.fill_1d(H1::WlsEmissionSpectrum, wavelength);
        } else if class.absorbed_by_wls() {
            sink.fill_1d(H1::PhotonEnergyBeforeWls, energy);
            sink.fill_1d(H1::PhotonWavelengthBeforeWls, wavelength);
        }

        sink.fill_1d(H1::EnergyDeposit, edep_mev);
        let time = step.start_time();
        sink.fill_1d(H1::Time, time);
        fill_projections(sink, H2::TIMING, step.position, time);
        fill_projections(sink, H2::EDEP, step.position, edep_mev);

        match class.volume {
            Some(Volume::FiberClad) => {
                sink.fill_1d(H1::CladdingWavelength, wavelength);
                sink.fill_1d(H1::CladdingEnergy, energy);
                fill_projections(sink, H2::CLAD, step.position, edep_mev);
            }
            Some(Volume::FiberCore) => {
                sink.fill_1d(H1::CoreWavelength, wavelength);
                sink.fill_1d(H1::CoreEnergy, energy);
                fill_projections(sink, H2::CORE, step.position, edep_mev);
            }
            _ => {}
        }
    }

    /// Histogram fills for a sensor hit, projected at the point where the
    /// photon entered the sensor.
    fn fill_sensor_hit(&mut self, step: &StepEvent, hit: &Hit) {
        self.sink.fill_1d(H1::SipmTimeSpectrum, hit.time);
        self.sink.fill_1d(H1::SipmWavelength, hit.wavelength);
        fill_projections(&mut self.sink, H2::SIPM_TIMING, step.end_position(), hit.time);
    }

    // -----------------------------------------------------------------------
    // End of run
    // -----------------------------------------------------------------------

    /// Finish a participant's run and hand over its counters.
    ///
    /// The returned copy is what the coordinator merges; the controller keeps
    /// its own values readable until the next `begin_run`.
    pub fn finish_worker(&mut self) -> Result<WorkerCounters, ControllerError> {
        self.require_role(WorkerRole::Participant, "finish_worker")?;
        let run_id = self.active_run("finish_worker")?;
        self.state = RunState::Merging { run_id };

        self.close_sink(run_id);
        let contribution = self.counters.clone();

        self.state = RunState::Idle;
        debug!(%run_id, hits = self.worker_hits.len(), "worker finished run");
        Ok(contribution)
    }

    /// Finish the run on the coordinator.
    ///
    /// `contributions` are the counters returned by every participant's
    /// [`RunController::finish_worker`]. The caller must have joined those
    /// workers first; taking the counters by value enforces that they are no
    /// longer being mutated. A report that cannot be written is a warning.
    pub fn end_run(
        &mut self,
        contributions: Vec<WorkerCounters>,
    ) -> Result<RunSummary, ControllerError> {
        self.require_role(WorkerRole::Coordinator, "end_run")?;
        let run_id = self.active_run("end_run")?;
        self.state = RunState::Merging { run_id };

        let registry = Arc::clone(self.counters.registry());
        let totals = registry.merge(contributions);
        let fiber = FiberYield::from_totals(&totals);

        let hits = self.hit_log.snapshot();
        let width = self.report.bin_width_ns;
        let report_path = if self.report.enabled {
            let rows = bin_hits(&hits, width);
            match write_report(&self.report.output_dir, run_id, &rows) {
                Ok(path) => path,
                Err(e) => {
                    warn!(%run_id, error = %e, "failed to write sensor hit report");
                    None
                }
            }
        } else {
            None
        };
        let sensor_bins = sensor_bins(&hits, width);

        self.close_sink(run_id);
        self.state = RunState::Idle;

        info!(
            %run_id,
            workers = totals.workers_merged(),
            hits = hits.len(),
            trapping_efficiency = fiber.trapping_efficiency,
            "run finished"
        );

        Ok(RunSummary {
            run_id,
            totals,
            fiber,
            hit_count: hits.len(),
            sensor_bins,
            report_path,
            finished_at: Utc::now(),
        })
    }
}
