//! Multi-threaded run loop.
//!
//! For each run the coordinator controller is started first, then one
//! participant controller per worker thread processes its share of events.
//! Events are dealt round-robin by index so that all steps of an event stay
//! on one worker. Joining the scoped threads is the merge barrier: the
//! coordinator only sees participant counters after every worker returned.

use std::sync::Arc;
use std::thread;

use fibertrace_core::config::AnalysisConfig;
use fibertrace_core::controller::{ControllerError, RunController};
use fibertrace_core::counters::{CounterRegistry, WorkerCounters};
use fibertrace_core::histogram::{HistogramSink, MemorySink, NullSink};
use fibertrace_core::hits::HitLog;
use fibertrace_core::summary::RunSummary;
use fibertrace_types::{RunId, WorkerRole};
use tracing::{debug, error, info};

use crate::error::EngineError;
use crate::source::Event;

/// Owns the process-wide state shared by every run.
#[derive(Debug)]
pub struct Engine {
    /// Frozen counter registry.
    registry: Arc<CounterRegistry>,
    /// Shared hit log, cleared by the coordinator at each run start.
    hit_log: Arc<HitLog>,
    /// Loaded configuration.
    config: AnalysisConfig,
}

impl Engine {
    /// Build the registry with the default counter keys and an empty log.
    pub fn new(config: AnalysisConfig) -> Self {
        let registry = Arc::new(CounterRegistry::with_defaults());
        info!(
            counters = registry.len(),
            workers = config.engine.workers,
            "counter registry frozen"
        );
        Self {
            registry,
            hit_log: Arc::new(HitLog::new()),
            config,
        }
    }

    /// The configuration this engine runs with.
    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Histogram backend for one controller.
    fn make_sink(&self) -> Box<dyn HistogramSink> {
        if self.config.histograms.enabled {
            Box::new(MemorySink::new())
        } else {
            Box::new(NullSink)
        }
    }

    /// Controller for one worker context.
    fn controller(&self, role: WorkerRole) -> RunController<Box<dyn HistogramSink>> {
        RunController::with_sink(
            role,
            &self.registry,
            Arc::clone(&self.hit_log),
            self.config.report.clone(),
            self.make_sink(),
        )
    }

    /// Process one run over `events` and return the coordinator's summary.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::WorkerPanicked`] if a worker thread panicked,
    /// or [`EngineError::Controller`] if a controller was driven out of
    /// order.
    pub fn execute_run(&self, run_id: RunId, events: &[Event]) -> Result<RunSummary, EngineError> {
        let workers = self.config.engine.workers.max(1);
        info!(run_id = %run_id, workers, events = events.len(), "run starting");

        let mut coordinator = self.controller(WorkerRole::Coordinator);
        coordinator.begin_run(run_id)?;

        let contributions = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|slot| {
                    let mut controller = self.controller(WorkerRole::Participant);
                    scope.spawn(move || -> Result<WorkerCounters, ControllerError> {
                        controller.begin_run(run_id)?;
                        let mut steps = 0_u64;
                        for step in events.iter().skip(slot).step_by(workers).flatten() {
                            controller.on_step(step)?;
                            steps = steps.saturating_add(1);
                        }
                        debug!(run_id = %run_id, worker = slot, steps, "worker finished");
                        controller.finish_worker()
                    })
                })
                .collect();

            let mut contributions = Vec::with_capacity(workers);
            let mut failure = None;
            for (worker, handle) in handles.into_iter().enumerate() {
                match handle.join() {
                    Ok(Ok(counters)) => contributions.push(counters),
                    Ok(Err(source)) => {
                        error!(run_id = %run_id, worker, error = %source, "worker failed");
                        failure.get_or_insert(EngineError::from(source));
                    }
                    Err(_) => {
                        error!(run_id = %run_id, worker, "worker panicked");
                        failure.get_or_insert(EngineError::WorkerPanicked { worker, run_id });
                    }
                }
            }
            failure.map_or(Ok(contributions), Err)
        })?;

        Ok(coordinator.end_run(contributions)?)
    }
}
