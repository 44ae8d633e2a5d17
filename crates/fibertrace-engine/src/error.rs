//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps every failure
//! mode of startup and the run loop.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: fibertrace_core::config::ConfigError,
    },

    /// The step source could not produce events.
    #[error("step source error: {source}")]
    Source {
        /// The underlying source error.
        #[from]
        source: crate::source::SourceError,
    },

    /// A controller was driven out of order.
    #[error("lifecycle error: {source}")]
    Controller {
        /// The underlying controller error.
        #[from]
        source: fibertrace_core::controller::ControllerError,
    },

    /// A worker thread panicked before handing over its counters.
    #[error("worker {worker} panicked during run {run_id}")]
    WorkerPanicked {
        /// Slot of the failed worker.
        worker: usize,
        /// Run being processed.
        run_id: fibertrace_types::RunId,
    },
}
