//! Counter aggregation, hit collection, run lifecycle, and reporting for
//! fibertrace.
//!
//! This crate owns everything between the simulation engine's per-step
//! callback and the end-of-run report: each worker context counts into its
//! own counters, sensor hits go into one shared log, and the coordinator
//! merges, derives the trapping efficiency, and writes the binned report.
//!
//! # Modules
//!
//! - [`counters`] -- [`CounterRegistry`], per-worker counters and their merge.
//! - [`hits`] -- The shared, append-only [`HitLog`].
//! - [`classify`] -- Pure step classification and fibre boundary rules.
//! - [`controller`] -- [`RunController`] and the run state machine.
//! - [`binning`] -- Sensor grouping and fixed-width time bins.
//! - [`report`] -- The per-run CSV writer.
//! - [`metrics`] -- Trapping efficiency and [`FiberYield`].
//! - [`summary`] -- [`RunSummary`] and the console summary.
//! - [`histogram`] -- [`HistogramSink`] trait and the histogram catalogue.
//! - [`config`] -- Configuration loading from `fibertrace-config.yaml`.
//!
//! [`CounterRegistry`]: counters::CounterRegistry
//! [`HitLog`]: hits::HitLog
//! [`RunController`]: controller::RunController
//! [`FiberYield`]: metrics::FiberYield
//! [`RunSummary`]: summary::RunSummary
//! [`HistogramSink`]: histogram::HistogramSink

pub mod binning;
pub mod classify;
pub mod config;
pub mod controller;
pub mod counters;
pub mod histogram;
pub mod hits;
pub mod metrics;
pub mod report;
pub mod summary;
