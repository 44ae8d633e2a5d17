//! Step sources feeding the run loop.
//!
//! An event is the ordered list of steps of one primary photon and its
//! descendants. Events are the unit of work distribution: every step of an
//! event is processed by the same worker.
//!
//! - [`ReplaySource`] reads recorded events from a JSON-lines file.
//! - [`SyntheticSource`] generates seeded photon tracks through the tile,
//!   the fibre and the sensors.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use fibertrace_types::{ParticleKind, RunId, StepEvent, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::debug;

/// The steps of one event, in processing order.
pub type Event = Vec<StepEvent>;

/// Errors raised while producing events.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The replay file could not be opened or read.
    #[error("failed to read replay file {path}: {source}")]
    Io {
        /// The replay file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A replay line is not a step or a list of steps.
    #[error("replay line {line} is not a step event: {source}")]
    Parse {
        /// One-based line number.
        line: usize,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

/// A producer of events for each run.
pub trait StepSource {
    /// Events to process in run `run_id`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the events cannot be produced.
    fn events(&mut self, run_id: RunId) -> Result<Vec<Event>, SourceError>;
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

/// One line of a replay file: a whole event or a single-step event.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReplayLine {
    /// An event given as an array of steps.
    Event(Vec<StepEvent>),
    /// A single step forming its own event.
    Step(StepEvent),
}

/// Replays the same recorded events in every run.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    /// Parsed events.
    events: Vec<Event>,
}

impl ReplaySource {
    /// Load a JSON-lines replay file.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Io`] if the file cannot be read, or
    /// [`SourceError::Parse`] naming the first malformed line.
    pub fn from_file(path: &Path) -> Result<Self, SourceError> {
        let io_error = |source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_error)?;
        let source = Self::from_reader(BufReader::new(file)).map_err(|e| match e {
            SourceError::Io { source, .. } => io_error(source),
            other => other,
        })?;
        debug!(path = %path.display(), events = source.events.len(), "replay file loaded");
        Ok(source)
    }

    /// Parse JSON lines from any reader. Blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Parse`] naming the first malformed line.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, SourceError> {
        let mut events = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| SourceError::Io {
                path: PathBuf::new(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let parsed: ReplayLine =
                serde_json::from_str(&line).map_err(|source| SourceError::Parse {
                    line: index.saturating_add(1),
                    source,
                })?;
            events.push(match parsed {
                ReplayLine::Event(steps) => steps,
                ReplayLine::Step(step) => vec![step],
            });
        }
        Ok(Self { events })
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the file held no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl StepSource for ReplaySource {
    fn events(&mut self, _run_id: RunId) -> Result<Vec<Event>, SourceError> {
        Ok(self.events.clone())
    }
}

// ---------------------------------------------------------------------------
// Synthetic
// ---------------------------------------------------------------------------

/// Sensors at the two fibre ends: physical volume name and copy number.
const SENSORS: [(&str, i32); 2] = [("Sipm_PV_0", 0), ("Sipm_PV_1", 1)];

/// Generates photon tracks from a seeded generator.
///
/// Each event is one scintillation (or Cerenkov) photon starting in the
/// tile. It may be absorbed there, or reach the fibre, be shifted by WLS in
/// the core and the re-emitted photon then reaches a sensor, leaves the
/// fibre, or is absorbed. Every tenth event also carries a non-photon step.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    /// Base seed; each run derives its own stream from it.
    seed: u64,
    /// Events generated per run.
    events_per_run: u64,
}

impl SyntheticSource {
    /// Create a generator.
    pub const fn new(seed: u64, events_per_run: u64) -> Self {
        Self {
            seed,
            events_per_run,
        }
    }
}

impl StepSource for SyntheticSource {
    fn events(&mut self, run_id: RunId) -> Result<Vec<Event>, SourceError> {
        let mut rng =
            StdRng::seed_from_u64(self.seed.wrapping_add(u64::from(run_id.into_inner())));
        let events = (0..self.events_per_run)
            .map(|index| TrackBuilder::new(&mut rng).build(index))
            .collect();
        Ok(events)
    }
}

/// Builds the steps of one photon track.
struct TrackBuilder<'a> {
    /// Generator shared across the run.
    rng: &'a mut StdRng,
    /// Steps built so far.
    steps: Vec<StepEvent>,
    /// Global time of the last step (ns).
    time: f64,
    /// Position of the last step (mm).
    position: Vec3,
}

impl<'a> TrackBuilder<'a> {
    fn new(rng: &'a mut StdRng) -> Self {
        let position = Vec3::new(
            rng.random_range(-150.0..150.0),
            rng.random_range(-150.0..150.0),
            rng.random_range(-5.0..5.0),
        );
        let time = rng.random_range(0.0..10.0);
        Self {
            rng,
            steps: Vec::new(),
            time,
            position,
        }
    }

    /// Append one step and advance time and position.
    fn push(
        &mut self,
        pre: &str,
        post: &str,
        creator: &str,
        interaction: &str,
        energy: f64,
        sensor: Option<(&str, i32)>,
    ) {
        let (start_time, start) = (self.time, self.position);
        self.time += self.rng.random_range(0.05..40.0);
        self.position = Vec3::new(
            start.x * 0.5,
            start.y + self.rng.random_range(-20.0..20.0),
            start.z * 0.5,
        );
        self.steps.push(StepEvent {
            particle: ParticleKind::OpticalPhoton,
            pre_volume: Some(pre.to_owned()),
            post_volume: Some(post.to_owned()),
            creator_process: Some(creator.to_owned()),
            interaction_process: Some(interaction.to_owned()),
            global_time: self.time,
            pre_global_time: Some(start_time),
            local_time: self.time,
            position: start,
            post_position: Some(self.position),
            total_energy: energy,
            deposited_energy: 0.0,
            sensor_copy_number: sensor.map_or(0, |(_, copy)| copy),
            sensor_name: sensor.map(|(name, _)| name.to_owned()),
        });
    }

    /// Generate the whole track for event number `index`.
    fn build(mut self, index: u64) -> Event {
        if index.is_multiple_of(10) {
            self.push_charged_step();
        }

        let creator = if self.rng.random_bool(0.1) {
            "Cerenkov"
        } else {
            "Scintillation"
        };
        let blue = self.rng.random_range(2.6..3.2);

        self.push("Tile", "Tile", creator, "Transportation", blue, None);
        if self.rng.random_bool(0.3) {
            self.push("Tile", "Tile", creator, "OpAbsorption", blue, None);
            return self.steps;
        }
        if self.rng.random_bool(0.4) {
            self.push("Tile", "World", creator, "Transportation", blue, None);
            return self.steps;
        }

        self.push("Tile", "FiberClad", creator, "Transportation", blue, None);
        if self.rng.random_bool(0.2) {
            self.push("FiberClad", "Tile", creator, "Transportation", blue, None);
            return self.steps;
        }
        self.push("FiberClad", "FiberCore", creator, "Transportation", blue, None);
        self.push("FiberCore", "FiberCore", creator, "OpWLS", blue, None);

        let green = self.rng.random_range(2.2..2.5);
        self.push("FiberCore", "FiberCore", "OpWLS", "Transportation", green, None);
        let fate: f64 = self.rng.random();
        if fate < 0.45 {
            let [near, far] = SENSORS;
            let sensor = if self.rng.random_bool(0.5) { far } else { near };
            self.push("FiberCore", "Sipm", "OpWLS", "Transportation", green, Some(sensor));
            self.push("Sipm", "Sipm", "OpWLS", "OpAbsorption", green, Some(sensor));
        } else if fate < 0.75 {
            self.push("FiberCore", "FiberClad", "OpWLS", "Transportation", green, None);
            self.push("FiberClad", "Tile", "OpWLS", "Transportation", green, None);
        } else {
            self.push("FiberCore", "FiberCore", "OpWLS", "OpAbsorption", green, None);
        }
        self.steps
    }

    /// A non-photon step the controller must skip.
    fn push_charged_step(&mut self) {
        self.steps.push(StepEvent {
            particle: ParticleKind::Other,
            pre_volume: Some("Tile".to_owned()),
            post_volume: Some("Tile".to_owned()),
            creator_process: None,
            interaction_process: Some("eIoni".to_owned()),
            global_time: self.time,
            pre_global_time: Some(self.time),
            local_time: 0.0,
            position: self.position,
            post_position: Some(self.position),
            total_energy: 1.0e6,
            deposited_energy: 250.0,
            sensor_copy_number: 0,
            sensor_name: None,
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn replay_accepts_steps_and_events() {
        let text = r#"{"particle":"optical_photon","pre_volume":"Tile","global_time":1.0,"position":{"x":0.0,"y":0.0,"z":0.0},"total_energy":2.9}

[{"particle":"optical_photon","pre_volume":"FiberCore","post_volume":"Sipm","creator_process":"OpWLS","global_time":5.0,"position":{"x":0.0,"y":1.0,"z":0.0},"total_energy":2.4},{"particle":"e-","pre_volume":"Tile","global_time":6.0,"position":{"x":0.0,"y":0.0,"z":0.0},"total_energy":1.0}]
"#;
        let mut source = ReplaySource::from_reader(Cursor::new(text)).unwrap();
        assert_eq!(source.len(), 2);
        let events = source.events(RunId::new(0)).unwrap();
        assert_eq!(events[0].len(), 1);
        assert_eq!(events[1].len(), 2);
        assert_eq!(events[1][1].particle, ParticleKind::Other);
    }

    #[test]
    fn replay_reports_the_bad_line() {
        let text = "{\"particle\":\"optical_photon\",\"global_time\":1.0,\"position\":{\"x\":0,\"y\":0,\"z\":0},\"total_energy\":1.0}\nnot json\n";
        let err = ReplaySource::from_reader(Cursor::new(text)).unwrap_err();
        assert!(matches!(err, SourceError::Parse { line: 2, .. }));
    }

    #[test]
    fn missing_replay_file_is_an_io_error() {
        let err = ReplaySource::from_file(Path::new("/nonexistent/steps.jsonl")).unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }

    #[test]
    fn synthetic_is_deterministic_per_seed_and_run() {
        let mut a = SyntheticSource::new(42, 200);
        let mut b = SyntheticSource::new(42, 200);
        assert_eq!(a.events(RunId::new(1)).unwrap(), b.events(RunId::new(1)).unwrap());
        assert_ne!(a.events(RunId::new(1)).unwrap(), a.events(RunId::new(2)).unwrap());
    }

    #[test]
    fn synthetic_tracks_follow_the_light_path() {
        let mut source = SyntheticSource::new(7, 2_000);
        let events = source.events(RunId::new(0)).unwrap();
        assert_eq!(events.len(), 2_000);

        let steps: Vec<&StepEvent> = events.iter().flatten().collect();
        let hits = steps
            .iter()
            .filter(|s| {
                s.pre_volume.as_deref() == Some("FiberCore")
                    && s.post_volume.as_deref() == Some("Sipm")
            })
            .count();
        assert!(hits > 0);
        assert!(steps.iter().all(|s| s.sensor_name.is_none()
            || s.sensor_name.as_deref().is_some_and(|n| n.starts_with("Sipm_PV_"))));
        assert!(steps.iter().any(|s| s.particle == ParticleKind::Other));
        for event in &events {
            for step in event {
                assert!(step.start_time() <= step.global_time);
            }
            for pair in event.windows(2) {
                assert!(pair[0].global_time <= pair[1].global_time);
                assert_eq!(pair[0].end_position(), pair[1].position);
            }
        }
    }
}
