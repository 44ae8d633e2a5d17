//! Counter registry: per-worker process counters and their reduction.
//!
//! The registry fixes which `(namespace, volume, process)` keys exist. It is
//! built mutably at startup, then frozen behind an [`Arc`] and shared by every
//! worker. Because a frozen registry has no mutating methods, registration
//! cannot happen mid-run.
//!
//! # Design Principles
//!
//! - **Per-worker ownership**: each worker context mutates only its own
//!   [`WorkerCounters`]; the hot path is a bounds-checked slot bump with no
//!   atomics and no locks.
//! - **Dense slots**: every [`CounterKey`] maps to a fixed slot, so lookups
//!   are O(1) and never build strings.
//! - **Post-run reduction**: [`CounterRegistry::merge`] sums worker copies
//!   after the engine has joined its workers. Addition is commutative and
//!   associative, so neither partitioning nor merge order changes totals.
//! - **Never raise on engine input**: increments of unregistered keys are
//!   silently dropped.

use std::borrow::Borrow;
use std::sync::Arc;

use fibertrace_types::{CounterKey, Namespace, Process, Tally, Volume};
use tracing::{debug, warn};

/// Opaque handle to a registered counter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CounterHandle(usize);

impl CounterHandle {
    /// The dense slot this handle refers to.
    pub const fn slot(self) -> usize {
        self.0
    }
}

/// The set of counter keys that exist for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct CounterRegistry {
    /// Registration flag per dense slot.
    registered: Vec<bool>,
    /// Registered keys in registration order (used for summaries).
    keys: Vec<CounterKey>,
}

impl Default for CounterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            registered: vec![false; CounterKey::KEY_SPACE],
            keys: Vec::new(),
        }
    }

    /// Create a registry holding the default cross-product of volumes and
    /// processes (see [`CounterRegistry::register_defaults`]).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_defaults();
        registry
    }

    /// Register a counter key.
    ///
    /// Registering a key twice is a caller bug: debug builds panic, release
    /// builds log at `warn`, return the existing handle and leave the
    /// registry unchanged.
    pub fn register(
        &mut self,
        namespace: Namespace,
        volume: Volume,
        process: Process,
    ) -> CounterHandle {
        let key = CounterKey::new(namespace, volume, process);
        let slot = key.slot();
        match self.registered.get_mut(slot) {
            Some(flag) if *flag => {
                warn!(counter = %key, "counter registered twice, ignoring");
                debug_assert!(false, "counter {key} registered twice");
            }
            Some(flag) => {
                *flag = true;
                self.keys.push(key);
            }
            None => {
                // Unreachable by construction of `slot`; keep the registry
                // unchanged rather than panic.
                warn!(counter = %key, slot, "counter slot out of range");
            }
        }
        CounterHandle(slot)
    }

    /// Register the fixed default key space.
    ///
    /// Volumes `Tile`, `FiberCore`, `FiberClad`, `Sipm` crossed with the
    /// creation processes `Cerenkov`, `Scintillation`, `OpWLS` and, in the
    /// interaction namespace, `OpAbsorption`, `OpWLS`, `Transportation`.
    pub fn register_defaults(&mut self) {
        for volume in Volume::COUNTED {
            for process in Process::CREATION_DEFAULTS {
                self.register(Namespace::Creation, volume, process);
            }
            for process in Process::INTERACTION_DEFAULTS {
                self.register(Namespace::Interaction, volume, process);
            }
        }
        debug!(counters = self.keys.len(), "default counters registered");
    }

    /// Whether `key` has been registered.
    pub fn is_registered(&self, key: CounterKey) -> bool {
        self.registered.get(key.slot()).copied().unwrap_or(false)
    }

    /// Registered keys, in registration order.
    pub fn keys(&self) -> &[CounterKey] {
        &self.keys
    }

    /// Number of registered keys.
    pub const fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no keys are registered.
    pub const fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Create a zeroed worker-private copy of every counter.
    pub fn worker_counters(self: &Arc<Self>) -> WorkerCounters {
        WorkerCounters {
            registry: Arc::clone(self),
            values: vec![0; CounterKey::KEY_SPACE],
            tallies: [0; Tally::COUNT],
        }
    }

    /// Reduce worker copies into master totals by addition.
    ///
    /// Must run after every contributing worker has finished processing the
    /// run. The engine guarantees this by joining its workers before handing
    /// their counters over.
    pub fn merge<I>(self: &Arc<Self>, workers: I) -> MasterTotals
    where
        I: IntoIterator,
        I::Item: Borrow<WorkerCounters>,
    {
        let mut totals = MasterTotals {
            registry: Arc::clone(self),
            values: vec![0; CounterKey::KEY_SPACE],
            tallies: [0; Tally::COUNT],
            workers_merged: 0,
        };
        for worker in workers {
            totals.absorb(worker.borrow());
        }
        totals
    }
}

/// Worker-private counter values.
///
/// Owned and mutated by exactly one worker context.
#[derive(Debug, Clone)]
pub struct WorkerCounters {
    /// The registry defining which keys are live.
    registry: Arc<CounterRegistry>,
    /// Value per dense slot; unregistered slots stay at zero.
    values: Vec<u64>,
    /// Scalar tallies.
    tallies: [u64; Tally::COUNT],
}

impl WorkerCounters {
    /// Increment a process counter.
    ///
    /// Returns `false` (and changes nothing) when the key is unregistered.
    pub fn increment(&mut self, namespace: Namespace, volume: Volume, process: Process) -> bool {
        let key = CounterKey::new(namespace, volume, process);
        if !self.registry.is_registered(key) {
            return false;
        }
        self.values.get_mut(key.slot()).is_some_and(|value| {
            *value = value.saturating_add(1);
            true
        })
    }

    /// Increment a scalar tally.
    pub fn bump(&mut self, tally: Tally) {
        if let Some(value) = self.tallies.get_mut(tally.index()) {
            *value = value.saturating_add(1);
        }
    }

    /// Zero every counter and tally.
    pub fn reset(&mut self) {
        self.values.fill(0);
        self.tallies = [0; Tally::COUNT];
    }

    /// Current worker-local value of a process counter.
    pub fn value(&self, key: CounterKey) -> u64 {
        self.values.get(key.slot()).copied().unwrap_or(0)
    }

    /// Current worker-local value of a tally.
    pub fn tally(&self, tally: Tally) -> u64 {
        self.tallies.get(tally.index()).copied().unwrap_or(0)
    }

    /// The registry this copy was created from.
    pub const fn registry(&self) -> &Arc<CounterRegistry> {
        &self.registry
    }
}

/// Run-level totals reduced from every worker copy.
///
/// Only obtainable from [`CounterRegistry::merge`], so reads of master
/// values cannot precede the merge.
#[derive(Debug, Clone)]
pub struct MasterTotals {
    /// The registry the totals were reduced under.
    registry: Arc<CounterRegistry>,
    /// Summed value per dense slot.
    values: Vec<u64>,
    /// Summed tallies.
    tallies: [u64; Tally::COUNT],
    /// Number of worker copies folded in.
    workers_merged: usize,
}

impl MasterTotals {
    /// Fold one more worker copy into the totals.
    fn absorb(&mut self, worker: &WorkerCounters) {
        for (total, value) in self.values.iter_mut().zip(&worker.values) {
            *total = total.saturating_add(*value);
        }
        for (total, value) in self.tallies.iter_mut().zip(&worker.tallies) {
            *total = total.saturating_add(*value);
        }
        self.workers_merged = self.workers_merged.saturating_add(1);
    }

    /// Merged value of a process counter (zero for unregistered keys).
    pub fn value(&self, key: CounterKey) -> u64 {
        if !self.registry.is_registered(key) {
            return 0;
        }
        self.values.get(key.slot()).copied().unwrap_or(0)
    }

    /// Merged value of a tally.
    pub fn tally(&self, tally: Tally) -> u64 {
        self.tallies.get(tally.index()).copied().unwrap_or(0)
    }

    /// Registered keys with their merged values, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (CounterKey, u64)> + '_ {
        self.registry
            .keys()
            .iter()
            .map(move |&key| (key, self.value(key)))
    }

    /// Number of worker copies that contributed.
    pub const fn workers_merged(&self) -> usize {
        self.workers_merged
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn frozen_defaults() -> Arc<CounterRegistry> {
        Arc::new(CounterRegistry::with_defaults())
    }

    #[test]
    fn defaults_register_the_full_cross_product() {
        let registry = CounterRegistry::with_defaults();
        // 4 volumes x (3 creation + 3 interaction)
        assert_eq!(registry.len(), 24);
        assert!(registry.is_registered(CounterKey::creation(Volume::Tile, Process::Cerenkov)));
        assert!(registry.is_registered(CounterKey::interaction(
            Volume::Sipm,
            Process::Transportation
        )));
        assert!(!registry.is_registered(CounterKey::creation(Volume::World, Process::Cerenkov)));
        assert!(!registry.is_registered(CounterKey::creation(
            Volume::Tile,
            Process::OpAbsorption
        )));
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "registered twice"))]
    fn double_registration_is_a_no_op() {
        let mut registry = CounterRegistry::new();
        let first = registry.register(Namespace::Creation, Volume::Tile, Process::OpWls);
        let second = registry.register(Namespace::Creation, Volume::Tile, Process::OpWls);
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn namespaces_are_independent() {
        let mut registry = CounterRegistry::new();
        registry.register(Namespace::Creation, Volume::Tile, Process::OpWls);
        let registry = Arc::new(registry);
        let mut worker = registry.worker_counters();
        assert!(worker.increment(Namespace::Creation, Volume::Tile, Process::OpWls));
        assert!(!worker.increment(Namespace::Interaction, Volume::Tile, Process::OpWls));
        assert_eq!(
            worker.value(CounterKey::interaction(Volume::Tile, Process::OpWls)),
            0
        );
    }

    #[test]
    fn unregistered_increment_leaves_state_unchanged() {
        let registry = frozen_defaults();
        let mut worker = registry.worker_counters();
        worker.increment(Namespace::Creation, Volume::Tile, Process::Cerenkov);
        let before = worker.values.clone();

        assert!(!worker.increment(Namespace::Creation, Volume::World, Process::Primary));
        assert!(!worker.increment(Namespace::Interaction, Volume::Tile, Process::OpRayleigh));

        assert_eq!(worker.values, before);
    }

    #[test]
    fn reset_zeroes_counters_and_tallies() {
        let registry = frozen_defaults();
        let mut worker = registry.worker_counters();
        worker.increment(Namespace::Creation, Volume::Tile, Process::Scintillation);
        worker.bump(Tally::PhotonsEnteredFiber);
        worker.reset();
        assert_eq!(
            worker.value(CounterKey::creation(Volume::Tile, Process::Scintillation)),
            0
        );
        assert_eq!(worker.tally(Tally::PhotonsEnteredFiber), 0);
    }

    #[test]
    fn merge_sums_workers() {
        let registry = frozen_defaults();
        let key = CounterKey::interaction(Volume::FiberCore, Process::OpWls);
        let mut a = registry.worker_counters();
        let mut b = registry.worker_counters();
        for _ in 0..3 {
            a.increment(key.namespace, key.volume, key.process);
        }
        for _ in 0..5 {
            b.increment(key.namespace, key.volume, key.process);
        }
        a.bump(Tally::CoreSteps);
        b.bump(Tally::CoreSteps);

        let totals = registry.merge([&a, &b]);
        assert_eq!(totals.value(key), 8);
        assert_eq!(totals.tally(Tally::CoreSteps), 2);
        assert_eq!(totals.workers_merged(), 2);
    }

    #[test]
    fn merge_of_nothing_is_all_zero() {
        let registry = frozen_defaults();
        let totals = registry.merge(std::iter::empty::<WorkerCounters>());
        assert!(totals.iter().all(|(_, v)| v == 0));
        assert_eq!(totals.workers_merged(), 0);
    }

    #[test]
    fn merge_is_independent_of_partition_and_order() {
        let registry = frozen_defaults();
        let keys: Vec<CounterKey> = registry.keys().to_vec();
        let mut rng = StdRng::seed_from_u64(0x5eed);

        // One shared stream of increments, including unregistered keys.
        let stream: Vec<(usize, bool)> = (0..2_000)
            .map(|_| (rng.random_range(0..keys.len()), rng.random_bool(0.1)))
            .collect();

        let mut single = registry.worker_counters();
        for &(k, bogus) in &stream {
            let key = keys[k];
            if bogus {
                single.increment(key.namespace, Volume::World, key.process);
            } else {
                single.increment(key.namespace, key.volume, key.process);
            }
        }
        let expected = registry.merge([&single]);

        for workers in [1_usize, 2, 3, 7, 16] {
            let mut copies: Vec<WorkerCounters> =
                (0..workers).map(|_| registry.worker_counters()).collect();
            for &(k, bogus) in &stream {
                let key = keys[k];
                let w = rng.random_range(0..workers);
                if bogus {
                    copies[w].increment(key.namespace, Volume::World, key.process);
                } else {
                    copies[w].increment(key.namespace, key.volume, key.process);
                }
            }

            let forward = registry.merge(copies.iter());
            let backward = registry.merge(copies.iter().rev());
            for &key in &keys {
                assert_eq!(forward.value(key), expected.value(key), "{key} with {workers}");
                assert_eq!(backward.value(key), expected.value(key), "{key} reversed");
            }
        }
    }
}
