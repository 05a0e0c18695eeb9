//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Target acquisition must be reproducible for replays and lockstep play.
//! Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`skirmish_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Entities are always visited in sorted handle order.
//!
//! - **System randomness**: Cloak reliability rolls come from the
//!   simulation's seeded `ChaCha8Rng`, never from the thread RNG.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual module determinism (scoring, scans, cloaking)
//! 2. **Property tests**: Random placements must still produce deterministic outputs
//! 3. **Integration tests**: Full scenarios are reproducible
//! 4. **Parallel tests**: Running N simulations in parallel all match

use std::thread;

use skirmish_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a [`Simulation`] twice from identical setup and compare final hashes.
///
/// # Example
///
/// ```ignore
/// use skirmish_test_utils::determinism::verify_simulation_determinism;
/// use skirmish_test_utils::fixtures::river_skirmish_world;
///
/// assert!(verify_simulation_determinism(
///     || Simulation::new(river_skirmish_world(), 42),
///     300,
/// ));
/// ```
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let result = verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim| {
            sim.tick();
        },
        |sim| sim.state_hash(),
    );
    result.is_deterministic
}

/// Result of parallel simulation runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state hash from each simulation.
    pub hashes: Vec<u64>,
    /// Number of ticks each simulation ran.
    pub ticks: u64,
    /// Number of simulations run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all simulations produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all simulations matched.
    ///
    /// # Panics
    ///
    /// Panics if simulations produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel simulations diverged!\n\
                 Simulations: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run N simulations on scoped threads and collect final hashes.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_simulations<F>(setup_fn: F, num_sims: usize, num_ticks: u64) -> ParallelSimResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.tick();
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    ParallelSimResult {
        hashes,
        ticks: num_ticks,
        num_sims,
    }
}

/// Compare two simulation runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if simulations are deterministic, `Some(tick)` if they diverge
/// at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        let events1 = sim1.tick();
        let events2 = sim2.tick();

        if events1 != events2 || sim1.state_hash() != sim2.state_hash() {
            tracing::warn!(tick, "Simulations diverged");
            return Some(tick);
        }
    }

    None
}

/// Verify that a snapshot round-trip preserves state and the random stream.
///
/// The restored simulation must match the original at the snapshot point
/// and after `resume_ticks` further ticks.
pub fn verify_serialization_determinism<F>(setup_fn: F, num_ticks: u64, resume_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let mut sim = setup_fn();

    for _ in 0..num_ticks {
        sim.tick();
    }

    let Ok(bytes) = sim.serialize() else {
        return false;
    };
    let Ok(mut restored) = Simulation::deserialize(&bytes) else {
        return false;
    };

    if restored.state_hash() != sim.state_hash() {
        return false;
    }
    for _ in 0..resume_ticks {
        if restored.tick() != sim.tick() {
            return false;
        }
    }
    restored.state_hash() == sim.state_hash()
}

/// Proptest strategies for scan and simulation properties.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing.
pub mod strategies {
    use proptest::prelude::*;
    use skirmish_core::entity::Mission;
    use skirmish_core::house::HouseId;
    use skirmish_core::threat::ThreatMethod;

    use crate::fixtures::{ENGLAND, GREECE, USSR};

    /// Mobile types from the standard catalog that carry a weapon.
    pub const ARMED_MOBILE: &[&str] = &["E1", "1TNK", "4TNK", "JEEP", "ARTY", "STNK", "DOG", "MEDI"];

    /// Every ground type from the standard catalog.
    pub const GROUND_TYPES: &[&str] = &[
        "E1", "MEDI", "MECH", "DOG", "SPY", "1TNK", "4TNK", "JEEP", "APC", "ARTY", "HARV", "STNK",
        "POWR", "WEAP", "PROC", "FAKE", "GUN", "SAM",
    ];

    /// A placement request.
    #[derive(Debug, Clone)]
    pub struct Placement {
        /// Type name.
        pub type_name: &'static str,
        /// Owner.
        pub house: HouseId,
        /// Cell x.
        pub x: i32,
        /// Cell y.
        pub y: i32,
    }

    /// Generate a cell inside a `size` x `size` map, leaving room for
    /// building footprints.
    pub fn arb_cell(size: i32) -> impl Strategy<Value = (i32, i32)> {
        (0..size - 3, 0..size - 3)
    }

    /// Generate a house among Greece, USSR and England.
    pub fn arb_house() -> impl Strategy<Value = HouseId> {
        prop_oneof![Just(GREECE), Just(USSR), Just(ENGLAND)]
    }

    /// Generate a placement of any ground type.
    pub fn arb_placement(size: i32) -> impl Strategy<Value = Placement> {
        (proptest::sample::select(GROUND_TYPES), arb_house(), arb_cell(size)).prop_map(
            |(type_name, house, (x, y))| Placement {
                type_name,
                house,
                x,
                y,
            },
        )
    }

    /// Generate a list of placements.
    pub fn arb_placements(size: i32, max: usize) -> impl Strategy<Value = Vec<Placement>> {
        proptest::collection::vec(arb_placement(size), 0..max)
    }

    /// Generate a scan method.
    pub fn arb_method() -> impl Strategy<Value = ThreatMethod> {
        let scope = prop_oneof![
            Just(ThreatMethod::RANGE),
            Just(ThreatMethod::AREA),
            Just(ThreatMethod::empty()),
        ];
        let filter = prop_oneof![
            Just(ThreatMethod::NORMAL),
            Just(ThreatMethod::GROUND),
            Just(ThreatMethod::INFANTRY),
            Just(ThreatMethod::VEHICLES | ThreatMethod::BUILDINGS),
            Just(ThreatMethod::CIVILIANS),
        ];
        (scope, filter).prop_map(|(scope, filter)| scope | filter)
    }

    /// Generate a target-seeking mission.
    pub fn arb_seeking_mission() -> impl Strategy<Value = Mission> {
        prop_oneof![
            Just(Mission::Guard),
            Just(Mission::AreaGuard),
            Just(Mission::Ambush),
            Just(Mission::Hunt),
        ]
    }

    /// Generate a health percentage.
    pub fn arb_health_percent() -> impl Strategy<Value = u32> {
        1u32..=100u32
    }
}
