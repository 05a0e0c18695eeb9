//! Core simulation loop.
//!
//! The simulation owns a [`World`] and a seeded random stream, and advances
//! every placed object once per tick: weapons rearm, cloaking devices run,
//! and objects on a target-seeking mission look for something to attack.
//!
//! # Determinism
//!
//! All operations in this module are fully deterministic:
//! - No floating-point math (uses fixed-point via [`Fixed`](crate::math::Fixed))
//! - No system randomness (cloak rolls come from a seeded `ChaCha8Rng`)
//! - Consistent iteration order (sorted entity handles)
//! - Same world and seed always produce the same state hash
//!
//! # Example
//!
//! ```ignore
//! use skirmish_core::simulation::Simulation;
//!
//! let mut sim = Simulation::new(world, 42);
//! let events = sim.tick();
//! for (handle, event) in &events.cloak_events {
//!     println!("{handle:?}: {event:?}");
//! }
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::cloak::{cloaking_ai, CloakEvent};
use crate::combat::Combatant;
use crate::entity::{Mission, Target, TargetHandle};
use crate::error::{CoreError, Result};
use crate::search::target_something_nearby;
use crate::threat::ThreatMethod;
use crate::world::World;

/// Ticks per second for the simulation.
pub const TICK_RATE: u32 = 15;

/// Duration of one tick in milliseconds.
pub const TICK_DURATION_MS: u32 = 1000 / TICK_RATE;

/// An observer's target changed during acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetChange {
    /// The observer.
    pub handle: TargetHandle,
    /// Target before the tick.
    pub previous: Option<Target>,
    /// Target after the tick.
    pub current: Option<Target>,
}

/// Events generated during a simulation tick.
///
/// These events can be used by a presentation layer to trigger effects,
/// sounds, cursor changes, etc.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// Cloak transitions, tagged with the object they happened to.
    pub cloak_events: Vec<(TargetHandle, CloakEvent)>,
    /// Target acquisitions and losses.
    pub target_changes: Vec<TargetChange>,
}

impl TickEvents {
    /// Whether nothing observable happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cloak_events.is_empty() && self.target_changes.is_empty()
    }
}

/// Scan method a mission uses when looking for targets.
///
/// Guarding objects only look within weapon range, area guards and
/// ambushers within the guard radius, and hunters search the whole map.
#[must_use]
pub fn acquisition_method(mission: Mission) -> Option<ThreatMethod> {
    match mission {
        Mission::Guard => Some(ThreatMethod::RANGE | ThreatMethod::NORMAL),
        Mission::AreaGuard | Mission::Ambush => Some(ThreatMethod::AREA | ThreatMethod::NORMAL),
        Mission::Hunt => Some(ThreatMethod::NORMAL),
        _ => None,
    }
}

/// The skirmish simulation.
///
/// # System Execution Order
///
/// Each tick, every placed object is visited in ascending handle order and
/// runs, in this order:
/// 1. **Rearm** - weapon cooldown counts down
/// 2. **Cloak** - the cloaking device state machine advances
/// 3. **Acquisition** - target-seeking missions keep or replace their target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    /// Current simulation tick.
    tick: u64,
    /// The world being simulated.
    world: World,
    /// Source of cloak reliability rolls.
    rng: ChaCha8Rng,
}

impl Simulation {
    /// Create a simulation over `world` with a seeded random stream.
    #[must_use]
    pub fn new(world: World, seed: u64) -> Self {
        Self {
            tick: 0,
            world,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Get the current tick number.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// The simulated world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access for setup and scripted changes between ticks.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Advance the simulation by one tick.
    ///
    /// Returns events generated during this tick.
    pub fn tick(&mut self) -> TickEvents {
        let mut events = TickEvents::default();

        for handle in self.world.entities.sorted_ids() {
            let active = self
                .world
                .entity(handle)
                .is_some_and(|entity| entity.is_active());
            if !active {
                continue;
            }

            self.run_rearm(handle);

            for event in cloaking_ai(&mut self.world, handle, &mut self.rng) {
                events.cloak_events.push((handle, event));
            }

            if let Some(change) = self.run_acquisition(handle) {
                events.target_changes.push(change);
            }
        }

        self.tick += 1;
        tracing::debug!(tick = self.tick, hash = self.state_hash(), "Tick complete");
        events
    }

    fn run_rearm(&mut self, handle: TargetHandle) {
        if let Some(entity) = self.world.entity_mut(handle) {
            entity.arm = entity.arm.saturating_sub(1);
        }
    }

    fn run_acquisition(&mut self, handle: TargetHandle) -> Option<TargetChange> {
        let (mission, previous) = {
            let me = Combatant::new(&self.world, handle)?;
            if !me.is_armed() {
                return None;
            }
            (me.entity().mission, me.entity().target)
        };
        let method = acquisition_method(mission)?;

        target_something_nearby(&mut self.world, handle, method);
        let current = self.world.entity(handle)?.target;
        (current != previous).then_some(TargetChange {
            handle,
            previous,
            current,
        })
    }

    /// Calculate a hash of the current simulation state.
    ///
    /// Used for desync detection. Two simulations with identical state will
    /// produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.rng.get_word_pos().hash(&mut hasher);

        let ids = self.world.entities.sorted_ids();
        ids.len().hash(&mut hasher);

        for id in ids {
            if let Some(entity) = self.world.entity(id) {
                id.hash(&mut hasher);
                entity.owner.hash(&mut hasher);
                entity.strength.hash(&mut hasher);
                entity.position.x.to_bits().hash(&mut hasher);
                entity.position.y.to_bits().hash(&mut hasher);
                entity.altitude.to_bits().hash(&mut hasher);
                entity.in_limbo.hash(&mut hasher);
                entity.mission.hash(&mut hasher);

                entity.cloak.hash(&mut hasher);
                entity.cloak_stage.hash(&mut hasher);
                entity.cloak_delay.hash(&mut hasher);
                entity.scattered.hash(&mut hasher);

                entity.arm.hash(&mut hasher);
                entity.target.hash(&mut hasher);
            }
        }

        hasher.finish()
    }

    /// Serialize the simulation state, random stream included.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| CoreError::Snapshot(format!("Failed to serialize simulation: {e}")))
    }

    /// Deserialize simulation state from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| CoreError::Snapshot(format!("Failed to deserialize simulation: {e}")))
    }
}
