//! # Skirmish Core
//!
//! Deterministic target acquisition and cloaking for a tile-based
//! real-time strategy simulation.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No file IO
//! - No system randomness (cloak rolls take a caller-supplied RNG)
//! - No floating-point math (uses fixed-point)
//!
//! ## Crate Structure
//!
//! - [`threat`] - Scores a single candidate target for an observer
//! - [`search`] - Ring and full-map scans for the greatest threat
//! - [`combat`] - Weapon ranges, weapon selection and fire legality
//! - [`cloak`] - Cloaking device state machine and visual character
//! - [`grid`] - Cells, occupants and movement zones
//! - [`simulation`] - Fixed-tick loop tying the above together
//! - [`data`] - RON catalog and scenario loading

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod cloak;
pub mod combat;
pub mod data;
pub mod entity;
pub mod error;
pub mod grid;
pub mod house;
pub mod math;
pub mod rules;
pub mod search;
pub mod simulation;
pub mod techno_type;
pub mod threat;
pub mod weapon;
pub mod world;

#[cfg(test)]
mod testing;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cloak::{cloaking_ai, visual_character, CloakEvent, VisualType};
    pub use crate::combat::{Combatant, FireStatus};
    pub use crate::data::{Catalog, Scenario};
    pub use crate::entity::{CloakState, CombatEntity, Mission, Target, TargetHandle};
    pub use crate::error::{CoreError, Result};
    pub use crate::grid::{CellCoord, SpatialGrid};
    pub use crate::house::HouseId;
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::rules::RulesConfig;
    pub use crate::search::{greatest_threat, target_something_nearby};
    pub use crate::simulation::{Simulation, TickEvents};
    pub use crate::threat::{ThreatEvaluator, ThreatMethod};
    pub use crate::weapon::WeaponSlot;
    pub use crate::world::World;
}
