//! Combat entities and the generational handle registry.
//!
//! Every reference between entities (targets, radio contact, cargo) is a
//! [`TargetHandle`]: a slot index plus a generation counter. Destroying an
//! entity bumps its slot's generation, so stale handles stop resolving
//! instead of dangling.

use serde::{Deserialize, Serialize};

use crate::grid::CellCoord;
use crate::house::{HouseId, MAX_HOUSES};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::techno_type::{Category, TypeId};

/// Weak reference to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetHandle {
    index: u32,
    generation: u32,
}

impl TargetHandle {
    /// Create a handle from raw parts.
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Slot generation at the time the handle was issued.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

/// Something that can be attacked: an entity or a bare cell (walls).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    /// A live entity.
    Object(TargetHandle),
    /// A map cell, used for wall targets.
    Cell(CellCoord),
}

impl Target {
    /// The entity handle, if this targets an entity.
    #[must_use]
    pub const fn as_object(self) -> Option<TargetHandle> {
        match self {
            Self::Object(handle) => Some(handle),
            Self::Cell(_) => None,
        }
    }
}

/// Current standing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mission {
    /// Idle and inert.
    Sleep,
    /// Hold position and engage anything in weapon range.
    #[default]
    Guard,
    /// Guard an area, pursuing threats a short way.
    AreaGuard,
    /// Lie in wait; not treated as a threat until triggered.
    Ambush,
    /// Seek out enemies anywhere on the map.
    Hunt,
    /// Attack an assigned target.
    Attack,
    /// Move to a destination.
    Move,
    /// Gather resources.
    Harvest,
    /// Capture a building.
    Capture,
    /// Enter a transport or building.
    Enter,
    /// Leave the map.
    Retreat,
    /// Passive; never treated as a threat.
    Harmless,
    /// Stop all activity.
    Stop,
    /// Building under construction.
    Construction,
    /// Building being sold.
    Deconstruction,
    /// Going for repair.
    Repair,
}

impl Mission {
    /// Missions that make an object not worth attacking.
    #[must_use]
    pub const fn is_no_threat(self) -> bool {
        matches!(self, Self::Harmless | Self::Ambush)
    }

    /// Missions that look for targets automatically.
    #[must_use]
    pub const fn seeks_targets(self) -> bool {
        matches!(self, Self::Guard | Self::AreaGuard | Self::Ambush | Self::Hunt)
    }
}

/// Cloaking device state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CloakState {
    /// Fully visible.
    #[default]
    Uncloaked,
    /// Fading out.
    Cloaking,
    /// Fully hidden.
    Cloaked,
    /// Fading in.
    Uncloaking,
}

/// One bit per house that has seen this object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DiscoveryMask(u32);

impl DiscoveryMask {
    /// Whether a house has discovered the object.
    #[must_use]
    pub const fn contains(self, house: HouseId) -> bool {
        (house.0 as usize) < MAX_HOUSES && self.0 & (1 << house.0) != 0
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    pub(crate) fn insert(&mut self, house: HouseId) {
        if (house.0 as usize) < MAX_HOUSES {
            self.0 |= 1 << house.0;
        }
    }
}

/// Per-instance combat state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatEntity {
    /// Own handle.
    pub handle: TargetHandle,
    /// Object type.
    pub type_id: TypeId,
    /// Object kind, copied from the type.
    pub category: Category,
    /// Owning house.
    pub owner: HouseId,
    /// Current health.
    pub strength: i32,
    /// Full health, copied from the type.
    pub max_strength: i32,
    /// Centre in world units.
    pub position: Vec2Fixed,
    /// Cell cached from the grid when placed.
    pub cell: CellCoord,
    /// Flight altitude; zero means landed.
    #[serde(with = "fixed_serde")]
    pub altitude: Fixed,
    /// Not placed on the map.
    pub in_limbo: bool,
    /// Standing order.
    pub mission: Mission,
    /// Cloaking device state. Written only by the cloak state machine.
    pub cloak: CloakState,
    /// Fade progress for the current cloak transition.
    pub cloak_stage: u32,
    /// Ticks until the device may cloak again.
    pub cloak_delay: u32,
    /// Set once a computer-owned unit has scattered after cloaking.
    pub scattered: bool,
    /// Ticks until the weapons are ready again.
    pub arm: u32,
    /// Remaining ammunition; `None` means unlimited.
    pub ammo: Option<u32>,
    /// Number of kills scored.
    pub kills: i64,
    /// Houses that have seen this object.
    pub discovered: DiscoveryMask,
    /// Current target.
    pub target: Option<Target>,
    /// Radio or tow contact with another object.
    pub radio_contact: Option<TargetHandle>,
    /// Passengers carried.
    pub cargo: Vec<TargetHandle>,
    /// Team membership.
    pub team: Option<u16>,
    /// Capture flag being carried, by flag owner.
    pub flag_carried: Option<HouseId>,
    /// Blocks re-cloaking while set.
    pub recloak_suppressed: bool,
}

impl CombatEntity {
    /// New entity in limbo at full health.
    #[must_use]
    pub fn new(
        handle: TargetHandle,
        type_id: TypeId,
        category: Category,
        owner: HouseId,
        max_strength: i32,
    ) -> Self {
        Self {
            handle,
            type_id,
            category,
            owner,
            strength: max_strength,
            max_strength,
            position: Vec2Fixed::ZERO,
            cell: CellCoord::default(),
            altitude: Fixed::ZERO,
            in_limbo: true,
            mission: Mission::Guard,
            cloak: CloakState::Uncloaked,
            cloak_stage: 0,
            cloak_delay: 0,
            scattered: false,
            arm: 0,
            ammo: None,
            kills: 0,
            discovered: DiscoveryMask::default(),
            target: None,
            radio_contact: None,
            cargo: Vec::new(),
            team: None,
            flag_carried: None,
            recloak_suppressed: false,
        }
    }

    /// Placed on the map and alive.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.in_limbo && self.strength > 0
    }

    /// Flying aircraft. Landed aircraft behave like ground vehicles.
    #[must_use]
    pub fn is_airborne(&self) -> bool {
        self.category.can_fly() && self.altitude > Fixed::ZERO
    }

    /// Health as a fraction of full strength.
    #[must_use]
    pub fn health_ratio(&self) -> Fixed {
        if self.max_strength <= 0 {
            return Fixed::ZERO;
        }
        Fixed::from_num(self.strength.max(0)) / Fixed::from_num(self.max_strength)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Slot {
    generation: u32,
    entity: Option<CombatEntity>,
}

/// Generational storage for all entities.
///
/// Iteration is always in ascending slot order so every client processes
/// entities identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStorage {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl EntityStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a handle and insert the entity built for it.
    pub fn insert_with(&mut self, build: impl FnOnce(TargetHandle) -> CombatEntity) -> TargetHandle {
        // Lowest free slot first keeps allocation independent of removal order.
        self.free.sort_unstable_by(|a, b| b.cmp(a));
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entity: None,
                });
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        let handle = TargetHandle::new(index, slot.generation);
        slot.entity = Some(build(handle));
        handle
    }

    /// Remove an entity. Its handle never resolves again.
    pub fn remove(&mut self, handle: TargetHandle) -> Option<CombatEntity> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let entity = slot.entity.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        Some(entity)
    }

    /// Resolve a handle.
    #[must_use]
    pub fn get(&self, handle: TargetHandle) -> Option<&CombatEntity> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.entity.as_ref())
    }

    /// Resolve a handle mutably.
    pub fn get_mut(&mut self, handle: TargetHandle) -> Option<&mut CombatEntity> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.entity.as_mut())
    }

    /// Whether a handle still resolves.
    #[must_use]
    pub fn contains(&self, handle: TargetHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.entity.is_some()).count()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live handles in ascending slot order.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<TargetHandle> {
        self.iter().map(|e| e.handle).collect()
    }

    /// Live entities in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = &CombatEntity> {
        self.slots.iter().filter_map(|slot| slot.entity.as_ref())
    }

    /// Live entities mutably, in ascending slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CombatEntity> {
        self.slots.iter_mut().filter_map(|slot| slot.entity.as_mut())
    }
}
