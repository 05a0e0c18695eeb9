//! Range checks, weapon selection and fire permission.
//!
//! [`Combatant`] is a read-only view of one entity together with its type,
//! giving the per-object combat queries used by threat scoring and by the
//! mission layer. Everything here is cheap: it runs inside the scan loop.

use serde::{Deserialize, Serialize};

use crate::entity::{CloakState, CombatEntity, Target, TargetHandle};
use crate::math::{to_leptons, Fixed, Vec2Fixed};
use crate::techno_type::{TechnoType, TypeTraits};
use crate::weapon::{ArmorType, WeaponProfile, WeaponSlot};
use crate::world::World;

/// Cap applied to weapon range in the anti-armor and anti-infantry ratings.
const RATING_RANGE_CAP: i64 = 0x0400;

/// Passenger nesting followed when summing cargo value.
const MAX_CARGO_DEPTH: u32 = 4;

/// Outcome of asking whether a weapon may fire at a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FireStatus {
    /// Clear to fire.
    Ok,
    /// Target no longer exists or is not on the map.
    Illegal,
    /// The weapon cannot engage this target at all.
    Cant,
    /// Still reloading.
    Rearm,
    /// Target out of range.
    Range,
    /// Out of ammunition.
    Ammo,
    /// Own cloaking device is engaged.
    Cloaked,
}

/// Read-only combat view of an entity.
#[derive(Debug, Clone, Copy)]
pub struct Combatant<'w> {
    world: &'w World,
    entity: &'w CombatEntity,
    kind: &'w TechnoType,
}

impl<'w> Combatant<'w> {
    /// View an entity by handle.
    #[must_use]
    pub fn new(world: &'w World, handle: TargetHandle) -> Option<Self> {
        world
            .entity(handle)
            .and_then(|entity| Self::from_entity(world, entity))
    }

    /// View an already resolved entity.
    #[must_use]
    pub fn from_entity(world: &'w World, entity: &'w CombatEntity) -> Option<Self> {
        let kind = world.type_of(entity)?;
        Some(Self {
            world,
            entity,
            kind,
        })
    }

    /// The entity.
    #[must_use]
    pub fn entity(&self) -> &'w CombatEntity {
        self.entity
    }

    /// The entity's type.
    #[must_use]
    pub fn kind(&self) -> &'w TechnoType {
        self.kind
    }

    /// The world being viewed.
    #[must_use]
    pub fn world(&self) -> &'w World {
        self.world
    }

    /// Weapon mounted in a slot.
    #[must_use]
    pub fn weapon(&self, slot: WeaponSlot) -> Option<&'w WeaponProfile> {
        self.kind.weapon(slot).and_then(|id| self.world.weapon(id))
    }

    /// Reach of a slot's weapon; zero when the slot is empty.
    #[must_use]
    pub fn weapon_range(&self, slot: WeaponSlot) -> Fixed {
        self.weapon(slot).map_or(Fixed::ZERO, |w| w.range)
    }

    /// The longer reach of the two weapons.
    #[must_use]
    pub fn max_weapon_range(&self) -> Fixed {
        self.weapon_range(WeaponSlot::Primary)
            .max(self.weapon_range(WeaponSlot::Secondary))
    }

    /// Where shots originate: the centre plus the type's firing offset.
    #[must_use]
    pub fn fire_coord(&self, _slot: WeaponSlot) -> Vec2Fixed {
        self.entity.position + self.kind.fire_offset
    }

    /// Centre-to-centre distance to another entity.
    #[must_use]
    pub fn distance_to(&self, other: &CombatEntity) -> Fixed {
        self.entity.position.distance(other.position)
    }

    /// Whether a point lies within a slot's weapon range.
    #[must_use]
    pub fn in_range_coord(&self, coord: Vec2Fixed, slot: WeaponSlot) -> bool {
        self.fire_coord(slot).distance(coord) <= self.weapon_range(slot)
    }

    /// Whether an entity lies within a slot's weapon range.
    ///
    /// Buildings count as in range once their edge is: the range grows by a
    /// quarter cell per footprint cell of width and height, matching the
    /// original game's `ICON_LEPTON_W / 4` per cell rather than half the
    /// summed size. With `reciprocal_check`, two non-building objects of the
    /// same kind and equal range are in range of each other if either one
    /// sees the other, which hides firing-offset asymmetry. The reciprocal
    /// call never recurses further.
    #[must_use]
    pub fn in_range(&self, target: &CombatEntity, slot: WeaponSlot, reciprocal_check: bool) -> bool {
        let mut range = self.weapon_range(slot);
        let target_kind = self.world.type_of(target);
        if target.category.is_building() {
            if let Some(kind) = target_kind {
                let cells = i32::from(kind.width) + i32::from(kind.height);
                range += Fixed::from_num(cells) * self.world.grid.cell_size() / Fixed::from_num(4);
            }
        }

        if self.fire_coord(slot).distance(target.position) <= range {
            return true;
        }

        if reciprocal_check
            && !self.entity.category.is_building()
            && target.category == self.entity.category
        {
            if let Some(other) = Combatant::from_entity(self.world, target) {
                if other.weapon_range(slot) == range {
                    return other.in_range(self.entity, slot, false);
                }
            }
        }
        false
    }

    /// Range check against any target kind.
    #[must_use]
    pub fn in_range_target(&self, target: Target, slot: WeaponSlot, reciprocal_check: bool) -> bool {
        match target {
            Target::Object(handle) => self
                .world
                .entity(handle)
                .is_some_and(|t| self.in_range(t, slot, reciprocal_check)),
            Target::Cell(cell) => {
                self.world.grid.contains(cell)
                    && self.in_range_coord(self.world.grid.cell_center(cell), slot)
            }
        }
    }

    /// Whether a slot may fire at a target right now.
    ///
    /// Checks run in order: target legality, cloaked target, missing
    /// weapon, air/ground capability, rearm, range, ammunition, own cloak.
    #[must_use]
    pub fn can_fire(&self, target: Target, slot: WeaponSlot) -> FireStatus {
        if !self.world.is_target_valid(target) {
            return FireStatus::Illegal;
        }
        let object = target.as_object().and_then(|h| self.world.entity(h));

        if object.is_some_and(|o| o.cloak == CloakState::Cloaked)
            && !self.kind.has(TypeTraits::DETECTS_CLOAKED)
        {
            return FireStatus::Cant;
        }

        let Some(weapon) = self.weapon(slot) else {
            return FireStatus::Cant;
        };

        if let Some(object) = object {
            if object.is_airborne() && !weapon.anti_air {
                return FireStatus::Cant;
            }
            if !object.is_airborne() && !weapon.anti_ground {
                return FireStatus::Cant;
            }
        }

        if self.entity.arm > 0 {
            return FireStatus::Rearm;
        }

        if !self.in_range_target(target, slot, true) {
            return FireStatus::Range;
        }

        if self.entity.ammo == Some(0) {
            return FireStatus::Ammo;
        }

        if self.entity.cloak != CloakState::Uncloaked {
            return FireStatus::Cloaked;
        }

        FireStatus::Ok
    }

    /// Pick the better weapon against a target.
    ///
    /// Each slot scores `|attack| x armor multiplier x 1000`, doubled when
    /// already in range and zeroed when the slot cannot engage or has no
    /// warhead. The secondary wins only with a strictly higher score.
    #[must_use]
    pub fn select_weapon(&self, target: &CombatEntity) -> WeaponSlot {
        let primary = self.weapon_score(target, WeaponSlot::Primary);
        let secondary = self.weapon_score(target, WeaponSlot::Secondary);
        if secondary > primary {
            WeaponSlot::Secondary
        } else {
            WeaponSlot::Primary
        }
    }

    fn weapon_score(&self, target: &CombatEntity, slot: WeaponSlot) -> i64 {
        let Some(weapon) = self.weapon(slot) else {
            return 0;
        };
        let Some(warhead) = self.world.warhead_of(weapon) else {
            return 0;
        };
        let armor = self
            .world
            .type_of(target)
            .map_or(ArmorType::None, |k| k.armor);

        // Percent modifier times ten is the multiplier times a thousand.
        let mut score = i64::from(weapon.attack.unsigned_abs())
            * i64::from(warhead.modifiers[armor.index()])
            * 10;
        if self.in_range(target, slot, true) {
            score *= 2;
        }
        match self.can_fire(Target::Object(target.handle), slot) {
            FireStatus::Illegal | FireStatus::Cant => 0,
            _ => score,
        }
    }

    /// Damage per shot of the primary weapon; zero without a warhead.
    /// Negative values mean the weapon repairs.
    #[must_use]
    pub fn combat_damage(&self) -> i32 {
        self.weapon(WeaponSlot::Primary)
            .filter(|w| w.warhead.is_some())
            .map_or(0, |w| w.attack)
    }

    /// Whether the primary weapon heals.
    #[must_use]
    pub fn is_healer(&self) -> bool {
        self.combat_damage() < 0
    }

    /// Whether any weapon is mounted.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.weapon(WeaponSlot::Primary).is_some() || self.weapon(WeaponSlot::Secondary).is_some()
    }

    /// Worth of the object: type reward plus the worth of its passengers.
    #[must_use]
    pub fn value(&self) -> i64 {
        self.value_nested(0)
    }

    fn value_nested(&self, depth: u32) -> i64 {
        let mut value = self.kind.reward;
        if depth < MAX_CARGO_DEPTH {
            for passenger in &self.entity.cargo {
                if let Some(p) = Self::new(self.world, *passenger) {
                    value += p.value_nested(depth + 1);
                }
            }
        }
        value
    }

    fn rating(&self, armor: ArmorType, capped: bool) -> i64 {
        let Some(weapon) = self.weapon(WeaponSlot::Primary) else {
            return 0;
        };
        let Some(warhead) = self.world.warhead_of(weapon) else {
            return 0;
        };
        let mut range = to_leptons(weapon.range, self.world.grid.cell_size());
        let mut spread = 1;
        if capped {
            range = range.min(RATING_RANGE_CAP);
            spread = i64::from(warhead.spread.max(1));
        }
        let rof = i64::from(weapon.rate_of_fire.max(1));
        let mut value = i64::from(weapon.attack) * i64::from(warhead.modifiers[armor.index()]) * range * spread
            / (100 * rof);
        if capped && weapon.inaccurate {
            value /= 2;
        }
        value / 50
    }

    /// Strength rating against aircraft; zero unless the primary is anti-air.
    #[must_use]
    pub fn anti_air(&self) -> i64 {
        match self.weapon(WeaponSlot::Primary) {
            Some(w) if w.anti_air => self.rating(ArmorType::Aluminum, false),
            _ => 0,
        }
    }

    /// Strength rating against armored ground targets.
    #[must_use]
    pub fn anti_armor(&self) -> i64 {
        match self.weapon(WeaponSlot::Primary) {
            Some(w) if !w.anti_air => self.rating(ArmorType::Steel, true),
            _ => 0,
        }
    }

    /// Strength rating against infantry.
    #[must_use]
    pub fn anti_infantry(&self) -> i64 {
        match self.weapon(WeaponSlot::Primary) {
            Some(w) if !w.anti_air => self.rating(ArmorType::None, true),
            _ => 0,
        }
    }
}
