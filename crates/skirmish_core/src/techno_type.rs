//! Object type definitions shared by every instance of a type.
//!
//! This module provides:
//! - [`TypeId`]: numeric id used at runtime
//! - [`Category`]: closed set of object kinds the evaluator dispatches on
//! - [`TypeTraits`]: bitflags for the special cases target scoring cares about
//! - [`TypeRegistry`]: id and name lookup for loaded types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::grid::MovementZone;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::weapon::{ArmorType, WeaponId, WeaponSlot};

/// Numeric identifier for an object type.
///
/// Assigned in load order, so the same catalog yields the same ids on
/// every client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(u16);

impl TypeId {
    /// Sentinel value indicating no type.
    pub const NONE: Self = Self(u16::MAX);

    /// Create a new type id.
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Get the raw numeric value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Check if this is a valid id (not NONE).
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != u16::MAX
    }
}

/// Kind of simulated object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Static structure occupying a footprint of cells.
    Building,
    /// Foot soldier.
    Infantry,
    /// Ground vehicle.
    Unit,
    /// Fixed-wing or rotary aircraft.
    Aircraft,
    /// Ship or submarine.
    Vessel,
}

impl Category {
    /// Every category in dispatch order.
    pub const ALL: [Self; 5] = [
        Self::Building,
        Self::Infantry,
        Self::Unit,
        Self::Aircraft,
        Self::Vessel,
    ];

    /// Bit used in category masks.
    #[must_use]
    pub const fn bit(self) -> u8 {
        match self {
            Self::Building => 1 << 0,
            Self::Infantry => 1 << 1,
            Self::Unit => 1 << 2,
            Self::Aircraft => 1 << 3,
            Self::Vessel => 1 << 4,
        }
    }

    /// Whether this is a building.
    #[must_use]
    pub const fn is_building(self) -> bool {
        matches!(self, Self::Building)
    }

    /// Whether this is a foot soldier.
    #[must_use]
    pub const fn is_foot(self) -> bool {
        matches!(self, Self::Infantry)
    }

    /// Whether objects of this kind can take off.
    #[must_use]
    pub const fn can_fly(self) -> bool {
        matches!(self, Self::Aircraft)
    }

    /// Whether objects of this kind move across the map.
    #[must_use]
    pub const fn is_mobile(self) -> bool {
        !self.is_building()
    }
}

/// Bitflags for per-type special cases.
///
/// Computed from RON `tags` at load time.
///
/// # Example
///
/// ```
/// use skirmish_core::techno_type::TypeTraits;
///
/// let traits = TypeTraits::LEGAL_TARGET | TypeTraits::CLOAKABLE;
/// assert!(traits.contains(TypeTraits::CLOAKABLE));
/// assert!(!traits.intersects(TypeTraits::INVISIBLE));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TypeTraits(u32);

impl TypeTraits {
    // ========================================
    // Targeting
    // ========================================

    /// May be picked as an automatic target.
    pub const LEGAL_TARGET: Self = Self(1 << 0);
    /// Carries a cloaking device.
    pub const CLOAKABLE: Self = Self(1 << 1);
    /// Permanently stealthed.
    pub const INVISIBLE: Self = Self(1 << 2);
    /// Sees cloaked and invisible objects.
    pub const DETECTS_CLOAKED: Self = Self(1 << 3);

    // ========================================
    // Observer roles
    // ========================================

    /// Spy-like infiltrator that only dogs go after.
    pub const INFILTRATOR: Self = Self(1 << 4);
    /// Attack dog: hunts infantry and infiltrators.
    pub const DOG: Self = Self(1 << 5);
    /// Repairs vehicles and aircraft.
    pub const MECHANIC: Self = Self(1 << 6);
    /// Submerged vessel restricted to naval structures.
    pub const SUBMARINE: Self = Self(1 << 7);
    /// Destroys itself on attack; never auto-targets for humans.
    pub const SUICIDE: Self = Self(1 << 8);

    // ========================================
    // Economic and structural subtypes
    // ========================================

    /// Collects ore or Tiberium.
    pub const HARVESTER: Self = Self(1 << 9);
    /// Building that can be captured by engineers.
    pub const CAPTURABLE: Self = Self(1 << 10);
    /// Decoy building.
    pub const FAKE: Self = Self(1 << 11);
    /// Power plant.
    pub const POWER: Self = Self(1 << 12);
    /// Production facility.
    pub const FACTORY: Self = Self(1 << 13);
    /// Defensive structure.
    pub const BASE_DEFENSE: Self = Self(1 << 14);
    /// Shipyard or sub pen.
    pub const NAVAL_STRUCTURE: Self = Self(1 << 15);

    /// Empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Check if all flags in `other` are set in `self`.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check if any flags in `other` are set in `self`.
    #[inline]
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    /// Union of two flag sets.
    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Create from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Build traits from RON tags. Unknown tags are ignored.
    #[must_use]
    pub fn from_tags(tags: &[String]) -> Self {
        let mut traits = Self::empty();
        for tag in tags {
            let flag = match tag.as_str() {
                "legal_target" => Self::LEGAL_TARGET,
                "cloakable" => Self::CLOAKABLE,
                "invisible" => Self::INVISIBLE,
                "detects_cloaked" | "sensors" => Self::DETECTS_CLOAKED,
                "infiltrator" | "spy" => Self::INFILTRATOR,
                "dog" => Self::DOG,
                "mechanic" => Self::MECHANIC,
                "submarine" => Self::SUBMARINE,
                "suicide" => Self::SUICIDE,
                "harvester" => Self::HARVESTER,
                "capturable" => Self::CAPTURABLE,
                "fake" => Self::FAKE,
                "power" => Self::POWER,
                "factory" => Self::FACTORY,
                "base_defense" => Self::BASE_DEFENSE,
                "naval_structure" => Self::NAVAL_STRUCTURE,
                _ => Self::empty(),
            };
            traits |= flag;
        }
        traits
    }
}

impl std::ops::BitOr for TypeTraits {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for TypeTraits {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

/// Static description of an object type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnoType {
    /// Data name (e.g. "2TNK").
    pub name: String,
    /// Object kind.
    pub category: Category,
    /// Score awarded for destroying one of these.
    pub reward: i64,
    /// Full health.
    pub max_strength: i32,
    /// Armor class.
    pub armor: ArmorType,
    /// Primary weapon.
    pub primary: Option<WeaponId>,
    /// Secondary weapon.
    pub secondary: Option<WeaponId>,
    /// Ammunition capacity; `None` means unlimited.
    pub max_ammo: Option<u32>,
    /// Movement class used for zone lookups.
    pub movement: MovementZone,
    /// Footprint width in cells (buildings).
    pub width: u8,
    /// Footprint height in cells (buildings).
    pub height: u8,
    /// Offset of the firing point from the object centre.
    pub fire_offset: Vec2Fixed,
    /// Resource storage capacity (refineries, silos).
    pub storage: u32,
    /// Sight distance in world units.
    #[serde(with = "fixed_serde")]
    pub sight: Fixed,
    /// Special-case flags.
    pub traits: TypeTraits,
}

impl TechnoType {
    /// Minimal type with no weapons and a 1x1 footprint.
    #[must_use]
    pub fn new(name: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            category,
            reward: 0,
            max_strength: 1,
            armor: ArmorType::None,
            primary: None,
            secondary: None,
            max_ammo: None,
            movement: if category == Category::Vessel {
                MovementZone::Water
            } else {
                MovementZone::Normal
            },
            width: 1,
            height: 1,
            fire_offset: Vec2Fixed::ZERO,
            storage: 0,
            sight: Fixed::from_num(3),
            traits: TypeTraits::LEGAL_TARGET,
        }
    }

    /// Weapon mounted in a slot.
    #[must_use]
    pub fn weapon(&self, slot: WeaponSlot) -> Option<WeaponId> {
        match slot {
            WeaponSlot::Primary => self.primary,
            WeaponSlot::Secondary => self.secondary,
        }
    }

    /// Whether the type carries any weapon.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.primary.is_some() || self.secondary.is_some()
    }

    /// Shorthand for a trait check.
    #[inline]
    #[must_use]
    pub fn has(&self, flag: TypeTraits) -> bool {
        self.traits.contains(flag)
    }
}

/// Central registry of loaded object types.
///
/// Name lookup uses an ordered map so snapshots encode identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRegistry {
    by_id: Vec<TechnoType>,
    by_name: BTreeMap<String, TypeId>,
}

impl TypeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type and return its id.
    pub fn register(&mut self, kind: TechnoType) -> crate::error::Result<TypeId> {
        if self.by_name.contains_key(&kind.name) {
            return Err(crate::error::CoreError::DuplicateName {
                kind: "type",
                name: kind.name,
            });
        }
        let id = TypeId::new(self.by_id.len() as u16);
        self.by_name.insert(kind.name.clone(), id);
        self.by_id.push(kind);
        Ok(id)
    }

    /// Look up a type by id.
    #[inline]
    #[must_use]
    pub fn get(&self, id: TypeId) -> Option<&TechnoType> {
        if !id.is_valid() {
            return None;
        }
        self.by_id.get(id.0 as usize)
    }

    /// Find a type id by data name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    /// Iterate all types with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TechnoType)> {
        self.by_id
            .iter()
            .enumerate()
            .map(|(i, kind)| (TypeId::new(i as u16), kind))
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Check if registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
