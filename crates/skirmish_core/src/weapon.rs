//! Static weapon and warhead profiles.
//!
//! Profiles are shared, immutable data loaded once per scenario. Entities
//! refer to them through [`WeaponId`] and [`WarheadId`].

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, percent, Fixed};

/// Armor classes a warhead can be tuned against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ArmorType {
    /// No armor (infantry).
    #[default]
    None,
    /// Wooden structures and fences.
    Wood,
    /// Light vehicle plating.
    Aluminum,
    /// Heavy tank armor.
    Steel,
    /// Hardened structures.
    Concrete,
}

impl ArmorType {
    /// Number of armor classes.
    pub const COUNT: usize = 5;

    /// Index into per-armor tables.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::None => 0,
            Self::Wood => 1,
            Self::Aluminum => 2,
            Self::Steel => 3,
            Self::Concrete => 4,
        }
    }
}

/// Index of a warhead in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WarheadId(pub u16);

/// Index of a weapon in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeaponId(pub u16);

/// Damage delivery characteristics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warhead {
    /// Data name.
    pub name: String,
    /// Damage percentage per armor class, indexed by [`ArmorType::index`].
    pub modifiers: [u32; ArmorType::COUNT],
    /// Can damage wall overlays.
    pub destroys_walls: bool,
    /// Can damage trees.
    pub destroys_trees: bool,
    /// Damage falloff distance factor.
    pub spread: u32,
}

impl Warhead {
    /// Warhead that deals full damage to every armor class.
    #[must_use]
    pub fn uniform(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modifiers: [100; ArmorType::COUNT],
            destroys_walls: false,
            destroys_trees: false,
            spread: 1,
        }
    }

    /// Damage multiplier against an armor class (100% = 1.0).
    #[inline]
    #[must_use]
    pub fn multiplier(&self, armor: ArmorType) -> Fixed {
        percent(self.modifiers[armor.index()])
    }
}

/// Which of the two weapon mounts is meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WeaponSlot {
    /// Main weapon.
    #[default]
    Primary,
    /// Alternate weapon.
    Secondary,
}

/// Static weapon stats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponProfile {
    /// Data name.
    pub name: String,
    /// Maximum reach in world units.
    #[serde(with = "fixed_serde")]
    pub range: Fixed,
    /// Ticks between shots.
    pub rate_of_fire: u32,
    /// Raw damage per shot. Negative values repair the target.
    pub attack: i32,
    /// Damage table; `None` means the weapon cannot hurt anything.
    pub warhead: Option<WarheadId>,
    /// Can engage flying aircraft.
    pub anti_air: bool,
    /// Can engage ground and naval targets.
    pub anti_ground: bool,
    /// Shots scatter around the aim point.
    pub inaccurate: bool,
    /// Tesla-style electric discharge.
    pub electric: bool,
    /// Avoids firing near the owner's own buildings.
    pub suppressed_near_friendlies: bool,
}

impl WeaponProfile {
    /// Whether this weapon can only engage aircraft.
    #[must_use]
    pub const fn is_air_only(&self) -> bool {
        self.anti_air && !self.anti_ground
    }

    /// Whether this weapon heals instead of hurting.
    #[must_use]
    pub const fn is_healing(&self) -> bool {
        self.attack < 0
    }
}
