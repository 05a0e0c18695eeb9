//! Weapon, warhead and object type catalog.
//!
//! RON-shaped `*Data` structs carry names and lepton distances as written
//! by designers. [`Catalog::from_data`] resolves names to ids and converts
//! distances into world units.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::grid::MovementZone;
use crate::math::{from_leptons, Vec2Fixed};
use crate::rules::RulesConfig;
use crate::techno_type::{Category, TechnoType, TypeId, TypeRegistry, TypeTraits};
use crate::weapon::{ArmorType, Warhead, WarheadId, WeaponId, WeaponProfile};

/// Warhead definition.
///
/// # Example RON
///
/// ```ron
/// WarheadData(
///     name: "AP",
///     modifiers: [30, 75, 75, 100, 50],
///     destroys_walls: true,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarheadData {
    /// Unique name.
    pub name: String,
    /// Damage percent versus None, Wood, Aluminum, Steel, Concrete.
    #[serde(default = "full_modifiers")]
    pub modifiers: Vec<u32>,
    /// Can damage walls.
    #[serde(default)]
    pub destroys_walls: bool,
    /// Can damage trees.
    #[serde(default)]
    pub destroys_trees: bool,
    /// Damage falloff factor.
    #[serde(default = "default_spread")]
    pub spread: u32,
}

/// Weapon definition.
///
/// # Example RON
///
/// ```ron
/// WeaponData(
///     name: "90mm",
///     range: 1216,          // leptons (4.75 cells)
///     rate_of_fire: 40,
///     attack: 30,
///     warhead: Some("AP"),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponData {
    /// Unique name.
    pub name: String,
    /// Range in leptons (256 per cell).
    pub range: i64,
    /// Ticks between shots.
    #[serde(default)]
    pub rate_of_fire: u32,
    /// Damage per shot; negative heals.
    pub attack: i32,
    /// Warhead name.
    #[serde(default)]
    pub warhead: Option<String>,
    /// Can engage flying aircraft.
    #[serde(default)]
    pub anti_air: bool,
    /// Can engage ground targets.
    #[serde(default = "default_true")]
    pub anti_ground: bool,
    /// Shots scatter.
    #[serde(default)]
    pub inaccurate: bool,
    /// Electric discharge.
    #[serde(default)]
    pub electric: bool,
    /// Avoids firing near friendly buildings.
    #[serde(default)]
    pub suppressed_near_friendlies: bool,
}

/// Object type definition.
///
/// # Example RON
///
/// ```ron
/// TypeData(
///     name: "SS",
///     category: Vessel,
///     reward: 950,
///     strength: 120,
///     armor: Steel,
///     primary: Some("TorpTube"),
///     tags: ["cloakable", "submarine"],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeData {
    /// Unique name.
    pub name: String,
    /// Object kind.
    pub category: Category,
    /// Value when destroyed.
    #[serde(default)]
    pub reward: i64,
    /// Full health.
    pub strength: i32,
    /// Armor class.
    #[serde(default)]
    pub armor: ArmorType,
    /// Primary weapon name.
    #[serde(default)]
    pub primary: Option<String>,
    /// Secondary weapon name.
    #[serde(default)]
    pub secondary: Option<String>,
    /// Ammunition capacity; absent means unlimited.
    #[serde(default)]
    pub ammo: Option<u32>,
    /// Movement class; derived from the category when absent.
    #[serde(default)]
    pub movement: Option<MovementZone>,
    /// Footprint width in cells.
    #[serde(default = "default_footprint")]
    pub width: u8,
    /// Footprint height in cells.
    #[serde(default = "default_footprint")]
    pub height: u8,
    /// Firing point offset from centre, in leptons.
    #[serde(default)]
    pub fire_offset: (i64, i64),
    /// Resource storage capacity.
    #[serde(default)]
    pub storage: u32,
    /// Sight range in leptons.
    #[serde(default = "default_sight")]
    pub sight: i64,
    /// Whether automatic target scans may pick this type.
    #[serde(default = "default_true")]
    pub targetable: bool,
    /// Trait tags, see [`TypeTraits::from_tags`].
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A complete catalog file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogData {
    /// Rule constants.
    #[serde(default)]
    pub rules: RulesConfig,
    /// Warheads.
    #[serde(default)]
    pub warheads: Vec<WarheadData>,
    /// Weapons.
    #[serde(default)]
    pub weapons: Vec<WeaponData>,
    /// Object types.
    #[serde(default)]
    pub types: Vec<TypeData>,
}

fn full_modifiers() -> Vec<u32> {
    vec![100; ArmorType::COUNT]
}

const fn default_spread() -> u32 {
    1
}

const fn default_true() -> bool {
    true
}

const fn default_footprint() -> u8 {
    1
}

const fn default_sight() -> i64 {
    768
}

/// Resolved, immutable data shared by a world.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Rule constants.
    pub rules: RulesConfig,
    warheads: Vec<Warhead>,
    weapons: Vec<WeaponProfile>,
    types: TypeRegistry,
}

impl Catalog {
    /// Empty catalog with the given rules.
    #[must_use]
    pub fn new(rules: RulesConfig) -> Self {
        Self {
            rules,
            ..Self::default()
        }
    }

    /// Parse and resolve a catalog from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let data: CatalogData = ron::from_str(text).map_err(|e| CoreError::DataParseError {
            source_name: "catalog".to_string(),
            message: e.to_string(),
        })?;
        Self::from_data(&data)
    }

    /// Resolve names and units in parsed catalog data.
    pub fn from_data(data: &CatalogData) -> Result<Self> {
        let mut catalog = Self::new(data.rules.clone());

        for warhead in &data.warheads {
            let modifiers = <[u32; ArmorType::COUNT]>::try_from(warhead.modifiers.as_slice())
                .map_err(|_| CoreError::DataParseError {
                    source_name: warhead.name.clone(),
                    message: format!(
                        "expected {} armor modifiers, found {}",
                        ArmorType::COUNT,
                        warhead.modifiers.len()
                    ),
                })?;
            catalog.add_warhead(Warhead {
                name: warhead.name.clone(),
                modifiers,
                destroys_walls: warhead.destroys_walls,
                destroys_trees: warhead.destroys_trees,
                spread: warhead.spread,
            })?;
        }

        for weapon in &data.weapons {
            let warhead = weapon
                .warhead
                .as_deref()
                .map(|name| {
                    catalog.find_warhead(name).ok_or_else(|| CoreError::UnknownName {
                        kind: "warhead",
                        name: name.to_string(),
                    })
                })
                .transpose()?;
            catalog.add_weapon(WeaponProfile {
                name: weapon.name.clone(),
                range: from_leptons(weapon.range),
                rate_of_fire: weapon.rate_of_fire,
                attack: weapon.attack,
                warhead,
                anti_air: weapon.anti_air,
                anti_ground: weapon.anti_ground,
                inaccurate: weapon.inaccurate,
                electric: weapon.electric,
                suppressed_near_friendlies: weapon.suppressed_near_friendlies,
            })?;
        }

        for kind in &data.types {
            let primary = catalog.resolve_weapon(kind.primary.as_deref())?;
            let secondary = catalog.resolve_weapon(kind.secondary.as_deref())?;
            let mut traits = TypeTraits::from_tags(&kind.tags);
            if kind.targetable {
                traits |= TypeTraits::LEGAL_TARGET;
            }
            let mut techno = TechnoType::new(kind.name.clone(), kind.category);
            techno.reward = kind.reward;
            techno.max_strength = kind.strength;
            techno.armor = kind.armor;
            techno.primary = primary;
            techno.secondary = secondary;
            techno.max_ammo = kind.ammo;
            if let Some(movement) = kind.movement {
                techno.movement = movement;
            }
            techno.width = kind.width.max(1);
            techno.height = kind.height.max(1);
            techno.fire_offset =
                Vec2Fixed::new(from_leptons(kind.fire_offset.0), from_leptons(kind.fire_offset.1));
            techno.storage = kind.storage;
            techno.sight = from_leptons(kind.sight);
            techno.traits = traits;
            catalog.add_type(techno)?;
        }

        tracing::info!(
            warheads = catalog.warheads.len(),
            weapons = catalog.weapons.len(),
            types = catalog.types.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    fn resolve_weapon(&self, name: Option<&str>) -> Result<Option<WeaponId>> {
        name.map(|name| {
            self.find_weapon(name).ok_or_else(|| CoreError::UnknownName {
                kind: "weapon",
                name: name.to_string(),
            })
        })
        .transpose()
    }

    /// Add a warhead.
    pub fn add_warhead(&mut self, warhead: Warhead) -> Result<WarheadId> {
        if self.find_warhead(&warhead.name).is_some() {
            return Err(CoreError::DuplicateName {
                kind: "warhead",
                name: warhead.name,
            });
        }
        self.warheads.push(warhead);
        Ok(WarheadId((self.warheads.len() - 1) as u16))
    }

    /// Add a weapon. Its warhead must already be present.
    pub fn add_weapon(&mut self, weapon: WeaponProfile) -> Result<WeaponId> {
        if self.find_weapon(&weapon.name).is_some() {
            return Err(CoreError::DuplicateName {
                kind: "weapon",
                name: weapon.name,
            });
        }
        if let Some(id) = weapon.warhead {
            if self.warhead(id).is_none() {
                return Err(CoreError::UnknownName {
                    kind: "warhead",
                    name: format!("#{}", id.0),
                });
            }
        }
        self.weapons.push(weapon);
        Ok(WeaponId((self.weapons.len() - 1) as u16))
    }

    /// Add an object type. Its weapons must already be present.
    pub fn add_type(&mut self, kind: TechnoType) -> Result<TypeId> {
        for id in [kind.primary, kind.secondary].into_iter().flatten() {
            if self.weapon(id).is_none() {
                return Err(CoreError::UnknownName {
                    kind: "weapon",
                    name: format!("#{}", id.0),
                });
            }
        }
        self.types.register(kind)
    }

    /// Warhead by id.
    #[must_use]
    pub fn warhead(&self, id: WarheadId) -> Option<&Warhead> {
        self.warheads.get(id.0 as usize)
    }

    /// Weapon by id.
    #[must_use]
    pub fn weapon(&self, id: WeaponId) -> Option<&WeaponProfile> {
        self.weapons.get(id.0 as usize)
    }

    /// Object type by id.
    #[must_use]
    pub fn techno_type(&self, id: TypeId) -> Option<&TechnoType> {
        self.types.get(id)
    }

    /// Find a warhead id by name.
    #[must_use]
    pub fn find_warhead(&self, name: &str) -> Option<WarheadId> {
        self.warheads
            .iter()
            .position(|w| w.name == name)
            .map(|i| WarheadId(i as u16))
    }

    /// Find a weapon id by name.
    #[must_use]
    pub fn find_weapon(&self, name: &str) -> Option<WeaponId> {
        self.weapons
            .iter()
            .position(|w| w.name == name)
            .map(|i| WeaponId(i as u16))
    }

    /// Find an object type id by name.
    #[must_use]
    pub fn find_type(&self, name: &str) -> Option<TypeId> {
        self.types.find(name)
    }

    /// All object types.
    #[must_use]
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Number of weapons.
    #[must_use]
    pub fn weapon_count(&self) -> usize {
        self.weapons.len()
    }

    /// Number of warheads.
    #[must_use]
    pub fn warhead_count(&self) -> usize {
        self.warheads.len()
    }
}
