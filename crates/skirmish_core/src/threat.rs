//! Per-object and per-cell target scoring.
//!
//! [`ThreatEvaluator`] answers "would this observer attack that candidate,
//! and how much does it want to?" for the search in [`crate::search`].
//! Every filter is a plain rejection: the search only needs accept or
//! reject plus a value to compare.

use serde::{Deserialize, Serialize};

use crate::combat::Combatant;
use crate::entity::{CloakState, CombatEntity, TargetHandle};
use crate::grid::{ring, CellCoord, ZoneId};
use crate::math::{to_leptons, Fixed};
use crate::techno_type::{Category, TypeTraits};
use crate::weapon::WeaponSlot;
use crate::world::World;

/// Bitflags selecting target categories and search scope.
///
/// # Example
///
/// ```
/// use skirmish_core::threat::ThreatMethod;
///
/// let method = ThreatMethod::AREA | ThreatMethod::GROUND;
/// assert!(method.contains(ThreatMethod::INFANTRY));
/// assert!(method.is_bounded());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ThreatMethod(u32);

impl ThreatMethod {
    // ========================================
    // Scope
    // ========================================

    /// Search only out to current weapon range.
    pub const RANGE: Self = Self(1 << 0);
    /// Search the guard area around the observer.
    pub const AREA: Self = Self(1 << 1);

    // ========================================
    // Categories
    // ========================================

    /// Flying aircraft.
    pub const AIR: Self = Self(1 << 2);
    /// Foot soldiers.
    pub const INFANTRY: Self = Self(1 << 3);
    /// Ground vehicles.
    pub const VEHICLES: Self = Self(1 << 4);
    /// Structures.
    pub const BUILDINGS: Self = Self(1 << 5);
    /// Harvesters and resource storage.
    pub const TIBERIUM: Self = Self(1 << 6);
    /// Ships.
    pub const BOATS: Self = Self(1 << 7);
    /// Neutral-owned objects only.
    pub const CIVILIANS: Self = Self(1 << 8);
    /// Capturable buildings only.
    pub const CAPTURE: Self = Self(1 << 9);

    // ========================================
    // Building preferences
    // ========================================

    /// Prefer decoy buildings.
    pub const FAKES: Self = Self(1 << 10);
    /// Prefer power plants.
    pub const POWER: Self = Self(1 << 11);
    /// Prefer production facilities.
    pub const FACTORIES: Self = Self(1 << 12);
    /// Prefer defensive structures.
    pub const BASE_DEFENSE: Self = Self(1 << 13);

    /// Infantry, vehicles and buildings.
    pub const GROUND: Self = Self(Self::INFANTRY.0 | Self::VEHICLES.0 | Self::BUILDINGS.0);
    /// Everything a combat unit normally shoots at.
    pub const NORMAL: Self = Self(Self::GROUND.0 | Self::AIR.0 | Self::BOATS.0);

    const PREFERENCES: Self =
        Self(Self::FAKES.0 | Self::POWER.0 | Self::FACTORIES.0 | Self::BASE_DEFENSE.0);

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

    /// Whether the search is limited to weapon range or the guard area.
    #[must_use]
    pub const fn is_bounded(self) -> bool {
        self.intersects(Self::RANGE.union(Self::AREA))
    }

    /// Build a method from tags such as `["area", "ground"]`.
    /// Unknown tags are ignored.
    #[must_use]
    pub fn from_tags<S: AsRef<str>>(tags: &[S]) -> Self {
        let mut method = Self::empty();
        for tag in tags {
            let flag = match tag.as_ref() {
                "range" => Self::RANGE,
                "area" => Self::AREA,
                "air" => Self::AIR,
                "infantry" => Self::INFANTRY,
                "vehicles" => Self::VEHICLES,
                "buildings" => Self::BUILDINGS,
                "tiberium" => Self::TIBERIUM,
                "boats" => Self::BOATS,
                "civilians" => Self::CIVILIANS,
                "capture" => Self::CAPTURE,
                "fakes" => Self::FAKES,
                "power" => Self::POWER,
                "factories" => Self::FACTORIES,
                "base_defense" => Self::BASE_DEFENSE,
                "ground" => Self::GROUND,
                "normal" => Self::NORMAL,
                _ => Self::empty(),
            };
            method |= flag;
        }
        method
    }
}

impl std::ops::BitOr for ThreatMethod {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for ThreatMethod {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

/// Set of candidate categories, one bit per [`Category`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CategoryMask(u8);

impl CategoryMask {
    /// No categories.
    pub const NONE: Self = Self(0);

    /// A single category.
    #[must_use]
    pub const fn of(category: Category) -> Self {
        Self(category.bit())
    }

    /// Whether a category is in the set.
    #[inline]
    #[must_use]
    pub const fn contains(self, category: Category) -> bool {
        self.0 & category.bit() != 0
    }

    /// The set plus one more category.
    #[must_use]
    pub const fn with(self, category: Category) -> Self {
        Self(self.0 | category.bit())
    }

    /// Whether the set is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Categories a threat method asks for.
    #[must_use]
    pub fn from_method(method: ThreatMethod) -> Self {
        let mut mask = Self::NONE;
        if method.contains(ThreatMethod::CIVILIANS) {
            mask = mask
                .with(Category::Building)
                .with(Category::Infantry)
                .with(Category::Unit);
        }
        if method.contains(ThreatMethod::AIR) {
            mask = mask.with(Category::Aircraft);
        }
        if method.intersects(
            ThreatMethod::CAPTURE
                .union(ThreatMethod::BUILDINGS)
                .union(ThreatMethod::PREFERENCES),
        ) {
            mask = mask.with(Category::Building);
        }
        if method.contains(ThreatMethod::TIBERIUM) {
            mask = mask.with(Category::Building).with(Category::Unit);
        }
        if method.contains(ThreatMethod::INFANTRY) {
            mask = mask.with(Category::Infantry);
        }
        if method.contains(ThreatMethod::VEHICLES) {
            mask = mask.with(Category::Unit);
        }
        if method.contains(ThreatMethod::BOATS) {
            mask = mask.with(Category::Vessel);
        }
        mask
    }
}

impl std::ops::BitOr for CategoryMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// How far away an acceptable candidate may be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeLimit {
    /// Within reach of the weapon the observer would pick.
    Weapon,
    /// Within this centre-to-centre distance.
    Within(Fixed),
    /// Anywhere.
    Unlimited,
}

/// Scores candidates from one observer's point of view.
#[derive(Debug, Clone, Copy)]
pub struct ThreatEvaluator<'w> {
    me: Combatant<'w>,
}

impl<'w> ThreatEvaluator<'w> {
    /// Evaluator for an observer; `None` if the handle does not resolve.
    #[must_use]
    pub fn new(world: &'w World, observer: TargetHandle) -> Option<Self> {
        Combatant::new(world, observer).map(|me| Self { me })
    }

    /// The observer.
    #[must_use]
    pub fn observer(&self) -> Combatant<'w> {
        self.me
    }

    fn world(&self) -> &'w World {
        self.me.world()
    }

    fn observer_is_human(&self) -> bool {
        self.world().houses.is_human(self.me.entity().owner)
    }

    fn has_ground_weapon(&self) -> bool {
        [WeaponSlot::Primary, WeaponSlot::Secondary]
            .into_iter()
            .filter_map(|slot| self.me.weapon(slot))
            .any(|w| w.anti_ground)
    }

    /// Score a candidate, or `None` if it is not an acceptable target.
    ///
    /// `zone` restricts candidates to one reachability island of the
    /// observer's movement class; flying aircraft are exempt.
    #[must_use]
    pub fn evaluate_object(
        &self,
        method: ThreatMethod,
        mask: CategoryMask,
        range: RangeLimit,
        candidate: &CombatEntity,
        zone: Option<ZoneId>,
    ) -> Option<i64> {
        let world = self.world();
        let rules = world.rules();
        let me = self.me.entity();
        let my_kind = self.me.kind();

        if !candidate.is_active() || candidate.handle == me.handle {
            return None;
        }
        let them = Combatant::from_entity(world, candidate)?;
        let their_kind = them.kind();

        let hidden = candidate.cloak == CloakState::Cloaked || their_kind.has(TypeTraits::INVISIBLE);
        if hidden && !my_kind.has(TypeTraits::DETECTS_CLOAKED) {
            return None;
        }

        if candidate.mission.is_no_threat() {
            return None;
        }

        if let Some(zone) = zone {
            if !candidate.is_airborne() && world.zone_of(candidate, my_kind.movement) != zone {
                return None;
            }
        }

        let healer = self.me.is_healer();
        if world.is_ally(me, candidate) {
            if !healer || candidate.health_ratio() >= rules.condition_green_ratio() {
                return None;
            }
        } else if healer {
            return None;
        }

        let slot = self.me.select_weapon(candidate);
        let distance = self.me.distance_to(candidate);
        match range {
            RangeLimit::Within(limit) if distance > limit => return None,
            RangeLimit::Weapon if !self.me.in_range(candidate, slot, true) => return None,
            _ => {}
        }

        if rules.discovery_required()
            && !world.houses.is_human(candidate.owner)
            && !candidate.discovered.contains(me.owner)
            && candidate.category != Category::Aircraft
        {
            return None;
        }

        if !mask.contains(candidate.category) {
            return None;
        }

        if !their_kind.has(TypeTraits::LEGAL_TARGET) {
            return None;
        }

        if !self.passes_exclusions(method, candidate) {
            return None;
        }

        // Scoring. A running value that drops to zero rejects outright.
        let mut value = them.value().saturating_add(candidate.kills);
        if value <= 0 {
            return None;
        }

        let my_house = world.houses.get(me.owner);
        if my_house.and_then(|h| h.enemy) == Some(candidate.owner) {
            value = value.saturating_add(500).saturating_mul(3);
        }

        if self.me.in_range(candidate, slot, true) {
            value = value.saturating_mul(2);
        }

        if let Some(base) = world.houses.base_of(candidate.owner) {
            if !base.contains(candidate.cell) {
                value = value.saturating_mul(2);
            }
        }

        let preferences = ThreatMethod::from_bits(method.bits() & ThreatMethod::PREFERENCES.bits());
        if preferences != ThreatMethod::empty() && candidate.category.is_building() {
            let wanted = [
                (ThreatMethod::FAKES, TypeTraits::FAKE),
                (ThreatMethod::POWER, TypeTraits::POWER),
                (ThreatMethod::FACTORIES, TypeTraits::FACTORY),
                (ThreatMethod::BASE_DEFENSE, TypeTraits::BASE_DEFENSE),
            ]
            .into_iter()
            .any(|(bit, flag)| preferences.contains(bit) && their_kind.has(flag));
            value = if wanted {
                value.saturating_mul(rules.category_boost)
            } else {
                0
            };
            if value <= 0 {
                return None;
            }
        }

        value = scale(value, self.area_modify(candidate.cell));
        if value <= 0 {
            return None;
        }

        if let Some(base) = world.houses.base_of(me.owner) {
            if base.contains(candidate.cell) {
                value = value.saturating_mul(rules.nervous_multiplier);
            }
        }
        if value <= 0 {
            return None;
        }

        let cells = (distance / world.grid.cell_size()).to_num::<i64>().max(0);
        Some((value.saturating_mul(32_000) / (cells + 1)).max(1))
    }

    /// Observer- and method-specific exclusions.
    fn passes_exclusions(&self, method: ThreatMethod, candidate: &CombatEntity) -> bool {
        let world = self.world();
        let my_kind = self.me.kind();
        let Some(their_kind) = world.type_of(candidate) else {
            return false;
        };

        // Only dogs go after infiltrators.
        if their_kind.has(TypeTraits::INFILTRATOR) && !my_kind.has(TypeTraits::DOG) {
            return false;
        }

        // Air-only weapons ignore landed aircraft.
        if candidate.category == Category::Aircraft
            && !candidate.is_airborne()
            && self.me.is_armed()
            && !self.has_ground_weapon()
        {
            return false;
        }

        if method.contains(ThreatMethod::CIVILIANS) && !candidate.owner.is_neutral() {
            return false;
        }

        if method.contains(ThreatMethod::CAPTURE)
            && !(candidate.category.is_building() && their_kind.has(TypeTraits::CAPTURABLE))
        {
            return false;
        }

        if my_kind.has(TypeTraits::SUBMARINE)
            && candidate.category != Category::Vessel
            && !their_kind.has(TypeTraits::NAVAL_STRUCTURE)
        {
            return false;
        }

        let human = self.observer_is_human();
        let inert_allowed = self.me.entity().team.is_some()
            || method.intersects(
                ThreatMethod::CAPTURE
                    .union(ThreatMethod::TIBERIUM)
                    .union(ThreatMethod::FAKES)
                    .union(ThreatMethod::POWER)
                    .union(ThreatMethod::FACTORIES),
            );
        if human && candidate.category.is_building() && !their_kind.is_armed() && !inert_allowed {
            return false;
        }

        if human && my_kind.has(TypeTraits::SUICIDE) {
            return false;
        }

        if method.contains(ThreatMethod::TIBERIUM) {
            let economic = match candidate.category {
                Category::Unit => their_kind.has(TypeTraits::HARVESTER),
                Category::Building => their_kind.storage > 0,
                _ => false,
            };
            if !economic {
                return false;
            }
        }

        true
    }

    /// Pick the acting occupant of a cell and score it.
    ///
    /// Skips the observer itself. Prefers the first non-allied occupant, or
    /// for healers the first injured ally.
    #[must_use]
    pub fn evaluate_cell(
        &self,
        method: ThreatMethod,
        mask: CategoryMask,
        cell: CellCoord,
        range: RangeLimit,
        zone: Option<ZoneId>,
    ) -> Option<(TargetHandle, i64)> {
        let world = self.world();
        if !world.grid.contains(cell) {
            return None;
        }
        let me = self.me.entity();
        let healer = self.me.is_healer();
        let green = world.rules().condition_green_ratio();

        let tentative = world
            .grid
            .occupants(cell)
            .iter()
            .filter_map(|h| world.entity(*h))
            .find(|o| {
                if o.handle == me.handle || !o.is_active() {
                    return false;
                }
                let ally = world.is_ally(me, o);
                if healer {
                    ally && o.health_ratio() < green
                } else {
                    !ally
                }
            })?;

        self.evaluate_object(method, mask, range, tentative, zone)
            .map(|value| (tentative.handle, value))
    }

    /// Score a wall on a cell as a fallback target.
    ///
    /// Only computer houses that hunt walls use this, and never from ships.
    /// The wall must be in primary weapon range, breakable by its warhead
    /// and not owned by an ally. Closer walls score higher; 0 means no.
    #[must_use]
    pub fn evaluate_just_cell(&self, cell: CellCoord) -> i64 {
        let world = self.world();
        let me = self.me.entity();

        let hunts = world
            .houses
            .get(me.owner)
            .is_some_and(|h| !h.is_human && h.hunts_walls);
        if !hunts || me.category == Category::Vessel {
            return 0;
        }

        let Some(wall) = world.grid.wall_at(cell) else {
            return 0;
        };
        if wall.owner.is_some_and(|owner| world.houses.is_ally(me.owner, owner)) {
            return 0;
        }

        let Some(weapon) = self.me.weapon(WeaponSlot::Primary) else {
            return 0;
        };
        if !world.warhead_of(weapon).is_some_and(|w| w.destroys_walls) {
            return 0;
        }

        let distance = self
            .me
            .fire_coord(WeaponSlot::Primary)
            .distance(world.grid.cell_center(cell));
        if distance > weapon.range {
            return 0;
        }
        to_leptons(weapon.range - distance, world.grid.cell_size()).max(0)
    }

    /// Fraction in `(0, 1]` that discounts targets near own buildings.
    ///
    /// Only weapons suppressed near friendlies are affected. Each distinct
    /// allied building on rings `1..=suppress_radius` around the cell
    /// halves the fraction.
    #[must_use]
    pub fn area_modify(&self, cell: CellCoord) -> Fixed {
        let suppressed = self
            .me
            .weapon(WeaponSlot::Primary)
            .is_some_and(|w| w.suppressed_near_friendlies);
        if !suppressed {
            return Fixed::ONE;
        }

        let world = self.world();
        let me = self.me.entity();
        let radius = i32::try_from(world.rules().suppress_radius).unwrap_or(i32::MAX);
        let mut fraction = Fixed::ONE;
        let mut seen: Vec<TargetHandle> = Vec::new();

        for r in 1..=radius {
            for c in ring(cell, r) {
                for handle in world.grid.occupants(c) {
                    if seen.contains(handle) {
                        continue;
                    }
                    let Some(other) = world.entity(*handle) else {
                        continue;
                    };
                    if other.category.is_building() && world.is_ally(me, other) {
                        seen.push(*handle);
                        fraction = (fraction / Fixed::from_num(2)).max(Fixed::DELTA);
                    }
                }
            }
        }
        fraction
    }

    /// Scan distance for a method: weapon reach under RANGE, the guard area
    /// under AREA, `None` for a full-map scan.
    #[must_use]
    pub fn threat_range(&self, method: ThreatMethod) -> Option<Fixed> {
        let rules = self.world().rules();
        if method.contains(ThreatMethod::RANGE) {
            Some(self.me.max_weapon_range())
        } else if method.contains(ThreatMethod::AREA) {
            if self.me.is_armed() {
                Some((self.me.max_weapon_range() * Fixed::from_num(2)).min(rules.max_threat_range))
            } else {
                Some(rules.guard_range)
            }
        } else {
            None
        }
    }
}

/// Multiply an integer score by a fixed-point fraction, rounding down.
fn scale(value: i64, fraction: Fixed) -> i64 {
    let product = (i128::from(value) * i128::from(fraction.to_bits())) >> 32;
    i64::try_from(product).unwrap_or(i64::MAX)
}
