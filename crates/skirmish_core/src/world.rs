//! The per-tick world snapshot: map, entities, houses and catalog.
//!
//! Scoring and searching take `&World`. Lifecycle operations here keep the
//! grid's occupant lists and every weak reference consistent.

use serde::{Deserialize, Serialize};

use crate::data::Catalog;
use crate::entity::{CombatEntity, EntityStorage, Target, TargetHandle};
use crate::error::{CoreError, Result};
use crate::grid::{CellCoord, SpatialGrid, ZoneId};
use crate::house::{HouseId, Houses};
use crate::math::{Fixed, Vec2Fixed};
use crate::rules::RulesConfig;
use crate::techno_type::{Category, TechnoType};
use crate::weapon::{Warhead, WeaponProfile};

/// Everything the threat engine reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct World {
    /// The map.
    pub grid: SpatialGrid,
    /// All entities, placed or in limbo.
    pub entities: EntityStorage,
    /// Houses and alliances.
    pub houses: Houses,
    /// Static data and rules.
    pub catalog: Catalog,
}

fn missing(handle: TargetHandle) -> CoreError {
    CoreError::EntityNotFound(format!("{handle:?}"))
}

impl World {
    /// Create a world with no entities.
    #[must_use]
    pub fn new(grid: SpatialGrid, houses: Houses, catalog: Catalog) -> Self {
        Self {
            grid,
            entities: EntityStorage::new(),
            houses,
            catalog,
        }
    }

    /// Rule constants.
    #[must_use]
    pub fn rules(&self) -> &RulesConfig {
        &self.catalog.rules
    }

    /// Resolve a handle.
    #[must_use]
    pub fn entity(&self, handle: TargetHandle) -> Option<&CombatEntity> {
        self.entities.get(handle)
    }

    /// Resolve a handle mutably.
    pub fn entity_mut(&mut self, handle: TargetHandle) -> Option<&mut CombatEntity> {
        self.entities.get_mut(handle)
    }

    /// Type of an entity.
    #[must_use]
    pub fn type_of(&self, entity: &CombatEntity) -> Option<&TechnoType> {
        self.catalog.techno_type(entity.type_id)
    }

    /// Weapon profile by id.
    #[must_use]
    pub fn weapon(&self, id: crate::weapon::WeaponId) -> Option<&WeaponProfile> {
        self.catalog.weapon(id)
    }

    /// Warhead of a weapon, if it has one.
    #[must_use]
    pub fn warhead_of(&self, weapon: &WeaponProfile) -> Option<&Warhead> {
        weapon.warhead.and_then(|id| self.catalog.warhead(id))
    }

    /// Whether two entities' owners are allied.
    #[must_use]
    pub fn is_ally(&self, a: &CombatEntity, b: &CombatEntity) -> bool {
        self.houses.is_ally(a.owner, b.owner)
    }

    /// Zone of the cell an entity stands in, for a movement class.
    #[must_use]
    pub fn zone_of(&self, entity: &CombatEntity, movement: crate::grid::MovementZone) -> ZoneId {
        self.grid.zone_at(entity.cell, movement)
    }

    /// Create an entity of a type, in limbo and at full strength.
    ///
    /// The owner must be a registered house.
    pub fn spawn(&mut self, type_id: crate::techno_type::TypeId, owner: HouseId) -> Result<TargetHandle> {
        if self.houses.get(owner).is_none() {
            return Err(CoreError::UnknownName {
                kind: "house",
                name: owner.0.to_string(),
            });
        }
        let kind = self
            .catalog
            .techno_type(type_id)
            .ok_or_else(|| CoreError::UnknownName {
                kind: "type",
                name: format!("#{}", type_id.as_u16()),
            })?;
        let category = kind.category;
        let max_strength = kind.max_strength;
        let ammo = kind.max_ammo;
        let handle = self.entities.insert_with(|handle| {
            let mut entity = CombatEntity::new(handle, type_id, category, owner, max_strength);
            entity.ammo = ammo;
            entity
        });
        Ok(handle)
    }

    /// Cells covered by an entity's footprint.
    ///
    /// Buildings cover their full footprint; everything else covers the
    /// single cell its centre is in. Flying aircraft cover nothing.
    #[must_use]
    pub fn footprint(&self, entity: &CombatEntity) -> Vec<CellCoord> {
        if entity.is_airborne() {
            return Vec::new();
        }
        match (entity.category, self.type_of(entity)) {
            (Category::Building, Some(kind)) => {
                let origin = self.building_origin(entity.position, kind);
                let mut cells = Vec::with_capacity(usize::from(kind.width) * usize::from(kind.height));
                for dy in 0..i32::from(kind.height) {
                    for dx in 0..i32::from(kind.width) {
                        cells.push(origin.offset(dx, dy));
                    }
                }
                cells
            }
            _ => vec![entity.cell],
        }
    }

    fn half_extent(&self, kind: &TechnoType) -> Vec2Fixed {
        let cs = self.grid.cell_size();
        Vec2Fixed::new(
            Fixed::from_num(kind.width) * cs / Fixed::from_num(2),
            Fixed::from_num(kind.height) * cs / Fixed::from_num(2),
        )
    }

    fn building_origin(&self, center: Vec2Fixed, kind: &TechnoType) -> CellCoord {
        self.grid.cell_at(center - self.half_extent(kind))
    }

    /// Place an entity from limbo onto the map.
    ///
    /// Buildings anchor their footprint's top-left corner at `cell`; other
    /// objects are centred in it.
    pub fn unlimbo(&mut self, handle: TargetHandle, cell: CellCoord) -> Result<()> {
        let entity = self.entities.get(handle).ok_or_else(|| missing(handle))?;
        if !entity.in_limbo {
            return Err(CoreError::InvalidState(format!("{handle:?} is already placed")));
        }
        if !self.grid.contains(cell) {
            return Err(CoreError::OutOfBounds { x: cell.x, y: cell.y });
        }

        let position = match (entity.category, self.type_of(entity)) {
            (Category::Building, Some(kind)) => {
                let far = cell.offset(i32::from(kind.width) - 1, i32::from(kind.height) - 1);
                if !self.grid.contains(far) {
                    return Err(CoreError::OutOfBounds { x: far.x, y: far.y });
                }
                self.grid.cell_origin(cell) + self.half_extent(kind)
            }
            _ => self.grid.cell_center(cell),
        };

        self.place(handle, position)
    }

    fn place(&mut self, handle: TargetHandle, position: Vec2Fixed) -> Result<()> {
        let cell = self.grid.cell_at(position);
        let entity = self.entities.get_mut(handle).ok_or_else(|| missing(handle))?;
        entity.position = position;
        entity.cell = cell;
        entity.in_limbo = false;

        let snapshot = entity.clone();
        for c in self.footprint(&snapshot) {
            self.grid.add_occupant(c, handle);
        }
        Ok(())
    }

    fn unrecord(&mut self, handle: TargetHandle) {
        if let Some(entity) = self.entities.get(handle) {
            if entity.in_limbo {
                return;
            }
            let cells = self.footprint(entity);
            for c in cells {
                self.grid.remove_occupant(c, handle);
            }
        }
    }

    /// Move a placed mobile entity to a new world position.
    pub fn relocate(&mut self, handle: TargetHandle, position: Vec2Fixed) -> Result<()> {
        let entity = self.entities.get(handle).ok_or_else(|| missing(handle))?;
        if entity.in_limbo {
            return Err(CoreError::InvalidState(format!("{handle:?} is in limbo")));
        }
        if entity.category.is_building() {
            return Err(CoreError::InvalidState(format!("{handle:?} is a building")));
        }
        let cell = self.grid.cell_at(position);
        if !self.grid.contains(cell) {
            return Err(CoreError::OutOfBounds { x: cell.x, y: cell.y });
        }
        self.unrecord(handle);
        self.place(handle, position)
    }

    /// Change an aircraft's altitude. Landing records it in its cell;
    /// taking off removes it.
    pub fn set_altitude(&mut self, handle: TargetHandle, altitude: Fixed) -> Result<()> {
        self.unrecord(handle);
        let entity = self.entities.get_mut(handle).ok_or_else(|| missing(handle))?;
        entity.altitude = altitude.max(Fixed::ZERO);
        if entity.in_limbo {
            return Ok(());
        }
        let position = entity.position;
        self.place(handle, position)
    }

    /// Remove an entity from the map without destroying it.
    pub fn limbo(&mut self, handle: TargetHandle) -> Result<()> {
        if !self.entities.contains(handle) {
            return Err(missing(handle));
        }
        self.unrecord(handle);
        self.detach_all(handle);
        if let Some(entity) = self.entities.get_mut(handle) {
            entity.in_limbo = true;
        }
        Ok(())
    }

    /// Put a passenger into a carrier. The passenger goes into limbo and its
    /// value counts toward the carrier's.
    pub fn load_cargo(&mut self, carrier: TargetHandle, passenger: TargetHandle) -> Result<()> {
        if !self.entities.contains(carrier) {
            return Err(missing(carrier));
        }
        self.limbo(passenger)?;
        if let Some(entity) = self.entities.get_mut(carrier) {
            if !entity.cargo.contains(&passenger) {
                entity.cargo.push(passenger);
            }
        }
        Ok(())
    }

    /// Destroy an entity, credit the killer and clear every weak reference
    /// to it. The handle never resolves again.
    pub fn destroy(
        &mut self,
        handle: TargetHandle,
        killer: Option<TargetHandle>,
    ) -> Result<CombatEntity> {
        if !self.entities.contains(handle) {
            return Err(missing(handle));
        }
        self.unrecord(handle);
        self.detach_all(handle);
        let entity = self.entities.remove(handle).ok_or_else(|| missing(handle))?;

        if let Some(killer) = killer.filter(|k| *k != handle) {
            if let Some(k) = self.entities.get_mut(killer) {
                k.kills += 1;
            }
        }
        tracing::debug!(?handle, ?killer, "Entity destroyed");
        Ok(entity)
    }

    /// Remove every weak reference other entities hold to `handle`, and
    /// break its own radio contact.
    pub fn detach_all(&mut self, handle: TargetHandle) {
        let contact = self.entities.get_mut(handle).and_then(|e| e.radio_contact.take());
        if let Some(contact) = contact {
            if let Some(other) = self.entities.get_mut(contact) {
                if other.radio_contact == Some(handle) {
                    other.radio_contact = None;
                }
            }
        }

        for other in self.entities.iter_mut() {
            if other.handle == handle {
                continue;
            }
            if other.target == Some(Target::Object(handle)) {
                other.target = None;
            }
            if other.radio_contact == Some(handle) {
                other.radio_contact = None;
            }
        }
    }

    /// Mark an entity as seen by a house.
    pub fn reveal(&mut self, handle: TargetHandle, house: HouseId) {
        if let Some(entity) = self.entities.get_mut(handle) {
            entity.discovered.insert(house);
        }
    }

    /// Set or clear an entity's target.
    pub fn assign_target(&mut self, handle: TargetHandle, target: Option<Target>) {
        if let Some(entity) = self.entities.get_mut(handle) {
            entity.target = target;
        }
    }

    /// Link two entities by radio.
    pub fn establish_contact(&mut self, a: TargetHandle, b: TargetHandle) -> Result<()> {
        if !self.entities.contains(a) {
            return Err(missing(a));
        }
        if !self.entities.contains(b) {
            return Err(missing(b));
        }
        if let Some(e) = self.entities.get_mut(a) {
            e.radio_contact = Some(b);
        }
        if let Some(e) = self.entities.get_mut(b) {
            e.radio_contact = Some(a);
        }
        Ok(())
    }

    /// Whether a target still refers to something that exists.
    #[must_use]
    pub fn is_target_valid(&self, target: Target) -> bool {
        match target {
            Target::Object(handle) => self.entities.get(handle).is_some_and(CombatEntity::is_active),
            Target::Cell(cell) => self.grid.contains(cell),
        }
    }

    /// World position of a target.
    #[must_use]
    pub fn target_coord(&self, target: Target) -> Option<Vec2Fixed> {
        match target {
            Target::Object(handle) => self.entities.get(handle).map(|e| e.position),
            Target::Cell(cell) => self.grid.contains(cell).then(|| self.grid.cell_center(cell)),
        }
    }

    /// Encode the world with bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| CoreError::Snapshot(format!("Failed to serialize world: {e}")))
    }

    /// Decode a world produced by [`Self::to_bytes`].
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| CoreError::Snapshot(format!("Failed to deserialize world: {e}")))
    }
}
