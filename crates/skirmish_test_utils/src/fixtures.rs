//! Test fixtures and helpers.
//!
//! The standard catalog and sample scenario are the RON files shipped in
//! the workspace `data/` directory, so tests exercise the same data the
//! tools load.

use fixed::types::I32F32;
use skirmish_core::data::{Catalog, Scenario};
use skirmish_core::entity::{CombatEntity, Mission, TargetHandle};
use skirmish_core::grid::{CellCoord, SpatialGrid, Terrain};
use skirmish_core::house::{House, HouseId, Houses};
use skirmish_core::math::Fixed;
use skirmish_core::rules::RulesConfig;
use skirmish_core::world::World;

/// Standard catalog RON.
pub const STANDARD_CATALOG: &str = include_str!("../../../data/catalog.ron");

/// Sample two-base scenario RON.
pub const RIVER_SKIRMISH: &str = include_str!("../../../data/river_skirmish.ron");

/// Neutral house.
pub const NEUTRAL: HouseId = HouseId(0);
/// First player house.
pub const GREECE: HouseId = HouseId(1);
/// Opposing house.
pub const USSR: HouseId = HouseId(2);
/// Allied with [`GREECE`].
pub const ENGLAND: HouseId = HouseId(3);

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Parse the standard catalog.
///
/// # Panics
///
/// Panics if the shipped catalog does not parse.
#[must_use]
pub fn standard_catalog() -> Catalog {
    Catalog::from_ron_str(STANDARD_CATALOG).expect("standard catalog parses")
}

/// Standard catalog with replaced rules.
#[must_use]
pub fn standard_catalog_with_rules(rules: RulesConfig) -> Catalog {
    let mut catalog = standard_catalog();
    catalog.rules = rules;
    catalog
}

/// Build the sample scenario against the standard catalog.
///
/// # Panics
///
/// Panics if the shipped scenario does not build.
#[must_use]
pub fn river_skirmish_world() -> World {
    Scenario::from_ron_str(RIVER_SKIRMISH)
        .and_then(|scenario| scenario.build_world(&standard_catalog()))
        .expect("sample scenario builds")
}

/// Incremental world setup for tests.
///
/// Starts with Neutral, Greece, USSR and England houses, England allied
/// with Greece, on a clear map with one-unit cells.
///
/// # Example
///
/// ```ignore
/// let mut builder = WorldBuilder::new(32, 32);
/// let tank = builder.place("1TNK", GREECE, 10, 10);
/// let world = builder.build();
/// ```
#[derive(Debug, Clone)]
pub struct WorldBuilder {
    world: World,
}

impl WorldBuilder {
    /// Builder over the standard catalog.
    #[must_use]
    pub fn new(width: i32, height: i32) -> Self {
        Self::with_catalog(standard_catalog(), width, height)
    }

    /// Builder over a custom catalog.
    ///
    /// # Panics
    ///
    /// Panics if the standard houses cannot be inserted.
    #[must_use]
    pub fn with_catalog(catalog: Catalog, width: i32, height: i32) -> Self {
        let mut houses = Houses::new();
        for (id, name) in [
            (NEUTRAL, "Neutral"),
            (GREECE, "Greece"),
            (USSR, "USSR"),
            (ENGLAND, "England"),
        ] {
            houses.insert(House::new(id, name)).expect("house id in range");
        }
        houses.make_ally(GREECE, ENGLAND);

        let grid = SpatialGrid::new(width, height, Fixed::ONE);
        Self {
            world: World::new(grid, houses, catalog),
        }
    }

    /// Paint terrain on one cell and refresh zones.
    ///
    /// # Panics
    ///
    /// Panics if the cell is off the map.
    #[must_use]
    pub fn terrain(mut self, x: i32, y: i32, terrain: Terrain) -> Self {
        self.world
            .grid
            .set_terrain(CellCoord::new(x, y), terrain)
            .expect("terrain cell on map");
        self.world.grid.rebuild_zones();
        self
    }

    /// Edit a house.
    ///
    /// # Panics
    ///
    /// Panics if the house does not exist.
    pub fn house_mut(&mut self, id: HouseId) -> &mut House {
        self.world.houses.get_mut(id).expect("known house")
    }

    /// Place an object visible to every house.
    pub fn place(&mut self, name: &str, house: HouseId, x: i32, y: i32) -> TargetHandle {
        let handle = self.place_hidden(name, house, x, y);
        let ids: Vec<HouseId> = self.world.houses.iter().map(|h| h.id).collect();
        for id in ids {
            self.world.reveal(handle, id);
        }
        handle
    }

    /// Place an object nobody has discovered yet.
    ///
    /// # Panics
    ///
    /// Panics on an unknown type name or an off-map cell.
    pub fn place_hidden(&mut self, name: &str, house: HouseId, x: i32, y: i32) -> TargetHandle {
        let id = self
            .world
            .catalog
            .find_type(name)
            .unwrap_or_else(|| panic!("unknown type {name}"));
        let handle = self.world.spawn(id, house).expect("spawn");
        self.world
            .unlimbo(handle, CellCoord::new(x, y))
            .expect("placement on map");
        handle
    }

    /// Place an object with a standing order.
    pub fn place_with_mission(
        &mut self,
        name: &str,
        house: HouseId,
        x: i32,
        y: i32,
        mission: Mission,
    ) -> TargetHandle {
        let handle = self.place(name, house, x, y);
        self.entity_mut(handle).mission = mission;
        handle
    }

    /// Mutable access to a placed object.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn entity_mut(&mut self, handle: TargetHandle) -> &mut CombatEntity {
        self.world.entity_mut(handle).expect("live handle")
    }

    /// Mutable access to the world being built.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> World {
        self.world
    }
}
