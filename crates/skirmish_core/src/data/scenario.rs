//! Scenario description: map, houses and the objects placed at start.
//!
//! A scenario only names types; it is resolved against a [`Catalog`] by
//! [`Scenario::build_world`].

use serde::{Deserialize, Serialize};

use super::Catalog;
use crate::entity::{Mission, TargetHandle};
use crate::error::{CoreError, Result};
use crate::grid::{CellCoord, SpatialGrid, Terrain, WallOverlay};
use crate::house::{BaseZone, House, HouseId, Houses};
use crate::math::{from_leptons, LEPTONS_PER_CELL};
use crate::world::World;

/// A rectangle of non-clear terrain, corners inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainPatch {
    /// Terrain to paint.
    pub terrain: Terrain,
    /// Top-left cell.
    pub from: (i32, i32),
    /// Bottom-right cell.
    pub to: (i32, i32),
}

/// A wall segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallData {
    /// Cell x.
    pub x: i32,
    /// Cell y.
    pub y: i32,
    /// Owning house id.
    #[serde(default)]
    pub owner: Option<u8>,
    /// Sandbags and wire rather than concrete.
    #[serde(default)]
    pub crushable: bool,
}

/// Base umbrella of a house.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseData {
    /// Centre cell x.
    pub x: i32,
    /// Centre cell y.
    pub y: i32,
    /// Radius in cells.
    pub radius: i32,
}

/// A house taking part in the scenario.
///
/// # Example RON
///
/// ```ron
/// HouseData(
///     id: 2,
///     name: "USSR",
///     enemy: Some(1),
///     base: Some(BaseData(x: 24, y: 24, radius: 6)),
///     hunts_walls: true,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseData {
    /// House id, 0 to 31.
    pub id: u8,
    /// Display name.
    pub name: String,
    /// Human controlled.
    #[serde(default)]
    pub is_human: bool,
    /// Principal enemy id.
    #[serde(default)]
    pub enemy: Option<u8>,
    /// Allied house ids.
    #[serde(default)]
    pub allies: Vec<u8>,
    /// Base umbrella.
    #[serde(default)]
    pub base: Option<BaseData>,
    /// Allowed to target walls.
    #[serde(default)]
    pub hunts_walls: bool,
}

/// An object placed when the scenario starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedEntity {
    /// Type name from the catalog.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Owning house id.
    pub house: u8,
    /// Cell x.
    pub x: i32,
    /// Cell y.
    pub y: i32,
    /// Standing order.
    #[serde(default)]
    pub mission: Mission,
    /// Starting health as a percentage of full.
    #[serde(default = "full_health")]
    pub health: u32,
    /// Flight altitude in leptons.
    #[serde(default)]
    pub altitude: i64,
    /// Visible to every house from the start.
    #[serde(default = "default_true")]
    pub revealed: bool,
    /// Type names of passengers loaded at start.
    #[serde(default)]
    pub cargo: Vec<String>,
    /// Team number.
    #[serde(default)]
    pub team: Option<u16>,
}

const fn full_health() -> u32 {
    100
}

const fn default_true() -> bool {
    true
}

const fn default_cell_size() -> i64 {
    LEPTONS_PER_CELL
}

/// A complete scenario file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Map width in cells.
    pub width: i32,
    /// Map height in cells.
    pub height: i32,
    /// Cell edge in leptons.
    #[serde(default = "default_cell_size")]
    pub cell_size: i64,
    /// Non-clear terrain.
    #[serde(default)]
    pub terrain: Vec<TerrainPatch>,
    /// Wall segments.
    #[serde(default)]
    pub walls: Vec<WallData>,
    /// Participating houses.
    pub houses: Vec<HouseData>,
    /// Starting objects.
    #[serde(default)]
    pub entities: Vec<PlacedEntity>,
}

impl Scenario {
    /// Parse a scenario from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| CoreError::DataParseError {
            source_name: "scenario".to_string(),
            message: e.to_string(),
        })
    }

    /// Build a playable world, resolving type names against `catalog`.
    pub fn build_world(&self, catalog: &Catalog) -> Result<World> {
        if self.width <= 0 || self.height <= 0 || self.cell_size <= 0 {
            return Err(CoreError::InvalidState(format!(
                "map must have positive size, got {}x{} cells of {} leptons",
                self.width, self.height, self.cell_size
            )));
        }

        let mut grid = SpatialGrid::new(self.width, self.height, from_leptons(self.cell_size));
        for patch in &self.terrain {
            for y in patch.from.1..=patch.to.1 {
                for x in patch.from.0..=patch.to.0 {
                    grid.set_terrain(CellCoord::new(x, y), patch.terrain)?;
                }
            }
        }
        for wall in &self.walls {
            let overlay = WallOverlay {
                owner: wall.owner.map(HouseId),
                crushable: wall.crushable,
            };
            grid.set_wall(CellCoord::new(wall.x, wall.y), Some(overlay))?;
        }
        grid.rebuild_zones();

        let houses = self.build_houses()?;
        let mut world = World::new(grid, houses, catalog.clone());
        let house_ids: Vec<HouseId> = world.houses.iter().map(|h| h.id).collect();

        for placed in &self.entities {
            let owner = HouseId(placed.house);
            if world.houses.get(owner).is_none() {
                return Err(unknown_house(placed.house));
            }
            let handle = spawn_named(&mut world, &placed.type_name, owner)?;
            world.unlimbo(handle, CellCoord::new(placed.x, placed.y))?;
            if placed.altitude > 0 {
                world.set_altitude(handle, from_leptons(placed.altitude))?;
            }
            for passenger in &placed.cargo {
                let rider = spawn_named(&mut world, passenger, owner)?;
                world.load_cargo(handle, rider)?;
            }
            if let Some(entity) = world.entity_mut(handle) {
                entity.mission = placed.mission;
                entity.team = placed.team;
                let scaled = i64::from(entity.max_strength) * i64::from(placed.health) / 100;
                entity.strength = scaled.clamp(1, i64::from(entity.max_strength)) as i32;
            }
            if placed.revealed {
                for &house in &house_ids {
                    world.reveal(handle, house);
                }
            }
        }

        tracing::info!(
            scenario = %self.name,
            houses = house_ids.len(),
            entities = world.entities.len(),
            "Scenario built"
        );
        Ok(world)
    }

    fn build_houses(&self) -> Result<Houses> {
        let mut houses = Houses::new();
        for data in &self.houses {
            let mut house = House::new(HouseId(data.id), data.name.clone());
            house.is_human = data.is_human;
            house.enemy = data.enemy.map(HouseId);
            house.hunts_walls = data.hunts_walls;
            house.base = data.base.as_ref().map(|b| BaseZone {
                center: CellCoord::new(b.x, b.y),
                radius: b.radius,
            });
            houses.insert(house)?;
        }
        for data in &self.houses {
            for &ally in &data.allies {
                if houses.get(HouseId(ally)).is_none() {
                    return Err(unknown_house(ally));
                }
                houses.make_ally(HouseId(data.id), HouseId(ally));
            }
        }
        Ok(houses)
    }
}

fn unknown_house(id: u8) -> CoreError {
    CoreError::UnknownName {
        kind: "house",
        name: id.to_string(),
    }
}

fn spawn_named(world: &mut World, name: &str, owner: HouseId) -> Result<TargetHandle> {
    let type_id = world
        .catalog
        .find_type(name)
        .ok_or_else(|| CoreError::UnknownName {
            kind: "type",
            name: name.to_string(),
        })?;
    world.spawn(type_id, owner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::CloakState;
    use crate::grid::MovementZone;

    const CATALOG: &str = r#"
        CatalogData(
            warheads: [WarheadData(name: "AP", modifiers: [30, 75, 75, 100, 50])],
            weapons: [WeaponData(name: "75mm", range: 1024, rate_of_fire: 40, attack: 25, warhead: Some("AP"))],
            types: [
                TypeData(name: "E1", category: Infantry, reward: 100, strength: 50),
                TypeData(name: "1TNK", category: Unit, reward: 700, strength: 300, primary: Some("75mm")),
                TypeData(name: "APC", category: Unit, reward: 600, strength: 200),
            ],
        )
    "#;

    const SCENARIO: &str = r#"
        Scenario(
            name: "River crossing",
            width: 16,
            height: 12,
            terrain: [TerrainPatch(terrain: Water, from: (7, 0), to: (8, 11))],
            walls: [WallData(x: 3, y: 3, owner: Some(1))],
            houses: [
                HouseData(id: 1, name: "Greece", is_human: true, allies: [3]),
                HouseData(id: 2, name: "USSR", enemy: Some(1),
                          base: Some(BaseData(x: 12, y: 6, radius: 3)), hunts_walls: true),
                HouseData(id: 3, name: "England"),
            ],
            entities: [
                PlacedEntity(type: "1TNK", house: 1, x: 2, y: 2),
                PlacedEntity(type: "APC", house: 2, x: 12, y: 6, mission: Hunt, health: 40, cargo: ["E1", "E1"]),
                PlacedEntity(type: "E1", house: 3, x: 4, y: 9, revealed: false),
            ],
        )
    "#;

    fn catalog() -> Catalog {
        Catalog::from_ron_str(CATALOG).expect("catalog")
    }

    #[test]
    fn test_build_world_from_ron() {
        let world = Scenario::from_ron_str(SCENARIO)
            .and_then(|s| s.build_world(&catalog()))
            .expect("world");

        assert_eq!(world.grid.width(), 16);
        assert!(world.grid.wall_at(CellCoord::new(3, 3)).is_some());
        assert_ne!(
            world.grid.zone_at(CellCoord::new(2, 2), MovementZone::Normal),
            world.grid.zone_at(CellCoord::new(12, 6), MovementZone::Normal)
        );

        assert!(world.houses.is_human(HouseId(1)));
        assert!(world.houses.is_ally(HouseId(1), HouseId(3)));
        assert!(world.houses.is_ally(HouseId(3), HouseId(1)));
        assert!(!world.houses.is_ally(HouseId(1), HouseId(2)));
        assert_eq!(world.houses.get(HouseId(2)).unwrap().enemy, Some(HouseId(1)));
        assert!(world.houses.base_of(HouseId(2)).is_some());

        // Three placed objects plus two passengers.
        assert_eq!(world.entities.len(), 5);
    }

    #[test]
    fn test_placed_entity_state() {
        let world = Scenario::from_ron_str(SCENARIO)
            .and_then(|s| s.build_world(&catalog()))
            .expect("world");

        let apc = world
            .entities
            .iter()
            .find(|e| e.mission == Mission::Hunt)
            .expect("apc");
        assert_eq!(apc.strength, 80);
        assert_eq!(apc.cargo.len(), 2);
        assert_eq!(apc.cell, CellCoord::new(12, 6));
        assert_eq!(apc.cloak, CloakState::Uncloaked);
        assert!(apc.discovered.contains(HouseId(1)));

        let hidden = world
            .entities
            .iter()
            .find(|e| e.owner == HouseId(3))
            .expect("rifleman");
        assert!(!hidden.discovered.contains(HouseId(1)));
        assert!(apc
            .cargo
            .iter()
            .all(|p| world.entity(*p).is_some_and(|e| e.in_limbo)));
    }

    #[test]
    fn test_unknown_type() {
        let text = r#"Scenario(width: 4, height: 4, houses: [HouseData(id: 1, name: "Greece")],
                      entities: [PlacedEntity(type: "MIG", house: 1, x: 0, y: 0)])"#;
        let err = Scenario::from_ron_str(text)
            .and_then(|s| s.build_world(&catalog()))
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownName { kind: "type", .. }));
    }

    #[test]
    fn test_unknown_house() {
        let text = r#"Scenario(width: 4, height: 4, houses: [HouseData(id: 1, name: "Greece")],
                      entities: [PlacedEntity(type: "E1", house: 9, x: 0, y: 0)])"#;
        let err = Scenario::from_ron_str(text)
            .and_then(|s| s.build_world(&catalog()))
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownName { kind: "house", .. }));
    }

    #[test]
    fn test_placement_off_map() {
        let text = r#"Scenario(width: 4, height: 4, houses: [HouseData(id: 1, name: "Greece")],
                      entities: [PlacedEntity(type: "E1", house: 1, x: 4, y: 0)])"#;
        let err = Scenario::from_ron_str(text)
            .and_then(|s| s.build_world(&catalog()))
            .unwrap_err();
        assert!(matches!(err, CoreError::OutOfBounds { x: 4, y: 0 }));
    }

    #[test]
    fn test_malformed_ron() {
        assert!(matches!(
            Scenario::from_ron_str("Scenario(width: )"),
            Err(CoreError::DataParseError { .. })
        ));
    }
}
