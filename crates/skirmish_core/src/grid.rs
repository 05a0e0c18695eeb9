//! Spatial grid with per-cell occupants and per-movement-class zones.
//!
//! The grid is the sole authority for which cell an object occupies.
//! Zones partition the map into reachability islands: two cells share a
//! zone id for a movement class iff a unit of that class could path
//! between them, ignoring other units.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::entity::TargetHandle;
use crate::house::HouseId;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// Integer cell coordinate. May lie outside the map; check with
/// [`SpatialGrid::contains`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct CellCoord {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl CellCoord {
    /// Create a cell coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Offset by a delta.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Chebyshev (ring) distance between cells.
    #[must_use]
    pub fn ring_distance(self, other: Self) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }
}

/// Movement classes that get their own zone partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MovementZone {
    /// Ordinary ground movement; blocked by walls.
    #[default]
    Normal,
    /// Heavy treads that roll over crushable walls.
    Crusher,
    /// Units that break through any wall.
    Destroyer,
    /// Ships.
    Water,
}

impl MovementZone {
    /// Number of movement classes.
    pub const COUNT: usize = 4;

    /// Every movement class.
    pub const ALL: [Self; Self::COUNT] = [Self::Normal, Self::Crusher, Self::Destroyer, Self::Water];

    /// Index into per-cell zone arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Normal => 0,
            Self::Crusher => 1,
            Self::Destroyer => 2,
            Self::Water => 3,
        }
    }
}

/// Reachability island id. `NONE` marks cells impassable for a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ZoneId(pub u16);

impl ZoneId {
    /// Impassable for this movement class.
    pub const NONE: Self = Self(0);
}

/// Base terrain of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Terrain {
    /// Open land.
    #[default]
    Clear,
    /// Open water.
    Water,
    /// Cliffs and rock; nothing passes.
    Rock,
}

/// A wall segment lying on a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WallOverlay {
    /// House that built the wall, if any.
    pub owner: Option<HouseId>,
    /// Sandbags and wire that heavy treads roll over.
    pub crushable: bool,
}

/// One map cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Base terrain.
    pub terrain: Terrain,
    /// Wall overlay, if present.
    pub wall: Option<WallOverlay>,
    /// Ground-layer objects recorded in this cell.
    occupants: Vec<TargetHandle>,
    zones: [ZoneId; MovementZone::COUNT],
}

impl Cell {
    /// Objects recorded in this cell, in placement order.
    #[must_use]
    pub fn occupants(&self) -> &[TargetHandle] {
        &self.occupants
    }

    /// Zone id for a movement class.
    #[must_use]
    pub fn zone(&self, movement: MovementZone) -> ZoneId {
        self.zones[movement.index()]
    }

    /// Whether a movement class can enter this cell.
    #[must_use]
    pub fn is_passable(&self, movement: MovementZone) -> bool {
        match movement {
            MovementZone::Normal => self.terrain == Terrain::Clear && self.wall.is_none(),
            MovementZone::Crusher => {
                self.terrain == Terrain::Clear && self.wall.map_or(true, |w| w.crushable)
            }
            MovementZone::Destroyer => self.terrain == Terrain::Clear,
            MovementZone::Water => self.terrain == Terrain::Water,
        }
    }
}

/// The map: cells in row-major order plus zone bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialGrid {
    width: i32,
    height: i32,
    #[serde(with = "fixed_serde")]
    cell_size: Fixed,
    cells: Vec<Cell>,
}

/// Neighbour offsets for zone flood fill.
const NEIGHBOURS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

impl SpatialGrid {
    /// Create a grid of clear cells.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is not positive, or if `cell_size` is
    /// not positive.
    #[must_use]
    pub fn new(width: i32, height: i32, cell_size: Fixed) -> Self {
        assert!(width > 0, "SpatialGrid width must be positive");
        assert!(height > 0, "SpatialGrid height must be positive");
        assert!(
            cell_size > Fixed::ZERO,
            "SpatialGrid cell_size must be positive"
        );

        let mut grid = Self {
            width,
            height,
            cell_size,
            cells: vec![Cell::default(); (width as usize) * (height as usize)],
        };
        grid.rebuild_zones();
        grid
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Cell size in world units.
    #[must_use]
    pub const fn cell_size(&self) -> Fixed {
        self.cell_size
    }

    #[inline]
    fn index(&self, cell: CellCoord) -> Option<usize> {
        self.contains(cell)
            .then(|| (cell.y as usize) * (self.width as usize) + (cell.x as usize))
    }

    /// Whether a cell lies on the map.
    #[inline]
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    /// Cell data, if on the map.
    #[must_use]
    pub fn cell(&self, cell: CellCoord) -> Option<&Cell> {
        self.index(cell).map(|i| &self.cells[i])
    }

    fn cell_mut(&mut self, cell: CellCoord) -> Option<&mut Cell> {
        self.index(cell).map(|i| &mut self.cells[i])
    }

    /// Cell containing a world position. The result may be off the map.
    #[must_use]
    pub fn cell_at(&self, pos: Vec2Fixed) -> CellCoord {
        CellCoord::new(
            (pos.x / self.cell_size).floor().to_num::<i32>(),
            (pos.y / self.cell_size).floor().to_num::<i32>(),
        )
    }

    /// Cell containing a world position, or `None` when off the map.
    #[must_use]
    pub fn world_to_cell(&self, pos: Vec2Fixed) -> Option<CellCoord> {
        let cell = self.cell_at(pos);
        self.contains(cell).then_some(cell)
    }

    /// World position of a cell centre.
    #[must_use]
    pub fn cell_center(&self, cell: CellCoord) -> Vec2Fixed {
        let half = self.cell_size / Fixed::from_num(2);
        Vec2Fixed::new(
            Fixed::from_num(cell.x) * self.cell_size + half,
            Fixed::from_num(cell.y) * self.cell_size + half,
        )
    }

    /// World position of a cell's top-left corner.
    #[must_use]
    pub fn cell_origin(&self, cell: CellCoord) -> Vec2Fixed {
        Vec2Fixed::new(
            Fixed::from_num(cell.x) * self.cell_size,
            Fixed::from_num(cell.y) * self.cell_size,
        )
    }

    /// Set base terrain. Call [`Self::rebuild_zones`] once edits are done.
    pub fn set_terrain(&mut self, cell: CellCoord, terrain: Terrain) -> crate::error::Result<()> {
        let target = self
            .cell_mut(cell)
            .ok_or(crate::error::CoreError::OutOfBounds {
                x: cell.x,
                y: cell.y,
            })?;
        target.terrain = terrain;
        Ok(())
    }

    /// Place or clear a wall. Call [`Self::rebuild_zones`] once edits are done.
    pub fn set_wall(
        &mut self,
        cell: CellCoord,
        wall: Option<WallOverlay>,
    ) -> crate::error::Result<()> {
        let target = self
            .cell_mut(cell)
            .ok_or(crate::error::CoreError::OutOfBounds {
                x: cell.x,
                y: cell.y,
            })?;
        target.wall = wall;
        Ok(())
    }

    /// Wall overlay on a cell.
    #[must_use]
    pub fn wall_at(&self, cell: CellCoord) -> Option<WallOverlay> {
        self.cell(cell).and_then(|c| c.wall)
    }

    /// Objects recorded in a cell; empty when off the map.
    #[must_use]
    pub fn occupants(&self, cell: CellCoord) -> &[TargetHandle] {
        self.cell(cell).map_or(&[], Cell::occupants)
    }

    /// Record an object in a cell. Returns `false` when off the map.
    pub fn add_occupant(&mut self, cell: CellCoord, handle: TargetHandle) -> bool {
        match self.cell_mut(cell) {
            Some(c) => {
                if !c.occupants.contains(&handle) {
                    c.occupants.push(handle);
                }
                true
            }
            None => false,
        }
    }

    /// Remove an object from a cell.
    pub fn remove_occupant(&mut self, cell: CellCoord, handle: TargetHandle) {
        if let Some(c) = self.cell_mut(cell) {
            c.occupants.retain(|h| *h != handle);
        }
    }

    /// Zone of a cell for a movement class; `NONE` when off the map.
    #[must_use]
    pub fn zone_at(&self, cell: CellCoord, movement: MovementZone) -> ZoneId {
        self.cell(cell).map_or(ZoneId::NONE, |c| c.zone(movement))
    }

    fn passable(&self, cell: CellCoord, movement: MovementZone) -> bool {
        self.cell(cell).is_some_and(|c| c.is_passable(movement))
    }

    /// Recompute every zone partition by flood fill.
    ///
    /// Cells are seeded in row-major order, so the same map always gets
    /// the same zone ids.
    pub fn rebuild_zones(&mut self) {
        for movement in MovementZone::ALL {
            let slot = movement.index();
            for cell in &mut self.cells {
                cell.zones[slot] = ZoneId::NONE;
            }

            let mut next = 1u16;
            let mut queue = VecDeque::new();
            for y in 0..self.height {
                for x in 0..self.width {
                    let seed = CellCoord::new(x, y);
                    let Some(i) = self.index(seed) else { continue };
                    if self.cells[i].zones[slot] != ZoneId::NONE || !self.passable(seed, movement) {
                        continue;
                    }

                    let zone = ZoneId(next);
                    next = next.saturating_add(1);
                    self.cells[i].zones[slot] = zone;
                    queue.push_back(seed);

                    while let Some(current) = queue.pop_front() {
                        for &(dx, dy) in &NEIGHBOURS {
                            let n = current.offset(dx, dy);
                            if !self.passable(n, movement) {
                                continue;
                            }
                            // No corner cutting between two blocked orthogonals.
                            if dx != 0
                                && dy != 0
                                && (!self.passable(current.offset(dx, 0), movement)
                                    || !self.passable(current.offset(0, dy), movement))
                            {
                                continue;
                            }
                            let Some(ni) = self.index(n) else { continue };
                            if self.cells[ni].zones[slot] == ZoneId::NONE {
                                self.cells[ni].zones[slot] = zone;
                                queue.push_back(n);
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Cells on the square ring at Chebyshev distance `radius` around `center`.
///
/// Visits the top and bottom rows column by column, then the left and right
/// columns without their corners. Radius zero yields only the centre. Cells
/// may lie off the map.
pub fn ring(center: CellCoord, radius: i32) -> impl Iterator<Item = CellCoord> {
    let rows = (-radius..=radius).flat_map(move |x| {
        let top = center.offset(x, -radius);
        let bottom = center.offset(x, radius);
        if radius == 0 {
            vec![top]
        } else {
            vec![top, bottom]
        }
    });
    let columns = (-(radius - 1)..radius).flat_map(move |y| {
        [center.offset(-radius, y), center.offset(radius, y)]
    });
    rows.chain(columns)
}
