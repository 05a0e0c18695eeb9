//! Houses (players and neutral owners) and the alliance relation.

use serde::{Deserialize, Serialize};

use crate::grid::CellCoord;

/// Maximum number of houses a world can hold.
///
/// Discovery bookkeeping stores one bit per house in a `u32`.
pub const MAX_HOUSES: usize = 32;

/// Numeric house identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HouseId(pub u8);

impl HouseId {
    /// The neutral (civilian) house.
    pub const NEUTRAL: Self = Self(0);

    /// Raw index into house tables.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Whether this is the neutral house.
    #[must_use]
    pub const fn is_neutral(self) -> bool {
        self.0 == Self::NEUTRAL.0
    }
}

/// A house's base area: the umbrella its defenses cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseZone {
    /// Centre cell of the base.
    pub center: CellCoord,
    /// Radius in cells (square metric).
    pub radius: i32,
}

impl BaseZone {
    /// Whether a cell falls inside the base area.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        (cell.x - self.center.x).abs() <= self.radius && (cell.y - self.center.y).abs() <= self.radius
    }
}

/// A player or neutral owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct House {
    /// Identifier.
    pub id: HouseId,
    /// Display name.
    pub name: String,
    /// Controlled by a human player.
    pub is_human: bool,
    /// Principal enemy this house concentrates attacks on.
    pub enemy: Option<HouseId>,
    /// Base umbrella, if the house has a base.
    pub base: Option<BaseZone>,
    /// Computer difficulty allows shooting at walls.
    pub hunts_walls: bool,
}

impl House {
    /// Create a computer-controlled house with no base.
    #[must_use]
    pub fn new(id: HouseId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_human: false,
            enemy: None,
            base: None,
            hunts_walls: false,
        }
    }
}

/// All houses in a world plus the symmetric alliance table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Houses {
    houses: Vec<House>,
    /// Row `i` holds one bit per house allied with house `i`.
    alliances: Vec<u32>,
}

impl Houses {
    /// Create an empty house table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a house.
    ///
    /// Ids at or beyond [`MAX_HOUSES`] are rejected.
    pub fn insert(&mut self, house: House) -> crate::error::Result<()> {
        let index = house.id.index();
        if index >= MAX_HOUSES {
            return Err(crate::error::CoreError::InvalidState(format!(
                "house id {} exceeds the limit of {MAX_HOUSES}",
                house.id.0
            )));
        }
        if let Some(existing) = self.houses.iter_mut().find(|h| h.id == house.id) {
            *existing = house;
        } else {
            self.houses.push(house);
            self.houses.sort_by_key(|h| h.id);
        }
        if self.alliances.len() <= index {
            self.alliances.resize(index + 1, 0);
        }
        Ok(())
    }

    /// Look up a house.
    #[must_use]
    pub fn get(&self, id: HouseId) -> Option<&House> {
        self.houses.iter().find(|h| h.id == id)
    }

    /// Look up a house mutably.
    pub fn get_mut(&mut self, id: HouseId) -> Option<&mut House> {
        self.houses.iter_mut().find(|h| h.id == id)
    }

    /// Iterate houses in id order.
    pub fn iter(&self) -> impl Iterator<Item = &House> {
        self.houses.iter()
    }

    /// Declare two houses allies. The relation is symmetric.
    pub fn make_ally(&mut self, a: HouseId, b: HouseId) {
        let needed = a.index().max(b.index()) + 1;
        if needed > MAX_HOUSES {
            return;
        }
        if self.alliances.len() < needed {
            self.alliances.resize(needed, 0);
        }
        self.alliances[a.index()] |= 1 << b.index();
        self.alliances[b.index()] |= 1 << a.index();
    }

    /// Break an alliance in both directions.
    pub fn make_enemy(&mut self, a: HouseId, b: HouseId) {
        if let (Some(row), Some(bit)) = (self.alliances.get_mut(a.index()), house_bit(b)) {
            *row &= !bit;
        }
        if let (Some(row), Some(bit)) = (self.alliances.get_mut(b.index()), house_bit(a)) {
            *row &= !bit;
        }
    }

    /// Whether two houses are allied. A house is always its own ally.
    #[must_use]
    pub fn is_ally(&self, a: HouseId, b: HouseId) -> bool {
        if a == b {
            return true;
        }
        self.alliances
            .get(a.index())
            .zip(house_bit(b))
            .is_some_and(|(row, bit)| row & bit != 0)
    }

    /// Whether a house is human controlled. Unknown houses count as computer.
    #[must_use]
    pub fn is_human(&self, id: HouseId) -> bool {
        self.get(id).is_some_and(|h| h.is_human)
    }

    /// Base umbrella of a house, if any.
    #[must_use]
    pub fn base_of(&self, id: HouseId) -> Option<BaseZone> {
        self.get(id).and_then(|h| h.base)
    }
}

/// Alliance-row bit for a house, `None` past [`MAX_HOUSES`].
fn house_bit(id: HouseId) -> Option<u32> {
    1u32.checked_shl(u32::from(id.0))
}
