//! Data structures loaded from RON.
//!
//! [`catalog`] holds weapons, warheads and object types; [`scenario`]
//! describes a map and what stands on it.
//!
//! **Note:** This module contains no file IO - it only parses text.
//! Reading files is left to the caller (see `skirmish_tools`).

mod catalog;
mod scenario;

pub use catalog::{Catalog, CatalogData, TypeData, WarheadData, WeaponData};
pub use scenario::{BaseData, HouseData, PlacedEntity, Scenario, TerrainPatch, WallData};
