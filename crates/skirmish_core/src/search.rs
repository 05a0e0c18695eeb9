//! Finding the single best target for an observer.
//!
//! Bounded scans (RANGE or AREA) walk square rings of cells outward from
//! the observer's firing point and stop early once something acceptable
//! turns up. Unbounded scans look at every placed entity.

use crate::combat::Combatant;
use crate::entity::{CloakState, CombatEntity, Target, TargetHandle};
use crate::grid::{ring, CellCoord, ZoneId};
use crate::math::Fixed;
use crate::techno_type::{Category, TypeTraits};
use crate::threat::{CategoryMask, RangeLimit, ThreatEvaluator, ThreatMethod};
use crate::weapon::WeaponSlot;
use crate::world::World;

/// Work done by one search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Rings walked, including the centre ring for healers.
    pub rings_scanned: u32,
    /// On-map cells handed to the cell evaluator.
    pub cells_visited: u32,
    /// Candidates that passed every filter.
    pub candidates_accepted: u32,
}

/// Best target for `observer` under `method`, or `None`.
#[must_use]
pub fn greatest_threat(world: &World, observer: TargetHandle, method: ThreatMethod) -> Option<Target> {
    greatest_threat_with_report(world, observer, method).0
}

/// [`greatest_threat`] plus a record of how much of the map was examined.
#[must_use]
pub fn greatest_threat_with_report(
    world: &World,
    observer: TargetHandle,
    method: ThreatMethod,
) -> (Option<Target>, ScanReport) {
    let mut report = ScanReport::default();
    let Some(evaluator) = ThreatEvaluator::new(world, observer) else {
        return (None, report);
    };
    let me = evaluator.observer();
    let mask = scan_mask(&me, method);

    let found = match evaluator.threat_range(method) {
        Some(range) if method.is_bounded() => {
            let scan = RingScan {
                evaluator: &evaluator,
                method,
                mask,
                range,
            };
            scan.run(&mut report)
        }
        _ => full_map_scan(&evaluator, method, mask, &mut report),
    };

    tracing::trace!(
        ?observer,
        method = method.bits(),
        ?found,
        rings = report.rings_scanned,
        cells = report.cells_visited,
        accepted = report.candidates_accepted,
        "Threat scan finished"
    );
    (found, report)
}

/// Category mask after role overrides. Dogs and healers only ever look at
/// infantry; mechanics look at vehicles and aircraft.
fn scan_mask(me: &Combatant<'_>, method: ThreatMethod) -> CategoryMask {
    let kind = me.kind();
    if kind.has(TypeTraits::DOG) {
        CategoryMask::of(Category::Infantry)
    } else if kind.has(TypeTraits::MECHANIC) {
        CategoryMask::of(Category::Unit).with(Category::Aircraft)
    } else if me.is_healer() {
        CategoryMask::of(Category::Infantry)
    } else {
        CategoryMask::from_method(method)
    }
}

struct RingScan<'a, 'w> {
    evaluator: &'a ThreatEvaluator<'w>,
    method: ThreatMethod,
    mask: CategoryMask,
    range: Fixed,
}

impl RingScan<'_, '_> {
    fn run(&self, report: &mut ScanReport) -> Option<Target> {
        let me = self.evaluator.observer();
        let world = me.world();
        let entity = me.entity();
        let healer = me.is_healer();

        let mut crange = (self.range / world.grid.cell_size()).to_num::<i32>() + 1;
        let start = if healer {
            crange += 1;
            0
        } else {
            1
        };

        // Weapon range is precise enough on its own; only guard-area scans
        // by ground movers care about reachability.
        let zone = (self.method.contains(ThreatMethod::AREA)
            && entity.category.is_mobile()
            && !entity.category.can_fly())
        .then(|| world.zone_of(entity, me.kind().movement));

        let limit = if self.method.contains(ThreatMethod::RANGE) {
            RangeLimit::Weapon
        } else {
            RangeLimit::Within(self.range)
        };

        let mut best: Option<(TargetHandle, i64)> = None;
        let mut mask = self.mask;

        // Flying aircraft are not recorded in cells.
        if self.method.contains(ThreatMethod::AIR) {
            for candidate in world.entities.iter().filter(|e| e.is_airborne()) {
                self.consider(candidate, mask, limit, None, &mut best, report);
            }
        }

        // A landed aircraft is just another vehicle.
        if self.method.contains(ThreatMethod::VEHICLES) {
            mask = mask.with(Category::Aircraft);
        }

        let center = world.grid.cell_at(me.fire_coord(WeaponSlot::Primary));
        let mut wall: Option<(CellCoord, i64)> = None;

        for radius in start..crange {
            report.rings_scanned += 1;
            for cell in ring(center, radius) {
                if !world.grid.contains(cell) {
                    continue;
                }
                report.cells_visited += 1;

                match self.evaluator.evaluate_cell(self.method, mask, cell, limit, zone) {
                    Some((handle, value)) => {
                        report.candidates_accepted += 1;
                        if best.map_or(true, |(_, v)| value > v) {
                            best = Some((handle, value));
                        }
                    }
                    None if best.is_none() => {
                        let value = self.evaluator.evaluate_just_cell(cell);
                        if value > 0 && wall.map_or(true, |(_, v)| value > v) {
                            wall = Some((cell, value));
                        }
                    }
                    None => {}
                }
            }

            if let Some((handle, _)) = best {
                if radius == crange / 4 || radius == crange / 2 {
                    return Some(Target::Object(handle));
                }
            } else if let Some((cell, _)) = wall {
                return Some(Target::Cell(cell));
            }
        }

        best.map(|(handle, _)| Target::Object(handle))
    }

    fn consider(
        &self,
        candidate: &CombatEntity,
        mask: CategoryMask,
        limit: RangeLimit,
        zone: Option<ZoneId>,
        best: &mut Option<(TargetHandle, i64)>,
        report: &mut ScanReport,
    ) {
        if let Some(value) = self
            .evaluator
            .evaluate_object(self.method, mask, limit, candidate, zone)
        {
            report.candidates_accepted += 1;
            if best.map_or(true, |(_, v)| value > v) {
                *best = Some((candidate.handle, value));
            }
        }
    }
}

/// Every aircraft, then every other placed entity, in handle order.
fn full_map_scan(
    evaluator: &ThreatEvaluator<'_>,
    method: ThreatMethod,
    mask: CategoryMask,
    report: &mut ScanReport,
) -> Option<Target> {
    let world = evaluator.observer().world();
    let mut best: Option<(TargetHandle, i64)> = None;

    let aircraft = world
        .entities
        .iter()
        .filter(|e| e.category == Category::Aircraft && mask.contains(Category::Aircraft));
    let ground = world
        .entities
        .iter()
        .filter(|e| e.category != Category::Aircraft);

    for candidate in aircraft.chain(ground) {
        if let Some(value) =
            evaluator.evaluate_object(method, mask, RangeLimit::Unlimited, candidate, None)
        {
            report.candidates_accepted += 1;
            if best.map_or(true, |(_, v)| value > v) {
                best = Some((candidate.handle, value));
            }
        }
    }
    best.map(|(handle, _)| Target::Object(handle))
}

/// Whether an observer may keep pursuing a target.
fn target_legal(world: &World, observer: &Combatant<'_>, target: Target) -> bool {
    if !world.is_target_valid(target) {
        return false;
    }
    match target.as_object().and_then(|h| world.entity(h)) {
        Some(object) => {
            object.cloak != CloakState::Cloaked || observer.kind().has(TypeTraits::DETECTS_CLOAKED)
        }
        None => true,
    }
}

/// Keep or replace an observer's target.
///
/// Under RANGE a target that has moved out of primary weapon range is
/// dropped. A missing or no longer legal target is replaced by the result
/// of [`greatest_threat`]. Returns whether the observer ends up with a
/// legal target.
pub fn target_something_nearby(world: &mut World, observer: TargetHandle, method: ThreatMethod) -> bool {
    let (current, keep) = {
        let Some(me) = Combatant::new(world, observer) else {
            return false;
        };
        let current = me.entity().target;
        let keep = current.filter(|t| {
            target_legal(world, &me, *t)
                && (!method.contains(ThreatMethod::RANGE)
                    || me.in_range_target(*t, WeaponSlot::Primary, true))
        });
        (current, keep)
    };

    if keep.is_some() {
        return true;
    }

    let found = greatest_threat(world, observer, method);
    if found != current {
        tracing::debug!(?observer, ?current, ?found, "Target reacquired");
    }
    world.assign_target(observer, found);
    found.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Terrain, WallOverlay};
    use crate::testing::{Sandbox, GREECE, USSR};

    fn range_ground() -> ThreatMethod {
        ThreatMethod::RANGE | ThreatMethod::GROUND
    }

    #[test]
    fn test_empty_map_terminates_with_none() {
        let mut sb = Sandbox::new();
        let tank = sb.place("1TNK", GREECE, 10, 10);
        let (found, report) =
            greatest_threat_with_report(&sb.world, tank, ThreatMethod::AREA | ThreatMethod::NORMAL);
        assert_eq!(found, None);
        // Area range 8: rings 1 through 8.
        assert_eq!(report.rings_scanned, 8);
        assert!(report.cells_visited <= 17 * 17);
        assert_eq!(report.candidates_accepted, 0);
    }

    #[test]
    fn test_unknown_observer() {
        let mut sb = Sandbox::new();
        let tank = sb.place("1TNK", GREECE, 10, 10);
        sb.world.destroy(tank, None).unwrap();
        assert_eq!(greatest_threat(&sb.world, tank, range_ground()), None);
    }

    #[test]
    fn test_best_value_within_a_ring() {
        let mut sb = Sandbox::new();
        let tank = sb.place("1TNK", GREECE, 10, 10);
        sb.place("E1", USSR, 13, 10);
        let mammoth = sb.place("4TNK", USSR, 10, 13);
        assert_eq!(
            greatest_threat(&sb.world, tank, range_ground()),
            Some(Target::Object(mammoth))
        );
    }

    #[test]
    fn test_early_exit_keeps_nearer_target() {
        let mut sb = Sandbox::new();
        let tank = sb.place("1TNK", GREECE, 10, 10);
        let rifle = sb.place("E1", USSR, 12, 10);
        sb.place("4TNK", USSR, 13, 10);
        // Five rings; a hit by ring 2 ends the scan before the mammoth.
        let (found, report) = greatest_threat_with_report(&sb.world, tank, range_ground());
        assert_eq!(found, Some(Target::Object(rifle)));
        assert_eq!(report.rings_scanned, 2);
    }

    #[test]
    fn test_healer_scans_own_cell() {
        let mut sb = Sandbox::new();
        let medic = sb.place("MEDI", GREECE, 10, 10);
        let patient = sb.place("E1", GREECE, 10, 10);
        sb.world.entity_mut(patient).unwrap().strength = 20;
        let (found, report) = greatest_threat_with_report(&sb.world, medic, range_ground());
        assert_eq!(found, Some(Target::Object(patient)));
        assert!(report.rings_scanned >= 1);
    }

    #[test]
    fn test_dog_only_sees_infantry() {
        let mut sb = Sandbox::new();
        let dog = sb.place("DOG", GREECE, 10, 10);
        sb.place("1TNK", USSR, 11, 10);
        let rifle = sb.place("E1", USSR, 10, 11);
        let method = ThreatMethod::RANGE | ThreatMethod::VEHICLES;
        assert_eq!(greatest_threat(&sb.world, dog, method), Some(Target::Object(rifle)));
    }

    #[test]
    fn test_mechanic_sees_vehicles() {
        let mut sb = Sandbox::new();
        let mechanic = sb.place("MECH", GREECE, 10, 10);
        let tank = sb.place("1TNK", GREECE, 11, 10);
        let rifle = sb.place("E1", GREECE, 10, 11);
        sb.world.entity_mut(tank).unwrap().strength = 100;
        sb.world.entity_mut(rifle).unwrap().strength = 10;
        assert_eq!(
            greatest_threat(&sb.world, mechanic, range_ground()),
            Some(Target::Object(tank))
        );
    }

    #[test]
    fn test_wall_fallback() {
        let mut sb = Sandbox::new();
        let tank = sb.place("1TNK", USSR, 10, 10);
        sb.house_mut(USSR).hunts_walls = true;
        let cell = CellCoord::new(12, 10);
        sb.world
            .grid
            .set_wall(cell, Some(WallOverlay { owner: None, crushable: false }))
            .unwrap();
        assert_eq!(
            greatest_threat(&sb.world, tank, range_ground()),
            Some(Target::Cell(cell))
        );

        // A live target on an earlier ring wins.
        let rifle = sb.place("E1", GREECE, 11, 11);
        assert_eq!(
            greatest_threat(&sb.world, tank, range_ground()),
            Some(Target::Object(rifle))
        );
    }

    #[test]
    fn test_airborne_aircraft_scanned_linearly() {
        let mut sb = Sandbox::new();
        let sam = sb.place("SAM", GREECE, 10, 10);
        let heli = sb.place("HELI", USSR, 14, 10);
        sb.world.set_altitude(heli, Fixed::from_num(3)).unwrap();
        assert!(sb.world.grid.occupants(CellCoord::new(14, 10)).is_empty());

        let method = ThreatMethod::RANGE | ThreatMethod::AIR;
        assert_eq!(greatest_threat(&sb.world, sam, method), Some(Target::Object(heli)));
        assert_eq!(greatest_threat(&sb.world, sam, range_ground()), None);
    }

    #[test]
    fn test_landed_aircraft_count_as_vehicles() {
        let mut sb = Sandbox::new();
        let tank = sb.place("1TNK", GREECE, 10, 10);
        let heli = sb.place("HELI", USSR, 12, 10);
        let method = ThreatMethod::RANGE | ThreatMethod::VEHICLES;
        assert_eq!(greatest_threat(&sb.world, tank, method), Some(Target::Object(heli)));
    }

    #[test]
    fn test_area_scan_respects_zones() {
        let mut sb = Sandbox::new();
        for y in 0..32 {
            sb.world.grid.set_terrain(CellCoord::new(12, y), Terrain::Water).unwrap();
        }
        sb.world.grid.rebuild_zones();
        let tank = sb.place("1TNK", GREECE, 10, 10);
        let rifle = sb.place("E1", USSR, 14, 10);

        let area = ThreatMethod::AREA | ThreatMethod::GROUND;
        assert_eq!(greatest_threat(&sb.world, tank, area), None);
        assert_eq!(
            greatest_threat(&sb.world, tank, range_ground()),
            Some(Target::Object(rifle))
        );
    }

    #[test]
    fn test_full_map_scan() {
        let mut sb = Sandbox::new();
        let tank = sb.place("1TNK", GREECE, 2, 2);
        let first = sb.place("E1", USSR, 20, 2);
        sb.place("E1", USSR, 2, 20);
        let (found, report) = greatest_threat_with_report(&sb.world, tank, ThreatMethod::GROUND);
        // Same value: the lower handle wins.
        assert_eq!(found, Some(Target::Object(first)));
        assert_eq!(report.rings_scanned, 0);
        assert_eq!(report.candidates_accepted, 2);
    }

    #[test]
    fn test_target_something_nearby() {
        let mut sb = Sandbox::new();
        let tank = sb.place("1TNK", GREECE, 10, 10);
        let far = sb.place("E1", USSR, 25, 10);
        let near = sb.place("E1", USSR, 12, 10);

        sb.world.assign_target(tank, Some(Target::Object(far)));
        // Out of range is fine when not scanning by range.
        assert!(target_something_nearby(&mut sb.world, tank, ThreatMethod::GROUND));
        assert_eq!(sb.entity(tank).target, Some(Target::Object(far)));

        assert!(target_something_nearby(&mut sb.world, tank, range_ground()));
        assert_eq!(sb.entity(tank).target, Some(Target::Object(near)));

        sb.world.entity_mut(near).unwrap().cloak = CloakState::Cloaked;
        sb.world.limbo(far).unwrap();
        assert!(!target_something_nearby(&mut sb.world, tank, range_ground()));
        assert_eq!(sb.entity(tank).target, None);
    }
}
