//! Scoring properties of the threat evaluator and range checks.

use proptest::prelude::*;
use skirmish_core::combat::Combatant;
use skirmish_core::entity::{CloakState, Mission, TargetHandle};
use skirmish_core::grid::{ring, CellCoord};
use skirmish_core::math::{Fixed, Vec2Fixed};
use skirmish_core::techno_type::{Category, TechnoType};
use skirmish_core::threat::{CategoryMask, RangeLimit, ThreatEvaluator, ThreatMethod};
use skirmish_core::weapon::WeaponSlot;
use skirmish_core::world::World;
use skirmish_test_utils::fixtures::{
    fixed, fixed_f, standard_catalog, WorldBuilder, ENGLAND, GREECE, USSR,
};

fn eval(
    world: &World,
    observer: TargetHandle,
    candidate: TargetHandle,
    method: ThreatMethod,
    range: RangeLimit,
) -> Option<i64> {
    let evaluator = ThreatEvaluator::new(world, observer).expect("observer");
    let entity = world.entity(candidate).expect("candidate");
    evaluator.evaluate_object(method, CategoryMask::from_method(method), range, entity, None)
}

#[test]
fn test_worked_example_value() {
    let mut builder = WorldBuilder::new(32, 32);
    let jeep = builder.place("JEEP", GREECE, 10, 10);
    let rifle = builder.place("E1", USSR, 12, 10);
    builder.entity_mut(rifle).kills = 4;
    let world = builder.build();

    // (reward + kills), doubled for being in range, over distance 2 + 1.
    let value = eval(&world, jeep, rifle, ThreatMethod::INFANTRY, RangeLimit::Weapon);
    assert_eq!(value, Some((100 + 4) * 2 * 32_000 / 3));
}

#[test]
fn test_healer_only_sees_injured_allies() {
    let mut builder = WorldBuilder::new(32, 32);
    let medic = builder.place("MEDI", GREECE, 10, 10);
    let ally = builder.place("E1", ENGLAND, 11, 10);
    let enemy = builder.place("E1", USSR, 10, 11);
    let method = ThreatMethod::INFANTRY;

    let world = builder.clone().build();
    assert_eq!(eval(&world, medic, ally, method, RangeLimit::Weapon), None);
    assert_eq!(eval(&world, medic, enemy, method, RangeLimit::Weapon), None);

    builder.entity_mut(ally).strength = 10;
    let world = builder.build();
    assert!(eval(&world, medic, ally, method, RangeLimit::Weapon).is_some_and(|v| v > 0));
}

#[test]
fn test_reciprocal_range_hides_turret_offset() {
    let mut catalog = standard_catalog();
    let mut turret = TechnoType::new("TURR", Category::Unit);
    turret.max_strength = 200;
    turret.primary = catalog.find_weapon("75mm");
    turret.fire_offset = Vec2Fixed::new(fixed_f(0.5), Fixed::ZERO);
    catalog.add_type(turret).expect("new type");

    let mut builder = WorldBuilder::with_catalog(catalog, 32, 32);
    let a = builder.place("TURR", GREECE, 10, 10);
    let b = builder.place("TURR", USSR, 14, 10);
    let world = builder.build();

    let ca = Combatant::new(&world, a).unwrap();
    let cb = Combatant::new(&world, b).unwrap();
    let ea = world.entity(a).unwrap();
    let eb = world.entity(b).unwrap();

    // A fires from 11.0 at B's centre 14.5; B fires from 15.0 at A's 10.5.
    assert!(ca.in_range(eb, WeaponSlot::Primary, false));
    assert!(!cb.in_range(ea, WeaponSlot::Primary, false));

    assert!(ca.in_range(eb, WeaponSlot::Primary, true));
    assert!(cb.in_range(ea, WeaponSlot::Primary, true));
}

#[test]
fn test_area_suppression_without_buildings_is_neutral() {
    let mut builder = WorldBuilder::new(32, 32);
    let arty = builder.place("ARTY", GREECE, 2, 2);
    let world = builder.build();
    let evaluator = ThreatEvaluator::new(&world, arty).unwrap();
    assert_eq!(evaluator.area_modify(CellCoord::new(20, 20)), Fixed::ONE);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every filter rejects on its own; a clean candidate scores positive.
    #[test]
    fn prop_filters_are_conjunctive(
        allied in any::<bool>(),
        harmless in any::<bool>(),
        far in any::<bool>(),
        cloaked in any::<bool>(),
        masked in any::<bool>(),
        limbo in any::<bool>(),
    ) {
        let mut builder = WorldBuilder::new(40, 40);
        let jeep = builder.place("JEEP", GREECE, 10, 10);
        let owner = if allied { ENGLAND } else { USSR };
        let x = if far { 30 } else { 12 };
        let rifle = builder.place("E1", owner, x, 10);
        if harmless {
            builder.entity_mut(rifle).mission = Mission::Harmless;
        }
        if cloaked {
            builder.entity_mut(rifle).cloak = CloakState::Cloaked;
        }
        if limbo {
            builder.world_mut().limbo(rifle).unwrap();
        }
        let world = builder.build();
        let method = if masked { ThreatMethod::VEHICLES } else { ThreatMethod::INFANTRY };

        let value = eval(&world, jeep, rifle, method, RangeLimit::Weapon);
        let rejected = allied || harmless || far || cloaked || masked || limbo;
        if rejected {
            prop_assert_eq!(value, None);
        } else {
            prop_assert!(value.is_some_and(|v| v > 0));
        }
    }

    /// Farther candidates never score higher than nearer identical ones.
    #[test]
    fn prop_distance_monotonic(near in 1i32..30, extra in 0i32..8) {
        let far = (near + extra).min(36);
        let mut builder = WorldBuilder::new(40, 40);
        let jeep = builder.place("JEEP", GREECE, 2, 20);
        let a = builder.place("E1", USSR, 2 + near, 20);
        let b = builder.place("E1", USSR, 2 + far, 21);
        let world = builder.build();

        let method = ThreatMethod::GROUND;
        let va = eval(&world, jeep, a, method, RangeLimit::Unlimited).unwrap();
        let vb = eval(&world, jeep, b, method, RangeLimit::Unlimited).unwrap();
        prop_assert!(va >= vb);
        prop_assert!(vb >= 1);
    }

    /// Each allied building near the aim point halves the fraction.
    #[test]
    fn prop_area_suppression_halves(count in 0usize..=8) {
        let mut builder = WorldBuilder::new(32, 32);
        let arty = builder.place("ARTY", GREECE, 2, 2);
        let center = CellCoord::new(16, 16);
        for cell in ring(center, 1).take(count) {
            builder.place("GUN", ENGLAND, cell.x, cell.y);
        }
        let world = builder.build();

        let fraction = ThreatEvaluator::new(&world, arty).unwrap().area_modify(center);
        prop_assert!(fraction > Fixed::ZERO);
        prop_assert_eq!(fraction, Fixed::ONE / fixed(1 << count));
    }
}
