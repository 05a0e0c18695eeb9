//! Cloaking device properties.

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use skirmish_core::cloak::{cloaking_ai, do_uncloak, visual_character, CloakEvent, VisualType};
use skirmish_core::entity::CloakState;
use skirmish_test_utils::fixtures::{WorldBuilder, GREECE, USSR};

#[test]
fn test_cloaked_unit_hidden_from_enemies_only() {
    let mut builder = WorldBuilder::new(16, 16);
    let stank = builder.place("STNK", USSR, 8, 8);
    let mut world = builder.build();
    let mut rng = ChaCha8Rng::seed_from_u64(0);

    while world.entity(stank).unwrap().cloak != CloakState::Cloaked {
        cloaking_ai(&mut world, stank, &mut rng);
    }

    let entity = world.entity(stank).unwrap();
    assert_eq!(visual_character(&world, entity, false, GREECE), VisualType::Hidden);
    assert_eq!(visual_character(&world, entity, false, USSR), VisualType::Shadowy);
    assert_eq!(visual_character(&world, entity, true, USSR), VisualType::Hidden);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// A healthy device hides within `max_uncloak_stage + 1` ticks and
    /// reappears within `max_uncloak_stage` ticks of uncloaking.
    #[test]
    fn prop_cloak_cycle_closes(seed in any::<u64>(), health in 30u32..=100) {
        let mut builder = WorldBuilder::new(16, 16);
        let stank = builder.place("STNK", USSR, 8, 8);
        let max_strength = builder.entity_mut(stank).max_strength;
        builder.entity_mut(stank).strength = (max_strength * health as i32 / 100).max(1);
        let mut world = builder.build();
        let max = world.rules().max_uncloak_stage;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut ticks = 0;
        while world.entity(stank).unwrap().cloak != CloakState::Cloaked {
            cloaking_ai(&mut world, stank, &mut rng);
            ticks += 1;
            prop_assert!(ticks <= max + 1);
        }

        prop_assert!(do_uncloak(&mut world, stank));
        let mut ticks = 0;
        while world.entity(stank).unwrap().cloak != CloakState::Uncloaked {
            cloaking_ai(&mut world, stank, &mut rng);
            ticks += 1;
            prop_assert!(ticks <= max);
        }
        prop_assert_eq!(world.entity(stank).unwrap().cloak_stage, 0);
    }

    /// An object carrying a flag is never observed fully cloaked.
    #[test]
    fn prop_flag_carrier_never_cloaked(seed in any::<u64>(), health in 1u32..=100) {
        let mut builder = WorldBuilder::new(16, 16);
        let stank = builder.place("STNK", USSR, 8, 8);
        let max_strength = builder.entity_mut(stank).max_strength;
        let entity = builder.entity_mut(stank);
        entity.strength = (max_strength * health as i32 / 100).max(1);
        entity.flag_carried = Some(GREECE);
        let mut world = builder.build();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        for _ in 0..400 {
            let events = cloaking_ai(&mut world, stank, &mut rng);
            prop_assert!(!events.contains(&CloakEvent::Hidden));
            prop_assert_ne!(world.entity(stank).unwrap().cloak, CloakState::Cloaked);
        }
    }
}
