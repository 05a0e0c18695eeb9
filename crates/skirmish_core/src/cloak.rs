//! Cloaking device state machine.
//!
//! A cloak-capable object fades through `max_uncloak_stage` stages between
//! [`CloakState::Uncloaked`] and [`CloakState::Cloaked`]. This module is the
//! only writer of the cloak fields on [`CombatEntity`]; everything else reads
//! them.
//!
//! Reversing a fade part-way mirrors the stage counter, so the visual
//! character continues from where it was instead of jumping.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::combat::Combatant;
use crate::entity::{CloakState, CombatEntity, Target, TargetHandle};
use crate::house::HouseId;
use crate::techno_type::{Category, TypeTraits};
use crate::weapon::WeaponSlot;
use crate::world::World;

/// Something observable that happened during a cloak tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloakEvent {
    /// Began fading out.
    StartedCloaking,
    /// Finished fading out.
    Hidden,
    /// Forced back out at the moment of hiding (flag carriers).
    Shimmered,
    /// Finished fading in.
    Revealed,
    /// A computer-owned vehicle should scatter after hiding.
    Scatter,
    /// Too damaged to finish cloaking; fading back in.
    CloakAborted,
}

/// How an object should be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VisualType {
    /// Fully visible.
    Normal,
    /// Slightly faded.
    Indistinct,
    /// Darkened.
    Darken,
    /// Translucent shadow.
    Shadowy,
    /// Barely visible shimmer.
    Ripple,
    /// Not drawn.
    Hidden,
}

fn is_cloakable(world: &World, entity: &CombatEntity) -> bool {
    world
        .type_of(entity)
        .is_some_and(|kind| kind.has(TypeTraits::CLOAKABLE))
}

fn max_stage(world: &World) -> u32 {
    world.rules().max_uncloak_stage.max(1)
}

/// Draw mode of an entity as seen by `viewer`.
///
/// With `raw` set the owner gets no special treatment; the cloak machine
/// uses the raw character to decide its transitions.
#[must_use]
pub fn visual_character(world: &World, entity: &CombatEntity, raw: bool, viewer: HouseId) -> VisualType {
    let rules = world.rules();
    let own = entity.owner == viewer;

    if world
        .type_of(entity)
        .is_some_and(|kind| kind.has(TypeTraits::INVISIBLE))
    {
        return if own || rules.editor_mode {
            VisualType::Normal
        } else {
            VisualType::Hidden
        };
    }

    match entity.cloak {
        CloakState::Uncloaked => return VisualType::Normal,
        _ if rules.editor_mode => return VisualType::Normal,
        CloakState::Cloaked => {
            return if !raw && own {
                VisualType::Shadowy
            } else {
                VisualType::Hidden
            };
        }
        CloakState::Cloaking | CloakState::Uncloaking => {}
    }

    let max = i64::from(max_stage(world));
    let mut stage = i64::from(entity.cloak_stage);
    if entity.cloak == CloakState::Uncloaking {
        stage = max - stage;
    }
    if stage <= 0 {
        return VisualType::Normal;
    }

    let fraction = stage * 256 / max;
    if fraction < 0x40 {
        VisualType::Indistinct
    } else if fraction < 0x80 {
        VisualType::Darken
    } else if fraction < 0xC0 || (!raw && own) {
        VisualType::Shadowy
    } else if fraction < 0xFF {
        VisualType::Ripple
    } else {
        VisualType::Hidden
    }
}

/// Whether an uncloaked object could start cloaking now.
///
/// It must be cloak-capable, not blocked from re-cloaking, armed and
/// cooled down, and not about to shoot at something in range.
#[must_use]
pub fn is_ready_to_cloak(world: &World, handle: TargetHandle) -> bool {
    let Some(me) = Combatant::new(world, handle) else {
        return false;
    };
    let entity = me.entity();
    if !me.kind().has(TypeTraits::CLOAKABLE)
        || entity.recloak_suppressed
        || entity.cloak != CloakState::Uncloaked
        || entity.arm > 0
        || entity.cloak_stage != 0
        || entity.cloak_delay > 0
    {
        return false;
    }

    !entity.target.is_some_and(|target| match target {
        Target::Object(_) => {
            world.is_target_valid(target) && me.in_range_target(target, WeaponSlot::Primary, true)
        }
        Target::Cell(_) => false,
    })
}

/// Start fading out. No-op unless cloak-capable and uncloaked or uncloaking.
///
/// Everything targeting the object loses it.
pub fn do_cloak(world: &mut World, handle: TargetHandle) -> bool {
    let max = max_stage(world);
    let Some(entity) = world.entity(handle) else {
        return false;
    };
    if !is_cloakable(world, entity) {
        return false;
    }
    let stage = match entity.cloak {
        CloakState::Uncloaked => 0,
        CloakState::Uncloaking => max.saturating_sub(entity.cloak_stage),
        CloakState::Cloaking | CloakState::Cloaked => return false,
    };

    world.detach_all(handle);
    if let Some(entity) = world.entity_mut(handle) {
        entity.cloak = CloakState::Cloaking;
        entity.cloak_stage = stage;
    }
    tracing::trace!(?handle, stage, "Cloaking");
    true
}

/// Start fading in. No-op unless cloak-capable and cloaked or cloaking.
pub fn do_uncloak(world: &mut World, handle: TargetHandle) -> bool {
    let max = max_stage(world);
    let cloakable = world
        .entity(handle)
        .is_some_and(|entity| is_cloakable(world, entity));
    let Some(entity) = world.entity_mut(handle).filter(|_| cloakable) else {
        return false;
    };
    let stage = match entity.cloak {
        CloakState::Cloaked => 0,
        CloakState::Cloaking => max.saturating_sub(entity.cloak_stage),
        CloakState::Uncloaked | CloakState::Uncloaking => return false,
    };
    entity.cloak = CloakState::Uncloaking;
    entity.cloak_stage = stage;
    tracing::trace!(?handle, stage, "Uncloaking");
    true
}

/// Shimmer a cloaked or cloaking object. This is a full uncloak.
pub fn do_shimmer(world: &mut World, handle: TargetHandle) -> bool {
    do_uncloak(world, handle)
}

/// Advance one object's cloaking device by one tick.
///
/// Uncloaked objects count down their re-cloak delay and start cloaking
/// when ready: always when healthy, otherwise with a 1 in 26 chance per
/// tick. Fading objects advance one stage per tick. A badly damaged object
/// in the darkened band may give up and fade back in. On reaching the
/// hidden point a flag carrier shimmers straight back out; anything else
/// settles into [`CloakState::Cloaked`] and is dropped by everyone
/// targeting it.
pub fn cloaking_ai(world: &mut World, handle: TargetHandle, rng: &mut impl Rng) -> Vec<CloakEvent> {
    let mut events = Vec::new();
    let Some(entity) = world.entity(handle) else {
        return events;
    };
    if !entity.is_active() || !is_cloakable(world, entity) {
        return events;
    }

    let red = world.rules().condition_red_ratio();
    let max = max_stage(world);
    let healthy = entity.health_ratio() > red;
    let owner = entity.owner;
    let state = entity.cloak;

    match state {
        CloakState::Uncloaked => {
            if let Some(entity) = world.entity_mut(handle) {
                entity.cloak_delay = entity.cloak_delay.saturating_sub(1);
            }
            if is_ready_to_cloak(world, handle)
                && (healthy || rng.gen_range(0u32..26) == 1)
                && do_cloak(world, handle)
            {
                events.push(CloakEvent::StartedCloaking);
            }
        }

        CloakState::Cloaking => {
            let visual = advance(world, handle, owner);
            match visual {
                Some(VisualType::Darken) if !healthy && rng.gen_range(1u32..=3) == 1 => {
                    if let Some(entity) = world.entity_mut(handle) {
                        entity.cloak = CloakState::Uncloaking;
                        entity.cloak_stage = max.saturating_sub(entity.cloak_stage);
                    }
                    tracing::debug!(?handle, "Cloak aborted");
                    events.push(CloakEvent::CloakAborted);
                }
                Some(VisualType::Hidden) => hide(world, handle, &mut events),
                _ => {}
            }
        }

        CloakState::Uncloaking => {
            if advance(world, handle, owner) == Some(VisualType::Normal) {
                let delay = world.rules().cloak_delay_ticks();
                if let Some(entity) = world.entity_mut(handle) {
                    entity.cloak = CloakState::Uncloaked;
                    entity.cloak_stage = 0;
                    entity.cloak_delay = delay;
                    entity.scattered = false;
                }
                events.push(CloakEvent::Revealed);
            }
        }

        CloakState::Cloaked => {}
    }

    events
}

/// Step the fade by one stage and return the new raw character.
fn advance(world: &mut World, handle: TargetHandle, owner: HouseId) -> Option<VisualType> {
    let entity = world.entity_mut(handle)?;
    entity.cloak_stage = entity.cloak_stage.saturating_add(1);
    let entity = world.entity(handle)?;
    Some(visual_character(world, entity, true, owner))
}

fn hide(world: &mut World, handle: TargetHandle, events: &mut Vec<CloakEvent>) {
    let Some(entity) = world.entity(handle) else {
        return;
    };
    let flagged = entity.flag_carried.is_some();
    let scatter = entity.category == Category::Unit
        && !entity.scattered
        && !world.houses.is_human(entity.owner);

    if flagged {
        // Never settles into Cloaked while carrying a flag.
        if do_shimmer(world, handle) {
            events.push(CloakEvent::Shimmered);
        }
    } else {
        if let Some(entity) = world.entity_mut(handle) {
            entity.cloak = CloakState::Cloaked;
            entity.cloak_stage = 0;
        }
        world.detach_all(handle);
        events.push(CloakEvent::Hidden);
        tracing::debug!(?handle, "Fully cloaked");
    }

    if scatter {
        if let Some(entity) = world.entity_mut(handle) {
            entity.scattered = true;
        }
        events.push(CloakEvent::Scatter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Fixed;
    use crate::testing::{Sandbox, GREECE, USSR};
    use rand::rngs::mock::StepRng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn set_cloak(sb: &mut Sandbox, handle: TargetHandle, cloak: CloakState, stage: u32) {
        let entity = sb.world.entity_mut(handle).unwrap();
        entity.cloak = cloak;
        entity.cloak_stage = stage;
    }

    fn visual(sb: &Sandbox, handle: TargetHandle, raw: bool, viewer: u8) -> VisualType {
        visual_character(&sb.world, sb.entity(handle), raw, HouseId(viewer))
    }

    #[test]
    fn test_visual_character_bands() {
        let mut sb = Sandbox::new();
        let tank = sb.place("STNK", USSR, 10, 10);
        assert_eq!(visual(&sb, tank, true, GREECE), VisualType::Normal);

        let cases = [
            (0, VisualType::Normal),
            (5, VisualType::Indistinct),
            (10, VisualType::Darken),
            (20, VisualType::Shadowy),
            (30, VisualType::Ripple),
            (37, VisualType::Ripple),
            (38, VisualType::Hidden),
        ];
        for (stage, expected) in cases {
            set_cloak(&mut sb, tank, CloakState::Cloaking, stage);
            assert_eq!(visual(&sb, tank, true, GREECE), expected, "stage {stage}");
        }

        // Owners see a shadow where others see the ripple.
        set_cloak(&mut sb, tank, CloakState::Cloaking, 30);
        assert_eq!(visual(&sb, tank, false, USSR), VisualType::Shadowy);
        assert_eq!(visual(&sb, tank, true, USSR), VisualType::Ripple);

        // Uncloaking runs the bands backwards.
        set_cloak(&mut sb, tank, CloakState::Uncloaking, 0);
        assert_eq!(visual(&sb, tank, true, GREECE), VisualType::Hidden);
        set_cloak(&mut sb, tank, CloakState::Uncloaking, 33);
        assert_eq!(visual(&sb, tank, true, GREECE), VisualType::Indistinct);
        set_cloak(&mut sb, tank, CloakState::Uncloaking, 38);
        assert_eq!(visual(&sb, tank, true, GREECE), VisualType::Normal);

        set_cloak(&mut sb, tank, CloakState::Cloaked, 0);
        assert_eq!(visual(&sb, tank, true, USSR), VisualType::Hidden);
        assert_eq!(visual(&sb, tank, false, USSR), VisualType::Shadowy);
        assert_eq!(visual(&sb, tank, false, GREECE), VisualType::Hidden);
    }

    #[test]
    fn test_visual_character_editor_and_invisible() {
        let mut rules = crate::rules::RulesConfig::default();
        rules.editor_mode = true;
        let mut sb = Sandbox::with_rules(rules);
        let tank = sb.place("STNK", USSR, 10, 10);
        let ghost = sb.place("GHOST", USSR, 12, 10);
        set_cloak(&mut sb, tank, CloakState::Cloaked, 0);
        assert_eq!(visual(&sb, tank, true, GREECE), VisualType::Normal);
        assert_eq!(visual(&sb, ghost, true, GREECE), VisualType::Normal);

        let mut sb = Sandbox::new();
        let ghost = sb.place("GHOST", USSR, 12, 10);
        assert_eq!(visual(&sb, ghost, true, GREECE), VisualType::Hidden);
        assert_eq!(visual(&sb, ghost, true, USSR), VisualType::Normal);
    }

    #[test]
    fn test_cycle_closure() {
        let mut sb = Sandbox::new();
        let tank = sb.place("STNK", USSR, 10, 10);
        let before = sb.entity(tank).clone();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let max = sb.world.rules().max_uncloak_stage;

        let mut ticks = 0;
        while sb.entity(tank).cloak != CloakState::Cloaked {
            cloaking_ai(&mut sb.world, tank, &mut rng);
            ticks += 1;
            assert!(ticks <= max + 1, "did not cloak");
        }

        assert!(do_uncloak(&mut sb.world, tank));
        let mut ticks = 0;
        while sb.entity(tank).cloak != CloakState::Uncloaked {
            cloaking_ai(&mut sb.world, tank, &mut rng);
            ticks += 1;
            assert!(ticks <= max, "did not uncloak");
        }

        let after = sb.entity(tank);
        assert_eq!(after.handle, before.handle);
        assert_eq!(after.type_id, before.type_id);
        assert_eq!(after.cloak_stage, 0);
        assert_eq!(after.cloak_delay, sb.world.rules().cloak_delay_ticks());
        assert!(is_cloakable(&sb.world, after));
    }

    #[test]
    fn test_event_sequence() {
        let mut sb = Sandbox::new();
        let tank = sb.place("STNK", USSR, 10, 10);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut seen = Vec::new();
        for _ in 0..40 {
            seen.extend(cloaking_ai(&mut sb.world, tank, &mut rng));
        }
        assert_eq!(
            seen,
            vec![CloakEvent::StartedCloaking, CloakEvent::Hidden, CloakEvent::Scatter]
        );

        // Human-owned units do not scatter.
        let mut sb = Sandbox::new();
        sb.house_mut(GREECE).is_human = true;
        let tank = sb.place("STNK", GREECE, 10, 10);
        let mut seen = Vec::new();
        for _ in 0..40 {
            seen.extend(cloaking_ai(&mut sb.world, tank, &mut rng));
        }
        assert_eq!(seen, vec![CloakEvent::StartedCloaking, CloakEvent::Hidden]);
    }

    #[test]
    fn test_flag_carrier_never_cloaked() {
        let mut sb = Sandbox::new();
        let tank = sb.place("STNK", USSR, 10, 10);
        sb.world.entity_mut(tank).unwrap().flag_carried = Some(HouseId(GREECE));
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut shimmered = false;
        for _ in 0..300 {
            let events = cloaking_ai(&mut sb.world, tank, &mut rng);
            shimmered |= events.contains(&CloakEvent::Shimmered);
            assert_ne!(sb.entity(tank).cloak, CloakState::Cloaked);
        }
        assert!(shimmered);
    }

    #[test]
    fn test_damaged_abort_in_darken_band() {
        let mut sb = Sandbox::new();
        let tank = sb.place("STNK", USSR, 10, 10);
        sb.world.entity_mut(tank).unwrap().strength = 20;
        assert!(do_cloak(&mut sb.world, tank));

        // Every roll comes up as the lowest value.
        let mut rng = StepRng::new(0, 0);
        let mut aborted_at = None;
        for _ in 0..20 {
            let events = cloaking_ai(&mut sb.world, tank, &mut rng);
            if events.contains(&CloakEvent::CloakAborted) {
                aborted_at = Some(sb.entity(tank).cloak_stage);
                break;
            }
        }
        assert_eq!(aborted_at, Some(38 - 10));
        assert_eq!(sb.entity(tank).cloak, CloakState::Uncloaking);
        assert_eq!(visual(&sb, tank, true, GREECE), VisualType::Darken);
    }

    #[test]
    fn test_damaged_unit_cloaks_on_lucky_roll() {
        let mut sb = Sandbox::new();
        let tank = sb.place("STNK", USSR, 10, 10);
        sb.world.entity_mut(tank).unwrap().strength = 20;

        let mut unlucky = StepRng::new(0, 0);
        for _ in 0..50 {
            assert!(cloaking_ai(&mut sb.world, tank, &mut unlucky).is_empty());
        }

        // A raw value just above 1/26 of the range maps to 1.
        let mut lucky = StepRng::new(200_000_000, 0);
        assert_eq!(
            cloaking_ai(&mut sb.world, tank, &mut lucky),
            vec![CloakEvent::StartedCloaking]
        );
    }

    #[test]
    fn test_do_cloak_and_uncloak_guards() {
        let mut sb = Sandbox::new();
        let plain = sb.place("1TNK", USSR, 5, 5);
        let tank = sb.place("STNK", USSR, 10, 10);

        assert!(!do_cloak(&mut sb.world, plain));
        assert_eq!(sb.entity(plain).cloak, CloakState::Uncloaked);
        assert!(!do_uncloak(&mut sb.world, tank));
        assert!(!do_shimmer(&mut sb.world, tank));

        assert!(do_cloak(&mut sb.world, tank));
        assert!(!do_cloak(&mut sb.world, tank));
        assert_eq!(sb.entity(tank).cloak_stage, 0);
    }

    #[test]
    fn test_reversal_mirrors_stage() {
        let mut sb = Sandbox::new();
        let tank = sb.place("STNK", USSR, 10, 10);
        set_cloak(&mut sb, tank, CloakState::Cloaking, 12);
        let before = visual(&sb, tank, true, GREECE);

        assert!(do_uncloak(&mut sb.world, tank));
        assert_eq!(sb.entity(tank).cloak_stage, 38 - 12);
        assert_eq!(visual(&sb, tank, true, GREECE), before);

        assert!(do_cloak(&mut sb.world, tank));
        assert_eq!(sb.entity(tank).cloak_stage, 12);
        assert_eq!(visual(&sb, tank, true, GREECE), before);
    }

    #[test]
    fn test_cloaking_drops_attackers() {
        let mut sb = Sandbox::new();
        let tank = sb.place("STNK", USSR, 10, 10);
        let rifle = sb.place("E1", GREECE, 12, 10);
        sb.world.assign_target(rifle, Some(Target::Object(tank)));
        assert!(do_cloak(&mut sb.world, tank));
        assert_eq!(sb.entity(rifle).target, None);
    }

    #[test]
    fn test_ready_to_cloak_conditions() {
        let mut sb = Sandbox::new();
        let tank = sb.place("STNK", USSR, 10, 10);
        let near = sb.place("E1", GREECE, 12, 10);
        let far = sb.place("E1", GREECE, 25, 10);
        assert!(is_ready_to_cloak(&sb.world, tank));

        sb.world.entity_mut(tank).unwrap().arm = 2;
        assert!(!is_ready_to_cloak(&sb.world, tank));
        sb.world.entity_mut(tank).unwrap().arm = 0;

        sb.world.entity_mut(tank).unwrap().cloak_delay = 5;
        assert!(!is_ready_to_cloak(&sb.world, tank));
        sb.world.entity_mut(tank).unwrap().cloak_delay = 0;

        sb.world.entity_mut(tank).unwrap().recloak_suppressed = true;
        assert!(!is_ready_to_cloak(&sb.world, tank));
        sb.world.entity_mut(tank).unwrap().recloak_suppressed = false;

        sb.world.assign_target(tank, Some(Target::Object(near)));
        assert!(!is_ready_to_cloak(&sb.world, tank));
        sb.world.assign_target(tank, Some(Target::Object(far)));
        assert!(is_ready_to_cloak(&sb.world, tank));
    }

    #[test]
    fn test_delay_counts_down_before_recloak() {
        let mut sb = Sandbox::new();
        let tank = sb.place("STNK", USSR, 10, 10);
        sb.world.entity_mut(tank).unwrap().cloak_delay = 3;
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(cloaking_ai(&mut sb.world, tank, &mut rng).is_empty());
        assert!(cloaking_ai(&mut sb.world, tank, &mut rng).is_empty());
        assert_eq!(
            cloaking_ai(&mut sb.world, tank, &mut rng),
            vec![CloakEvent::StartedCloaking]
        );
        assert_eq!(sb.entity(tank).health_ratio(), Fixed::ONE);
    }

    #[test]
    fn test_exactly_red_counts_as_damaged() {
        let mut sb = Sandbox::new();
        let tank = sb.place("STNK", USSR, 10, 10);
        let entity = sb.world.entity_mut(tank).unwrap();
        entity.max_strength = 100;
        entity.strength = 25;
        assert_eq!(sb.entity(tank).health_ratio(), sb.world.rules().condition_red_ratio());

        // Cloaking start is left to the 1 in 26 roll.
        let mut unlucky = StepRng::new(0, 0);
        for _ in 0..50 {
            assert!(cloaking_ai(&mut sb.world, tank, &mut unlucky).is_empty());
        }
        let mut lucky = StepRng::new(200_000_000, 0);
        assert_eq!(
            cloaking_ai(&mut sb.world, tank, &mut lucky),
            vec![CloakEvent::StartedCloaking]
        );

        // And the darkened band can abort.
        let mut aborted = false;
        for _ in 0..40 {
            if cloaking_ai(&mut sb.world, tank, &mut unlucky).contains(&CloakEvent::CloakAborted) {
                aborted = true;
                break;
            }
        }
        assert!(aborted);
        assert_eq!(sb.entity(tank).cloak, CloakState::Uncloaking);
    }
}
