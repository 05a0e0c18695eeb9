//! Scenario-wide rule constants.
//!
//! Rules are read-only during a tick and only reloaded between scenarios.
//! They are passed by reference into the evaluator, search and cloak
//! entry points instead of living in ambient global state.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, percent, Fixed};
use crate::simulation::TICK_RATE;

/// Kind of session being played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GameMode {
    /// Single player campaign; undiscovered objects cannot be targeted.
    #[default]
    Normal,
    /// Skirmish or networked game; discovery does not gate targeting.
    Multiplayer,
}

/// Rule constants consumed by threat scoring and the cloak state machine.
///
/// # Example RON
///
/// ```ron
/// RulesConfig(
///     condition_green: 100,
///     condition_yellow: 50,
///     condition_red: 25,
///     guard_range: 17179869184,        // Fixed-point for 4.0
///     max_threat_range: 42949672960,   // Fixed-point for 10.0
///     suppress_radius: 2,
///     cloak_delay_minutes: 214748364,  // Fixed-point for 0.05
///     max_uncloak_stage: 38,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Health percentage at or above which an object counts as undamaged.
    pub condition_green: u32,
    /// Health percentage at or below which an object counts as damaged.
    pub condition_yellow: u32,
    /// Health percentage at or below which an object counts as badly damaged.
    pub condition_red: u32,
    /// Scan range used by unarmed observers on area scans (world units).
    #[serde(with = "fixed_serde")]
    pub guard_range: Fixed,
    /// Upper bound for area scan range (world units).
    #[serde(with = "fixed_serde")]
    pub max_threat_range: Fixed,
    /// Radius in cells scanned for allied buildings by suppressed weapons.
    pub suppress_radius: u32,
    /// Re-cloak cooldown after fully uncloaking, in game minutes.
    #[serde(with = "fixed_serde")]
    pub cloak_delay_minutes: Fixed,
    /// Number of stages in a full cloak or uncloak fade.
    pub max_uncloak_stage: u32,
    /// Multiplier for candidates standing inside the observer's own base.
    pub nervous_multiplier: i64,
    /// Multiplier for buildings matching a requested preference category.
    pub category_boost: i64,
    /// Kind of session being played.
    pub game_mode: GameMode,
    /// Map editor mode: everything is drawn normally.
    pub editor_mode: bool,
}

impl RulesConfig {
    /// Health ratio at or above which an object is considered healthy.
    #[must_use]
    pub fn condition_green_ratio(&self) -> Fixed {
        percent(self.condition_green)
    }

    /// Health ratio at or below which an object is considered damaged.
    #[must_use]
    pub fn condition_yellow_ratio(&self) -> Fixed {
        percent(self.condition_yellow)
    }

    /// Health ratio at or below which an object is considered badly damaged.
    #[must_use]
    pub fn condition_red_ratio(&self) -> Fixed {
        percent(self.condition_red)
    }

    /// Re-cloak cooldown converted to simulation ticks.
    #[must_use]
    pub fn cloak_delay_ticks(&self) -> u32 {
        let ticks = self.cloak_delay_minutes * Fixed::from_num(60 * TICK_RATE);
        ticks.max(Fixed::ZERO).to_num::<u32>()
    }

    /// Whether discovery gates targeting in this session.
    #[must_use]
    pub fn discovery_required(&self) -> bool {
        self.game_mode == GameMode::Normal
    }

    /// Parse rules from RON text.
    pub fn from_ron_str(text: &str) -> crate::error::Result<Self> {
        ron::from_str(text).map_err(|e| crate::error::CoreError::DataParseError {
            source_name: "rules".to_string(),
            message: e.to_string(),
        })
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            condition_green: 100,
            condition_yellow: 50,
            condition_red: 25,
            guard_range: Fixed::from_num(4),
            max_threat_range: Fixed::from_num(10),
            suppress_radius: 2,
            cloak_delay_minutes: Fixed::from_num(0.05),
            max_uncloak_stage: 38,
            nervous_multiplier: 2,
            category_boost: 2,
            game_mode: GameMode::Normal,
            editor_mode: false,
        }
    }
}
