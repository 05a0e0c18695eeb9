//! Catalog validation.
//!
//! Parsing already rejects unknown names, duplicates and malformed tables.
//! On top of that the validator warns about data that loads but is
//! probably a mistake.

use std::fmt;

use serde::Serialize;
use skirmish_core::data::Catalog;
use skirmish_core::techno_type::TypeTraits;
use skirmish_core::weapon::{WarheadId, WeaponId};

use crate::Result;

/// Outcome of validating a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Warheads loaded.
    pub warheads: usize,
    /// Weapons loaded.
    pub weapons: usize,
    /// Object types loaded.
    pub types: usize,
    /// Suspicious but legal entries.
    pub warnings: Vec<String>,
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} warheads, {} weapons, {} types, {} warnings",
            self.warheads,
            self.weapons,
            self.types,
            self.warnings.len()
        )
    }
}

/// Parse and check catalog RON text.
///
/// # Errors
///
/// Returns an error if the catalog does not load.
pub fn validate_catalog_str(text: &str) -> Result<ValidationReport> {
    let catalog = Catalog::from_ron_str(text)?;
    Ok(check_catalog(&catalog))
}

/// Check a loaded catalog for suspicious entries.
#[must_use]
pub fn check_catalog(catalog: &Catalog) -> ValidationReport {
    let mut report = ValidationReport {
        warheads: catalog.warhead_count(),
        weapons: catalog.weapon_count(),
        types: catalog.types().len(),
        warnings: Vec::new(),
    };

    let mut weapon_used = vec![false; report.weapons];
    let mut warhead_used = vec![false; report.warheads];

    for (_, kind) in catalog.types().iter() {
        for id in [kind.primary, kind.secondary].into_iter().flatten() {
            if let Some(used) = weapon_used.get_mut(usize::from(id.0)) {
                *used = true;
            }
        }
        if kind.max_strength <= 0 {
            report
                .warnings
                .push(format!("type '{}' has no strength", kind.name));
        }
        if kind.has(TypeTraits::CLOAKABLE) && !kind.is_armed() {
            report.warnings.push(format!(
                "type '{}' can cloak but has no weapon to break cover with",
                kind.name
            ));
        }
    }

    for index in 0..report.weapons {
        let Some(weapon) = catalog.weapon(WeaponId(index as u16)) else {
            continue;
        };
        match weapon.warhead {
            Some(id) => {
                if let Some(used) = warhead_used.get_mut(usize::from(id.0)) {
                    *used = true;
                }
            }
            None => report
                .warnings
                .push(format!("weapon '{}' has no warhead", weapon.name)),
        }
        if !weapon.anti_air && !weapon.anti_ground {
            report
                .warnings
                .push(format!("weapon '{}' can hit neither air nor ground", weapon.name));
        }
        if !weapon_used[index] {
            report
                .warnings
                .push(format!("weapon '{}' is not mounted on any type", weapon.name));
        }
    }

    for (index, used) in warhead_used.iter().enumerate() {
        if !used {
            if let Some(warhead) = catalog.warhead(WarheadId(index as u16)) {
                report
                    .warnings
                    .push(format!("warhead '{}' is not used by any weapon", warhead.name));
            }
        }
    }

    report
}
