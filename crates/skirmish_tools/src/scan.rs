//! Threat scan reports.
//!
//! Loads a catalog and scenario, optionally runs the simulation for a
//! number of ticks, then asks every armed object for its greatest threat.

use std::fmt::Write as _;

use serde::Serialize;
use skirmish_core::combat::Combatant;
use skirmish_core::data::{Catalog, Scenario};
use skirmish_core::entity::{CloakState, Mission, Target, TargetHandle};
use skirmish_core::search::greatest_threat_with_report;
use skirmish_core::simulation::{acquisition_method, Simulation};
use skirmish_core::threat::ThreatMethod;

use crate::Result;

/// Scan settings.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Method for every observer; each mission's own method when absent.
    pub method: Option<ThreatMethod>,
    /// Ticks to simulate before scanning.
    pub ticks: u64,
    /// Seed for the simulation's random stream.
    pub seed: u64,
}

/// One observer's scan result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanRow {
    /// Observer handle.
    pub handle: TargetHandle,
    /// Observer type name.
    pub type_name: String,
    /// Owning house id.
    pub house: u8,
    /// Standing order.
    pub mission: Mission,
    /// Cloak state at scan time.
    pub cloak: CloakState,
    /// Method bits used.
    pub method: u32,
    /// Greatest threat found.
    pub target: Option<Target>,
    /// Rings walked.
    pub rings: u32,
    /// Cells examined.
    pub cells: u32,
    /// Candidates that passed every filter.
    pub accepted: u32,
}

/// Full report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    /// Scenario name.
    pub scenario: String,
    /// Ticks simulated before scanning.
    pub ticks: u64,
    /// State hash after simulating.
    pub state_hash: u64,
    /// Cloak events seen while simulating.
    pub cloak_events: usize,
    /// Target changes seen while simulating.
    pub target_changes: usize,
    /// Per-observer results in handle order.
    pub rows: Vec<ScanRow>,
}

impl ScanSummary {
    /// Plain text table.
    #[must_use]
    pub fn to_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} after {} ticks (hash {:016x}, {} cloak events, {} target changes)",
            self.scenario, self.ticks, self.state_hash, self.cloak_events, self.target_changes
        );
        for row in &self.rows {
            let target = match row.target {
                Some(Target::Object(handle)) => format!("object #{}", handle.index()),
                Some(Target::Cell(cell)) => format!("cell ({}, {})", cell.x, cell.y),
                None => "-".to_string(),
            };
            let _ = writeln!(
                out,
                "#{:<4} {:<6} house {:<2} {:<10} {:<11} -> {:<16} rings {:>2} cells {:>4} accepted {:>3}",
                row.handle.index(),
                row.type_name,
                row.house,
                format!("{:?}", row.mission),
                format!("{:?}", row.cloak),
                target,
                row.rings,
                row.cells,
                row.accepted
            );
        }
        out
    }
}

/// Load data, simulate and scan.
///
/// # Errors
///
/// Returns an error if the catalog or scenario does not load.
pub fn run_scan(catalog_text: &str, scenario_text: &str, options: &ScanOptions) -> Result<ScanSummary> {
    let catalog = Catalog::from_ron_str(catalog_text)?;
    let scenario = Scenario::from_ron_str(scenario_text)?;
    let world = scenario.build_world(&catalog)?;

    let mut sim = Simulation::new(world, options.seed);
    let mut cloak_events = 0;
    let mut target_changes = 0;
    for _ in 0..options.ticks {
        let events = sim.tick();
        cloak_events += events.cloak_events.len();
        target_changes += events.target_changes.len();
    }

    let world = sim.world();
    let mut rows = Vec::new();
    for handle in world.entities.sorted_ids() {
        let Some(me) = Combatant::new(world, handle) else {
            continue;
        };
        let entity = me.entity();
        if !entity.is_active() || !me.is_armed() {
            continue;
        }
        let method = options
            .method
            .or_else(|| acquisition_method(entity.mission))
            .unwrap_or(ThreatMethod::AREA | ThreatMethod::NORMAL);
        let (target, report) = greatest_threat_with_report(world, handle, method);
        rows.push(ScanRow {
            handle,
            type_name: me.kind().name.clone(),
            house: entity.owner.0,
            mission: entity.mission,
            cloak: entity.cloak,
            method: method.bits(),
            target,
            rings: report.rings_scanned,
            cells: report.cells_visited,
            accepted: report.candidates_accepted,
        });
    }

    tracing::info!(observers = rows.len(), ticks = options.ticks, "Scan complete");
    Ok(ScanSummary {
        scenario: scenario.name,
        ticks: options.ticks,
        state_hash: sim.state_hash(),
        cloak_events,
        target_changes,
        rows,
    })
}
