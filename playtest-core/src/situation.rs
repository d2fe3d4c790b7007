//! Situation evaluator: a pure read of a [`StateSnapshot`] into advantage scores.
//!
//! The evaluator never fails. Absent players, empty unit lists and zeroed
//! resources all collapse to neutral readings.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

use crate::catalog::CostCatalog;
use crate::numbers::{clamp_unit, ratio_or, u64_to_f64, usize_to_f64};
use crate::snapshot::{BuildingKind, PlayerId, Position, StateSnapshot, Unit};

pub const WORKERS_PER_BASE: f64 = 8.0;
pub const EXPANSION_MINERALS: f64 = 400.0;
pub const MAX_BASES: usize = 3;
pub const BASE_THREAT_RADIUS: f64 = 30.0;
pub const ARMY_DISADVANTAGE_RATIO: f64 = 1.5;
pub const THREAT_NORMALIZER: f64 = 100.0;
pub const BUILDING_DEFENSE_WEIGHT: f64 = 0.3;
pub const EARLY_GAME_END: u64 = 1_000;
pub const MID_GAME_END: u64 = 5_000;
pub const PROGRESS_HORIZON: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    Early,
    Mid,
    Late,
}

impl GamePhase {
    #[must_use]
    pub const fn from_tick(tick: u64) -> Self {
        if tick < EARLY_GAME_END {
            Self::Early
        } else if tick < MID_GAME_END {
            Self::Mid
        } else {
            Self::Late
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Early => "early",
            Self::Mid => "mid",
            Self::Late => "late",
        }
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceScore {
    pub own_total: f64,
    pub opponent_average: f64,
    /// Normalized to roughly `[-1, 1]`.
    pub advantage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MilitaryScore {
    pub own_strength: f64,
    pub enemy_strength: f64,
    pub own_army: usize,
    pub enemy_army: usize,
    pub advantage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EconomyScore {
    pub workers: usize,
    pub bases: usize,
    pub saturation: f64,
    pub can_expand: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapScore {
    pub own_spread: f64,
    pub enemy_spread: f64,
    pub control: f64,
}

impl Default for MapScore {
    fn default() -> Self {
        Self {
            own_spread: 0.0,
            enemy_spread: 0.0,
            control: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatSource {
    BaseProximity,
    ArmyDisadvantage,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThreatEntry {
    pub source: ThreatSource,
    /// Position of the threatened base; `None` for army-wide entries.
    pub location: Option<Position>,
    pub strength: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ThreatScore {
    pub entries: SmallVec<[ThreatEntry; 4]>,
    pub level: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TechScore {
    pub own_researched: u32,
    pub max_opponent_researched: u32,
    pub advantage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingScore {
    pub tick: u64,
    pub phase: GamePhase,
    pub progress: f64,
}

impl Default for TimingScore {
    fn default() -> Self {
        Self {
            tick: 0,
            phase: GamePhase::Early,
            progress: 0.0,
        }
    }
}

/// Seven derived sub-scores describing one player's position.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SituationSummary {
    pub resources: ResourceScore,
    pub military: MilitaryScore,
    pub economy: EconomyScore,
    pub map: MapScore,
    pub threat: ThreatScore,
    pub tech: TechScore,
    pub timing: TimingScore,
}

impl SituationSummary {
    #[must_use]
    pub const fn threat_level(&self) -> f64 {
        self.threat.level
    }

    #[must_use]
    pub const fn phase(&self) -> GamePhase {
        self.timing.phase
    }
}

/// `(own - other) / (own + other)`, 0 when both are zero.
fn normalized_advantage(own: f64, other: f64) -> f64 {
    ratio_or(own - other, own + other, 0.0)
}

fn unit_strength<'a>(units: impl Iterator<Item = &'a Unit>, catalog: &CostCatalog) -> f64 {
    units
        .filter(|u| u.kind.is_military())
        .map(|u| catalog.unit(u.kind).base_value * u.health_fraction())
        .sum()
}

fn military_strength(state: &StateSnapshot, player: PlayerId, catalog: &CostCatalog) -> f64 {
    let units = unit_strength(state.units_of(player), catalog);
    let defense: f64 = state
        .buildings_of(player)
        .map(|b| catalog.building(b.kind).defensive_value)
        .sum();
    units + BUILDING_DEFENSE_WEIGHT * defense
}

fn bounding_area<'a>(units: impl Iterator<Item = &'a Unit>) -> f64 {
    let mut count = 0usize;
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for unit in units {
        count += 1;
        min_x = min_x.min(unit.position.x);
        min_y = min_y.min(unit.position.y);
        max_x = max_x.max(unit.position.x);
        max_y = max_y.max(unit.position.y);
    }
    if count < 2 {
        return 0.0;
    }
    (max_x - min_x) * (max_y - min_y)
}

fn resource_score(
    state: &StateSnapshot,
    player: PlayerId,
    opponents: &[PlayerId],
) -> ResourceScore {
    let own_total = state.resources_of(player).total();
    if opponents.is_empty() {
        return ResourceScore {
            own_total,
            opponent_average: 0.0,
            advantage: if own_total > 0.0 { 1.0 } else { 0.0 },
        };
    }
    let sum: f64 = opponents
        .iter()
        .map(|id| state.resources_of(*id).total())
        .sum();
    let opponent_average = sum / usize_to_f64(opponents.len());
    ResourceScore {
        own_total,
        opponent_average,
        advantage: normalized_advantage(own_total, opponent_average),
    }
}

fn military_score(
    state: &StateSnapshot,
    player: PlayerId,
    opponents: &[PlayerId],
    catalog: &CostCatalog,
) -> MilitaryScore {
    let own_strength = military_strength(state, player, catalog);
    let enemy_strength: f64 = opponents
        .iter()
        .map(|id| military_strength(state, *id, catalog))
        .sum();
    let own_army = state.army_size(player);
    let enemy_army = state
        .enemy_units(player)
        .filter(|u| u.kind.is_military())
        .count();
    MilitaryScore {
        own_strength,
        enemy_strength,
        own_army,
        enemy_army,
        advantage: normalized_advantage(own_strength, enemy_strength),
    }
}

fn economy_score(state: &StateSnapshot, player: PlayerId) -> EconomyScore {
    let workers = state.worker_count(player);
    let bases = state.base_count(player);
    let capacity = WORKERS_PER_BASE * usize_to_f64(bases);
    let saturation = if capacity > 0.0 {
        (usize_to_f64(workers) / capacity).min(1.0)
    } else {
        0.0
    };
    EconomyScore {
        workers,
        bases,
        saturation,
        can_expand: state.resources_of(player).minerals >= EXPANSION_MINERALS
            && bases < MAX_BASES,
    }
}

fn map_score(state: &StateSnapshot, player: PlayerId, opponents: &[PlayerId]) -> MapScore {
    let own_spread = bounding_area(state.units_of(player));
    let enemy_spread: f64 = opponents
        .iter()
        .map(|id| bounding_area(state.units_of(*id)))
        .sum();
    MapScore {
        own_spread,
        enemy_spread,
        control: ratio_or(own_spread, own_spread + enemy_spread, 0.5),
    }
}

fn threat_score(
    state: &StateSnapshot,
    player: PlayerId,
    military: &MilitaryScore,
    catalog: &CostCatalog,
) -> ThreatScore {
    let mut entries: SmallVec<[ThreatEntry; 4]> = SmallVec::new();
    for base in state.buildings_of_kind(player, BuildingKind::Base) {
        let nearby = state
            .enemy_units(player)
            .filter(|u| u.position.distance(base.position) <= BASE_THREAT_RADIUS);
        let strength = unit_strength(nearby, catalog);
        if strength > 0.0 {
            entries.push(ThreatEntry {
                source: ThreatSource::BaseProximity,
                location: Some(base.position),
                strength,
            });
        }
    }
    let outnumbered = usize_to_f64(military.enemy_army)
        > ARMY_DISADVANTAGE_RATIO * usize_to_f64(military.own_army);
    if outnumbered {
        entries.push(ThreatEntry {
            source: ThreatSource::ArmyDisadvantage,
            location: None,
            strength: (military.enemy_strength - military.own_strength).max(0.0),
        });
    }
    let total: f64 = entries.iter().map(|e| e.strength).sum();
    ThreatScore {
        level: clamp_unit(total / THREAT_NORMALIZER),
        entries,
    }
}

fn tech_score(state: &StateSnapshot, player: PlayerId, opponents: &[PlayerId]) -> TechScore {
    let own_researched = state.researched_by(player);
    let max_opponent_researched = opponents
        .iter()
        .map(|id| state.researched_by(*id))
        .max()
        .unwrap_or(0);
    TechScore {
        own_researched,
        max_opponent_researched,
        advantage: normalized_advantage(
            f64::from(own_researched),
            f64::from(max_opponent_researched),
        ),
    }
}

fn timing_score(tick: u64) -> TimingScore {
    TimingScore {
        tick,
        phase: GamePhase::from_tick(tick),
        progress: (u64_to_f64(tick) / u64_to_f64(PROGRESS_HORIZON)).min(1.0),
    }
}

/// Summarize `player`'s position in `state`.
#[must_use]
pub fn evaluate(
    state: &StateSnapshot,
    player: PlayerId,
    catalog: &CostCatalog,
) -> SituationSummary {
    let opponents = state.opponents_of(player);
    let military = military_score(state, player, &opponents, catalog);
    let threat = threat_score(state, player, &military, catalog);
    SituationSummary {
        resources: resource_score(state, player, &opponents),
        economy: economy_score(state, player),
        map: map_score(state, player, &opponents),
        tech: tech_score(state, player, &opponents),
        timing: timing_score(state.tick),
        military,
        threat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Building, PlayerState, Resources, UnitKind};
    use std::collections::BTreeMap;

    fn unit(id: u64, player: PlayerId, kind: UnitKind, x: f64, y: f64) -> Unit {
        Unit {
            id,
            player_id: player,
            kind,
            hp: 10.0,
            max_hp: 10.0,
            position: Position::new(x, y),
        }
    }

    fn base(id: u64, player: PlayerId, x: f64, y: f64) -> Building {
        Building {
            id,
            player_id: player,
            kind: BuildingKind::Base,
            hp: 100.0,
            position: Position::new(x, y),
        }
    }

    fn bank(minerals: f64, researched: u32) -> PlayerState {
        PlayerState {
            resources: Resources::new(minerals, 0.0),
            researched,
        }
    }

    #[test]
    fn empty_snapshot_is_neutral() {
        let summary = evaluate(&StateSnapshot::default(), 1, &CostCatalog::default());
        assert!(summary.resources.advantage.abs() < 1e-9);
        assert!(summary.military.advantage.abs() < 1e-9);
        assert!((summary.map.control - 0.5).abs() < 1e-9);
        assert!(summary.threat.entries.is_empty());
        assert!(summary.tech.advantage.abs() < 1e-9);
        assert_eq!(summary.phase(), GamePhase::Early);
    }

    #[test]
    fn lone_player_with_resources_has_full_advantage() {
        let state = StateSnapshot {
            players: BTreeMap::from([(1, bank(50.0, 0))]),
            ..StateSnapshot::default()
        };
        let summary = evaluate(&state, 1, &CostCatalog::default());
        assert!((summary.resources.advantage - 1.0).abs() < 1e-9);
    }

    #[test]
    fn resources_compare_against_opponent_average() {
        let state = StateSnapshot {
            players: BTreeMap::from([
                (1, bank(300.0, 0)),
                (2, bank(100.0, 0)),
                (3, bank(100.0, 0)),
            ]),
            ..StateSnapshot::default()
        };
        let summary = evaluate(&state, 1, &CostCatalog::default());
        assert!((summary.resources.advantage - 0.5).abs() < 1e-9);
    }

    #[test]
    fn saturation_and_expansion() {
        let mut units: Vec<Unit> = (0..4)
            .map(|i| unit(i, 1, UnitKind::Worker, 0.0, 0.0))
            .collect();
        units.push(unit(10, 2, UnitKind::Worker, 90.0, 90.0));
        let state = StateSnapshot {
            players: BTreeMap::from([(1, bank(400.0, 0))]),
            units,
            buildings: vec![base(100, 1, 0.0, 0.0)],
            ..StateSnapshot::default()
        };
        let summary = evaluate(&state, 1, &CostCatalog::default());
        assert_eq!(summary.economy.workers, 4);
        assert!((summary.economy.saturation - 0.5).abs() < 1e-9);
        assert!(summary.economy.can_expand);
    }

    #[test]
    fn enemy_near_base_raises_threat() {
        let state = StateSnapshot {
            units: vec![
                unit(1, 1, UnitKind::Infantry, 0.0, 0.0),
                unit(2, 1, UnitKind::Infantry, 2.0, 0.0),
                unit(3, 2, UnitKind::Siege, 10.0, 10.0),
                unit(4, 2, UnitKind::Siege, 100.0, 100.0),
            ],
            buildings: vec![base(100, 1, 5.0, 5.0)],
            ..StateSnapshot::default()
        };
        let summary = evaluate(&state, 1, &CostCatalog::default());
        assert_eq!(summary.threat.entries.len(), 1);
        let entry = summary.threat.entries[0];
        assert_eq!(entry.source, ThreatSource::BaseProximity);
        assert!((entry.strength - 14.0).abs() < 1e-9);
        assert!((summary.threat_level() - 0.14).abs() < 1e-9);
    }

    #[test]
    fn outnumbered_army_adds_disadvantage_entry() {
        let mut units = vec![unit(1, 1, UnitKind::Infantry, 0.0, 0.0)];
        units.extend((0..20).map(|i| unit(10 + i, 2, UnitKind::Siege, 120.0, 120.0)));
        let state = StateSnapshot {
            units,
            ..StateSnapshot::default()
        };
        let summary = evaluate(&state, 1, &CostCatalog::default());
        let entry = summary.threat.entries[0];
        assert_eq!(entry.source, ThreatSource::ArmyDisadvantage);
        assert!((entry.strength - (280.0 - 5.0)).abs() < 1e-9);
        assert!((summary.threat_level() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn map_control_uses_bounding_boxes() {
        let state = StateSnapshot {
            units: vec![
                unit(1, 1, UnitKind::Worker, 0.0, 0.0),
                unit(2, 1, UnitKind::Worker, 10.0, 10.0),
                unit(3, 2, UnitKind::Worker, 50.0, 50.0),
                unit(4, 2, UnitKind::Worker, 60.0, 80.0),
            ],
            ..StateSnapshot::default()
        };
        let summary = evaluate(&state, 1, &CostCatalog::default());
        assert!((summary.map.own_spread - 100.0).abs() < 1e-9);
        assert!((summary.map.enemy_spread - 300.0).abs() < 1e-9);
        assert!((summary.map.control - 0.25).abs() < 1e-9);
    }

    #[test]
    fn tech_and_timing() {
        let state = StateSnapshot {
            tick: 6_000,
            players: BTreeMap::from([(1, bank(0.0, 3)), (2, bank(0.0, 1))]),
            ..StateSnapshot::default()
        };
        let summary = evaluate(&state, 1, &CostCatalog::default());
        assert!((summary.tech.advantage - 0.5).abs() < 1e-9);
        assert_eq!(summary.phase(), GamePhase::Late);
        assert!((summary.timing.progress - 0.6).abs() < 1e-9);
        assert_eq!(GamePhase::from_tick(999), GamePhase::Early);
        assert_eq!(GamePhase::from_tick(1_000), GamePhase::Mid);
    }
}
