//! Persona catalog: fixed trait vectors that reweight the shared planner.

use serde::{Deserialize, Serialize};
use std::f64::consts::SQRT_2;
use std::fmt;

use crate::action::{Action, ActionKind, ArmyOrder};
use crate::catalog::CostCatalog;
use crate::numbers::{clamp_unit, round_f64_to_u32};
use crate::situation::{self, SituationSummary};
use crate::snapshot::{BuildingKind, PlayerId, StateSnapshot, UnitKind};

pub const BASE_ROLLOUTS: f64 = 100.0;
pub const MIN_ROLLOUTS: u32 = 25;
pub const MAX_ROLLOUTS: u32 = 250;
pub const MIN_EXPLORATION: f64 = 0.25;
pub const MAX_EXPLORATION: f64 = 3.0;

const HIGH_THREAT: f64 = 0.6;
const LOW_THREAT: f64 = 0.3;
const CAUTIOUS_RISK_TOLERANCE: f64 = 0.4;
const EAGER_AGGRESSIVENESS: f64 = 0.7;
const SITUATIONAL_BOOST: f64 = 1.2;

/// The eight built-in play-style archetypes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PersonaKind {
    AggressiveRusher,
    DefensiveTurtle,
    EconomicExpander,
    TechInnovator,
    #[default]
    BalancedStrategist,
    MapExplorer,
    RiskTaker,
    EfficiencyOptimizer,
}

impl PersonaKind {
    pub const ALL: [Self; 8] = [
        Self::AggressiveRusher,
        Self::DefensiveTurtle,
        Self::EconomicExpander,
        Self::TechInnovator,
        Self::BalancedStrategist,
        Self::MapExplorer,
        Self::RiskTaker,
        Self::EfficiencyOptimizer,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::AggressiveRusher => "aggressive_rusher",
            Self::DefensiveTurtle => "defensive_turtle",
            Self::EconomicExpander => "economic_expander",
            Self::TechInnovator => "tech_innovator",
            Self::BalancedStrategist => "balanced_strategist",
            Self::MapExplorer => "map_explorer",
            Self::RiskTaker => "risk_taker",
            Self::EfficiencyOptimizer => "efficiency_optimizer",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::AggressiveRusher => "Early military pressure, attacks as soon as the army allows",
            Self::DefensiveTurtle => "Towers and patience, waits for the opponent to overextend",
            Self::EconomicExpander => "Workers and extra bases before anything else",
            Self::TechInnovator => "Prioritizes research and novel unit mixes",
            Self::BalancedStrategist => "Even weighting across economy, army and tech",
            Self::MapExplorer => "Spreads out and probes, accepts a thinner search",
            Self::RiskTaker => "Commits to high-variance plays",
            Self::EfficiencyOptimizer => "Spends deliberately and searches deeply",
        }
    }

    /// Strict lookup by label (case-insensitive, `-` accepted for `_`).
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|kind| kind.label() == normalized)
    }

    /// Lookup that falls back to the canonical archetype on unknown labels.
    #[must_use]
    pub fn parse_or_default(label: &str) -> Self {
        Self::from_label(label).unwrap_or_default()
    }

    #[must_use]
    pub const fn traits(self) -> PersonaTraits {
        match self {
            Self::AggressiveRusher => AGGRESSIVE_RUSHER,
            Self::DefensiveTurtle => DEFENSIVE_TURTLE,
            Self::EconomicExpander => ECONOMIC_EXPANDER,
            Self::TechInnovator => TECH_INNOVATOR,
            Self::BalancedStrategist => BALANCED_STRATEGIST,
            Self::MapExplorer => MAP_EXPLORER,
            Self::RiskTaker => RISK_TAKER,
            Self::EfficiencyOptimizer => EFFICIENCY_OPTIMIZER,
        }
    }
}

impl fmt::Display for PersonaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Twelve weights in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersonaTraits {
    pub aggressiveness: f64,
    pub exploration_drive: f64,
    pub risk_tolerance: f64,
    pub patience: f64,
    pub innovation_drive: f64,
    pub efficiency_focus: f64,
    pub social_preference: f64,
    pub tech_focus: f64,
    pub economy_weight: f64,
    pub military_weight: f64,
    pub expansion_weight: f64,
    pub research_weight: f64,
}

#[allow(clippy::too_many_arguments)]
const fn traits(
    aggressiveness: f64,
    exploration_drive: f64,
    risk_tolerance: f64,
    patience: f64,
    innovation_drive: f64,
    efficiency_focus: f64,
    social_preference: f64,
    tech_focus: f64,
    economy_weight: f64,
    military_weight: f64,
    expansion_weight: f64,
    research_weight: f64,
) -> PersonaTraits {
    PersonaTraits {
        aggressiveness,
        exploration_drive,
        risk_tolerance,
        patience,
        innovation_drive,
        efficiency_focus,
        social_preference,
        tech_focus,
        economy_weight,
        military_weight,
        expansion_weight,
        research_weight,
    }
}

const AGGRESSIVE_RUSHER: PersonaTraits =
    traits(0.9, 0.3, 0.8, 0.2, 0.3, 0.4, 0.2, 0.2, 0.3, 0.9, 0.2, 0.2);
const DEFENSIVE_TURTLE: PersonaTraits =
    traits(0.2, 0.2, 0.2, 0.9, 0.3, 0.6, 0.4, 0.5, 0.6, 0.6, 0.3, 0.5);
const ECONOMIC_EXPANDER: PersonaTraits =
    traits(0.3, 0.5, 0.5, 0.7, 0.4, 0.7, 0.5, 0.4, 0.9, 0.3, 0.9, 0.4);
const TECH_INNOVATOR: PersonaTraits =
    traits(0.3, 0.5, 0.5, 0.7, 0.9, 0.5, 0.3, 0.9, 0.5, 0.4, 0.3, 0.9);
const BALANCED_STRATEGIST: PersonaTraits =
    traits(0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.6, 0.6, 0.5, 0.5);
const MAP_EXPLORER: PersonaTraits =
    traits(0.5, 0.9, 0.6, 0.4, 0.6, 0.3, 0.5, 0.4, 0.5, 0.5, 0.7, 0.4);
const RISK_TAKER: PersonaTraits =
    traits(0.7, 0.6, 0.95, 0.2, 0.6, 0.3, 0.3, 0.4, 0.4, 0.7, 0.6, 0.4);
const EFFICIENCY_OPTIMIZER: PersonaTraits =
    traits(0.4, 0.2, 0.3, 0.6, 0.3, 0.95, 0.4, 0.5, 0.8, 0.5, 0.5, 0.5);

impl PersonaTraits {
    fn curiosity(&self) -> f64 {
        self.exploration_drive.max(self.innovation_drive)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub kind: PersonaKind,
    pub traits: PersonaTraits,
}

impl Persona {
    #[must_use]
    pub const fn create(kind: PersonaKind) -> Self {
        Self {
            kind,
            traits: kind.traits(),
        }
    }

    /// Build from a label, falling back to `balanced_strategist`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        Self::create(PersonaKind::parse_or_default(label))
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.kind.label()
    }

    /// Bandit rollouts per decision. Curious personas search thinner, efficient ones deeper.
    #[must_use]
    pub fn rollout_count(&self) -> u32 {
        let t = &self.traits;
        let raw = BASE_ROLLOUTS * (1.0 + t.efficiency_focus - t.curiosity());
        round_f64_to_u32(raw).clamp(MIN_ROLLOUTS, MAX_ROLLOUTS)
    }

    /// UCB1 exploration constant.
    #[must_use]
    pub fn exploration_constant(&self) -> f64 {
        let t = &self.traits;
        (SQRT_2 * (1.0 + t.curiosity() - t.efficiency_focus))
            .clamp(MIN_EXPLORATION, MAX_EXPLORATION)
    }

    fn category_score(&self, action: &Action) -> f64 {
        let t = &self.traits;
        match action.kind {
            ActionKind::BuildUnit { unit, .. } => match unit {
                UnitKind::Worker => t.economy_weight,
                UnitKind::Infantry | UnitKind::Ranged | UnitKind::Cavalry | UnitKind::Siege => {
                    t.military_weight
                }
            },
            ActionKind::BuildBuilding { building, .. } => match building {
                BuildingKind::Base => t.expansion_weight,
                BuildingKind::Tower => (t.military_weight + (1.0 - t.risk_tolerance)) / 2.0,
                BuildingKind::Lab => t.research_weight,
                BuildingKind::Barracks | BuildingKind::Factory | BuildingKind::Depot => {
                    t.economy_weight
                }
            },
            ActionKind::Army { order, .. } => match order {
                ArmyOrder::Attack => t.aggressiveness,
                ArmyOrder::Defend => ((1.0 - t.aggressiveness) + t.patience) / 2.0,
            },
            ActionKind::GatherResources => 0.5 * t.economy_weight,
            ActionKind::Research { .. } => (t.research_weight + t.tech_focus) / 2.0,
        }
    }

    fn modifier(&self, action: &Action, threat: f64) -> f64 {
        let t = &self.traits;
        let h = &action.hints;
        let mut modifier = 1.0
            + 0.4 * (t.risk_tolerance - 0.5) * h.risk_level
            + 0.4 * (t.patience - 0.5) * h.time_horizon
            + 0.3 * t.innovation_drive * h.novelty
            + 0.3 * t.efficiency_focus * h.efficiency;
        if threat > HIGH_THREAT && t.risk_tolerance < CAUTIOUS_RISK_TOLERANCE {
            modifier *= SITUATIONAL_BOOST;
        }
        if threat < LOW_THREAT && t.aggressiveness > EAGER_AGGRESSIVENESS {
            modifier *= SITUATIONAL_BOOST;
        }
        modifier
    }

    /// Score `action` in `[0, 1]` from this persona's point of view.
    ///
    /// When no summary is supplied the situation is evaluated against the default catalog.
    #[must_use]
    pub fn evaluate_action(
        &self,
        state: &StateSnapshot,
        player: PlayerId,
        action: &Action,
        situation: Option<&SituationSummary>,
    ) -> f64 {
        let threat = match situation {
            Some(summary) => summary.threat_level(),
            None => situation::evaluate(state, player, &CostCatalog::default()).threat_level(),
        };
        self.score_with_threat(action, threat)
    }

    #[must_use]
    pub fn score_with_threat(&self, action: &Action, threat: f64) -> f64 {
        clamp_unit(self.category_score(action) * self.modifier(action, threat))
    }
}

impl Default for Persona {
    fn default() -> Self {
        Self::create(PersonaKind::default())
    }
}
