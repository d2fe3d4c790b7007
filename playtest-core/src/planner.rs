//! Action planner: direct heuristic scoring for small candidate sets and a
//! UCB1 bandit over a cached search node for larger ones.

use log::trace;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f64::consts::SQRT_2;
use std::sync::Arc;

use crate::action::{Action, ActionKind, ArmyOrder, candidate_actions};
use crate::catalog::CostCatalog;
use crate::numbers::{clamp_unit, floor_f64_to_i64, usize_to_f64};
use crate::persona::Persona;
use crate::situation::{self, GamePhase, SituationSummary};
use crate::snapshot::{BuildingKind, PlayerId, StateSnapshot, UnitKind};

/// Candidate counts at or below this are scored directly.
pub const DIRECT_MODE_MAX_CANDIDATES: usize = 5;
pub const DEFAULT_ROLLOUTS: u32 = 100;
pub const DEFAULT_MAX_NODES: usize = 4096;

const FORWARD_WEIGHT: f64 = 0.3;
const SITUATIONAL_BONUS: f64 = 0.1;
const BONUS_THREAT: f64 = 0.5;
const FINGERPRINT_BUCKET: f64 = 100.0;
const FINGERPRINT_TICK_MODULUS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub rollouts: u32,
    pub exploration_constant: f64,
    pub max_nodes: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            rollouts: DEFAULT_ROLLOUTS,
            exploration_constant: SQRT_2,
            max_nodes: DEFAULT_MAX_NODES,
        }
    }
}

impl PlannerConfig {
    /// Search shape dictated by a persona's traits.
    #[must_use]
    pub fn for_persona(persona: &Persona) -> Self {
        Self {
            rollouts: persona.rollout_count(),
            exploration_constant: persona.exploration_constant(),
            ..Self::default()
        }
    }
}

/// Anything that can put a value on a candidate action.
pub trait ActionScorer {
    fn score(&self, action: &Action) -> f64;
}

impl<F> ActionScorer for F
where
    F: Fn(&Action) -> f64,
{
    fn score(&self, action: &Action) -> f64 {
        self(action)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlannerMode {
    Direct,
    Bandit,
}

impl PlannerMode {
    #[must_use]
    pub const fn for_candidates(count: usize) -> Self {
        if count <= DIRECT_MODE_MAX_CANDIDATES {
            Self::Direct
        } else {
            Self::Bandit
        }
    }
}

/// Lossy cache key: player, bucketed bank and tick modulo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateFingerprint {
    pub player: PlayerId,
    pub minerals_bucket: i64,
    pub gas_bucket: i64,
    pub tick_phase: u64,
}

impl StateFingerprint {
    #[must_use]
    pub fn of(state: &StateSnapshot, player: PlayerId) -> Self {
        let bank = state.resources_of(player);
        Self {
            player,
            minerals_bucket: floor_f64_to_i64(bank.minerals / FINGERPRINT_BUCKET),
            gas_bucket: floor_f64_to_i64(bank.gas / FINGERPRINT_BUCKET),
            tick_phase: state.tick % FINGERPRINT_TICK_MODULUS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ArmStats {
    pub visits: u32,
    pub value: f64,
}

impl ArmStats {
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.visits == 0 {
            f64::NEG_INFINITY
        } else {
            self.value / f64::from(self.visits)
        }
    }
}

/// Visit counts and accumulated value for each candidate arm.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchNode {
    pub visits: u32,
    pub arms: Vec<ArmStats>,
    last_touched: u64,
}

impl SearchNode {
    #[must_use]
    pub fn new(arm_count: usize) -> Self {
        Self {
            visits: 0,
            arms: vec![ArmStats::default(); arm_count],
            last_touched: 0,
        }
    }

    /// UCB1 arm selection. Unvisited arms always win, in candidate order.
    #[must_use]
    pub fn select_arm(&self, exploration: f64) -> usize {
        if let Some(unvisited) = self.arms.iter().position(|arm| arm.visits == 0) {
            return unvisited;
        }
        let ln_total = f64::from(self.visits.max(1)).ln();
        let mut best = 0;
        let mut best_value = f64::NEG_INFINITY;
        for (index, arm) in self.arms.iter().enumerate() {
            let bound = arm.mean() + exploration * (ln_total / f64::from(arm.visits)).sqrt();
            if bound > best_value {
                best = index;
                best_value = bound;
            }
        }
        best
    }

    pub fn record(&mut self, arm: usize, value: f64) {
        if let Some(stats) = self.arms.get_mut(arm) {
            stats.visits = stats.visits.saturating_add(1);
            stats.value += value;
        }
    }

    /// Arm with the highest mean; `None` when nothing has been visited.
    #[must_use]
    pub fn best_arm(&self) -> Option<usize> {
        let mut best = None;
        let mut best_mean = f64::NEG_INFINITY;
        for (index, arm) in self.arms.iter().enumerate() {
            if arm.visits > 0 && arm.mean() > best_mean {
                best = Some(index);
                best_mean = arm.mean();
            }
        }
        best
    }
}

/// Bounded per-planner cache of search nodes, evicting the least recently touched.
#[derive(Debug, Clone, Default)]
pub struct NodeCache {
    nodes: HashMap<StateFingerprint, SearchNode>,
    max_nodes: usize,
    clock: u64,
}

impl NodeCache {
    #[must_use]
    pub fn new(max_nodes: usize) -> Self {
        Self {
            nodes: HashMap::new(),
            max_nodes: max_nodes.max(1),
            clock: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn contains(&self, fingerprint: &StateFingerprint) -> bool {
        self.nodes.contains_key(fingerprint)
    }

    #[must_use]
    pub fn get(&self, fingerprint: &StateFingerprint) -> Option<&SearchNode> {
        self.nodes.get(fingerprint)
    }

    /// Fetch or create the node for `fingerprint` sized for `arm_count` candidates.
    ///
    /// A cached node whose arm count no longer matches is reset.
    pub fn node_mut(&mut self, fingerprint: StateFingerprint, arm_count: usize) -> &mut SearchNode {
        self.clock += 1;
        if !self.nodes.contains_key(&fingerprint) && self.nodes.len() >= self.max_nodes {
            self.evict_oldest();
        }
        let clock = self.clock;
        let node = self
            .nodes
            .entry(fingerprint)
            .or_insert_with(|| SearchNode::new(arm_count));
        if node.arms.len() != arm_count {
            *node = SearchNode::new(arm_count);
        }
        node.last_touched = clock;
        node
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .nodes
            .iter()
            .min_by_key(|(key, node)| (node.last_touched, **key))
            .map(|(key, _)| *key);
        if let Some(key) = oldest {
            trace!("evicting search node {key:?}");
            self.nodes.remove(&key);
        }
    }
}

fn worker_baseline(workers: usize) -> f64 {
    if workers < 8 {
        0.8
    } else if workers < 12 {
        0.5
    } else {
        0.2
    }
}

fn attack_baseline(situation: &SituationSummary) -> f64 {
    let own = situation.military.own_army;
    let enemy = situation.military.enemy_army;
    if own == 0 {
        return 0.1;
    }
    if enemy == 0 {
        return 0.9;
    }
    let ratio = usize_to_f64(own) / usize_to_f64(enemy);
    if ratio > 1.2 {
        0.9
    } else if ratio >= 0.8 {
        0.5
    } else {
        0.1
    }
}

fn baseline(
    action: &Action,
    state: &StateSnapshot,
    player: PlayerId,
    situation: &SituationSummary,
) -> f64 {
    let threat = situation.threat_level();
    match action.kind {
        ActionKind::BuildUnit { unit, .. } => match unit {
            UnitKind::Worker => worker_baseline(situation.economy.workers),
            UnitKind::Infantry | UnitKind::Ranged | UnitKind::Cavalry | UnitKind::Siege => {
                0.4 + 0.4 * threat + 0.2 * (-situation.military.advantage).max(0.0)
            }
        },
        ActionKind::BuildBuilding { building, .. } => match building {
            BuildingKind::Base => {
                if situation.economy.can_expand {
                    0.7
                } else {
                    0.15
                }
            }
            BuildingKind::Tower => 0.2 + 0.6 * threat,
            BuildingKind::Barracks
            | BuildingKind::Factory
            | BuildingKind::Lab
            | BuildingKind::Depot => 0.35,
        },
        ActionKind::Army { order, .. } => match order {
            ArmyOrder::Attack => attack_baseline(situation),
            ArmyOrder::Defend => 0.2 + 0.7 * threat,
        },
        ActionKind::GatherResources => {
            if state.resources_of(player).total() < 100.0 {
                0.6
            } else {
                0.25
            }
        }
        ActionKind::Research { .. } => {
            let phase_bonus = match situation.phase() {
                GamePhase::Early => 0.0,
                GamePhase::Mid => 0.15,
                GamePhase::Late => 0.25,
            };
            0.25 + phase_bonus - 0.2 * situation.tech.advantage.max(0.0)
        }
    }
}

fn is_economic(action: &Action) -> bool {
    matches!(
        action.kind,
        ActionKind::BuildUnit {
            unit: UnitKind::Worker,
            ..
        } | ActionKind::GatherResources
            | ActionKind::BuildBuilding {
                building: BuildingKind::Base,
                ..
            }
    )
}

fn is_protective(action: &Action) -> bool {
    match action.kind {
        ActionKind::BuildUnit { unit, .. } => unit.is_military(),
        ActionKind::BuildBuilding { building, .. } => building == BuildingKind::Tower,
        ActionKind::Army { order, .. } => order == ArmyOrder::Defend,
        ActionKind::GatherResources | ActionKind::Research { .. } => false,
    }
}

/// Type baseline discounted by affordability plus a forward-looking bonus, in `[0, 1]`.
#[must_use]
pub fn heuristic_score(
    action: &Action,
    state: &StateSnapshot,
    player: PlayerId,
    situation: &SituationSummary,
) -> f64 {
    let bank = state.resources_of(player);
    let cost = action.cost();
    let affordability = if cost.affordable_with(bank) {
        1.0
    } else {
        0.5 * cost.coverage(bank).max(0.1)
    };
    let income = if is_economic(action) {
        1.0 - situation.economy.saturation
    } else {
        0.0
    };
    let security = if is_protective(action) {
        situation.threat_level()
    } else {
        0.0
    };
    let forward = FORWARD_WEIGHT * (income + security) / 2.0;
    clamp_unit(baseline(action, state, player, situation) * affordability + forward)
}

/// Persona-agnostic nudge applied in direct mode.
#[must_use]
pub fn situational_bonus(action: &Action, situation: &SituationSummary) -> f64 {
    let mut bonus = 0.0;
    if situation.threat_level() > BONUS_THREAT && is_protective(action) {
        bonus += SITUATIONAL_BONUS;
    }
    if situation.phase() == GamePhase::Early && is_economic(action) {
        bonus += SITUATIONAL_BONUS;
    }
    bonus
}

#[must_use]
pub fn direct_score(
    action: &Action,
    state: &StateSnapshot,
    player: PlayerId,
    situation: &SituationSummary,
) -> f64 {
    clamp_unit(
        heuristic_score(action, state, player, situation) + situational_bonus(action, situation),
    )
}

/// First index holding the maximum score.
fn argmax<S: ActionScorer + ?Sized>(candidates: &[Action], scorer: &S) -> Option<usize> {
    let mut best = None;
    let mut best_score = f64::NEG_INFINITY;
    for (index, action) in candidates.iter().enumerate() {
        let score = scorer.score(action);
        if best.is_none() || score > best_score {
            best = Some(index);
            best_score = score;
        }
    }
    best
}

/// Decision engine owned by one agent.
#[derive(Debug, Clone)]
pub struct Planner {
    config: PlannerConfig,
    catalog: Arc<CostCatalog>,
    cache: NodeCache,
}

impl Planner {
    #[must_use]
    pub fn new(config: PlannerConfig, catalog: Arc<CostCatalog>) -> Self {
        Self {
            cache: NodeCache::new(config.max_nodes),
            config,
            catalog,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &PlannerConfig {
        &self.config
    }

    #[must_use]
    pub fn catalog(&self) -> &CostCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn cache(&self) -> &NodeCache {
        &self.cache
    }

    /// Enumerate candidates from the catalog and pick one.
    pub fn plan(&mut self, state: &StateSnapshot, player: PlayerId) -> Option<Action> {
        let candidates = candidate_actions(state, player, &self.catalog);
        self.best_move(state, player, &candidates)
    }

    /// Best candidate by the direct heuristic; `None` only for an empty list.
    pub fn best_move(
        &mut self,
        state: &StateSnapshot,
        player: PlayerId,
        candidates: &[Action],
    ) -> Option<Action> {
        let situation = situation::evaluate(state, player, &self.catalog);
        let scorer = |action: &Action| direct_score(action, state, player, &situation);
        self.select_index(state, player, candidates, &scorer)
            .map(|index| candidates[index])
    }

    /// Index of the chosen candidate under `scorer`, switching mode on candidate count.
    pub fn select_index<S: ActionScorer + ?Sized>(
        &mut self,
        state: &StateSnapshot,
        player: PlayerId,
        candidates: &[Action],
        scorer: &S,
    ) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }
        let mode = PlannerMode::for_candidates(candidates.len());
        trace!(
            "planner mode {mode:?} for player {player} at tick {} ({} candidates)",
            state.tick,
            candidates.len()
        );
        match mode {
            PlannerMode::Direct => argmax(candidates, scorer),
            PlannerMode::Bandit => Some(self.bandit(state, player, candidates, scorer)),
        }
    }

    fn bandit<S: ActionScorer + ?Sized>(
        &mut self,
        state: &StateSnapshot,
        player: PlayerId,
        candidates: &[Action],
        scorer: &S,
    ) -> usize {
        let exploration = self.config.exploration_constant;
        let rollouts = self.config.rollouts;
        let node = self
            .cache
            .node_mut(StateFingerprint::of(state, player), candidates.len());
        for _ in 0..rollouts {
            node.visits = node.visits.saturating_add(1);
            let arm = node.select_arm(exploration);
            let value = scorer.score(&candidates[arm]);
            node.record(arm, value);
        }
        node.best_arm().unwrap_or(0)
    }
}
