//! Playtesting agent: persona-weighted decisions plus the per-match result record.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::action::{Action, candidate_actions};
use crate::catalog::CostCatalog;
use crate::numbers::{ratio_or, usize_to_f64};
use crate::persona::{Persona, PersonaKind};
use crate::planner::{Planner, PlannerConfig, direct_score};
use crate::situation::{self, SituationSummary};
use crate::snapshot::{PlayerId, StateSnapshot};

/// Ticks between situation refreshes.
pub const SITUATION_REFRESH_TICKS: u64 = 10;
/// Threat increase between two samples that counts as a spike.
pub const SPIKE_THRESHOLD: f64 = 0.3;
/// Spikes at or before this tick are ignored as opening noise.
pub const SPIKE_MIN_TICK: u64 = 100;
pub const PLANNER_WEIGHT: f64 = 0.6;
pub const PERSONA_WEIGHT: f64 = 0.4;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Win,
    Loss,
    Draw,
    Timeout,
    Error(String),
}

impl Outcome {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Win => "win",
            Self::Loss => "loss",
            Self::Draw => "draw",
            Self::Timeout => "timeout",
            Self::Error(_) => "error",
        }
    }

    #[must_use]
    pub const fn is_win(&self) -> bool {
        matches!(self, Self::Win)
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(message) => write!(f, "error: {message}"),
            other => f.write_str(other.label()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultySpike {
    pub tick: u64,
    /// Threat level at the sample that triggered the spike.
    pub severity: f64,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub tick: u64,
    pub action: Action,
    pub score: f64,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaytestMetrics {
    pub resource_efficiency: f64,
    pub peak_military_power: f64,
    pub average_army_size: f64,
    pub army_size: usize,
    pub worker_count: usize,
    pub difficulty_spikes: Vec<DifficultySpike>,
}

/// Frozen record of one simulated match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaytestResult {
    pub persona: PersonaKind,
    pub outcome: Outcome,
    pub duration_ticks: u64,
    pub final_score: f64,
    pub metrics: PlaytestMetrics,
    pub actions: Vec<ActionRecord>,
}

impl PlaytestResult {
    /// Synthetic record for a match that never produced a decision trace.
    #[must_use]
    pub fn errored(persona: PersonaKind, message: impl Into<String>, duration_ticks: u64) -> Self {
        Self {
            persona,
            outcome: Outcome::Error(message.into()),
            duration_ticks,
            final_score: 0.0,
            metrics: PlaytestMetrics::default(),
            actions: Vec::new(),
        }
    }
}

/// Per-match decision policy. One instance per match; nothing is shared.
#[derive(Debug, Clone)]
pub struct PlaytestAgent {
    player: PlayerId,
    persona: Persona,
    planner: Planner,
    state: Option<StateSnapshot>,
    situation: Option<SituationSummary>,
    last_sample_tick: u64,
    actions: Vec<ActionRecord>,
    spikes: Vec<DifficultySpike>,
    worker_count: usize,
    army_size: usize,
    average_army_size: f64,
    peak_military_power: f64,
    committed: f64,
}

impl PlaytestAgent {
    #[must_use]
    pub fn new(player: PlayerId, persona: Persona, catalog: Arc<CostCatalog>) -> Self {
        Self {
            player,
            planner: Planner::new(PlannerConfig::for_persona(&persona), catalog),
            persona,
            state: None,
            situation: None,
            last_sample_tick: 0,
            actions: Vec::new(),
            spikes: Vec::new(),
            worker_count: 0,
            army_size: 0,
            average_army_size: 0.0,
            peak_military_power: 0.0,
            committed: 0.0,
        }
    }

    #[must_use]
    pub const fn player(&self) -> PlayerId {
        self.player
    }

    #[must_use]
    pub const fn persona(&self) -> &Persona {
        &self.persona
    }

    #[must_use]
    pub const fn situation(&self) -> Option<&SituationSummary> {
        self.situation.as_ref()
    }

    #[must_use]
    pub fn actions(&self) -> &[ActionRecord] {
        &self.actions
    }

    #[must_use]
    pub fn spikes(&self) -> &[DifficultySpike] {
        &self.spikes
    }

    /// Take in a fresh snapshot. The situation is only re-derived every
    /// [`SITUATION_REFRESH_TICKS`] ticks.
    pub fn update(&mut self, state: &StateSnapshot) {
        self.worker_count = state.worker_count(self.player);
        self.army_size = state.army_size(self.player);
        let due = self.situation.is_none()
            || state.tick.saturating_sub(self.last_sample_tick) >= SITUATION_REFRESH_TICKS;
        if due {
            let fresh = situation::evaluate(state, self.player, self.planner.catalog());
            if let Some(previous) = &self.situation {
                let delta = fresh.threat_level() - previous.threat_level();
                if delta > SPIKE_THRESHOLD && state.tick > SPIKE_MIN_TICK {
                    self.spikes.push(DifficultySpike {
                        tick: state.tick,
                        severity: fresh.threat_level(),
                        delta,
                    });
                }
            }
            self.peak_military_power = self.peak_military_power.max(fresh.military.own_strength);
            self.situation = Some(fresh);
            self.last_sample_tick = state.tick;
        }
        self.state = Some(state.clone());
    }

    /// Choose among the catalog's candidate actions for the current snapshot.
    pub fn best_action(&mut self) -> Option<Action> {
        let candidates = {
            let state = self.state.as_ref()?;
            candidate_actions(state, self.player, self.planner.catalog())
        };
        self.choose(&candidates)
    }

    /// Choose among `candidates`, recording the decision. `None` before the first
    /// update or for an empty list.
    pub fn choose(&mut self, candidates: &[Action]) -> Option<Action> {
        let state = self.state.as_ref()?;
        let situation = self.situation.as_ref()?;
        let player = self.player;
        let persona = &self.persona;
        let threat = situation.threat_level();
        let blended = |action: &Action| {
            PLANNER_WEIGHT * direct_score(action, state, player, situation)
                + PERSONA_WEIGHT * persona.score_with_threat(action, threat)
        };
        let index = self
            .planner
            .select_index(state, player, candidates, &blended)?;
        let action = candidates[index];
        let planner_score = direct_score(&action, state, player, situation);
        let persona_score = persona.score_with_threat(&action, threat);
        let score = PLANNER_WEIGHT * planner_score + PERSONA_WEIGHT * persona_score;
        let reasoning = format!(
            "{} chose {action} (planner {planner_score:.2}, persona {persona_score:.2}, threat {threat:.2}, {} game)",
            persona.label(),
            situation.phase(),
        );
        if action.cost().affordable_with(state.resources_of(player)) {
            self.committed += action.cost().total();
        }
        let tick = state.tick;
        self.actions.push(ActionRecord {
            tick,
            action,
            score,
            reasoning,
        });
        let decisions = usize_to_f64(self.actions.len());
        self.average_army_size +=
            (usize_to_f64(self.army_size) - self.average_army_size) / decisions;
        Some(action)
    }

    fn resource_efficiency(&self) -> f64 {
        let banked = self
            .state
            .as_ref()
            .map_or(0.0, |s| s.resources_of(self.player).total());
        ratio_or(self.committed, self.committed + banked, 0.0)
    }

    /// Freeze the current metrics and trace.
    #[must_use]
    pub fn playtest_result(&self, outcome: Outcome, final_score: f64) -> PlaytestResult {
        PlaytestResult {
            persona: self.persona.kind,
            outcome,
            duration_ticks: self.state.as_ref().map_or(0, |s| s.tick),
            final_score,
            metrics: PlaytestMetrics {
                resource_efficiency: self.resource_efficiency(),
                peak_military_power: self.peak_military_power,
                average_army_size: self.average_army_size,
                army_size: self.army_size,
                worker_count: self.worker_count,
                difficulty_spikes: self.spikes.clone(),
            },
            actions: self.actions.clone(),
        }
    }
}
