//! Session coordinator: runs many independent matches and analyzes the batch.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

use crate::agent::{Outcome, PlaytestAgent, PlaytestResult};
use crate::balance::{BalanceDetector, BalanceReport, Severity};
use crate::catalog::CostCatalog;
use crate::error::{PlaytestError, SimulationError};
use crate::exploit::{AnomalyExploitDetector, ExploitDetector, ExploitFinding};
use crate::persona::{Persona, PersonaKind};
use crate::simulation::{Simulation, SimulationFactory};
use crate::snapshot::{PlayerId, StateSnapshot};

/// Ticks between cooperative yields inside a match loop.
pub const YIELD_EVERY_TICKS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub personas: Vec<PersonaKind>,
    pub games_per_persona: u32,
    pub max_ticks: u64,
    /// `None` derives a seed from the wall clock.
    pub seed: Option<u64>,
    pub parallel: bool,
    pub wall_clock_limit_secs: u64,
    pub fail_fast: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            personas: PersonaKind::ALL.to_vec(),
            games_per_persona: 5,
            max_ticks: 5_000,
            seed: None,
            parallel: false,
            wall_clock_limit_secs: 60,
            fail_fast: false,
        }
    }
}

impl SessionConfig {
    /// # Errors
    ///
    /// Returns [`PlaytestError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<(), PlaytestError> {
        let invalid = |field, reason| Err(PlaytestError::InvalidConfig { field, reason });
        if self.personas.is_empty() {
            return invalid("personas", "must name at least one persona");
        }
        if self.games_per_persona == 0 {
            return invalid("games_per_persona", "must be greater than zero");
        }
        if self.max_ticks == 0 {
            return invalid("max_ticks", "must be greater than zero");
        }
        if self.wall_clock_limit_secs == 0 {
            return invalid("wall_clock_limit_secs", "must be greater than zero");
        }
        Ok(())
    }

    #[must_use]
    pub fn total_games(&self) -> usize {
        self.personas.len() * usize::try_from(self.games_per_persona).unwrap_or(usize::MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Completed,
    CompletedWithErrors,
    Failed,
}

impl SessionStatus {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::CompletedWithErrors => "completed_with_errors",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub status: SessionStatus,
    pub seed: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub total_games: usize,
    pub errored_games: usize,
    pub issues_by_severity: BTreeMap<Severity, usize>,
    pub recommendations: Vec<String>,
    pub balance_report: BalanceReport,
    pub exploit_findings: Vec<ExploitFinding>,
    pub results: Vec<PlaytestResult>,
}

/// Seed for one match, domain-separated by persona and game index.
#[must_use]
pub fn derive_match_seed(session_seed: u64, persona: PersonaKind, game: u32) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&session_seed.to_le_bytes()) else {
        return session_seed.wrapping_add(u64::from(game));
    };
    mac.update(persona.label().as_bytes());
    mac.update(&game.to_le_bytes());
    let digest = mac.finalize().into_bytes();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

fn time_seed() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
}

fn outcome_of(snapshot: &StateSnapshot, player: PlayerId) -> Option<Outcome> {
    match snapshot.winner {
        Some(winner) if winner == player => Some(Outcome::Win),
        Some(_) => Some(Outcome::Loss),
        None if snapshot.game_over => Some(Outcome::Draw),
        None => None,
    }
}

#[derive(Debug, Clone, Copy)]
struct MatchSpec {
    index: usize,
    persona: PersonaKind,
    game: u32,
    seed: u64,
    max_ticks: u64,
    wall_clock_limit: Duration,
}

async fn run_match<F: SimulationFactory>(
    factory: Arc<F>,
    catalog: Arc<CostCatalog>,
    spec: MatchSpec,
) -> Result<PlaytestResult, SimulationError> {
    debug!(
        "match {} starting: {} game {} seed {}",
        spec.index, spec.persona, spec.game, spec.seed
    );
    let mut sim = factory.create(spec.seed)?;
    let player = sim.ai_player();
    let mut agent = PlaytestAgent::new(player, Persona::create(spec.persona), catalog);
    let started = Instant::now();
    let mut ticks_run = 0u64;
    let outcome = loop {
        {
            let snapshot = sim.snapshot();
            if let Some(outcome) = outcome_of(snapshot, player) {
                break outcome;
            }
            if snapshot.tick >= spec.max_ticks || started.elapsed() >= spec.wall_clock_limit {
                break Outcome::Timeout;
            }
            agent.update(snapshot);
        }
        if let Some(action) = agent.best_action() {
            factory.execute(&mut sim, player, &action)?;
        }
        sim.step()?;
        ticks_run += 1;
        if ticks_run % YIELD_EVERY_TICKS == 0 {
            tokio::task::yield_now().await;
        }
    };
    let snapshot = sim.snapshot();
    agent.update(snapshot);
    let result = agent.playtest_result(outcome, factory.final_score(snapshot, player));
    debug!(
        "match {} finished: {} after {} ticks (score {:.1})",
        spec.index, result.outcome, result.duration_ticks, result.final_score
    );
    Ok(result)
}

/// Drives a playtest session against a simulation factory.
pub struct Coordinator<F: SimulationFactory> {
    factory: Arc<F>,
    config: SessionConfig,
    detectors: Vec<Box<dyn ExploitDetector>>,
    status: SessionStatus,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

impl<F: SimulationFactory> Coordinator<F> {
    #[must_use]
    pub fn new(factory: Arc<F>, config: SessionConfig) -> Self {
        Self {
            factory,
            config,
            detectors: vec![Box::new(AnomalyExploitDetector::default())],
            status: SessionStatus::Running,
            started_at: None,
            ended_at: None,
        }
    }

    #[must_use]
    pub fn with_detector(mut self, detector: Box<dyn ExploitDetector>) -> Self {
        self.detectors.push(detector);
        self
    }

    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub const fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    fn schedule(&self, session_seed: u64) -> Vec<MatchSpec> {
        let wall_clock_limit = Duration::from_secs(self.config.wall_clock_limit_secs);
        let mut specs = Vec::with_capacity(self.config.total_games());
        for persona in &self.config.personas {
            for game in 0..self.config.games_per_persona {
                specs.push(MatchSpec {
                    index: specs.len(),
                    persona: *persona,
                    game,
                    seed: derive_match_seed(session_seed, *persona, game),
                    max_ticks: self.config.max_ticks,
                    wall_clock_limit,
                });
            }
        }
        specs
    }

    fn fail(&mut self, error: PlaytestError) -> PlaytestError {
        self.status = SessionStatus::Failed;
        self.ended_at = Some(Utc::now());
        warn!("playtest session failed: {error}");
        error
    }

    fn isolate(spec: &MatchSpec, message: &str) -> PlaytestResult {
        warn!(
            "match {} ({} game {}) failed, continuing: {message}",
            spec.index, spec.persona, spec.game
        );
        PlaytestResult::errored(spec.persona, message, 0)
    }

    async fn run_sequential(
        &mut self,
        specs: &[MatchSpec],
        catalog: &Arc<CostCatalog>,
    ) -> Result<Vec<PlaytestResult>, PlaytestError> {
        let mut results = Vec::with_capacity(specs.len());
        for spec in specs {
            match run_match(Arc::clone(&self.factory), Arc::clone(catalog), *spec).await {
                Ok(result) => results.push(result),
                Err(err) if self.config.fail_fast => return Err(self.fail(err.into())),
                Err(err) => results.push(Self::isolate(spec, &err.to_string())),
            }
        }
        Ok(results)
    }

    async fn run_parallel(
        &mut self,
        specs: &[MatchSpec],
        catalog: &Arc<CostCatalog>,
    ) -> Result<Vec<PlaytestResult>, PlaytestError> {
        let mut set = JoinSet::new();
        for spec in specs {
            let factory = Arc::clone(&self.factory);
            let catalog = Arc::clone(catalog);
            let spec = *spec;
            set.spawn(async move { (spec.index, run_match(factory, catalog, spec).await) });
        }
        let mut slots: Vec<Option<PlaytestResult>> = vec![None; specs.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, Ok(result))) => slots[index] = Some(result),
                Ok((_, Err(err))) if self.config.fail_fast => {
                    set.abort_all();
                    return Err(self.fail(err.into()));
                }
                Ok((index, Err(err))) => {
                    slots[index] = Some(Self::isolate(&specs[index], &err.to_string()));
                }
                Err(join_err) if self.config.fail_fast => {
                    set.abort_all();
                    return Err(self.fail(PlaytestError::MatchTask(join_err.to_string())));
                }
                Err(join_err) => warn!("match task aborted: {join_err}"),
            }
        }
        Ok(slots
            .into_iter()
            .zip(specs)
            .map(|(slot, spec)| slot.unwrap_or_else(|| Self::isolate(spec, "match task aborted")))
            .collect())
    }

    /// Run every scheduled match, then analyze the batch.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid config, or for the first failing match when
    /// `fail_fast` is set. Otherwise failures are recorded as `error` outcomes.
    pub async fn run(&mut self) -> Result<SessionSummary, PlaytestError> {
        let started_at = Utc::now();
        let clock = Instant::now();
        self.started_at = Some(started_at);
        self.status = SessionStatus::Running;
        if let Err(err) = self.config.validate() {
            return Err(self.fail(err));
        }
        let seed = self.config.seed.unwrap_or_else(time_seed);
        let session_id = format!("session-{}-{seed:016x}", started_at.format("%Y%m%dT%H%M%S"));
        let specs = self.schedule(seed);
        info!(
            "playtest session {session_id}: {} games ({} personas x {}), {}",
            specs.len(),
            self.config.personas.len(),
            self.config.games_per_persona,
            if self.config.parallel { "parallel" } else { "sequential" }
        );

        let catalog = Arc::new(self.factory.catalog().clone());
        let results = if self.config.parallel {
            self.run_parallel(&specs, &catalog).await?
        } else {
            self.run_sequential(&specs, &catalog).await?
        };

        let errored_games = results.iter().filter(|r| r.outcome.is_error()).count();
        let mut detector = BalanceDetector::new();
        detector.add_results(results.iter().filter(|r| !r.outcome.is_error()).cloned());
        let balance_report = detector.analyze_balance();
        let exploit_findings: Vec<ExploitFinding> = self
            .detectors
            .iter()
            .flat_map(|d| d.analyze(detector.results()))
            .collect();
        let issues_by_severity: BTreeMap<Severity, usize> = Severity::ALL
            .into_iter()
            .map(|severity| (severity, balance_report.count_by_severity(severity)))
            .collect();

        self.status = if errored_games > 0 {
            SessionStatus::CompletedWithErrors
        } else {
            SessionStatus::Completed
        };
        let ended_at = Utc::now();
        self.ended_at = Some(ended_at);
        let elapsed_ms = u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            "playtest session {session_id} {}: {} games, {errored_games} errored, balance {} in {elapsed_ms} ms",
            self.status,
            results.len(),
            balance_report.overall_balance
        );
        Ok(SessionSummary {
            session_id,
            status: self.status,
            seed,
            started_at,
            ended_at,
            elapsed_ms,
            total_games: results.len(),
            errored_games,
            issues_by_severity,
            recommendations: balance_report.recommendations.clone(),
            balance_report,
            exploit_findings,
            results,
        })
    }
}

/// Convenience wrapper running a fresh [`Coordinator`].
///
/// # Errors
///
/// See [`Coordinator::run`].
pub async fn run_playtest_session<F: SimulationFactory>(
    factory: Arc<F>,
    config: SessionConfig,
) -> Result<SessionSummary, PlaytestError> {
    Coordinator::new(factory, config).run().await
}
