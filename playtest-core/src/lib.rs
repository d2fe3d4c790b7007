//! Playtest Decision Core
//!
//! Simulation-agnostic decision logic for automated RTS playtesting: a
//! persona-weighted planner that drives one side of a match, and batch
//! analysis that turns many match results into ranked balance findings.
//! The game simulation itself lives behind the [`simulation`] traits.

pub mod action;
pub mod agent;
pub mod balance;
pub mod catalog;
#[cfg(feature = "async")]
pub mod coordinator;
pub mod error;
pub mod exploit;
pub mod numbers;
pub mod persona;
pub mod planner;
pub mod simulation;
pub mod situation;
pub mod snapshot;

// Re-export commonly used types
pub use action::{Action, ActionHints, ActionKind, ArmyOrder, candidate_actions};
pub use agent::{
    ActionRecord, DifficultySpike, Outcome, PlaytestAgent, PlaytestMetrics, PlaytestResult,
};
pub use balance::{
    BalanceDetector, BalanceIssue, BalanceMetrics, BalanceReport, IssueKind, OverallBalance,
    Severity, resource_efficiency_issues, strategy_label,
};
pub use catalog::{BuildingSpec, Cost, CostCatalog, UnitSpec};
#[cfg(feature = "async")]
pub use coordinator::{
    Coordinator, SessionConfig, SessionStatus, SessionSummary, derive_match_seed,
    run_playtest_session,
};
pub use error::{PlaytestError, SimulationError};
pub use exploit::{AnomalyExploitDetector, ExploitDetector, ExploitFinding, ExploitKind};
pub use persona::{Persona, PersonaKind, PersonaTraits};
pub use planner::{
    ActionScorer, NodeCache, Planner, PlannerConfig, PlannerMode, SearchNode, StateFingerprint,
    direct_score, heuristic_score,
};
pub use simulation::{Simulation, SimulationFactory};
pub use situation::{GamePhase, SituationSummary, evaluate};
pub use snapshot::{
    Building, BuildingKind, MapSize, PlayerId, PlayerState, Position, Resources, StateSnapshot,
    Unit, UnitKind,
};
