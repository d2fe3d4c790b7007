//! Boundary between the decision core and the game simulation it drives.

use crate::action::Action;
use crate::catalog::CostCatalog;
use crate::error::SimulationError;
use crate::snapshot::{PlayerId, StateSnapshot};

/// One running match. The core only reads snapshots and asks for steps.
pub trait Simulation {
    /// Consistent view of the current instant.
    fn snapshot(&self) -> &StateSnapshot;

    /// Advance one tick.
    ///
    /// # Errors
    ///
    /// Returns an error if the simulation cannot continue.
    fn step(&mut self) -> Result<(), SimulationError>;

    /// Player controlled by the playtesting agent.
    fn ai_player(&self) -> PlayerId;
}

/// Builds seeded simulations and applies agent actions to them.
pub trait SimulationFactory: Send + Sync + 'static {
    type Sim: Simulation + Send + 'static;

    /// # Errors
    ///
    /// Returns an error if the simulation cannot be set up.
    fn create(&self, seed: u64) -> Result<Self::Sim, SimulationError>;

    /// Apply `action` on behalf of `player`.
    ///
    /// # Errors
    ///
    /// Returns an error if the action cannot be applied.
    fn execute(
        &self,
        sim: &mut Self::Sim,
        player: PlayerId,
        action: &Action,
    ) -> Result<(), SimulationError>;

    /// Costs used for situation evaluation and default scoring.
    fn catalog(&self) -> &CostCatalog;

    /// Final score of `player`: unit and building replacement cost plus half the bank.
    fn final_score(&self, snapshot: &StateSnapshot, player: PlayerId) -> f64 {
        self.catalog().asset_valuation(snapshot, player)
    }
}
