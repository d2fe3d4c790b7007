use thiserror::Error;

/// Failures raised by a simulation behind the [`crate::simulation`] boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SimulationError {
    #[error("simulation setup failed: {0}")]
    Setup(String),
    #[error("simulation step failed at tick {tick}: {message}")]
    Step { tick: u64, message: String },
    #[error("action {action} rejected: {message}")]
    InvalidAction { action: String, message: String },
}

/// Errors surfaced by a playtest session.
#[derive(Debug, Error)]
pub enum PlaytestError {
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    #[error("invalid session config: {field} {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },
    #[error("match task failed: {0}")]
    MatchTask(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulation_errors_convert_and_display() {
        let err: PlaytestError = SimulationError::Step {
            tick: 42,
            message: "desync".into(),
        }
        .into();
        assert_eq!(err.to_string(), "simulation step failed at tick 42: desync");
        let config = PlaytestError::InvalidConfig {
            field: "max_ticks",
            reason: "must be greater than zero",
        };
        assert_eq!(
            config.to_string(),
            "invalid session config: max_ticks must be greater than zero"
        );
    }
}
