use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("invalid filing status: {0}")]
    InvalidFilingStatus(String),

    #[error("invalid bracket table {table}: {reason}")]
    InvalidBracketTable { table: String, reason: String },

    #[error("withdrawal solver did not converge after {iterations} iterations (last step {last_delta})")]
    WithdrawalSolverDivergence { iterations: u32, last_delta: f64 },

    #[error("invalid simulation config: {0}")]
    InvalidSimulationConfig(String),

    #[error("invalid market parameters: {0}")]
    InvalidMarketParams(String),
}

pub type Result<T> = std::result::Result<T, Error>;
