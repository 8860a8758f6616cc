mod engine;
mod error;
mod solver;
mod tables;
mod tax;
mod types;

pub use engine::{
    CorrelatedReturnGenerator, MonteCarloRunner, PortfolioPathSimulator, ReturnSample,
};
pub use error::{Error, Result};
pub use solver::{DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE, WithdrawalSolver};
pub use tables::{BracketTable, SocialSecurityThreshold, TaxBracket, TaxTables};
pub use tax::{
    FederalTaxCalculator, bracket_liability, capital_gains_liability, taxable_social_security,
};
pub use types::{
    DEFAULT_SEED, DepositPolicy, FilingStatus, IncomeProfile, MAX_SIMULATIONS, MAX_YEARS,
    MarketParams, PortfolioPath, SimulationConfig, SimulationSummary, TaxResult,
    WithdrawalTaxAssumption,
};
