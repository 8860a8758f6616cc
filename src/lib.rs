pub mod api;
pub mod config;
pub mod core;

pub use config::AppConfig;

use crate::core::{
    FederalTaxCalculator, FilingStatus, IncomeProfile, MonteCarloRunner, SimulationConfig,
    SimulationSummary, TaxResult,
};

/// Federal tax owed and effective rate for one year of retirement income.
pub fn compute_federal_tax(
    config: &AppConfig,
    regular_income: f64,
    capital_gains: f64,
    social_security_benefits: f64,
    filing_status: &str,
) -> crate::core::Result<TaxResult> {
    let filing_status: FilingStatus = filing_status.parse()?;
    FederalTaxCalculator::new(&config.tax).compute(&IncomeProfile {
        regular_income,
        capital_gains,
        social_security_benefits,
        filing_status,
    })
}

/// Monte Carlo survival odds of a portfolio drawing `spending` after tax
/// each year. `deposit` is carried but not applied; see [`crate::core::DepositPolicy`].
pub fn run_retirement_simulation(
    config: &AppConfig,
    starting_amount: f64,
    spending: f64,
    deposit: f64,
    years: u32,
    stock_weight: f64,
    num_simulations: u32,
) -> crate::core::Result<SimulationSummary> {
    let simulation = SimulationConfig::new(
        starting_amount,
        spending,
        deposit,
        years,
        stock_weight,
        num_simulations,
        config.market,
    );
    MonteCarloRunner::new(&config.tax).run(&simulation)
}
