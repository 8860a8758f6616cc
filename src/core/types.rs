use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::Error;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilingStatus {
    Single,
    Married,
}

impl FilingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FilingStatus::Single => "single",
            FilingStatus::Married => "married",
        }
    }
}

impl fmt::Display for FilingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilingStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(FilingStatus::Single),
            "married" => Ok(FilingStatus::Married),
            _ => Err(Error::InvalidFilingStatus(s.to_string())),
        }
    }
}

/// Inputs to a single federal tax computation. Values are not checked for
/// sign; negative income simply produces no bracket liability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IncomeProfile {
    pub regular_income: f64,
    pub capital_gains: f64,
    pub social_security_benefits: f64,
    pub filing_status: FilingStatus,
}

impl IncomeProfile {
    pub fn gross_income(&self) -> f64 {
        self.regular_income + self.capital_gains + self.social_security_benefits
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxResult {
    pub taxes_owed: f64,
    pub effective_rate: f64,
}

/// Annual return assumptions for the two-asset stock/bond mix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketParams {
    #[serde(rename = "stock_returns")]
    pub stock_mean: f64,
    pub stock_std: f64,
    #[serde(rename = "bond_returns")]
    pub bond_mean: f64,
    pub bond_std: f64,
    pub correlation: f64,
}

impl MarketParams {
    pub fn validate(&self) -> Result<(), Error> {
        for (name, value) in [
            ("stock_returns", self.stock_mean),
            ("bond_returns", self.bond_mean),
        ] {
            if !value.is_finite() {
                return Err(Error::InvalidMarketParams(format!("{name} must be finite")));
            }
        }
        for (name, value) in [("stock_std", self.stock_std), ("bond_std", self.bond_std)] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidMarketParams(format!("{name} must be >= 0")));
            }
        }
        if !(-1.0..=1.0).contains(&self.correlation) {
            return Err(Error::InvalidMarketParams(
                "correlation must be between -1 and 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Income mix assumed when grossing up a year's spending for tax.
///
/// The default reproduces the historical behaviour: the retiree is taxed as a
/// single filer with no capital gains and no Social Security income, whatever
/// the rest of the plan says.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WithdrawalTaxAssumption {
    pub filing_status: FilingStatus,
    pub capital_gains: f64,
    pub social_security: f64,
}

impl Default for WithdrawalTaxAssumption {
    fn default() -> Self {
        Self {
            filing_status: FilingStatus::Single,
            capital_gains: 0.0,
            social_security: 0.0,
        }
    }
}

impl WithdrawalTaxAssumption {
    pub fn profile_for(&self, withdrawal: f64) -> IncomeProfile {
        IncomeProfile {
            regular_income: withdrawal,
            capital_gains: self.capital_gains,
            social_security_benefits: self.social_security,
            filing_status: self.filing_status,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum DepositPolicy {
    /// `deposit` is accepted and carried but never applied.
    #[default]
    Ignored,
    /// `deposit` is added to the balance before each year's growth step.
    BeforeGrowth,
}

pub const DEFAULT_SEED: u64 = 42;
pub const MAX_YEARS: u32 = 150;
pub const MAX_SIMULATIONS: u32 = 100_000;

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub starting_amount: f64,
    pub spending: f64,
    pub deposit: f64,
    pub years: u32,
    pub stock_weight: f64,
    pub num_simulations: u32,
    pub seed: u64,
    pub market: MarketParams,
    pub withdrawal_tax: WithdrawalTaxAssumption,
    pub deposit_policy: DepositPolicy,
}

impl SimulationConfig {
    /// Config with the historical withdrawal-tax assumption, ignored
    /// deposits and the default seed.
    pub fn new(
        starting_amount: f64,
        spending: f64,
        deposit: f64,
        years: u32,
        stock_weight: f64,
        num_simulations: u32,
        market: MarketParams,
    ) -> Self {
        Self {
            starting_amount,
            spending,
            deposit,
            years,
            stock_weight,
            num_simulations,
            seed: DEFAULT_SEED,
            market,
            withdrawal_tax: WithdrawalTaxAssumption::default(),
            deposit_policy: DepositPolicy::default(),
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.years == 0 || self.years > MAX_YEARS {
            return Err(Error::InvalidSimulationConfig(format!(
                "years must be between 1 and {MAX_YEARS}"
            )));
        }
        if self.num_simulations == 0 || self.num_simulations > MAX_SIMULATIONS {
            return Err(Error::InvalidSimulationConfig(format!(
                "num_simulations must be between 1 and {MAX_SIMULATIONS}"
            )));
        }
        if !(0.0..=1.0).contains(&self.stock_weight) {
            return Err(Error::InvalidSimulationConfig(
                "stock_weight must be between 0 and 1".to_string(),
            ));
        }
        for (name, value) in [
            ("starting_amount", self.starting_amount),
            ("spending", self.spending),
            ("deposit", self.deposit),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidSimulationConfig(format!("{name} must be >= 0")));
            }
        }
        self.market.validate()
    }
}

/// Year-end portfolio values of one trial; `values()[0]` is the starting amount.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioPath {
    values: Vec<f64>,
}

impl PortfolioPath {
    pub(crate) fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn ending_value(&self) -> f64 {
        self.values.last().copied().unwrap_or(0.0)
    }

    pub fn is_ruined(&self) -> bool {
        self.ending_value() <= 0.0
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSummary {
    pub pass_percentage: f64,
    pub fail_percentage: f64,
    /// Mean ending value over passing trials; `None` when no trial passed.
    pub average_ending_value: Option<f64>,
    pub median_ending_value: f64,
    pub p10_ending_value: f64,
    pub solver_failures: u32,
    pub num_simulations: u32,
}
