use super::error::{Error, Result};
use super::types::{IncomeProfile, TaxResult, WithdrawalTaxAssumption};

pub const DEFAULT_TOLERANCE: f64 = 1.0;
pub const DEFAULT_MAX_ITERATIONS: u32 = 200;

/// Grosses a spending target up to the withdrawal that nets it after tax.
///
/// Iterates `W(n+1) = spending + tax(W(n))` starting from `W(0) = spending +
/// tax(spending)` until two successive withdrawals are within `tolerance`.
/// The loop is capped; hitting the cap is a [`Error::WithdrawalSolverDivergence`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WithdrawalSolver {
    pub tolerance: f64,
    pub max_iterations: u32,
}

impl Default for WithdrawalSolver {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl WithdrawalSolver {
    pub fn new(tolerance: f64, max_iterations: u32) -> Result<Self> {
        let solver = Self {
            tolerance,
            max_iterations,
        };
        solver.validate()?;
        Ok(solver)
    }

    fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(Error::InvalidSimulationConfig(
                "solver tolerance must be > 0".to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(Error::InvalidSimulationConfig(
                "solver max_iterations must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn solve<F>(
        &self,
        spending: f64,
        assumption: &WithdrawalTaxAssumption,
        tax_fn: F,
    ) -> Result<f64>
    where
        F: Fn(&IncomeProfile) -> Result<TaxResult>,
    {
        self.validate()?;
        let tax_on = |withdrawal: f64| -> Result<f64> {
            Ok(tax_fn(&assumption.profile_for(withdrawal))?.taxes_owed)
        };

        let mut withdrawal = spending + tax_on(spending)?;
        let mut delta = (withdrawal - spending).abs();
        let mut iterations = 0;

        // Written as a negated `<=` so a NaN step is treated as not converged.
        while !(delta <= self.tolerance) {
            if iterations >= self.max_iterations {
                return Err(Error::WithdrawalSolverDivergence {
                    iterations,
                    last_delta: delta,
                });
            }
            iterations += 1;
            let next = spending + tax_on(withdrawal)?;
            delta = (next - withdrawal).abs();
            withdrawal = next;
        }

        Ok(withdrawal)
    }
}
