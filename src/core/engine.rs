use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, warn};

use super::error::{Error, Result};
use super::solver::WithdrawalSolver;
use super::tables::TaxTables;
use super::tax::FederalTaxCalculator;
use super::types::{
    DepositPolicy, MarketParams, PortfolioPath, SimulationConfig, SimulationSummary,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnSample {
    pub stock: f64,
    pub bond: f64,
}

/// Bivariate normal stock/bond annual returns.
///
/// Draws go through the Cholesky factor of
/// `[[s1^2, rho*s1*s2], [rho*s1*s2, s2^2]]`, which stays well defined when
/// either standard deviation is zero. Every call is an independent draw.
#[derive(Debug, Clone, Copy)]
pub struct CorrelatedReturnGenerator {
    stock_mean: f64,
    stock_std: f64,
    bond_mean: f64,
    bond_std: f64,
    correlation: f64,
    orthogonal: f64,
}

impl CorrelatedReturnGenerator {
    pub fn new(params: &MarketParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            stock_mean: params.stock_mean,
            stock_std: params.stock_std,
            bond_mean: params.bond_mean,
            bond_std: params.bond_std,
            correlation: params.correlation,
            orthogonal: (1.0 - params.correlation * params.correlation).max(0.0).sqrt(),
        })
    }

    pub fn mean(&self) -> [f64; 2] {
        [self.stock_mean, self.bond_mean]
    }

    pub fn covariance(&self) -> [[f64; 2]; 2] {
        let cov = self.correlation * self.stock_std * self.bond_std;
        [
            [self.stock_std * self.stock_std, cov],
            [cov, self.bond_std * self.bond_std],
        ]
    }
}

impl Distribution<ReturnSample> for CorrelatedReturnGenerator {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> ReturnSample {
        let z1: f64 = StandardNormal.sample(rng);
        let z2: f64 = StandardNormal.sample(rng);
        ReturnSample {
            stock: self.stock_mean + self.stock_std * z1,
            bond: self.bond_mean + self.bond_std * (self.correlation * z1 + self.orthogonal * z2),
        }
    }
}

/// Advances one portfolio trajectory a year at a time.
///
/// The gross withdrawal depends only on the config, so it is solved once at
/// construction. A divergent solve is kept and reported by every trial that
/// has to withdraw.
#[derive(Debug, Clone)]
pub struct PortfolioPathSimulator<'a> {
    config: &'a SimulationConfig,
    withdrawal: Result<f64>,
    returns: CorrelatedReturnGenerator,
}

impl<'a> PortfolioPathSimulator<'a> {
    pub fn new(
        config: &'a SimulationConfig,
        tables: &'a TaxTables,
        solver: WithdrawalSolver,
    ) -> Result<Self> {
        config.validate()?;
        let returns = CorrelatedReturnGenerator::new(&config.market)?;
        let calculator = FederalTaxCalculator::new(tables);
        let withdrawal = match solver.solve(config.spending, &config.withdrawal_tax, |profile| {
            calculator.compute(profile)
        }) {
            Ok(withdrawal) => Ok(withdrawal),
            Err(err @ Error::WithdrawalSolverDivergence { .. }) => Err(err),
            Err(err) => return Err(err),
        };
        Ok(Self {
            config,
            withdrawal,
            returns,
        })
    }

    /// Gross withdrawal that nets `spending` under the configured tax assumption.
    pub fn annual_withdrawal(&self) -> Result<f64> {
        self.withdrawal.clone()
    }

    pub fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<PortfolioPath> {
        let cfg = self.config;
        let years = cfg.years as usize;
        let mut values = Vec::with_capacity(years);
        values.push(cfg.starting_amount);

        let mut balance = cfg.starting_amount;
        while values.len() < years {
            if balance <= 0.0 {
                // Ruin is absorbing.
                values.push(0.0);
                continue;
            }

            if cfg.deposit_policy == DepositPolicy::BeforeGrowth {
                balance += cfg.deposit;
            }

            let sampled = self.returns.sample(rng);
            let blended = cfg.stock_weight * sampled.stock + (1.0 - cfg.stock_weight) * sampled.bond;
            let grown = balance * (1.0 + blended);
            let withdrawal = self.annual_withdrawal()?;

            balance = (grown - withdrawal).max(0.0);
            values.push(balance);
        }

        Ok(PortfolioPath::from_values(values))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TrialOutcome {
    Completed(f64),
    Unresolved,
}

/// Runs independent trials of [`PortfolioPathSimulator`] and folds them into a
/// [`SimulationSummary`].
#[derive(Debug, Clone, Copy)]
pub struct MonteCarloRunner<'a> {
    tables: &'a TaxTables,
    solver: WithdrawalSolver,
}

impl<'a> MonteCarloRunner<'a> {
    pub fn new(tables: &'a TaxTables) -> Self {
        Self {
            tables,
            solver: WithdrawalSolver::default(),
        }
    }

    pub fn with_solver(mut self, solver: WithdrawalSolver) -> Self {
        self.solver = solver;
        self
    }

    pub fn run(&self, config: &SimulationConfig) -> Result<SimulationSummary> {
        let simulator = PortfolioPathSimulator::new(config, self.tables, self.solver)?;
        info!(
            simulations = config.num_simulations,
            years = config.years,
            starting_amount = config.starting_amount,
            spending = config.spending,
            stock_weight = config.stock_weight,
            seed = config.seed,
            "running retirement simulation"
        );

        let outcomes = (0..config.num_simulations)
            .into_par_iter()
            .map(|trial| {
                let mut rng = ChaCha8Rng::seed_from_u64(derive_seed(config.seed, trial));
                match simulator.run(&mut rng) {
                    Ok(path) => Ok(TrialOutcome::Completed(path.ending_value())),
                    Err(Error::WithdrawalSolverDivergence {
                        iterations,
                        last_delta,
                    }) => {
                        warn!(
                            trial,
                            iterations,
                            last_delta,
                            "withdrawal did not converge; trial failed"
                        );
                        Ok(TrialOutcome::Unresolved)
                    }
                    Err(err) => Err(err),
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let summary = summarize(&outcomes);
        info!(
            pass_percentage = summary.pass_percentage,
            fail_percentage = summary.fail_percentage,
            average_ending_value = ?summary.average_ending_value,
            solver_failures = summary.solver_failures,
            "retirement simulation finished"
        );
        Ok(summary)
    }
}

fn summarize(outcomes: &[TrialOutcome]) -> SimulationSummary {
    let mut passes = 0_u32;
    let mut fails = 0_u32;
    let mut solver_failures = 0_u32;
    let mut passing_sum = 0.0;
    let mut endings = Vec::with_capacity(outcomes.len());

    for outcome in outcomes {
        match *outcome {
            TrialOutcome::Completed(ending) if ending > 0.0 => {
                passes += 1;
                passing_sum += ending;
                endings.push(ending);
            }
            TrialOutcome::Completed(_) => {
                fails += 1;
                endings.push(0.0);
            }
            TrialOutcome::Unresolved => {
                fails += 1;
                solver_failures += 1;
                endings.push(0.0);
            }
        }
    }
    debug!(passes, fails, solver_failures, "trial outcomes tallied");

    endings.sort_by(f64::total_cmp);

    let total = outcomes.len() as f64;
    let share = |count: u32| {
        if total > 0.0 {
            100.0 * count as f64 / total
        } else {
            0.0
        }
    };

    SimulationSummary {
        pass_percentage: share(passes),
        fail_percentage: share(fails),
        average_ending_value: (passes > 0).then(|| passing_sum / passes as f64),
        median_ending_value: quantile(&endings, 0.5),
        p10_ending_value: quantile(&endings, 0.1),
        solver_failures,
        num_simulations: outcomes.len() as u32,
    }
}

/// Seeds trial `trial` with one SplitMix64 output step over `base_seed ^ trial`.
fn derive_seed(base_seed: u64, trial: u32) -> u64 {
    const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;
    let mut z = (base_seed ^ u64::from(trial)).wrapping_add(GOLDEN_GAMMA);
    for (shift, multiplier) in [(30, 0xBF58_476D_1CE4_E5B9_u64), (27, 0x94D0_49BB_1331_11EB)] {
        z = (z ^ (z >> shift)).wrapping_mul(multiplier);
    }
    z ^ (z >> 31)
}

/// Linearly interpolated quantile `q` in `[0, 1]` of ascending `sorted`.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let below = position.floor() as usize;
    let frac = position - below as f64;
    match sorted.get(below + 1) {
        Some(&next) if frac > 0.0 => sorted[below] + (next - sorted[below]) * frac,
        _ => sorted[below],
    }
}
