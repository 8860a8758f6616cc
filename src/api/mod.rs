use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Json, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::core::{
    DEFAULT_SEED, DepositPolicy, FederalTaxCalculator, FilingStatus, IncomeProfile,
    MAX_SIMULATIONS, MAX_YEARS, MarketParams, MonteCarloRunner, PortfolioPathSimulator,
    SimulationConfig, SimulationSummary, TaxResult, WithdrawalSolver, WithdrawalTaxAssumption,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliFilingStatus {
    Single,
    Married,
}

impl From<CliFilingStatus> for FilingStatus {
    fn from(value: CliFilingStatus) -> Self {
        match value {
            CliFilingStatus::Single => FilingStatus::Single,
            CliFilingStatus::Married => FilingStatus::Married,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliDepositPolicy {
    Ignored,
    BeforeGrowth,
}

impl From<CliDepositPolicy> for DepositPolicy {
    fn from(value: CliDepositPolicy) -> Self {
        match value {
            CliDepositPolicy::Ignored => DepositPolicy::Ignored,
            CliDepositPolicy::BeforeGrowth => DepositPolicy::BeforeGrowth,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiDepositPolicy {
    #[serde(alias = "none")]
    Ignored,
    #[serde(alias = "beforeGrowth", alias = "before_growth")]
    BeforeGrowth,
}

impl From<ApiDepositPolicy> for CliDepositPolicy {
    fn from(value: ApiDepositPolicy) -> Self {
        match value {
            ApiDepositPolicy::Ignored => CliDepositPolicy::Ignored,
            ApiDepositPolicy::BeforeGrowth => CliDepositPolicy::BeforeGrowth,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "retiretax",
    about = "US federal retirement tax estimator and Monte Carlo portfolio survival simulator"
)]
pub struct Cli {
    #[arg(long, global = true, help = "JSON file with bracket, threshold and deduction tables")]
    tax_config: Option<PathBuf>,
    #[arg(long, global = true, help = "JSON file with stock/bond return assumptions")]
    market_config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON API.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Federal tax owed on one year of retirement income.
    Tax(TaxArgs),
    /// Monte Carlo portfolio survival.
    Simulate(SimulateArgs),
}

#[derive(Args, Debug, Clone)]
struct TaxArgs {
    #[arg(long, default_value_t = 0.0)]
    regular_income: f64,
    #[arg(long, default_value_t = 0.0)]
    capital_gains: f64,
    #[arg(long, default_value_t = 0.0)]
    social_security: f64,
    #[arg(long, value_enum, default_value_t = CliFilingStatus::Single)]
    filing_status: CliFilingStatus,
}

#[derive(Args, Debug, Clone)]
struct SimulateArgs {
    #[arg(long, default_value_t = 1_000_000.0)]
    starting_amount: f64,
    #[arg(long, default_value_t = 50_000.0, help = "After-tax spending target per year")]
    spending: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Annual contribution; only applied with --deposit-policy=before-growth"
    )]
    deposit: f64,
    #[arg(long, value_enum, default_value_t = CliDepositPolicy::Ignored)]
    deposit_policy: CliDepositPolicy,
    #[arg(long, default_value_t = 30)]
    years: u32,
    #[arg(long, default_value_t = 0.5, help = "Stock share of the portfolio, 0 to 1")]
    stock_weight: f64,
    #[arg(long, default_value_t = 1_000)]
    simulations: u32,
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
    #[arg(
        long,
        value_enum,
        default_value_t = CliFilingStatus::Single,
        help = "Filing status assumed when grossing up withdrawals for tax"
    )]
    withdrawal_filing_status: CliFilingStatus,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Capital gains assumed alongside each withdrawal"
    )]
    withdrawal_capital_gains: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Social Security income assumed alongside each withdrawal"
    )]
    withdrawal_social_security: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TaxPayload {
    regular_income: Option<f64>,
    capital_gains: Option<f64>,
    social_security_benefits: Option<f64>,
    filing_status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    starting_amount: Option<f64>,
    spending: Option<f64>,
    deposit: Option<f64>,
    deposit_policy: Option<ApiDepositPolicy>,
    years: Option<u32>,
    stock_weight: Option<f64>,
    #[serde(alias = "simulations")]
    num_simulations: Option<u32>,
    seed: Option<u64>,
    withdrawal_filing_status: Option<String>,
    withdrawal_capital_gains: Option<f64>,
    withdrawal_social_security: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaxResponse {
    filing_status: FilingStatus,
    #[serde(flatten)]
    result: TaxResult,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    years: u32,
    seed: u64,
    stock_weight: f64,
    annual_withdrawal: Option<f64>,
    #[serde(flatten)]
    summary: SimulationSummary,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Parses the command line, loads config and runs the chosen subcommand.
pub async fn run_cli(cli: Cli) -> Result<(), String> {
    let config = AppConfig::load(cli.tax_config.as_deref(), cli.market_config.as_deref())
        .map_err(|e| e.to_string())?;

    match cli.command {
        Command::Serve { port } => run_http_server(port, config)
            .await
            .map_err(|e| format!("Server error: {e}")),
        Command::Tax(args) => {
            let response = compute_tax(&config, tax_profile_from_args(&args)?)?;
            print_json(&response)
        }
        Command::Simulate(args) => {
            let simulation = build_simulation_config(&args, config.market)?;
            let response = tokio::task::spawn_blocking(move || simulate(&config, &simulation))
                .await
                .map_err(|e| e.to_string())??;
            print_json(&response)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{text}");
    Ok(())
}

fn tax_profile_from_args(args: &TaxArgs) -> Result<IncomeProfile, String> {
    check_finite_amounts(&[
        ("--regular-income", args.regular_income),
        ("--capital-gains", args.capital_gains),
        ("--social-security", args.social_security),
    ])?;
    Ok(IncomeProfile {
        regular_income: args.regular_income,
        capital_gains: args.capital_gains,
        social_security_benefits: args.social_security,
        filing_status: args.filing_status.into(),
    })
}

// Negative amounts are allowed and owe nothing; NaN and infinities are not.
fn check_finite_amounts(amounts: &[(&str, f64)]) -> Result<(), String> {
    match amounts.iter().find(|(_, value)| !value.is_finite()) {
        Some((name, _)) => Err(format!("{name} must be a finite number")),
        None => Ok(()),
    }
}

fn build_simulation_config(
    args: &SimulateArgs,
    market: MarketParams,
) -> Result<SimulationConfig, String> {
    if args.years == 0 || args.years > MAX_YEARS {
        return Err(format!("--years must be between 1 and {MAX_YEARS}"));
    }

    if args.simulations == 0 || args.simulations > MAX_SIMULATIONS {
        return Err(format!("--simulations must be between 1 and {MAX_SIMULATIONS}"));
    }

    if !(0.0..=1.0).contains(&args.stock_weight) {
        return Err("--stock-weight must be between 0 and 1".to_string());
    }

    for (name, value) in [
        ("--starting-amount", args.starting_amount),
        ("--spending", args.spending),
        ("--deposit", args.deposit),
        ("--withdrawal-capital-gains", args.withdrawal_capital_gains),
        ("--withdrawal-social-security", args.withdrawal_social_security),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(format!("{name} must be >= 0"));
        }
    }

    let mut simulation = SimulationConfig::new(
        args.starting_amount,
        args.spending,
        args.deposit,
        args.years,
        args.stock_weight,
        args.simulations,
        market,
    );
    simulation.seed = args.seed;
    simulation.deposit_policy = args.deposit_policy.into();
    simulation.withdrawal_tax = WithdrawalTaxAssumption {
        filing_status: args.withdrawal_filing_status.into(),
        capital_gains: args.withdrawal_capital_gains,
        social_security: args.withdrawal_social_security,
    };
    simulation.validate().map_err(|e| e.to_string())?;
    Ok(simulation)
}

fn compute_tax(config: &AppConfig, profile: IncomeProfile) -> Result<TaxResponse, String> {
    let result = FederalTaxCalculator::new(&config.tax)
        .compute(&profile)
        .map_err(|e| e.to_string())?;
    Ok(TaxResponse {
        filing_status: profile.filing_status,
        result,
    })
}

fn simulate(config: &AppConfig, simulation: &SimulationConfig) -> Result<SimulateResponse, String> {
    let solver = WithdrawalSolver::default();
    let annual_withdrawal = PortfolioPathSimulator::new(simulation, &config.tax, solver)
        .and_then(|simulator| simulator.annual_withdrawal())
        .ok();
    let summary = MonteCarloRunner::new(&config.tax)
        .with_solver(solver)
        .run(simulation)
        .map_err(|e| e.to_string())?;

    Ok(SimulateResponse {
        years: simulation.years,
        seed: simulation.seed,
        stock_weight: simulation.stock_weight,
        annual_withdrawal,
        summary,
    })
}

pub async fn run_http_server(port: u16, config: AppConfig) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(Arc::new(config));

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "retirement tax API listening");

    axum::serve(listener, app).await
}

fn router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/api/tax", get(tax_get_handler).post(tax_post_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .fallback(not_found_handler)
        .with_state(state)
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn tax_get_handler(
    State(state): State<Arc<AppConfig>>,
    Query(payload): Query<TaxPayload>,
) -> Response {
    tax_handler_impl(&state, payload)
}

async fn tax_post_handler(
    State(state): State<Arc<AppConfig>>,
    Json(payload): Json<TaxPayload>,
) -> Response {
    tax_handler_impl(&state, payload)
}

fn tax_handler_impl(state: &AppConfig, payload: TaxPayload) -> Response {
    let profile = match tax_profile_from_payload(payload) {
        Ok(profile) => profile,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    match compute_tax(state, profile) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn simulate_get_handler(
    State(state): State<Arc<AppConfig>>,
    Query(payload): Query<SimulatePayload>,
) -> Response {
    simulate_handler_impl(state, payload).await
}

async fn simulate_post_handler(
    State(state): State<Arc<AppConfig>>,
    Json(payload): Json<SimulatePayload>,
) -> Response {
    simulate_handler_impl(state, payload).await
}

async fn simulate_handler_impl(state: Arc<AppConfig>, payload: SimulatePayload) -> Response {
    let simulation = match simulate_args_from_payload(payload)
        .and_then(|args| build_simulation_config(&args, state.market))
    {
        Ok(simulation) => simulation,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match tokio::task::spawn_blocking(move || simulate(&state, &simulation)).await {
        Ok(Ok(response)) => json_response(StatusCode::OK, response),
        Ok(Err(msg)) => error_response(StatusCode::BAD_REQUEST, &msg),
        Err(join_error) => {
            error!(error = %join_error, "simulation task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Simulation failed")
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn parse_filing_status(raw: &str) -> Result<FilingStatus, String> {
    raw.parse::<FilingStatus>().map_err(|e| e.to_string())
}

fn tax_profile_from_payload(payload: TaxPayload) -> Result<IncomeProfile, String> {
    let filing_status = match payload.filing_status.as_deref() {
        Some(raw) => parse_filing_status(raw)?,
        None => FilingStatus::Single,
    };
    let profile = IncomeProfile {
        regular_income: payload.regular_income.unwrap_or(0.0),
        capital_gains: payload.capital_gains.unwrap_or(0.0),
        social_security_benefits: payload.social_security_benefits.unwrap_or(0.0),
        filing_status,
    };
    check_finite_amounts(&[
        ("regularIncome", profile.regular_income),
        ("capitalGains", profile.capital_gains),
        ("socialSecurityBenefits", profile.social_security_benefits),
    ])?;
    Ok(profile)
}

fn simulate_args_from_payload(payload: SimulatePayload) -> Result<SimulateArgs, String> {
    let mut args = default_simulate_args();

    if let Some(v) = payload.starting_amount {
        args.starting_amount = v;
    }
    if let Some(v) = payload.spending {
        args.spending = v;
    }
    if let Some(v) = payload.deposit {
        args.deposit = v;
    }
    if let Some(v) = payload.deposit_policy {
        args.deposit_policy = v.into();
    }
    if let Some(v) = payload.years {
        args.years = v;
    }
    if let Some(v) = payload.stock_weight {
        args.stock_weight = v;
    }
    if let Some(v) = payload.num_simulations {
        args.simulations = v;
    }
    if let Some(v) = payload.seed {
        args.seed = v;
    }
    if let Some(v) = payload.withdrawal_filing_status.as_deref() {
        args.withdrawal_filing_status = match parse_filing_status(v)? {
            FilingStatus::Single => CliFilingStatus::Single,
            FilingStatus::Married => CliFilingStatus::Married,
        };
    }
    if let Some(v) = payload.withdrawal_capital_gains {
        args.withdrawal_capital_gains = v;
    }
    if let Some(v) = payload.withdrawal_social_security {
        args.withdrawal_social_security = v;
    }

    Ok(args)
}

fn default_simulate_args() -> SimulateArgs {
    SimulateArgs {
        starting_amount: 1_000_000.0,
        spending: 50_000.0,
        deposit: 0.0,
        deposit_policy: CliDepositPolicy::Ignored,
        years: 30,
        stock_weight: 0.5,
        simulations: 1_000,
        seed: DEFAULT_SEED,
        withdrawal_filing_status: CliFilingStatus::Single,
        withdrawal_capital_gains: 0.0,
        withdrawal_social_security: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simulate_args_from_json(json: &str) -> Result<SimulateArgs, String> {
        let payload = serde_json::from_str::<SimulatePayload>(json)
            .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
        simulate_args_from_payload(payload)
    }

    fn builtin_state() -> Arc<AppConfig> {
        Arc::new(AppConfig::builtin().expect("builtin config"))
    }

    #[test]
    fn cli_parses_simulate_subcommand() {
        let cli = Cli::try_parse_from([
            "retiretax",
            "simulate",
            "--spending",
            "42000",
            "--deposit-policy",
            "before-growth",
            "--withdrawal-filing-status",
            "married",
        ])
        .expect("parses");
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.spending, 42_000.0);
        assert_eq!(args.deposit_policy, CliDepositPolicy::BeforeGrowth);
        assert_eq!(args.withdrawal_filing_status, CliFilingStatus::Married);
        assert_eq!(args.years, 30);
    }

    #[test]
    fn cli_parses_global_config_paths_after_subcommand() {
        let cli = Cli::try_parse_from([
            "retiretax",
            "tax",
            "--regular-income",
            "60000",
            "--tax-config",
            "tables.json",
        ])
        .expect("parses");
        assert_eq!(cli.tax_config, Some(PathBuf::from("tables.json")));
        assert!(matches!(cli.command, Command::Tax(_)));
    }

    #[test]
    fn simulate_payload_overrides_defaults() {
        let args = simulate_args_from_json(
            r#"{
                "startingAmount": 750000,
                "spending": 30000,
                "years": 25,
                "stockWeight": 0.7,
                "simulations": 64,
                "seed": 9,
                "depositPolicy": "beforeGrowth",
                "deposit": 1000,
                "withdrawalFilingStatus": "married"
            }"#,
        )
        .expect("parses");
        let market = AppConfig::builtin().expect("builtin").market;
        let simulation = build_simulation_config(&args, market).expect("valid");

        assert_eq!(simulation.starting_amount, 750_000.0);
        assert_eq!(simulation.years, 25);
        assert_eq!(simulation.num_simulations, 64);
        assert_eq!(simulation.seed, 9);
        assert_eq!(simulation.deposit_policy, DepositPolicy::BeforeGrowth);
        assert_eq!(simulation.withdrawal_tax.filing_status, FilingStatus::Married);
    }

    #[test]
    fn empty_simulate_payload_uses_defaults() {
        let args = simulate_args_from_json("{}").expect("parses");
        let market = AppConfig::builtin().expect("builtin").market;
        let simulation = build_simulation_config(&args, market).expect("valid");
        assert_eq!(simulation.spending, 50_000.0);
        assert_eq!(simulation.deposit_policy, DepositPolicy::Ignored);
        assert_eq!(simulation.withdrawal_tax, WithdrawalTaxAssumption::default());
    }

    #[test]
    fn build_simulation_config_rejects_bad_inputs() {
        let market = AppConfig::builtin().expect("builtin").market;
        let mut args = default_simulate_args();
        args.stock_weight = 1.5;
        assert_eq!(
            build_simulation_config(&args, market).expect_err("weight"),
            "--stock-weight must be between 0 and 1"
        );

        let mut args = default_simulate_args();
        args.years = 0;
        assert_eq!(
            build_simulation_config(&args, market).expect_err("years"),
            "--years must be between 1 and 150"
        );

        let mut args = default_simulate_args();
        args.years = u32::MAX;
        args.simulations = u32::MAX;
        assert_eq!(
            build_simulation_config(&args, market).expect_err("horizon"),
            "--years must be between 1 and 150"
        );

        let mut args = default_simulate_args();
        args.simulations = MAX_SIMULATIONS + 1;
        assert_eq!(
            build_simulation_config(&args, market).expect_err("trials"),
            "--simulations must be between 1 and 100000"
        );

        let mut args = default_simulate_args();
        args.spending = -5.0;
        assert_eq!(
            build_simulation_config(&args, market).expect_err("spending"),
            "--spending must be >= 0"
        );
    }

    #[test]
    fn unknown_withdrawal_filing_status_is_rejected() {
        let err = simulate_args_from_json(r#"{"withdrawalFilingStatus": "joint"}"#)
            .expect_err("unknown status");
        assert_eq!(err, "invalid filing status: joint");
    }

    #[test]
    fn tax_payload_defaults_to_single_and_parses_status() {
        let payload: TaxPayload = serde_json::from_str(
            r#"{"regularIncome": 40000, "socialSecurityBenefits": 12000, "filingStatus": "married"}"#,
        )
        .expect("parses");
        let profile = tax_profile_from_payload(payload).expect("valid");
        assert_eq!(profile.filing_status, FilingStatus::Married);
        assert_eq!(profile.capital_gains, 0.0);

        let profile = tax_profile_from_payload(TaxPayload::default()).expect("valid");
        assert_eq!(profile.filing_status, FilingStatus::Single);
    }

    #[test]
    fn tax_response_serializes_flat_camel_case() {
        let config = AppConfig::builtin().expect("builtin");
        let response = compute_tax(
            &config,
            IncomeProfile {
                regular_income: 60_000.0,
                capital_gains: 0.0,
                social_security_benefits: 0.0,
                filing_status: FilingStatus::Single,
            },
        )
        .expect("taxes");
        let json = serde_json::to_value(&response).expect("serializes");
        assert_eq!(json["filingStatus"], "single");
        assert!(json["taxesOwed"].as_f64().expect("number") > 0.0);
        assert!(json["effectiveRate"].is_number());
    }

    #[test]
    fn simulate_response_reports_null_average_when_all_trials_fail() {
        let config = AppConfig::builtin().expect("builtin");
        let mut args = default_simulate_args();
        args.spending = 5_000_000.0;
        args.simulations = 20;
        let simulation = build_simulation_config(&args, config.market).expect("valid");
        let response = simulate(&config, &simulation).expect("runs");
        let json = serde_json::to_value(&response).expect("serializes");

        assert_eq!(json["failPercentage"], 100.0);
        assert!(json["averageEndingValue"].is_null());
        assert!(json["annualWithdrawal"].as_f64().expect("withdrawal") > 5_000_000.0);
        assert_eq!(json["numSimulations"], 20);
    }

    #[tokio::test]
    async fn tax_handler_rejects_unknown_filing_status() {
        let payload = TaxPayload {
            filing_status: Some("widowed".to_string()),
            ..TaxPayload::default()
        };
        let response = tax_handler_impl(&builtin_state(), payload);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn simulate_handler_runs_small_request() {
        let payload = SimulatePayload {
            num_simulations: Some(16),
            years: Some(10),
            ..SimulatePayload::default()
        };
        let response = simulate_handler_impl(builtin_state(), payload).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).expect("header"),
            "no-store"
        );
    }

    #[tokio::test]
    async fn simulate_handler_rejects_invalid_weight() {
        let payload = SimulatePayload {
            stock_weight: Some(-0.1),
            ..SimulatePayload::default()
        };
        let response = simulate_handler_impl(builtin_state(), payload).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_routes_get_a_json_not_found() {
        let response = not_found_handler().await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).expect("header"),
            "no-store"
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["error"], "Not found");
    }

    #[tokio::test]
    async fn oversized_simulation_request_is_rejected() {
        let payload: SimulatePayload =
            serde_json::from_str(r#"{"years": 4294967295, "simulations": 4294967295}"#)
                .expect("parses");
        let response = simulate_handler_impl(builtin_state(), payload).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn non_finite_tax_amounts_are_rejected() {
        let args = TaxArgs {
            regular_income: f64::NAN,
            capital_gains: 0.0,
            social_security: 0.0,
            filing_status: CliFilingStatus::Single,
        };
        assert_eq!(
            tax_profile_from_args(&args).expect_err("nan income"),
            "--regular-income must be a finite number"
        );

        let cli = Cli::try_parse_from(["retiretax", "tax", "--capital-gains", "inf"])
            .expect("clap accepts inf");
        let Command::Tax(args) = cli.command else {
            panic!("expected tax");
        };
        assert_eq!(
            tax_profile_from_args(&args).expect_err("infinite gains"),
            "--capital-gains must be a finite number"
        );

        let payload = TaxPayload {
            social_security_benefits: Some(f64::INFINITY),
            ..TaxPayload::default()
        };
        assert_eq!(
            tax_profile_from_payload(payload).expect_err("infinite benefits"),
            "socialSecurityBenefits must be a finite number"
        );
    }

    #[test]
    fn negative_tax_amounts_are_accepted() {
        let args = TaxArgs {
            regular_income: -1_000.0,
            capital_gains: 0.0,
            social_security: 0.0,
            filing_status: CliFilingStatus::Married,
        };
        let profile = tax_profile_from_args(&args).expect("negative is allowed");
        assert_eq!(profile.regular_income, -1_000.0);
    }
}
