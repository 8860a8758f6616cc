use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::core::{Error as CoreError, MarketParams, TaxTables};

const DEFAULT_TAX_TABLES: &str = include_str!("../configs/tax_tables.json");
const DEFAULT_MARKET_RETURNS: &str = include_str!("../configs/market_returns.json");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] CoreError),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Tax tables and market assumptions, loaded once and shared by reference.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub tax: TaxTables,
    pub market: MarketParams,
}

impl AppConfig {
    /// The tables and market assumptions bundled with the crate.
    pub fn builtin() -> ConfigResult<Self> {
        Ok(Self {
            tax: TaxTables::from_json_str(DEFAULT_TAX_TABLES)?,
            market: market_params_from_json(DEFAULT_MARKET_RETURNS)?,
        })
    }

    /// Builtin config with either file replaced by the one at the given path.
    pub fn load(tax_path: Option<&Path>, market_path: Option<&Path>) -> ConfigResult<Self> {
        let tax = match tax_path {
            Some(path) => {
                let tables = TaxTables::from_json_str(&read(path)?)?;
                info!(path = %path.display(), "loaded tax tables");
                tables
            }
            None => TaxTables::from_json_str(DEFAULT_TAX_TABLES)?,
        };
        let market = match market_path {
            Some(path) => {
                let market = market_params_from_json(&read(path)?)?;
                info!(path = %path.display(), "loaded market parameters");
                market
            }
            None => market_params_from_json(DEFAULT_MARKET_RETURNS)?,
        };
        Ok(Self { tax, market })
    }
}

pub fn market_params_from_json(json: &str) -> ConfigResult<MarketParams> {
    let params: MarketParams = serde_json::from_str(json)?;
    params.validate()?;
    Ok(params)
}

fn read(path: &Path) -> ConfigResult<String> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
