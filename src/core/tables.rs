use std::collections::BTreeMap;

use serde::Deserialize;

use super::error::{Error, Result};
use super::types::FilingStatus;

/// One marginal band. `upper_limit: None` means the band is unbounded above.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TaxBracket {
    pub lower_limit: f64,
    #[serde(default)]
    pub upper_limit: Option<f64>,
    #[serde(alias = "tax_rate")]
    pub rate: f64,
}

impl TaxBracket {
    pub const fn new(lower_limit: f64, upper_limit: f64, rate: f64) -> Self {
        Self {
            lower_limit,
            upper_limit: Some(upper_limit),
            rate,
        }
    }

    pub const fn unbounded(lower_limit: f64, rate: f64) -> Self {
        Self {
            lower_limit,
            upper_limit: None,
            rate,
        }
    }

    pub fn upper_bound(&self) -> f64 {
        self.upper_limit.unwrap_or(f64::INFINITY)
    }
}

/// Brackets that are ascending, contiguous and jointly cover `[0, inf)`.
#[derive(Debug, Clone, PartialEq)]
pub struct BracketTable {
    brackets: Vec<TaxBracket>,
}

impl BracketTable {
    pub fn new(table: &str, brackets: Vec<TaxBracket>) -> Result<Self> {
        check_brackets(&brackets).map_err(|reason| Error::InvalidBracketTable {
            table: table.to_string(),
            reason,
        })?;
        Ok(Self { brackets })
    }

    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }
}

fn check_brackets(brackets: &[TaxBracket]) -> std::result::Result<(), String> {
    let Some(first) = brackets.first() else {
        return Err("table has no brackets".to_string());
    };
    if first.lower_limit != 0.0 {
        return Err(format!(
            "first bracket must start at 0, starts at {}",
            first.lower_limit
        ));
    }

    for (idx, bracket) in brackets.iter().enumerate() {
        if !bracket.lower_limit.is_finite() {
            return Err(format!("bracket {idx} has a non-finite lower limit"));
        }
        if !bracket.rate.is_finite() || !(0.0..=1.0).contains(&bracket.rate) {
            return Err(format!("bracket {idx} rate must be between 0 and 1"));
        }
        let is_last = idx + 1 == brackets.len();
        match bracket.upper_limit {
            Some(upper) => {
                if !upper.is_finite() || upper <= bracket.lower_limit {
                    return Err(format!(
                        "bracket {idx} upper limit must be finite and above its lower limit"
                    ));
                }
                if is_last {
                    return Err("last bracket must be unbounded".to_string());
                }
                let next = brackets[idx + 1].lower_limit;
                if next != upper {
                    return Err(format!(
                        "bracket {} starts at {next} but bracket {idx} ends at {upper}",
                        idx + 1
                    ));
                }
            }
            None if !is_last => {
                return Err(format!("bracket {idx} is unbounded but is not the last"));
            }
            None => {}
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SocialSecurityThreshold {
    pub base_amount: f64,
    pub phaseout: f64,
}

/// Every per-filing-status table the federal calculation reads.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxTables {
    income_brackets: BTreeMap<FilingStatus, BracketTable>,
    capital_gains_brackets: BTreeMap<FilingStatus, BracketTable>,
    social_security: BTreeMap<FilingStatus, SocialSecurityThreshold>,
    standard_deduction: BTreeMap<FilingStatus, f64>,
}

impl TaxTables {
    pub fn new(
        income_brackets: BTreeMap<FilingStatus, BracketTable>,
        capital_gains_brackets: BTreeMap<FilingStatus, BracketTable>,
        social_security: BTreeMap<FilingStatus, SocialSecurityThreshold>,
        standard_deduction: BTreeMap<FilingStatus, f64>,
    ) -> Result<Self> {
        for (status, threshold) in &social_security {
            if !(threshold.base_amount >= 0.0 && threshold.phaseout >= 0.0) {
                return Err(Error::InvalidBracketTable {
                    table: format!("social_security/{status}"),
                    reason: "base_amount and phaseout must be >= 0".to_string(),
                });
            }
        }
        for (status, deduction) in &standard_deduction {
            if !deduction.is_finite() || *deduction < 0.0 {
                return Err(Error::InvalidBracketTable {
                    table: format!("standard_deduction/{status}"),
                    reason: "deduction must be >= 0".to_string(),
                });
            }
        }
        Ok(Self {
            income_brackets,
            capital_gains_brackets,
            social_security,
            standard_deduction,
        })
    }

    pub fn from_json_str(json: &str) -> crate::config::ConfigResult<Self> {
        let raw: RawTaxTables = serde_json::from_str(json)?;
        Ok(raw.into_tables()?)
    }

    pub fn income_brackets(&self, status: FilingStatus) -> Result<&BracketTable> {
        lookup(&self.income_brackets, status)
    }

    pub fn capital_gains_brackets(&self, status: FilingStatus) -> Result<&BracketTable> {
        lookup(&self.capital_gains_brackets, status)
    }

    pub fn social_security(&self, status: FilingStatus) -> Result<SocialSecurityThreshold> {
        lookup(&self.social_security, status).copied()
    }

    pub fn standard_deduction(&self, status: FilingStatus) -> Result<f64> {
        lookup(&self.standard_deduction, status).copied()
    }
}

fn lookup<V>(map: &BTreeMap<FilingStatus, V>, status: FilingStatus) -> Result<&V> {
    map.get(&status)
        .ok_or_else(|| Error::InvalidFilingStatus(status.to_string()))
}

#[derive(Debug, Deserialize)]
struct RawTaxTables {
    income_brackets: BTreeMap<String, Vec<TaxBracket>>,
    capital_gains_brackets: BTreeMap<String, Vec<TaxBracket>>,
    social_security: BTreeMap<String, SocialSecurityThreshold>,
    standard_deduction: BTreeMap<String, f64>,
}

impl RawTaxTables {
    fn into_tables(self) -> Result<TaxTables> {
        TaxTables::new(
            bracket_map("income", self.income_brackets)?,
            bracket_map("capital_gains", self.capital_gains_brackets)?,
            keyed_by_status(self.social_security)?,
            keyed_by_status(self.standard_deduction)?,
        )
    }
}

fn bracket_map(
    kind: &str,
    raw: BTreeMap<String, Vec<TaxBracket>>,
) -> Result<BTreeMap<FilingStatus, BracketTable>> {
    let mut tables = BTreeMap::new();
    for (key, brackets) in raw {
        let status: FilingStatus = key.parse()?;
        let table = BracketTable::new(&format!("{kind}/{status}"), brackets)?;
        tables.insert(status, table);
    }
    Ok(tables)
}

fn keyed_by_status<V>(raw: BTreeMap<String, V>) -> Result<BTreeMap<FilingStatus, V>> {
    raw.into_iter()
        .map(|(key, value)| Ok((key.parse::<FilingStatus>()?, value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_band() -> Vec<TaxBracket> {
        vec![
            TaxBracket::new(0.0, 10_000.0, 0.1),
            TaxBracket::new(10_000.0, 20_000.0, 0.2),
            TaxBracket::unbounded(20_000.0, 0.3),
        ]
    }

    fn reason_of(result: Result<BracketTable>) -> String {
        match result {
            Err(Error::InvalidBracketTable { reason, .. }) => reason,
            other => panic!("expected InvalidBracketTable, got {other:?}"),
        }
    }

    #[test]
    fn accepts_contiguous_covering_table() {
        let table = BracketTable::new("test", three_band()).expect("valid table");
        assert_eq!(table.brackets().len(), 3);
        assert_eq!(table.brackets()[2].upper_bound(), f64::INFINITY);
    }

    #[test]
    fn rejects_empty_table() {
        assert!(reason_of(BracketTable::new("test", Vec::new())).contains("no brackets"));
    }

    #[test]
    fn rejects_gap_between_brackets() {
        let mut brackets = three_band();
        brackets[1].lower_limit = 11_000.0;
        assert!(reason_of(BracketTable::new("test", brackets)).contains("starts at 11000"));
    }

    #[test]
    fn rejects_table_not_starting_at_zero() {
        let mut brackets = three_band();
        brackets[0].lower_limit = 500.0;
        assert!(reason_of(BracketTable::new("test", brackets)).contains("must start at 0"));
    }

    #[test]
    fn rejects_bounded_last_bracket() {
        let mut brackets = three_band();
        brackets[2].upper_limit = Some(1_000_000.0);
        assert!(reason_of(BracketTable::new("test", brackets)).contains("unbounded"));
    }

    #[test]
    fn rejects_unbounded_middle_bracket() {
        let mut brackets = three_band();
        brackets[1].upper_limit = None;
        assert!(reason_of(BracketTable::new("test", brackets)).contains("not the last"));
    }

    #[test]
    fn rejects_rate_out_of_range() {
        let mut brackets = three_band();
        brackets[0].rate = 1.5;
        assert!(reason_of(BracketTable::new("test", brackets)).contains("rate"));
    }

    #[test]
    fn json_tables_parse_with_null_upper_limit_and_tax_rate_alias() {
        let json = r#"{
            "income_brackets": {
                "single": [
                    {"lower_limit": 0, "upper_limit": 100, "rate": 0.1},
                    {"lower_limit": 100, "upper_limit": null, "rate": 0.2}
                ]
            },
            "capital_gains_brackets": {
                "single": [{"lower_limit": 0, "tax_rate": 0.15}]
            },
            "social_security": {"single": {"base_amount": 25000, "phaseout": 9000}},
            "standard_deduction": {"single": 12775}
        }"#;
        let tables = TaxTables::from_json_str(json).expect("tables parse");
        assert_eq!(
            tables
                .capital_gains_brackets(FilingStatus::Single)
                .expect("single table")
                .brackets()[0]
                .rate,
            0.15
        );
        assert_eq!(
            tables.standard_deduction(FilingStatus::Single).expect("deduction"),
            12_775.0
        );
        assert_eq!(
            tables.income_brackets(FilingStatus::Married),
            Err(Error::InvalidFilingStatus("married".to_string()))
        );
    }

    #[test]
    fn json_tables_reject_unknown_status_key() {
        let json = r#"{
            "income_brackets": {"widowed": [{"lower_limit": 0, "rate": 0.1}]},
            "capital_gains_brackets": {},
            "social_security": {},
            "standard_deduction": {}
        }"#;
        let err = TaxTables::from_json_str(json).expect_err("unknown status");
        assert!(err.to_string().contains("widowed"), "got {err}");
    }

    #[test]
    fn rejects_negative_social_security_threshold() {
        let mut social_security = BTreeMap::new();
        social_security.insert(
            FilingStatus::Single,
            SocialSecurityThreshold {
                base_amount: -1.0,
                phaseout: 9_000.0,
            },
        );
        let err = TaxTables::new(
            BTreeMap::new(),
            BTreeMap::new(),
            social_security,
            BTreeMap::new(),
        )
        .expect_err("negative base");
        assert!(matches!(err, Error::InvalidBracketTable { .. }));
    }
}
