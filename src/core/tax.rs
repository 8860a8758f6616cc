use super::error::Result;
use super::tables::{SocialSecurityThreshold, TaxBracket, TaxTables};
use super::types::{IncomeProfile, TaxResult};

const SS_LOWER_TIER_RATE: f64 = 0.5;
const SS_UPPER_TIER_RATE: f64 = 0.85;

/// Marginal liability of `income` under `brackets`.
///
/// Each band is closed at its upper limit: scanning stops at the first band
/// whose upper limit is not exceeded. Income at or below zero owes nothing.
pub fn bracket_liability(income: f64, brackets: &[TaxBracket]) -> f64 {
    let mut liability = 0.0;
    for bracket in brackets {
        if income <= bracket.lower_limit {
            break;
        }
        let upper = bracket.upper_bound();
        liability += (income.min(upper) - bracket.lower_limit) * bracket.rate;
        if income <= upper {
            break;
        }
    }
    liability
}

/// Portion of Social Security benefits that is taxable, where
/// `combined_income` is AGI plus half the benefits.
pub fn taxable_social_security(
    combined_income: f64,
    threshold: SocialSecurityThreshold,
    benefits: f64,
) -> f64 {
    let SocialSecurityThreshold {
        base_amount,
        phaseout,
    } = threshold;

    if combined_income < base_amount {
        return 0.0;
    }
    let taxable = if combined_income < base_amount + phaseout {
        (combined_income - base_amount) * SS_LOWER_TIER_RATE
    } else {
        phaseout * SS_LOWER_TIER_RATE
            + (combined_income - base_amount - phaseout) * SS_UPPER_TIER_RATE
    };
    taxable.min(SS_UPPER_TIER_RATE * benefits)
}

/// Liability on long-term gains stacked on top of `taxable_ordinary_income`.
pub fn capital_gains_liability(
    taxable_ordinary_income: f64,
    gains: f64,
    brackets: &[TaxBracket],
) -> f64 {
    if gains <= 0.0 {
        return 0.0;
    }

    let mut liability = 0.0;
    for bracket in brackets {
        let upper = bracket.upper_bound() - taxable_ordinary_income;
        let lower = (bracket.lower_limit - taxable_ordinary_income).max(0.0);
        if upper < 0.0 {
            continue;
        }
        if gains > upper {
            liability += (upper - lower) * bracket.rate;
        } else {
            if gains > lower {
                liability += (gains - lower) * bracket.rate;
            }
            break;
        }
    }
    liability
}

/// Federal liability for a retiree, reading every threshold from `tables`.
#[derive(Debug, Clone, Copy)]
pub struct FederalTaxCalculator<'a> {
    tables: &'a TaxTables,
}

impl<'a> FederalTaxCalculator<'a> {
    pub fn new(tables: &'a TaxTables) -> Self {
        Self { tables }
    }

    pub fn compute(&self, profile: &IncomeProfile) -> Result<TaxResult> {
        let status = profile.filing_status;
        let income_brackets = self.tables.income_brackets(status)?;
        let gains_brackets = self.tables.capital_gains_brackets(status)?;
        let threshold = self.tables.social_security(status)?;
        let deduction = self.tables.standard_deduction(status)?;

        let agi = profile.regular_income + profile.capital_gains;
        let combined_income = agi + profile.social_security_benefits / 2.0;
        let taxable_ss =
            taxable_social_security(combined_income, threshold, profile.social_security_benefits);
        let taxable_income = (profile.regular_income + taxable_ss - deduction).max(0.0);

        let ordinary = bracket_liability(taxable_income, income_brackets.brackets());
        let gains = capital_gains_liability(
            taxable_income,
            profile.capital_gains,
            gains_brackets.brackets(),
        );
        let taxes_owed = (ordinary + gains).max(0.0);

        let gross_income = profile.gross_income();
        let effective_rate = if gross_income > 0.0 {
            taxes_owed / gross_income
        } else {
            0.0
        };

        Ok(TaxResult {
            taxes_owed,
            effective_rate,
        })
    }
}
