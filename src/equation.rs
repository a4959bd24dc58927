use crate::schema::{AnalysisConfig, BalanceSheet, IncomeStatement};
use crate::utils::{format_amount, safe_percentage};
use log::warn;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Outcome of checking `Assets = Liabilities + Equity + (Revenue - Expenses)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PatrimonialValidation {
    pub assets: f64,
    pub liabilities: f64,
    pub equity: f64,
    pub revenue: f64,
    pub expenses: f64,
    /// Expenses minus revenue; positive when the period ran at a loss.
    pub expenses_minus_revenue: f64,
    /// The control side of the equation, always equal to `assets`.
    pub control: f64,
    /// Liabilities + equity + period result.
    pub liabilities_equity_result: f64,
    pub difference: f64,
    pub tolerance: f64,
    pub is_valid: bool,
    pub error_message: Option<String>,
}

pub struct EquationValidator {
    tolerance_floor: f64,
    tolerance_ratio: f64,
}

impl Default for EquationValidator {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl EquationValidator {
    pub fn new(tolerance_floor: f64, tolerance_ratio: f64) -> Self {
        Self {
            tolerance_floor,
            tolerance_ratio,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.tolerance_floor, config.tolerance_ratio)
    }

    /// Absolute floor plus a relative share of the larger side.
    pub fn tolerance_for(&self, assets: f64, liabilities_equity_result: f64) -> f64 {
        let scale = assets.abs().max(liabilities_equity_result.abs());
        self.tolerance_floor.max(self.tolerance_ratio * scale)
    }

    pub fn validate(&self, sheet: &BalanceSheet, income: &IncomeStatement) -> PatrimonialValidation {
        self.validate_totals(
            sheet.total_assets,
            sheet.total_liabilities,
            sheet.total_equity,
            income.revenue,
            income.total_expenses,
        )
    }

    pub fn validate_totals(
        &self,
        assets: f64,
        liabilities: f64,
        equity: f64,
        revenue: f64,
        expenses: f64,
    ) -> PatrimonialValidation {
        let result = revenue - expenses;
        let liabilities_equity_result = liabilities + equity + result;
        let difference = assets - liabilities_equity_result;
        let tolerance = self.tolerance_for(assets, liabilities_equity_result);
        let is_valid = difference.abs() <= tolerance;

        let error_message = if is_valid {
            None
        } else {
            let larger_side = assets.abs().max(liabilities_equity_result.abs());
            let message = format!(
                "Accounting equation does not balance. Difference: {} ({:.2}%). Assets ({}) != Liabilities + Equity + Result ({})",
                format_amount(difference.abs()),
                safe_percentage(difference.abs(), larger_side),
                format_amount(assets),
                format_amount(liabilities_equity_result)
            );
            warn!("{}", message);
            Some(message)
        };

        PatrimonialValidation {
            assets,
            liabilities,
            equity,
            revenue,
            expenses,
            expenses_minus_revenue: expenses - revenue,
            control: assets,
            liabilities_equity_result,
            difference,
            tolerance,
            is_valid,
            error_message,
        }
    }
}

pub fn validate_equation(sheet: &BalanceSheet, income: &IncomeStatement) -> PatrimonialValidation {
    EquationValidator::default().validate(sheet, income)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_books() {
        let validation =
            EquationValidator::default().validate_totals(1_000.0, 400.0, 500.0, 300.0, 200.0);

        assert!(validation.is_valid);
        assert_eq!(validation.difference, 0.0);
        assert_eq!(validation.control, 1_000.0);
        assert_eq!(validation.liabilities_equity_result, 1_000.0);
        assert_eq!(validation.expenses_minus_revenue, -100.0);
        assert!(validation.error_message.is_none());
    }

    #[test]
    fn test_tolerance_floor_for_small_books() {
        let validator = EquationValidator::default();

        assert_eq!(validator.tolerance_for(10.0, 10.5), 1.0);
        assert!(validator.validate_totals(10.0, 9.5, 0.0, 0.0, 0.0).is_valid);
        assert!(!validator.validate_totals(10.0, 8.5, 0.0, 0.0, 0.0).is_valid);
    }

    #[test]
    fn test_relative_tolerance_for_large_books() {
        let validator = EquationValidator::default();

        let tolerance = validator.tolerance_for(10_000_000.0, 9_995_000.0);
        assert!((tolerance - 10_000.0).abs() < 1e-6);

        assert!(validator
            .validate_totals(10_000_000.0, 5_000_000.0, 4_995_000.0, 0.0, 0.0)
            .is_valid);
        assert!(!validator
            .validate_totals(10_000_000.0, 5_000_000.0, 4_980_000.0, 0.0, 0.0)
            .is_valid);
    }

    #[test]
    fn test_failure_message_reports_difference_and_totals() {
        let validation =
            EquationValidator::default().validate_totals(230_000.0, 120_000.0, 110_000.0, 1_200_000.0, 720_000.0);

        assert!(!validation.is_valid);
        assert_eq!(validation.control, validation.assets);
        assert!((validation.liabilities_equity_result - 710_000.0).abs() < 1e-6);
        assert!((validation.difference + 480_000.0).abs() < 1e-6);
        assert_eq!(
            validation.difference,
            validation.control - validation.liabilities_equity_result
        );

        let message = validation.error_message.unwrap();
        assert!(message.contains("480,000.00"));
        assert!(message.contains("67.61%"));
        assert!(message.contains("230,000.00"));
        assert!(message.contains("710,000.00"));
    }

    #[test]
    fn test_custom_tolerance_from_config() {
        let config = AnalysisConfig {
            tolerance_floor: 100.0,
            ..AnalysisConfig::default()
        };
        let validator = EquationValidator::from_config(&config);
        assert!(validator.validate_totals(1_000.0, 950.0, 0.0, 0.0, 0.0).is_valid);
    }
}
