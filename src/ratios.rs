use crate::schema::{BalanceSheet, FinancialStatements, IncomeStatement};
use crate::utils::{safe_percentage, safe_ratio};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LiquidityRatios {
    pub current_ratio: f64,
    pub quick_ratio: f64,
    pub cash_ratio: f64,
}

/// Margins and returns, all in percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProfitabilityRatios {
    pub gross_margin: f64,
    pub net_margin: f64,
    pub roa: f64,
    pub roe: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LeverageRatios {
    /// Percent of assets financed by liabilities.
    pub total_debt: f64,
    /// Percent.
    pub debt_to_equity: f64,
    /// Times covered.
    pub interest_coverage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActivityRatios {
    pub asset_turnover: f64,
    pub inventory_turnover: f64,
    pub receivables_turnover: f64,
}

/// Insurer-only ratios, all in percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InsuranceRatios {
    pub solvency: f64,
    pub technical_coverage: f64,
    pub reserve_ratio: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FinancialRatios {
    pub liquidity: LiquidityRatios,
    pub profitability: ProfitabilityRatios,
    pub leverage: LeverageRatios,
    pub activity: ActivityRatios,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub insurance: Option<InsuranceRatios>,
}

impl FinancialRatios {
    pub fn compute(sheet: &BalanceSheet, income: &IncomeStatement) -> Self {
        let liquidity = LiquidityRatios {
            current_ratio: safe_ratio(sheet.current_assets, sheet.current_liabilities),
            quick_ratio: safe_ratio(
                sheet.current_assets - sheet.inventory,
                sheet.current_liabilities,
            ),
            cash_ratio: safe_ratio(sheet.cash, sheet.current_liabilities),
        };

        let profitability = ProfitabilityRatios {
            gross_margin: safe_percentage(
                income.revenue - income.cost_of_goods_sold,
                income.revenue,
            ),
            net_margin: safe_percentage(income.net_income, income.revenue),
            roa: safe_percentage(income.net_income, sheet.total_assets),
            roe: safe_percentage(income.net_income, sheet.total_equity),
        };

        let leverage = LeverageRatios {
            total_debt: safe_percentage(sheet.total_liabilities, sheet.total_assets),
            debt_to_equity: safe_percentage(sheet.total_liabilities, sheet.total_equity),
            interest_coverage: safe_ratio(income.operating_income, income.interest_expense),
        };

        let activity = ActivityRatios {
            asset_turnover: safe_ratio(income.revenue, sheet.total_assets),
            inventory_turnover: safe_ratio(income.cost_of_goods_sold, sheet.inventory),
            receivables_turnover: safe_ratio(income.revenue, sheet.receivables),
        };

        Self {
            liquidity,
            profitability,
            leverage,
            activity,
            insurance: insurance_ratios(sheet, income),
        }
    }
}

fn insurance_ratios(sheet: &BalanceSheet, income: &IncomeStatement) -> Option<InsuranceRatios> {
    if sheet.technical_reserves.is_none() && income.written_premiums.is_none() {
        return None;
    }

    let reserves = sheet.technical_reserves.unwrap_or(0.0);
    let premiums = income.written_premiums.unwrap_or(0.0);

    Some(InsuranceRatios {
        solvency: safe_percentage(sheet.total_equity, reserves),
        technical_coverage: safe_percentage(sheet.total_assets, reserves),
        reserve_ratio: safe_percentage(reserves, premiums),
    })
}

pub fn compute_ratios(statements: &FinancialStatements) -> FinancialRatios {
    FinancialRatios::compute(&statements.balance_sheet, &statements.income_statement)
}
