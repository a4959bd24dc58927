use crate::error::{AnalysisError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One line of an imported trial balance, exactly as the import step produced it.
///
/// Field names are not normalized: the same concept may arrive as `Saldo`, `saldo`
/// or `Balance` depending on the accounting package that exported the file. Values
/// may be JSON numbers or locale-formatted strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RawRow(pub BTreeMap<String, Value>);

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy when assembling rows by hand.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, Value>> for RawRow {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl From<serde_json::Map<String, Value>> for RawRow {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        Self(map.into_iter().collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum Category {
    #[schemars(description = "Cash on hand, bank balances and immediately available deposits (current asset)")]
    Cash,

    #[schemars(description = "Trade receivables, reinsurance and intermediary balances (current asset)")]
    Receivables,

    #[schemars(description = "Merchandise and stock held for sale (current asset)")]
    Inventory,

    #[schemars(description = "Any other current asset, including prepaid items and short-term investments")]
    OtherCurrentAsset,

    #[schemars(description = "Property, plant, equipment and vehicles (non-current asset)")]
    FixedAsset,

    #[schemars(description = "Patents, trademarks, software and licences (non-current asset)")]
    IntangibleAsset,

    #[schemars(description = "Amounts owed to suppliers (current liability)")]
    AccountsPayable,

    #[schemars(description = "Loans and overdrafts due within a year (current liability)")]
    ShortTermDebt,

    #[schemars(description = "Payroll, taxes, commissions and other accrued obligations (current liability)")]
    OtherCurrentLiability,

    #[schemars(description = "Long-term loans, mortgages, provisions and technical reserves (non-current liability)")]
    LongTermDebt,

    #[schemars(description = "Share capital, legal reserves and surplus")]
    Equity,

    #[schemars(description = "Accumulated and current-period results")]
    RetainedEarnings,

    #[schemars(description = "Sales, service income and written premiums")]
    Revenue,

    #[schemars(description = "Cost of goods sold and incurred claims")]
    CostOfSales,

    #[schemars(description = "Interest and other financing costs")]
    FinancialExpense,

    #[schemars(description = "Administrative, selling and other operating expenses")]
    OperatingExpense,

    #[schemars(description = "No rule recognized the row; excluded from every aggregate")]
    Unclassified,
}

impl Category {
    /// Rule evaluation order. Specific categories come before the broad ones that
    /// would otherwise swallow them.
    pub const EVALUATION_ORDER: [Category; 16] = [
        Category::Cash,
        Category::Receivables,
        Category::Inventory,
        Category::OtherCurrentAsset,
        Category::FixedAsset,
        Category::IntangibleAsset,
        Category::AccountsPayable,
        Category::ShortTermDebt,
        Category::OtherCurrentLiability,
        Category::LongTermDebt,
        Category::RetainedEarnings,
        Category::Equity,
        Category::Revenue,
        Category::CostOfSales,
        Category::FinancialExpense,
        Category::OperatingExpense,
    ];

    /// Liabilities and equity are stored with a credit (negative) sign in most ledgers.
    pub fn is_credit_balance(&self) -> bool {
        matches!(
            self,
            Category::AccountsPayable
                | Category::ShortTermDebt
                | Category::OtherCurrentLiability
                | Category::LongTermDebt
                | Category::Equity
                | Category::RetainedEarnings
        )
    }

    /// Whether `value` carries the sign opposite to the account's nature.
    /// Fixed and intangible assets hold contra accounts, and revenue keeps
    /// whatever sign the export used, so neither is judged.
    pub fn has_unexpected_sign(&self, value: f64) -> bool {
        match self {
            Category::Cash
            | Category::Receivables
            | Category::Inventory
            | Category::OtherCurrentAsset
            | Category::CostOfSales
            | Category::FinancialExpense
            | Category::OperatingExpense => value < 0.0,
            category if category.is_credit_balance() => value > 0.0,
            _ => false,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Cash => "Cash",
            Category::Receivables => "Receivables",
            Category::Inventory => "Inventory",
            Category::OtherCurrentAsset => "Other Current Assets",
            Category::FixedAsset => "Fixed Assets",
            Category::IntangibleAsset => "Intangible Assets",
            Category::AccountsPayable => "Accounts Payable",
            Category::ShortTermDebt => "Short-Term Debt",
            Category::OtherCurrentLiability => "Other Current Liabilities",
            Category::LongTermDebt => "Long-Term Debt",
            Category::Equity => "Equity",
            Category::RetainedEarnings => "Retained Earnings",
            Category::Revenue => "Revenue",
            Category::CostOfSales => "Cost of Sales",
            Category::FinancialExpense => "Financial Expenses",
            Category::OperatingExpense => "Operating Expenses",
            Category::Unclassified => "Unclassified",
        }
    }
}

/// Which kind of evidence produced a classification. Code evidence is the most
/// reliable, free-text mining the least.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum MatchTier {
    #[schemars(description = "Matched on the structured account code")]
    Code,

    #[schemars(description = "Matched on keywords of the account description")]
    Keyword,

    #[schemars(description = "Recovered by scanning the row's free text; lowest confidence")]
    TextPattern,
}

/// A raw row after value extraction and classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClassifiedRow {
    pub code: Option<String>,
    pub description: Option<String>,
    pub value: f64,
    pub category: Category,
    pub tier: Option<MatchTier>,
    /// Report header lines printed by accounting packages (user, page, date stamps).
    #[serde(default)]
    pub header_noise: bool,
}

impl ClassifiedRow {
    /// Human-facing name: the description, falling back to the code.
    pub fn label(&self) -> String {
        self.description
            .clone()
            .or_else(|| self.code.clone())
            .unwrap_or_else(|| "(unnamed row)".to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BalanceSheet {
    pub cash: f64,
    pub receivables: f64,
    pub inventory: f64,
    pub other_current_assets: f64,
    pub current_assets: f64,
    pub fixed_assets: f64,
    pub intangible_assets: f64,
    pub non_current_assets: f64,
    pub total_assets: f64,

    pub accounts_payable: f64,
    pub short_term_debt: f64,
    pub other_current_liabilities: f64,
    pub current_liabilities: f64,
    pub long_term_debt: f64,
    pub total_liabilities: f64,

    pub equity: f64,
    pub retained_earnings: f64,
    pub total_equity: f64,

    /// Only present for insurers.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub technical_reserves: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IncomeStatement {
    pub revenue: f64,
    pub cost_of_goods_sold: f64,
    pub gross_profit: f64,
    pub operating_expenses: f64,
    pub operating_income: f64,
    pub interest_expense: f64,
    pub total_expenses: f64,
    pub net_income: f64,

    /// Only present for insurers.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub written_premiums: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CashFlowEntry {
    pub label: String,
    pub code: Option<String>,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CashFlowClassification {
    pub operating: Vec<CashFlowEntry>,
    pub investing: Vec<CashFlowEntry>,
    pub financing: Vec<CashFlowEntry>,
}

/// Sums in ascending value order so the total does not depend on row order.
fn ordered_total(entries: &[CashFlowEntry]) -> f64 {
    let mut values: Vec<f64> = entries.iter().map(|e| e.value).collect();
    values.sort_by(f64::total_cmp);
    values.into_iter().sum()
}

impl CashFlowClassification {
    pub fn operating_total(&self) -> f64 {
        ordered_total(&self.operating)
    }

    pub fn investing_total(&self) -> f64 {
        ordered_total(&self.investing)
    }

    pub fn financing_total(&self) -> f64 {
        ordered_total(&self.financing)
    }

    pub fn net_total(&self) -> f64 {
        self.operating_total() + self.investing_total() + self.financing_total()
    }

    pub fn len(&self) -> usize {
        self.operating.len() + self.investing.len() + self.financing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FinancialStatements {
    pub balance_sheet: BalanceSheet,
    pub income_statement: IncomeStatement,
    pub cash_flow: CashFlowClassification,
}

/// Counts describing how much of the input the engine could actually use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DataQualityReport {
    pub total_rows: usize,
    pub valued_rows: usize,
    pub zero_value_rows: usize,
    pub header_noise_rows: usize,
    pub rows_missing_identity: usize,
    pub text_pattern_rows: usize,
    pub unclassified_rows: usize,
    pub unclassified_labels: Vec<String>,
    /// Distinct account codes that appear on more than one row.
    pub duplicate_codes: usize,
    /// Rows with a populated amount cell that could not be read as a number.
    pub unparsable_amount_rows: usize,
    /// Classified rows whose sign contradicts the account's nature.
    pub unexpected_sign_rows: usize,
    /// Rows whose absolute value exceeds [`EXTREME_VALUE_THRESHOLD`].
    pub extreme_value_rows: usize,
}

/// Amounts beyond this magnitude are almost always unit or parsing mistakes.
pub const EXTREME_VALUE_THRESHOLD: f64 = 1e12;

impl DataQualityReport {
    /// Share of valued rows that landed in a statement category, in percent.
    pub fn coverage(&self) -> f64 {
        if self.valued_rows == 0 {
            return 0.0;
        }
        let classified = self.valued_rows.saturating_sub(self.unclassified_rows);
        classified as f64 / self.valued_rows as f64 * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AnalysisConfig {
    #[schemars(description = "Absolute floor of the accounting-equation tolerance, in currency units")]
    pub tolerance_floor: f64,

    #[schemars(description = "Relative tolerance applied to the larger side of the accounting equation")]
    pub tolerance_ratio: f64,

    #[schemars(description = "Scan free text for account codes and keywords when structured fields fail")]
    pub text_pattern_fallback: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            tolerance_floor: 1.0,
            tolerance_ratio: 0.001,
            text_pattern_fallback: true,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance_floor.is_finite() || self.tolerance_floor < 0.0 {
            return Err(AnalysisError::InvalidConfig {
                field: "tolerance_floor".to_string(),
                details: format!(
                    "must be a finite, non-negative amount (got {})",
                    self.tolerance_floor
                ),
            });
        }

        if !self.tolerance_ratio.is_finite() || !(0.0..1.0).contains(&self.tolerance_ratio) {
            return Err(AnalysisError::InvalidConfig {
                field: "tolerance_ratio".to_string(),
                details: format!(
                    "must be within [0.0, 1.0) (got {})",
                    self.tolerance_ratio
                ),
            });
        }

        Ok(())
    }
}
