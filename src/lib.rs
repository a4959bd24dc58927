//! # Ledger Insights
//!
//! A library for turning the raw rows of an imported trial balance into
//! classified financial statements, ratios and analyst-style insights.
//!
//! ## Core Concepts
//!
//! - **Raw Rows**: Loosely-keyed records straight from a spreadsheet or accounting export
//! - **Value Extraction**: One signed amount per row, from whichever balance columns are populated
//! - **Classification**: Account codes and descriptions mapped onto a fixed set of categories,
//!   across dashed, dotted and flat chart-of-accounts conventions
//! - **Statements**: Balance sheet, income statement and a coarse cash-flow split
//! - **Accounting Equation**: `Assets = Liabilities + Equity + (Revenue - Expenses)` within tolerance
//! - **Insights**: Ratio-driven alerts, recommendations and an executive summary
//!
//! ## Example
//!
//! ```rust,ignore
//! use ledger_insights::*;
//! use serde_json::json;
//!
//! let rows = vec![
//!     RawRow::from_iter([("Codigo", json!("1101")), ("Descripcion", json!("Caja")), ("SaldoActual", json!(50000))]),
//!     RawRow::from_iter([("Codigo", json!("2101")), ("Descripcion", json!("Proveedores")), ("SaldoActual", json!(-20000))]),
//!     RawRow::from_iter([("Codigo", json!("3101")), ("Descripcion", json!("Capital social")), ("SaldoActual", json!(-30000))]),
//! ];
//!
//! let analysis = analyze(&rows).unwrap();
//! println!("{}", analysis.insights.executive_summary);
//! ```

pub mod aggregator;
pub mod cache;
pub mod chart_of_accounts;
pub mod classifier;
pub mod equation;
pub mod error;
pub mod ingestion;
pub mod insights;
pub mod ratios;
pub mod schema;
pub mod utils;

pub use aggregator::{Aggregation, InsuranceFigures, StatementAggregator};
pub use cache::{AnalysisCache, CacheStats};
pub use chart_of_accounts::{AccountEntry, ChartOfAccounts, CodeFamily};
pub use classifier::{AccountClassifier, Classification};
pub use equation::{validate_equation, EquationValidator, PatrimonialValidation};
pub use error::{AnalysisError, Result};
pub use ingestion::{extract_code, extract_description, extract_value, parse_amount};
pub use insights::*;
pub use ratios::*;
pub use schema::*;
pub use utils::*;

use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Everything one run over a trial balance produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Analysis {
    #[schemars(description = "Balance sheet, income statement and cash-flow split")]
    pub statements: FinancialStatements,

    #[schemars(description = "Ratios, equation check, alerts, recommendations and executive summary")]
    pub insights: Insights,

    #[schemars(description = "Valued accounts grouped by statement section, with match confidence")]
    pub chart: ChartOfAccounts,

    #[schemars(description = "How much of the input could be used")]
    pub data_quality: DataQualityReport,
}

impl Analysis {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(Analysis)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub struct FinancialAnalyzer {
    config: AnalysisConfig,
    classifier: AccountClassifier,
}

impl FinancialAnalyzer {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let classifier = AccountClassifier::from_config(&config);
        Ok(Self { config, classifier })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn analyze(&self, rows: &[RawRow]) -> Result<Analysis> {
        if rows.is_empty() {
            return Err(AnalysisError::NoData);
        }

        info!("Analyzing trial balance with {} rows", rows.len());

        let aggregation = StatementAggregator::new(&self.classifier).aggregate(rows);
        let statements = aggregation.statements;

        debug!(
            "Totals: assets {:.2}, liabilities {:.2}, equity {:.2}, revenue {:.2}, expenses {:.2}",
            statements.balance_sheet.total_assets,
            statements.balance_sheet.total_liabilities,
            statements.balance_sheet.total_equity,
            statements.income_statement.revenue,
            statements.income_statement.total_expenses
        );

        let ratios = compute_ratios(&statements);
        let validation = EquationValidator::from_config(&self.config)
            .validate(&statements.balance_sheet, &statements.income_statement);

        let insurer = statements.balance_sheet.technical_reserves.is_some()
            || statements.income_statement.written_premiums.is_some();
        let profile = detect_company_profile(&aggregation.rows, insurer);

        let insights = InsightGenerator::generate(&ratios, &validation, profile);

        debug!(
            "Generated {} alerts and {} recommendations",
            insights.alerts.len(),
            insights.recommendations.len()
        );

        Ok(Analysis {
            chart: ChartOfAccounts::from_classified_rows(&aggregation.rows),
            statements,
            insights,
            data_quality: aggregation.data_quality,
        })
    }

    /// Returns a memoized analysis when the same rows and configuration were
    /// analyzed within the cache's time-to-live.
    pub fn analyze_cached(&self, rows: &[RawRow], cache: &mut AnalysisCache) -> Result<Analysis> {
        let key = AnalysisCache::content_hash(rows, &self.config)?;

        if let Some(analysis) = cache.get(&key) {
            info!("Serving analysis from cache ({})", &key[..12]);
            return Ok(analysis);
        }

        let analysis = self.analyze(rows)?;
        cache.insert(key, analysis.clone());
        Ok(analysis)
    }

    /// Analyzes each batch independently, in order. Fails on the first empty batch.
    pub fn analyze_batches(&self, batches: &[Vec<RawRow>]) -> Result<Vec<Analysis>> {
        batches.iter().map(|rows| self.analyze(rows)).collect()
    }
}

impl Default for FinancialAnalyzer {
    fn default() -> Self {
        let config = AnalysisConfig::default();
        Self {
            classifier: AccountClassifier::from_config(&config),
            config,
        }
    }
}

pub fn analyze(rows: &[RawRow]) -> Result<Analysis> {
    FinancialAnalyzer::default().analyze(rows)
}

pub fn analyze_with_config(rows: &[RawRow], config: AnalysisConfig) -> Result<Analysis> {
    FinancialAnalyzer::new(config)?.analyze(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn retail_rows() -> Vec<RawRow> {
        vec![
            RawRow::from_iter([("Codigo", json!("201-01-001")), ("Descripcion", json!("Caja")), ("SaldoActual", json!(50_000.0))]),
            RawRow::from_iter([("Codigo", json!("201-02-001")), ("Descripcion", json!("Clientes")), ("SaldoActual", json!(180_000.0))]),
            RawRow::from_iter([("Codigo", json!("301-01-001")), ("Descripcion", json!("Proveedores")), ("SaldoActual", json!(-120_000.0))]),
            RawRow::from_iter([("Codigo", json!("401-01-001")), ("Descripcion", json!("Capital social")), ("SaldoActual", json!(-110_000.0))]),
            RawRow::from_iter([("Codigo", json!("4-01-001")), ("Descripcion", json!("Ventas")), ("SaldoActual", json!(1_200_000.0))]),
            RawRow::from_iter([("Codigo", json!("501-01-001")), ("Descripcion", json!("Costo de ventas")), ("SaldoActual", json!(720_000.0))]),
        ]
    }

    #[test]
    fn test_end_to_end_analysis() {
        let analysis = analyze(&retail_rows()).unwrap();
        let sheet = &analysis.statements.balance_sheet;

        assert_eq!(sheet.current_assets, 230_000.0);
        assert_eq!(sheet.total_liabilities, 120_000.0);
        assert_eq!(sheet.total_equity, 110_000.0);
        assert_eq!(analysis.statements.income_statement.gross_profit, 480_000.0);
        assert!(!analysis.insights.validation.is_valid);
        assert_eq!(analysis.data_quality.total_rows, 6);
        assert_eq!(analysis.chart.total_accounts(), 6);
        assert_eq!(analysis.insights.company_profile, CompanyProfile::Commercial);
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let result = analyze(&[]);
        assert!(matches!(result, Err(AnalysisError::NoData)));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = AnalysisConfig {
            tolerance_ratio: 1.5,
            ..AnalysisConfig::default()
        };

        match FinancialAnalyzer::new(config) {
            Err(AnalysisError::InvalidConfig { field, .. }) => assert_eq!(field, "tolerance_ratio"),
            other => panic!("expected InvalidConfig, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_analyze_cached_reuses_result() {
        let analyzer = FinancialAnalyzer::default();
        let mut cache = AnalysisCache::default();
        let rows = retail_rows();

        let first = analyzer.analyze_cached(&rows, &mut cache).unwrap();
        let second = analyzer.analyze_cached(&rows, &mut cache).unwrap();

        assert_eq!(first, second);
        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_batches_are_independent() {
        let analyzer = FinancialAnalyzer::default();
        let small = vec![RawRow::from_iter([("Codigo", json!("1101")), ("SaldoActual", json!(10.0))])];

        let results = analyzer
            .analyze_batches(&[retail_rows(), small])
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].statements.balance_sheet.current_assets, 230_000.0);
        assert_eq!(results[1].statements.balance_sheet.current_assets, 10.0);

        assert!(analyzer.analyze_batches(&[retail_rows(), vec![]]).is_err());
    }

    #[test]
    fn test_schema_generation() {
        let schema_json = Analysis::schema_as_json().unwrap();
        assert!(schema_json.contains("statements"));
        assert!(schema_json.contains("executive_summary"));
        assert!(schema_json.contains("data_quality"));
    }
}
