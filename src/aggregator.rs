use crate::chart_of_accounts::{
    code_has_prefix, is_technical_reserve_code, is_written_premium_code, CodeFamily,
};
use crate::classifier::AccountClassifier;
use crate::ingestion::has_unparsable_amount;
use crate::schema::{
    BalanceSheet, CashFlowClassification, CashFlowEntry, Category, ClassifiedRow,
    DataQualityReport, FinancialStatements, IncomeStatement, MatchTier, RawRow,
    EXTREME_VALUE_THRESHOLD,
};
use crate::utils::normalize_text;
use log::debug;
use std::cmp::Ordering;
use std::collections::HashMap;

const FINANCING_TERMS: &[&str] = &[
    "prestamo",
    "credito",
    "deuda",
    "hipoteca",
    "capital",
    "patrimonio",
    "reserva",
    "utilidad retenida",
    "utilidad acumulada",
    "utilidades retenidas",
    "utilidades acumuladas",
    "loan",
    "proceeds",
    "dividend",
];

const INVESTING_TERMS: &[&str] = &[
    "propiedad",
    "planta",
    "equipo",
    "inmueble",
    "maquinaria",
    "vehiculo",
    "inversion",
    "property",
    "equipment",
    "investment",
];

const FINANCING_CODE_HINTS: &[(CodeFamily, &str)] = &[
    (CodeFamily::Dashed, "302"),
    (CodeFamily::Dashed, "401"),
    (CodeFamily::Flat, "22"),
    (CodeFamily::Flat, "3"),
];

const INVESTING_CODE_HINTS: &[(CodeFamily, &str)] =
    &[(CodeFamily::Dashed, "202"), (CodeFamily::Flat, "12")];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsuranceFigures {
    pub technical_reserves: f64,
    pub written_premiums: f64,
}

/// Result of folding a set of raw rows.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub statements: FinancialStatements,
    /// Valued, non-header rows in input order.
    pub rows: Vec<ClassifiedRow>,
    pub data_quality: DataQualityReport,
}

pub struct StatementAggregator<'a> {
    classifier: &'a AccountClassifier,
}

impl<'a> StatementAggregator<'a> {
    pub fn new(classifier: &'a AccountClassifier) -> Self {
        Self { classifier }
    }

    pub fn aggregate(&self, rows: &[RawRow]) -> Aggregation {
        let classified: Vec<ClassifiedRow> =
            rows.iter().map(|row| self.classifier.classify_row(row)).collect();

        let insurance = detect_insurance(&classified);
        let mut data_quality = assess_data_quality(&classified);
        data_quality.unparsable_amount_rows =
            rows.iter().filter(|row| has_unparsable_amount(row)).count();

        let valued: Vec<ClassifiedRow> = classified
            .into_iter()
            .filter(|row| row.value != 0.0 && !row.header_noise)
            .collect();

        debug!(
            "Aggregating {} valued rows ({} zero-valued skipped, {} unclassified)",
            valued.len(),
            data_quality.zero_value_rows,
            data_quality.unclassified_rows
        );

        let statements = FinancialStatements {
            balance_sheet: build_balance_sheet(&valued, insurance.map(|i| i.technical_reserves)),
            income_statement: build_income_statement(
                &valued,
                insurance.map(|i| i.written_premiums),
            ),
            cash_flow: classify_cash_flow(&valued),
        };

        Aggregation {
            statements,
            rows: valued,
            data_quality,
        }
    }
}

fn canonical_cmp(a: &ClassifiedRow, b: &ClassifiedRow) -> Ordering {
    a.category
        .cmp(&b.category)
        .then_with(|| a.code.cmp(&b.code))
        .then_with(|| a.description.cmp(&b.description))
        .then_with(|| a.value.total_cmp(&b.value))
}

/// Rows in a fixed order so floating-point sums do not depend on input order.
fn canonical_order(rows: &[ClassifiedRow]) -> Vec<&ClassifiedRow> {
    let mut ordered: Vec<&ClassifiedRow> = rows.iter().collect();
    ordered.sort_by(|a, b| canonical_cmp(a, b));
    ordered
}

pub fn build_balance_sheet(rows: &[ClassifiedRow], technical_reserves: Option<f64>) -> BalanceSheet {
    let mut sheet = BalanceSheet::default();

    for row in canonical_order(rows) {
        if row.value == 0.0 || row.header_noise {
            continue;
        }

        let amount = if row.category.is_credit_balance() {
            row.value.abs()
        } else {
            row.value
        };

        match row.category {
            Category::Cash => sheet.cash += amount,
            Category::Receivables => sheet.receivables += amount,
            Category::Inventory => sheet.inventory += amount,
            Category::OtherCurrentAsset => sheet.other_current_assets += amount,
            Category::FixedAsset => sheet.fixed_assets += amount,
            Category::IntangibleAsset => sheet.intangible_assets += amount,
            Category::AccountsPayable => sheet.accounts_payable += amount,
            Category::ShortTermDebt => sheet.short_term_debt += amount,
            Category::OtherCurrentLiability => sheet.other_current_liabilities += amount,
            Category::LongTermDebt => sheet.long_term_debt += amount,
            Category::Equity => sheet.equity += amount,
            Category::RetainedEarnings => sheet.retained_earnings += amount,
            _ => {}
        }
    }

    sheet.current_assets =
        sheet.cash + sheet.receivables + sheet.inventory + sheet.other_current_assets;
    sheet.non_current_assets = sheet.fixed_assets + sheet.intangible_assets;
    sheet.total_assets = sheet.current_assets + sheet.non_current_assets;

    sheet.current_liabilities =
        sheet.accounts_payable + sheet.short_term_debt + sheet.other_current_liabilities;
    sheet.total_liabilities = sheet.current_liabilities + sheet.long_term_debt;

    sheet.total_equity = sheet.equity + sheet.retained_earnings;
    sheet.technical_reserves = technical_reserves;

    sheet
}

pub fn build_income_statement(
    rows: &[ClassifiedRow],
    written_premiums: Option<f64>,
) -> IncomeStatement {
    let mut statement = IncomeStatement::default();

    for row in canonical_order(rows) {
        if row.value == 0.0 || row.header_noise {
            continue;
        }

        match row.category {
            Category::Revenue => statement.revenue += row.value,
            Category::CostOfSales => statement.cost_of_goods_sold += row.value,
            Category::OperatingExpense => statement.operating_expenses += row.value,
            Category::FinancialExpense => statement.interest_expense += row.value,
            _ => {}
        }
    }

    statement.gross_profit = statement.revenue - statement.cost_of_goods_sold;
    statement.operating_income = statement.gross_profit - statement.operating_expenses;
    statement.total_expenses =
        statement.cost_of_goods_sold + statement.operating_expenses + statement.interest_expense;
    statement.net_income = statement.revenue - statement.total_expenses;
    statement.written_premiums = written_premiums;

    statement
}

/// Insurance figures, present only when a reserve or premium code appears.
pub fn detect_insurance(rows: &[ClassifiedRow]) -> Option<InsuranceFigures> {
    let is_insurer = rows.iter().any(|row| {
        row.code
            .as_deref()
            .is_some_and(|c| is_technical_reserve_code(c) || is_written_premium_code(c))
    });

    if !is_insurer {
        return None;
    }

    let mut figures = InsuranceFigures {
        technical_reserves: 0.0,
        written_premiums: 0.0,
    };

    for row in canonical_order(rows) {
        let Some(code) = row.code.as_deref() else {
            continue;
        };

        if is_technical_reserve_code(code) {
            figures.technical_reserves += row.value.abs();
        } else if is_written_premium_code(code) {
            figures.written_premiums += row.value.abs();
        }
    }

    debug!(
        "Insurance codes detected: reserves {:.2}, premiums {:.2}",
        figures.technical_reserves, figures.written_premiums
    );

    Some(figures)
}

fn has_code_hint(code: Option<&str>, hints: &[(CodeFamily, &str)]) -> bool {
    code.is_some_and(|c| {
        hints
            .iter()
            .any(|(family, prefix)| code_has_prefix(c, *family, prefix))
    })
}

/// Buckets every valued row into operating, investing or financing activity.
/// Description keywords decide first, code hints second, operating is the default.
pub fn classify_cash_flow(rows: &[ClassifiedRow]) -> CashFlowClassification {
    let mut flows = CashFlowClassification::default();

    for row in rows {
        if row.value == 0.0 || row.header_noise {
            continue;
        }

        let description = row.description.as_deref().map(normalize_text).unwrap_or_default();
        let code = row.code.as_deref();

        let entry = CashFlowEntry {
            label: row.label(),
            code: row.code.clone(),
            value: row.value,
        };

        if FINANCING_TERMS.iter().any(|t| description.contains(t)) {
            flows.financing.push(entry);
        } else if INVESTING_TERMS.iter().any(|t| description.contains(t)) {
            flows.investing.push(entry);
        } else if has_code_hint(code, FINANCING_CODE_HINTS) {
            flows.financing.push(entry);
        } else if has_code_hint(code, INVESTING_CODE_HINTS) {
            flows.investing.push(entry);
        } else {
            flows.operating.push(entry);
        }
    }

    flows
}

pub fn assess_data_quality(rows: &[ClassifiedRow]) -> DataQualityReport {
    let mut report = DataQualityReport {
        total_rows: rows.len(),
        ..DataQualityReport::default()
    };
    let mut code_counts: HashMap<&str, usize> = HashMap::new();

    for row in rows {
        if let Some(code) = row.code.as_deref().filter(|_| !row.header_noise) {
            *code_counts.entry(code).or_default() += 1;
        }

        if row.code.is_none() && row.description.is_none() {
            report.rows_missing_identity += 1;
        }

        if row.header_noise {
            report.header_noise_rows += 1;
            continue;
        }

        if row.value == 0.0 {
            report.zero_value_rows += 1;
            continue;
        }

        report.valued_rows += 1;

        if row.value.abs() > EXTREME_VALUE_THRESHOLD {
            report.extreme_value_rows += 1;
        }

        if row.category.has_unexpected_sign(row.value) {
            report.unexpected_sign_rows += 1;
        }

        if row.tier == Some(MatchTier::TextPattern) {
            report.text_pattern_rows += 1;
        }

        if row.category == Category::Unclassified {
            report.unclassified_rows += 1;
            report.unclassified_labels.push(row.label());
        }
    }

    report.duplicate_codes = code_counts.values().filter(|&&count| count > 1).count();
    report
}
