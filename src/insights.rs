use crate::chart_of_accounts::is_standard_plan_code;
use crate::equation::PatrimonialValidation;
use crate::ratios::{FinancialRatios, InsuranceRatios};
use crate::schema::{Category, ClassifiedRow};
use crate::utils::{format_percentage, format_ratio};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum Severity {
    Critical,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum InsightArea {
    AccountingEquation,
    Liquidity,
    Leverage,
    Profitability,
    Activity,
    Insurance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Alert {
    pub severity: Severity,
    pub area: InsightArea,
    pub message: String,
    /// Observed value that tripped the alert.
    pub value: Option<f64>,
    /// Threshold that was crossed.
    pub threshold: Option<f64>,
}

impl Alert {
    fn ratio(severity: Severity, area: InsightArea, message: String, value: f64, threshold: f64) -> Self {
        Self {
            severity,
            area,
            message,
            value: Some(value),
            threshold: Some(threshold),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum RecommendationTone {
    Urgent,
    Advisory,
    Positive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Recommendation {
    pub tone: RecommendationTone,
    pub area: InsightArea,
    pub message: String,
}

impl Recommendation {
    fn new(tone: RecommendationTone, area: InsightArea, message: impl Into<String>) -> Self {
        Self {
            tone,
            area,
            message: message.into(),
        }
    }
}

/// Period-over-period changes. A single trial balance carries no history, so
/// every figure is 0 until comparative periods are supplied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Trends {
    pub sales_change: f64,
    pub income_change: f64,
    pub assets_change: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum CompanyProfile {
    Insurance,
    Commercial,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Insights {
    pub ratios: FinancialRatios,
    pub validation: PatrimonialValidation,
    pub trends: Trends,
    pub alerts: Vec<Alert>,
    pub recommendations: Vec<Recommendation>,
    pub executive_summary: String,
    pub company_profile: CompanyProfile,
}

impl Insights {
    pub fn critical_alerts(&self) -> impl Iterator<Item = &Alert> {
        self.alerts
            .iter()
            .filter(|a| a.severity == Severity::Critical)
    }
}

pub struct InsightGenerator;

impl InsightGenerator {
    pub fn generate(
        ratios: &FinancialRatios,
        validation: &PatrimonialValidation,
        company_profile: CompanyProfile,
    ) -> Insights {
        Insights {
            ratios: ratios.clone(),
            validation: validation.clone(),
            trends: Trends::default(),
            alerts: generate_alerts(ratios, validation),
            recommendations: generate_recommendations(ratios),
            executive_summary: executive_summary(ratios),
            company_profile,
        }
    }
}

/// Alerts in fixed order: the accounting-equation failure first, then
/// liquidity, leverage, profitability and insurance checks.
pub fn generate_alerts(ratios: &FinancialRatios, validation: &PatrimonialValidation) -> Vec<Alert> {
    use InsightArea::*;
    use Severity::*;

    let mut alerts = Vec::new();

    if !validation.is_valid {
        alerts.push(Alert {
            severity: Critical,
            area: AccountingEquation,
            message: validation
                .error_message
                .clone()
                .unwrap_or_else(|| "Accounting equation does not balance".to_string()),
            value: Some(validation.difference),
            threshold: Some(validation.tolerance),
        });
    }

    let liquidity = &ratios.liquidity;
    let current = liquidity.current_ratio;
    if current < 1.0 {
        alerts.push(Alert::ratio(
            Critical,
            Liquidity,
            format!("Current ratio of {} is below 1.00: current liabilities exceed current assets", format_ratio(current)),
            current,
            1.0,
        ));
    } else if current < 1.5 {
        alerts.push(Alert::ratio(
            Warning,
            Liquidity,
            format!("Current ratio of {} is below the 1.50 comfort level", format_ratio(current)),
            current,
            1.5,
        ));
    }

    let quick = liquidity.quick_ratio;
    if quick < 1.0 {
        alerts.push(Alert::ratio(
            Critical,
            Liquidity,
            format!("Quick ratio of {} means short-term obligations depend on selling inventory", format_ratio(quick)),
            quick,
            1.0,
        ));
    } else if quick < 1.2 {
        alerts.push(Alert::ratio(
            Warning,
            Liquidity,
            format!("Quick ratio of {} is below 1.20", format_ratio(quick)),
            quick,
            1.2,
        ));
    }

    let cash = liquidity.cash_ratio;
    if cash < 0.5 {
        alerts.push(Alert::ratio(
            Critical,
            Liquidity,
            format!("Cash ratio of {} leaves little immediate cover for current liabilities", format_ratio(cash)),
            cash,
            0.5,
        ));
    }

    let leverage = &ratios.leverage;
    let total_debt = leverage.total_debt;
    if total_debt > 70.0 {
        alerts.push(Alert::ratio(
            Critical,
            Leverage,
            format!("Liabilities finance {} of total assets", format_percentage(total_debt)),
            total_debt,
            70.0,
        ));
    } else if total_debt > 60.0 {
        alerts.push(Alert::ratio(
            Warning,
            Leverage,
            format!("Debt level of {} is approaching the 70% limit", format_percentage(total_debt)),
            total_debt,
            60.0,
        ));
    }

    let debt_to_equity = leverage.debt_to_equity;
    if debt_to_equity > 200.0 {
        alerts.push(Alert::ratio(
            Critical,
            Leverage,
            format!("Debt-to-equity of {} exceeds 200%", format_percentage(debt_to_equity)),
            debt_to_equity,
            200.0,
        ));
    } else if debt_to_equity > 150.0 {
        alerts.push(Alert::ratio(
            Warning,
            Leverage,
            format!("Debt-to-equity of {} exceeds 150%", format_percentage(debt_to_equity)),
            debt_to_equity,
            150.0,
        ));
    }

    let coverage = leverage.interest_coverage;
    if coverage < 1.0 {
        alerts.push(Alert::ratio(
            Critical,
            Leverage,
            format!("Operating income covers interest only {} times", format_ratio(coverage)),
            coverage,
            1.0,
        ));
    } else if coverage < 2.5 {
        alerts.push(Alert::ratio(
            Warning,
            Leverage,
            format!("Interest coverage of {} is below 2.50", format_ratio(coverage)),
            coverage,
            2.5,
        ));
    }

    let profitability = &ratios.profitability;
    let net_margin = profitability.net_margin;
    if net_margin < 5.0 {
        alerts.push(Alert::ratio(
            Critical,
            Profitability,
            format!("Net margin of {} is below 5%", format_percentage(net_margin)),
            net_margin,
            5.0,
        ));
    } else if net_margin < 8.0 {
        alerts.push(Alert::ratio(
            Warning,
            Profitability,
            format!("Net margin of {} is below 8%", format_percentage(net_margin)),
            net_margin,
            8.0,
        ));
    }

    let roa = profitability.roa;
    if roa <= 0.0 {
        alerts.push(Alert::ratio(
            Critical,
            Profitability,
            format!("Return on assets is {}: assets are not generating profit", format_percentage(roa)),
            roa,
            0.0,
        ));
    } else if roa < 5.0 {
        alerts.push(Alert::ratio(
            Warning,
            Profitability,
            format!("Return on assets of {} is below 5%", format_percentage(roa)),
            roa,
            5.0,
        ));
    }

    let roe = profitability.roe;
    if roe <= 0.0 {
        alerts.push(Alert::ratio(
            Critical,
            Profitability,
            format!("Return on equity is {}: shareholders are losing value", format_percentage(roe)),
            roe,
            0.0,
        ));
    } else if roe < 10.0 {
        alerts.push(Alert::ratio(
            Warning,
            Profitability,
            format!("Return on equity of {} is below 10%", format_percentage(roe)),
            roe,
            10.0,
        ));
    }

    if let Some(insurance) = &ratios.insurance {
        insurance_alerts(insurance, &mut alerts);
    }

    alerts
}

fn insurance_alerts(insurance: &InsuranceRatios, alerts: &mut Vec<Alert>) {
    use InsightArea::Insurance;
    use Severity::*;

    let solvency = insurance.solvency;
    if solvency < 100.0 {
        alerts.push(Alert::ratio(
            Critical,
            Insurance,
            format!("Solvency margin of {} is below the 100% regulatory minimum", format_percentage(solvency)),
            solvency,
            100.0,
        ));
    } else if solvency < 120.0 {
        alerts.push(Alert::ratio(
            Warning,
            Insurance,
            format!("Solvency margin of {} is below 120%", format_percentage(solvency)),
            solvency,
            120.0,
        ));
    }

    let coverage = insurance.technical_coverage;
    if coverage < 100.0 {
        alerts.push(Alert::ratio(
            Critical,
            Insurance,
            format!("Assets cover only {} of technical reserves", format_percentage(coverage)),
            coverage,
            100.0,
        ));
    } else if coverage < 110.0 {
        alerts.push(Alert::ratio(
            Warning,
            Insurance,
            format!("Technical coverage of {} is below 110%", format_percentage(coverage)),
            coverage,
            110.0,
        ));
    }

    let reserve_ratio = insurance.reserve_ratio;
    if reserve_ratio < 100.0 {
        alerts.push(Alert::ratio(
            Critical,
            Insurance,
            format!("Technical reserves are only {} of written premiums", format_percentage(reserve_ratio)),
            reserve_ratio,
            100.0,
        ));
    } else if reserve_ratio > 150.0 {
        alerts.push(Alert::ratio(
            Warning,
            Insurance,
            format!("Technical reserves at {} of written premiums may be over-provisioned", format_percentage(reserve_ratio)),
            reserve_ratio,
            150.0,
        ));
    }
}

pub fn generate_recommendations(ratios: &FinancialRatios) -> Vec<Recommendation> {
    use InsightArea::*;
    use RecommendationTone::*;

    let mut recs = Vec::new();
    let liquidity = &ratios.liquidity;
    let leverage = &ratios.leverage;
    let profitability = &ratios.profitability;
    let activity = &ratios.activity;

    if liquidity.current_ratio > 2.5 {
        recs.push(Recommendation::new(
            Advisory,
            Liquidity,
            "Excess liquidity: consider productive investment of idle current assets",
        ));
    } else if liquidity.current_ratio >= 1.5 {
        recs.push(Recommendation::new(
            Positive,
            Liquidity,
            "Liquidity is at an optimal level; maintain current working-capital policy",
        ));
    } else if liquidity.current_ratio < 1.0 {
        recs.push(Recommendation::new(
            Urgent,
            Liquidity,
            "Improve liquidity: renegotiate short-term obligations or convert assets to cash",
        ));
    }

    if liquidity.quick_ratio < 1.0 {
        recs.push(Recommendation::new(
            Advisory,
            Liquidity,
            "Reduce dependence on inventory to meet short-term obligations",
        ));
    }

    if liquidity.cash_ratio < 0.5 {
        recs.push(Recommendation::new(
            Advisory,
            Liquidity,
            "Increase immediately available funds to cover current liabilities",
        ));
    }

    if leverage.total_debt < 30.0 {
        recs.push(Recommendation::new(
            Advisory,
            Leverage,
            "Low leverage: strategic use of debt could finance growth",
        ));
    } else if leverage.total_debt > 70.0 {
        recs.push(Recommendation::new(
            Urgent,
            Leverage,
            "Reduce indebtedness: restructure liabilities or raise capital",
        ));
    } else if leverage.total_debt >= 50.0 {
        recs.push(Recommendation::new(
            Advisory,
            Leverage,
            "Monitor debt levels closely and avoid taking on additional obligations",
        ));
    }

    if leverage.debt_to_equity > 200.0 {
        recs.push(Recommendation::new(
            Urgent,
            Leverage,
            "Strengthen the equity base: liabilities exceed twice the owners' equity",
        ));
    }

    if leverage.interest_coverage < 2.5 {
        recs.push(Recommendation::new(
            Advisory,
            Leverage,
            "Improve interest coverage by lifting operating income or refinancing at lower cost",
        ));
    }

    if profitability.gross_margin > 40.0 && profitability.net_margin < 8.0 {
        recs.push(Recommendation::new(
            Advisory,
            Profitability,
            "Healthy gross margin is being absorbed by operating expenses; review overheads",
        ));
    }

    if profitability.net_margin < 5.0 {
        recs.push(Recommendation::new(
            Urgent,
            Profitability,
            "Review the cost structure and pricing policy to restore net margin",
        ));
    } else if profitability.net_margin >= 15.0 {
        recs.push(Recommendation::new(
            Positive,
            Profitability,
            "Excellent net margin; sustain the current pricing and cost discipline",
        ));
    }

    if profitability.roa < 5.0 {
        recs.push(Recommendation::new(
            Advisory,
            Profitability,
            "Improve asset efficiency: dispose of idle assets or raise their utilization",
        ));
    }

    if profitability.roe < 10.0 {
        recs.push(Recommendation::new(
            Advisory,
            Profitability,
            "Increase return on equity through better margins or asset turnover",
        ));
    } else if profitability.roe >= 20.0 {
        recs.push(Recommendation::new(
            Positive,
            Profitability,
            "Outstanding return on equity for shareholders",
        ));
    }

    if activity.asset_turnover < 1.0 {
        recs.push(Recommendation::new(
            Advisory,
            Activity,
            "Assets generate less than their value in sales; review asset productivity",
        ));
    }

    if activity.inventory_turnover < 6.0 {
        recs.push(Recommendation::new(
            Advisory,
            Activity,
            "Inventory rotates slowly; optimize purchasing and stock levels",
        ));
    }

    if activity.receivables_turnover < 8.0 {
        recs.push(Recommendation::new(
            Advisory,
            Activity,
            "Speed up collections: tighten credit terms and follow up overdue receivables",
        ));
    }

    if let Some(insurance) = &ratios.insurance {
        if insurance.solvency > 200.0 {
            recs.push(Recommendation::new(
                Positive,
                Insurance,
                "Strong solvency margin; capacity exists to underwrite additional business",
            ));
        } else if insurance.solvency < 120.0 {
            recs.push(Recommendation::new(
                Urgent,
                Insurance,
                "Strengthen capital to restore an adequate solvency margin",
            ));
        }

        if insurance.technical_coverage > 150.0 {
            recs.push(Recommendation::new(
                Positive,
                Insurance,
                "Technical reserves are comfortably backed by assets",
            ));
        } else if insurance.technical_coverage < 110.0 {
            recs.push(Recommendation::new(
                Urgent,
                Insurance,
                "Increase eligible assets backing technical reserves",
            ));
        }

        if insurance.reserve_ratio < 100.0 {
            recs.push(Recommendation::new(
                Urgent,
                Insurance,
                "Technical reserves look insufficient relative to written premiums; review reserving",
            ));
        } else if insurance.reserve_ratio > 150.0 {
            recs.push(Recommendation::new(
                Advisory,
                Insurance,
                "Reserves are high relative to premiums; review for over-provisioning",
            ));
        }
    }

    recs
}

pub fn liquidity_band(current_ratio: f64) -> &'static str {
    if current_ratio >= 2.0 {
        "excellent"
    } else if current_ratio >= 1.5 {
        "good"
    } else if current_ratio >= 1.0 {
        "acceptable"
    } else {
        "critical"
    }
}

pub fn profitability_band(net_margin: f64) -> &'static str {
    if net_margin >= 15.0 {
        "excellent"
    } else if net_margin >= 8.0 {
        "good"
    } else if net_margin >= 5.0 {
        "acceptable"
    } else {
        "critical"
    }
}

pub fn leverage_band(total_debt: f64) -> &'static str {
    if total_debt <= 30.0 {
        "conservative"
    } else if total_debt <= 50.0 {
        "moderate"
    } else if total_debt <= 70.0 {
        "high"
    } else {
        "critical"
    }
}

pub fn roe_band(roe: f64) -> &'static str {
    if roe >= 20.0 {
        "excellent"
    } else if roe >= 15.0 {
        "very good"
    } else if roe >= 10.0 {
        "good"
    } else if roe > 0.0 {
        "low"
    } else {
        "negative"
    }
}

pub fn roa_band(roa: f64) -> &'static str {
    if roa >= 10.0 {
        "excellent"
    } else if roa >= 5.0 {
        "good"
    } else if roa > 0.0 {
        "low"
    } else {
        "negative"
    }
}

fn solvency_band(solvency: f64) -> &'static str {
    if solvency >= 150.0 {
        "excellent"
    } else if solvency >= 120.0 {
        "good"
    } else if solvency >= 100.0 {
        "adequate"
    } else {
        "insufficient"
    }
}

fn coverage_band(coverage: f64) -> &'static str {
    if coverage >= 130.0 {
        "excellent"
    } else if coverage >= 110.0 {
        "good"
    } else if coverage >= 100.0 {
        "adequate"
    } else {
        "insufficient"
    }
}

fn reserve_band(reserve_ratio: f64) -> &'static str {
    if (120.0..=150.0).contains(&reserve_ratio) {
        "optimal"
    } else if reserve_ratio >= 100.0 {
        "adequate"
    } else {
        "insufficient"
    }
}

pub fn executive_summary(ratios: &FinancialRatios) -> String {
    let liquidity = &ratios.liquidity;
    let profitability = &ratios.profitability;
    let leverage = &ratios.leverage;

    let mut summary = format!(
        "EXECUTIVE SUMMARY: The company shows {} liquidity (current ratio: {}, quick ratio: {}), {} profitability (net margin: {}) and a {} debt level ({}). Return on equity is {} at {} and return on assets is {} at {}.",
        liquidity_band(liquidity.current_ratio),
        format_ratio(liquidity.current_ratio),
        format_ratio(liquidity.quick_ratio),
        profitability_band(profitability.net_margin),
        format_percentage(profitability.net_margin),
        leverage_band(leverage.total_debt),
        format_percentage(leverage.total_debt),
        roe_band(profitability.roe),
        format_percentage(profitability.roe),
        roa_band(profitability.roa),
        format_percentage(profitability.roa),
    );

    if let Some(insurance) = &ratios.insurance {
        summary.push_str(&format!(
            " As an insurer, its solvency margin is {} ({}), technical coverage is {} ({}) and reserves are {} ({} of written premiums).",
            solvency_band(insurance.solvency),
            format_percentage(insurance.solvency),
            coverage_band(insurance.technical_coverage),
            format_percentage(insurance.technical_coverage),
            reserve_band(insurance.reserve_ratio),
            format_percentage(insurance.reserve_ratio),
        ));
    }

    summary
}

pub fn detect_company_profile(rows: &[ClassifiedRow], insurance_detected: bool) -> CompanyProfile {
    if insurance_detected {
        return CompanyProfile::Insurance;
    }

    let standard_codes = rows
        .iter()
        .any(|row| row.code.as_deref().is_some_and(is_standard_plan_code));

    let trading_accounts = rows.iter().any(|row| {
        row.value != 0.0
            && matches!(
                row.category,
                Category::Inventory | Category::Revenue | Category::CostOfSales
            )
    });

    if standard_codes || trading_accounts {
        CompanyProfile::Commercial
    } else {
        CompanyProfile::Unknown
    }
}
