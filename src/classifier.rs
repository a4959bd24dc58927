use crate::chart_of_accounts::{
    default_rules, Rule, DATE_PATTERN, EMBEDDED_CODE_PATTERN, HEADER_NOISE_MARKERS,
    TEXT_PATTERNS,
};
use crate::ingestion::{extract_code, extract_description, extract_value, row_text};
use crate::schema::{AnalysisConfig, Category, ClassifiedRow, MatchTier, RawRow};
use crate::utils::normalize_text;
use log::debug;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub tier: Option<MatchTier>,
    pub header_noise: bool,
}

impl Classification {
    fn matched(category: Category, tier: MatchTier) -> Self {
        Self {
            category,
            tier: Some(tier),
            header_noise: false,
        }
    }

    fn unclassified() -> Self {
        Self {
            category: Category::Unclassified,
            tier: None,
            header_noise: false,
        }
    }

    fn header_noise() -> Self {
        Self {
            category: Category::Unclassified,
            tier: None,
            header_noise: true,
        }
    }
}

/// Interprets the ordered rule table against a row.
///
/// Categories are tried in table order and each one accepts either a code
/// prefix or a description keyword, so the first category with any evidence
/// wins. Free-text patterns (optional) run only when nothing structured
/// matched. Exclusion rules are checked up front and remove categories from
/// every tier for that row.
pub struct AccountClassifier {
    rules: Vec<Rule>,
    text_patterns: Vec<(Regex, Category)>,
    code_token: Option<Regex>,
    date: Option<Regex>,
    text_pattern_fallback: bool,
}

impl Default for AccountClassifier {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl AccountClassifier {
    pub fn new(rules: Vec<Rule>) -> Self {
        let text_patterns = TEXT_PATTERNS
            .iter()
            .filter_map(|(pattern, category)| match Regex::new(pattern) {
                Ok(re) => Some((re, *category)),
                Err(e) => {
                    debug!("Skipping invalid text pattern '{}': {}", pattern, e);
                    None
                }
            })
            .collect();

        Self {
            rules,
            text_patterns,
            code_token: Regex::new(EMBEDDED_CODE_PATTERN).ok(),
            date: Regex::new(DATE_PATTERN).ok(),
            text_pattern_fallback: true,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::default().with_text_pattern_fallback(config.text_pattern_fallback)
    }

    pub fn with_text_pattern_fallback(mut self, enabled: bool) -> Self {
        self.text_pattern_fallback = enabled;
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_header_noise(code: Option<&str>, description: Option<&str>) -> bool {
        let Some(description) = description else {
            return false;
        };

        let normalized = normalize_text(description);
        if HEADER_NOISE_MARKERS.iter().any(|m| normalized.contains(m)) {
            return true;
        }

        code.is_none() && normalized.trim().chars().count() < 3
    }

    /// Classifies a row from its already-extracted parts. `free_text` feeds the
    /// text-pattern tier only.
    pub fn classify_parts(
        &self,
        code: Option<&str>,
        description: Option<&str>,
        free_text: Option<&str>,
    ) -> Classification {
        if Self::is_header_noise(code, description) {
            return Classification::header_noise();
        }

        let normalized = description.map(normalize_text);
        let normalized = normalized.as_deref();
        let excluded = self.excluded_categories(code, normalized);

        if let Some((category, tier)) = self.first_match(code, normalized, &excluded) {
            return Classification::matched(category, tier);
        }

        if self.text_pattern_fallback {
            if let Some(category) = free_text.and_then(|t| self.text_match(code, t, &excluded)) {
                debug!(
                    "Row {:?} / {:?} resolved by free-text pattern as {:?}",
                    code, description, category
                );
                return Classification::matched(category, MatchTier::TextPattern);
            }
        }

        debug!("No rule matched row {:?} / {:?}", code, description);
        Classification::unclassified()
    }

    pub fn classify(&self, row: &RawRow) -> Classification {
        let code = extract_code(row);
        let description = extract_description(row);
        let text = row_text(row);

        self.classify_parts(
            code.as_deref(),
            description.as_deref(),
            Some(text.as_str()).filter(|t| !t.is_empty()),
        )
    }

    pub fn category_of(&self, row: &RawRow) -> Category {
        self.classify(row).category
    }

    /// Extracts the value and classifies in one pass.
    pub fn classify_row(&self, row: &RawRow) -> ClassifiedRow {
        let classification = self.classify(row);

        ClassifiedRow {
            code: extract_code(row),
            description: extract_description(row),
            value: extract_value(row),
            category: classification.category,
            tier: classification.tier,
            header_noise: classification.header_noise,
        }
    }

    fn excluded_categories(&self, code: Option<&str>, description: Option<&str>) -> Vec<Category> {
        self.rules
            .iter()
            .filter_map(|rule| match rule {
                Rule::Exclude { category, matcher } if matcher.matches(code, description) => {
                    Some(*category)
                }
                _ => None,
            })
            .collect()
    }

    /// Walks the rule table once. Each category's code prefixes and keywords
    /// sit together, so the first category with any matching evidence wins.
    fn first_match(
        &self,
        code: Option<&str>,
        description: Option<&str>,
        excluded: &[Category],
    ) -> Option<(Category, MatchTier)> {
        self.rules.iter().find_map(|rule| match rule {
            Rule::Assign { category, matcher }
                if !excluded.contains(category) && matcher.matches(code, description) =>
            {
                Some((*category, matcher.tier()))
            }
            _ => None,
        })
    }

    /// First code-shaped token in the text that is not a calendar date.
    fn embedded_code<'t>(&self, text: &'t str) -> Option<&'t str> {
        let re = self.code_token.as_ref()?;
        text.split_whitespace().find(|token| {
            re.is_match(token) && !self.date.as_ref().is_some_and(|d| d.is_match(token))
        })
    }

    fn text_match(&self, code: Option<&str>, text: &str, excluded: &[Category]) -> Option<Category> {
        let normalized = normalize_text(text);

        if code.is_none() {
            if let Some(embedded) = self.embedded_code(&normalized) {
                let excluded_by_code =
                    self.excluded_categories(Some(embedded), Some(normalized.as_str()));
                let category = self
                    .first_match(Some(embedded), None, &excluded_by_code)
                    .map(|(category, _)| category);
                if category.is_some() {
                    return category;
                }
            }
        }

        self.text_patterns
            .iter()
            .find(|(re, category)| !excluded.contains(category) && re.is_match(&normalized))
            .map(|(_, category)| *category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart_of_accounts::{CodeFamily, Matcher};
    use serde_json::json;

    fn row(value: serde_json::Value) -> RawRow {
        serde_json::from_value(value).unwrap()
    }

    fn category(code: Option<&str>, description: Option<&str>) -> Category {
        AccountClassifier::default()
            .classify_parts(code, description, None)
            .category
    }

    #[test]
    fn test_specific_cash_prefix_beats_broad_current_asset_prefix() {
        let classifier = AccountClassifier::default();
        let result = classifier.classify(&row(json!({
            "Codigo": "201-01-001",
            "Descripcion": "Caja General",
            "SaldoActual": 50000
        })));

        assert_eq!(result.category, Category::Cash);
        assert_eq!(result.tier, Some(MatchTier::Code));
        assert_eq!(category(Some("201-04-001"), None), Category::OtherCurrentAsset);
    }

    #[test]
    fn test_technical_reserves_are_long_term_liabilities() {
        assert_eq!(
            category(Some("304-01-001"), Some("Reservas de riesgos en curso")),
            Category::LongTermDebt
        );
        assert_eq!(category(Some("4.401.01"), Some("Reservas técnicas")), Category::LongTermDebt);
    }

    #[test]
    fn test_equity_exclusion_for_reserve_subrange() {
        let rules = vec![
            Rule::Exclude {
                category: Category::Equity,
                matcher: Matcher::CodePrefix {
                    family: CodeFamily::Dashed,
                    prefix: "304-",
                },
            },
            Rule::Assign {
                category: Category::Equity,
                matcher: Matcher::CodePrefix {
                    family: CodeFamily::Dashed,
                    prefix: "3",
                },
            },
        ];
        let classifier = AccountClassifier::new(rules).with_text_pattern_fallback(false);

        assert_eq!(
            classifier.classify_parts(Some("304-01"), None, None).category,
            Category::Unclassified
        );
        assert_eq!(
            classifier.classify_parts(Some("317-01"), None, None).category,
            Category::Equity
        );
    }

    #[test]
    fn test_equity_subrange_317_is_not_cash() {
        assert_eq!(
            category(Some("317-01-001"), Some("Capital disponible")),
            Category::Equity
        );
    }

    #[test]
    fn test_loans_are_never_cash() {
        assert_eq!(
            category(None, Some("Préstamo bancario a corto plazo")),
            Category::ShortTermDebt
        );
        assert_eq!(
            category(None, Some("Préstamo Banco Nacional largo plazo")),
            Category::LongTermDebt
        );
        assert_eq!(category(None, Some("Bancos")), Category::Cash);
    }

    #[test]
    fn test_earlier_category_keyword_beats_later_code_prefix() {
        let classifier = AccountClassifier::default();

        let petty_cash = classifier.classify_parts(Some("201-04-001"), Some("Caja chica"), None);
        assert_eq!(petty_cash.category, Category::Cash);
        assert_eq!(petty_cash.tier, Some(MatchTier::Keyword));

        assert_eq!(
            category(Some("1150"), Some("Bancos moneda extranjera")),
            Category::Cash
        );
        assert_eq!(category(Some("1150"), Some("Anticipos varios")), Category::OtherCurrentAsset);
    }

    #[test]
    fn test_code_and_keyword_for_same_category_reports_code() {
        let result = AccountClassifier::default().classify_parts(Some("1101"), Some("Caja"), None);
        assert_eq!(result.category, Category::Cash);
        assert_eq!(result.tier, Some(MatchTier::Code));
    }

    #[test]
    fn test_exclusions_keep_payables_and_expenses_out_of_assets() {
        assert_eq!(
            category(Some("2101"), Some("Cuentas por pagar Banco Mercantil")),
            Category::AccountsPayable
        );
        assert_eq!(category(Some("6105"), Some("Gastos de banco")), Category::OperatingExpense);
        assert_eq!(
            category(Some("5205"), Some("Gasto de depreciacion de equipo")),
            Category::OperatingExpense
        );
        assert_eq!(
            category(Some("5102"), Some("Costo de mercancia vendida")),
            Category::CostOfSales
        );
    }

    #[test]
    fn test_flat_commercial_codes() {
        assert_eq!(category(Some("1101"), None), Category::Cash);
        assert_eq!(category(Some("1102"), None), Category::Receivables);
        assert_eq!(category(Some("1103"), None), Category::Inventory);
        assert_eq!(category(Some("1150"), None), Category::OtherCurrentAsset);
        assert_eq!(category(Some("1201"), None), Category::FixedAsset);
        assert_eq!(category(Some("2201"), None), Category::LongTermDebt);
        assert_eq!(category(Some("3201"), None), Category::RetainedEarnings);
        assert_eq!(category(Some("3101"), None), Category::Equity);
        assert_eq!(category(Some("4101"), None), Category::Revenue);
        assert_eq!(category(Some("5101"), None), Category::CostOfSales);
        assert_eq!(category(Some("5301"), None), Category::FinancialExpense);
        assert_eq!(category(Some("5201"), None), Category::OperatingExpense);
    }

    #[test]
    fn test_dotted_insurance_codes() {
        assert_eq!(category(Some("1.101.01"), None), Category::Cash);
        assert_eq!(category(Some("1.301.02"), None), Category::Receivables);
        assert_eq!(category(Some("1.201.05"), None), Category::OtherCurrentAsset);
        assert_eq!(category(Some("3.101.01"), None), Category::Revenue);
        assert_eq!(category(Some("3.301"), None), Category::CostOfSales);
        assert_eq!(category(Some("4.402.01"), None), Category::ShortTermDebt);
        assert_eq!(category(Some("4.409.02"), None), Category::RetainedEarnings);
        assert_eq!(category(Some("4.410"), None), Category::Equity);
    }

    #[test]
    fn test_keyword_matching_ignores_case_and_accents() {
        assert_eq!(category(None, Some("INVENTARIO DE MERCANCÍA")), Category::Inventory);
        assert_eq!(category(None, Some("Costo de Ventas")), Category::CostOfSales);
        assert_eq!(category(None, Some("Gastos de Ventas")), Category::OperatingExpense);
        assert_eq!(category(None, Some("Intereses bancarios")), Category::FinancialExpense);
        assert_eq!(category(None, Some("Utilidades retenidas")), Category::RetainedEarnings);
    }

    #[test]
    fn test_header_noise_rows() {
        let classifier = AccountClassifier::default();
        let result = classifier.classify_parts(None, Some("Usuario: ADMIN"), None);
        assert!(result.header_noise);
        assert_eq!(result.category, Category::Unclassified);

        assert!(AccountClassifier::is_header_noise(None, Some("ab")));
        assert!(!AccountClassifier::is_header_noise(Some("11"), Some("ab")));
        assert!(!AccountClassifier::is_header_noise(None, None));
    }

    #[test]
    fn test_row_without_code_or_description_is_unclassified() {
        let classifier = AccountClassifier::default();
        let result = classifier.classify(&row(json!({ "Valor": 100 })));
        assert_eq!(result.category, Category::Unclassified);
        assert!(!result.header_noise);
        assert_eq!(result.tier, None);
    }

    #[test]
    fn test_text_pattern_tier_is_last_resort() {
        let classifier = AccountClassifier::default();

        let embedded = classifier.classify(&row(json!({
            "Detalle": "4.401 Reservas de riesgos en curso",
            "Valor": -1000
        })));
        assert_eq!(embedded.category, Category::LongTermDebt);
        assert_eq!(embedded.tier, Some(MatchTier::TextPattern));

        let pattern = classifier.classify(&row(json!({
            "Detalle": "Siniestros pagados",
            "Valor": 500
        })));
        assert_eq!(pattern.category, Category::CostOfSales);
        assert_eq!(pattern.tier, Some(MatchTier::TextPattern));

        let structured = classifier.classify(&row(json!({
            "Codigo": "1101",
            "Detalle": "Siniestros",
            "Valor": 500
        })));
        assert_eq!(structured.category, Category::Cash);
        assert_eq!(structured.tier, Some(MatchTier::Code));
    }

    #[test]
    fn test_dates_in_free_text_are_not_account_codes() {
        let classifier = AccountClassifier::default();

        let dated = classifier.classify(&row(json!({
            "Detalle": "Ajuste al 31-12-2023",
            "Valor": 500
        })));
        assert_eq!(dated.category, Category::Unclassified);
        assert_eq!(dated.tier, None);

        let iso = classifier.classify(&row(json!({ "Detalle": "Cierre 2023-12-31", "Valor": 5 })));
        assert_eq!(iso.category, Category::Unclassified);

        let coded = classifier.classify(&row(json!({
            "Detalle": "Corte 31-12-2023 4.401 Reservas",
            "Valor": -10
        })));
        assert_eq!(coded.category, Category::LongTermDebt);
        assert_eq!(coded.tier, Some(MatchTier::TextPattern));
    }

    #[test]
    fn test_text_pattern_tier_can_be_disabled() {
        let config = AnalysisConfig {
            text_pattern_fallback: false,
            ..AnalysisConfig::default()
        };
        let classifier = AccountClassifier::from_config(&config);
        let result = classifier.classify(&row(json!({ "Detalle": "Siniestros pagados", "Valor": 5 })));
        assert_eq!(result.category, Category::Unclassified);
    }

    #[test]
    fn test_classify_row_carries_value() {
        let classifier = AccountClassifier::default();
        let classified = classifier.classify_row(&row(json!({
            "Codigo": "301-01-001",
            "Descripcion": "Proveedores",
            "SaldoActual": "-120.000,00"
        })));
        assert_eq!(classified.category, Category::AccountsPayable);
        assert_eq!(classified.value, -120000.0);
        assert_eq!(classified.label(), "Proveedores");
    }
}
