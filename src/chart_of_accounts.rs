use crate::schema::{Category, ClassifiedRow, MatchTier};
use crate::utils::format_amount;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Account-code numbering conventions. The shape of a code decides its family,
/// so a code can never belong to two families at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum CodeFamily {
    /// Insurance-sector plan: `201-01-001`, `304-02`.
    Dashed,
    /// Numeric-dot plans: commercial `1.0.1` and insurance `4.401.01`.
    Dotted,
    /// Plain digits: `1101`, `21`.
    Flat,
}

impl CodeFamily {
    pub fn detect(code: &str) -> Option<Self> {
        let code = code.trim();
        if code.is_empty() {
            return None;
        }

        if code.contains('-') {
            Some(CodeFamily::Dashed)
        } else if code.contains('.') {
            Some(CodeFamily::Dotted)
        } else if code.chars().all(|c| c.is_ascii_digit()) {
            Some(CodeFamily::Flat)
        } else {
            None
        }
    }
}

pub fn code_has_prefix(code: &str, family: CodeFamily, prefix: &str) -> bool {
    let code = code.trim();
    CodeFamily::detect(code) == Some(family) && code.starts_with(prefix)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    CodePrefix {
        family: CodeFamily,
        prefix: &'static str,
    },
    /// Every term must appear in the normalized description.
    Keywords(&'static [&'static str]),
}

impl Matcher {
    pub fn matches(&self, code: Option<&str>, normalized_description: Option<&str>) -> bool {
        match self {
            Matcher::CodePrefix { family, prefix } => {
                code.is_some_and(|c| code_has_prefix(c, *family, prefix))
            }
            Matcher::Keywords(terms) => normalized_description
                .is_some_and(|d| terms.iter().all(|term| d.contains(term))),
        }
    }

    pub fn tier(&self) -> MatchTier {
        match self {
            Matcher::CodePrefix { .. } => MatchTier::Code,
            Matcher::Keywords(_) => MatchTier::Keyword,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Assign { category: Category, matcher: Matcher },
    /// Removes `category` from consideration for any row the matcher accepts.
    Exclude { category: Category, matcher: Matcher },
}

struct Convention {
    category: Category,
    dashed: &'static [&'static str],
    dotted: &'static [&'static str],
    flat: &'static [&'static str],
    keywords: &'static [&'static [&'static str]],
}

const CONVENTIONS: &[Convention] = &[
    Convention {
        category: Category::Cash,
        dashed: &["201-01", "202-01", "203-06", "203-11"],
        dotted: &["1.101", "1.0.1", "2.201.01"],
        flat: &["1101"],
        keywords: &[
            &["caja"],
            &["banco"],
            &["efectivo"],
            &["disponible"],
            &["depositos a la vista"],
            &["depositos a plazo fijo"],
            &["inversiones en el extranjero"],
            &["moneda nacional"],
            &["moneda extranjera"],
            &["cash"],
        ],
    },
    Convention {
        category: Category::Receivables,
        dashed: &["201-02", "205-"],
        dotted: &["1.102", "1.0.2", "1.301", "1.302"],
        flat: &["1102"],
        keywords: &[
            &["por cobrar"],
            &["cliente"],
            &["deudor"],
            &["reaseguro"],
            &["intermediario"],
            &["retrocesionario"],
            &["receivable"],
        ],
    },
    Convention {
        category: Category::Inventory,
        dashed: &["201-03"],
        dotted: &["1.103", "1.0.3"],
        flat: &["1103"],
        keywords: &[
            &["inventario"],
            &["mercancia"],
            &["mercaderia"],
            &["existencia"],
            &["inventory"],
        ],
    },
    Convention {
        category: Category::OtherCurrentAsset,
        dashed: &["201"],
        dotted: &["1.201", "1.202", "1.203", "1.0", "1.1"],
        flat: &["11"],
        keywords: &[&["cuenta corriente"], &["pagado por anticipado"], &["prepaid"]],
    },
    Convention {
        category: Category::FixedAsset,
        dashed: &["202"],
        dotted: &["1.2"],
        flat: &["12", "14"],
        keywords: &[
            &["propiedad"],
            &["planta"],
            &["equipo"],
            &["inmueble"],
            &["maquinaria"],
            &["vehiculo"],
            &["mobiliario"],
            &["edificio"],
            &["terreno"],
            &["equipment"],
        ],
    },
    Convention {
        category: Category::IntangibleAsset,
        dashed: &["203"],
        dotted: &["1.3"],
        flat: &["13"],
        keywords: &[
            &["intangible"],
            &["patente"],
            &["marca"],
            &["software"],
            &["licencia"],
            &["plusvalia"],
        ],
    },
    Convention {
        category: Category::AccountsPayable,
        dashed: &["301-01"],
        dotted: &["2.0.1", "2.0.2"],
        flat: &["2101"],
        keywords: &[&["cuenta", "pagar"], &["proveedor"], &["payable"]],
    },
    Convention {
        category: Category::ShortTermDebt,
        dashed: &["301-02"],
        dotted: &["2.0.3", "4.402.01"],
        flat: &["2102"],
        keywords: &[&["prestamo", "corto"], &["credito", "corto"], &["sobregiro"]],
    },
    Convention {
        category: Category::OtherCurrentLiability,
        dashed: &["301", "302"],
        dotted: &["2.0"],
        flat: &["21"],
        keywords: &[
            &["acreedor"],
            &["nomina"],
            &["salario"],
            &["sueldo"],
            &["comisiones"],
            &["impuestos"],
            &["participacion de cedentes"],
            &["retenciones"],
        ],
    },
    Convention {
        category: Category::LongTermDebt,
        dashed: &["304-", "402-"],
        dotted: &["4.401", "4.402", "2.1", "2.2"],
        flat: &["22", "24"],
        keywords: &[
            &["reservas tecnicas"],
            &["prestamo", "largo"],
            &["credito", "largo"],
            &["deuda", "largo"],
            &["hipoteca"],
            &["provisiones"],
            &["obligaciones laborales"],
            &["long-term"],
        ],
    },
    Convention {
        category: Category::RetainedEarnings,
        dashed: &["401-02"],
        dotted: &["3.0.3", "3.0.4", "4.409.02"],
        flat: &["32"],
        keywords: &[
            &["utilidad", "retenida"],
            &["utilidad", "acumulada"],
            &["resultado", "ejercicio"],
            &["resultados acumulados"],
            &["retained earnings"],
        ],
    },
    Convention {
        category: Category::Equity,
        dashed: &["401", "3"],
        dotted: &["3.0", "4.409", "4.410"],
        flat: &["3"],
        keywords: &[
            &["capital"],
            &["patrimonio"],
            &["reserva"],
            &["utilidad"],
            &["superavit"],
            &["equity"],
        ],
    },
    Convention {
        category: Category::Revenue,
        dashed: &["4", "204-"],
        dotted: &["4.0", "4.1", "4.2", "4.3", "3.1", "3.2"],
        flat: &["4"],
        keywords: &[
            &["venta"],
            &["ingreso"],
            &["primas emitidas"],
            &["primas cobradas"],
            &["revenue"],
            &["sales"],
        ],
    },
    Convention {
        category: Category::CostOfSales,
        dashed: &["501"],
        dotted: &["5.0", "3.3"],
        flat: &["501", "51"],
        keywords: &[
            &["costo", "venta"],
            &["costo", "mercancia"],
            &["costo", "mercaderia"],
            &["siniestro"],
            &["cost of"],
        ],
    },
    Convention {
        category: Category::FinancialExpense,
        dashed: &["53"],
        dotted: &["5.3"],
        flat: &["53", "71"],
        keywords: &[&["financiero"], &["interes"], &["interest"]],
    },
    Convention {
        category: Category::OperatingExpense,
        dashed: &["5", "6"],
        dotted: &["5", "3.4"],
        flat: &["5", "6", "7"],
        keywords: &[
            &["gasto"],
            &["operativo"],
            &["depreciacion"],
            &["amortizacion"],
            &["expense"],
        ],
    },
];

const EXCLUSIONS: &[(Category, Matcher)] = &[
    (
        Category::Cash,
        Matcher::CodePrefix {
            family: CodeFamily::Dashed,
            prefix: "317-",
        },
    ),
    (Category::Cash, Matcher::Keywords(&["prestamo"])),
    (Category::Cash, Matcher::Keywords(&["credito"])),
    (Category::Cash, Matcher::Keywords(&["sobregiro"])),
    (Category::Cash, Matcher::Keywords(&["pagar"])),
    (Category::Cash, Matcher::Keywords(&["gasto"])),
    (Category::Receivables, Matcher::Keywords(&["pagar"])),
    (Category::Inventory, Matcher::Keywords(&["costo"])),
    (Category::FixedAsset, Matcher::Keywords(&["gasto"])),
    (Category::IntangibleAsset, Matcher::Keywords(&["gasto"])),
    (Category::OtherCurrentLiability, Matcher::Keywords(&["gasto"])),
    (Category::LongTermDebt, Matcher::Keywords(&["gasto"])),
    (
        Category::RetainedEarnings,
        Matcher::CodePrefix {
            family: CodeFamily::Dashed,
            prefix: "304-",
        },
    ),
    (
        Category::Equity,
        Matcher::CodePrefix {
            family: CodeFamily::Dashed,
            prefix: "304-",
        },
    ),
    (Category::Revenue, Matcher::Keywords(&["costo"])),
    (Category::Revenue, Matcher::Keywords(&["gasto"])),
];

/// Report header lines some accounting packages print into every export.
pub const HEADER_NOISE_MARKERS: &[&str] =
    &["profit plus", "usuario:", "pagina:", "r.i.f.:", "fecha:", "hora:"];

/// Free-text patterns tried when neither code nor description rules fire.
/// Applied to normalized (lowercase, unaccented) text.
pub const TEXT_PATTERNS: &[(&str, Category)] = &[
    (r"\breservas?\s+(de\s+)?(riesgos?|tecnicas?|matematicas?)\b", Category::LongTermDebt),
    (r"\bprimas?\s+(emitidas?|cobradas?|suscritas?)\b", Category::Revenue),
    (r"\bsiniestros?\b", Category::CostOfSales),
    (r"\b(caja|bancos?|efectivo)\b", Category::Cash),
    (r"\b(inventarios?|existencias|mercancias?)\b", Category::Inventory),
    (r"\bpor\s+cobrar\b", Category::Receivables),
    (r"\bpor\s+pagar\b", Category::AccountsPayable),
    (r"\b(ventas?|ingresos?)\b", Category::Revenue),
    (r"\b(gastos?|costos?)\b", Category::OperatingExpense),
    (r"\b(capital|patrimonio)\b", Category::Equity),
];

/// A whitespace-delimited token shaped like an account code, as in
/// `"4.401 Reservas"`.
pub const EMBEDDED_CODE_PATTERN: &str = r"^\d{1,4}(?:[.-]\d{1,4}){1,5}$";

/// Whole-token calendar dates (`31-12-2023`, `2023.12.31`) that the embedded
/// code pattern would otherwise accept.
pub const DATE_PATTERN: &str =
    r"^(?:\d{1,2}[-/.]\d{1,2}[-/.](?:\d{4}|\d{2})|\d{4}[-/.]\d{1,2}[-/.]\d{1,2})$";

pub const TECHNICAL_RESERVE_CODES: &[(CodeFamily, &str)] =
    &[(CodeFamily::Dashed, "304-"), (CodeFamily::Dotted, "4.401")];

pub const WRITTEN_PREMIUM_CODES: &[(CodeFamily, &str)] =
    &[(CodeFamily::Dotted, "3.101"), (CodeFamily::Dotted, "3.102")];

/// Prefixes of the standard commercial numeric-dot plan.
pub const STANDARD_PLAN_PREFIXES: &[&str] = &["1.0.", "2.0.", "3.0.", "4.0.", "5.0.", "5.1."];

fn in_family_list(code: &str, list: &[(CodeFamily, &str)]) -> bool {
    list.iter()
        .any(|(family, prefix)| code_has_prefix(code, *family, prefix))
}

pub fn is_technical_reserve_code(code: &str) -> bool {
    in_family_list(code, TECHNICAL_RESERVE_CODES)
}

pub fn is_written_premium_code(code: &str) -> bool {
    in_family_list(code, WRITTEN_PREMIUM_CODES)
}

pub fn is_standard_plan_code(code: &str) -> bool {
    let code = code.trim();
    CodeFamily::detect(code) == Some(CodeFamily::Dotted)
        && STANDARD_PLAN_PREFIXES.iter().any(|p| code.starts_with(p))
}

/// The full ordered rule table: exclusions first, then each category's code
/// prefixes (dashed, dotted, flat) followed by its description keywords.
pub fn default_rules() -> Vec<Rule> {
    let mut rules: Vec<Rule> = EXCLUSIONS
        .iter()
        .map(|(category, matcher)| Rule::Exclude {
            category: *category,
            matcher: matcher.clone(),
        })
        .collect();

    for convention in CONVENTIONS {
        let families = [
            (CodeFamily::Dashed, convention.dashed),
            (CodeFamily::Dotted, convention.dotted),
            (CodeFamily::Flat, convention.flat),
        ];

        for (family, prefixes) in families {
            for prefix in prefixes {
                rules.push(Rule::Assign {
                    category: convention.category,
                    matcher: Matcher::CodePrefix {
                        family,
                        prefix: *prefix,
                    },
                });
            }
        }

        for terms in convention.keywords {
            rules.push(Rule::Assign {
                category: convention.category,
                matcher: Matcher::Keywords(*terms),
            });
        }
    }

    rules
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Section {
    CurrentAssets,
    NonCurrentAssets,
    CurrentLiabilities,
    NonCurrentLiabilities,
    Equity,
    Revenue,
    CostOfSales,
    Expenses,
    Unclassified,
}

pub fn section_of(category: Category) -> Section {
    match category {
        Category::Cash
        | Category::Receivables
        | Category::Inventory
        | Category::OtherCurrentAsset => Section::CurrentAssets,
        Category::FixedAsset | Category::IntangibleAsset => Section::NonCurrentAssets,
        Category::AccountsPayable
        | Category::ShortTermDebt
        | Category::OtherCurrentLiability => Section::CurrentLiabilities,
        Category::LongTermDebt => Section::NonCurrentLiabilities,
        Category::Equity | Category::RetainedEarnings => Section::Equity,
        Category::Revenue => Section::Revenue,
        Category::CostOfSales => Section::CostOfSales,
        Category::FinancialExpense | Category::OperatingExpense => Section::Expenses,
        Category::Unclassified => Section::Unclassified,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AccountEntry {
    pub name: String,
    pub code: Option<String>,
    pub category: Category,
    pub value: f64,
    pub tier: Option<MatchTier>,
}

/// Audit register: every valued row, grouped by the statement section it fed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChartOfAccounts {
    pub current_assets: Vec<AccountEntry>,
    pub non_current_assets: Vec<AccountEntry>,
    pub current_liabilities: Vec<AccountEntry>,
    pub non_current_liabilities: Vec<AccountEntry>,
    pub equity: Vec<AccountEntry>,
    pub revenue: Vec<AccountEntry>,
    pub cost_of_sales: Vec<AccountEntry>,
    pub expenses: Vec<AccountEntry>,
    pub unclassified: Vec<AccountEntry>,
}

impl ChartOfAccounts {
    pub fn from_classified_rows(rows: &[ClassifiedRow]) -> Self {
        let mut chart = Self::default();

        for row in rows {
            let entry = AccountEntry {
                name: row.label(),
                code: row.code.clone(),
                category: row.category,
                value: row.value,
                tier: row.tier,
            };

            chart.section_mut(section_of(row.category)).push(entry);
        }

        for section in chart.sections_mut() {
            section.sort_by(|a, b| {
                a.code
                    .cmp(&b.code)
                    .then_with(|| a.name.cmp(&b.name))
                    .then_with(|| a.value.total_cmp(&b.value))
            });
        }

        chart
    }

    fn section_mut(&mut self, section: Section) -> &mut Vec<AccountEntry> {
        match section {
            Section::CurrentAssets => &mut self.current_assets,
            Section::NonCurrentAssets => &mut self.non_current_assets,
            Section::CurrentLiabilities => &mut self.current_liabilities,
            Section::NonCurrentLiabilities => &mut self.non_current_liabilities,
            Section::Equity => &mut self.equity,
            Section::Revenue => &mut self.revenue,
            Section::CostOfSales => &mut self.cost_of_sales,
            Section::Expenses => &mut self.expenses,
            Section::Unclassified => &mut self.unclassified,
        }
    }

    fn sections_mut(&mut self) -> [&mut Vec<AccountEntry>; 9] {
        [
            &mut self.current_assets,
            &mut self.non_current_assets,
            &mut self.current_liabilities,
            &mut self.non_current_liabilities,
            &mut self.equity,
            &mut self.revenue,
            &mut self.cost_of_sales,
            &mut self.expenses,
            &mut self.unclassified,
        ]
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str("# Chart of Accounts\n\n");

        output.push_str("## Balance Sheet\n\n");
        push_section(&mut output, "Current Assets", &self.current_assets);
        push_section(&mut output, "Non-Current Assets", &self.non_current_assets);
        push_section(&mut output, "Current Liabilities", &self.current_liabilities);
        push_section(&mut output, "Non-Current Liabilities", &self.non_current_liabilities);
        push_section(&mut output, "Equity", &self.equity);

        output.push_str("## Income Statement\n\n");
        push_section(&mut output, "Revenue", &self.revenue);
        push_section(&mut output, "Cost of Sales", &self.cost_of_sales);
        push_section(&mut output, "Expenses", &self.expenses);

        if !self.unclassified.is_empty() {
            output.push_str("## Unclassified\n\n");
            for account in &self.unclassified {
                output.push_str(&format!(
                    "- {} {}\n",
                    account_heading(account),
                    format_amount(account.value)
                ));
            }
            output.push('\n');
        }

        output
    }

    pub fn total_accounts(&self) -> usize {
        self.classified_accounts() + self.unclassified.len()
    }

    pub fn classified_accounts(&self) -> usize {
        self.current_assets.len()
            + self.non_current_assets.len()
            + self.current_liabilities.len()
            + self.non_current_liabilities.len()
            + self.equity.len()
            + self.revenue.len()
            + self.cost_of_sales.len()
            + self.expenses.len()
    }

    /// Accounts that were only recognized by free-text mining.
    pub fn low_confidence_accounts(&self) -> impl Iterator<Item = &AccountEntry> {
        self.current_assets
            .iter()
            .chain(self.non_current_assets.iter())
            .chain(self.current_liabilities.iter())
            .chain(self.non_current_liabilities.iter())
            .chain(self.equity.iter())
            .chain(self.revenue.iter())
            .chain(self.cost_of_sales.iter())
            .chain(self.expenses.iter())
            .filter(|a| a.tier == Some(MatchTier::TextPattern))
    }
}

fn account_heading(account: &AccountEntry) -> String {
    match &account.code {
        Some(code) => format!("`{}` {}", code, account.name),
        None => account.name.clone(),
    }
}

fn push_section(output: &mut String, title: &str, accounts: &[AccountEntry]) {
    output.push_str(&format!("### {}\n\n", title));
    for account in accounts {
        let marker = if account.tier == Some(MatchTier::TextPattern) {
            " **[TEXT MATCH]**"
        } else {
            ""
        };
        output.push_str(&format!(
            "- {} ({}) {}{}\n",
            account_heading(account),
            account.category.label(),
            format_amount(account.value),
            marker
        ));
    }
    output.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classified(code: &str, name: &str, value: f64, category: Category, tier: MatchTier) -> ClassifiedRow {
        ClassifiedRow {
            code: Some(code.to_string()),
            description: Some(name.to_string()),
            value,
            category,
            tier: Some(tier),
            header_noise: false,
        }
    }

    #[test]
    fn test_code_family_detection() {
        assert_eq!(CodeFamily::detect("201-01-001"), Some(CodeFamily::Dashed));
        assert_eq!(CodeFamily::detect("4.401.01"), Some(CodeFamily::Dotted));
        assert_eq!(CodeFamily::detect(" 1101 "), Some(CodeFamily::Flat));
        assert_eq!(CodeFamily::detect("ABC"), None);
        assert_eq!(CodeFamily::detect(""), None);
    }

    #[test]
    fn test_prefix_is_scoped_to_family() {
        assert!(code_has_prefix("304-01-002", CodeFamily::Dashed, "304-"));
        assert!(!code_has_prefix("3041", CodeFamily::Dashed, "304"));
        assert!(code_has_prefix("3041", CodeFamily::Flat, "3"));
        assert!(!code_has_prefix("3.0.1", CodeFamily::Flat, "3"));
    }

    #[test]
    fn test_insurance_code_families() {
        assert!(is_technical_reserve_code("304-01-001"));
        assert!(is_technical_reserve_code("4.401.02"));
        assert!(!is_technical_reserve_code("4401"));
        assert!(is_written_premium_code("3.101.01"));
        assert!(is_written_premium_code("3.102"));
        assert!(!is_written_premium_code("3.201"));
    }

    #[test]
    fn test_standard_plan_detection() {
        assert!(is_standard_plan_code("1.0.1.01"));
        assert!(is_standard_plan_code("5.1.02"));
        assert!(!is_standard_plan_code("1.101"));
        assert!(!is_standard_plan_code("1101"));
    }

    #[test]
    fn test_rule_table_puts_exclusions_first() {
        let rules = default_rules();
        let first_assign = rules
            .iter()
            .position(|r| matches!(r, Rule::Assign { .. }))
            .unwrap();
        assert!(rules[..first_assign]
            .iter()
            .all(|r| matches!(r, Rule::Exclude { .. })));
        assert!(rules[first_assign..]
            .iter()
            .all(|r| matches!(r, Rule::Assign { .. })));
        assert!(matches!(
            &rules[first_assign],
            Rule::Assign { category: Category::Cash, .. }
        ));
    }

    #[test]
    fn test_rule_table_follows_evaluation_order() {
        let mut order: Vec<Category> = Vec::new();
        for rule in default_rules() {
            if let Rule::Assign { category, .. } = rule {
                if order.last() != Some(&category) {
                    order.push(category);
                }
            }
        }
        assert_eq!(order, Category::EVALUATION_ORDER.to_vec());
    }

    #[test]
    fn test_keyword_matcher_requires_all_terms() {
        let matcher = Matcher::Keywords(&["prestamo", "largo"]);
        assert!(matcher.matches(None, Some("prestamo bancario a largo plazo")));
        assert!(!matcher.matches(None, Some("prestamo bancario")));
        assert!(!matcher.matches(Some("2201"), None));
    }

    #[test]
    fn test_chart_groups_rows_by_section() {
        let rows = vec![
            classified("201-01-001", "Caja General", 50_000.0, Category::Cash, MatchTier::Code),
            classified("301-01-001", "Proveedores", -120_000.0, Category::AccountsPayable, MatchTier::Code),
            classified("4-01-001", "Ventas", 1_200_000.0, Category::Revenue, MatchTier::Code),
            ClassifiedRow {
                code: None,
                description: Some("Otros".to_string()),
                value: 5.0,
                category: Category::Unclassified,
                tier: None,
                header_noise: false,
            },
        ];

        let chart = ChartOfAccounts::from_classified_rows(&rows);

        assert_eq!(chart.current_assets.len(), 1);
        assert_eq!(chart.current_liabilities.len(), 1);
        assert_eq!(chart.revenue.len(), 1);
        assert_eq!(chart.unclassified.len(), 1);
        assert_eq!(chart.classified_accounts(), 3);
        assert_eq!(chart.total_accounts(), 4);
    }

    #[test]
    fn test_chart_to_markdown() {
        let rows = vec![
            classified("201-01-001", "Caja General", 50_000.0, Category::Cash, MatchTier::Code),
            classified("4.401", "Reservas", -10.0, Category::LongTermDebt, MatchTier::TextPattern),
        ];

        let chart = ChartOfAccounts::from_classified_rows(&rows);
        let markdown = chart.to_markdown();

        assert!(markdown.contains("# Chart of Accounts"));
        assert!(markdown.contains("`201-01-001` Caja General (Cash) 50,000.00"));
        assert!(markdown.contains("[TEXT MATCH]"));
        assert!(!markdown.contains("## Unclassified"));
        assert_eq!(chart.low_confidence_accounts().count(), 1);
    }

    #[test]
    fn test_chart_order_ignores_input_order_for_repeated_accounts() {
        let first = classified("1101", "Caja", 300.0, Category::Cash, MatchTier::Code);
        let second = classified("1101", "Caja", -20.0, Category::Cash, MatchTier::Code);
        let third = classified("1101", "Caja", 75.0, Category::Cash, MatchTier::Code);

        let forward = ChartOfAccounts::from_classified_rows(&[first.clone(), second.clone(), third.clone()]);
        let reversed = ChartOfAccounts::from_classified_rows(&[third, second, first]);

        assert_eq!(forward, reversed);
        let values: Vec<f64> = forward.current_assets.iter().map(|e| e.value).collect();
        assert_eq!(values, vec![-20.0, 75.0, 300.0]);
    }
}
