use crate::schema::RawRow;
use log::debug;
use serde_json::Value;

pub const CODE_FIELDS: &[&str] = &[
    "Codigo",
    "codigo",
    "Código",
    "código",
    "Code",
    "code",
    "CodigoCuenta",
    "AccountCode",
];

pub const DESCRIPTION_FIELDS: &[&str] = &[
    "Descripcion",
    "descripcion",
    "Descripción",
    "descripción",
    "Description",
    "description",
    "Cuenta",
    "cuenta",
    "Account",
    "account",
    "Concepto",
    "concepto",
    "Item",
    "item",
    "NombreCuenta",
];

pub const CURRENT_BALANCE_FIELDS: &[&str] = &[
    "SaldoActual",
    "saldoactual",
    "saldoActual",
    "Saldo Actual",
    "saldo_actual",
    "CurrentBalance",
    "current_balance",
];

pub const BALANCE_FIELDS: &[&str] = &["Saldo", "saldo", "Balance", "balance"];

pub const DEBIT_FIELDS: &[&str] = &[
    "Debitos", "debitos", "Débitos", "débitos", "Debits", "debits",
];

pub const CREDIT_FIELDS: &[&str] = &[
    "Creditos", "creditos", "Créditos", "créditos", "Credits", "credits",
];

pub const OPENING_BALANCE_FIELDS: &[&str] = &[
    "SaldoInicial",
    "saldoinicial",
    "Saldo Inicial",
    "saldo_inicial",
    "OpeningBalance",
    "opening_balance",
];

pub const DEBTOR_BALANCE_FIELDS: &[&str] = &["SaldoDeudor", "saldodeudor", "Saldo Deudor"];

pub const CREDITOR_BALANCE_FIELDS: &[&str] = &["SaldoAcreedor", "saldoacreedor", "Saldo Acreedor"];

pub const DEBE_FIELDS: &[&str] = &["Debe", "debe"];

pub const HABER_FIELDS: &[&str] = &["Haber", "haber"];

pub const GENERIC_AMOUNT_FIELDS: &[&str] = &[
    "Valor", "valor", "Value", "value", "Monto", "monto", "Amount", "amount", "Importe",
    "importe", "Total", "total",
];

/// Which column convention supplied a row's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    CurrentBalance,
    Balance,
    DebitCredit,
    DebtorCreditor,
    DebeHaber,
    Generic,
}

/// A field counts as populated when it holds a number or a non-blank string.
pub fn is_populated(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => !s.trim().is_empty(),
        _ => false,
    }
}

fn first_populated<'a>(row: &'a RawRow, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|alias| row.get(alias))
        .find(|value| is_populated(value))
}

fn amount_or_zero(row: &RawRow, aliases: &[&str]) -> f64 {
    first_populated(row, aliases).map(value_to_amount).unwrap_or(0.0)
}

fn has_any(row: &RawRow, aliases: &[&str]) -> bool {
    first_populated(row, aliases).is_some()
}

/// Converts a JSON cell into a number. Unusable cells yield 0.
pub fn value_to_amount(value: &Value) -> f64 {
    amount_of(value).unwrap_or(0.0)
}

/// Like [`value_to_amount`], but `None` when the cell holds something that is
/// not a number (`"N/A"`, `true`, an array).
pub fn amount_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_amount_checked(s),
        Value::Null => Some(0.0),
        _ => None,
    }
}

/// Parses a locale-formatted amount such as `"1.234,56"`, `"1,234.56"`,
/// `"(250.00)"` or `"1.500,00-"`.
///
/// The rightmost separator is the decimal one when both appear. A lone comma is
/// decimal when at most three digits follow it. Anything unparsable is 0.
pub fn parse_amount(text: &str) -> f64 {
    parse_amount_checked(text).unwrap_or_else(|| {
        debug!("Could not parse amount '{}', treating as 0", text);
        0.0
    })
}

/// [`parse_amount`] without the fallback. Blank cells and a bare `-` (a common
/// zero placeholder) read as 0.
pub fn parse_amount_checked(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '-') {
        return Some(0.0);
    }

    let wrapped = trimmed.len() >= 2 && trimmed.starts_with('(') && trimmed.ends_with(')');

    let cleaned: String = trimmed
        .chars()
        .filter(|&c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();

    let negative = wrapped || cleaned.starts_with('-') || cleaned.ends_with('-');
    let body: String = cleaned.chars().filter(|c| *c != '-').collect();
    let body = body.trim_matches(|c| c == ',' || c == '.');

    if body.is_empty() {
        return None;
    }

    let parsed = normalize_separators(body)
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())?;

    Some(if negative { -parsed } else { parsed })
}

fn normalize_separators(body: &str) -> String {
    let comma_count = body.matches(',').count();
    let dot_count = body.matches('.').count();

    match (comma_count, dot_count) {
        (0, 0) => body.to_string(),
        (c, d) if c > 0 && d > 0 => {
            let decimal_pos = body.rfind([',', '.']).unwrap_or(body.len());
            let (integer, fraction) = body.split_at(decimal_pos);
            let integer: String = integer.chars().filter(char::is_ascii_digit).collect();
            let fraction: String = fraction.chars().filter(char::is_ascii_digit).collect();
            format!("{}.{}", integer, fraction)
        }
        (1, 0) => {
            let (integer, fraction) = body.split_once(',').unwrap_or((body, ""));
            if fraction.len() <= 3 {
                format!("{}.{}", integer, fraction)
            } else {
                format!("{}{}", integer, fraction)
            }
        }
        (_, 0) => body.replace(',', ""),
        (0, 1) => body.to_string(),
        _ => body.replace('.', ""),
    }
}

/// Picks the row's signed value from the first populated column convention.
pub fn extract_value_with_source(row: &RawRow) -> Option<(f64, ValueSource)> {
    if let Some(value) = first_populated(row, CURRENT_BALANCE_FIELDS) {
        return Some((value_to_amount(value), ValueSource::CurrentBalance));
    }

    if let Some(value) = first_populated(row, BALANCE_FIELDS) {
        return Some((value_to_amount(value), ValueSource::Balance));
    }

    if has_any(row, DEBIT_FIELDS) || has_any(row, CREDIT_FIELDS) {
        let opening = amount_or_zero(row, OPENING_BALANCE_FIELDS);
        let debits = amount_or_zero(row, DEBIT_FIELDS);
        let credits = amount_or_zero(row, CREDIT_FIELDS);
        return Some((opening + debits - credits, ValueSource::DebitCredit));
    }

    if has_any(row, DEBTOR_BALANCE_FIELDS) || has_any(row, CREDITOR_BALANCE_FIELDS) {
        let debtor = amount_or_zero(row, DEBTOR_BALANCE_FIELDS);
        let creditor = amount_or_zero(row, CREDITOR_BALANCE_FIELDS);
        return Some((debtor - creditor, ValueSource::DebtorCreditor));
    }

    if has_any(row, DEBE_FIELDS) || has_any(row, HABER_FIELDS) {
        let debe = amount_or_zero(row, DEBE_FIELDS);
        let haber = amount_or_zero(row, HABER_FIELDS);
        return Some((debe - haber, ValueSource::DebeHaber));
    }

    first_populated(row, GENERIC_AMOUNT_FIELDS)
        .map(|value| (value_to_amount(value), ValueSource::Generic))
}

/// The row's signed value, or 0 when no numeric column is usable.
pub fn extract_value(row: &RawRow) -> f64 {
    extract_value_with_source(row)
        .map(|(value, _)| value)
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn extract_code(row: &RawRow) -> Option<String> {
    first_populated(row, CODE_FIELDS).and_then(text_of)
}

pub fn extract_description(row: &RawRow) -> Option<String> {
    first_populated(row, DESCRIPTION_FIELDS).and_then(text_of)
}

const AMOUNT_FIELD_GROUPS: &[&[&str]] = &[
    CURRENT_BALANCE_FIELDS,
    BALANCE_FIELDS,
    DEBIT_FIELDS,
    CREDIT_FIELDS,
    OPENING_BALANCE_FIELDS,
    DEBTOR_BALANCE_FIELDS,
    CREDITOR_BALANCE_FIELDS,
    DEBE_FIELDS,
    HABER_FIELDS,
    GENERIC_AMOUNT_FIELDS,
];

fn is_amount_field(field: &str) -> bool {
    AMOUNT_FIELD_GROUPS
        .iter()
        .any(|group| group.contains(&field))
}

/// True when any populated amount column holds something that is not a number.
pub fn has_unparsable_amount(row: &RawRow) -> bool {
    row.fields()
        .filter(|(field, value)| is_amount_field(field) && is_populated(value))
        .any(|(_, value)| amount_of(value).is_none())
}

/// String cells of the row joined with spaces, amount columns left out.
/// Used by free-text matching.
pub fn row_text(row: &RawRow) -> String {
    row.fields()
        .filter(|(field, _)| !is_amount_field(field))
        .filter_map(|(_, value)| match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> RawRow {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_amount_locales() {
        assert!((parse_amount("1.234,56") - 1234.56).abs() < 1e-9);
        assert!((parse_amount("1,234.56") - 1234.56).abs() < 1e-9);
        assert!((parse_amount("1.234.567") - 1234567.0).abs() < 1e-9);
        assert!((parse_amount("1,234,567") - 1234567.0).abs() < 1e-9);
        assert!((parse_amount("12,5") - 12.5).abs() < 1e-9);
        assert!((parse_amount("1234,5678") - 12345678.0).abs() < 1e-9);
        assert!((parse_amount("Bs. 1.500,75") - 1500.75).abs() < 1e-9);
    }

    #[test]
    fn test_parse_amount_negative_forms() {
        assert!((parse_amount("(250.00)") + 250.0).abs() < 1e-9);
        assert!((parse_amount("-1.234,56") + 1234.56).abs() < 1e-9);
        assert!((parse_amount("1.500,00-") + 1500.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_amount_garbage_is_zero() {
        assert_eq!(parse_amount(""), 0.0);
        assert_eq!(parse_amount("N/A"), 0.0);
        assert_eq!(parse_amount("--"), 0.0);
        assert_eq!(parse_amount("()"), 0.0);
    }

    #[test]
    fn test_checked_parse_separates_placeholders_from_garbage() {
        assert_eq!(parse_amount_checked("-"), Some(0.0));
        assert_eq!(parse_amount_checked("  "), Some(0.0));
        assert_eq!(parse_amount_checked("(1.000,00)"), Some(-1000.0));
        assert_eq!(parse_amount_checked("N/A"), None);
        assert_eq!(parse_amount_checked("()"), None);

        assert_eq!(amount_of(&json!(12.5)), Some(12.5));
        assert_eq!(amount_of(&json!(true)), None);
        assert_eq!(value_to_amount(&json!("sin saldo")), 0.0);
    }

    #[test]
    fn test_unparsable_amount_detection_ignores_text_columns() {
        assert!(has_unparsable_amount(&row(json!({ "Codigo": "1101", "Saldo": "error" }))));
        assert!(has_unparsable_amount(&row(json!({ "Debe": "100", "Haber": "n.d." }))));
        assert!(!has_unparsable_amount(&row(json!({ "Descripcion": "Caja", "Saldo": "1.500,00" }))));
        assert!(!has_unparsable_amount(&row(json!({ "Descripcion": "Caja", "Saldo": "" }))));
    }

    #[test]
    fn test_current_balance_wins() {
        let r = row(json!({
            "SaldoActual": "1.234,56",
            "Saldo": 99,
            "Valor": 12
        }));
        assert!((extract_value(&r) - 1234.56).abs() < 1e-9);
        assert_eq!(
            extract_value_with_source(&r).map(|(_, s)| s),
            Some(ValueSource::CurrentBalance)
        );
    }

    #[test]
    fn test_blank_current_balance_falls_through() {
        let r = row(json!({ "SaldoActual": "  ", "Saldo": null, "balance": "300" }));
        assert_eq!(extract_value(&r), 300.0);
    }

    #[test]
    fn test_debit_credit_with_opening_balance() {
        let r = row(json!({ "Debitos": 500, "Creditos": 200, "SaldoInicial": 100 }));
        assert_eq!(extract_value(&r), 400.0);
        assert_eq!(
            extract_value_with_source(&r).map(|(_, s)| s),
            Some(ValueSource::DebitCredit)
        );

        let accented = row(json!({ "Débitos": "1.000,00", "Créditos": "250,00" }));
        assert_eq!(extract_value(&accented), 750.0);
    }

    #[test]
    fn test_debtor_creditor_and_debe_haber() {
        let r = row(json!({ "SaldoDeudor": 0, "SaldoAcreedor": "45.000,00" }));
        assert_eq!(extract_value(&r), -45000.0);

        let r = row(json!({ "Debe": 800, "Haber": 300 }));
        assert_eq!(extract_value(&r), 500.0);
    }

    #[test]
    fn test_generic_amount_fields() {
        assert_eq!(extract_value(&row(json!({ "Monto": "2,500.00" }))), 2500.0);
        assert_eq!(extract_value(&row(json!({ "Importe": -10 }))), -10.0);
    }

    #[test]
    fn test_no_numeric_fields_is_zero() {
        let r = row(json!({ "Codigo": "1101", "Descripcion": "Caja" }));
        assert_eq!(extract_value(&r), 0.0);
        assert!(extract_value_with_source(&r).is_none());
    }

    #[test]
    fn test_code_and_description_accessors() {
        let r = row(json!({ "Código": 1101, "Descripción": "  Caja chica  " }));
        assert_eq!(extract_code(&r).as_deref(), Some("1101"));
        assert_eq!(extract_description(&r).as_deref(), Some("Caja chica"));

        let empty = row(json!({ "Codigo": "", "Cuenta": null }));
        assert_eq!(extract_code(&empty), None);
        assert_eq!(extract_description(&empty), None);
    }

    #[test]
    fn test_row_text_joins_string_cells() {
        let r = row(json!({ "A": "4.401", "B": "Reservas", "C": 12, "Saldo": "1.500" }));
        assert_eq!(row_text(&r), "4.401 Reservas");
    }
}
