/// Division that never produces NaN or infinity: a zero denominator or a
/// non-finite quotient yields 0.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }

    let ratio = numerator / denominator;
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}

/// `safe_ratio` expressed in percent.
pub fn safe_percentage(numerator: f64, denominator: f64) -> f64 {
    safe_ratio(numerator, denominator) * 100.0
}

/// Lowercases and strips Spanish diacritics so "Préstamo" and "PRESTAMO" compare equal.
pub fn normalize_text(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

pub fn format_ratio(value: f64) -> String {
    format!("{:.2}", value)
}

/// Formats a value that is already a percentage (e.g. `12.5` -> `"12.5%"`).
pub fn format_percentage(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Two decimals with comma thousands grouping: `-1234567.891` -> `"-1,234,567.89"`.
pub fn format_amount(value: f64) -> String {
    if !value.is_finite() {
        return "0.00".to_string();
    }

    let fixed = format!("{:.2}", value.abs());
    let (integer, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (idx, digit) in integer.chars().enumerate() {
        if idx > 0 && (integer.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, fraction)
}
