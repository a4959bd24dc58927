use anyhow::{Context, Result};
use ledger_insights::*;
use std::path::{Path, PathBuf};

/// Reads a trial-balance CSV export into raw rows, one field per column header.
fn load_rows(path: &Path) -> Result<Vec<RawRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let headers = rdr.headers()?.clone();
    let mut rows = Vec::new();

    for record in rdr.records() {
        let record = record?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .filter(|(_, cell)| !cell.trim().is_empty())
            .map(|(header, cell)| (header.trim(), cell.trim()))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

/// The bundled sample is a closing balance in `SaldoActual`: assets and
/// expenses positive, liabilities and equity in parentheses, revenue positive.
/// Revenue is summed with the sign the export gives it.
fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("demos/sample_trial_balance.csv"));

    let rows = load_rows(&path)?;
    println!("📥 Loaded {} rows from {}\n", rows.len(), path.display());

    let analyzer = FinancialAnalyzer::new(AnalysisConfig::default())?;
    let analysis = analyzer.analyze(&rows)?;

    let sheet = &analysis.statements.balance_sheet;
    let income = &analysis.statements.income_statement;

    println!("📊 Balance Sheet");
    println!("   Current assets:      {:>15}", format_amount(sheet.current_assets));
    println!("   Total assets:        {:>15}", format_amount(sheet.total_assets));
    println!("   Total liabilities:   {:>15}", format_amount(sheet.total_liabilities));
    println!("   Total equity:        {:>15}", format_amount(sheet.total_equity));

    println!("\n📈 Income Statement");
    println!("   Revenue:             {:>15}", format_amount(income.revenue));
    println!("   Gross profit:        {:>15}", format_amount(income.gross_profit));
    println!("   Net income:          {:>15}", format_amount(income.net_income));

    let validation = &analysis.insights.validation;
    if validation.is_valid {
        println!("\n✅ Accounting equation holds (difference {})", format_amount(validation.difference));
    } else if let Some(message) = &validation.error_message {
        println!("\n❌ {}", message);
    }

    println!("\n🚨 Alerts");
    for alert in &analysis.insights.alerts {
        println!("   [{:?}] {}", alert.severity, alert.message);
    }

    println!("\n💡 Recommendations");
    for rec in &analysis.insights.recommendations {
        println!("   [{:?}] {}", rec.tone, rec.message);
    }

    println!("\n{}", analysis.insights.executive_summary);

    let quality = &analysis.data_quality;
    println!(
        "\n🔎 Data quality: {} rows, {} valued, {} skipped at zero, {} header lines, {:.1}% classified",
        quality.total_rows,
        quality.valued_rows,
        quality.zero_value_rows,
        quality.header_noise_rows,
        quality.coverage()
    );
    if quality.unparsable_amount_rows + quality.unexpected_sign_rows + quality.duplicate_codes > 0 {
        println!(
            "   ⚠️  {} unreadable amounts, {} unexpected signs, {} repeated codes",
            quality.unparsable_amount_rows, quality.unexpected_sign_rows, quality.duplicate_codes
        );
    }

    println!("\n{}", analysis.chart.to_markdown());

    Ok(())
}
