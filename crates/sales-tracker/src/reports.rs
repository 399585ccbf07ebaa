//! Report generation (CSV outputs, JSON and console dashboard)

use anyhow::{Context, Result};
use csv::Writer;
use rust_decimal::{Decimal, RoundingStrategy};
use sales_metrics::format::{format_eur, format_percent};
use sales_metrics::{
    monthly_summaries, CloserStats, Dashboard, Expense, MonthSelector, Sale, Stage, Summary,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Style};
use tabled::{Table, Tabled};

use crate::access::Viewer;
use crate::constants;

/// Inputs for the CSV reports: the viewer's records, the month selection
/// and the dashboard already built from them
pub struct ReportData<'a> {
    /// Records already scoped to the viewer, not yet month-filtered
    pub sales: &'a [Sale],
    pub expenses: &'a [Expense],
    pub selector: &'a MonthSelector,
    pub dashboard: &'a Dashboard,
}

/// Generate all CSV reports, returning the files written
pub fn generate_all_reports(output_dir: &Path, data: &ReportData) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let summary_path = output_dir.join(constants::SUMMARY_FILENAME);
    write_summary(create(&summary_path)?, data)?;

    let closers_path = output_dir.join(constants::CLOSERS_FILENAME);
    write_closers(create(&closers_path)?, &data.dashboard.by_closer)?;

    tracing::debug!(dir = %output_dir.display(), "reports written");
    Ok(vec![summary_path, closers_path])
}

fn create(path: &Path) -> Result<std::fs::File> {
    std::fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))
}

/// summary.csv: one row per month in the selection, then the selection total
fn write_summary<W: Write>(out: W, data: &ReportData) -> Result<()> {
    let mut wtr = Writer::from_writer(out);
    wtr.write_record([
        "month",
        "total_leads",
        "deals",
        "revenue",
        "expenses",
        "profit",
        "roi_percent",
    ])?;

    let months = monthly_summaries(data.sales, data.expenses);
    for (month, summary) in months.iter().filter(|(month, _)| match data.selector {
        MonthSelector::All => true,
        MonthSelector::Month(selected) => month == selected,
        MonthSelector::Unmatched(_) => false,
    }) {
        write_summary_row(&mut wtr, &month.to_string(), summary)?;
    }

    write_summary_row(&mut wtr, "TOTAL", &data.dashboard.summary)?;

    wtr.flush()?;
    Ok(())
}

fn write_summary_row<W: Write>(wtr: &mut Writer<W>, label: &str, summary: &Summary) -> Result<()> {
    wtr.write_record([
        label,
        &summary.total_leads.to_string(),
        &summary.deals.to_string(),
        &money(summary.revenue),
        &money(summary.expenses_total),
        &money(summary.profit),
        &summary.roi.to_string(),
    ])?;
    Ok(())
}

/// closers.csv: closed-sale totals per closer plus a TOTAL row
fn write_closers<W: Write>(out: W, closers: &[CloserStats]) -> Result<()> {
    let mut wtr = Writer::from_writer(out);
    wtr.write_record(["closer", "full", "installment", "total", "deals", "roi_percent"])?;

    let mut full = Decimal::ZERO;
    let mut installment = Decimal::ZERO;
    let mut deals = 0u64;

    for c in closers {
        wtr.write_record([
            c.closer.as_str(),
            &money(c.full),
            &money(c.installment),
            &money(c.total),
            &c.deals.to_string(),
            &c.roi.map(|r| r.to_string()).unwrap_or_default(),
        ])?;
        full += c.full;
        installment += c.installment;
        deals += c.deals;
    }

    wtr.write_record([
        "TOTAL",
        &money(full),
        &money(installment),
        &money(full + installment),
        &deals.to_string(),
        "", // No ROI for the team row
    ])?;

    wtr.flush()?;
    Ok(())
}

/// Plain two-decimal amount for CSV cells
fn money(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}", normalize_zero(rounded))
}

/// Normalize -0 to 0 for cleaner display
fn normalize_zero(val: Decimal) -> Decimal {
    if val.is_zero() {
        Decimal::ZERO
    } else {
        val
    }
}

/// Dashboard as pretty JSON (camelCase keys, amounts as numbers)
pub fn dashboard_json(dashboard: &Dashboard) -> Result<String> {
    Ok(serde_json::to_string_pretty(dashboard)?)
}

// =============================================================================
// Console
// =============================================================================

#[derive(Tabled)]
struct CloserRow {
    #[tabled(rename = "Closer")]
    closer: String,
    #[tabled(rename = "Full")]
    full: String,
    #[tabled(rename = "Installment")]
    installment: String,
    #[tabled(rename = "Total")]
    total: String,
    #[tabled(rename = "Deals")]
    deals: u64,
    #[tabled(rename = "ROI")]
    roi: String,
}

impl From<&CloserStats> for CloserRow {
    fn from(c: &CloserStats) -> Self {
        Self {
            closer: c.closer.clone(),
            full: format_eur(c.full),
            installment: format_eur(c.installment),
            total: format_eur(c.total),
            deals: c.deals,
            roi: c.roi.map(format_percent).unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Banner line for a dashboard narrowed to one closer
fn scope_note(viewer: &Viewer) -> Option<String> {
    match viewer {
        Viewer::Admin => None,
        Viewer::Closer(name) => Some(format!("Showing {}'s sales only", name)),
    }
}

/// Print dashboard to console
pub fn print_dashboard(dashboard: &Dashboard, viewer: &Viewer) {
    println!("\n============================================================");
    if dashboard.month == sales_metrics::month::ALL_TIME {
        println!("                 SALES DASHBOARD (all time)");
    } else {
        println!("                 SALES DASHBOARD ({})", dashboard.month);
    }
    println!("============================================================\n");

    if let Some(note) = scope_note(viewer) {
        println!("{}\n", note);
    }

    let s = &dashboard.summary;
    println!("SUMMARY:");
    println!("  Leads:          {:>16}", s.total_leads);
    println!("  Deals:          {:>16}", s.deals);
    println!("  Revenue:        {:>16}", format_eur(s.revenue));
    println!("  Expenses:       {:>16}", format_eur(s.expenses_total));
    println!("  ─────────────────────────────────");
    println!("  Profit:         {:>16}", format_eur(s.profit));
    println!("  ROI:            {:>16}", format_percent(s.roi));

    let f = &dashboard.funnel;
    println!("\nFUNNEL:");
    println!("  {:<14}  {:>16}", Stage::Leads.label(), f.leads_total);
    println!(
        "  {:<14}  {:>16}",
        Stage::TerminierungVerloren.label(),
        f.terminierung_verloren
    );
    println!("  {:<14}  {:>16}", Stage::NoShow.label(), f.no_show);
    println!("  {:<14}  {:>16}", Stage::Abschluesse.label(), f.abschluesse);

    println!("\nBY CLOSER:");
    if dashboard.by_closer.is_empty() {
        println!("  No closed sales in this period.");
    } else {
        let rows: Vec<CloserRow> = dashboard.by_closer.iter().map(CloserRow::from).collect();
        let mut table = Table::new(rows);
        table
            .with(Style::psql())
            .modify(Columns::new(1..), Alignment::right());
        println!("{}", table);
    }

    println!("============================================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use sales_metrics::{AggregateOptions, Payment};
    use std::num::NonZeroU32;

    fn sale(date: &str, amount: Decimal, payment: Payment, stage: Stage, closer: &str) -> Sale {
        Sale {
            id: None,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            amount,
            payment,
            stage,
            closer_name: closer.to_string(),
        }
    }

    fn expense(date: &str, amount: Decimal) -> Expense {
        Expense {
            id: None,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            amount,
            description: "Ads".to_string(),
            recorded_by: None,
        }
    }

    fn records() -> (Vec<Sale>, Vec<Expense>) {
        let installment = Payment::Installment {
            months: NonZeroU32::new(6).unwrap(),
            monthly_amount: dec!(500),
        };
        let sales = vec![
            sale("2025-01-20", dec!(1000), Payment::Full, Stage::Abschluesse, "Alex"),
            sale("2025-02-15", dec!(5000), Payment::Full, Stage::Abschluesse, "Alex"),
            sale("2025-02-20", dec!(3000), installment, Stage::Abschluesse, "Niklas"),
            sale("2025-02-21", dec!(0), Payment::Full, Stage::NoShow, "Alex"),
        ];
        let expenses = vec![expense("2025-01-05", dec!(100)), expense("2025-02-10", dec!(800))];
        (sales, expenses)
    }

    fn summary_csv(sales: &[Sale], expenses: &[Expense], selector: &MonthSelector) -> String {
        let dashboard = Dashboard::build(sales, expenses, selector, &AggregateOptions::default());
        let data = ReportData {
            sales,
            expenses,
            selector,
            dashboard: &dashboard,
        };
        let mut buf = Vec::new();
        write_summary(&mut buf, &data).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_summary_all_months() {
        let (sales, expenses) = records();
        let csv = summary_csv(&sales, &expenses, &MonthSelector::All);
        let lines: Vec<_> = csv.lines().collect();

        assert_eq!(lines[0], "month,total_leads,deals,revenue,expenses,profit,roi_percent");
        assert_eq!(lines[1], "2025-01,1,1,1000.00,100.00,900.00,900");
        assert_eq!(lines[2], "2025-02,3,2,8000.00,800.00,7200.00,900");
        assert_eq!(lines[3], "TOTAL,4,3,9000.00,900.00,8100.00,900");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_summary_single_month() {
        let (sales, expenses) = records();
        let selector = MonthSelector::parse("2025-01");
        let csv = summary_csv(&sales, &expenses, &selector);
        let lines: Vec<_> = csv.lines().collect();

        assert_eq!(lines[1], "2025-01,1,1,1000.00,100.00,900.00,900");
        assert_eq!(lines[2], "TOTAL,1,1,1000.00,100.00,900.00,900");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_summary_unmatched_month_has_zero_total() {
        let (sales, expenses) = records();
        let selector = MonthSelector::parse("February");
        let csv = summary_csv(&sales, &expenses, &selector);
        let lines: Vec<_> = csv.lines().collect();

        assert_eq!(lines[1], "TOTAL,0,0,0.00,0.00,0.00,0");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_closers_csv_with_total() {
        let (sales, expenses) = records();
        let selector = MonthSelector::parse("2025-02");
        let dashboard =
            Dashboard::build(&sales, &expenses, &selector, &AggregateOptions::default());

        let mut buf = Vec::new();
        write_closers(&mut buf, &dashboard.by_closer).unwrap();
        let csv = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = csv.lines().collect();

        assert_eq!(lines[0], "closer,full,installment,total,deals,roi_percent");
        assert_eq!(lines[1], "Alex,5000.00,0.00,5000.00,1,400");
        assert_eq!(lines[2], "Niklas,0.00,3000.00,3000.00,1,200");
        assert_eq!(lines[3], "TOTAL,5000.00,3000.00,8000.00,2,");
    }

    #[test]
    fn test_closers_csv_without_roi() {
        let (sales, expenses) = records();
        let options = AggregateOptions {
            closer_cost_baseline: None,
        };
        let dashboard = Dashboard::build(&sales, &expenses, &MonthSelector::All, &options);

        let mut buf = Vec::new();
        write_closers(&mut buf, &dashboard.by_closer).unwrap();
        let csv = String::from_utf8(buf).unwrap();

        assert!(csv.contains("Alex,6000.00,0.00,6000.00,2,\n"));
    }

    #[test]
    fn test_scope_note_names_the_closer() {
        assert_eq!(scope_note(&Viewer::Admin), None);
        assert_eq!(
            scope_note(&Viewer::Closer("Alex".to_string())).as_deref(),
            Some("Showing Alex's sales only")
        );
    }

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(dec!(1234.5)), "1234.50");
        assert_eq!(money(dec!(0.005)), "0.01");
        assert_eq!(money(dec!(-0)), "0.00");
        assert_eq!(money(dec!(-12.345)), "-12.35");
    }

    #[test]
    fn test_dashboard_json_shape() {
        let (sales, expenses) = records();
        let selector = MonthSelector::parse("2025-02");
        let dashboard =
            Dashboard::build(&sales, &expenses, &selector, &AggregateOptions::default());

        let value: serde_json::Value =
            serde_json::from_str(&dashboard_json(&dashboard).unwrap()).unwrap();
        assert_eq!(value["month"], "2025-02");
        assert_eq!(value["summary"]["revenue"], 8000.0);
        assert_eq!(value["summary"]["roi"], 900);
        assert_eq!(value["funnel"]["noShow"], 1);
        assert_eq!(value["byCloser"][0]["closer"], "Alex");
    }

    #[test]
    fn test_json_keeps_cents_of_largest_amount() {
        let sales = vec![sale(
            "2025-02-15",
            dec!(999999999999.99),
            Payment::Full,
            Stage::Abschluesse,
            "Alex",
        )];
        let dashboard =
            Dashboard::build(&sales, &[], &MonthSelector::All, &AggregateOptions::default());

        let json = dashboard_json(&dashboard).unwrap();
        assert!(json.contains("\"revenue\": 999999999999.99"));
        assert!(json.contains("\"total\": 999999999999.99"));
    }
}
