//! Dashboard aggregation: summary totals, funnel counts and per-closer breakdown
//!
//! All functions are pure and recompute from the records they are given.
//! Money is summed as exact decimals, so the order of records never changes a
//! total.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::collections::HashMap;

use crate::month::{filter_by_month, months_present, MonthKey, MonthSelector};
use crate::records::{Expense, PaymentType, Sale, Stage};

/// Flat per-closer cost assumed by the per-closer ROI (EUR)
pub const DEFAULT_CLOSER_COST_BASELINE: Decimal = Decimal::ONE_THOUSAND;

/// Knobs that change derived values but not totals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateOptions {
    /// Cost basis for per-closer ROI. `None` leaves the field out.
    ///
    /// This is a flat assumption per person, not expenses attributed to
    /// that closer, so the resulting ROI is only an approximation.
    pub closer_cost_baseline: Option<Decimal>,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            closer_cost_baseline: Some(DEFAULT_CLOSER_COST_BASELINE),
        }
    }
}

/// Headline numbers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Every sale in scope, whatever its stage
    pub total_leads: u64,
    /// Closed sales
    pub deals: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub expenses_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub profit: Decimal,
    /// Percent, 0 when there are no expenses
    pub roi: i64,
}

/// Funnel counters. `leads_total` is everything that entered the funnel;
/// a sale still in the LEADS stage is counted there only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Funnel {
    pub leads_total: u64,
    pub terminierung_verloren: u64,
    pub no_show: u64,
    pub abschluesse: u64,
}

/// Closed-sale totals for one closer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloserStats {
    pub closer: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub full: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub installment: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub deals: u64,
    /// Approximate: measured against the flat cost baseline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roi: Option<i64>,
}

/// Everything the dashboard shows for one selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub month: String,
    pub summary: Summary,
    pub funnel: Funnel,
    pub by_closer: Vec<CloserStats>,
}

impl Dashboard {
    /// Filter to the selected month, then aggregate
    pub fn build(
        sales: &[Sale],
        expenses: &[Expense],
        selector: &MonthSelector,
        options: &AggregateOptions,
    ) -> Self {
        let sales = filter_by_month(sales, selector);
        let expenses = filter_by_month(expenses, selector);

        Self {
            month: selector.to_string(),
            summary: summarize(sales.iter().copied(), expenses.iter().copied()),
            funnel: funnel(sales.iter().copied()),
            by_closer: closer_breakdown(sales.iter().copied(), options.closer_cost_baseline),
        }
    }
}

/// Summary statistics over already-filtered records
pub fn summarize<'a, S, E>(sales: S, expenses: E) -> Summary
where
    S: IntoIterator<Item = &'a Sale>,
    E: IntoIterator<Item = &'a Expense>,
{
    let mut total_leads = 0;
    let mut deals = 0;
    let mut revenue = Decimal::ZERO;

    for sale in sales {
        total_leads += 1;
        if sale.is_closed() {
            deals += 1;
            revenue += sale.amount;
        }
    }

    let expenses_total: Decimal = expenses.into_iter().map(|e| e.amount).sum();

    Summary {
        total_leads,
        deals,
        revenue,
        expenses_total,
        profit: revenue - expenses_total,
        roi: roi_percent(revenue, expenses_total),
    }
}

/// Funnel counters over already-filtered sales
pub fn funnel<'a, S>(sales: S) -> Funnel
where
    S: IntoIterator<Item = &'a Sale>,
{
    let mut funnel = Funnel::default();
    for sale in sales {
        funnel.leads_total += 1;
        match sale.stage {
            Stage::Leads => {}
            Stage::TerminierungVerloren => funnel.terminierung_verloren += 1,
            Stage::NoShow => funnel.no_show += 1,
            Stage::Abschluesse => funnel.abschluesse += 1,
        }
    }
    funnel
}

/// Closed sales grouped by exact closer name, in first-seen order
pub fn closer_breakdown<'a, S>(sales: S, cost_baseline: Option<Decimal>) -> Vec<CloserStats>
where
    S: IntoIterator<Item = &'a Sale>,
{
    let mut rows: Vec<CloserStats> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();

    for sale in sales.into_iter().filter(|s| s.is_closed()) {
        let slot = *index.entry(sale.closer_name.as_str()).or_insert_with(|| {
            rows.push(CloserStats {
                closer: sale.closer_name.clone(),
                full: Decimal::ZERO,
                installment: Decimal::ZERO,
                total: Decimal::ZERO,
                deals: 0,
                roi: None,
            });
            rows.len() - 1
        });

        let row = &mut rows[slot];
        match sale.payment_type() {
            PaymentType::Full => row.full += sale.amount,
            PaymentType::Installment => row.installment += sale.amount,
        }
        row.total += sale.amount;
        row.deals += 1;
    }

    if let Some(baseline) = cost_baseline {
        for row in &mut rows {
            row.roi = Some(roi_percent(row.total, baseline));
        }
    }

    rows
}

/// One summary per month that has data, ascending
pub fn monthly_summaries(sales: &[Sale], expenses: &[Expense]) -> Vec<(MonthKey, Summary)> {
    months_present(sales, expenses)
        .into_iter()
        .map(|month| {
            let selector = MonthSelector::Month(month);
            let summary = summarize(
                filter_by_month(sales, &selector),
                filter_by_month(expenses, &selector),
            );
            (month, summary)
        })
        .collect()
}

/// `round((value - cost) / cost * 100)`, or 0 without a positive cost basis
///
/// Midpoints round away from zero. Results beyond the i64 range saturate.
pub fn roi_percent(value: Decimal, cost: Decimal) -> i64 {
    if cost <= Decimal::ZERO {
        return 0;
    }
    let gain = value - cost;
    gain.checked_div(cost)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map(|pct| pct.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|pct| pct.to_i64())
        .unwrap_or(if gain.is_sign_negative() { i64::MIN } else { i64::MAX })
}
