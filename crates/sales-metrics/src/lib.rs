//! Sales dashboard metrics
//!
//! Turns sale and expense records into the dashboard's derived views:
//! summary totals (leads, deals, revenue, expenses, profit, ROI), funnel
//! stage counts and a per-closer revenue breakdown, optionally narrowed to
//! one calendar month. Everything here is pure; records come in as slices
//! and results come back as plain values.

pub mod aggregate;
pub mod error;
pub mod format;
pub mod month;
pub mod records;

pub use aggregate::{
    closer_breakdown, funnel, monthly_summaries, roi_percent, summarize, AggregateOptions,
    CloserStats, Dashboard, Funnel, Summary, DEFAULT_CLOSER_COST_BASELINE,
};
pub use error::{IngestError, RecordError};
pub use month::{filter_by_month, months_present, MonthKey, MonthSelector};
pub use records::{
    ingest_expenses, ingest_sales, Dated, Expense, ExpenseInput, Payment, PaymentType, Sale,
    SaleInput, Stage,
};
