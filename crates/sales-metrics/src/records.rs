//! Sale and expense records, and the validation that produces them
//!
//! Raw rows (CSV lines, stored rows, command-line arguments) arrive as
//! [`SaleInput`] / [`ExpenseInput`] with every field as an optional string.
//! Converting them with `TryFrom` is the only way to obtain a [`Sale`] or an
//! [`Expense`], so the aggregator never sees a malformed record.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::str::FromStr;

use crate::error::{IngestError, RecordError, Result};

/// Largest accepted single amount (one trillion EUR)
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

// =============================================================================
// Enumerations
// =============================================================================

/// Funnel stage of a sale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Leads,
    /// Appointment lost
    TerminierungVerloren,
    NoShow,
    /// Closed/won, the only stage that counts as revenue
    Abschluesse,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Leads,
        Stage::TerminierungVerloren,
        Stage::NoShow,
        Stage::Abschluesse,
    ];

    /// Storage / wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Leads => "LEADS",
            Stage::TerminierungVerloren => "TERMINIERUNG_VERLOREN",
            Stage::NoShow => "NO_SHOW",
            Stage::Abschluesse => "ABSCHLUESSE",
        }
    }

    /// Short display label used on the dashboard
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Leads => "Leads",
            Stage::TerminierungVerloren => "Term. Lost",
            Stage::NoShow => "No Show",
            Stage::Abschluesse => "Closed",
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Stage::Abschluesse)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Stage {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self> {
        match normalize_token(s).as_str() {
            "LEADS" | "LEAD" => Ok(Stage::Leads),
            "TERMINIERUNG_VERLOREN" | "TERM_LOST" | "TERM._LOST" => Ok(Stage::TerminierungVerloren),
            "NO_SHOW" | "NOSHOW" => Ok(Stage::NoShow),
            "ABSCHLUESSE" | "ABSCHLUSS" | "CLOSED" => Ok(Stage::Abschluesse),
            _ => Err(RecordError::UnknownStage(s.to_string())),
        }
    }
}

/// How a sale is paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    Full,
    Installment,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Full => "FULL",
            PaymentType::Installment => "INSTALLMENT",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentType::Full => "Full",
            PaymentType::Installment => "Installment",
        }
    }
}

impl std::fmt::Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentType {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self> {
        match normalize_token(s).as_str() {
            "FULL" => Ok(PaymentType::Full),
            "INSTALLMENT" | "INSTALMENT" => Ok(PaymentType::Installment),
            _ => Err(RecordError::UnknownPaymentType(s.to_string())),
        }
    }
}

/// Payment terms. Installment details exist only on installment sales.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payment {
    Full,
    Installment {
        months: NonZeroU32,
        monthly_amount: Decimal,
    },
}

impl Payment {
    pub fn payment_type(&self) -> PaymentType {
        match self {
            Payment::Full => PaymentType::Full,
            Payment::Installment { .. } => PaymentType::Installment,
        }
    }

    pub fn installment_months(&self) -> Option<u32> {
        match self {
            Payment::Full => None,
            Payment::Installment { months, .. } => Some(months.get()),
        }
    }

    pub fn monthly_amount(&self) -> Option<Decimal> {
        match self {
            Payment::Full => None,
            Payment::Installment { monthly_amount, .. } => Some(*monthly_amount),
        }
    }
}

// =============================================================================
// Records
// =============================================================================

/// Anything that can be placed in a calendar month
pub trait Dated {
    fn date(&self) -> NaiveDate;
}

/// A validated sale
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sale {
    /// Store ID (None for sales not yet saved)
    pub id: Option<i64>,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub payment: Payment,
    pub stage: Stage,
    pub closer_name: String,
}

impl Sale {
    pub fn is_closed(&self) -> bool {
        self.stage.is_closed()
    }

    pub fn payment_type(&self) -> PaymentType {
        self.payment.payment_type()
    }
}

impl Dated for Sale {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// A validated expense
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expense {
    /// Store ID (None for expenses not yet saved)
    pub id: Option<i64>,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
    /// User who entered the expense; informational only
    pub recorded_by: Option<String>,
}

impl Dated for Expense {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

// =============================================================================
// Raw input
// =============================================================================

/// Unvalidated sale as it arrives from a CSV row, a stored row or a request body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleInput {
    #[serde(skip)]
    pub id: Option<i64>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default, alias = "paymentType")]
    pub payment_type: Option<String>,
    #[serde(default, alias = "installmentMonths")]
    pub installment_months: Option<String>,
    #[serde(default, alias = "monthlyAmount")]
    pub monthly_amount: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default, alias = "closerName")]
    pub closer_name: Option<String>,
}

/// Unvalidated expense
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseInput {
    #[serde(skip)]
    pub id: Option<i64>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default, alias = "recordedBy")]
    pub recorded_by: Option<String>,
}

impl TryFrom<SaleInput> for Sale {
    type Error = RecordError;

    fn try_from(input: SaleInput) -> Result<Self> {
        let date = parse_date(required("date", &input.date)?)?;
        let amount = parse_amount("amount", required("amount", &input.amount)?)?;
        let payment_type: PaymentType = required("payment_type", &input.payment_type)?.parse()?;

        let months = present(&input.installment_months);
        let monthly = present(&input.monthly_amount);
        let payment = match payment_type {
            PaymentType::Full => {
                if months.is_some() || monthly.is_some() {
                    return Err(RecordError::InstallmentDetailsOnFullPayment);
                }
                Payment::Full
            }
            PaymentType::Installment => {
                let (Some(months), Some(monthly)) = (months, monthly) else {
                    return Err(RecordError::InstallmentDetailsMissing);
                };
                Payment::Installment {
                    months: parse_months(months)?,
                    monthly_amount: parse_amount("monthly_amount", monthly)?,
                }
            }
        };

        let stage: Stage = required("stage", &input.stage)?.parse()?;
        // Kept verbatim: the name is a grouping key
        let closer_name = input
            .closer_name
            .filter(|name| !name.trim().is_empty())
            .ok_or(RecordError::MissingField("closer_name"))?;

        Ok(Sale {
            id: input.id,
            date,
            amount,
            payment,
            stage,
            closer_name,
        })
    }
}

impl TryFrom<ExpenseInput> for Expense {
    type Error = RecordError;

    fn try_from(input: ExpenseInput) -> Result<Self> {
        let date = parse_date(required("date", &input.date)?)?;
        let amount = parse_amount("amount", required("amount", &input.amount)?)?;
        let description = input
            .description
            .filter(|d| !d.trim().is_empty())
            .ok_or(RecordError::MissingField("description"))?;
        let recorded_by = present(&input.recorded_by).map(str::to_string);

        Ok(Expense {
            id: input.id,
            date,
            amount,
            description,
            recorded_by,
        })
    }
}

impl From<&Sale> for SaleInput {
    fn from(sale: &Sale) -> Self {
        SaleInput {
            id: sale.id,
            date: Some(sale.date.format("%Y-%m-%d").to_string()),
            amount: Some(sale.amount.to_string()),
            payment_type: Some(sale.payment_type().as_str().to_string()),
            installment_months: sale.payment.installment_months().map(|m| m.to_string()),
            monthly_amount: sale.payment.monthly_amount().map(|m| m.to_string()),
            stage: Some(sale.stage.as_str().to_string()),
            closer_name: Some(sale.closer_name.clone()),
        }
    }
}

impl From<&Expense> for ExpenseInput {
    fn from(expense: &Expense) -> Self {
        ExpenseInput {
            id: expense.id,
            date: Some(expense.date.format("%Y-%m-%d").to_string()),
            description: Some(expense.description.clone()),
            amount: Some(expense.amount.to_string()),
            recorded_by: expense.recorded_by.clone(),
        }
    }
}

/// Validate a batch of sales, failing on the first bad one
pub fn ingest_sales<I>(rows: I) -> std::result::Result<Vec<Sale>, IngestError>
where
    I: IntoIterator<Item = SaleInput>,
{
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| Sale::try_from(row).map_err(|source| IngestError { index, source }))
        .collect()
}

/// Validate a batch of expenses, failing on the first bad one
pub fn ingest_expenses<I>(rows: I) -> std::result::Result<Vec<Expense>, IngestError>
where
    I: IntoIterator<Item = ExpenseInput>,
{
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| Expense::try_from(row).map_err(|source| IngestError { index, source }))
        .collect()
}

// =============================================================================
// Field parsing
// =============================================================================

/// Parse a record date, dropping any time of day
///
/// The calendar date is kept as written; offsets are not applied.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    Err(RecordError::InvalidDate(s.to_string()))
}

/// Parse a non-negative money amount
pub fn parse_amount(field: &'static str, s: &str) -> Result<Decimal> {
    let value = Decimal::from_str(s.trim()).map_err(|_| RecordError::InvalidAmount {
        field,
        value: s.to_string(),
    })?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(RecordError::NegativeAmount {
            field,
            value: s.to_string(),
        });
    }
    if value > MAX_AMOUNT {
        return Err(RecordError::AmountOutOfRange {
            field,
            value: s.to_string(),
        });
    }
    Ok(value.normalize())
}

fn parse_months(s: &str) -> Result<NonZeroU32> {
    s.trim()
        .parse::<u32>()
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or_else(|| RecordError::InvalidInstallmentMonths(s.to_string()))
}

/// Blank strings count as absent
fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn required<'a>(name: &'static str, field: &'a Option<String>) -> Result<&'a str> {
    present(field).ok_or(RecordError::MissingField(name))
}

fn normalize_token(s: &str) -> String {
    s.trim().to_uppercase().replace(['-', ' '], "_")
}
