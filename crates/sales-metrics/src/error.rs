//! Validation errors raised while turning raw rows into records

use thiserror::Error;

/// Why a single raw sale or expense was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' is not a valid amount: '{value}'")]
    InvalidAmount { field: &'static str, value: String },

    #[error("field '{field}' must not be negative: {value}")]
    NegativeAmount { field: &'static str, value: String },

    #[error("field '{field}' exceeds the supported range: {value}")]
    AmountOutOfRange { field: &'static str, value: String },

    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("unknown stage '{0}'. Use: LEADS, TERMINIERUNG_VERLOREN, NO_SHOW, ABSCHLUESSE")]
    UnknownStage(String),

    #[error("unknown payment type '{0}'. Use: FULL, INSTALLMENT")]
    UnknownPaymentType(String),

    #[error("installment_months must be a positive integer, got '{0}'")]
    InvalidInstallmentMonths(String),

    #[error("installment sale requires installment_months and monthly_amount")]
    InstallmentDetailsMissing,

    #[error("full payment must not carry installment_months or monthly_amount")]
    InstallmentDetailsOnFullPayment,
}

/// A rejected record within a batch, with its zero-based position
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("record {index}: {source}")]
pub struct IngestError {
    pub index: usize,
    #[source]
    pub source: RecordError,
}

pub type Result<T> = std::result::Result<T, RecordError>;
