//! Expense CSV import/export (`date,description,amount,recorded_by`)
//!
//! `recorded_by` is optional on import.

use anyhow::{Context, Result};
use sales_metrics::{ingest_expenses, Expense, ExpenseInput};
use std::io::{Read, Write};
use std::path::Path;

pub fn read_expenses<R: Read>(reader: R) -> Result<Vec<Expense>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let mut row: ExpenseInput = result?;
        row.id = None;
        rows.push(row);
    }

    ingest_expenses(rows).map_err(|e| {
        let line = e.index + 2;
        anyhow::Error::new(e).context(format!("Invalid expense on line {}", line))
    })
}

pub fn write_expenses<W: Write>(expenses: &[Expense], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for expense in expenses {
        wtr.serialize(ExpenseInput::from(expense))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Load expenses from a CSV file (for importing/migration)
pub fn load_from_csv(path: &Path) -> Result<Vec<Expense>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    read_expenses(file).with_context(|| format!("Failed to import {}", path.display()))
}

/// Export expenses to CSV (for backup)
pub fn export_to_csv(expenses: &[Expense], path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_expenses(expenses, file)
}

/// Get total expenses
pub fn total_expenses(expenses: &[Expense]) -> rust_decimal::Decimal {
    expenses.iter().map(|e| e.amount).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_read_and_total() {
        let csv = "date,description,amount\n2025-02-10,Ads,200\n2025-02-11,\"CRM, yearly\",99.90\n";
        let expenses = read_expenses(csv.as_bytes()).unwrap();
        assert_eq!(expenses.len(), 2);
        assert_eq!(expenses[1].description, "CRM, yearly");
        assert_eq!(total_expenses(&expenses), dec!(299.90));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let csv = "date,description,amount\n2025-02-10,Refund,-50\n";
        let err = read_expenses(csv.as_bytes()).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn test_export_then_import_keeps_records() {
        let csv = "date,description,amount,recorded_by\n2025-01-31,Software,49.99,\n2025-02-01,Ads,10,Alex\n";
        let expenses = read_expenses(csv.as_bytes()).unwrap();
        assert_eq!(expenses[1].recorded_by.as_deref(), Some("Alex"));

        let mut buf = Vec::new();
        write_expenses(&expenses, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf.clone()).unwrap(), csv);
        assert_eq!(read_expenses(buf.as_slice()).unwrap(), expenses);
    }
}
