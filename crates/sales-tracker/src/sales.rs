//! Sale CSV import/export
//!
//! Columns: `date,amount,payment_type,installment_months,monthly_amount,stage,closer_name`.
//! Installment columns are left empty for full payments.

use anyhow::{Context, Result};
use sales_metrics::{ingest_sales, Sale, SaleInput};
use std::io::{Read, Write};
use std::path::Path;

/// Read and validate every row; any bad row rejects the whole file
pub fn read_sales<R: Read>(reader: R) -> Result<Vec<Sale>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let mut row: SaleInput = result?;
        row.id = None; // CSV imports don't have IDs
        rows.push(row);
    }

    ingest_sales(rows).map_err(|e| {
        // +1 for the header, +1 for 1-based lines
        let line = e.index + 2;
        anyhow::Error::new(e).context(format!("Invalid sale on line {}", line))
    })
}

pub fn write_sales<W: Write>(sales: &[Sale], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for sale in sales {
        wtr.serialize(SaleInput::from(sale))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Load sales from a CSV file
pub fn load_from_csv(path: &Path) -> Result<Vec<Sale>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    read_sales(file).with_context(|| format!("Failed to import {}", path.display()))
}

/// Export sales to CSV (for backup)
pub fn export_to_csv(sales: &[Sale], path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_sales(sales, file)
}
