//! SQLite storage for sale and expense records
//!
//! Amounts are stored as decimal TEXT so they read back exactly. Every row
//! read back goes through the same validation as imported data; a corrupt
//! row fails the read rather than being skipped.

use anyhow::{Context, Result};
use sales_metrics::{Expense, ExpenseInput, Sale, SaleInput};
use sqlx::{FromRow, Sqlite, SqlitePool};
use std::path::Path;

use crate::constants;

/// Record store wrapper
pub struct Store {
    pool: SqlitePool,
}

/// Row type for sales query
#[derive(FromRow)]
struct SaleRow {
    id: i64,
    date: String,
    amount: String,
    payment_type: String,
    installment_months: Option<i64>,
    monthly_amount: Option<String>,
    stage: String,
    closer_name: String,
}

/// Row type for expenses query
#[derive(FromRow)]
struct ExpenseRow {
    id: i64,
    date: String,
    description: String,
    amount: String,
    recorded_by: Option<String>,
}

impl Store {
    /// Open or create the record database
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // SQLx requires the file to exist for SQLite
        if !path.exists() {
            std::fs::File::create(path)?;
        }

        let url = format!("sqlite:{}", path.display());
        let pool = SqlitePool::connect(&url)
            .await
            .context("Failed to open record database")?;

        tracing::debug!(path = %path.display(), "opened record store");
        Self::init(pool).await
    }

    /// Private in-memory database (single connection so every query sees it)
    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::init(pool).await
    }

    async fn init(pool: SqlitePool) -> Result<Self> {
        // WAL + busy timeout so a report and an `add` can overlap
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await?;
        sqlx::query(&format!("PRAGMA busy_timeout={}", constants::BUSY_TIMEOUT_MS))
            .execute(&pool)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Initialize database schema
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "
            -- Sales in every funnel stage
            CREATE TABLE IF NOT EXISTS sales (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                amount TEXT NOT NULL,
                payment_type TEXT NOT NULL,
                installment_months INTEGER,
                monthly_amount TEXT,
                stage TEXT NOT NULL,
                closer_name TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_sales_date ON sales(date)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "
            -- Expenses (marketing, software, ...)
            CREATE TABLE IF NOT EXISTS expenses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                amount TEXT NOT NULL,
                recorded_by TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // Databases created before expenses tracked who entered them
        let columns: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM pragma_table_info('expenses')")
                .fetch_all(&self.pool)
                .await?;
        if !columns.iter().any(|(name,)| name == "recorded_by") {
            tracing::info!("adding recorded_by column to expenses");
            sqlx::query("ALTER TABLE expenses ADD COLUMN recorded_by TEXT")
                .execute(&self.pool)
                .await?;
        }

        Ok(())
    }

    // =========================================================================
    // Sales
    // =========================================================================

    /// Get all sales, newest first
    pub async fn get_sales(&self) -> Result<Vec<Sale>> {
        let rows: Vec<SaleRow> = sqlx::query_as(
            "SELECT id, date, amount, payment_type, installment_months, monthly_amount, stage, closer_name
             FROM sales
             ORDER BY date DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                let id = r.id;
                Sale::try_from(SaleInput {
                    id: Some(r.id),
                    date: Some(r.date),
                    amount: Some(r.amount),
                    payment_type: Some(r.payment_type),
                    installment_months: r.installment_months.map(|m| m.to_string()),
                    monthly_amount: r.monthly_amount,
                    stage: Some(r.stage),
                    closer_name: Some(r.closer_name),
                })
                .with_context(|| format!("Corrupt sale row #{}", id))
            })
            .collect()
    }

    /// Add a new sale, returns the ID
    pub async fn add_sale(&self, sale: &Sale) -> Result<i64> {
        insert_sale(&self.pool, sale).await
    }

    /// Delete a sale by ID
    pub async fn delete_sale(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sales WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Import multiple sales in one transaction
    pub async fn import_sales(&self, sales: &[Sale]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        for sale in sales {
            insert_sale(&mut *tx, sale).await?;
        }
        tx.commit().await?;

        tracing::info!(count = sales.len(), "imported sales");
        Ok(sales.len())
    }

    // =========================================================================
    // Expenses
    // =========================================================================

    /// Get all expenses, newest first
    pub async fn get_expenses(&self) -> Result<Vec<Expense>> {
        let rows: Vec<ExpenseRow> = sqlx::query_as(
            "SELECT id, date, description, amount, recorded_by
             FROM expenses
             ORDER BY date DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                let id = r.id;
                Expense::try_from(ExpenseInput {
                    id: Some(r.id),
                    date: Some(r.date),
                    description: Some(r.description),
                    amount: Some(r.amount),
                    recorded_by: r.recorded_by,
                })
                .with_context(|| format!("Corrupt expense row #{}", id))
            })
            .collect()
    }

    /// Add a new expense, returns the ID
    pub async fn add_expense(&self, expense: &Expense) -> Result<i64> {
        insert_expense(&self.pool, expense).await
    }

    /// Delete an expense by ID
    pub async fn delete_expense(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Import multiple expenses in one transaction
    pub async fn import_expenses(&self, expenses: &[Expense]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        for expense in expenses {
            insert_expense(&mut *tx, expense).await?;
        }
        tx.commit().await?;

        tracing::info!(count = expenses.len(), "imported expenses");
        Ok(expenses.len())
    }

    // =========================================================================
    // Utilities
    // =========================================================================

    /// Get row counts
    pub async fn stats(&self) -> Result<StoreStats> {
        let sales: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;
        let expenses: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM expenses")
            .fetch_one(&self.pool)
            .await?;

        Ok(StoreStats {
            sales: sales.0 as u64,
            expenses: expenses.0 as u64,
        })
    }
}

// =============================================================================
// Helper functions
// =============================================================================

async fn insert_sale<'e, E>(executor: E, sale: &Sale) -> Result<i64>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO sales (date, amount, payment_type, installment_months, monthly_amount, stage, closer_name)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(sale.date.format("%Y-%m-%d").to_string())
    .bind(sale.amount.to_string())
    .bind(sale.payment_type().as_str())
    .bind(sale.payment.installment_months().map(i64::from))
    .bind(sale.payment.monthly_amount().map(|m| m.to_string()))
    .bind(sale.stage.as_str())
    .bind(&sale.closer_name)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

async fn insert_expense<'e, E>(executor: E, expense: &Expense) -> Result<i64>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO expenses (date, description, amount, recorded_by) VALUES (?, ?, ?, ?)",
    )
    .bind(expense.date.format("%Y-%m-%d").to_string())
    .bind(&expense.description)
    .bind(expense.amount.to_string())
    .bind(expense.recorded_by.as_deref())
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Store statistics
#[derive(Debug)]
pub struct StoreStats {
    pub sales: u64,
    pub expenses: u64,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} sales, {} expenses", self.sales, self.expenses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use sales_metrics::{Payment, Stage};
    use std::num::NonZeroU32;

    fn sale(date: &str, stage: Stage, closer: &str) -> Sale {
        Sale {
            id: None,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            amount: dec!(3000.50),
            payment: Payment::Installment {
                months: NonZeroU32::new(6).unwrap(),
                monthly_amount: dec!(500.0833),
            },
            stage,
            closer_name: closer.to_string(),
        }
    }

    fn expense(date: &str, amount: rust_decimal::Decimal) -> Expense {
        Expense {
            id: None,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            amount,
            description: "Ads".to_string(),
            recorded_by: None,
        }
    }

    #[tokio::test]
    async fn test_sales_read_back_exactly() {
        let store = Store::open_in_memory().await.unwrap();
        let original = sale("2025-02-19", Stage::Abschluesse, "Niklas");

        let id = store.add_sale(&original).await.unwrap();
        let sales = store.get_sales().await.unwrap();

        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0], Sale { id: Some(id), ..original });
    }

    #[tokio::test]
    async fn test_sales_listed_newest_first() {
        let store = Store::open_in_memory().await.unwrap();
        store.add_sale(&sale("2025-01-10", Stage::Leads, "Alex")).await.unwrap();
        store.add_sale(&sale("2025-03-01", Stage::NoShow, "Alex")).await.unwrap();
        store.add_sale(&sale("2025-02-05", Stage::Abschluesse, "Alex")).await.unwrap();

        let dates: Vec<_> = store
            .get_sales()
            .await
            .unwrap()
            .iter()
            .map(|s| s.date.to_string())
            .collect();
        assert_eq!(dates, vec!["2025-03-01", "2025-02-05", "2025-01-10"]);
    }

    #[tokio::test]
    async fn test_delete_reports_missing_rows() {
        let store = Store::open_in_memory().await.unwrap();
        let id = store.add_expense(&expense("2025-02-15", dec!(500))).await.unwrap();

        assert!(store.delete_expense(id).await.unwrap());
        assert!(!store.delete_expense(id).await.unwrap());
        assert!(!store.delete_sale(42).await.unwrap());
    }

    #[tokio::test]
    async fn test_import_and_stats() {
        let store = Store::open_in_memory().await.unwrap();
        let sales = vec![
            sale("2025-02-01", Stage::Abschluesse, "Alex"),
            sale("2025-02-02", Stage::Leads, "Niklas"),
        ];
        let expenses = vec![expense("2025-02-10", dec!(200)), expense("2025-02-05", dec!(300.10))];

        assert_eq!(store.import_sales(&sales).await.unwrap(), 2);
        assert_eq!(store.import_expenses(&expenses).await.unwrap(), 2);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.sales, 2);
        assert_eq!(stats.expenses, 2);
        assert_eq!(stats.to_string(), "2 sales, 2 expenses");

        let stored = store.get_expenses().await.unwrap();
        assert_eq!(stored[0].amount, dec!(200));
        assert_eq!(stored[1].amount, dec!(300.10));
    }

    #[tokio::test]
    async fn test_expense_keeps_who_recorded_it() {
        let store = Store::open_in_memory().await.unwrap();
        let mut entered = expense("2025-02-10", dec!(120));
        entered.recorded_by = Some("Alex".to_string());
        store.add_expense(&entered).await.unwrap();
        store.add_expense(&expense("2025-02-09", dec!(80))).await.unwrap();

        let stored = store.get_expenses().await.unwrap();
        assert_eq!(stored[0].recorded_by.as_deref(), Some("Alex"));
        assert_eq!(stored[1].recorded_by, None);
    }

    #[tokio::test]
    async fn test_older_expense_table_gains_recorded_by() {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE expenses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                amount TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO expenses (date, description, amount) VALUES ('2025-01-05', 'Ads', '100')")
            .execute(&pool)
            .await
            .unwrap();

        let store = Store::init(pool).await.unwrap();
        let stored = store.get_expenses().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].recorded_by, None);
    }

    #[tokio::test]
    async fn test_corrupt_row_fails_the_read() {
        let store = Store::open_in_memory().await.unwrap();
        sqlx::query(
            "INSERT INTO sales (date, amount, payment_type, stage, closer_name)
             VALUES ('2025-02-01', 'lots', 'FULL', 'ABSCHLUESSE', 'Alex')",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        let err = store.get_sales().await.unwrap_err();
        assert!(err.to_string().contains("Corrupt sale row"));
    }
}
