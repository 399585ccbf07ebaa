//! Sales Tracker
//!
//! Records sales and expenses in a local SQLite store and reports the sales
//! dashboard: summary, funnel and per-closer breakdown, for all time or one
//! calendar month.

mod access;
mod config;
mod constants;
mod expenses;
mod logging;
mod reports;
mod sales;
mod store;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sales_metrics::format::format_eur;
use sales_metrics::{Dashboard, Expense, ExpenseInput, MonthSelector, Sale, SaleInput};
use std::path::{Path, PathBuf};

use access::Viewer;
use config::{Config, FileConfig};
use reports::ReportData;
use store::Store;

#[derive(Parser, Debug)]
#[command(name = "sales-tracker")]
#[command(about = "Sales funnel, revenue and closer performance tracking")]
struct Args {
    /// Data directory for the record database
    #[arg(short, long, default_value = "./data", global = true)]
    data_dir: PathBuf,

    /// Output directory for generated CSV reports
    #[arg(short, long, default_value = "./output", global = true)]
    output_dir: PathBuf,

    /// Config file (users, closer ROI baseline)
    #[arg(short, long, default_value = constants::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage sales
    Sale {
        #[command(subcommand)]
        action: SaleCommand,
    },

    /// Manage expenses
    Expense {
        #[command(subcommand)]
        action: ExpenseCommand,
    },

    /// Show the dashboard and write CSV reports
    Report(ReportArgs),
}

#[derive(clap::Args, Debug)]
struct ReportArgs {
    /// Month to report: "all" or YYYY-MM
    #[arg(long, default_value = sales_metrics::month::ALL_TIME)]
    month: String,

    /// Report as this configured user
    #[arg(long = "as", value_name = "NAME")]
    as_user: Option<String>,

    /// Print the dashboard as JSON instead of tables
    #[arg(long)]
    json: bool,

    /// Skip writing CSV files
    #[arg(long)]
    no_csv: bool,
}

impl Default for ReportArgs {
    fn default() -> Self {
        Self {
            month: sales_metrics::month::ALL_TIME.to_string(),
            as_user: None,
            json: false,
            no_csv: false,
        }
    }
}

#[derive(Subcommand, Debug)]
enum SaleCommand {
    /// List sales, newest first
    List {
        /// List as this configured user
        #[arg(long = "as", value_name = "NAME")]
        as_user: Option<String>,
    },

    /// Add a new sale
    Add {
        /// Date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Contract value in EUR
        #[arg(long)]
        amount: String,

        /// Payment type: FULL or INSTALLMENT
        #[arg(long)]
        payment_type: String,

        /// Number of installments (INSTALLMENT only)
        #[arg(long)]
        installment_months: Option<String>,

        /// Amount per installment in EUR (INSTALLMENT only)
        #[arg(long)]
        monthly_amount: Option<String>,

        /// Stage: LEADS, TERMINIERUNG_VERLOREN, NO_SHOW, ABSCHLUESSE
        #[arg(long)]
        stage: String,

        /// Closer name (admins only; closers always record their own sales)
        #[arg(long)]
        closer: Option<String>,

        /// Record as this configured user
        #[arg(long = "as", value_name = "NAME")]
        as_user: Option<String>,
    },

    /// Delete a sale by ID
    Delete {
        /// Sale ID to delete
        id: i64,
    },

    /// Import sales from CSV file
    Import {
        /// Path to CSV file
        file: PathBuf,
    },

    /// Export sales to CSV file
    Export {
        /// Path to output CSV file
        file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum ExpenseCommand {
    /// List all expenses
    List,

    /// Add a new expense
    Add {
        /// Date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Description
        #[arg(long)]
        description: String,

        /// Amount in EUR
        #[arg(long)]
        amount: String,

        /// Record as this configured user
        #[arg(long = "as", value_name = "NAME")]
        as_user: Option<String>,
    },

    /// Delete an expense by ID
    Delete {
        /// Expense ID to delete
        id: i64,
    },

    /// Import expenses from CSV file
    Import {
        /// Path to CSV file
        file: PathBuf,
    },

    /// Export expenses to CSV file
    Export {
        /// Path to output CSV file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::initialize(args.verbose)?;

    // Open record store (in data directory)
    let store_path = args.data_dir.join(constants::STORE_FILENAME);
    let store = Store::open(&store_path).await?;

    match args.command {
        Some(Command::Sale { action }) => handle_sale_command(action, &store, &args.config).await,
        Some(Command::Expense { action }) => handle_expense_command(action, &store, &args.config).await,
        Some(Command::Report(report)) => {
            run_report(report, &store, &args.config, &args.output_dir).await
        }
        // No subcommand - all-time report
        None => run_report(ReportArgs::default(), &store, &args.config, &args.output_dir).await,
    }
}

fn load_config(path: &Path) -> Result<Config> {
    let file_config = FileConfig::load_or_default(path)?;
    Config::from_file(&file_config)
}

/// Handle sale management subcommands
async fn handle_sale_command(action: SaleCommand, store: &Store, config_path: &Path) -> Result<()> {
    match action {
        SaleCommand::List { as_user } => {
            let config = load_config(config_path)?;
            let viewer = Viewer::resolve(&config, as_user.as_deref())?;
            let sales = viewer.scope(store.get_sales().await?);

            if sales.is_empty() {
                println!("No sales recorded.");
                println!("\nUse 'sales-tracker sale add' to add sales");
                println!("Or 'sales-tracker sale import <file.csv>' to import from CSV");
                return Ok(());
            }

            println!(
                "{}",
                sale_list_line("ID", "Date", "Closer", "Stage", "Payment", "Amount")
            );
            println!("{}", "-".repeat(constants::RULE_WIDTH));

            let mut closed_total = Decimal::ZERO;
            for sale in &sales {
                let id = sale.id.map(|i| i.to_string()).unwrap_or_default();
                let payment = match sale.payment.installment_months() {
                    Some(months) => format!("{} x{}", sale.payment_type().label(), months),
                    None => sale.payment_type().label().to_string(),
                };
                println!(
                    "{}",
                    sale_list_line(
                        &id,
                        &sale.date.to_string(),
                        &truncate(&sale.closer_name, 15),
                        sale.stage.label(),
                        &payment,
                        &format_eur(sale.amount),
                    )
                );
                if sale.is_closed() {
                    closed_total += sale.amount;
                }
            }
            println!("{}", "-".repeat(constants::RULE_WIDTH));
            println!("{}", sale_list_total(closed_total));
            println!("\n{} sale(s)", sales.len());
            Ok(())
        }

        SaleCommand::Add {
            date,
            amount,
            payment_type,
            installment_months,
            monthly_amount,
            stage,
            closer,
            as_user,
        } => {
            let config = load_config(config_path)?;
            let viewer = Viewer::resolve(&config, as_user.as_deref())?;
            let closer = viewer.closer_for_new_sale(closer.as_deref())?;

            let sale = Sale::try_from(SaleInput {
                id: None,
                date: Some(date),
                amount: Some(amount),
                payment_type: Some(payment_type),
                installment_months,
                monthly_amount,
                stage: Some(stage),
                closer_name: Some(closer),
            })?;

            let id = store.add_sale(&sale).await?;
            println!(
                "Added sale #{}: {} - {} ({})",
                id,
                sale.closer_name,
                format_eur(sale.amount),
                sale.stage.label()
            );
            Ok(())
        }

        SaleCommand::Delete { id } => {
            if store.delete_sale(id).await? {
                println!("Deleted sale #{}", id);
            } else {
                println!("Sale #{} not found", id);
            }
            Ok(())
        }

        SaleCommand::Import { file } => {
            let sales = sales::load_from_csv(&file)?;
            let count = store.import_sales(&sales).await?;
            println!("Imported {} sales from {}", count, file.display());
            Ok(())
        }

        SaleCommand::Export { file } => {
            let sales = store.get_sales().await?;
            sales::export_to_csv(&sales, &file)?;
            println!("Exported {} sales to {}", sales.len(), file.display());
            Ok(())
        }
    }
}

/// Handle expense management subcommands
async fn handle_expense_command(
    action: ExpenseCommand,
    store: &Store,
    config_path: &Path,
) -> Result<()> {
    match action {
        ExpenseCommand::List => {
            let expenses = store.get_expenses().await?;
            if expenses.is_empty() {
                println!("No expenses recorded.");
                println!("\nUse 'sales-tracker expense add' to add expenses");
                println!("Or 'sales-tracker expense import <file.csv>' to import from CSV");
            } else {
                println!(
                    "{:<5} {:<12} {:>16}  Description",
                    "ID", "Date", "Amount"
                );
                println!("{}", "-".repeat(constants::RULE_WIDTH));

                for expense in &expenses {
                    let id = expense.id.map(|i| i.to_string()).unwrap_or_default();
                    println!(
                        "{:<5} {:<12} {:>16}  {}",
                        id,
                        expense.date,
                        format_eur(expense.amount),
                        truncate(&expense.description, 40),
                    );
                }
                println!("{}", "-".repeat(constants::RULE_WIDTH));
                println!(
                    "{:>18} {:>16}",
                    "Total:",
                    format_eur(expenses::total_expenses(&expenses))
                );
                println!("\n{} expense(s)", expenses.len());
            }
            Ok(())
        }

        ExpenseCommand::Add {
            date,
            description,
            amount,
            as_user,
        } => {
            // Only checks that the name is a configured user
            if as_user.is_some() {
                let config = load_config(config_path)?;
                Viewer::resolve(&config, as_user.as_deref())?;
            }

            let expense = Expense::try_from(ExpenseInput {
                id: None,
                date: Some(date),
                description: Some(description),
                amount: Some(amount),
                recorded_by: as_user,
            })?;

            let id = store.add_expense(&expense).await?;
            println!(
                "Added expense #{}: {} - {}",
                id,
                expense.description,
                format_eur(expense.amount)
            );
            Ok(())
        }

        ExpenseCommand::Delete { id } => {
            if store.delete_expense(id).await? {
                println!("Deleted expense #{}", id);
            } else {
                println!("Expense #{} not found", id);
            }
            Ok(())
        }

        ExpenseCommand::Import { file } => {
            let expenses = expenses::load_from_csv(&file)?;
            let count = store.import_expenses(&expenses).await?;
            println!("Imported {} expenses from {}", count, file.display());
            Ok(())
        }

        ExpenseCommand::Export { file } => {
            let expenses = store.get_expenses().await?;
            expenses::export_to_csv(&expenses, &file)?;
            println!("Exported {} expenses to {}", expenses.len(), file.display());
            Ok(())
        }
    }
}

/// One line of the sale list; the last 16 columns hold the amount
fn sale_list_line(
    id: &str,
    date: &str,
    closer: &str,
    stage: &str,
    payment: &str,
    amount: &str,
) -> String {
    format!(
        "{:<5} {:<12} {:<16} {:<11} {:<12} {:>16}",
        id, date, closer, stage, payment, amount
    )
}

fn sale_list_total(total: Decimal) -> String {
    format!("{:>60} {:>16}", "Closed total:", format_eur(total))
}

/// Truncate string for display
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

/// Build the dashboard and emit it
async fn run_report(
    report: ReportArgs,
    store: &Store,
    config_path: &Path,
    output_dir: &Path,
) -> Result<()> {
    let config = load_config(config_path)?;
    let viewer = Viewer::resolve(&config, report.as_user.as_deref())?;

    let selector = MonthSelector::parse(&report.month);
    if let MonthSelector::Unmatched(raw) = &selector {
        tracing::warn!(month = %raw, "month is neither 'all' nor YYYY-MM, nothing will match");
    }

    let stats = store.stats().await?;
    tracing::info!(%stats, %viewer, month = %selector, "building dashboard");

    let sales = viewer.scope(store.get_sales().await?);
    let expenses = store.get_expenses().await?;
    let dashboard = Dashboard::build(&sales, &expenses, &selector, &config.options);

    let generated = if report.no_csv {
        Vec::new()
    } else {
        let data = ReportData {
            sales: &sales,
            expenses: &expenses,
            selector: &selector,
            dashboard: &dashboard,
        };
        reports::generate_all_reports(output_dir, &data)?
    };

    if report.json {
        println!("{}", reports::dashboard_json(&dashboard)?);
        for path in &generated {
            tracing::info!(path = %path.display(), "generated");
        }
    } else {
        reports::print_dashboard(&dashboard, &viewer);
        if !generated.is_empty() {
            println!("\nGenerating reports...");
            for path in &generated {
                println!("  Generated: {}", path.display());
            }
        }
    }

    Ok(())
}
