//! Centralized constants for the sales tracker
//!
//! Team-specific settings (users, cost baseline) are loaded from config.toml.

// =============================================================================
// File Names
// =============================================================================

/// Default config file path
pub const CONFIG_FILENAME: &str = "config.toml";

/// Record store database filename
pub const STORE_FILENAME: &str = "sales.sqlite";

/// Month-over-month summary CSV filename
pub const SUMMARY_FILENAME: &str = "summary.csv";

/// Per-closer breakdown CSV filename
pub const CLOSERS_FILENAME: &str = "closers.csv";

// =============================================================================
// SQLite
// =============================================================================

/// How long a writer waits for a locked database (ms)
pub const BUSY_TIMEOUT_MS: u64 = 5000;

// =============================================================================
// Logging
// =============================================================================

/// Default tracing filter when RUST_LOG is unset
pub const DEFAULT_LOG_FILTER: &str = "info,sqlx=warn";

/// Filter used with --verbose
pub const VERBOSE_LOG_FILTER: &str = "debug,sqlx=info";

// =============================================================================
// Console
// =============================================================================

/// Width of separator lines in list output
pub const RULE_WIDTH: usize = 80;
