//! Configuration for the sales tracker

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sales_metrics::{AggregateOptions, DEFAULT_CLOSER_COST_BASELINE};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

// =============================================================================
// File-based Configuration (config.toml)
// =============================================================================

/// Configuration loaded from config.toml
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

/// Dashboard settings
#[derive(Debug, Deserialize)]
pub struct DashboardConfig {
    /// Show the per-closer ROI column
    #[serde(default = "default_true")]
    pub closer_roi: bool,
    /// Flat cost per closer the per-closer ROI is measured against (EUR)
    #[serde(default)]
    pub closer_cost_baseline: Option<Decimal>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            closer_roi: true,
            closer_cost_baseline: None,
        }
    }
}

/// A named user and what they may see
#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    pub name: String,
    pub role: Role,
}

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Sees every sale
    Admin,
    /// Sees only sales they closed
    Closer,
}

fn default_true() -> bool {
    true
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content).with_context(|| {
            format!(
                "Failed to parse {}. Check for:\n\
                 - Invalid TOML syntax (missing quotes, brackets, etc.)\n\
                 - Unknown roles (use ADMIN or CLOSER)\n\
                 - Non-numeric closer_cost_baseline",
                path.display()
            )
        })
    }

    /// Load configuration, falling back to defaults when the file is absent
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

// =============================================================================
// Runtime Configuration
// =============================================================================

/// Validated configuration
#[derive(Debug)]
pub struct Config {
    /// Options passed to the aggregator
    pub options: AggregateOptions,
    /// Known users
    pub users: Vec<UserConfig>,
}

impl Config {
    pub fn from_file(file_config: &FileConfig) -> Result<Self> {
        let dashboard = &file_config.dashboard;

        let baseline = dashboard
            .closer_cost_baseline
            .unwrap_or(DEFAULT_CLOSER_COST_BASELINE);
        if baseline.is_sign_negative() && !baseline.is_zero() {
            anyhow::bail!("closer_cost_baseline must not be negative (got {})", baseline);
        }

        let mut seen = HashSet::new();
        for user in &file_config.users {
            if user.name.trim().is_empty() {
                anyhow::bail!("User names in config must not be empty");
            }
            if !seen.insert(user.name.as_str()) {
                anyhow::bail!("User '{}' is declared more than once", user.name);
            }
        }

        Ok(Self {
            options: AggregateOptions {
                closer_cost_baseline: dashboard.closer_roi.then_some(baseline),
            },
            users: file_config.users.clone(),
        })
    }

    /// Look up a user by exact name
    pub fn find_user(&self, name: &str) -> Option<&UserConfig> {
        self.users.iter().find(|u| u.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = FileConfig::parse("").unwrap();
        let config = Config::from_file(&file).unwrap();
        assert_eq!(
            config.options.closer_cost_baseline,
            Some(DEFAULT_CLOSER_COST_BASELINE)
        );
        assert!(config.users.is_empty());
    }

    #[test]
    fn test_full_config() {
        let file = FileConfig::parse(
            r#"
            [dashboard]
            closer_cost_baseline = "1500.50"

            [[users]]
            name = "Lukas"
            role = "ADMIN"

            [[users]]
            name = "Alex"
            role = "CLOSER"
            "#,
        )
        .unwrap();
        let config = Config::from_file(&file).unwrap();

        assert_eq!(config.options.closer_cost_baseline, Some(dec!(1500.50)));
        assert_eq!(config.find_user("Lukas").map(|u| u.role), Some(Role::Admin));
        assert_eq!(config.find_user("Alex").map(|u| u.role), Some(Role::Closer));
        assert!(config.find_user("alex").is_none());
    }

    #[test]
    fn test_example_config_parses() {
        let file = FileConfig::parse(include_str!("../../../config.example.toml")).unwrap();
        let config = Config::from_file(&file).unwrap();
        assert_eq!(config.options.closer_cost_baseline, Some(dec!(1000)));
        assert_eq!(config.users.len(), 2);
    }

    #[test]
    fn test_numeric_baseline() {
        let file = FileConfig::parse("[dashboard]\ncloser_cost_baseline = 800\n").unwrap();
        let config = Config::from_file(&file).unwrap();
        assert_eq!(config.options.closer_cost_baseline, Some(dec!(800)));
    }

    #[test]
    fn test_closer_roi_can_be_disabled() {
        let file = FileConfig::parse("[dashboard]\ncloser_roi = false\n").unwrap();
        let config = Config::from_file(&file).unwrap();
        assert_eq!(config.options.closer_cost_baseline, None);
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let result = FileConfig::parse("[[users]]\nname = \"Alex\"\nrole = \"MANAGER\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_negative_baseline_is_rejected() {
        let file = FileConfig::parse("[dashboard]\ncloser_cost_baseline = \"-10\"\n").unwrap();
        assert!(Config::from_file(&file).is_err());
    }

    #[test]
    fn test_duplicate_user_is_rejected() {
        let file = FileConfig::parse(
            "[[users]]\nname = \"Alex\"\nrole = \"CLOSER\"\n\n[[users]]\nname = \"Alex\"\nrole = \"ADMIN\"\n",
        )
        .unwrap();
        assert!(Config::from_file(&file).is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("sales-tracker-no-such-config.toml");
        let file = FileConfig::load_or_default(&path).unwrap();
        assert!(file.users.is_empty());
        assert!(file.dashboard.closer_roi);
    }
}
