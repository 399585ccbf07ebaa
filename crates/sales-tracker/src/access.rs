//! Role-scoped reads: admins see every sale, closers only their own

use anyhow::Result;
use sales_metrics::Sale;

use crate::config::{Config, Role};

/// Who a listing or report is produced for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    Admin,
    Closer(String),
}

impl Viewer {
    /// Resolve `--as NAME` against the configured users (no name = admin)
    pub fn resolve(config: &Config, name: Option<&str>) -> Result<Self> {
        let Some(name) = name else {
            return Ok(Viewer::Admin);
        };

        let Some(user) = config.find_user(name) else {
            if config.users.is_empty() {
                anyhow::bail!("Unknown user '{}'. No users are configured in config.toml", name);
            }
            let known: Vec<_> = config.users.iter().map(|u| u.name.as_str()).collect();
            anyhow::bail!("Unknown user '{}'. Known users: {}", name, known.join(", "));
        };

        Ok(match user.role {
            Role::Admin => Viewer::Admin,
            Role::Closer => Viewer::Closer(user.name.clone()),
        })
    }

    pub fn can_see(&self, sale: &Sale) -> bool {
        match self {
            Viewer::Admin => true,
            Viewer::Closer(name) => sale.closer_name == *name,
        }
    }

    /// Closer name a new sale is recorded under
    ///
    /// Closers always record under their own name; only admins may name
    /// someone else.
    pub fn closer_for_new_sale(&self, requested: Option<&str>) -> Result<String> {
        match (self, requested) {
            (Viewer::Admin, Some(name)) => Ok(name.to_string()),
            (Viewer::Admin, None) => anyhow::bail!("--closer is required when adding a sale as admin"),
            (Viewer::Closer(own), None) => Ok(own.clone()),
            (Viewer::Closer(own), Some(name)) if name == own => Ok(own.clone()),
            (Viewer::Closer(own), Some(name)) => anyhow::bail!(
                "{} is a closer and can only record their own sales, not sales for '{}'",
                own,
                name
            ),
        }
    }

    /// Drop the sales this viewer may not see, keeping order
    pub fn scope(&self, sales: Vec<Sale>) -> Vec<Sale> {
        match self {
            Viewer::Admin => sales,
            Viewer::Closer(_) => sales.into_iter().filter(|s| self.can_see(s)).collect(),
        }
    }
}

impl std::fmt::Display for Viewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Viewer::Admin => write!(f, "admin"),
            Viewer::Closer(name) => write!(f, "closer {}", name),
        }
    }
}
