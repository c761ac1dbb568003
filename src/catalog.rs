use std::path::Path;

use serde::Deserialize;

use crate::error::Result;
use crate::models::Account;

/// Existing domain entities the import reconciles against. Supplied by the
/// surrounding application; the CLI loads them from a JSON file or falls
/// back to the built-in defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub accounts: Vec<Account>,
    /// Category tree flattened to names for matching.
    pub categories: Vec<String>,
    pub currencies: Vec<String>,
    pub account_types: Vec<String>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            categories: Vec::new(),
            currencies: ["EUR", "USD", "GBP", "CHF", "JPY", "CAD", "AUD"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            account_types: ["checking", "savings", "credit_card", "investment", "cash", "loan"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Catalog {
    pub fn account_by_id(&self, id: i64) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    pub fn max_account_id(&self) -> i64 {
        self.accounts.iter().map(|a| a.id).max().unwrap_or(0)
    }
}

pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
