use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::models::Account;
use crate::transformer::{CellValue, CleanedRow};

/// Resolution of one observed free-text value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "resolution", content = "value", rename_all = "snake_case")]
pub enum EntityMatch {
    /// Canonical name or id of an existing record.
    Existing(String),
    /// No match; a record with this name should be created at publish.
    CreateNew(String),
    /// No match and the entity set is closed.
    Unassigned,
}

/// Observed value -> seeded resolution. Callers may overwrite entries
/// before publish reads them.
pub type EntityMap = BTreeMap<String, EntityMatch>;

/// The exact set of distinct non-empty text values in one cleaned column.
pub fn distinct_values(rows: &[CleanedRow], key: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    for row in rows {
        if let Some(CellValue::Text(value)) = row.values.get(key) {
            if !value.is_empty() {
                seen.insert(value.clone());
            }
        }
    }
    seen.into_iter().collect()
}

/// Match observed values against an existing name list, case-insensitively.
/// Unmatched values become CreateNew for open sets, Unassigned for closed.
pub fn reconcile_names(observed: &[String], existing: &[String], allow_create: bool) -> EntityMap {
    let mut map = EntityMap::new();
    for value in observed {
        let found = existing
            .iter()
            .find(|e| e.to_lowercase() == value.to_lowercase());
        let entry = match found {
            Some(canonical) => EntityMatch::Existing(canonical.clone()),
            None if allow_create => EntityMatch::CreateNew(value.clone()),
            None => EntityMatch::Unassigned,
        };
        map.insert(value.clone(), entry);
    }
    map
}

/// Account values resolve to the existing account's id; unmatched names are
/// queued for creation.
pub fn reconcile_accounts(observed: &[String], accounts: &[Account]) -> EntityMap {
    let mut map = EntityMap::new();
    for value in observed {
        let found = accounts
            .iter()
            .find(|a| a.name.to_lowercase() == value.to_lowercase());
        let entry = match found {
            Some(account) => EntityMatch::Existing(account.id.to_string()),
            None => EntityMatch::CreateNew(value.clone()),
        };
        map.insert(value.clone(), entry);
    }
    map
}

/// Currency codes outside the supported set are default-mapped; codes the
/// application already knows need no entry at all.
pub fn reconcile_currencies(observed: &[String], supported: &[String], default: &str) -> EntityMap {
    let mut map = EntityMap::new();
    for value in observed {
        let known = supported
            .iter()
            .any(|c| c.to_lowercase() == value.to_lowercase());
        if !known {
            map.insert(value.clone(), EntityMatch::Existing(default.to_string()));
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn row(index: usize, key: &str, value: &str) -> CleanedRow {
        let mut values = BTreeMap::new();
        values.insert(key.to_string(), CellValue::Text(value.to_string()));
        CleanedRow {
            original_index: index,
            values,
        }
    }

    #[test]
    fn test_distinct_values_dedupes_and_skips_empty() {
        let rows = vec![
            row(0, "category", "Groceries"),
            row(1, "category", "Rent"),
            row(2, "category", "Groceries"),
            row(3, "category", ""),
        ];
        assert_eq!(distinct_values(&rows, "category"), strings(&["Groceries", "Rent"]));
        assert!(distinct_values(&rows, "account").is_empty());
    }

    #[test]
    fn test_unknown_category_queued_for_creation() {
        let map = reconcile_names(&strings(&["Groceries"]), &strings(&["Rent"]), true);
        assert_eq!(
            map["Groceries"],
            EntityMatch::CreateNew("Groceries".to_string())
        );
    }

    #[test]
    fn test_case_insensitive_match_maps_to_canonical() {
        let map = reconcile_names(&strings(&["groceries"]), &strings(&["Groceries"]), true);
        assert_eq!(
            map["groceries"],
            EntityMatch::Existing("Groceries".to_string())
        );
    }

    #[test]
    fn test_closed_set_falls_back_to_unassigned() {
        let map = reconcile_names(
            &strings(&["money market"]),
            &strings(&["checking", "savings"]),
            false,
        );
        assert_eq!(map["money market"], EntityMatch::Unassigned);
    }

    #[test]
    fn test_accounts_resolve_to_ids() {
        let accounts = vec![Account {
            id: 3,
            name: "Main Checking".to_string(),
            account_type: "checking".to_string(),
            currency: "EUR".to_string(),
        }];
        let map = reconcile_accounts(&strings(&["main checking", "Wallet"]), &accounts);
        assert_eq!(map["main checking"], EntityMatch::Existing("3".to_string()));
        assert_eq!(map["Wallet"], EntityMatch::CreateNew("Wallet".to_string()));
    }

    #[test]
    fn test_unknown_currencies_default_mapped() {
        let supported = strings(&["EUR", "USD"]);
        let map = reconcile_currencies(&strings(&["usd", "HUF"]), &supported, "EUR");
        assert!(!map.contains_key("usd"));
        assert_eq!(map["HUF"], EntityMatch::Existing("EUR".to_string()));
    }
}
