use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub account_type: String,
    pub currency: String,
}

/// Typed publish record; shape depends on the import type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedRecord {
    Transaction(TransactionRecord),
    Account(AccountRecord),
    Category(CategoryRecord),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub account_id: Option<i64>,
    pub name: String,
    pub category: Option<String>,
    pub amount: f64,
    pub date: String,
    pub currency: String,
    /// "income" when the amount is non-negative, "expense" otherwise.
    #[serde(rename = "type")]
    pub transaction_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub account_type: String,
    pub balance: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRecord {
    pub name: String,
    pub parent: Option<String>,
}
