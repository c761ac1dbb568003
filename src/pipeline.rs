use std::collections::BTreeSet;

use serde::Serialize;

use crate::catalog::Catalog;
use crate::dates::{detect_date_format, DateFormat};
use crate::error::{Result, TallyError};
use crate::matcher::{match_columns, ColumnMap};
use crate::models::{Account, AccountRecord, CategoryRecord, TransactionRecord, TypedRecord};
use crate::reconciler::{
    distinct_values, reconcile_accounts, reconcile_currencies, reconcile_names, EntityMap,
    EntityMatch,
};
use crate::schema::{schema_for, ImportSchema, ImportType};
use crate::tokenizer::{tokenize, RawRow};
use crate::transformer::{clean_rows, AccountSource, AmountMode, CleanConfig, CleanedRow, ErrorMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
    Upload,
    Configure,
    Preview,
    Clean,
    Map,
    Confirm,
}

impl Step {
    fn next(self) -> Option<Step> {
        match self {
            Self::Upload => Some(Self::Configure),
            Self::Configure => Some(Self::Preview),
            Self::Preview => Some(Self::Clean),
            Self::Clean => Some(Self::Map),
            Self::Map => Some(Self::Confirm),
            Self::Confirm => None,
        }
    }

    fn prev(self) -> Option<Step> {
        match self {
            Self::Upload => None,
            Self::Configure => Some(Self::Upload),
            Self::Preview => Some(Self::Configure),
            Self::Clean => Some(Self::Preview),
            Self::Map => Some(Self::Clean),
            Self::Confirm => Some(Self::Map),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Upload => "Upload",
            Self::Configure => "Configure",
            Self::Preview => "Preview",
            Self::Clean => "Clean",
            Self::Map => "Map",
            Self::Confirm => "Confirm",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Category,
    Account,
    AccountType,
    Currency,
}

/// Everything the import flow has accumulated so far. Stage outputs are
/// replaced wholesale when their owning transition reruns, never patched.
#[derive(Debug)]
pub struct PipelineState {
    pub raw_text: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    pub column_map: ColumnMap,
    pub config: CleanConfig,
    pub cleaned_rows: Vec<CleanedRow>,
    pub error_map: ErrorMap,
    pub excluded_rows: BTreeSet<usize>,
    pub category_map: EntityMap,
    pub account_map: EntityMap,
    pub account_type_map: EntityMap,
    pub currency_map: EntityMap,
    pub step: Step,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            raw_text: String::new(),
            delimiter: ',',
            headers: Vec::new(),
            rows: Vec::new(),
            column_map: ColumnMap::new(),
            config: CleanConfig::default(),
            cleaned_rows: Vec::new(),
            error_map: ErrorMap::new(),
            excluded_rows: BTreeSet::new(),
            category_map: EntityMap::new(),
            account_map: EntityMap::new(),
            account_type_map: EntityMap::new(),
            currency_map: EntityMap::new(),
            step: Step::Upload,
        }
    }
}

/// Output contract of the publish action. Persisting it is the caller's job.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOutput {
    pub records: Vec<TypedRecord>,
    pub new_accounts: Vec<Account>,
    pub file_name: String,
    pub original_rows: Vec<RawRow>,
    pub errors: ErrorMap,
}

/// Finite-state sequencer over the import stages. Owns the accumulated
/// state; forward transitions recompute exactly the stage they leave.
pub struct Pipeline {
    import_type: ImportType,
    schema: &'static ImportSchema,
    catalog: Catalog,
    state: PipelineState,
}

impl Pipeline {
    pub fn new(import_type: ImportType, catalog: Catalog) -> Self {
        Self {
            import_type,
            schema: schema_for(import_type),
            catalog,
            state: PipelineState::default(),
        }
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn schema(&self) -> &'static ImportSchema {
        self.schema
    }

    pub fn step(&self) -> Step {
        self.state.step
    }

    pub fn set_raw_text(&mut self, text: impl Into<String>) {
        self.state.raw_text = text.into();
    }

    pub fn set_delimiter(&mut self, delimiter: char) {
        self.state.delimiter = delimiter;
    }

    pub fn set_date_format(&mut self, format: DateFormat) {
        self.state.config.date_format = format;
    }

    pub fn set_amount_mode(&mut self, mode: AmountMode) {
        self.state.config.amount_mode = mode;
    }

    pub fn set_default_currency(&mut self, currency: impl Into<String>) {
        self.state.config.default_currency = currency.into();
    }

    /// Switch between per-row account columns and one fixed account.
    pub fn set_account_source(&mut self, source: AccountSource) -> Result<()> {
        if let AccountSource::Single(id) = source {
            if self.catalog.account_by_id(id).is_none() {
                return Err(TallyError::UnknownAccount(id.to_string()));
            }
        }
        self.state.config.account_source = source;
        Ok(())
    }

    pub fn exclude_row(&mut self, original_index: usize) {
        self.state.excluded_rows.insert(original_index);
    }

    pub fn include_row(&mut self, original_index: usize) {
        self.state.excluded_rows.remove(&original_index);
    }

    /// Override one seeded entity resolution before publish.
    pub fn set_entity_mapping(&mut self, kind: EntityKind, value: &str, target: EntityMatch) {
        let map = match kind {
            EntityKind::Category => &mut self.state.category_map,
            EntityKind::Account => &mut self.state.account_map,
            EntityKind::AccountType => &mut self.state.account_type_map,
            EntityKind::Currency => &mut self.state.currency_map,
        };
        map.insert(value.to_string(), target);
    }

    /// Cleaned rows that will survive publish after user exclusions.
    pub fn rows_ready(&self) -> usize {
        self.state
            .cleaned_rows
            .iter()
            .filter(|r| !self.state.excluded_rows.contains(&r.original_index))
            .count()
    }

    /// Move one step forward, recomputing the stage owned by the step we
    /// are leaving.
    pub fn advance(&mut self) -> Result<Step> {
        match self.state.step {
            Step::Upload => self.run_tokenize_and_match()?,
            Step::Configure => self.run_clean(),
            Step::Clean => self.run_reconcile(),
            Step::Preview | Step::Map => {}
            Step::Confirm => {
                return Err(TallyError::StepOrder(
                    "already at the final step".to_string(),
                ))
            }
        }
        // next() is Some for every non-Confirm step
        let next = self.state.step.next().unwrap_or(Step::Confirm);
        self.state.step = next;
        Ok(next)
    }

    /// Move one step back. Never invalidates derived state.
    pub fn back(&mut self) -> Step {
        if let Some(prev) = self.state.step.prev() {
            self.state.step = prev;
        }
        self.state.step
    }

    fn run_tokenize_and_match(&mut self) -> Result<()> {
        if self.state.raw_text.trim().is_empty() {
            return Err(TallyError::EmptyInput);
        }
        let table =
            tokenize(&self.state.raw_text, self.state.delimiter).ok_or(TallyError::EmptyInput)?;
        self.state.column_map = match_columns(self.schema, &table.headers);
        self.state.headers = table.headers;
        self.state.rows = table.rows;

        // Seed the date format from the mapped date column; Configure may
        // override it before the clean stage runs.
        if let Some(header) = self.state.column_map.get("date") {
            let samples: Vec<String> = self
                .state
                .rows
                .iter()
                .filter_map(|r| r.get(header))
                .cloned()
                .collect();
            self.state.config.date_format = detect_date_format(&samples);
        }
        Ok(())
    }

    fn run_clean(&mut self) {
        let (cleaned, errors) = clean_rows(
            self.schema,
            &self.state.rows,
            &self.state.column_map,
            &self.state.config,
        );
        self.state.cleaned_rows = cleaned;
        self.state.error_map = errors;
        // Entity maps derive from cleaned values; stale seeds must not leak.
        self.state.category_map.clear();
        self.state.account_map.clear();
        self.state.account_type_map.clear();
        self.state.currency_map.clear();
    }

    fn run_reconcile(&mut self) {
        let rows = &self.state.cleaned_rows;
        let (categories, accounts, types, currencies) = match self.import_type {
            ImportType::Transactions => (
                reconcile_names(
                    &distinct_values(rows, "category"),
                    &self.catalog.categories,
                    true,
                ),
                match self.state.config.account_source {
                    AccountSource::Column => reconcile_accounts(
                        &distinct_values(rows, "account"),
                        &self.catalog.accounts,
                    ),
                    AccountSource::Single(_) => EntityMap::new(),
                },
                EntityMap::new(),
                reconcile_currencies(
                    &distinct_values(rows, "currency"),
                    &self.catalog.currencies,
                    &self.state.config.default_currency,
                ),
            ),
            ImportType::Accounts => (
                EntityMap::new(),
                EntityMap::new(),
                reconcile_names(
                    &distinct_values(rows, "type"),
                    &self.catalog.account_types,
                    false,
                ),
                reconcile_currencies(
                    &distinct_values(rows, "currency"),
                    &self.catalog.currencies,
                    &self.state.config.default_currency,
                ),
            ),
            ImportType::Categories => (
                reconcile_names(
                    &distinct_values(rows, "name"),
                    &self.catalog.categories,
                    true,
                ),
                EntityMap::new(),
                EntityMap::new(),
                EntityMap::new(),
            ),
        };
        self.state.category_map = categories;
        self.state.account_map = accounts;
        self.state.account_type_map = types;
        self.state.currency_map = currencies;
    }

    /// Resolve pending entities, drop excluded rows and hand the typed
    /// result set to the caller. Available only at the Confirm step.
    pub fn publish(&self, file_name: &str) -> Result<PublishOutput> {
        if self.state.step != Step::Confirm {
            return Err(TallyError::StepOrder(format!(
                "publish is only available at Confirm (currently at {})",
                self.state.step.name()
            )));
        }

        let (resolved_accounts, new_accounts) = self.resolve_new_accounts();

        let mut records = Vec::new();
        for row in &self.state.cleaned_rows {
            if self.state.excluded_rows.contains(&row.original_index) {
                continue;
            }
            records.push(self.typed_record(row, &resolved_accounts));
        }

        Ok(PublishOutput {
            records,
            new_accounts,
            file_name: file_name.to_string(),
            original_rows: self.state.rows.clone(),
            errors: self.state.error_map.clone(),
        })
    }

    /// Turn every CreateNew account resolution into a fresh id plus a draft
    /// Account record; ids continue past the catalog's highest.
    fn resolve_new_accounts(&self) -> (EntityMap, Vec<Account>) {
        let mut next_id = self.catalog.max_account_id() + 1;
        let mut resolved = EntityMap::new();
        let mut new_accounts = Vec::new();

        for (value, entry) in &self.state.account_map {
            match entry {
                EntityMatch::CreateNew(name) => {
                    new_accounts.push(Account {
                        id: next_id,
                        name: name.clone(),
                        account_type: "checking".to_string(),
                        currency: self.state.config.default_currency.clone(),
                    });
                    resolved.insert(value.clone(), EntityMatch::Existing(next_id.to_string()));
                    next_id += 1;
                }
                other => {
                    resolved.insert(value.clone(), other.clone());
                }
            }
        }
        (resolved, new_accounts)
    }

    fn typed_record(&self, row: &CleanedRow, resolved_accounts: &EntityMap) -> TypedRecord {
        let text = |key: &str| row.values.get(key).and_then(|v| v.as_text());
        let number = |key: &str| row.values.get(key).and_then(|v| v.as_number()).unwrap_or(0.0);
        let currency_raw = text("currency").unwrap_or(&self.state.config.default_currency);
        let currency = match self.state.currency_map.get(currency_raw) {
            Some(EntityMatch::Existing(c)) | Some(EntityMatch::CreateNew(c)) => c.clone(),
            _ => currency_raw.to_string(),
        };

        match self.import_type {
            ImportType::Transactions => {
                let amount = number("amount");
                let date = row
                    .values
                    .get("date")
                    .and_then(|v| v.as_date())
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default();
                let category = text("category").and_then(|value| {
                    match self.state.category_map.get(value) {
                        Some(EntityMatch::Existing(name)) => Some(name.clone()),
                        Some(EntityMatch::CreateNew(name)) => Some(name.clone()),
                        Some(EntityMatch::Unassigned) => None,
                        None => Some(value.to_string()),
                    }
                });
                let account_id = match self.state.config.account_source {
                    AccountSource::Single(id) => Some(id),
                    AccountSource::Column => text("account").and_then(|value| {
                        match resolved_accounts.get(value) {
                            Some(EntityMatch::Existing(id)) => id.parse().ok(),
                            _ => None,
                        }
                    }),
                };
                let transaction_type = if amount >= 0.0 { "income" } else { "expense" };
                TypedRecord::Transaction(TransactionRecord {
                    account_id,
                    name: text("name").unwrap_or_default().to_string(),
                    category,
                    amount,
                    date,
                    currency,
                    transaction_type: transaction_type.to_string(),
                })
            }
            ImportType::Accounts => {
                let type_raw = text("type").unwrap_or_default();
                let account_type = match self.state.account_type_map.get(type_raw) {
                    Some(EntityMatch::Existing(name)) => name.clone(),
                    Some(EntityMatch::Unassigned) => "unassigned".to_string(),
                    _ => type_raw.to_string(),
                };
                TypedRecord::Account(AccountRecord {
                    name: text("name").unwrap_or_default().to_string(),
                    account_type,
                    balance: number("balance"),
                    currency,
                })
            }
            ImportType::Categories => {
                let name_raw = text("name").unwrap_or_default();
                let name = match self.state.category_map.get(name_raw) {
                    Some(EntityMatch::Existing(canonical)) => canonical.clone(),
                    _ => name_raw.to_string(),
                };
                TypedRecord::Category(CategoryRecord {
                    name,
                    parent: text("parent").map(str::to_string),
                })
            }
        }
    }
}
