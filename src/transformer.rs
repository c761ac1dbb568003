use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::dates::{parse_date, DateFormat};
use crate::matcher::ColumnMap;
use crate::schema::ImportSchema;
use crate::tokenizer::RawRow;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl CellValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }
}

/// A source row after coercion and validation, indexed back to its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedRow {
    pub original_index: usize,
    pub values: BTreeMap<String, CellValue>,
}

pub type FieldErrors = BTreeMap<String, String>;
/// Row index -> field key -> human-readable error.
pub type ErrorMap = BTreeMap<usize, FieldErrors>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountMode {
    Single,
    DoubleEntry,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AccountSource {
    Column,
    Single(i64),
}

#[derive(Debug, Clone)]
pub struct CleanConfig {
    pub date_format: DateFormat,
    pub amount_mode: AmountMode,
    pub account_source: AccountSource,
    pub default_currency: String,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            date_format: DateFormat::DayMonthYear,
            amount_mode: AmountMode::Single,
            account_source: AccountSource::Column,
            default_currency: "EUR".to_string(),
        }
    }
}

/// Strip everything except digits, dot and minus, then parse.
pub fn clean_number(raw: &str) -> Option<f64> {
    let stripped: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if stripped.is_empty() {
        return None;
    }
    stripped.parse().ok()
}

fn is_numeric_field(key: &str) -> bool {
    key.contains("amount") || key.contains("balance") || key.contains("total")
}

/// Coerce and validate every raw row against the schema.
///
/// Pure function of its inputs: rerunning with identical arguments yields
/// identical output. A row with any field error lands in the ErrorMap and
/// is excluded from the cleaned set.
pub fn clean_rows(
    schema: &ImportSchema,
    rows: &[RawRow],
    column_map: &ColumnMap,
    config: &CleanConfig,
) -> (Vec<CleanedRow>, ErrorMap) {
    let mut cleaned = Vec::new();
    let mut error_map = ErrorMap::new();

    for (index, row) in rows.iter().enumerate() {
        let mut values: BTreeMap<String, CellValue> = BTreeMap::new();
        let mut errors = FieldErrors::new();

        for field in schema.fields {
            // In double-entry mode the generic amount is derived, not read.
            if field.key == "amount" && config.amount_mode == AmountMode::DoubleEntry {
                continue;
            }
            let Some(header) = column_map.get(field.key) else {
                continue;
            };
            let raw = row.get(header).map(|v| v.trim()).unwrap_or("");

            if raw.is_empty() {
                if field.required {
                    errors.insert(field.key.to_string(), "Missing required value".to_string());
                }
                continue;
            }

            if field.key.contains("date") {
                match parse_date(raw, config.date_format) {
                    Some(date) => {
                        values.insert(field.key.to_string(), CellValue::Date(date));
                    }
                    None => {
                        if field.required {
                            errors.insert(
                                field.key.to_string(),
                                format!("Unparseable date: {raw}"),
                            );
                        }
                    }
                }
            } else if is_numeric_field(field.key) {
                match clean_number(raw) {
                    Some(number) => {
                        values.insert(field.key.to_string(), CellValue::Number(number));
                    }
                    None => {
                        if field.required {
                            errors.insert(
                                field.key.to_string(),
                                format!("Unparseable number: {raw}"),
                            );
                        }
                    }
                }
            } else {
                values.insert(field.key.to_string(), CellValue::Text(raw.to_string()));
            }
        }

        if schema.has_account_source {
            apply_transaction_rules(row, column_map, config, &mut values, &mut errors);
        }

        if schema.has_field("currency") && !values.contains_key("currency") {
            values.insert(
                "currency".to_string(),
                CellValue::Text(config.default_currency.clone()),
            );
        }

        if errors.is_empty() {
            cleaned.push(CleanedRow {
                original_index: index,
                values,
            });
        } else {
            error_map.insert(index, errors);
        }
    }

    (cleaned, error_map)
}

fn apply_transaction_rules(
    row: &RawRow,
    column_map: &ColumnMap,
    config: &CleanConfig,
    values: &mut BTreeMap<String, CellValue>,
    errors: &mut FieldErrors,
) {
    if config.amount_mode == AmountMode::DoubleEntry {
        let amount_in = raw_number(row, column_map, "amount_in");
        let amount_out = raw_number(row, column_map, "amount_out");
        if amount_in.is_none() && amount_out.is_none() {
            errors.insert(
                "amount".to_string(),
                "No parseable value in the in/out columns".to_string(),
            );
        } else {
            let amount = amount_in.unwrap_or(0.0) - amount_out.unwrap_or(0.0);
            values.insert("amount".to_string(), CellValue::Number(amount));
        }
    }

    match config.account_source {
        AccountSource::Single(id) => {
            values.insert("account".to_string(), CellValue::Text(id.to_string()));
            errors.remove("account");
        }
        AccountSource::Column => {
            if !values.contains_key("account") {
                errors.insert("account".to_string(), "Missing account".to_string());
            }
        }
    }
}

fn raw_number(row: &RawRow, column_map: &ColumnMap, key: &str) -> Option<f64> {
    let header = column_map.get(key)?;
    clean_number(row.get(header)?.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::match_columns;
    use crate::schema::{schema_for, ImportType};
    use crate::tokenizer::tokenize;

    fn setup(raw: &str) -> (&'static ImportSchema, Vec<RawRow>, ColumnMap) {
        let schema = schema_for(ImportType::Transactions);
        let table = tokenize(raw, ',').unwrap();
        let map = match_columns(schema, &table.headers);
        (schema, table.rows, map)
    }

    fn iso_config() -> CleanConfig {
        CleanConfig {
            date_format: DateFormat::Iso,
            ..CleanConfig::default()
        }
    }

    #[test]
    fn test_clean_number() {
        assert_eq!(clean_number("1,234.56"), Some(1234.56));
        assert_eq!(clean_number("$-42.50"), Some(-42.5));
        assert_eq!(clean_number("120.00 EUR"), Some(120.0));
        assert_eq!(clean_number("0"), Some(0.0));
        assert_eq!(clean_number("n/a"), None);
        assert_eq!(clean_number(""), None);
    }

    #[test]
    fn test_happy_path_row() {
        let (schema, rows, map) =
            setup("Date,Description,Amount,Account\n2023-01-05,Coffee,-4.50,Main");
        let (cleaned, errors) = clean_rows(schema, &rows, &map, &iso_config());
        assert!(errors.is_empty());
        assert_eq!(cleaned.len(), 1);
        let row = &cleaned[0];
        assert_eq!(row.original_index, 0);
        assert_eq!(row.values["amount"].as_number(), Some(-4.5));
        assert_eq!(
            row.values["date"].as_date(),
            chrono::NaiveDate::from_ymd_opt(2023, 1, 5)
        );
        assert_eq!(row.values["name"].as_text(), Some("Coffee"));
        // Blank currency falls back to the default
        assert_eq!(row.values["currency"].as_text(), Some("EUR"));
    }

    #[test]
    fn test_missing_required_field_is_an_error() {
        let (schema, rows, map) = setup("Date,Description,Amount,Account\n2023-01-05,,-4.50,Main");
        let (cleaned, errors) = clean_rows(schema, &rows, &map, &iso_config());
        assert!(cleaned.is_empty());
        assert_eq!(errors[&0]["name"], "Missing required value");
    }

    #[test]
    fn test_unparseable_date_is_an_error() {
        let (schema, rows, map) =
            setup("Date,Description,Amount,Account\nnot-a-date,Coffee,-4.50,Main");
        let (cleaned, errors) = clean_rows(schema, &rows, &map, &iso_config());
        assert!(cleaned.is_empty());
        assert!(errors[&0]["date"].starts_with("Unparseable date"));
    }

    #[test]
    fn test_unparseable_number_is_an_error() {
        let (schema, rows, map) =
            setup("Date,Description,Amount,Account\n2023-01-05,Coffee,abc,Main");
        let (_, errors) = clean_rows(schema, &rows, &map, &iso_config());
        assert!(errors[&0]["amount"].starts_with("Unparseable number"));
    }

    #[test]
    fn test_a_row_is_cleaned_or_errored_never_both() {
        let (schema, rows, map) = setup(
            "Date,Description,Amount,Account\n2023-01-05,Coffee,-4.50,Main\nbad,Tea,1.00,Main",
        );
        let (cleaned, errors) = clean_rows(schema, &rows, &map, &iso_config());
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].original_index, 0);
        assert_eq!(errors.len(), 1);
        assert!(errors.contains_key(&1));
    }

    #[test]
    fn test_double_entry_amount() {
        let (schema, rows, map) = setup(
            "Date,Description,Credit,Debit,Account Name\n2023-01-05,Salary,120.00,0,Main",
        );
        let config = CleanConfig {
            amount_mode: AmountMode::DoubleEntry,
            ..iso_config()
        };
        let (cleaned, errors) = clean_rows(schema, &rows, &map, &config);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(cleaned[0].values["amount"].as_number(), Some(120.0));
    }

    #[test]
    fn test_double_entry_outflow_is_negative() {
        let (schema, rows, map) = setup(
            "Date,Description,Credit,Debit,Account Name\n2023-01-05,Rent,,850.00,Main",
        );
        let config = CleanConfig {
            amount_mode: AmountMode::DoubleEntry,
            ..iso_config()
        };
        let (cleaned, _) = clean_rows(schema, &rows, &map, &config);
        assert_eq!(cleaned[0].values["amount"].as_number(), Some(-850.0));
    }

    #[test]
    fn test_double_entry_both_unparseable_flags_amount() {
        let (schema, rows, map) = setup(
            "Date,Description,Credit,Debit,Account Name\n2023-01-05,Rent,abc,xyz,Main",
        );
        let config = CleanConfig {
            amount_mode: AmountMode::DoubleEntry,
            ..iso_config()
        };
        let (cleaned, errors) = clean_rows(schema, &rows, &map, &config);
        assert!(cleaned.is_empty());
        assert!(errors[&0].contains_key("amount"));
    }

    #[test]
    fn test_single_account_mode_forces_account() {
        let (schema, rows, map) = setup("Date,Description,Amount\n2023-01-05,Coffee,-4.50");
        let config = CleanConfig {
            account_source: AccountSource::Single(7),
            ..iso_config()
        };
        let (cleaned, errors) = clean_rows(schema, &rows, &map, &config);
        assert!(errors.is_empty());
        assert_eq!(cleaned[0].values["account"].as_text(), Some("7"));
    }

    #[test]
    fn test_column_account_mode_requires_account() {
        let (schema, rows, map) = setup("Date,Description,Amount\n2023-01-05,Coffee,-4.50");
        let (cleaned, errors) = clean_rows(schema, &rows, &map, &iso_config());
        assert!(cleaned.is_empty());
        assert_eq!(errors[&0]["account"], "Missing account");
    }

    #[test]
    fn test_required_invariant_holds() {
        let (schema, rows, map) = setup(
            "Date,Description,Amount,Account\n2023-01-05,Coffee,-4.50,Main\n,Tea,1.00,Main\n2023-01-07,Juice,,Main",
        );
        let (cleaned, errors) = clean_rows(schema, &rows, &map, &iso_config());
        for row in &cleaned {
            for field in schema.fields.iter().filter(|f| f.required) {
                assert!(row.values.contains_key(field.key));
            }
        }
        for field_errors in errors.values() {
            assert!(!field_errors.is_empty());
        }
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let raw = "Date,Description,Amount,Account\n2023-01-05,Coffee,-4.50,Main\nbad,Tea,1.00,Main";
        let (schema, rows, map) = setup(raw);
        let config = iso_config();
        let first = clean_rows(schema, &rows, &map, &config);
        let second = clean_rows(schema, &rows, &map, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn test_accounts_import_has_no_account_rule() {
        let schema = schema_for(ImportType::Accounts);
        let table = tokenize("Name,Type,Balance\nMain,checking,1000.00", ',').unwrap();
        let map = match_columns(schema, &table.headers);
        let (cleaned, errors) = clean_rows(schema, &table.rows, &map, &CleanConfig::default());
        assert!(errors.is_empty());
        assert_eq!(cleaned[0].values["balance"].as_number(), Some(1000.0));
        assert_eq!(cleaned[0].values["currency"].as_text(), Some("EUR"));
    }
}
