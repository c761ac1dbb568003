use crate::error::{Result, TallyError};

/// Declarative description of one importable column.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub required: bool,
    /// Synonyms the column matcher scores CSV headers against.
    pub keywords: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportType {
    Transactions,
    Accounts,
    Categories,
}

impl ImportType {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Transactions => "transactions",
            Self::Accounts => "accounts",
            Self::Categories => "categories",
        }
    }

    pub fn from_key(key: &str) -> Result<Self> {
        ALL_SCHEMAS
            .iter()
            .map(|s| s.import_type)
            .find(|t| t.key() == key)
            .ok_or_else(|| TallyError::UnknownImportType(key.to_string()))
    }
}

/// Ordered field list for one import type.
#[derive(Debug, Clone, Copy)]
pub struct ImportSchema {
    pub import_type: ImportType,
    pub fields: &'static [FieldSpec],
    /// Whether this type carries an "account source" concept
    /// (rows belong to an account, chosen per-row or globally).
    pub has_account_source: bool,
}

impl ImportSchema {
    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn has_field(&self, key: &str) -> bool {
        self.field(key).is_some()
    }
}

const TRANSACTION_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        key: "date",
        label: "Date",
        required: true,
        keywords: &["date", "time", "datum", "day", "posted", "booked"],
    },
    FieldSpec {
        key: "name",
        label: "Description",
        required: true,
        keywords: &["name", "description", "payee", "memo", "narrative", "details", "reference"],
    },
    FieldSpec {
        key: "amount",
        label: "Amount",
        required: true,
        keywords: &["amount", "value", "sum", "total"],
    },
    FieldSpec {
        key: "category",
        label: "Category",
        required: false,
        keywords: &["category", "group", "tag", "type"],
    },
    FieldSpec {
        key: "currency",
        label: "Currency",
        required: false,
        keywords: &["currency", "ccy", "iso"],
    },
    FieldSpec {
        key: "account",
        label: "Account",
        required: false,
        keywords: &["account", "accountname", "wallet", "iban"],
    },
    FieldSpec {
        key: "amount_in",
        label: "Amount In",
        required: false,
        keywords: &["amountin", "credit", "in", "deposit", "inflow", "received"],
    },
    FieldSpec {
        key: "amount_out",
        label: "Amount Out",
        required: false,
        keywords: &["amountout", "debit", "out", "withdrawal", "outflow", "paid"],
    },
];

const ACCOUNT_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        key: "name",
        label: "Name",
        required: true,
        keywords: &["name", "account", "description", "title"],
    },
    FieldSpec {
        key: "type",
        label: "Type",
        required: true,
        keywords: &["type", "kind", "accounttype"],
    },
    FieldSpec {
        key: "balance",
        label: "Balance",
        required: true,
        keywords: &["balance", "amount", "value", "total"],
    },
    FieldSpec {
        key: "currency",
        label: "Currency",
        required: false,
        keywords: &["currency", "ccy", "iso"],
    },
];

const CATEGORY_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        key: "name",
        label: "Name",
        required: true,
        keywords: &["name", "category", "description", "title"],
    },
    FieldSpec {
        key: "parent",
        label: "Parent Category",
        required: false,
        keywords: &["parent", "parentcategory", "group"],
    },
];

pub const ALL_SCHEMAS: &[ImportSchema] = &[
    ImportSchema {
        import_type: ImportType::Transactions,
        fields: TRANSACTION_FIELDS,
        has_account_source: true,
    },
    ImportSchema {
        import_type: ImportType::Accounts,
        fields: ACCOUNT_FIELDS,
        has_account_source: false,
    },
    ImportSchema {
        import_type: ImportType::Categories,
        fields: CATEGORY_FIELDS,
        has_account_source: false,
    },
];

pub fn schema_for(import_type: ImportType) -> &'static ImportSchema {
    ALL_SCHEMAS
        .iter()
        .find(|s| s.import_type == import_type)
        .unwrap_or(&ALL_SCHEMAS[0])
}
