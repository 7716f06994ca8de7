use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

const ECOMMERCE_SCHEMA: &str = include_str!("../../schemas/ecommerce.toml");

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    Orders,
    OrderItems,
    Payments,
    Customers,
    Products,
}

impl Table {
    /// Fixed processing order of a run.
    pub const ALL: [Table; 5] = [
        Table::Orders,
        Table::OrderItems,
        Table::Payments,
        Table::Customers,
        Table::Products,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Orders => "orders",
            Table::OrderItems => "order_items",
            Table::Payments => "payments",
            Table::Customers => "customers",
            Table::Products => "products",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        Table::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| EtlError::UnknownTable {
                table: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastRule {
    String,
    #[serde(alias = "Int64")]
    Integer,
    #[serde(alias = "numeric coercion")]
    Numeric,
    Float,
    Timestamp,
}

/// 單一資料表的清理規則
#[derive(Debug, Clone, PartialEq)]
pub struct TableContract {
    pub table: Table,
    pub allowed_columns: Vec<String>,
    pub primary_key: Vec<String>,
    pub required_non_null: Vec<String>,
    pub casts: BTreeMap<String, CastRule>,
}

impl TableContract {
    /// Builds a contract, rejecting key, required or cast columns that are
    /// not part of the allowed set.
    pub fn new(
        table: Table,
        allowed_columns: Vec<String>,
        primary_key: Vec<String>,
        required_non_null: Vec<String>,
        casts: BTreeMap<String, CastRule>,
    ) -> Result<Self> {
        let field = |name: &str| format!("tables.{}.{}", table, name);

        let mut seen = HashSet::new();
        for column in &allowed_columns {
            if !seen.insert(column.as_str()) {
                return Err(EtlError::ConfigValidationError {
                    field: field("allowed_columns"),
                    message: format!("column '{}' is listed twice", column),
                });
            }
        }

        if primary_key.is_empty() {
            return Err(EtlError::ConfigValidationError {
                field: field("primary_key"),
                message: "primary key cannot be empty".to_string(),
            });
        }

        let subsets = [
            ("primary_key", primary_key.iter().collect::<Vec<_>>()),
            ("required_non_null", required_non_null.iter().collect()),
            ("casts", casts.keys().collect()),
        ];
        for (name, columns) in subsets {
            if let Some(stray) = columns.into_iter().find(|c| !seen.contains(c.as_str())) {
                return Err(EtlError::ConfigValidationError {
                    field: field(name),
                    message: format!("column '{}' is not an allowed column", stray),
                });
            }
        }

        Ok(Self {
            table,
            allowed_columns,
            primary_key,
            required_non_null,
            casts,
        })
    }

    pub fn cast_for(&self, column: &str) -> Option<CastRule> {
        self.casts.get(column).copied()
    }

    pub fn is_required(&self, column: &str) -> bool {
        self.required_non_null.iter().any(|c| c == column)
    }

    pub fn is_key(&self, column: &str) -> bool {
        self.primary_key.iter().any(|c| c == column)
    }
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    tables: Vec<ContractDef>,
}

#[derive(Debug, Deserialize)]
struct ContractDef {
    name: String,
    allowed_columns: Vec<String>,
    primary_key: Vec<String>,
    #[serde(default)]
    required_non_null: Vec<String>,
    #[serde(default)]
    casts: BTreeMap<String, CastRule>,
}

/// Read-only table → contract lookup, built once at startup and shared by
/// reference.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    contracts: BTreeMap<Table, TableContract>,
}

impl SchemaRegistry {
    /// 內建的電商資料表規則
    pub fn ecommerce() -> Result<Self> {
        Self::from_toml_str(ECOMMERCE_SCHEMA)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => EtlError::SourceNotFound {
                location: path.as_ref().display().to_string(),
            },
            _ => EtlError::IoError(e),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: RegistryFile =
            toml::from_str(content).map_err(|e| EtlError::ConfigValidationError {
                field: "schema".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;

        let mut contracts = BTreeMap::new();
        for def in file.tables {
            let table: Table = def.name.parse()?;
            let contract = TableContract::new(
                table,
                def.allowed_columns,
                def.primary_key,
                def.required_non_null,
                def.casts,
            )?;
            if contracts.insert(table, contract).is_some() {
                return Err(EtlError::ConfigValidationError {
                    field: "tables".to_string(),
                    message: format!("table '{}' is defined twice", table),
                });
            }
        }

        tracing::debug!("Schema registry loaded with {} tables", contracts.len());
        Ok(Self { contracts })
    }

    pub fn contract_of(&self, table: Table) -> Result<&TableContract> {
        self.contracts
            .get(&table)
            .ok_or_else(|| EtlError::UnknownTable {
                table: table.to_string(),
            })
    }

    pub fn contract_of_name(&self, name: &str) -> Result<&TableContract> {
        self.contract_of(name.parse()?)
    }

    pub fn tables(&self) -> impl Iterator<Item = Table> + '_ {
        self.contracts.keys().copied()
    }
}
