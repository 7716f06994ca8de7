//! Schema-driven cleaning.
//!
//! A raw dataset goes through six steps in a fixed order: projection, trim,
//! temporal parse, type cast, null gate and last-write-wins deduplication.
//! Cell-level problems never fail the table: unparseable values become null
//! and the null gate decides whether the row survives. Only structural
//! problems (unknown table, a required or key column missing entirely) are
//! errors.

use crate::domain::model::{Dataset, Value};
use crate::domain::schema::{CastRule, SchemaRegistry, Table, TableContract};
use crate::utils::error::{EtlError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::HashMap;

/// Row-drop counts of one cleaned table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub input_rows: usize,
    pub dropped_missing_required: usize,
    pub dropped_duplicates: usize,
    pub output_rows: usize,
}

#[derive(Debug, Clone)]
pub struct CleanOutcome {
    pub dataset: Dataset,
    pub report: CleanReport,
}

pub struct CleaningEngine<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> CleaningEngine<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    pub fn clean(&self, raw: &Dataset, table: Table) -> Result<CleanOutcome> {
        let contract = self.registry.contract_of(table)?;
        clean_with_contract(raw, contract)
    }
}

pub fn clean_with_contract(raw: &Dataset, contract: &TableContract) -> Result<CleanOutcome> {
    let input_rows = raw.len();

    let mut dataset = project(raw, contract)?;
    trim_text(&mut dataset);
    parse_temporal(&mut dataset, contract);
    apply_casts(&mut dataset, contract);
    let dropped_missing_required = drop_missing_required(&mut dataset, contract);
    let dropped_duplicates = dedup_last_wins(&mut dataset, contract);

    let report = CleanReport {
        input_rows,
        dropped_missing_required,
        dropped_duplicates,
        output_rows: dataset.len(),
    };
    tracing::debug!("Cleaned {}: {:?}", contract.table, report);

    Ok(CleanOutcome { dataset, report })
}

/// 1. Keep exactly the allowed columns, in contract order.
fn project(raw: &Dataset, contract: &TableContract) -> Result<Dataset> {
    let mut sources = Vec::with_capacity(contract.allowed_columns.len());
    let mut missing_mandatory = Vec::new();

    for column in &contract.allowed_columns {
        let idx = raw.column_index(column);
        if idx.is_none() {
            if contract.is_required(column) || contract.is_key(column) {
                missing_mandatory.push(column.as_str());
            } else {
                tracing::warn!(
                    "Column '{}' missing from raw {}, filling with nulls",
                    column,
                    contract.table
                );
            }
        }
        sources.push(idx);
    }

    if !missing_mandatory.is_empty() {
        return Err(EtlError::SchemaViolation {
            table: contract.table.to_string(),
            message: format!("missing required column(s): {}", missing_mandatory.join(", ")),
        });
    }

    let rows = raw
        .rows
        .iter()
        .map(|row| {
            sources
                .iter()
                .map(|src| match src {
                    Some(i) => row.get(*i).cloned().unwrap_or(Value::Null),
                    None => Value::Null,
                })
                .collect()
        })
        .collect();

    Ok(Dataset {
        columns: contract.allowed_columns.clone(),
        rows,
    })
}

/// 2. Strip surrounding whitespace from every text cell.
fn trim_text(dataset: &mut Dataset) {
    for cell in dataset.rows.iter_mut().flatten() {
        if let Value::Text(s) = cell {
            let trimmed = s.trim();
            if trimmed.len() != s.len() {
                *s = trimmed.to_string();
            }
        }
    }
}

/// 3. Parse declared timestamp columns as UTC; failures become null.
fn parse_temporal(dataset: &mut Dataset, contract: &TableContract) {
    cast_columns(dataset, contract, |rule| rule == CastRule::Timestamp);
}

/// 4. Apply the remaining cast rules with soft-fail semantics.
fn apply_casts(dataset: &mut Dataset, contract: &TableContract) {
    cast_columns(dataset, contract, |rule| rule != CastRule::Timestamp);
}

fn cast_columns(dataset: &mut Dataset, contract: &TableContract, selects: impl Fn(CastRule) -> bool) {
    for (idx, column) in dataset.columns.iter().enumerate() {
        let cast: fn(Value) -> Value = match contract.cast_for(column) {
            Some(rule) if selects(rule) => match rule {
                CastRule::String => to_text,
                CastRule::Integer => to_integer,
                CastRule::Numeric | CastRule::Float => to_float,
                CastRule::Timestamp => to_timestamp,
            },
            _ => continue,
        };
        for row in &mut dataset.rows {
            let value = std::mem::replace(&mut row[idx], Value::Null);
            row[idx] = cast(value);
        }
    }
}

/// 5. Drop rows with a null in any required column. Returns rows dropped.
fn drop_missing_required(dataset: &mut Dataset, contract: &TableContract) -> usize {
    let required: Vec<usize> = contract
        .required_non_null
        .iter()
        .filter_map(|c| dataset.column_index(c))
        .collect();

    let before = dataset.rows.len();
    dataset
        .rows
        .retain(|row| required.iter().all(|&i| !row[i].is_null()));
    before - dataset.rows.len()
}

/// 6. Keep the last row per primary key. Survivors stay in input order.
fn dedup_last_wins(dataset: &mut Dataset, contract: &TableContract) -> usize {
    let key_columns: Vec<usize> = contract
        .primary_key
        .iter()
        .filter_map(|c| dataset.column_index(c))
        .collect();

    // null 與空字串是不同的 key；兩個 null 視為相同
    let keys: Vec<Vec<Option<String>>> = dataset
        .rows
        .iter()
        .map(|row| {
            key_columns
                .iter()
                .map(|&i| (!row[i].is_null()).then(|| row[i].render()))
                .collect()
        })
        .collect();

    let mut last_seen: HashMap<&[Option<String>], usize> = HashMap::with_capacity(keys.len());
    for (i, key) in keys.iter().enumerate() {
        last_seen.insert(key.as_slice(), i);
    }

    let before = dataset.rows.len();
    let rows = std::mem::take(&mut dataset.rows);
    dataset.rows = rows
        .into_iter()
        .enumerate()
        .filter(|(i, _)| last_seen.get(keys[*i].as_slice()) == Some(i))
        .map(|(_, row)| row)
        .collect();
    before - dataset.rows.len()
}

fn to_text(value: Value) -> Value {
    match value {
        Value::Null | Value::Text(_) => value,
        other => Value::Text(other.render()),
    }
}

fn to_integer(value: Value) -> Value {
    match value {
        Value::Integer(_) => value,
        Value::Text(s) => match s.parse::<i64>() {
            Ok(i) => Value::Integer(i),
            Err(_) => s.parse::<f64>().map_or(Value::Null, whole_number),
        },
        Value::Float(f) => whole_number(f),
        _ => Value::Null,
    }
}

fn whole_number(f: f64) -> Value {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Value::Integer(f as i64)
    } else {
        Value::Null
    }
}

fn to_float(value: Value) -> Value {
    let parsed = match value {
        Value::Float(f) => f,
        Value::Integer(i) => i as f64,
        Value::Text(s) => match s.parse::<f64>() {
            Ok(f) => f,
            Err(_) => return Value::Null,
        },
        _ => return Value::Null,
    };
    if parsed.is_nan() {
        Value::Null
    } else {
        Value::Float(parsed)
    }
}

fn to_timestamp(value: Value) -> Value {
    match value {
        Value::Timestamp(_) => value,
        Value::Text(s) => parse_utc(&s).map_or(Value::Null, Value::Timestamp),
        _ => Value::Null,
    }
}

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parses common ISO-8601 shapes as UTC. Values without an offset are taken
/// to be UTC already; a bare date means midnight.
pub fn parse_utc(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
