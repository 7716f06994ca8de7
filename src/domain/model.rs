use crate::domain::schema::Table;
use crate::utils::error::{EtlError, Result};
use chrono::{DateTime, Timelike, Utc};

/// Cell values the raw reader treats as missing, matching the default NA
/// markers of the dataframe tooling that produced the existing artifacts.
pub const NULL_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Raw CSV cell → value. Everything non-missing starts out as text.
    pub fn from_raw(cell: &str) -> Self {
        if NULL_MARKERS.contains(&cell) {
            Value::Null
        } else {
            Value::Text(cell.to_string())
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// CSV rendering used for the clean zone.
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => render_float(*f),
            Value::Timestamp(ts) => render_timestamp(ts),
        }
    }
}

fn render_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

fn render_timestamp(ts: &DateTime<Utc>) -> String {
    if ts.nanosecond() == 0 {
        ts.format("%Y-%m-%d %H:%M:%S+00:00").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S%.6f+00:00").to_string()
    }
}

/// 一張表的記憶體內表示：有序欄位 + 有序資料列
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Short records are padded with nulls; a record longer than the header
    /// is a `MalformedRecord`.
    pub fn from_csv(data: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(data);

        let columns = reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.len() > columns.len() {
                return Err(EtlError::MalformedRecord {
                    line: record.position().map(|p| p.line()).unwrap_or_default(),
                    expected: columns.len(),
                    found: record.len(),
                });
            }
            let mut row: Vec<Value> = record.iter().map(Value::from_raw).collect();
            row.resize(columns.len(), Value::Null);
            rows.push(row);
        }

        Ok(Self { columns, rows })
    }

    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(Value::render))?;
        }
        writer
            .into_inner()
            .map_err(|e| EtlError::IoError(e.into_error()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Sets `name` to `value` on every row, appending the column if absent.
    pub fn set_constant_column(&mut self, name: &str, value: Value) {
        match self.column_index(name) {
            Some(idx) => {
                for row in &mut self.rows {
                    row[idx] = value.clone();
                }
            }
            None => {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(value.clone());
                }
            }
        }
    }
}

/// Per-table outcome of a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReport {
    pub table: Table,
    pub key: String,
    pub rows: usize,
    /// Rows removed by the null gate and by deduplication (clean stage only).
    pub dropped: Option<(usize, usize)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: &'static str,
    pub tables: Vec<TableReport>,
}

impl StageReport {
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            tables: Vec::new(),
        }
    }

    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.rows).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_from_csv_maps_missing_markers_to_null() {
        let csv = "id,name,weight\n1,,NA\n2, shoe ,nan\n";
        let dataset = Dataset::from_csv(csv.as_bytes()).unwrap();

        assert_eq!(dataset.columns, vec!["id", "name", "weight"]);
        assert_eq!(dataset.len(), 2);
        assert!(dataset.value(0, "name").unwrap().is_null());
        assert!(dataset.value(0, "weight").unwrap().is_null());
        // 空白字元不是缺值，留給 trim 步驟處理
        assert_eq!(
            dataset.value(1, "name"),
            Some(&Value::Text(" shoe ".to_string()))
        );
    }

    #[test]
    fn test_from_csv_pads_short_records_with_null() {
        let dataset = Dataset::from_csv(b"a,b,c\n1,2\n").unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.rows[0].len(), 3);
        assert_eq!(dataset.value(0, "b"), Some(&Value::Text("2".to_string())));
        assert!(dataset.value(0, "c").unwrap().is_null());

        let products = Dataset::from_csv(
            b"product_id,product_category_name,product_weight_g\np1,toys\np2,books,250\n",
        )
        .unwrap();
        assert_eq!(products.len(), 2);
        assert!(products.value(0, "product_weight_g").unwrap().is_null());
    }

    #[test]
    fn test_from_csv_rejects_records_longer_than_header() {
        let result = Dataset::from_csv(b"a,b\n1,2\n3,4,5\n");
        match result {
            Err(EtlError::MalformedRecord {
                line,
                expected,
                found,
            }) => {
                assert_eq!(line, 3);
                assert_eq!(expected, 2);
                assert_eq!(found, 3);
            }
            other => panic!("expected MalformedRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_render_values() {
        assert_eq!(Value::Null.render(), "");
        assert_eq!(Value::Integer(42).render(), "42");
        assert_eq!(Value::Float(10.0).render(), "10.0");
        assert_eq!(Value::Float(19.9).render(), "19.9");

        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(Value::Timestamp(ts).render(), "2024-01-01 00:00:00+00:00");

        let precise = Utc
            .with_ymd_and_hms(2024, 1, 1, 8, 30, 0)
            .unwrap()
            .with_nanosecond(123_456_000)
            .unwrap();
        assert_eq!(
            Value::Timestamp(precise).render(),
            "2024-01-01 08:30:00.123456+00:00"
        );
    }

    #[test]
    fn test_to_csv_quotes_and_nulls() {
        let mut dataset = Dataset::new(vec!["id".to_string(), "city".to_string()]);
        dataset
            .rows
            .push(vec![Value::Integer(1), Value::Text("sao paulo, sp".to_string())]);
        dataset.rows.push(vec![Value::Integer(2), Value::Null]);

        let csv = String::from_utf8(dataset.to_csv().unwrap()).unwrap();
        assert_eq!(csv, "id,city\n1,\"sao paulo, sp\"\n2,\n");
    }

    #[test]
    fn test_set_constant_column_appends_and_overwrites() {
        let mut dataset = Dataset::from_csv(b"id\n1\n2\n").unwrap();
        dataset.set_constant_column("ingested_at", Value::Text("t1".to_string()));
        assert_eq!(dataset.columns, vec!["id", "ingested_at"]);
        assert_eq!(
            dataset.value(1, "ingested_at"),
            Some(&Value::Text("t1".to_string()))
        );

        dataset.set_constant_column("ingested_at", Value::Text("t2".to_string()));
        assert_eq!(dataset.columns.len(), 2);
        assert_eq!(
            dataset.value(0, "ingested_at"),
            Some(&Value::Text("t2".to_string()))
        );
    }
}
