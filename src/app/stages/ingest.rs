use crate::config::sources::SourceLayout;
use crate::core::{Dataset, ObjectMeta, RunTimestamp, Stage, StageReport, Storage, TableReport, Value};
use crate::domain::keys::{self, Zone};
use crate::domain::schema::Table;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;

/// Column stamped onto every raw row.
pub const INGESTED_AT: &str = "ingested_at";

/// Local source CSVs → raw zone.
pub struct IngestStage<S: Storage> {
    storage: S,
    layout: SourceLayout,
}

impl<S: Storage> IngestStage<S> {
    pub fn new(storage: S, layout: SourceLayout) -> Self {
        Self { storage, layout }
    }

    pub async fn ingest_table(&self, table: Table, run_ts: &RunTimestamp) -> Result<TableReport> {
        let path = self.layout.path_for(table);
        let is_file = tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(EtlError::SourceNotFound {
                location: path.display().to_string(),
            });
        }

        tracing::debug!("Reading {} from {}", table, path.display());
        let data = tokio::fs::read(&path).await?;
        let mut dataset = Dataset::from_csv(&data)?;
        dataset.set_constant_column(INGESTED_AT, Value::Text(run_ts.to_string()));

        let key = keys::raw_key(table, run_ts.as_str())?;
        let meta = ObjectMeta::csv().with(Zone::Raw.metadata_key(), run_ts.as_str());
        self.storage.write_file(&key, &dataset.to_csv()?, &meta).await?;

        tracing::info!(
            "Successfully ingested {} rows to {} at {}",
            dataset.len(),
            self.storage.describe(&key),
            run_ts
        );

        Ok(TableReport {
            table,
            key,
            rows: dataset.len(),
            dropped: None,
        })
    }
}

#[async_trait]
impl<S: Storage> Stage for IngestStage<S> {
    fn name(&self) -> &'static str {
        "ingest"
    }

    async fn run(&self, run_ts: &RunTimestamp) -> Result<StageReport> {
        let mut report = StageReport::new(self.name());
        // 任何一張表失敗就中止，避免半套批次被當成完成
        for table in Table::ALL {
            report.tables.push(self.ingest_table(table, run_ts).await?);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::stages::test_support::MockStorage;
    use tempfile::TempDir;

    fn write_sources(dir: &TempDir, tables: &[Table]) {
        for table in tables {
            let path = dir.path().join(format!("{}.csv", table));
            std::fs::write(path, "id,name\n1, a \n2,b\n").unwrap();
        }
    }

    #[tokio::test]
    async fn test_ingest_stamps_every_row_and_writes_raw_key() {
        let dir = TempDir::new().unwrap();
        write_sources(&dir, &Table::ALL);

        let storage = MockStorage::default();
        let stage = IngestStage::new(storage.clone(), SourceLayout::new(dir.path()));
        let ts = RunTimestamp::parse("2024-03-05T10:20:30.123456+00:00").unwrap();

        let report = stage.run(&ts).await.unwrap();
        assert_eq!(report.tables.len(), 5);
        assert_eq!(report.total_rows(), 10);

        let files = storage.files.lock().await;
        let (data, meta) = files
            .get("raw/orders/2024/03/05/orders_20240305_102030.1234560000.csv")
            .unwrap();
        let csv = String::from_utf8(data.clone()).unwrap();
        assert_eq!(
            csv,
            "id,name,ingested_at\n\
             1, a ,2024-03-05T10:20:30.123456+00:00\n\
             2,b,2024-03-05T10:20:30.123456+00:00\n"
        );
        assert_eq!(meta.content_type, "text/csv");
        assert_eq!(
            meta.metadata.get("ingested_at").map(String::as_str),
            Some(ts.as_str())
        );
    }

    #[tokio::test]
    async fn test_missing_source_aborts_remaining_tables() {
        let dir = TempDir::new().unwrap();
        // payments.csv 缺失
        write_sources(&dir, &[Table::Orders, Table::OrderItems, Table::Customers, Table::Products]);

        let storage = MockStorage::default();
        let stage = IngestStage::new(storage.clone(), SourceLayout::new(dir.path()));
        let result = stage.run(&RunTimestamp::now()).await;

        match result {
            Err(EtlError::SourceNotFound { location }) => assert!(location.ends_with("payments.csv")),
            other => panic!("expected SourceNotFound, got {:?}", other),
        }
        // orders, order_items 已寫入；customers, products 未處理
        assert_eq!(storage.files.lock().await.len(), 2);
    }
}
