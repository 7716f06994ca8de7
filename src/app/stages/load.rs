use crate::core::{RunTimestamp, Stage, StageReport, Storage, TableReport, Warehouse};
use crate::domain::keys;
use crate::domain::schema::Table;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;

/// Clean zone → text-typed relations in the processing schema.
///
/// Columns come from the clean file's header, not from the registry, and are
/// all created as `text`; typing is left to the downstream models. Each table
/// is dropped and recreated on its own, so a failure halfway leaves earlier
/// tables freshly loaded and later ones untouched.
pub struct LoadStage<S: Storage, W: Warehouse> {
    storage: S,
    warehouse: W,
    schema: String,
}

impl<S: Storage, W: Warehouse> LoadStage<S, W> {
    pub fn new(storage: S, warehouse: W, schema: impl Into<String>) -> Self {
        Self {
            storage,
            warehouse,
            schema: schema.into(),
        }
    }

    pub async fn load_table(&self, table: Table, run_ts: &RunTimestamp) -> Result<TableReport> {
        let key = keys::clean_key(table, run_ts.as_str())?;
        tracing::info!("Loading {} from {}", table, self.storage.describe(&key));

        let body = self.storage.read_file(&key).await?;
        let columns = header_of(&body)?;
        if columns.is_empty() || columns.iter().any(|c| c.is_empty()) {
            return Err(EtlError::SchemaViolation {
                table: table.to_string(),
                message: format!("clean artifact {} has a missing or blank header", key),
            });
        }

        self.warehouse.drop_table(&self.schema, table.as_str()).await?;
        self.warehouse
            .create_text_table(&self.schema, table.as_str(), &columns)
            .await?;
        let rows = self
            .warehouse
            .copy_csv(&self.schema, table.as_str(), &columns, &body)
            .await?;

        tracing::info!("Loaded {} rows into {}.{}", rows, self.schema, table);
        Ok(TableReport {
            table,
            key,
            rows: rows as usize,
            dropped: None,
        })
    }
}

fn header_of(body: &[u8]) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(body);
    Ok(reader
        .headers()?
        .iter()
        .map(str::to_string)
        .collect())
}

#[async_trait]
impl<S: Storage, W: Warehouse> Stage for LoadStage<S, W> {
    fn name(&self) -> &'static str {
        "load"
    }

    async fn run(&self, run_ts: &RunTimestamp) -> Result<StageReport> {
        self.warehouse.ensure_schema(&self.schema).await?;

        let mut report = StageReport::new(self.name());
        for table in Table::ALL {
            report.tables.push(self.load_table(table, run_ts).await?);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::stages::test_support::MockStorage;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockWarehouse {
        statements: Arc<Mutex<Vec<String>>>,
    }

    impl Warehouse for MockWarehouse {
        async fn ensure_schema(&self, schema: &str) -> Result<()> {
            self.statements.lock().await.push(format!("schema {}", schema));
            Ok(())
        }

        async fn drop_table(&self, schema: &str, table: &str) -> Result<()> {
            self.statements
                .lock()
                .await
                .push(format!("drop {}.{}", schema, table));
            Ok(())
        }

        async fn create_text_table(&self, schema: &str, table: &str, columns: &[String]) -> Result<()> {
            self.statements
                .lock()
                .await
                .push(format!("create {}.{} ({})", schema, table, columns.join(",")));
            Ok(())
        }

        async fn copy_csv(
            &self,
            schema: &str,
            table: &str,
            _columns: &[String],
            body: &[u8],
        ) -> Result<u64> {
            let rows = body.iter().filter(|b| **b == b'\n').count() as u64 - 1;
            self.statements
                .lock()
                .await
                .push(format!("copy {}.{} {}", schema, table, rows));
            Ok(rows)
        }
    }

    const TS: &str = "2024-01-02T03:04:05.000006+00:00";

    async fn seed(storage: &MockStorage, tables: &[Table]) {
        for table in tables {
            storage
                .put(
                    &keys::clean_key(*table, TS).unwrap(),
                    b"id,value,ingested_at\n1,2.0,t\n2,,t\n",
                )
                .await;
        }
    }

    #[tokio::test]
    async fn test_load_replaces_each_table_with_header_columns() {
        let storage = MockStorage::default();
        seed(&storage, &Table::ALL).await;
        let warehouse = MockWarehouse::default();
        let stage = LoadStage::new(storage, warehouse.clone(), "stage");

        let report = stage.run(&RunTimestamp::parse(TS).unwrap()).await.unwrap();
        assert_eq!(report.total_rows(), 10);

        let statements = warehouse.statements.lock().await;
        assert_eq!(statements[0], "schema stage");
        assert_eq!(statements[1], "drop stage.orders");
        assert_eq!(statements[2], "create stage.orders (id,value,ingested_at)");
        assert_eq!(statements[3], "copy stage.orders 2");
        assert_eq!(statements.len(), 1 + 3 * Table::ALL.len());
    }

    #[tokio::test]
    async fn test_missing_clean_artifact_stops_the_load() {
        let storage = MockStorage::default();
        seed(&storage, &[Table::Orders]).await;
        let warehouse = MockWarehouse::default();
        let stage = LoadStage::new(storage, warehouse.clone(), "stage");

        let result = stage.run(&RunTimestamp::parse(TS).unwrap()).await;
        assert!(matches!(result, Err(EtlError::SourceNotFound { .. })));

        // orders 已載入，order_items 之後的表未被觸碰
        let statements = warehouse.statements.lock().await;
        assert_eq!(statements.len(), 4);
        assert!(statements.iter().all(|s| !s.contains("order_items")));
    }

    #[tokio::test]
    async fn test_empty_clean_artifact_is_schema_violation() {
        let storage = MockStorage::default();
        storage
            .put(&keys::clean_key(Table::Orders, TS).unwrap(), b"")
            .await;
        let stage = LoadStage::new(storage, MockWarehouse::default(), "stage");

        let result = stage
            .load_table(Table::Orders, &RunTimestamp::parse(TS).unwrap())
            .await;
        assert!(matches!(result, Err(EtlError::SchemaViolation { .. })));
    }

    #[test]
    fn test_header_of() {
        assert_eq!(
            header_of(b"order_id,customer_id\n1,A\n").unwrap(),
            vec!["order_id", "customer_id"]
        );
    }
}
