use crate::core::cleaning::CleaningEngine;
use crate::core::{Dataset, ObjectMeta, RunTimestamp, Stage, StageReport, Storage, TableReport};
use crate::domain::keys::{self, Zone};
use crate::domain::schema::{SchemaRegistry, Table};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Raw zone → clean zone, one table at a time.
pub struct CleanStage<S: Storage> {
    storage: S,
    registry: Arc<SchemaRegistry>,
}

impl<S: Storage> CleanStage<S> {
    pub fn new(storage: S, registry: Arc<SchemaRegistry>) -> Self {
        Self { storage, registry }
    }

    pub async fn clean_table(&self, table: Table, run_ts: &RunTimestamp) -> Result<TableReport> {
        let raw_key = keys::raw_key(table, run_ts.as_str())?;
        let raw = Dataset::from_csv(&self.storage.read_file(&raw_key).await?)?;

        let outcome = CleaningEngine::new(&self.registry).clean(&raw, table)?;

        let clean_key = keys::clean_key(table, run_ts.as_str())?;
        let meta = ObjectMeta::csv().with(Zone::Clean.metadata_key(), run_ts.as_str());
        self.storage
            .write_file(&clean_key, &outcome.dataset.to_csv()?, &meta)
            .await?;

        let report = outcome.report;
        tracing::info!(
            "Successfully cleaned {} rows to {} at {} (dropped: {} missing required, {} duplicates)",
            report.output_rows,
            self.storage.describe(&clean_key),
            run_ts,
            report.dropped_missing_required,
            report.dropped_duplicates
        );

        Ok(TableReport {
            table,
            key: clean_key,
            rows: report.output_rows,
            dropped: Some((report.dropped_missing_required, report.dropped_duplicates)),
        })
    }
}

#[async_trait]
impl<S: Storage> Stage for CleanStage<S> {
    fn name(&self) -> &'static str {
        "clean"
    }

    async fn run(&self, run_ts: &RunTimestamp) -> Result<StageReport> {
        let mut report = StageReport::new(self.name());
        for table in Table::ALL {
            report.tables.push(self.clean_table(table, run_ts).await?);
        }
        Ok(report)
    }
}
