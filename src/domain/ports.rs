use crate::domain::keys::RunTimestamp;
use crate::domain::model::StageReport;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Content type and audit metadata attached to a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub content_type: String,
    pub metadata: BTreeMap<String, String>,
}

impl ObjectMeta {
    pub fn csv() -> Self {
        Self {
            content_type: "text/csv".to_string(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }
}

/// Object storage. A missing key must surface as `EtlError::SourceNotFound`.
pub trait Storage: Send + Sync {
    fn read_file(&self, key: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        key: &str,
        data: &[u8],
        meta: &ObjectMeta,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Human-readable location of a key, used in log lines.
    fn describe(&self, key: &str) -> String;
}

/// Relational target for staged tables. Identifiers are passed unquoted.
pub trait Warehouse: Send + Sync {
    fn ensure_schema(&self, schema: &str) -> impl std::future::Future<Output = Result<()>> + Send;
    fn drop_table(
        &self,
        schema: &str,
        table: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Creates `schema.table` with every column typed as text.
    fn create_text_table(
        &self,
        schema: &str,
        table: &str,
        columns: &[String],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Bulk-loads a CSV body (header line included), returning rows loaded.
    fn copy_csv(
        &self,
        schema: &str,
        table: &str,
        columns: &[String],
        body: &[u8],
    ) -> impl std::future::Future<Output = Result<u64>> + Send;
}

/// One step of a run. Stages are executed strictly in sequence.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self, run_ts: &RunTimestamp) -> Result<StageReport>;
}
