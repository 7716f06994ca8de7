use crate::core::{RunTimestamp, Stage, StageReport};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Runs stages one after another for a single run timestamp.
///
/// The first failing stage aborts the run; later stages never start, since
/// each one reads the artifacts the previous one wrote under the same
/// timestamp.
pub struct EtlEngine {
    stages: Vec<Box<dyn Stage>>,
    monitor: SystemMonitor,
}

impl EtlEngine {
    pub fn new() -> Self {
        Self::new_with_monitoring(false)
    }

    pub fn new_with_monitoring(monitor_enabled: bool) -> Self {
        Self {
            stages: Vec::new(),
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn add_stage(&mut self, stage: Box<dyn Stage>) {
        self.stages.push(stage);
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub async fn run(&self, run_ts: &RunTimestamp) -> Result<Vec<StageReport>> {
        tracing::info!("🚀 Starting run {} ({} stages)", run_ts, self.stages.len());
        self.monitor.log_stats("start");

        let mut reports = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            tracing::info!("▶️  Stage '{}' started", stage.name());

            let report = stage.run(run_ts).await.map_err(|e| {
                tracing::error!("❌ Stage '{}' failed: {}", stage.name(), e);
                e
            })?;

            tracing::info!(
                "✅ Stage '{}' finished: {} tables, {} rows",
                stage.name(),
                report.tables.len(),
                report.total_rows()
            );
            self.monitor.log_stats(stage.name());
            reports.push(report);
        }

        self.monitor.log_final_stats();
        Ok(reports)
    }
}

impl Default for EtlEngine {
    fn default() -> Self {
        Self::new()
    }
}
