#[cfg(feature = "cli")]
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessesToUpdate, System};

#[cfg(feature = "cli")]
#[derive(Debug, Clone)]
pub struct SystemStats {
    pub cpu_usage: f32,
    pub memory_usage_mb: u64,
    pub peak_memory_mb: u64,
    pub elapsed_time: Duration,
}

/// Process CPU / memory snapshots logged between stages (`--monitor`).
#[cfg(feature = "cli")]
pub struct SystemMonitor {
    state: Option<MonitorState>,
}

#[cfg(feature = "cli")]
struct MonitorState {
    system: std::sync::Mutex<System>,
    pid: Pid,
    start_time: Instant,
    peak_memory: std::sync::atomic::AtomicU64,
}

#[cfg(feature = "cli")]
impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        // 取不到 PID 時直接停用監控，不影響主流程
        let state = enabled
            .then(sysinfo::get_current_pid)
            .and_then(|pid| pid.ok())
            .map(|pid| MonitorState {
                system: std::sync::Mutex::new(System::new()),
                pid,
                start_time: Instant::now(),
                peak_memory: std::sync::atomic::AtomicU64::new(0),
            });
        Self { state }
    }

    pub fn get_stats(&self) -> Option<SystemStats> {
        use std::sync::atomic::Ordering;

        let state = self.state.as_ref()?;
        let mut system = state.system.lock().ok()?;
        system.refresh_processes(ProcessesToUpdate::Some(&[state.pid]), true);

        let process = system.process(state.pid)?;
        let memory_mb = process.memory() / 1024 / 1024;
        let peak = state
            .peak_memory
            .fetch_max(memory_mb, Ordering::Relaxed)
            .max(memory_mb);

        Some(SystemStats {
            cpu_usage: process.cpu_usage(),
            memory_usage_mb: memory_mb,
            peak_memory_mb: peak,
            elapsed_time: state.start_time.elapsed(),
        })
    }

    pub fn log_stats(&self, phase: &str) {
        if let Some(stats) = self.get_stats() {
            tracing::info!(
                "📊 {} - CPU: {:.1}%, Memory: {}MB, Peak: {}MB, Time: {:?}",
                phase,
                stats.cpu_usage,
                stats.memory_usage_mb,
                stats.peak_memory_mb,
                stats.elapsed_time
            );
        }
    }

    pub fn log_final_stats(&self) {
        if let Some(stats) = self.get_stats() {
            tracing::info!(
                "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB",
                stats.elapsed_time,
                stats.peak_memory_mb
            );
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.state.is_some()
    }
}

// 非 CLI 環境的空實現
#[cfg(not(feature = "cli"))]
pub struct SystemMonitor;

#[cfg(not(feature = "cli"))]
impl SystemMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn log_stats(&self, _phase: &str) {}

    pub fn log_final_stats(&self) {}

    pub fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_monitor_reports_nothing() {
        let monitor = SystemMonitor::new(false);
        assert!(!monitor.is_enabled());
        assert!(monitor.get_stats().is_none());
    }
}
