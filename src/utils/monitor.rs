#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessesToUpdate, System};

/// Resource usage of the current process at the end of a run phase.
#[cfg(feature = "cli")]
#[derive(Debug, Clone)]
pub struct PhaseStats {
    pub cpu_percent: f32,
    pub rss_mb: u64,
    pub rss_share: f32,
    pub peak_rss_mb: u64,
    pub elapsed: Duration,
}

#[cfg(feature = "cli")]
struct Sampler {
    system: System,
    pid: Pid,
    peak_rss_mb: u64,
}

#[cfg(feature = "cli")]
impl Sampler {
    fn sample(&mut self) -> Option<(f32, u64, f32)> {
        self.system.refresh_memory();
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);

        let process = self.system.process(self.pid)?;
        let rss_mb = process.memory() / (1024 * 1024);
        let total_mb = self.system.total_memory() / (1024 * 1024);
        let share = if total_mb == 0 {
            0.0
        } else {
            rss_mb as f32 * 100.0 / total_mb as f32
        };
        self.peak_rss_mb = self.peak_rss_mb.max(rss_mb);

        Some((process.cpu_usage(), rss_mb, share))
    }
}

/// 每個 ETL 階段的 CPU / 記憶體統計；停用時不做任何取樣
#[cfg(feature = "cli")]
pub struct SystemMonitor {
    sampler: Option<Mutex<Sampler>>,
    started: Instant,
}

#[cfg(feature = "cli")]
impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        let sampler = enabled
            .then(|| sysinfo::get_current_pid().ok())
            .flatten()
            .map(|pid| {
                let mut sampler = Sampler {
                    system: System::new(),
                    pid,
                    peak_rss_mb: 0,
                };
                // CPU usage needs a previous sample to diff against.
                sampler.sample();
                Mutex::new(sampler)
            });

        Self {
            sampler,
            started: Instant::now(),
        }
    }

    pub fn get_stats(&self) -> Option<PhaseStats> {
        let mut sampler = self.sampler.as_ref()?.lock().ok()?;
        let (cpu_percent, rss_mb, rss_share) = sampler.sample()?;

        Some(PhaseStats {
            cpu_percent,
            rss_mb,
            rss_share,
            peak_rss_mb: sampler.peak_rss_mb,
            elapsed: self.started.elapsed(),
        })
    }

    pub fn log_stats(&self, phase: &str) {
        let Some(stats) = self.get_stats() else {
            return;
        };
        tracing::info!(
            phase,
            "📊 CPU {:.1}% | RSS {}MB ({:.1}%) | peak {}MB | {:?}",
            stats.cpu_percent,
            stats.rss_mb,
            stats.rss_share,
            stats.peak_rss_mb,
            stats.elapsed
        );
    }

    pub fn log_final_stats(&self) {
        if let Some(stats) = self.get_stats() {
            tracing::info!(
                "📊 Run finished in {:?}, peak memory {}MB",
                stats.elapsed,
                stats.peak_rss_mb
            );
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sampler.is_some()
    }
}

// 非 CLI 環境的空實現
#[cfg(not(feature = "cli"))]
#[derive(Default)]
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

    #[test]
    fn test_peak_never_below_current() {
        let monitor = SystemMonitor::new(true);
        if let Some(stats) = monitor.get_stats() {
            assert!(stats.peak_rss_mb >= stats.rss_mb);
        }
    }
}
