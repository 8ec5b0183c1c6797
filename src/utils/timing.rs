// src/utils/timing.rs
use std::time::Instant;

/// Elapsed-time checkpoints for one pipeline run.
///
/// Passed explicitly through the pipeline steps; each step records a
/// checkpoint once it completes and the whole log is emitted at the end.
#[derive(Debug, Clone)]
pub struct TimingLog {
    started: Instant,
    entries: Vec<String>,
}

impl TimingLog {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            entries: Vec::new(),
        }
    }

    /// Records the time elapsed since `start()` under `label`.
    pub fn mark(&mut self, label: &str) {
        let elapsed_ms = self.started.elapsed().as_millis();
        self.entries
            .push(format!("{}ms time passed after [{}]", elapsed_ms, label));
        tracing::debug!("Checkpoint [{}] after {}ms", label, elapsed_ms);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn log_summary(&self) {
        tracing::info!(timedelta_analysis = ?self.entries, "Timedelta analysis concluded.");
    }
}
