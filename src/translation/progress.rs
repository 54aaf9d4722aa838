/*!
 * Progress reporting for translation runs.
 *
 * The orchestrator reports leveled events through [`ProgressLogger`]. Reporting
 * never fails and never influences control flow.
 */

use log::{error, info, warn};
use parking_lot::Mutex;

/// Receiver of leveled progress events
pub trait ProgressLogger: Send + Sync {
    fn info(&self, message: &str);

    fn success(&self, message: &str);

    fn warning(&self, message: &str);

    fn error(&self, message: &str);

    /// Called after each batch finishes, whichever path it took
    fn batch_progress(&self, completed: usize, total: usize);
}

/// Log entry for capturing progress events
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Log level (info, success, warning, error, progress)
    pub level: String,
    /// Log message
    pub message: String,
}

/// Progress logger that forwards events to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressLogger for LogProgress {
    fn info(&self, message: &str) {
        info!("{}", message);
    }

    fn success(&self, message: &str) {
        info!("✓ {}", message);
    }

    fn warning(&self, message: &str) {
        warn!("{}", message);
    }

    fn error(&self, message: &str) {
        error!("{}", message);
    }

    fn batch_progress(&self, completed: usize, total: usize) {
        info!("Translated batch {}/{}", completed, total);
    }
}

/// Progress logger that keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingProgress {
    entries: Mutex<Vec<LogEntry>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the captured events in arrival order
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Number of captured events with the given level
    pub fn count(&self, level: &str) -> usize {
        self.entries.lock().iter().filter(|e| e.level == level).count()
    }

    /// Messages captured with the given level
    pub fn messages(&self, level: &str) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.level == level)
            .map(|e| e.message.clone())
            .collect()
    }

    fn push(&self, level: &str, message: String) {
        self.entries.lock().push(LogEntry {
            level: level.to_string(),
            message,
        });
    }
}

impl ProgressLogger for RecordingProgress {
    fn info(&self, message: &str) {
        self.push("info", message.to_string());
    }

    fn success(&self, message: &str) {
        self.push("success", message.to_string());
    }

    fn warning(&self, message: &str) {
        self.push("warning", message.to_string());
    }

    fn error(&self, message: &str) {
        self.push("error", message.to_string());
    }

    fn batch_progress(&self, completed: usize, total: usize) {
        self.push("progress", format!("{}/{}", completed, total));
    }
}
