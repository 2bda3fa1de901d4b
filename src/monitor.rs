use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use crate::error::MenuError;

/// Operations slower than this get a warning when they finish.
const SLOW_OPERATION_THRESHOLD_MS: f64 = 1000.0;
/// How many recent errors `stats` exposes. All errors are still counted.
const RECENT_ERROR_WINDOW: usize = 5;

struct Measurement {
    name: String,
    started: Instant,
    duration_ms: Option<f64>,
    metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub name: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub context: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationStat {
    pub name: String,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStats {
    pub total_measurements: usize,
    pub average_duration_ms: f64,
    pub fastest_operation: Option<OperationStat>,
    pub slowest_operation: Option<OperationStat>,
    pub error_count: usize,
    pub recent_errors: Vec<ErrorRecord>,
}

struct MonitorState {
    measurements: Vec<Measurement>,
    errors: Vec<ErrorRecord>,
}

/// Named start/stop timer registry plus an error log.
///
/// Purely observational: nothing here alters control flow or fails.
pub struct PerformanceMonitor {
    inner: Mutex<MonitorState>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MonitorState {
                measurements: Vec::new(),
                errors: Vec::new(),
            }),
        }
    }

    /// Records a start timestamp under `name` and returns the token used to
    /// finish the measurement.
    pub fn start_measure(
        &self,
        name: &str,
        metadata: Option<HashMap<String, String>>,
    ) -> String {
        let mut state = self.inner.lock().expect("monitor mutex poisoned");
        state.measurements.push(Measurement {
            name: name.to_string(),
            started: Instant::now(),
            duration_ms: None,
            metadata: metadata.unwrap_or_default(),
        });
        tracing::debug!("Started measuring: {}", name);
        name.to_string()
    }

    /// Completes the most recent unfinished measurement matching `token`.
    pub fn end_measure(&self, token: &str) -> Option<f64> {
        let mut state = self.inner.lock().expect("monitor mutex poisoned");

        let measurement = state
            .measurements
            .iter_mut()
            .rev()
            .find(|m| m.name == token && m.duration_ms.is_none());

        let Some(measurement) = measurement else {
            tracing::warn!("Performance measurement '{}' not found or already ended", token);
            return None;
        };

        let duration_ms = measurement.started.elapsed().as_secs_f64() * 1000.0;
        measurement.duration_ms = Some(duration_ms);
        tracing::debug!(metadata = ?measurement.metadata, "Completed measuring: {} - {:.2}ms", token, duration_ms);

        if duration_ms > SLOW_OPERATION_THRESHOLD_MS {
            tracing::warn!("Slow operation detected: {} took {:.2}ms", token, duration_ms);
        }

        Some(duration_ms)
    }

    pub fn record_error(
        &self,
        name: &str,
        error: &MenuError,
        context: Option<HashMap<String, String>>,
    ) {
        let mut state = self.inner.lock().expect("monitor mutex poisoned");
        state.errors.push(ErrorRecord {
            name: name.to_string(),
            message: error.to_string(),
            timestamp: Utc::now(),
            context: context.unwrap_or_default(),
        });
        tracing::debug!("Recorded error in {}: {}", name, error);
    }

    pub fn stats(&self) -> MonitorStats {
        let state = self.inner.lock().expect("monitor mutex poisoned");

        let completed: Vec<(&str, f64)> = state
            .measurements
            .iter()
            .filter_map(|m| m.duration_ms.map(|d| (m.name.as_str(), d)))
            .collect();

        let average_duration_ms = if completed.is_empty() {
            0.0
        } else {
            completed.iter().map(|(_, d)| d).sum::<f64>() / completed.len() as f64
        };

        let fastest_operation = completed
            .iter()
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(name, duration_ms)| OperationStat {
                name: name.to_string(),
                duration_ms: *duration_ms,
            });
        let slowest_operation = completed
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(name, duration_ms)| OperationStat {
                name: name.to_string(),
                duration_ms: *duration_ms,
            });

        let recent_errors = state
            .errors
            .iter()
            .rev()
            .take(RECENT_ERROR_WINDOW)
            .rev()
            .cloned()
            .collect();

        MonitorStats {
            total_measurements: completed.len(),
            average_duration_ms,
            fastest_operation,
            slowest_operation,
            error_count: state.errors.len(),
            recent_errors,
        }
    }

    /// Drops all measurements and errors. Used for test isolation.
    pub fn clear(&self) {
        let mut state = self.inner.lock().expect("monitor mutex poisoned");
        state.measurements.clear();
        state.errors.clear();
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}
