use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;
use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::artifacts::ArtifactStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub level: LogLevel,
    pub step: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_key: Option<String>,
}

#[derive(Default)]
struct LogBuffer {
    entries: Vec<LogEntry>,
    by_product: BTreeMap<String, Vec<LogEntry>>,
}

/// Outcome of writing a run's artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub written: Vec<String>,
    pub failed: Vec<String>,
}

/// Per-run log collector. Entries are kept in memory until [`RunLogger::flush`].
pub struct RunLogger {
    run_id: String,
    run_date: NaiveDate,
    started_at: DateTime<Utc>,
    clock: Instant,
    buffer: Mutex<LogBuffer>,
}

impl RunLogger {
    pub fn new(run_id: impl Into<String>) -> Self {
        let started_at = Utc::now();
        Self {
            run_id: run_id.into(),
            run_date: started_at.date_naive(),
            started_at,
            clock: Instant::now(),
            buffer: Mutex::new(LogBuffer::default()),
        }
    }

    /// Start a logger with a fresh run id (`run_<HHMMSS>_<8 hex>`).
    pub fn start() -> Self {
        let now = Utc::now();
        let suffix = Uuid::new_v4().simple().to_string();
        Self::new(format!("run_{}_{}", now.format("%H%M%S"), &suffix[..8]))
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Folder the artifacts land in: `runs/<date>/<run_id>`.
    pub fn log_folder(&self) -> String {
        format!("runs/{}/{}", self.run_date.format("%Y-%m-%d"), self.run_id)
    }

    pub fn debug(&self, step: &str, message: &str, data: Option<Value>, product_key: Option<&str>) {
        self.record(LogLevel::Debug, step, message, data, product_key);
    }

    pub fn info(&self, step: &str, message: &str, data: Option<Value>, product_key: Option<&str>) {
        self.record(LogLevel::Info, step, message, data, product_key);
    }

    pub fn warn(&self, step: &str, message: &str, data: Option<Value>, product_key: Option<&str>) {
        self.record(LogLevel::Warn, step, message, data, product_key);
    }

    pub fn error(&self, step: &str, message: &str, data: Option<Value>, product_key: Option<&str>) {
        self.record(LogLevel::Error, step, message, data, product_key);
    }

    fn record(
        &self,
        level: LogLevel,
        step: &str,
        message: &str,
        data: Option<Value>,
        product_key: Option<&str>,
    ) {
        let product = product_key.unwrap_or("-");
        match level {
            LogLevel::Debug => tracing::debug!(run_id = %self.run_id, step, product, "{message}"),
            LogLevel::Info => tracing::info!(run_id = %self.run_id, step, product, "{message}"),
            LogLevel::Warn => tracing::warn!(run_id = %self.run_id, step, product, "{message}"),
            LogLevel::Error => tracing::error!(run_id = %self.run_id, step, product, "{message}"),
        }

        let entry = LogEntry {
            timestamp: Utc::now(),
            elapsed_ms: self.clock.elapsed().as_millis() as u64,
            level,
            step: step.to_string(),
            message: message.to_string(),
            data,
            product_key: product_key.map(str::to_string),
        };

        let mut buffer = self.lock_buffer();
        if let Some(key) = product_key {
            buffer
                .by_product
                .entry(key.to_string())
                .or_default()
                .push(entry.clone());
        }
        buffer.entries.push(entry);
    }

    /// Snapshot of every entry logged so far.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock_buffer().entries.clone()
    }

    /// Entries logged against one product key.
    pub fn product_entries(&self, product_key: &str) -> Vec<LogEntry> {
        self.lock_buffer()
            .by_product
            .get(product_key)
            .cloned()
            .unwrap_or_default()
    }

    fn lock_buffer(&self) -> std::sync::MutexGuard<'_, LogBuffer> {
        match self.buffer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Write the run's artifacts. Each upload is attempted independently;
    /// failures are reported via `tracing` and in the returned report.
    pub async fn flush<S: Serialize>(&self, summary: &S, store: &dyn ArtifactStore) -> FlushReport {
        let summary = match serde_json::to_value(summary) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(run_id = %self.run_id, error = %e, "Failed to serialize run summary");
                Value::Null
            }
        };

        let (entries, by_product) = {
            let buffer = self.lock_buffer();
            (buffer.entries.clone(), buffer.by_product.clone())
        };
        let folder = self.log_folder();

        let issues: Vec<&LogEntry> = entries
            .iter()
            .filter(|e| matches!(e.level, LogLevel::Warn | LogLevel::Error))
            .collect();

        let mut documents: Vec<(String, Value)> = vec![
            (
                format!("{folder}/full_run.json"),
                json!({
                    "run_id": self.run_id,
                    "started_at": self.started_at,
                    "summary": summary,
                    "total_entries": entries.len(),
                    "entries": entries,
                }),
            ),
            (
                format!("{folder}/summary.json"),
                json!({
                    "run_id": self.run_id,
                    "started_at": self.started_at,
                    "summary": summary,
                    "issues": issues,
                }),
            ),
        ];

        for (key, product_entries) in &by_product {
            documents.push((
                format!("{folder}/products/{}.json", sanitize_key(key)),
                json!({
                    "run_id": self.run_id,
                    "product_key": key,
                    "entries": product_entries,
                }),
            ));
        }

        let mut report = FlushReport::default();
        for (path, document) in documents {
            let body = match serde_json::to_vec_pretty(&document) {
                Ok(b) => b,
                Err(e) => {
                    tracing::error!(path = %path, error = %e, "Failed to encode run log artifact");
                    report.failed.push(path);
                    continue;
                }
            };

            match store.put_json(&path, body).await {
                Ok(()) => report.written.push(path),
                Err(e) => {
                    tracing::error!(path = %path, error = %e, "Failed to upload run log artifact");
                    report.failed.push(path);
                }
            }
        }

        tracing::info!(
            run_id = %self.run_id,
            folder = %folder,
            written = report.written.len(),
            failed = report.failed.len(),
            "Run log flushed"
        );

        report
    }
}

/// File-name-safe form of a product key: lowercase ASCII alphanumerics with
/// single underscores, capped at 80 chars.
pub fn sanitize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut last_underscore = true;

    for c in key.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_underscore = false;
        } else if !last_underscore {
            out.push('_');
            last_underscore = true;
        }
    }

    let trimmed: String = out.trim_end_matches('_').chars().take(80).collect();
    if trimmed.is_empty() {
        "unnamed".into()
    } else {
        trimmed
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
