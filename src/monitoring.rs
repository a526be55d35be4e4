// Step timing and audit trail for a migration run
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Upper bound on retained audit entries
pub const MAX_AUDIT_ENTRIES: usize = 10_000;

/// Types of audited operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditOperationType {
    DataAccess,
    DataModification,
    DataExport,
}

/// Results of audited operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditResult {
    Success,
    PartialSuccess(String),
    Failure(String),
}

/// Status of a pipeline step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    InProgress,
    Completed,
    Failed(String),
}

/// Timing of one pipeline step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepMetric {
    pub step_id: String,
    pub name: String,
    pub status: StepStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub records_processed: Option<u64>,
    pub throughput: Option<f64>, // records per second
}

/// Audit log entry for an operation touching the destination collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub operation_type: AuditOperationType,
    pub namespace: String,
    pub action: String,
    pub result: AuditResult,
    pub details: HashMap<String, String>,
}

/// Snapshot of a run, serializable for `--summary` output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub total_duration_ms: u64,
    pub completed_steps: usize,
    pub failed_steps: usize,
    pub records_processed: u64,
    pub steps: Vec<StepMetric>,
    pub audit_entries: Vec<AuditEntry>,
}

/// Tracks the steps of one run. Clones share the same state.
#[derive(Debug, Clone)]
pub struct MigrationMonitor {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    steps: Arc<Mutex<Vec<StepMetric>>>,
    audit_log: Arc<Mutex<Vec<AuditEntry>>>,
}

impl Default for MigrationMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationMonitor {
    pub fn new() -> Self {
        let run_id = Uuid::new_v4();
        debug!(run_id = %run_id, "Initializing migration monitor");
        Self {
            run_id,
            started_at: Utc::now(),
            steps: Arc::new(Mutex::new(Vec::new())),
            audit_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Start timing a step
    pub fn start_step(&self, name: &str) -> StepTracker {
        let step_id = Uuid::new_v4().to_string();
        let start_time = Utc::now();

        if let Ok(mut steps) = self.steps.lock() {
            steps.push(StepMetric {
                step_id: step_id.clone(),
                name: name.to_string(),
                status: StepStatus::InProgress,
                start_time,
                end_time: None,
                duration_ms: None,
                records_processed: None,
                throughput: None,
            });
        }

        info!(run_id = %self.run_id, step = name, "Starting step");

        StepTracker {
            step_id,
            name: name.to_string(),
            start_time,
            monitor: self.clone(),
        }
    }

    fn finish_step(&self, step_id: &str, status: StepStatus, duration_ms: u64, records: Option<u64>) {
        let Ok(mut steps) = self.steps.lock() else {
            warn!("Failed to lock step metrics");
            return;
        };

        if let Some(metric) = steps.iter_mut().find(|m| m.step_id == step_id) {
            metric.status = status;
            metric.end_time = Some(Utc::now());
            metric.duration_ms = Some(duration_ms);
            metric.records_processed = records;
            if let Some(records) = records {
                if duration_ms > 0 {
                    metric.throughput = Some(records as f64 / (duration_ms as f64 / 1000.0));
                }
            }
        }
    }

    /// Record an audit entry and log it at a level matching its result
    pub fn log_audit_entry(
        &self,
        operation_type: AuditOperationType,
        namespace: &str,
        action: &str,
        result: AuditResult,
        details: HashMap<String, String>,
    ) {
        let entry = AuditEntry {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            operation_type,
            namespace: namespace.to_string(),
            action: action.to_string(),
            result,
            details,
        };

        match &entry.result {
            AuditResult::Success => info!(
                audit_id = %entry.id,
                operation_type = ?entry.operation_type,
                "Audit: {} on {} - SUCCESS", action, namespace
            ),
            AuditResult::PartialSuccess(msg) => warn!(
                audit_id = %entry.id,
                operation_type = ?entry.operation_type,
                "Audit: {} on {} - PARTIAL SUCCESS: {}", action, namespace, msg
            ),
            AuditResult::Failure(msg) => error!(
                audit_id = %entry.id,
                operation_type = ?entry.operation_type,
                "Audit: {} on {} - FAILURE: {}", action, namespace, msg
            ),
        }

        if let Ok(mut audit_log) = self.audit_log.lock() {
            audit_log.push(entry);
            if audit_log.len() > MAX_AUDIT_ENTRIES {
                audit_log.remove(0);
            }
        }
    }

    pub fn steps(&self) -> Vec<StepMetric> {
        self.steps.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit_log.lock().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn report(&self) -> MonitoringReport {
        let steps = self.steps();
        let completed_steps = steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count();
        let failed_steps = steps
            .iter()
            .filter(|s| matches!(s.status, StepStatus::Failed(_)))
            .count();
        let records_processed = steps.iter().filter_map(|s| s.records_processed).sum();
        let total_duration_ms = Utc::now()
            .signed_duration_since(self.started_at)
            .num_milliseconds()
            .max(0) as u64;

        MonitoringReport {
            run_id: self.run_id.to_string(),
            started_at: self.started_at,
            total_duration_ms,
            completed_steps,
            failed_steps,
            records_processed,
            steps,
            audit_entries: self.audit_entries(),
        }
    }
}

/// Handle for a running step; finish it with [`complete`](Self::complete) or [`fail`](Self::fail)
pub struct StepTracker {
    step_id: String,
    name: String,
    start_time: DateTime<Utc>,
    monitor: MigrationMonitor,
}

impl StepTracker {
    fn elapsed_ms(&self) -> u64 {
        Utc::now()
            .signed_duration_since(self.start_time)
            .num_milliseconds()
            .max(0) as u64
    }

    /// Mark the step completed, optionally with the number of records it handled
    pub fn complete(self, records: Option<u64>) {
        let duration_ms = self.elapsed_ms();
        info!(
            step = %self.name,
            duration_ms = duration_ms,
            records = ?records,
            "Step completed"
        );
        self.monitor
            .finish_step(&self.step_id, StepStatus::Completed, duration_ms, records);
    }

    pub fn fail(self, error: &str) {
        let duration_ms = self.elapsed_ms();
        error!(
            step = %self.name,
            duration_ms = duration_ms,
            error = error,
            "Step failed"
        );
        self.monitor.finish_step(
            &self.step_id,
            StepStatus::Failed(error.to_string()),
            duration_ms,
            None,
        );
    }

    /// Finish the step from a result, passing the result through
    pub fn finish<T, E: std::fmt::Display>(
        self,
        result: Result<T, E>,
        records: impl FnOnce(&T) -> Option<u64>,
    ) -> Result<T, E> {
        match &result {
            Ok(value) => {
                let count = records(value);
                self.complete(count);
            }
            Err(e) => self.fail(&e.to_string()),
        }
        result
    }
}
