// Migration pipeline: load → normalize → connect → load → verify → export
use crate::config::MigrationConfig;
use crate::dataset_loader::{CleaningReport, DatasetLoader};
use crate::error::MigrationError;
use crate::exporter::{export_collection, ExportSummary};
use crate::loader::{load_records, verify_collection, LoadSummary, VerificationReport};
use crate::monitoring::{AuditOperationType, AuditResult, MigrationMonitor, MonitoringReport};
use crate::normalizer::{normalize_all, NormalizationStatistics};
use crate::store::{ConnectionManager, Connector, DocumentStore, Sleeper, TokioSleeper};
use crate::types::NormalizedRecord;
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

/// Source file contents after cleaning and normalization
#[derive(Debug, Clone)]
pub struct PreparedBatch {
    pub columns: Vec<String>,
    pub records: Vec<NormalizedRecord>,
    pub cleaning: CleaningReport,
    pub statistics: NormalizationStatistics,
}

/// Everything a full migration run produced
#[derive(Debug, Clone, Serialize)]
pub struct MigrationOutcome {
    pub namespace: String,
    pub cleaning: CleaningReport,
    pub normalization: NormalizationStatistics,
    pub load: LoadSummary,
    pub verification: VerificationReport,
    pub export: Option<ExportSummary>,
    pub monitoring: MonitoringReport,
}

impl MigrationOutcome {
    /// A run succeeds when the loaded collection passed verification
    pub fn is_successful(&self) -> bool {
        self.verification.is_valid
    }

    pub fn summary(&self) -> String {
        let export = match &self.export {
            Some(export) => format!("{} documents exported to {:?}", export.documents, export.path),
            None => "export skipped".to_string(),
        };
        format!(
            "{} rows read, {} duplicates removed, {} rows dropped for missing values, {} documents loaded into {}, verification {}, {}",
            self.cleaning.input_rows,
            self.cleaning.duplicates_removed,
            self.cleaning.rows_with_missing_dropped,
            self.load.inserted,
            self.namespace,
            if self.verification.is_valid { "passed" } else { "FAILED" },
            export
        )
    }
}

/// Drives a migration run through a [`Connector`]
pub struct MigrationPipeline<C, S = TokioSleeper> {
    config: MigrationConfig,
    manager: ConnectionManager<C, S>,
    loader: DatasetLoader,
    export_enabled: bool,
    monitor: MigrationMonitor,
}

impl<C: Connector> MigrationPipeline<C> {
    pub fn new(config: MigrationConfig, connector: C) -> Self {
        let manager = ConnectionManager::new(connector, config.retry);
        Self::from_parts(config, manager)
    }
}

impl<C: Connector, S: Sleeper> MigrationPipeline<C, S> {
    /// Pipeline whose connection retries pause through `sleeper`
    pub fn with_sleeper(config: MigrationConfig, connector: C, sleeper: S) -> Self {
        let manager = ConnectionManager::with_sleeper(connector, config.retry, sleeper);
        Self::from_parts(config, manager)
    }

    fn from_parts(config: MigrationConfig, manager: ConnectionManager<C, S>) -> Self {
        Self {
            config,
            manager,
            loader: DatasetLoader::new(),
            export_enabled: true,
            monitor: MigrationMonitor::new(),
        }
    }

    pub fn with_loader(mut self, loader: DatasetLoader) -> Self {
        self.loader = loader;
        self
    }

    /// Enable or disable the final export step
    pub fn with_export(mut self, enabled: bool) -> Self {
        self.export_enabled = enabled;
        self
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    pub fn monitor(&self) -> &MigrationMonitor {
        &self.monitor
    }

    /// Read, clean and normalize the configured source file
    pub fn prepare(&self) -> Result<PreparedBatch, MigrationError> {
        let dataset = self
            .monitor
            .start_step("load_dataset")
            .finish(self.loader.load(&self.config.input_path), |d| Some(d.len() as u64))?;

        let tracker = self.monitor.start_step("normalize");
        let normalized = normalize_all(&dataset.rows);
        tracker.complete(Some(normalized.records.len() as u64));

        Ok(PreparedBatch {
            columns: dataset.columns,
            records: normalized.records,
            cleaning: dataset.report,
            statistics: normalized.statistics,
        })
    }

    /// Connect to the destination collection, retrying per the configured policy
    pub async fn connect(&self) -> Result<C::Store, MigrationError> {
        let tracker = self.monitor.start_step("connect");
        let result = self.manager.connect(&self.config.mongo).await;
        tracker.finish(result, |_| None)
    }

    /// Run the whole migration. Fatal errors abort the run; a failed verification
    /// is reported in the outcome.
    pub async fn run(&self) -> Result<MigrationOutcome, MigrationError> {
        info!(run_id = %self.monitor.run_id(), "Starting migration from {:?}", self.config.input_path);

        let batch = self.prepare()?;
        let store = self.connect().await?;
        let namespace = store.namespace();

        let load = self.load(&store, &batch.records).await?;

        let verification = self
            .monitor
            .start_step("verify")
            .finish(verify_collection(&store, &batch.records).await, |r| {
                Some(r.document_count as u64)
            })?;

        let export = if self.export_enabled {
            Some(self.export(&store).await?)
        } else {
            info!("Export disabled, skipping");
            None
        };

        let outcome = MigrationOutcome {
            namespace,
            cleaning: batch.cleaning,
            normalization: batch.statistics,
            load,
            verification,
            export,
            monitoring: self.monitor.report(),
        };

        info!("Migration finished: {}", outcome.summary());
        Ok(outcome)
    }

    /// Verify the current collection against the configured source file
    pub async fn verify_only(&self) -> Result<VerificationReport, MigrationError> {
        let batch = self.prepare()?;
        let store = self.connect().await?;
        self.monitor
            .start_step("verify")
            .finish(verify_collection(&store, &batch.records).await, |r| {
                Some(r.document_count as u64)
            })
    }

    /// Export the current collection to the configured export path
    pub async fn export_only(&self) -> Result<ExportSummary, MigrationError> {
        let store = self.connect().await?;
        self.export(&store).await
    }

    async fn load(&self, store: &C::Store, records: &[NormalizedRecord]) -> Result<LoadSummary, MigrationError> {
        let namespace = store.namespace();
        let tracker = self.monitor.start_step("load_collection");

        match load_records(store, records).await {
            Ok(summary) => {
                let mut details = HashMap::new();
                details.insert("deleted".to_string(), summary.deleted.to_string());
                details.insert("inserted".to_string(), summary.inserted.to_string());
                self.monitor.log_audit_entry(
                    AuditOperationType::DataModification,
                    &namespace,
                    "replace_all",
                    AuditResult::Success,
                    details,
                );
                tracker.complete(Some(summary.inserted as u64));
                Ok(summary)
            }
            Err(e) => {
                // The collection may already be emptied at this point
                self.monitor.log_audit_entry(
                    AuditOperationType::DataModification,
                    &namespace,
                    "replace_all",
                    AuditResult::Failure(e.to_string()),
                    HashMap::new(),
                );
                tracker.fail(&e.to_string());
                Err(e)
            }
        }
    }

    async fn export(&self, store: &C::Store) -> Result<ExportSummary, MigrationError> {
        let tracker = self.monitor.start_step("export");
        let result = export_collection(store, &self.config.export_path).await;

        let audit_result = match &result {
            Ok(_) => AuditResult::Success,
            Err(e) => AuditResult::Failure(e.to_string()),
        };
        let mut details = HashMap::new();
        details.insert("path".to_string(), self.config.export_path.display().to_string());
        self.monitor.log_audit_entry(
            AuditOperationType::DataExport,
            &store.namespace(),
            "export",
            audit_result,
            details,
        );

        tracker.finish(result, |s| Some(s.documents as u64))
    }
}
