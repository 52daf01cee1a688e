//! Shared application state / 应用共享状态
//!
//! Read-mostly: handlers clone an `Arc` of the current config/generation and
//! work on that snapshot. Only the reload path writes, and it publishes a
//! fully-built replacement with a single pointer swap - concurrent readers
//! observe either the fully-old or fully-new state, never a partial one.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::category;
use crate::config::{AppConfig, ConfigStore, ConfigWarning};
use crate::error::IngestError;
use crate::ingest;
use crate::models::{DataStats, ValidationReport};
use crate::search::Generation;

pub struct AppState {
    config_store: ConfigStore,
    data_path: PathBuf,
    backup_dir: PathBuf,
    config: RwLock<Arc<AppConfig>>,
    generation: RwLock<Arc<Generation>>,
    config_warnings: RwLock<Vec<ConfigWarning>>,
}

impl AppState {
    /// Load configuration and start with an empty generation / 初始化
    pub fn new(
        config_dir: impl Into<PathBuf>,
        data_path: impl Into<PathBuf>,
        backup_dir: impl Into<PathBuf>,
    ) -> Self {
        let config_store = ConfigStore::new(config_dir);
        let (config, warnings) = config_store.load();
        let config = Arc::new(config);
        let generation = Arc::new(Generation::empty(&config));
        Self {
            config_store,
            data_path: data_path.into(),
            backup_dir: backup_dir.into(),
            config: RwLock::new(config),
            generation: RwLock::new(generation),
            config_warnings: RwLock::new(warnings),
        }
    }

    /// Snapshot of the current configuration / 当前配置快照
    pub fn config(&self) -> Arc<AppConfig> {
        self.config.read().clone()
    }

    /// Snapshot of the current generation / 当前数据代快照
    ///
    /// The returned handle stays valid across a concurrent reload.
    pub fn generation(&self) -> Arc<Generation> {
        self.generation.read().clone()
    }

    pub fn config_store(&self) -> &ConfigStore {
        &self.config_store
    }

    pub fn config_warnings(&self) -> Vec<ConfigWarning> {
        self.config_warnings.read().clone()
    }

    pub fn data_path(&self) -> &std::path::Path {
        &self.data_path
    }

    /// Reload configuration and data, then swap / 重新加载并切换
    ///
    /// Everything is built off to the side first; on any fatal error the
    /// previous generation stays live.
    pub fn reload(&self) -> Result<ValidationReport, IngestError> {
        let (config, warnings) = self.config_store.load();
        let config = Arc::new(config);

        let outcome = ingest::load_csv(&self.data_path, &config)?;
        let report = outcome.report.clone();
        let generation = Arc::new(Generation::build(outcome.items, &config, outcome.report));

        *self.config.write() = config;
        *self.generation.write() = generation;
        *self.config_warnings.write() = warnings;

        tracing::info!(
            items = self.generation().item_count(),
            rejected = report.len(),
            "generation swapped"
        );
        Ok(report)
    }

    /// Back up the active data file, overwrite it, reload / 备份-覆盖-重载
    ///
    /// Backup failure aborts before the file is touched.
    pub fn replace_data(
        &self,
        contents: &str,
    ) -> Result<(Option<PathBuf>, ValidationReport), IngestError> {
        let backup = ingest::replace_data_file(&self.data_path, contents, &self.backup_dir)?;
        let report = self.reload()?;
        Ok((backup, report))
    }

    /// Statistics over the current generation / 当前数据统计
    pub fn stats(&self) -> DataStats {
        let generation = self.generation();
        category::stats(generation.items(), &self.config())
    }
}
