//! Error taxonomy / 错误分类
//!
//! Propagation policy / 传播策略:
//! - Config problems fall back to built-in defaults and are reported as warnings
//! - Schema and backup problems abort the reload, the last good generation stays live
//! - Row-level problems are data (RowError in the report), not errors
//! - Index faults at query time trigger the fallback scan, never a user-facing error

use std::path::PathBuf;
use thiserror::Error;

/// Configuration document errors, recovered locally via defaults / 配置文档错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Fatal ingestion errors - the reload aborts, prior generation remains active
/// 数据加载致命错误
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("data file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("field '{field}' maps to missing CSV column '{column}'")]
    MissingColumn { field: String, column: String },
    #[error("CSV file has no header row")]
    EmptyHeader,
    #[error("failed to read data file: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("backup failed for {path}: {reason}")]
    Backup { path: PathBuf, reason: String },
}

/// The indexed search structure is unusable at query time / 索引不可用
///
/// Never surfaced to the caller: the generation transparently retries the
/// same query with a linear substring scan.
#[derive(Debug, Error)]
pub enum IndexFault {
    #[error("search index unavailable")]
    Unavailable,
    #[error("search index inconsistent: posting references unknown item id {0}")]
    DanglingId(u32),
}
