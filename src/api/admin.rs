//! Administrative endpoints - validate / reload / upload / stats / 管理接口

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{ConfigValidation, ConfigWarning};
use crate::models::{DataStats, ValidationReport};
use crate::state::AppState;

/// Uniform response envelope / 统一响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 200,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            code: 500,
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ValidateBody {
    #[serde(flatten)]
    pub validation: ConfigValidation,
    /// Sections that fell back to built-in defaults at load time
    /// 加载时回退到默认值的配置节
    pub warnings: Vec<ConfigWarning>,
}

/// GET /api/config/validate / 配置校验接口
pub async fn validate_config(State(state): State<Arc<AppState>>) -> Json<ValidateBody> {
    let validation = state.config().validate();
    Json(ValidateBody {
        validation,
        warnings: state.config_warnings(),
    })
}

/// GET /api/config/examples / 示例配置列表
pub async fn list_examples(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Vec<String>>> {
    Json(ApiResponse::success(state.config_store().list_examples()))
}

/// GET /api/config/examples/:name - one example bundle's raw JSON
/// 读取单个示例配置
pub async fn get_example(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Json<ApiResponse<serde_json::Value>> {
    match state.config_store().load_example(&name) {
        Ok(bundle) => Json(ApiResponse::success(bundle)),
        Err(e) => {
            tracing::warn!("example config {name} unavailable: {e}");
            Json(ApiResponse::error(e.to_string()))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReloadBody {
    pub items: usize,
    pub rejected: usize,
    pub report: ValidationReport,
    pub backup: Option<String>,
}

/// POST /api/reload - rebuild the generation from the current data file
/// 重新加载接口
pub async fn reload(State(state): State<Arc<AppState>>) -> Json<ApiResponse<ReloadBody>> {
    match state.reload() {
        Ok(report) => Json(ApiResponse::success(ReloadBody {
            items: state.generation().item_count(),
            rejected: report.len(),
            report,
            backup: None,
        })),
        Err(e) => {
            tracing::error!("reload failed: {e}");
            Json(ApiResponse::error(e.to_string()))
        }
    }
}

/// POST /api/data - backup the active file, overwrite it, reload
/// 上传数据接口，先备份后覆盖
pub async fn upload_data(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Json<ApiResponse<ReloadBody>> {
    match state.replace_data(&body) {
        Ok((backup, report)) => Json(ApiResponse::success(ReloadBody {
            items: state.generation().item_count(),
            rejected: report.len(),
            report,
            backup: backup.map(|path| path.display().to_string()),
        })),
        Err(e) => {
            tracing::error!("data upload rejected: {e}");
            Json(ApiResponse::error(e.to_string()))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatsBody {
    #[serde(flatten)]
    pub stats: DataStats,
    pub tokens: usize,
    pub built_at: DateTime<Utc>,
}

/// GET /api/stats / 数据统计接口
pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsBody> {
    let generation = state.generation();
    Json(StatsBody {
        stats: state.stats(),
        tokens: generation.token_count(),
        built_at: generation.built_at,
    })
}
