//! Search and category endpoints / 搜索与分类接口

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::config::CategoryConfig;
use crate::search::{SearchHit, SearchQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub category: Option<String>,
    /// Comma-separated custom field subset / 逗号分隔的字段过滤
    #[serde(default)]
    pub fields: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchBody {
    pub results: Vec<SearchHit>,
    pub total_matched: usize,
    /// True when the fallback scan answered; the UI shows a warning
    /// 降级查询标记
    pub degraded: bool,
}

/// GET /search - always answers, possibly empty or degraded / 搜索接口
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Json<SearchBody> {
    let config = state.config();
    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(config.ui.layout.max_results);

    let mut query = SearchQuery::new(params.q);
    if let Some(category) = params.category.filter(|c| !c.is_empty()) {
        query = query.with_category(category);
    }
    if let Some(fields) = params.fields.filter(|f| !f.is_empty()) {
        let fields = fields.split(',').map(|f| f.trim().to_string()).collect();
        query = query.with_fields(fields);
    }
    // over-fetch so the page offset can be applied after ranking
    query = query.with_limit(offset.saturating_add(limit));

    let generation = state.generation();
    let response = generation.search(&query);

    let results: Vec<SearchHit> = response.hits.into_iter().skip(offset).collect();
    Json(SearchBody {
        results,
        total_matched: response.total_matched,
        degraded: response.degraded,
    })
}

#[derive(Debug, Serialize)]
pub struct CategoriesBody {
    pub categories: BTreeMap<String, CategoryConfig>,
    pub counts: BTreeMap<String, usize>,
}

/// GET /api/categories - configured categories plus per-category counts
/// 分类及计数接口
pub async fn categories(State(state): State<Arc<AppState>>) -> Json<CategoriesBody> {
    let config = state.config();
    let stats = state.stats();
    Json(CategoriesBody {
        categories: config.categories.clone(),
        counts: stats.categories,
    })
}
