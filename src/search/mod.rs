//! Search module - one immutable generation of items plus its index / 搜索模块
//!
//! A `Generation` is one complete snapshot of ingested items and the derived
//! inverted index. Reload builds a new generation fully off to the side and
//! publishes it with a single pointer swap (state.rs); in-flight queries keep
//! serving the generation they started with.
//!
//! Degraded mode / 降级模式: when the indexed structure is unavailable or
//! reports an internal fault, the same query is retried as a case-insensitive
//! substring scan over the items' search text and the response is marked
//! degraded. The scan cannot fail; worst case it returns nothing.

pub mod engine;
pub mod tokenizer;

use chrono::{DateTime, Utc};

use crate::config::AppConfig;
use crate::error::IndexFault;
use crate::models::{Item, ValidationReport};

pub use engine::{SearchHit, SearchIndex, SearchQuery};
use tokenizer::tokenize_query;

/// Query result set / 查询结果集
#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
    /// Matches before the limit was applied / 截断前的匹配总数
    pub total_matched: usize,
    /// True when the fallback scan answered / 是否走了降级扫描
    pub degraded: bool,
}

impl SearchResponse {
    fn empty() -> Self {
        Self {
            hits: Vec::new(),
            total_matched: 0,
            degraded: false,
        }
    }
}

/// One immutable snapshot of items + index / 一代不可变数据快照
pub struct Generation {
    items: Vec<Item>,
    index: Option<SearchIndex>,
    search_fields: Vec<String>,
    default_limit: usize,
    pub built_at: DateTime<Utc>,
    /// Rejected-row diagnostics from the ingestion that produced this
    /// generation / 本代数据的行级校验结果
    pub report: ValidationReport,
}

impl Generation {
    /// Build a generation; the index is complete before this returns
    /// 构建一代数据，索引构建完成后才返回
    pub fn build(items: Vec<Item>, config: &AppConfig, report: ValidationReport) -> Self {
        let search_fields = config.fields.search_fields.clone();
        let index = SearchIndex::build(&items, &search_fields);
        tracing::info!(
            items = items.len(),
            tokens = index.token_count(),
            "search index built"
        );
        Self {
            items,
            index: Some(index),
            search_fields,
            default_limit: config.ui.layout.max_results,
            built_at: Utc::now(),
            report,
        }
    }

    /// Empty generation used before the first load / 首次加载前的空代
    pub fn empty(config: &AppConfig) -> Self {
        Self::build(Vec::new(), config, ValidationReport::default())
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn token_count(&self) -> usize {
        self.index.as_ref().map(SearchIndex::token_count).unwrap_or(0)
    }

    /// Answer a query; never fails / 执行查询，永不失败
    pub fn search(&self, query: &SearchQuery) -> SearchResponse {
        let trimmed = query.query.trim();
        let limit = query.limit.unwrap_or(self.default_limit);

        if trimmed.is_empty() {
            // Bare empty query returns nothing to bound cost on the
            // interactive path; with a category filter it is a browse.
            return match &query.category {
                None => SearchResponse::empty(),
                Some(_) => {
                    let mut hits: Vec<SearchHit> = self
                        .items
                        .iter()
                        .filter(|item| self.passes_filters(item, query, trimmed))
                        .map(|item| SearchHit::new(item.clone(), 0.0))
                        .collect();
                    let total_matched = hits.len();
                    hits.truncate(limit);
                    SearchResponse {
                        hits,
                        total_matched,
                        degraded: false,
                    }
                }
            };
        }

        let tokens = tokenize_query(trimmed);
        if tokens.is_empty() {
            return SearchResponse::empty();
        }

        let indexed = if query.force_fallback {
            Err(IndexFault::Unavailable)
        } else {
            self.indexed_search(query, trimmed, &tokens)
        };

        match indexed {
            Ok(mut hits) => {
                let total_matched = hits.len();
                hits.truncate(limit);
                SearchResponse {
                    hits,
                    total_matched,
                    degraded: false,
                }
            }
            Err(fault) => {
                tracing::warn!("search index fault, using linear scan: {fault}");
                let mut hits = self.fallback_scan(query);
                let total_matched = hits.len();
                hits.truncate(limit);
                SearchResponse {
                    hits,
                    total_matched,
                    degraded: true,
                }
            }
        }
    }

    fn indexed_search(
        &self,
        query: &SearchQuery,
        trimmed: &str,
        tokens: &[String],
    ) -> Result<Vec<SearchHit>, IndexFault> {
        let index = self.index.as_ref().ok_or(IndexFault::Unavailable)?;
        let mut hits = Vec::new();
        for (id, score) in index.query_ids(tokens)? {
            let item = self.item_by_id(id)?;
            if self.passes_filters(item, query, trimmed) {
                hits.push(SearchHit::new(item.clone(), score));
            }
        }
        engine::rank(&mut hits);
        Ok(hits)
    }

    /// Linear substring scan over search text, case-insensitive / 线性扫描
    ///
    /// When `search_fields` covers name and description, its matches are a
    /// superset of the indexed path's for the same query (prefix/AND token
    /// semantics imply substring containment). The index always tokenizes
    /// those two fields, so narrower configurations can miss here what the
    /// indexed path finds.
    pub fn fallback_scan(&self, query: &SearchQuery) -> Vec<SearchHit> {
        let needle = query.query.trim().to_lowercase();
        self.items
            .iter()
            .filter(|item| {
                needle.is_empty()
                    || item
                        .search_text(&self.search_fields)
                        .to_lowercase()
                        .contains(&needle)
            })
            .filter(|item| self.passes_filters(item, query, query.query.trim()))
            .map(|item| SearchHit::new(item.clone(), 0.0))
            .collect()
    }

    /// Item ids are assigned sequentially from 1 at ingestion / 顺序ID定位
    fn item_by_id(&self, id: u32) -> Result<&Item, IndexFault> {
        let item = self
            .items
            .get((id as usize).wrapping_sub(1))
            .ok_or(IndexFault::DanglingId(id))?;
        if item.id != id {
            return Err(IndexFault::DanglingId(id));
        }
        Ok(item)
    }

    fn passes_filters(&self, item: &Item, query: &SearchQuery, trimmed: &str) -> bool {
        if let Some(category) = &query.category {
            if item.category != *category {
                return false;
            }
        }
        if !query.fields.is_empty() {
            // custom-field filter: some named field contains the raw query
            let needle = trimmed.to_lowercase();
            return query.fields.iter().any(|field| {
                item.field_value(field)
                    .map(|value| value.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            });
        }
        true
    }

    #[cfg(test)]
    fn drop_index(&mut self) {
        self.index = None;
    }
}
