//! Search engine - in-memory inverted index / 搜索引擎
//!
//! Matching contract / 匹配规则:
//! - AND semantics across query tokens, prefix semantics per token
//! - a name-field prefix match weighs 2.0 per query token, 1.0 elsewhere
//! - ties broken by ascending item id for determinism

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::error::IndexFault;
use crate::models::Item;

use super::tokenizer::tokenize;

/// Search query options / 搜索查询选项
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Free-text query / 搜索关键词
    pub query: String,
    /// Restrict to one normalized category key / 分类过滤
    pub category: Option<String>,
    /// Restrict to items where one of these fields contains the raw query
    /// 自定义字段过滤
    pub fields: Vec<String>,
    /// Result cap; the generation's configured default applies when None
    /// 结果上限
    pub limit: Option<usize>,
    /// Skip the index and use the linear scan (diagnostics) / 强制降级扫描
    pub force_fallback: bool,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn force_fallback(mut self, enabled: bool) -> Self {
        self.force_fallback = enabled;
        self
    }
}

/// One ranked result / 单条搜索结果
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub item: Item,
    /// Precomposed label for result lists / 列表展示名称
    pub display_name: String,
    /// Relevance score / 相关性分数
    pub score: f32,
}

impl SearchHit {
    pub fn new(item: Item, score: f32) -> Self {
        let display_name = item.display_name();
        Self {
            item,
            display_name,
            score,
        }
    }
}

/// Inverted index over one generation of items / 一代数据的倒排索引
///
/// Tokens live in BTreeMaps so a prefix lookup is a range scan and iteration
/// order is deterministic. Postings are sorted item ids.
#[derive(Debug)]
pub struct SearchIndex {
    /// token -> sorted item ids, over search_text + name + description
    tokens: BTreeMap<String, Vec<u32>>,
    /// token -> sorted item ids, name field only (for weighting)
    name_tokens: BTreeMap<String, Vec<u32>>,
    token_count: usize,
    max_id: u32,
}

impl SearchIndex {
    /// Build the index; O(total tokens) / 构建索引
    pub fn build(items: &[Item], search_fields: &[String]) -> Self {
        let mut tokens: BTreeMap<String, BTreeSet<u32>> = BTreeMap::new();
        let mut name_tokens: BTreeMap<String, BTreeSet<u32>> = BTreeMap::new();
        let mut max_id = 0;

        for item in items {
            max_id = max_id.max(item.id);

            let mut all = tokenize(&item.search_text(search_fields));
            all.extend(tokenize(&item.name));
            all.extend(tokenize(&item.description));
            for token in all {
                tokens.entry(token).or_default().insert(item.id);
            }
            for token in tokenize(&item.name) {
                name_tokens.entry(token).or_default().insert(item.id);
            }
        }

        let collect = |map: BTreeMap<String, BTreeSet<u32>>| -> BTreeMap<String, Vec<u32>> {
            map.into_iter()
                .map(|(token, ids)| (token, ids.into_iter().collect()))
                .collect()
        };

        let tokens = collect(tokens);
        let token_count = tokens.len();
        Self {
            tokens,
            name_tokens: collect(name_tokens),
            token_count,
            max_id,
        }
    }

    /// Number of distinct indexed tokens / 索引词条数
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Ids whose postings contain some token starting with `prefix` / 前缀匹配
    fn prefix_ids(map: &BTreeMap<String, Vec<u32>>, prefix: &str) -> BTreeSet<u32> {
        let mut ids = BTreeSet::new();
        for (token, postings) in map.range(prefix.to_string()..) {
            if !token.starts_with(prefix) {
                break;
            }
            ids.extend(postings.iter().copied());
        }
        ids
    }

    /// Ranked candidate ids for an already-tokenized query / 查询候选集
    ///
    /// Returns (id, score) pairs in ascending id order; empty when any query
    /// token matches nothing (AND semantics).
    pub fn query_ids(&self, query_tokens: &[String]) -> Result<Vec<(u32, f32)>, IndexFault> {
        if query_tokens.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Option<BTreeMap<u32, f32>> = None;
        for token in query_tokens {
            let matched = Self::prefix_ids(&self.tokens, token);
            if matched.is_empty() {
                return Ok(Vec::new());
            }
            if let Some(&max) = matched.iter().next_back() {
                if max > self.max_id {
                    return Err(IndexFault::DanglingId(max));
                }
            }
            let in_name = Self::prefix_ids(&self.name_tokens, token);

            let token_score =
                |id: &u32| -> f32 { if in_name.contains(id) { 2.0 } else { 1.0 } };

            scored = Some(match scored {
                None => matched.iter().map(|id| (*id, token_score(id))).collect(),
                Some(previous) => {
                    let mut next = BTreeMap::new();
                    for id in &matched {
                        if let Some(score) = previous.get(id) {
                            next.insert(*id, score + token_score(id));
                        }
                    }
                    if next.is_empty() {
                        return Ok(Vec::new());
                    }
                    next
                }
            });
        }

        Ok(scored.unwrap_or_default().into_iter().collect())
    }
}

/// Sort hits by score descending, then ascending id / 按分数与ID排序
pub(crate) fn rank(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.item.id.cmp(&b.item.id))
    });
}
