//! Category aggregator - normalization and per-category counts / 分类聚合
//!
//! Data categories must end up as a key of the configured category set or in
//! the reserved "uncategorized" bucket; they are never silently dropped
//! (unless the operator explicitly picks the reject policy).

use std::collections::{BTreeMap, BTreeSet};

use crate::config::{AppConfig, UnknownCategoryPolicy, UNCATEGORIZED_KEY};
use crate::models::{DataStats, Item};

/// Normalize a raw category against the configured keys / 规范化分类
///
/// Exact match wins; otherwise the policy decides. `None` means the row is
/// rejected (Reject policy only).
pub fn normalize(
    raw: &str,
    known_keys: &BTreeSet<String>,
    policy: UnknownCategoryPolicy,
) -> Option<String> {
    let trimmed = raw.trim();
    if known_keys.contains(trimmed) {
        return Some(trimmed.to_string());
    }
    match policy {
        UnknownCategoryPolicy::Uncategorized => Some(UNCATEGORIZED_KEY.to_string()),
        UnknownCategoryPolicy::Keep => Some(trimmed.to_string()),
        UnknownCategoryPolicy::Reject => None,
    }
}

/// Per-category item counts / 各分类条目数
///
/// Always contains every configured key (0 when absent in data) plus
/// "uncategorized" when any item mapped there.
pub fn counts(items: &[Item], configured_keys: &BTreeSet<String>) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> =
        configured_keys.iter().map(|key| (key.clone(), 0)).collect();
    for item in items {
        *counts.entry(item.category.clone()).or_insert(0) += 1;
    }
    counts
}

/// Statistics over the loaded generation / 数据统计
pub fn stats(items: &[Item], config: &AppConfig) -> DataStats {
    let configured_keys: BTreeSet<String> = config.categories.keys().cloned().collect();
    let fields: Vec<String> = config.fields.field_mappings.keys().cloned().collect();
    let custom_fields: Vec<String> = fields
        .iter()
        .filter(|field| !matches!(field.as_str(), "category" | "name" | "description"))
        .cloned()
        .collect();
    DataStats {
        total_items: items.len(),
        categories: counts(items, &configured_keys),
        fields,
        custom_fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Map;

    fn keys() -> BTreeSet<String> {
        ["武器", "盾"].iter().map(|s| s.to_string()).collect()
    }

    fn item(id: u32, category: &str) -> Item {
        Item {
            id,
            category: category.to_string(),
            name: format!("item{id}"),
            description: String::new(),
            custom_fields: Map::new(),
        }
    }

    #[test]
    fn test_normalize_exact_match() {
        let normalized = normalize(" 武器 ", &keys(), UnknownCategoryPolicy::Uncategorized);
        assert_eq!(normalized.as_deref(), Some("武器"));
    }

    #[test]
    fn test_normalize_unknown_buckets() {
        let normalized = normalize("呪い", &keys(), UnknownCategoryPolicy::Uncategorized);
        assert_eq!(normalized.as_deref(), Some(UNCATEGORIZED_KEY));
    }

    #[test]
    fn test_normalize_keep_policy() {
        let normalized = normalize("呪い", &keys(), UnknownCategoryPolicy::Keep);
        assert_eq!(normalized.as_deref(), Some("呪い"));
    }

    #[test]
    fn test_normalize_reject_policy() {
        assert!(normalize("呪い", &keys(), UnknownCategoryPolicy::Reject).is_none());
    }

    #[test]
    fn test_counts_cover_all_configured_keys() {
        let items = vec![
            item(1, "武器"),
            item(2, "武器"),
            item(3, UNCATEGORIZED_KEY),
        ];
        let counts = counts(&items, &keys());
        assert_eq!(counts["武器"], 2);
        assert_eq!(counts["盾"], 0);
        assert_eq!(counts[UNCATEGORIZED_KEY], 1);
        assert_eq!(counts.values().sum::<usize>(), items.len());
    }

    #[test]
    fn test_counts_empty_data() {
        let counts = counts(&[], &keys());
        assert_eq!(counts.len(), 2);
        assert!(counts.values().all(|&count| count == 0));
    }
}
