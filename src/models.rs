//! Data model - one ingested row plus its derived search text / 数据模型
//!
//! Items are created in bulk by the ingestion pipeline and are immutable for
//! the lifetime of one generation. The search index and the category
//! aggregator only ever hold read-only views of them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Typed value of a custom field / 自定义字段的类型化值
///
/// CSV cells are strings; `field_definitions` in fields.json may declare a
/// narrower type. Anything unrecognized stays `Text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Render the value the way it appears in search text / 渲染为检索文本
    pub fn as_search_str(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Integer(n) => n.to_string(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Bool(b) => b.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Text(s) if s.is_empty())
    }
}

/// One data row / 一条数据记录
///
/// `id` is assigned sequentially at ingestion (1-based) and is stable for the
/// lifetime of one loaded generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: u32,
    /// Normalized category key / 规范化后的分类键
    pub category: String,
    pub name: String,
    pub description: String,
    /// Mapped fields beyond category/name/description / 其余映射字段
    #[serde(default)]
    pub custom_fields: BTreeMap<String, FieldValue>,
}

impl Item {
    /// Value of a logical field, standard or custom / 取标准或自定义字段的值
    pub fn field_value(&self, field: &str) -> Option<String> {
        match field {
            "id" => Some(self.id.to_string()),
            "category" => Some(self.category.clone()),
            "name" => Some(self.name.clone()),
            "description" => Some(self.description.clone()),
            _ => self.custom_fields.get(field).map(|v| v.as_search_str()),
        }
    }

    /// Concatenated values of `search_fields`, in list order, single-space
    /// separated, empties skipped / 按配置顺序拼接检索文本
    pub fn search_text(&self, search_fields: &[String]) -> String {
        let mut parts = Vec::new();
        for field in search_fields {
            if let Some(value) = self.field_value(field) {
                if !value.is_empty() {
                    parts.push(value);
                }
            }
        }
        parts.join(" ")
    }

    /// Display name used by the UI layer / 界面展示名称
    pub fn display_name(&self) -> String {
        if !self.category.is_empty() && !self.name.is_empty() {
            format!("{} {}", self.category, self.name)
        } else if !self.name.is_empty() {
            self.name.clone()
        } else {
            format!("Item {}", self.id)
        }
    }
}

/// A single rejected-row diagnostic / 单行校验失败
///
/// `row` is 1-based over data rows; the header row is excluded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowError {
    pub row: usize,
    pub field: String,
    pub reason: String,
}

/// Ordered sequence of row failures; empty means valid / 校验结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<RowError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn push(&mut self, row: usize, field: impl Into<String>, reason: impl Into<String>) {
        self.errors.push(RowError {
            row,
            field: field.into(),
            reason: reason.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Accepted items together with the rejected-row diagnostics / 加载结果
///
/// Callers get both: a reload can succeed while individual rows were skipped.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub items: Vec<Item>,
    pub report: ValidationReport,
}

/// Statistics about the loaded generation / 数据统计
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataStats {
    pub total_items: usize,
    pub categories: BTreeMap<String, usize>,
    pub fields: Vec<String>,
    pub custom_fields: Vec<String>,
}
