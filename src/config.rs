//! Configuration store / 配置存储
//!
//! Single source of truth for categories, field mappings and UI settings.
//! Each document (categories.json / fields.json / ui.json) is independently
//! optional: a missing or malformed document falls back to the built-in
//! defaults for that section and the failure is collected as a warning,
//! never thrown to the caller.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 6-hex-digit color, e.g. "#e74c3c" / 颜色格式
static COLOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").unwrap());

/// Reserved category key for rows whose raw category matches no configured
/// category / 未分类桶的保留键
pub const UNCATEGORIZED_KEY: &str = "uncategorized";

/// Configuration for a single category / 单个分类的配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub display_name: String,
    pub icon: String,
    pub emoji_fallback: String,
    /// 6-hex-digit color string / 6位十六进制颜色
    pub color: String,
    #[serde(default)]
    pub description: String,
}

/// Policy for data categories that match no configured key / 未知分类策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCategoryPolicy {
    /// Map to the reserved "uncategorized" bucket (default)
    #[default]
    Uncategorized,
    /// Keep the raw value as-is (legacy parity)
    Keep,
    /// Reject the row with a validation error
    Reject,
}

/// Optional type declaration for a custom field / 自定义字段类型声明
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    #[serde(rename = "type", default = "default_field_type")]
    pub field_type: String,
}

fn default_field_type() -> String {
    "string".to_string()
}

/// Field mapping configuration (fields.json) / 字段映射配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    /// logical field name -> source CSV column name / 逻辑字段到CSV列的映射
    pub field_mappings: BTreeMap<String, String>,
    #[serde(default)]
    pub display_fields: Vec<String>,
    #[serde(default)]
    pub search_fields: Vec<String>,
    #[serde(default)]
    pub required_fields: Vec<String>,
    #[serde(default)]
    pub field_definitions: BTreeMap<String, FieldDefinition>,
    #[serde(default)]
    pub unknown_category: UnknownCategoryPolicy,
}

impl Default for FieldConfig {
    fn default() -> Self {
        let mut field_mappings = BTreeMap::new();
        field_mappings.insert("category".to_string(), "category".to_string());
        field_mappings.insert("name".to_string(), "name".to_string());
        field_mappings.insert("description".to_string(), "description".to_string());
        Self {
            field_mappings,
            display_fields: vec!["name".to_string(), "description".to_string()],
            search_fields: vec!["name".to_string(), "description".to_string()],
            required_fields: vec!["category".to_string(), "name".to_string()],
            field_definitions: BTreeMap::new(),
            unknown_category: UnknownCategoryPolicy::default(),
        }
    }
}

/// Layout options / 布局选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_categories_per_row")]
    pub categories_per_row: u32,
    #[serde(default = "default_true")]
    pub show_category_counts: bool,
    #[serde(default = "default_true")]
    pub enable_suggestions: bool,
    /// Query result cap, never unbounded / 查询结果上限
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_categories_per_row() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

fn default_max_results() -> usize {
    50
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            categories_per_row: default_categories_per_row(),
            show_category_counts: true,
            enable_suggestions: true,
            max_results: default_max_results(),
        }
    }
}

/// UI settings (ui.json) / 界面配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiConfig {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub theme: BTreeMap<String, String>,
    #[serde(default)]
    pub layout: LayoutConfig,
}

impl Default for UiConfig {
    fn default() -> Self {
        let mut theme = BTreeMap::new();
        theme.insert("primary_color".to_string(), "#3498db".to_string());
        theme.insert("secondary_color".to_string(), "#2ecc71".to_string());
        theme.insert("accent_color".to_string(), "#e74c3c".to_string());
        Self {
            title: "アイテム検索システム".to_string(),
            subtitle: "アイテムを素早く検索できます".to_string(),
            theme,
            layout: LayoutConfig::default(),
        }
    }
}

/// Merged application configuration / 合并后的应用配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub categories: BTreeMap<String, CategoryConfig>,
    pub fields: FieldConfig,
    pub ui: UiConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            fields: FieldConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

fn default_categories() -> BTreeMap<String, CategoryConfig> {
    let mut categories = BTreeMap::new();
    categories.insert(
        "武器".to_string(),
        CategoryConfig {
            display_name: "武器".to_string(),
            icon: "fas fa-sword".to_string(),
            emoji_fallback: "⚔️".to_string(),
            color: "#e74c3c".to_string(),
            description: "攻撃用の武器類".to_string(),
        },
    );
    categories.insert(
        "盾".to_string(),
        CategoryConfig {
            display_name: "盾".to_string(),
            icon: "fas fa-shield-alt".to_string(),
            emoji_fallback: "🛡️".to_string(),
            color: "#3498db".to_string(),
            description: "防御用の盾類".to_string(),
        },
    );
    categories.insert(
        "その他".to_string(),
        CategoryConfig {
            display_name: "その他".to_string(),
            icon: "fas fa-question".to_string(),
            emoji_fallback: "❓".to_string(),
            color: "#95a5a6".to_string(),
            description: "その他のアイテム".to_string(),
        },
    );
    categories
}

/// One recovered configuration failure / 已恢复的配置错误
#[derive(Debug, Clone, Serialize)]
pub struct ConfigWarning {
    pub section: String,
    pub message: String,
}

/// Result of the pure configuration validation / 配置校验结果
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl AppConfig {
    /// Validate the merged configuration. Pure, no I/O / 纯校验，无IO
    pub fn validate(&self) -> ConfigValidation {
        let mut errors = Vec::new();

        for (key, category) in &self.categories {
            if key.trim().is_empty() {
                errors.push("category key must not be empty".to_string());
            }
            if !COLOR_RE.is_match(&category.color) {
                errors.push(format!(
                    "category '{}': color '{}' does not match #RRGGBB",
                    key, category.color
                ));
            }
        }

        let mapping = &self.fields.field_mappings;
        for (list_name, list) in [
            ("display_fields", &self.fields.display_fields),
            ("search_fields", &self.fields.search_fields),
            ("required_fields", &self.fields.required_fields),
        ] {
            for field in list {
                if !mapping.contains_key(field) {
                    errors.push(format!(
                        "{} references unknown field '{}' (not in field_mappings)",
                        list_name, field
                    ));
                }
            }
        }

        if self.ui.layout.categories_per_row == 0 {
            errors.push("layout.categories_per_row must be positive".to_string());
        }
        if self.ui.layout.max_results == 0 {
            errors.push("layout.max_results must be positive".to_string());
        }

        ConfigValidation {
            valid: errors.is_empty(),
            errors,
        }
    }
}

// Document wrappers matching the on-disk JSON layout / 对应磁盘JSON结构
#[derive(Deserialize)]
struct CategoriesDoc {
    categories: BTreeMap<String, CategoryConfig>,
}

#[derive(Deserialize)]
struct UiDoc {
    ui: UiConfig,
}

/// Loads and merges the configuration documents / 配置加载器
pub struct ConfigStore {
    config_dir: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Load all three documents, falling back per section / 加载全部配置
    ///
    /// Never fatal: the built-in defaults always construct, so every section
    /// produces a usable value. Failures are returned as warnings.
    pub fn load(&self) -> (AppConfig, Vec<ConfigWarning>) {
        let mut warnings = Vec::new();

        let categories = match self.load_doc::<CategoriesDoc>("categories.json") {
            Ok(doc) => doc.categories,
            Err(e) => {
                warnings.push(warn("categories", &e));
                default_categories()
            }
        };

        let fields = match self.load_doc::<FieldConfig>("fields.json") {
            Ok(fields) => fields,
            Err(e) => {
                warnings.push(warn("fields", &e));
                FieldConfig::default()
            }
        };

        let ui = match self.load_doc::<UiDoc>("ui.json") {
            Ok(doc) => doc.ui,
            Err(e) => {
                warnings.push(warn("ui", &e));
                UiConfig::default()
            }
        };

        for w in &warnings {
            tracing::warn!("config section '{}' fell back to defaults: {}", w.section, w.message);
        }

        (
            AppConfig {
                categories,
                fields,
                ui,
            },
            warnings,
        )
    }

    fn load_doc<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<T, ConfigError> {
        let path = self.config_dir.join(name);
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let value = serde_json::from_str(&content)
            .map_err(|source| ConfigError::Parse { path: path.clone(), source })?;
        tracing::info!("loaded configuration from {}", path.display());
        Ok(value)
    }

    /// Enumerate pre-built example bundles, sorted by name / 列出示例配置
    pub fn list_examples(&self) -> Vec<String> {
        let examples_dir = self.config_dir.join("presets");
        let Ok(entries) = std::fs::read_dir(&examples_dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some("json") {
                    path.file_stem().and_then(|s| s.to_str()).map(String::from)
                } else {
                    None
                }
            })
            .collect();
        names.sort();
        names
    }

    /// Load one example bundle's raw JSON / 读取单个示例配置
    pub fn load_example(&self, name: &str) -> Result<serde_json::Value, ConfigError> {
        let path = self.config_dir.join("presets").join(format!("{name}.json"));
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse { path, source })
    }
}

fn warn(section: &str, error: &ConfigError) -> ConfigWarning {
    ConfigWarning {
        section: section.to_string(),
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        let result = config.validate();
        assert!(result.valid, "errors: {:?}", result.errors);
    }

    #[test]
    fn test_validate_unknown_search_field() {
        let mut config = AppConfig::default();
        config.fields.search_fields.push("attack".to_string());
        let result = config.validate();
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("attack")));
    }

    #[test]
    fn test_validate_bad_color() {
        let mut config = AppConfig::default();
        config.categories.get_mut("武器").unwrap().color = "red".to_string();
        let result = config.validate();
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("red")));
    }

    #[test]
    fn test_validate_zero_max_results() {
        let mut config = AppConfig::default();
        config.ui.layout.max_results = 0;
        assert!(!config.validate().valid);
    }

    #[test]
    fn test_load_missing_files_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path());
        let (config, warnings) = store.load();
        assert_eq!(config, AppConfig::default());
        assert_eq!(warnings.len(), 3);
    }

    #[test]
    fn test_load_malformed_section_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("fields.json"), "{not json").unwrap();
        fs::write(
            dir.path().join("categories.json"),
            serde_json::json!({
                "categories": {
                    "壺": {
                        "display_name": "壺",
                        "icon": "fas fa-jar",
                        "emoji_fallback": "🏺",
                        "color": "#8e44ad"
                    }
                }
            })
            .to_string(),
        )
        .unwrap();

        let store = ConfigStore::new(dir.path());
        let (config, warnings) = store.load();
        // fields fell back, categories came from disk
        assert_eq!(config.fields, FieldConfig::default());
        assert!(config.categories.contains_key("壺"));
        assert!(warnings.iter().any(|w| w.section == "fields"));
    }

    #[test]
    fn test_list_examples_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let presets = dir.path().join("presets");
        fs::create_dir(&presets).unwrap();
        fs::write(presets.join("movies.json"), "{}").unwrap();
        fs::write(presets.join("books.json"), "{}").unwrap();
        fs::write(presets.join("readme.txt"), "ignored").unwrap();

        let store = ConfigStore::new(dir.path());
        assert_eq!(store.list_examples(), vec!["books", "movies"]);
    }

    #[test]
    fn test_list_examples_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path());
        assert!(store.list_examples().is_empty());
    }

    #[test]
    fn test_load_example_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let presets = dir.path().join("presets");
        fs::create_dir(&presets).unwrap();
        fs::write(
            presets.join("books.json"),
            serde_json::json!({ "ui": { "title": "蔵書検索" } }).to_string(),
        )
        .unwrap();

        let store = ConfigStore::new(dir.path());
        let bundle = store.load_example("books").unwrap();
        assert_eq!(bundle["ui"]["title"], "蔵書検索");
        assert!(matches!(
            store.load_example("missing"),
            Err(ConfigError::NotFound(_))
        ));
    }
}
