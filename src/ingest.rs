//! Ingestion pipeline - delimited file to a validated generation / 数据加载
//!
//! Reads the CSV through the configured field mapping, validates required
//! fields row by row, and returns the accepted items together with the
//! rejected-row diagnostics. Row problems skip the row; schema problems
//! (missing mapped column) abort the whole load.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::category;
use crate::config::{AppConfig, FieldDefinition};
use crate::error::IngestError;
use crate::models::{FieldValue, IngestOutcome, Item, ValidationReport};

/// Pseudo field name for whole-row failures / 整行失败的伪字段名
const ROW_FIELD: &str = "*";

/// Load the data file through the field mapping / 按字段映射加载数据文件
pub fn load_csv(path: &Path, config: &AppConfig) -> Result<IngestOutcome, IngestError> {
    if !path.exists() {
        return Err(IngestError::FileNotFound(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
        return Err(IngestError::EmptyHeader);
    }

    // Resolve every mapped source column up front; a missing column is a
    // schema error, not a row error.
    let mut columns: Vec<(String, usize)> = Vec::new();
    for (field, column) in &config.fields.field_mappings {
        let index = headers
            .iter()
            .position(|header| header == column)
            .ok_or_else(|| IngestError::MissingColumn {
                field: field.clone(),
                column: column.clone(),
            })?;
        columns.push((field.clone(), index));
    }

    let known_keys: BTreeSet<String> = config.categories.keys().cloned().collect();
    let policy = config.fields.unknown_category;

    let mut items = Vec::new();
    let mut report = ValidationReport::default();

    for (index, record) in reader.records().enumerate() {
        let row = index + 1; // 1-based over data rows, header excluded

        let record = match record {
            Ok(record) => record,
            Err(e) => {
                report.push(row, ROW_FIELD, format!("row could not be decoded: {e}"));
                continue;
            }
        };

        if record.len() != headers.len() {
            report.push(
                row,
                ROW_FIELD,
                format!("expected {} columns, found {}", headers.len(), record.len()),
            );
            continue;
        }

        let mut item = Item {
            id: 0,
            category: String::new(),
            name: String::new(),
            description: String::new(),
            custom_fields: Default::default(),
        };

        for (field, column_index) in &columns {
            let value = record.get(*column_index).unwrap_or("").trim();
            match field.as_str() {
                "category" => item.category = value.to_string(),
                "name" => item.name = value.to_string(),
                "description" => item.description = value.to_string(),
                _ => {
                    if !value.is_empty() {
                        item.custom_fields.insert(
                            field.clone(),
                            convert_value(value, field, &config.fields.field_definitions),
                        );
                    }
                }
            }
        }

        let mut valid = true;
        for required in &config.fields.required_fields {
            let empty = item
                .field_value(required)
                .map(|value| value.is_empty())
                .unwrap_or(true);
            if empty {
                report.push(row, required.clone(), "missing required field");
                valid = false;
            }
        }
        if !valid {
            continue;
        }

        match category::normalize(&item.category, &known_keys, policy) {
            Some(key) => item.category = key,
            None => {
                report.push(
                    row,
                    "category",
                    format!("unknown category '{}'", item.category),
                );
                continue;
            }
        }

        item.id = items.len() as u32 + 1;
        items.push(item);
    }

    tracing::info!(
        accepted = items.len(),
        rejected = report.len(),
        "loaded {}",
        path.display()
    );

    Ok(IngestOutcome { items, report })
}

/// Convert a CSV cell per its declared field type / 按声明类型转换字段值
///
/// Unparseable values stay text rather than failing the row.
fn convert_value(
    value: &str,
    field: &str,
    definitions: &std::collections::BTreeMap<String, FieldDefinition>,
) -> FieldValue {
    let field_type = definitions
        .get(field)
        .map(|definition| definition.field_type.as_str())
        .unwrap_or("string");

    match field_type {
        "integer" => value
            .parse::<i64>()
            .map(FieldValue::Integer)
            .unwrap_or_else(|_| FieldValue::Text(value.to_string())),
        "float" => value
            .parse::<f64>()
            .map(FieldValue::Float)
            .unwrap_or_else(|_| FieldValue::Text(value.to_string())),
        "boolean" => {
            let lower = value.to_lowercase();
            FieldValue::Bool(matches!(lower.as_str(), "true" | "1" | "yes" | "on" | "○"))
        }
        _ => FieldValue::Text(value.to_string()),
    }
}

/// Copy the data file to a timestamped location / 创建带时间戳的备份
///
/// Refuses to overwrite an existing backup. The caller must not overwrite
/// the source file if this fails.
pub fn create_backup(source: &Path, backup_dir: &Path) -> Result<PathBuf, IngestError> {
    if !source.exists() {
        return Err(IngestError::Backup {
            path: source.to_path_buf(),
            reason: "source file not found".to_string(),
        });
    }

    fs::create_dir_all(backup_dir).map_err(|e| IngestError::Backup {
        path: backup_dir.to_path_buf(),
        reason: format!("cannot create backup directory: {e}"),
    })?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let source_name = source
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("data");
    let backup_name = format!("{source_name}_backup_{timestamp}");
    let backup_path = backup_dir.join(&backup_name);

    if backup_path.exists() {
        return Err(IngestError::Backup {
            path: backup_path,
            reason: "backup target already exists".to_string(),
        });
    }

    fs::copy(source, &backup_path).map_err(|e| IngestError::Backup {
        path: backup_path.clone(),
        reason: e.to_string(),
    })?;

    let metadata = serde_json::json!({
        "source_path": source.display().to_string(),
        "backup_path": backup_path.display().to_string(),
        "created_at": Local::now().to_rfc3339(),
    });
    let metadata_path = backup_dir.join(format!("{backup_name}_metadata.json"));
    fs::write(&metadata_path, serde_json::to_string_pretty(&metadata).unwrap_or_default())
        .map_err(|e| IngestError::Backup {
            path: metadata_path,
            reason: e.to_string(),
        })?;

    tracing::info!("backed up {} to {}", source.display(), backup_path.display());
    Ok(backup_path)
}

/// Back up the active data file, then overwrite it / 先备份后覆盖数据文件
///
/// On backup failure the source file is left untouched.
pub fn replace_data_file(
    path: &Path,
    contents: &str,
    backup_dir: &Path,
) -> Result<Option<PathBuf>, IngestError> {
    let backup = if path.exists() {
        Some(create_backup(path, backup_dir)?)
    } else {
        None
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(backup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnknownCategoryPolicy;

    fn write_csv(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("items.csv");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_basic() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "category,name,description\n\
             武器,つるはし,攻撃力1\n\
             武器,剣,攻撃力5\n\
             盾,木の盾,防御力2\n",
        );

        let outcome = load_csv(&path, &AppConfig::default()).unwrap();
        assert!(outcome.report.is_valid());
        assert_eq!(outcome.items.len(), 3);
        assert_eq!(outcome.items[0].id, 1);
        assert_eq!(outcome.items[2].name, "木の盾");
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "category,description\n武器,つるはし\n");

        let error = load_csv(&path, &AppConfig::default()).unwrap_err();
        match error {
            IngestError::MissingColumn { field, column } => {
                assert_eq!(field, "name");
                assert_eq!(column, "name");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_required_field_skips_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "category,name,description\n\
             武器,つるはし,攻撃力1\n\
             武器,,攻撃力5\n",
        );

        let outcome = load_csv(&path, &AppConfig::default()).unwrap();
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.report.len(), 1);
        assert_eq!(outcome.report.errors[0].row, 2);
        assert_eq!(outcome.report.errors[0].field, "name");
    }

    #[test]
    fn test_accepted_plus_rejected_equals_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "category,name,description\n\
             武器,つるはし,attack\n\
             ,missing,cat\n\
             盾,木の盾,defense\n\
             盾,too,many,columns\n",
        );

        let outcome = load_csv(&path, &AppConfig::default()).unwrap();
        assert_eq!(outcome.items.len() + outcome.report.len(), 4);
    }

    #[test]
    fn test_column_width_mismatch_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "category,name,description\n\
             武器,剣\n\
             盾,木の盾,防御力2\n",
        );

        let outcome = load_csv(&path, &AppConfig::default()).unwrap();
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.report.errors[0].row, 1);
        assert_eq!(outcome.report.errors[0].field, ROW_FIELD);
    }

    #[test]
    fn test_invalid_utf8_row_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.csv");
        let mut bytes = Vec::new();
        bytes.extend_from_slice("category,name,description\n".as_bytes());
        bytes.extend_from_slice("武器,つるはし,攻撃力1\n".as_bytes());
        bytes.extend_from_slice(b"\xff\xfe\xfd,broken,row\n");
        bytes.extend_from_slice("盾,木の盾,防御力2\n".as_bytes());
        fs::write(&path, bytes).unwrap();

        let outcome = load_csv(&path, &AppConfig::default()).unwrap();
        assert_eq!(outcome.items.len(), 2);
        assert_eq!(outcome.items[1].name, "木の盾");
        assert_eq!(outcome.report.len(), 1);
        assert_eq!(outcome.report.errors[0].field, ROW_FIELD);
    }

    #[test]
    fn test_header_only_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "category,name,description\n");

        let outcome = load_csv(&path, &AppConfig::default()).unwrap();
        assert!(outcome.items.is_empty());
        assert!(outcome.report.is_valid());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let error = load_csv(&dir.path().join("nope.csv"), &AppConfig::default()).unwrap_err();
        assert!(matches!(error, IngestError::FileNotFound(_)));
    }

    #[test]
    fn test_unknown_category_bucketed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "category,name,description\n呪い,呪いの指輪,怖い\n");

        let outcome = load_csv(&path, &AppConfig::default()).unwrap();
        assert_eq!(outcome.items[0].category, crate::config::UNCATEGORIZED_KEY);
    }

    #[test]
    fn test_unknown_category_reject_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "category,name,description\n呪い,呪いの指輪,怖い\n");

        let mut config = AppConfig::default();
        config.fields.unknown_category = UnknownCategoryPolicy::Reject;
        let outcome = load_csv(&path, &config).unwrap();
        assert!(outcome.items.is_empty());
        assert_eq!(outcome.report.errors[0].field, "category");
    }

    #[test]
    fn test_custom_field_type_conversion() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "category,name,description,price,cursed\n\
             武器,つるはし,攻撃力1,240,○\n",
        );

        let mut config = AppConfig::default();
        config
            .fields
            .field_mappings
            .insert("price".to_string(), "price".to_string());
        config
            .fields
            .field_mappings
            .insert("cursed".to_string(), "cursed".to_string());
        config.fields.field_definitions.insert(
            "price".to_string(),
            FieldDefinition {
                field_type: "integer".to_string(),
            },
        );
        config.fields.field_definitions.insert(
            "cursed".to_string(),
            FieldDefinition {
                field_type: "boolean".to_string(),
            },
        );

        let outcome = load_csv(&path, &config).unwrap();
        let item = &outcome.items[0];
        assert_eq!(item.custom_fields["price"], FieldValue::Integer(240));
        assert_eq!(item.custom_fields["cursed"], FieldValue::Bool(true));
    }

    #[test]
    fn test_backup_creates_dated_copy() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_csv(dir.path(), "category,name\n武器,剣\n");
        let backup_dir = dir.path().join("backups");

        let backup = create_backup(&source, &backup_dir).unwrap();
        assert!(backup.exists());
        let name = backup.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("items.csv_backup_"));
        assert_eq!(
            fs::read_to_string(&backup).unwrap(),
            fs::read_to_string(&source).unwrap()
        );
    }

    #[test]
    fn test_backup_refuses_existing_target() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_csv(dir.path(), "category,name\n武器,剣\n");
        let backup_dir = dir.path().join("backups");
        fs::create_dir_all(&backup_dir).unwrap();
        // occupy the dated target for this second and the next one so the
        // collision happens regardless of when the call lands
        for offset in 0..2 {
            let stamp =
                (Local::now() + chrono::Duration::seconds(offset)).format("%Y%m%d_%H%M%S");
            fs::write(backup_dir.join(format!("items.csv_backup_{stamp}")), "occupied").unwrap();
        }

        let error = create_backup(&source, &backup_dir).unwrap_err();
        match error {
            IngestError::Backup { reason, .. } => assert!(reason.contains("already exists")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_backup_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let error =
            create_backup(&dir.path().join("nope.csv"), &dir.path().join("backups")).unwrap_err();
        assert!(matches!(error, IngestError::Backup { .. }));
    }

    #[test]
    fn test_replace_refuses_overwrite_on_backup_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_csv(dir.path(), "category,name\n武器,剣\n");
        // backup dir path occupied by a regular file
        let backup_dir = dir.path().join("backups");
        fs::write(&backup_dir, "in the way").unwrap();

        let result = replace_data_file(&source, "category,name\n盾,盾\n", &backup_dir);
        assert!(result.is_err());
        assert_eq!(
            fs::read_to_string(&source).unwrap(),
            "category,name\n武器,剣\n"
        );
    }
}
