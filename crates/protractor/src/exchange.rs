//! Import and export of the settings group as a flat JSON object.

use crate::config::ConfigRecord;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid JSON format (root must be an object)")]
    NotAnObject,
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize settings: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn parse_import(text: &str) -> Result<ConfigRecord, ImportError> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(ConfigRecord::from(map)),
        _ => Err(ImportError::NotAnObject),
    }
}

pub fn read_import(path: &Path) -> Result<ConfigRecord, ImportError> {
    let text = fs_err::read_to_string(path)?;
    parse_import(&text)
}

pub fn to_json(record: &ConfigRecord) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(record)
}

pub fn export_json(record: &ConfigRecord, path: &Path) -> Result<(), ExportError> {
    let text = to_json(record)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs_err::create_dir_all(parent)?;
    }
    fs_err::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rejects_non_object_root() {
        assert!(matches!(parse_import("[1, 2, 3]"), Err(ImportError::NotAnObject)));
        assert!(matches!(parse_import("\"NORMAL\""), Err(ImportError::NotAnObject)));
        assert!(matches!(parse_import("{ broken"), Err(ImportError::Json(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let path = std::env::temp_dir().join("protractor-exchange-does-not-exist.json");
        assert!(matches!(read_import(&path), Err(ImportError::Io(_))));
    }

    #[test]
    fn test_export_then_read() {
        let path = std::env::temp_dir().join(format!(
            "protractor-exchange-{}.json",
            std::process::id()
        ));
        let record = ConfigRecord::new()
            .with("mode", "MULTI")
            .with("multi_sector_count", 5)
            .with("arm_2_angle", 212.5);

        export_json(&record, &path).unwrap();
        let back = read_import(&path).unwrap();
        assert_eq!(back.get("mode"), Some(&json!("MULTI")));
        assert_eq!(back, record);

        let _ = fs_err::remove_file(&path);
    }
}
