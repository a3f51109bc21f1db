//! Key/value persistence for the protractor settings group.
//!
//! The controller only ever talks to [`SettingsStore`]; the on-disk format is
//! a JSON document holding a single `floating_protractor` object.

use crate::config::{ConfigRecord, SETTINGS_GROUP};
use directories::ProjectDirs;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_PREFIX: &str = "PROTRACTOR";
const FILE_NAME: &str = "settings.json";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to determine config directory")]
    ConfigDirNotFound,
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait SettingsStore {
    /// Every persisted key, including read-only overrides.
    fn snapshot(&self) -> ConfigRecord;

    /// Only the keys actually written to the backend.
    fn stored(&self) -> ConfigRecord {
        self.snapshot()
    }

    /// Whether reads of `key` come from an override that is never written.
    fn is_overridden(&self, _key: &str) -> bool {
        false
    }

    fn get(&self, key: &str) -> Option<Value>;

    /// Merges `record` into the stored keys and flushes.
    fn write(&mut self, record: &ConfigRecord) -> Result<(), StoreError>;

    /// Drops every stored key and stores exactly `record`.
    fn replace(&mut self, record: ConfigRecord) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: ConfigRecord,
    flushes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: ConfigRecord) -> Self {
        Self { values, flushes: 0 }
    }

    /// Number of successful writes, used to check flush checkpoints.
    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl SettingsStore for MemoryStore {
    fn snapshot(&self) -> ConfigRecord {
        self.values.clone()
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn write(&mut self, record: &ConfigRecord) -> Result<(), StoreError> {
        self.values.extend_from(record);
        self.flushes += 1;
        Ok(())
    }

    fn replace(&mut self, record: ConfigRecord) -> Result<(), StoreError> {
        self.values = record;
        self.flushes += 1;
        Ok(())
    }
}

pub struct JsonFileStore {
    path: PathBuf,
    values: ConfigRecord,
    overrides: ConfigRecord,
    last_written: Option<String>,
}

impl JsonFileStore {
    pub fn default_path() -> Result<PathBuf, StoreError> {
        let proj_dirs = ProjectDirs::from("org", "dinzo", "floating-protractor")
            .ok_or(StoreError::ConfigDirNotFound)?;
        Ok(proj_dirs.config_dir().join(FILE_NAME))
    }

    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(Self::default_path()?)
    }

    /// A missing or unreadable file yields an empty group; nothing is written
    /// until the first flush.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::open_with_overrides(path, read_env_overrides())
    }

    /// Opens `path` with `overrides` layered over every read.
    pub fn open_with_overrides(
        path: impl Into<PathBuf>,
        overrides: ConfigRecord,
    ) -> Result<Self, StoreError> {
        let path = path.into();
        let values = read_group(&path).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable settings file {}: {}", path.display(), e);
            ConfigRecord::new()
        });
        if !overrides.is_empty() {
            log::info!(
                "Applying {} setting override(s) from {}_* environment",
                overrides.len(),
                ENV_PREFIX
            );
        }
        let last_written = fs_err::read_to_string(&path).ok();

        Ok(Self {
            path,
            values,
            overrides,
            last_written,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the current group if the file does not exist yet, so an editor
    /// has something to open.
    pub fn ensure_file(&mut self) -> Result<&Path, StoreError> {
        if !self.path.exists() {
            self.last_written = None;
            self.flush()?;
        }
        Ok(self.path.as_path())
    }

    /// Re-reads the file. Returns `true` when the stored group changed.
    pub fn reload(&mut self) -> Result<bool, StoreError> {
        let content = fs_err::read_to_string(&self.path).ok();
        if content.is_some() && content == self.last_written {
            return Ok(false);
        }

        let values = read_group(&self.path)?;
        self.last_written = content;
        let changed = values != self.values;
        self.values = values;
        Ok(changed)
    }

    /// `record` with every overridden key reset to its stored value, or
    /// dropped when nothing was stored for it.
    fn without_overrides(&self, record: &ConfigRecord) -> ConfigRecord {
        let mut kept = ConfigRecord::new();
        for (key, value) in record.iter() {
            if !self.overrides.contains_key(key) {
                kept.insert(key.clone(), value.clone());
            } else if let Some(stored) = self.values.get(key) {
                kept.insert(key.clone(), stored.clone());
            }
        }
        kept
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        let mut root = Map::new();
        root.insert(
            SETTINGS_GROUP.to_string(),
            Value::Object(self.values.clone().into()),
        );
        let content = serde_json::to_string_pretty(&Value::Object(root))?;
        if self.last_written.as_deref() == Some(content.as_str()) {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs_err::create_dir_all(parent)?;
        }
        fs_err::write(&self.path, &content)?;
        log::debug!("Settings written to {}", self.path.display());
        self.last_written = Some(content);
        Ok(())
    }
}

impl SettingsStore for JsonFileStore {
    fn snapshot(&self) -> ConfigRecord {
        let mut record = self.values.clone();
        record.extend_from(&self.overrides);
        record
    }

    fn stored(&self) -> ConfigRecord {
        self.values.clone()
    }

    fn is_overridden(&self, key: &str) -> bool {
        self.overrides.contains_key(key)
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.overrides
            .get(key)
            .or_else(|| self.values.get(key))
            .cloned()
    }

    fn write(&mut self, record: &ConfigRecord) -> Result<(), StoreError> {
        let record = self.without_overrides(record);
        self.values.extend_from(&record);
        self.flush()
    }

    fn replace(&mut self, record: ConfigRecord) -> Result<(), StoreError> {
        self.values = self.without_overrides(&record);
        self.flush()
    }
}

fn read_group(path: &Path) -> Result<ConfigRecord, StoreError> {
    let s = config::Config::builder()
        .add_source(
            config::File::from(path)
                .format(config::FileFormat::Json)
                .required(false),
        )
        .build()?;

    match s.get::<ConfigRecord>(SETTINGS_GROUP) {
        Ok(record) => Ok(record),
        Err(config::ConfigError::NotFound(_)) => Ok(ConfigRecord::new()),
        Err(e) => Err(e.into()),
    }
}

fn read_env_overrides() -> ConfigRecord {
    config::Config::builder()
        .add_source(config::Environment::with_prefix(ENV_PREFIX))
        .build()
        .and_then(|s| s.try_deserialize::<ConfigRecord>())
        .unwrap_or_else(|e| {
            log::warn!("Ignoring {}_* environment overrides: {}", ENV_PREFIX, e);
            ConfigRecord::new()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("protractor-store-{}-{}", std::process::id(), name))
            .join(FILE_NAME)
    }

    #[test]
    fn test_memory_store_merges() {
        let mut store = MemoryStore::new();
        store
            .write(&ConfigRecord::new().with("ring_radius", 120).with("mode", "MULTI"))
            .unwrap();
        store
            .write(&ConfigRecord::new().with("ring_radius", 150))
            .unwrap();
        assert_eq!(store.get("ring_radius"), Some(json!(150)));
        assert_eq!(store.get("mode"), Some(json!("MULTI")));
        assert_eq!(store.flushes(), 2);

        store.replace(ConfigRecord::new()).unwrap();
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_file_store_persists_across_open() {
        let path = temp_path("persist");
        let _ = fs_err::remove_file(&path);

        let mut store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get("ring_radius"), None);
        store
            .write(
                &ConfigRecord::new()
                    .with("ring_radius", 175)
                    .with("arm_0_angle", 42.5)
                    .with("arm_0_enabled", true)
                    .with("arm_0_color", "#ff0000"),
            )
            .unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("arm_0_angle"), Some(json!(42.5)));
        assert_eq!(reopened.get("arm_0_enabled"), Some(json!(true)));
        assert_eq!(reopened.get("arm_0_color"), Some(json!("#ff0000")));
        assert_eq!(
            reopened
                .get("ring_radius")
                .and_then(|v| crate::config::read_integer(&v)),
            Some(175)
        );

        let _ = fs_err::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_file_store_reload_detects_external_edit() {
        let path = temp_path("reload");
        let _ = fs_err::remove_file(&path);

        let mut store = JsonFileStore::open(&path).unwrap();
        store
            .write(&ConfigRecord::new().with("snap_step_deg", 5))
            .unwrap();
        assert!(!store.reload().unwrap());

        fs_err::write(
            &path,
            r#"{ "floating_protractor": { "snap_step_deg": 15 } }"#,
        )
        .unwrap();
        assert!(store.reload().unwrap());
        assert_eq!(
            store
                .get("snap_step_deg")
                .and_then(|v| crate::config::read_integer(&v)),
            Some(15)
        );

        let _ = fs_err::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_ensure_file_creates_group() {
        let path = temp_path("ensure");
        let _ = fs_err::remove_file(&path);

        let mut store = JsonFileStore::open(&path).unwrap();
        assert!(!path.exists());
        store.ensure_file().unwrap();
        let text = fs_err::read_to_string(&path).unwrap();
        assert!(text.contains(SETTINGS_GROUP));
        // nothing changed on disk, so no reload
        assert!(!store.reload().unwrap());

        let _ = fs_err::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_overrides_are_never_written_back() {
        let path = temp_path("overrides");
        let _ = fs_err::remove_file(&path);

        let overrides = ConfigRecord::new().with("snap_step_deg", 15);
        let mut store = JsonFileStore::open_with_overrides(&path, overrides.clone()).unwrap();
        assert_eq!(store.get("snap_step_deg"), Some(json!(15)));
        assert!(store.is_overridden("snap_step_deg"));

        store
            .write(&ConfigRecord::new().with("snap_step_deg", 15).with("label_a", "X"))
            .unwrap();
        assert_eq!(store.stored().get("snap_step_deg"), None);

        let reopened = JsonFileStore::open_with_overrides(&path, ConfigRecord::new()).unwrap();
        assert_eq!(reopened.get("snap_step_deg"), None);
        assert_eq!(reopened.get("label_a"), Some(json!("X")));

        // a stored value survives writes made while it is overridden
        let mut store = JsonFileStore::open_with_overrides(&path, ConfigRecord::new()).unwrap();
        store
            .write(&ConfigRecord::new().with("snap_step_deg", 5))
            .unwrap();
        let mut store = JsonFileStore::open_with_overrides(&path, overrides).unwrap();
        store
            .replace(ConfigRecord::new().with("snap_step_deg", 15))
            .unwrap();
        let reopened = JsonFileStore::open_with_overrides(&path, ConfigRecord::new()).unwrap();
        assert_eq!(
            reopened
                .get("snap_step_deg")
                .and_then(|v| crate::config::read_integer(&v)),
            Some(5)
        );

        let _ = fs_err::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_file_store_tolerates_garbage() {
        let path = temp_path("garbage");
        fs_err::create_dir_all(path.parent().unwrap()).unwrap();
        fs_err::write(&path, "this is { not json").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get("mode"), None);

        let _ = fs_err::remove_dir_all(path.parent().unwrap());
    }
}
