use crate::error::AppError;
use crate::storage::Storage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: u32 = 1;
const STORE_FILE_NAME: &str = "taskboard.json";
const STORE_ENV_VAR: &str = "TASKBOARD_STORE_PATH";

#[derive(Debug, Serialize, Deserialize)]
struct StoredRecords {
    schema_version: u32,
    #[serde(default)]
    records: BTreeMap<String, String>,
}

pub fn store_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("taskboard").join(STORE_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config").join("taskboard").join(STORE_FILE_NAME))
    }
}

/// Key-value records kept in a single JSON document.
///
/// Every write rewrites the whole document through a temp file and a rename,
/// so a batch from [`Storage::set_many`] lands all at once or not at all.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    records: BTreeMap<String, String>,
}

impl JsonFileStorage {
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let records = load_records(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    pub fn open_default() -> Result<Self, AppError> {
        let path = store_path()?;
        Self::open(&path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn commit(&mut self, records: BTreeMap<String, String>) -> Result<(), AppError> {
        save_records(&self.path, &records)?;
        self.records = records;
        Ok(())
    }
}

impl Storage for JsonFileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.records.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), AppError> {
        let mut records = self.records.clone();
        records.insert(key.to_string(), value);
        self.commit(records)
    }

    fn set_many(&mut self, entries: &[(&str, String)]) -> Result<(), AppError> {
        let mut records = self.records.clone();
        for (key, value) in entries {
            records.insert(key.to_string(), value.clone());
        }
        self.commit(records)
    }
}

fn load_records(path: &Path) -> Result<BTreeMap<String, String>, AppError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let content =
        std::fs::read_to_string(path).map_err(|err| AppError::persistence(err.to_string()))?;
    let stored: StoredRecords =
        serde_json::from_str(&content).map_err(|err| AppError::invalid_data(err.to_string()))?;

    if stored.schema_version != SCHEMA_VERSION {
        return Err(AppError::invalid_data("schema_version mismatch"));
    }

    Ok(stored.records)
}

fn save_records(path: &Path, records: &BTreeMap<String, String>) -> Result<(), AppError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|err| AppError::persistence(err.to_string()))?;
    }

    let stored = StoredRecords {
        schema_version: SCHEMA_VERSION,
        records: records.clone(),
    };
    let content = serde_json::to_string_pretty(&stored)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;

    let staging = staging_path(path);
    std::fs::write(&staging, content).map_err(|err| AppError::persistence(err.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&staging, permissions)
            .map_err(|err| AppError::persistence(err.to_string()))?;
    }

    std::fs::rename(&staging, path).map_err(|err| AppError::persistence(err.to_string()))?;
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| STORE_FILE_NAME.into());
    name.push(".tmp");
    path.with_file_name(name)
}
