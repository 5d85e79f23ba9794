use crate::error::AppError;
use crate::storage::Storage;
use std::cell::Cell;
use std::collections::HashMap;

/// In-memory storage for tests and ephemeral sessions.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    records: HashMap<String, String>,
    fail_writes: Cell<bool>,
    batches: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records<I, K, V>(records: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            records: records
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
            ..Self::default()
        }
    }

    /// Makes every following write fail until switched back.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Number of successful `set`/`set_many` calls.
    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn record(&self, key: &str) -> Option<&str> {
        self.records.get(key).map(String::as_str)
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.records.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), AppError> {
        if self.fail_writes.get() {
            return Err(AppError::persistence(format!("write to {key} rejected")));
        }
        self.records.insert(key.to_string(), value);
        self.batches += 1;
        Ok(())
    }

    fn set_many(&mut self, records: &[(&str, String)]) -> Result<(), AppError> {
        if self.fail_writes.get() {
            return Err(AppError::persistence("batch write rejected"));
        }
        for (key, value) in records {
            self.records.insert(key.to_string(), value.clone());
        }
        self.batches += 1;
        Ok(())
    }
}
