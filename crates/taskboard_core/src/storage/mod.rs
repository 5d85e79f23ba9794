use crate::error::AppError;

pub mod json_store;
mod memory;

pub use json_store::JsonFileStorage;
pub use memory::MemoryStorage;

/// String key-value persistence used by the session.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    fn set(&mut self, key: &str, value: String) -> Result<(), AppError>;

    /// Writes several records. Backends that can write them atomically should
    /// override this; the default writes one record at a time.
    fn set_many(&mut self, records: &[(&str, String)]) -> Result<(), AppError> {
        for (key, value) in records {
            self.set(key, value.clone())?;
        }
        Ok(())
    }
}

impl<S: Storage + ?Sized> Storage for &mut S {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), AppError> {
        (**self).set(key, value)
    }

    fn set_many(&mut self, records: &[(&str, String)]) -> Result<(), AppError> {
        (**self).set_many(records)
    }
}
