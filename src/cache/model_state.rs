// Currently selected assistant, persisted as a single JSON object
// Author: kelexine (https://github.com/kelexine)

use crate::error::Result;
use crate::utils::atomic_write::atomic_write;
use serde_json::{Map, Value};
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Opaque assistant configuration as stored on disk.
pub type ModelState = Map<String, Value>;

#[derive(Debug, Clone)]
pub struct ModelStateStore {
    path: PathBuf,
}

impl ModelStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the stored state as a whole.
    pub fn write(&self, state: &ModelState) -> Result<()> {
        let json = serde_json::to_vec(state)?;
        atomic_write(&self.path, &json)?;
        debug!("Saved model state to {}", self.path.display());
        Ok(())
    }

    /// The stored state, or `None` when no assistant has been chosen yet.
    ///
    /// An empty or missing file is the normal "nothing selected" state.
    /// Unreadable content is also `None`, but logged.
    pub fn read(&self) -> Result<Option<ModelState>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                File::create(&self.path)?;
                debug!("No model state yet, created {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(state)) => Ok(Some(state)),
            Ok(other) => {
                warn!(
                    "Model state in {} is not a JSON object (found {}), ignoring",
                    self.path.display(),
                    json_kind(&other)
                );
                Ok(None)
            }
            Err(e) => {
                warn!(
                    "Corrupt model state in {}, ignoring: {}",
                    self.path.display(),
                    e
                );
                Ok(None)
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store() -> (ModelStateStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = ModelStateStore::new(dir.path().join("current_assistant.json"));
        (store, dir)
    }

    #[test]
    fn test_missing_file_is_absent_and_created() {
        let (store, _dir) = store();

        assert_eq!(store.read().unwrap(), None);
        assert!(store.path().exists());
        // Second read of the now-empty file is still absent
        assert_eq!(store.read().unwrap(), None);
    }

    #[test]
    fn test_write_overwrites_whole_object() {
        let (store, _dir) = store();
        let first = json!({"chat_model": "gpt-4o", "temperature": 0.2});
        let second = json!({"chat_model": "gpt-4o-mini"});

        store.write(first.as_object().unwrap()).unwrap();
        store.write(second.as_object().unwrap()).unwrap();

        let state = store.read().unwrap().unwrap();
        assert_eq!(Value::Object(state), second);
    }

    #[test]
    fn test_corrupt_and_non_object_content_is_absent() {
        let (store, _dir) = store();

        fs::write(store.path(), "{\"chat_model\": ").unwrap();
        assert_eq!(store.read().unwrap(), None);

        fs::write(store.path(), "[\"gpt-4o\"]").unwrap();
        assert_eq!(store.read().unwrap(), None);
    }
}
