// Cacher - resolves per-namespace cache files and fronts the three stores
// Author: kelexine (https://github.com/kelexine)

use crate::cache::counters::CountersStore;
use crate::cache::model_state::{ModelState, ModelStateStore};
use crate::cache::models::{HistoryRead, Record, TokenCounters};
use crate::cache::records::LineRecordStore;
use crate::config::CacheConfig;
use crate::error::{CompletionError, Result};
use crate::models::AssistantSettings;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const HISTORY_FILE: &str = "chat_history.jl";
const MODEL_FILE: &str = "current_assistant.json";
const TOKENS_FILE: &str = "tokens_count.json";

/// Local cache for one chat session.
///
/// Every file lives directly under `root`; the namespace only prefixes file
/// names, so two `Cacher`s with the same namespace share state and different
/// namespaces never do. `None` and `Some("")` are the same default identity.
///
/// Files are not locked. Only one `Cacher` per namespace may write at a time.
#[derive(Debug, Clone)]
pub struct Cacher {
    root: PathBuf,
    namespace: Option<String>,
    history: LineRecordStore,
    counters: CountersStore,
    model_state: ModelStateStore,
}

impl Cacher {
    /// Open (and create if needed) the cache under `root`.
    pub fn new(root: impl Into<PathBuf>, namespace: Option<&str>) -> Result<Self> {
        let root = root.into();
        let namespace = Self::validate_namespace(namespace)?;

        fs::create_dir_all(&root)?;

        let file = |name: &str| root.join(Self::file_name(namespace.as_deref(), name));
        let cacher = Self {
            history: LineRecordStore::new(file(HISTORY_FILE)),
            counters: CountersStore::new(file(TOKENS_FILE)),
            model_state: ModelStateStore::new(file(MODEL_FILE)),
            namespace,
            root,
        };

        debug!(
            "Opened cache at {} (namespace: {})",
            cacher.root.display(),
            cacher.namespace.as_deref().unwrap_or("<default>")
        );
        Ok(cacher)
    }

    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        Self::new(&config.root, config.namespace.as_deref())
    }

    /// Empty namespaces collapse to the default; separators and dot names
    /// are rejected so no file escapes the cache root.
    fn validate_namespace(namespace: Option<&str>) -> Result<Option<String>> {
        match namespace {
            None | Some("") => Ok(None),
            Some(ns @ ("." | "..")) => Err(CompletionError::InvalidNamespace(format!(
                "{:?} is not a valid namespace",
                ns
            ))),
            Some(ns) if ns.contains(['/', '\\', '\0']) => Err(CompletionError::InvalidNamespace(
                format!("{:?} must not contain path separators", ns),
            )),
            Some(ns) => Ok(Some(ns.to_string())),
        }
    }

    fn file_name(namespace: Option<&str>, name: &str) -> String {
        match namespace {
            Some(ns) => format!("{}_{}", ns, name),
            None => name.to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn history(&self) -> &LineRecordStore {
        &self.history
    }

    pub fn counters(&self) -> &CountersStore {
        &self.counters
    }

    pub fn model_state(&self) -> &ModelStateStore {
        &self.model_state
    }

    // History

    pub fn read_all(&self) -> Result<HistoryRead> {
        self.history.read_all()
    }

    pub fn read_last(&self, n: usize) -> Result<HistoryRead> {
        self.history.read_last(n)
    }

    pub fn append_batch(&self, records: &[Record]) -> Result<()> {
        self.history.append_batch(records)
    }

    pub fn drop_first(&self, n: usize) -> Result<()> {
        self.history.drop_first(n)
    }

    /// Start a fresh conversation.
    pub fn drop_all(&self) -> Result<()> {
        self.history.truncate()
    }

    // Token counters

    pub fn accumulate_tokens(&self, delta: &TokenCounters) -> Result<TokenCounters> {
        self.counters.accumulate(delta)
    }

    /// Read path for the status display. Always yields a value.
    pub fn read_tokens_count(&self) -> Result<TokenCounters> {
        self.counters.read()
    }

    pub fn reset_tokens_count(&self) -> Result<()> {
        self.counters.reset()
    }

    // Model state

    pub fn save_model(&self, state: &ModelState) -> Result<()> {
        self.model_state.write(state)
    }

    pub fn read_model(&self) -> Result<Option<ModelState>> {
        self.model_state.read()
    }

    /// Persist the assistant selection. Tokens are never written.
    pub fn save_assistant(&self, assistant: &AssistantSettings) -> Result<()> {
        match serde_json::to_value(assistant)? {
            serde_json::Value::Object(state) => self.save_model(&state),
            _ => Err(CompletionError::Config(
                "assistant settings did not serialize to an object".to_string(),
            )),
        }
    }

    /// The saved assistant, or `None` when nothing usable is stored.
    pub fn read_assistant(&self) -> Result<Option<AssistantSettings>> {
        let Some(state) = self.read_model()? else {
            return Ok(None);
        };

        match serde_json::from_value(serde_json::Value::Object(state)) {
            Ok(assistant) => Ok(Some(assistant)),
            Err(e) => {
                warn!("Saved assistant is not usable, ignoring: {}", e);
                Ok(None)
            }
        }
    }
}
