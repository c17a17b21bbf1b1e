// Token usage counters persisted as a single JSON object
// Author: kelexine (https://github.com/kelexine)

use crate::cache::models::TokenCounters;
use crate::error::Result;
use crate::utils::atomic_write::atomic_write;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// JSON object file of additive counters (`prompt_tokens`,
/// `completion_tokens`, `total_tokens`, plus any extra keys).
///
/// Reads never fail on bad content: a status line must always be renderable.
#[derive(Debug, Clone)]
pub struct CountersStore {
    path: PathBuf,
}

impl CountersStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current counters; zeroed when the file is missing, empty or not valid
    /// JSON. Values of unexpected types never discard the other counters.
    pub fn read(&self) -> Result<TokenCounters> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                File::create(&self.path)?;
                return Ok(TokenCounters::default());
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(TokenCounters::default());
        }

        match serde_json::from_str(&content) {
            Ok(counters) => Ok(counters),
            Err(e) => {
                warn!(
                    "Corrupt token counters in {}, using zeros: {}",
                    self.path.display(),
                    e
                );
                Ok(TokenCounters::default())
            }
        }
    }

    /// Add `delta` into the stored counters and return the new totals.
    pub fn accumulate(&self, delta: &TokenCounters) -> Result<TokenCounters> {
        let mut counters = self.read()?;
        counters.merge(delta);

        let json = serde_json::to_vec(&counters)?;
        atomic_write(&self.path, &json)?;

        debug!(
            "Token counters now prompt={} completion={} total={}",
            counters.prompt_tokens, counters.completion_tokens, counters.total_tokens
        );
        Ok(counters)
    }

    /// Empty the file; the next read yields zeros.
    pub fn reset(&self) -> Result<()> {
        File::create(&self.path)?;
        debug!("Reset token counters at {}", self.path.display());
        Ok(())
    }
}
