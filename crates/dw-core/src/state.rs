//! Run-state persistence.
//!
//! A small key-value store holding per-model last-run metadata and
//! incremental watermarks. Writes are staged in memory behind a single
//! writer and committed atomically (write-to-temp-then-rename) once per
//! build.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

/// Terminal outcome of one model in one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Success,
    Error,
    Skipped,
    Timeout,
    Cancelled,
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::Success => write!(f, "success"),
            RunOutcome::Error => write!(f, "error"),
            RunOutcome::Skipped => write!(f, "skipped"),
            RunOutcome::Timeout => write!(f, "timeout"),
            RunOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Last-run metadata for one model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    /// Outcome of the last run
    pub outcome: RunOutcome,

    /// When the model last ran
    pub last_run_at: DateTime<Utc>,

    /// Execution duration in milliseconds
    pub duration_ms: u64,

    /// Error message when the run failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Incremental watermark (opaque to the engine)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateData {
    /// Identifier of the build that last committed this state
    run_id: String,

    /// When the state was last committed
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,

    /// Per-model metadata, keyed by qualified name
    #[serde(default)]
    models: BTreeMap<String, RunMeta>,
}

/// File-backed state store with a single staged writer.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    inner: Mutex<StateData>,
}

impl StateStore {
    /// Open a state store, loading existing state when the file exists.
    pub fn open(path: &Path) -> CoreResult<Self> {
        let data = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
                path: path.display().to_string(),
                source: e,
            })?;
            serde_json::from_str(&content).map_err(|e| CoreError::StateError {
                message: format!("corrupt state file {}: {}", path.display(), e),
            })?
        } else {
            StateData::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(data),
        })
    }

    /// Fetch the last-run metadata for a model.
    pub fn get_run_metadata(&self, model: &str) -> Option<RunMeta> {
        self.lock().models.get(model).cloned()
    }

    /// Stage new metadata for a model (persisted on [`commit`](Self::commit)).
    pub fn put_run_metadata(&self, model: &str, meta: RunMeta) {
        self.lock().models.insert(model.to_string(), meta);
    }

    /// Stage removal of a model's metadata.
    pub fn clear_run_metadata(&self, model: &str) {
        self.lock().models.remove(model);
    }

    /// Commit staged state atomically: serialize, write to a temp file next
    /// to the target, then rename over it.
    pub fn commit(&self) -> CoreResult<()> {
        let json = {
            let mut data = self.lock();
            data.run_id = Uuid::new_v4().to_string()[..8].to_string();
            data.updated_at = Some(Utc::now());
            serde_json::to_string_pretty(&*data)?
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StateData> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            log::warn!("state store mutex poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl RunMeta {
    /// Metadata for a successful run finishing now.
    pub fn success(duration_ms: u64) -> Self {
        Self {
            outcome: RunOutcome::Success,
            last_run_at: Utc::now(),
            duration_ms,
            error: None,
            watermark: None,
        }
    }

    /// Metadata for a failed run finishing now.
    pub fn failure(outcome: RunOutcome, duration_ms: u64, error: impl Into<String>) -> Self {
        Self {
            outcome,
            last_run_at: Utc::now(),
            duration_ms,
            error: Some(error.into()),
            watermark: None,
        }
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
