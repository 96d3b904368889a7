//! JSON array file store for finished runs.
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;
use w2g_core::{GiveState, ResultSink, W2gError};

use crate::error::SinkError;

/// Appends each record to a JSON array held in one file.
///
/// A missing or unparsable file starts a fresh array; a file holding a single
/// non-array value keeps it as the first element.
pub struct JsonFileSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_record(&self, record: &GiveState) -> Result<(), SinkError> {
        let _guard = self.lock.lock().map_err(|_| SinkError::Poisoned)?;

        let mut records = load_array(&self.path)?;
        records.push(serde_json::to_value(record)?);

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&Value::Array(records))?)?;
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(path = %self.path.display(), "result appended");
        Ok(())
    }
}

impl ResultSink for JsonFileSink {
    fn append(&self, record: &GiveState) -> Result<(), W2gError> {
        self.append_record(record).map_err(W2gError::from)
    }
}

fn load_array(path: &Path) -> Result<Vec<Value>, SinkError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(other) => {
            tracing::warn!(path = %path.display(), "result store is not an array, wrapping it");
            Ok(vec![other])
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "result store unreadable, starting over");
            Ok(Vec::new())
        }
    }
}

/// Every record in the store that decodes as a [`GiveState`].
pub fn read_records(path: &Path) -> Result<Vec<GiveState>, SinkError> {
    let records = load_array(path)?
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed record");
                None
            }
        })
        .collect();
    Ok(records)
}
