//! Free-text restaurant notes kept in a local JSON file.
//!
//! The file is one JSON object mapping restaurant id to note. Writes go to a
//! sibling temp file which is then renamed over the original.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::debug;

use crate::model::ResId;

/// Notes file failure.
#[derive(Debug, thiserror::Error)]
pub enum NotesError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed notes file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, NotesError>;

/// One note per restaurant, persisted to a JSON file.
pub struct NotesStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl NotesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> NotesError {
        NotesError::Io {
            path: self.path.clone(),
            source,
        }
    }

    async fn read_all(&self) -> Result<BTreeMap<String, String>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(BTreeMap::new());
        }
        serde_json::from_slice(&bytes).map_err(|source| NotesError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    /// The note for `res_id`, if one was saved.
    pub async fn load(&self, res_id: &ResId) -> Result<Option<String>> {
        Ok(self.read_all().await?.remove(res_id.as_str()))
    }

    /// Save the note for `res_id`. An empty note removes it.
    pub async fn save(&self, res_id: &ResId, note: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut notes = self.read_all().await?;

        if note.trim().is_empty() {
            notes.remove(res_id.as_str());
        } else {
            notes.insert(res_id.as_str().to_string(), note.to_string());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_vec_pretty(&notes).map_err(|source| NotesError::Malformed {
            path: self.path.clone(),
            source,
        })?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        debug!(res_id = %res_id, path = %self.path.display(), "Saved restaurant note");
        Ok(())
    }
}
