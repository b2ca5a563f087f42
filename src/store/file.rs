//! Directory-backed store

use crate::document::Document;
use crate::error::{Error, Result};
use crate::store::{PersistenceStore, SessionSnapshot, Settings};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_FILE: &str = "settings.json";
const SESSION_FILE: &str = "session.json";
const DOCUMENT_FILE: &str = "document.bin";
const DOCUMENT_META_FILE: &str = "document.json";

/// Metadata kept next to the raw document bytes
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentMeta {
    name: String,
    mime_type: String,
    last_modified: Option<DateTime<Utc>>,
}

/// Keeps each record as its own file under a root directory.
///
/// Writes go through a temporary file and a rename so a crash never leaves a
/// half-written record behind.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        tracing::debug!(root = %root.display(), "opened file store");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.path(name);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let json = serde_json::to_vec_pretty(value)?;
        self.write_atomic(name, &json)
    }

    fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(name);
        let temp_path = self.path(&format!("{}.tmp", name));
        fs::write(&temp_path, bytes)?;
        fs::rename(&temp_path, &path)?;
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.path(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

impl PersistenceStore for FileStore {
    fn load_settings(&self) -> Result<Option<Settings>> {
        self.read_json(SETTINGS_FILE)
    }

    fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.write_json(SETTINGS_FILE, settings)
    }

    fn load_session(&self) -> Result<SessionSnapshot> {
        Ok(self.read_json(SESSION_FILE)?.unwrap_or_default())
    }

    fn save_session(&self, session: &SessionSnapshot) -> Result<()> {
        tracing::debug!(
            messages = session.messages.len(),
            has_result = session.active_result.is_some(),
            "saving session"
        );
        self.write_json(SESSION_FILE, session)
    }

    fn load_document(&self) -> Result<Option<Document>> {
        let Some(meta) = self.read_json::<DocumentMeta>(DOCUMENT_META_FILE)? else {
            return Ok(None);
        };

        let path = self.path(DOCUMENT_FILE);
        if !path.exists() {
            tracing::warn!(name = %meta.name, "document metadata without bytes, ignoring");
            return Ok(None);
        }

        let data = fs::read(&path)?;
        Document::from_upload(meta.name, &meta.mime_type, data, meta.last_modified).map(Some)
    }

    fn save_document(&self, document: &Document) -> Result<()> {
        // Bytes first: metadata is what makes a document visible to load
        self.remove(DOCUMENT_META_FILE)?;
        self.write_atomic(DOCUMENT_FILE, document.data())?;
        self.write_json(
            DOCUMENT_META_FILE,
            &DocumentMeta {
                name: document.name.clone(),
                mime_type: document.mime_type.clone(),
                last_modified: document.last_modified,
            },
        )?;

        tracing::info!(name = %document.name, bytes = document.len(), "document saved");
        Ok(())
    }

    fn clear_document(&self) -> Result<()> {
        self.remove(DOCUMENT_META_FILE)?;
        self.remove(DOCUMENT_FILE)?;

        let mut session = self.load_session()?;
        if session.uploaded_uri.take().is_some() {
            self.save_session(&session)?;
        }
        Ok(())
    }
}
