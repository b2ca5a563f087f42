//! In-memory store, for tests and ephemeral sessions

use crate::document::Document;
use crate::error::Result;
use crate::store::{PersistenceStore, SessionSnapshot, Settings};
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct Records {
    settings: Option<Settings>,
    session: SessionSnapshot,
    document: Option<Document>,
    writes: usize,
}

/// Store that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Records>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of save/clear calls so far
    pub fn write_count(&self) -> usize {
        self.records.lock().writes
    }
}

impl PersistenceStore for MemoryStore {
    fn load_settings(&self) -> Result<Option<Settings>> {
        Ok(self.records.lock().settings.clone())
    }

    fn save_settings(&self, settings: &Settings) -> Result<()> {
        let mut records = self.records.lock();
        records.settings = Some(settings.clone());
        records.writes += 1;
        Ok(())
    }

    fn load_session(&self) -> Result<SessionSnapshot> {
        Ok(self.records.lock().session.clone())
    }

    fn save_session(&self, session: &SessionSnapshot) -> Result<()> {
        let mut records = self.records.lock();
        records.session = session.clone();
        records.writes += 1;
        Ok(())
    }

    fn load_document(&self) -> Result<Option<Document>> {
        Ok(self.records.lock().document.clone())
    }

    fn save_document(&self, document: &Document) -> Result<()> {
        let mut records = self.records.lock();
        records.document = Some(document.clone());
        records.writes += 1;
        Ok(())
    }

    fn clear_document(&self) -> Result<()> {
        let mut records = self.records.lock();
        records.document = None;
        records.session.uploaded_uri = None;
        records.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_writes() {
        let store = MemoryStore::new();
        store.save_settings(&Settings::default()).unwrap();
        store.clear_session().unwrap();
        assert_eq!(store.write_count(), 2);
        assert_eq!(store.load_settings().unwrap(), Some(Settings::default()));
    }
}
