use crate::storage::{RecordStore, RecordStoreError};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::RwLock;

struct FileRecord {
    owner: String,
    filename: String,
    content: Vec<u8>,
}

/// In-process [`RecordStore`] keeping everything in memory.
///
/// Durability ends with the process; the concurrency contract is the same as
/// for any other store, which makes this the store of choice for tests.
pub struct MemoryRecordStore {
    users: RwLock<HashMap<String, String>>,
    files: RwLock<Vec<FileRecord>>,
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRecordStore {
    pub fn new() -> MemoryRecordStore {
        MemoryRecordStore {
            users: RwLock::new(HashMap::new()),
            files: RwLock::new(Vec::new()),
        }
    }
}

impl RecordStore for MemoryRecordStore {
    fn create_user(&self, username: &str, secret: &str) -> Result<bool, RecordStoreError> {
        let mut users = self.users.write().unwrap();
        match users.entry(username.to_owned()) {
            Entry::Vacant(entry) => {
                entry.insert(secret.to_owned());
                Ok(true)
            }
            Entry::Occupied(_) => Ok(false),
        }
    }

    fn user_secret(&self, username: &str) -> Result<Option<String>, RecordStoreError> {
        Ok(self.users.read().unwrap().get(username).cloned())
    }

    fn save_file(
        &self,
        owner: &str,
        filename: &str,
        content: &[u8],
    ) -> Result<(), RecordStoreError> {
        self.files.write().unwrap().push(FileRecord {
            owner: owner.to_owned(),
            filename: filename.to_owned(),
            content: Vec::from(content),
        });

        Ok(())
    }

    fn list_files(&self, owner: &str) -> Result<Vec<String>, RecordStoreError> {
        Ok(self
            .files
            .read()
            .unwrap()
            .iter()
            .filter(|record| record.owner == owner)
            .map(|record| record.filename.clone())
            .collect())
    }

    fn get_file_content(
        &self,
        owner: &str,
        filename: &str,
    ) -> Result<Option<Vec<u8>>, RecordStoreError> {
        Ok(self
            .files
            .read()
            .unwrap()
            .iter()
            .rev()
            .find(|record| record.owner == owner && record.filename == filename)
            .map(|record| record.content.clone()))
    }
}
