use crate::db::DEPOT_DB;
use chrono::Utc;
use depot::storage::{BackendSnafu, RecordStore, RecordStoreError};
use rusqlite::OptionalExtension;

/// [`RecordStore`] backed by the depot SQLite database.
///
/// Every thread works on its own connection ([`DEPOT_DB`]); SQLite serializes
/// the writers, so the create-if-absent insert below is atomic across
/// threads.
pub struct SqliteRecordStore {}

impl Default for SqliteRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SqliteRecordStore {
    pub fn new() -> SqliteRecordStore {
        SqliteRecordStore {}
    }
}

fn backend_error(e: rusqlite::Error) -> RecordStoreError {
    BackendSnafu {
        message: e.to_string(),
    }
    .build()
}

impl RecordStore for SqliteRecordStore {
    fn create_user(&self, username: &str, secret: &str) -> Result<bool, RecordStoreError> {
        let inserted = DEPOT_DB
            .with_borrow(|db| {
                db.execute(
                    "INSERT OR IGNORE INTO user (username, secret) VALUES (?1, ?2)",
                    (username, secret),
                )
            })
            .map_err(backend_error)?;

        Ok(inserted > 0)
    }

    fn user_secret(&self, username: &str) -> Result<Option<String>, RecordStoreError> {
        DEPOT_DB
            .with_borrow(|db| {
                db.query_row(
                    "SELECT secret FROM user WHERE username = ?1",
                    (username,),
                    |row| row.get(0),
                )
                .optional()
            })
            .map_err(backend_error)
    }

    fn save_file(
        &self,
        owner: &str,
        filename: &str,
        content: &[u8],
    ) -> Result<(), RecordStoreError> {
        let now = Utc::now().timestamp();

        DEPOT_DB
            .with_borrow(|db| {
                db.execute(
                    "INSERT INTO user_file (owner, filename, created_at, content)
                         VALUES (?1, ?2, ?3, ?4)",
                    (owner, filename, now, content),
                )
            })
            .map_err(backend_error)?;

        Ok(())
    }

    fn list_files(&self, owner: &str) -> Result<Vec<String>, RecordStoreError> {
        DEPOT_DB
            .with_borrow(|db| {
                let mut statement =
                    db.prepare("SELECT filename FROM user_file WHERE owner = ?1 ORDER BY id")?;
                let rows = statement.query_map((owner,), |row| row.get(0))?;

                rows.collect::<rusqlite::Result<Vec<String>>>()
            })
            .map_err(backend_error)
    }

    fn get_file_content(
        &self,
        owner: &str,
        filename: &str,
    ) -> Result<Option<Vec<u8>>, RecordStoreError> {
        DEPOT_DB
            .with_borrow(|db| {
                db.query_row(
                    "SELECT content FROM user_file
                         WHERE owner = ?1 AND filename = ?2
                         ORDER BY id DESC LIMIT 1",
                    (owner, filename),
                    |row| row.get(0),
                )
                .optional()
            })
            .map_err(backend_error)
    }
}
