pub mod memory;

use snafu::Snafu;

/// Errors that may occur when the storage backend is consulted.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RecordStoreError {
    /// The backend could not complete the operation.
    #[snafu(display("The storage backend failed: {message}"))]
    BackendError { message: String },
}

pub type ThreadSafeRecordStore = dyn RecordStore + Sync + Send;

/// Durable storage of user credentials and file records, keyed by owner.
///
/// The store is the sole owner of persisted data; no caller caches it. It is
/// expected to serialize concurrent access internally — callers invoke it
/// from many threads without external locking. Implementations must not
/// panic on backend failures; every fallible path reports through
/// [`RecordStoreError`].
pub trait RecordStore {
    /// Creates a user with the given opaque credential secret if the name is
    /// not taken yet.
    ///
    /// Returns `false` when a user of that name already exists. The check and
    /// the insert are atomic with respect to concurrent calls for the same
    /// username: of two racing registrations, at most one returns `true`.
    fn create_user(&self, username: &str, secret: &str) -> Result<bool, RecordStoreError>;

    /// Retrieves the stored credential secret of a user, or `None` when the
    /// user is unknown. The secret is opaque to the store; verification is
    /// the credential verifier's concern.
    fn user_secret(&self, username: &str) -> Result<Option<String>, RecordStoreError>;

    /// Persists a file record for `owner`.
    ///
    /// Duplicate filenames are permitted; every call creates a new record.
    /// The record must be durable when this returns `Ok`.
    fn save_file(&self, owner: &str, filename: &str, content: &[u8])
        -> Result<(), RecordStoreError>;

    /// Lists the filenames owned by `owner` in storage iteration order.
    /// The order is stable but not guaranteed to be sorted.
    fn list_files(&self, owner: &str) -> Result<Vec<String>, RecordStoreError>;

    /// Retrieves the content of the most recently stored record named
    /// `filename` for `owner`, or `None` when no such file exists.
    fn get_file_content(
        &self,
        owner: &str,
        filename: &str,
    ) -> Result<Option<Vec<u8>>, RecordStoreError>;
}
