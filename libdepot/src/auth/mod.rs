use crate::storage::ThreadSafeRecordStore;
use log::warn;
use pbkdf2::password_hash::rand_core::OsRng;
use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::{Params, Pbkdf2};
use snafu::Snafu;
use std::error::Error;

pub type ThreadSafeCredentialVerifier = dyn CredentialVerifier + Sync + Send;

/// Turns passwords into opaque stored secrets and checks passwords against
/// them. The record store only ever sees the derived secret, never the
/// password itself.
pub trait CredentialVerifier {
    /// Derives the secret to store for a new registration.
    fn derive_secret(&self, password: &str) -> Result<String, Box<dyn Error>>;

    /// Checks a login attempt against a stored secret.
    fn verify_secret(&self, password: &str, secret: &str) -> bool;
}

#[derive(Debug, Snafu)]
#[snafu(display("Deriving the credential secret failed: {message}"))]
struct SecretDerivationError {
    message: String,
}

/// PBKDF2-HMAC-SHA-256 backed verifier producing salted PHC strings.
/// Verification is constant-time and reads its parameters from the stored
/// secret, so the round count can be raised without invalidating old
/// credentials.
pub struct Pbkdf2Verifier {
    params: Params,
}

impl Default for Pbkdf2Verifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Pbkdf2Verifier {
    pub fn new() -> Pbkdf2Verifier {
        Pbkdf2Verifier {
            params: Params::default(),
        }
    }

    /// Lower-cost instance, e.g. for tests and local tooling.
    pub fn with_rounds(rounds: u32) -> Pbkdf2Verifier {
        Pbkdf2Verifier {
            params: Params {
                rounds,
                ..Params::default()
            },
        }
    }
}

impl CredentialVerifier for Pbkdf2Verifier {
    fn derive_secret(&self, password: &str) -> Result<String, Box<dyn Error>> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = Pbkdf2
            .hash_password_customized(
                password.as_bytes(),
                None,
                None,
                self.params.clone(),
                &salt,
            )
            .map_err(|e| {
                SecretDerivationSnafu {
                    message: e.to_string(),
                }
                .build()
            })?;

        Ok(hash.to_string())
    }

    fn verify_secret(&self, password: &str, secret: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(secret) else {
            return false;
        };

        Pbkdf2.verify_password(password.as_bytes(), &parsed).is_ok()
    }
}

/// Checks a login attempt against the record store.
///
/// A store failure is a failed login, never a success.
pub fn verify_user(
    store: &ThreadSafeRecordStore,
    verifier: &ThreadSafeCredentialVerifier,
    username: &str,
    password: &str,
) -> bool {
    match store.user_secret(username) {
        Ok(Some(secret)) => verifier.verify_secret(password, &secret),
        Ok(None) => false,
        Err(e) => {
            warn!("Credential lookup for {username} failed: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{BackendSnafu, RecordStore, RecordStoreError};

    #[test]
    fn ensure_derived_secret_verifies_original_password() {
        let verifier = Pbkdf2Verifier::with_rounds(1_000);

        let secret = verifier.derive_secret("hunter2").unwrap();

        assert!(verifier.verify_secret("hunter2", &secret));
    }

    #[test]
    fn ensure_wrong_password_does_not_verify() {
        let verifier = Pbkdf2Verifier::with_rounds(1_000);

        let secret = verifier.derive_secret("hunter2").unwrap();

        assert!(!verifier.verify_secret("hunter3", &secret));
        assert!(!verifier.verify_secret("", &secret));
    }

    #[test]
    fn ensure_secrets_are_salted() {
        let verifier = Pbkdf2Verifier::with_rounds(1_000);

        let first = verifier.derive_secret("hunter2").unwrap();
        let second = verifier.derive_secret("hunter2").unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn ensure_garbage_secret_does_not_verify() {
        let verifier = Pbkdf2Verifier::with_rounds(1_000);

        assert!(!verifier.verify_secret("hunter2", "not a phc string"));
    }

    struct FailingStore {}

    impl RecordStore for FailingStore {
        fn create_user(&self, _username: &str, _secret: &str) -> Result<bool, RecordStoreError> {
            BackendSnafu { message: "down" }.fail()
        }

        fn user_secret(&self, _username: &str) -> Result<Option<String>, RecordStoreError> {
            BackendSnafu { message: "down" }.fail()
        }

        fn save_file(
            &self,
            _owner: &str,
            _filename: &str,
            _content: &[u8],
        ) -> Result<(), RecordStoreError> {
            BackendSnafu { message: "down" }.fail()
        }

        fn list_files(&self, _owner: &str) -> Result<Vec<String>, RecordStoreError> {
            BackendSnafu { message: "down" }.fail()
        }

        fn get_file_content(
            &self,
            _owner: &str,
            _filename: &str,
        ) -> Result<Option<Vec<u8>>, RecordStoreError> {
            BackendSnafu { message: "down" }.fail()
        }
    }

    #[test]
    fn ensure_store_failure_is_a_failed_login() {
        let store = FailingStore {};
        let verifier = Pbkdf2Verifier::with_rounds(1_000);

        assert!(!verify_user(&store, &verifier, "alice", "hunter2"));
    }
}
