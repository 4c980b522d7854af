use chrono::Utc;
use log::info;
use rand::RngCore;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::RwLock;

/// How long a freshly minted session token stays valid.
pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 24 * 60 * 60;

/// Bytes of entropy per session token; encoded as hex on the wire.
const TOKEN_ENTROPY_BYTES: usize = 24;

struct SessionEntry {
    owner: String,
    created_at: i64,
}

/// Binds opaque session tokens to authenticated usernames.
///
/// The registry is process-wide shared state: every connection thread may
/// create and resolve sessions concurrently. A token maps to at most one
/// owner at any time and is never handed out twice. Tokens expire after the
/// configured time to live; expired entries are evicted lazily on resolve
/// and in bulk by [`Self::reap_expired`].
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    time_to_live: i64,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> SessionRegistry {
        Self::with_time_to_live(DEFAULT_SESSION_TTL_SECONDS)
    }

    pub fn with_time_to_live(time_to_live_seconds: i64) -> SessionRegistry {
        SessionRegistry {
            sessions: RwLock::new(HashMap::new()),
            time_to_live: time_to_live_seconds,
        }
    }

    /// Mints a new token and binds it to `owner`.
    pub fn create(&self, owner: &str) -> String {
        let created_at = Utc::now().timestamp();

        let mut sessions = self.sessions.write().unwrap();
        loop {
            let token = mint_token();
            match sessions.entry(token.clone()) {
                Entry::Vacant(entry) => {
                    entry.insert(SessionEntry {
                        owner: owner.to_owned(),
                        created_at,
                    });
                    info!("Created session for {owner}");
                    return token;
                }
                // A 192-bit collision; roll again rather than rebind.
                Entry::Occupied(_) => continue,
            }
        }
    }

    /// Looks up the owner a token is bound to, evicting it when expired.
    pub fn resolve(&self, token: &str) -> Option<String> {
        let expiry_cutoff = Utc::now().timestamp() - self.time_to_live;

        {
            let sessions = self.sessions.read().unwrap();
            match sessions.get(token) {
                Some(entry) if entry.created_at > expiry_cutoff => {
                    return Some(entry.owner.clone())
                }
                Some(_) => {}
                None => return None,
            }
        }

        self.sessions.write().unwrap().remove(token);
        info!("Evicted expired session token");
        None
    }

    /// Unbinds a token, e.g. on logout. Returns whether it was bound.
    pub fn remove(&self, token: &str) -> bool {
        self.sessions.write().unwrap().remove(token).is_some()
    }

    /// Sweeps out all expired sessions and returns how many were evicted.
    pub fn reap_expired(&self) -> usize {
        let expiry_cutoff = Utc::now().timestamp() - self.time_to_live;

        let mut sessions = self.sessions.write().unwrap();
        let before = sessions.len();
        sessions.retain(|_, entry| entry.created_at > expiry_cutoff);
        let evicted = before - sessions.len();

        if evicted > 0 {
            info!("Reaped {evicted} expired sessions");
        }

        evicted
    }
}

fn mint_token() -> String {
    let mut bytes = [0u8; TOKEN_ENTROPY_BYTES];
    rand::rng().fill_bytes(&mut bytes);

    let mut token = String::with_capacity(TOKEN_ENTROPY_BYTES * 2);
    for byte in bytes {
        write!(token, "{byte:02x}").unwrap();
    }

    token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_created_token_resolves_to_owner() {
        let registry = SessionRegistry::new();

        let token = registry.create("alice");

        assert_eq!(registry.resolve(&token), Some("alice".to_owned()));
    }

    #[test]
    fn ensure_resolve_is_idempotent() {
        let registry = SessionRegistry::new();

        let token = registry.create("alice");

        for _ in 0..3 {
            assert_eq!(registry.resolve(&token), Some("alice".to_owned()));
        }
    }

    #[test]
    fn ensure_unknown_token_does_not_resolve() {
        let registry = SessionRegistry::new();
        registry.create("alice");

        assert_eq!(registry.resolve("no-such-token"), None);
        assert_eq!(registry.resolve(""), None);
    }

    #[test]
    fn ensure_distinct_logins_get_distinct_tokens() {
        let registry = SessionRegistry::new();

        let first = registry.create("alice");
        let second = registry.create("alice");

        assert_ne!(first, second);
        assert_eq!(registry.resolve(&first), Some("alice".to_owned()));
        assert_eq!(registry.resolve(&second), Some("alice".to_owned()));
    }

    #[test]
    fn ensure_expired_token_does_not_resolve() {
        let registry = SessionRegistry::with_time_to_live(0);

        let token = registry.create("alice");

        assert_eq!(registry.resolve(&token), None);
        // Eviction happened; still gone.
        assert_eq!(registry.resolve(&token), None);
    }

    #[test]
    fn ensure_reap_evicts_expired_sessions() {
        let registry = SessionRegistry::with_time_to_live(0);
        registry.create("alice");
        registry.create("bob");

        assert_eq!(registry.reap_expired(), 2);
        assert_eq!(registry.reap_expired(), 0);
    }

    #[test]
    fn ensure_removed_token_does_not_resolve() {
        let registry = SessionRegistry::new();

        let token = registry.create("alice");

        assert!(registry.remove(&token));
        assert!(!registry.remove(&token));
        assert_eq!(registry.resolve(&token), None);
    }

    #[test]
    fn ensure_tokens_are_hex_of_expected_length() {
        let registry = SessionRegistry::new();

        let token = registry.create("alice");

        assert_eq!(token.len(), TOKEN_ENTROPY_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
