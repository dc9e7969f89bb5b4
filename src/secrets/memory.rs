//! secrets::memory
//!
//! In-memory credential store.
//!
//! Used by tests and by embedders that resolve credentials out of band
//! (environment variables, CI secrets) and seed them up front.

use std::collections::HashMap;
use std::sync::RwLock;

use super::{credential_key, CredentialStore};

/// Credential store backed by a process-local map.
#[derive(Default)]
pub struct MemoryCredentialStore {
    passwords: RwLock<HashMap<String, String>>,
    // Cached existence answers; cleared wholesale on every write.
    known: RwLock<HashMap<String, bool>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with `((username, base_url), password)` entries.
    pub fn with_passwords<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = ((String, String), String)>,
    {
        let store = Self::new();
        for ((username, base_url), password) in entries {
            store.set_password(&username, &base_url, &password);
        }
        store
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get_password(&self, username: &str, base_url: &str) -> Option<String> {
        self.passwords
            .read()
            .expect("credential lock poisoned")
            .get(&credential_key(username, base_url))
            .cloned()
    }

    fn is_password_set(&self, username: &str, base_url: &str) -> bool {
        let key = credential_key(username, base_url);
        if let Some(known) = self
            .known
            .read()
            .expect("credential lock poisoned")
            .get(&key)
        {
            return *known;
        }
        let set = self.get_password(username, base_url).is_some();
        self.known
            .write()
            .expect("credential lock poisoned")
            .insert(key, set);
        set
    }

    fn prompt_for_password(&self, _username: Option<&str>, _base_url: &str) -> String {
        // Nothing to prompt with; behaves like a cancelled prompt.
        String::new()
    }

    fn set_password(&self, username: &str, base_url: &str, password: &str) {
        self.passwords
            .write()
            .expect("credential lock poisoned")
            .insert(credential_key(username, base_url), password.to_string());
        self.known.write().expect("credential lock poisoned").clear();
    }
}
