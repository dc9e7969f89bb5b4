//! secrets::prompt
//!
//! Interactive credential store.
//!
//! Prompts on the terminal the first time a credential is needed and caches
//! it in memory for the rest of the process. Persistence across runs is a
//! non-goal; operators typically export tokens via their shell profile and
//! seed them through `set_password`.

use std::io::Write;
use std::sync::Arc;

use crate::notify::{NotificationSink, Severity};

use super::{CredentialStore, MemoryCredentialStore};

/// Credential store that falls back to a terminal prompt.
pub struct PromptingCredentialStore {
    cache: MemoryCredentialStore,
    notifier: Arc<dyn NotificationSink>,
}

impl PromptingCredentialStore {
    pub fn new(notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            cache: MemoryCredentialStore::new(),
            notifier,
        }
    }
}

impl CredentialStore for PromptingCredentialStore {
    fn get_password(&self, username: &str, base_url: &str) -> Option<String> {
        self.cache.get_password(username, base_url)
    }

    fn is_password_set(&self, username: &str, base_url: &str) -> bool {
        self.cache.is_password_set(username, base_url)
    }

    fn prompt_for_password(&self, username: Option<&str>, base_url: &str) -> String {
        let resolved_username = match username {
            Some("token") | None => {
                println!("TOKEN login for {}", base_url);
                "token".to_string()
            }
            Some(name) => {
                println!("Credentials for {} at {}", name, base_url);
                name.to_string()
            }
        };
        print!("Password/token: ");
        let _ = std::io::stdout().flush();
        let password = rpassword::read_password().unwrap_or_default();
        if password.trim().is_empty() {
            self.notifier.show(
                "Password not set",
                "No password was entered",
                Severity::Warning,
            );
            return String::new();
        }
        let password = password.trim().to_string();
        self.cache
            .set_password(&resolved_username, base_url, &password);
        password
    }

    fn set_password(&self, username: &str, base_url: &str, password: &str) {
        self.cache.set_password(username, base_url, password);
    }
}
