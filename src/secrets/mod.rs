//! secrets
//!
//! Credential storage and prompting.
//!
//! # Design
//!
//! Credentials are keyed by `(username, base_url)`. The store is the only
//! cross-call shared mutable state in the core; the is-set cache inside each
//! implementation is guarded by a lock and invalidated wholesale whenever a
//! password is written.
//!
//! # Security
//!
//! Implementations never log, print, or include secret values in error or
//! notification text.

mod memory;
mod prompt;
mod traits;

pub use memory::MemoryCredentialStore;
pub use prompt::PromptingCredentialStore;
pub use traits::CredentialStore;

/// Canonical cache key for a credential.
pub(crate) fn credential_key(username: &str, base_url: &str) -> String {
    format!("{}@{}", username, base_url)
}
