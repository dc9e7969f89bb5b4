//! secrets::traits
//!
//! Credential store trait definition.

/// Resolves secrets for `(username, base_url)` pairs.
///
/// Implementations must be `Send + Sync`. Token-only hosts store their token
/// under the literal username `token`.
pub trait CredentialStore: Send + Sync {
    /// Get a stored secret. `None` when nothing is stored.
    fn get_password(&self, username: &str, base_url: &str) -> Option<String>;

    /// Whether a secret is known to exist. Backed by a cache that is
    /// invalidated on any write.
    fn is_password_set(&self, username: &str, base_url: &str) -> bool;

    /// Ask the operator for a secret and store it.
    ///
    /// Returns the resolved secret, or an empty string when the operator
    /// cancels. Never returns an error: cancellation is an ordinary outcome.
    fn prompt_for_password(&self, username: Option<&str>, base_url: &str) -> String;

    /// Store a secret, replacing any previous value.
    fn set_password(&self, username: &str, base_url: &str, password: &str);
}
