//! http
//!
//! HTTP client construction.
//!
//! # Design
//!
//! Every backend call goes through a client built here. The factory resolves
//! the effective TLS trust override (code host → search host → global
//! default), resolves the password through the [`CredentialStore`], and
//! configures the transport: 1s connect timeout, 60s request timeout, and an
//! `Authorization` default header computed by the settings variant.
//!
//! A missing password is a hard stop: the factory notifies the operator and
//! returns [`HttpError::CredentialsMissing`] instead of silently building an
//! unauthenticated client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use thiserror::Error;

use crate::config::{AuthMethod, HostAuth, HttpsOverride, SettingsLoader};
use crate::notify::{NotificationSink, Severity};
use crate::secrets::CredentialStore;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors from client construction.
#[derive(Debug, Error)]
pub enum HttpError {
    /// No password is stored for the host and the prompt yielded nothing.
    #[error("credentials missing for {auth_method:?}: {username}@{base_url}")]
    CredentialsMissing {
        auth_method: AuthMethod,
        username: String,
        base_url: String,
    },

    /// The transport could not be configured.
    #[error("failed to build http client: {0}")]
    Build(String),
}

/// Builds configured HTTP clients for search and code hosts.
pub struct ClientFactory {
    loader: Arc<dyn SettingsLoader>,
    credentials: Arc<dyn CredentialStore>,
    notifier: Arc<dyn NotificationSink>,
}

impl ClientFactory {
    pub fn new(
        loader: Arc<dyn SettingsLoader>,
        credentials: Arc<dyn CredentialStore>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            loader,
            credentials,
            notifier,
        }
    }

    /// Client for a search host.
    pub fn for_search_host(
        &self,
        search_host: &str,
        auth: &dyn HostAuth,
    ) -> Result<Client, HttpError> {
        let https_override = self
            .loader
            .read_settings()
            .and_then(|s| s.resolve_https_override(search_host));
        self.client(https_override, auth)
    }

    /// Client for a code host under a search host.
    pub fn for_code_host(
        &self,
        search_host: &str,
        code_host: &str,
        auth: &dyn HostAuth,
    ) -> Result<Client, HttpError> {
        let https_override = self
            .loader
            .read_settings()
            .and_then(|s| s.resolve_code_https_override(search_host, code_host));
        self.client(https_override, auth)
    }

    fn client(
        &self,
        https_override: Option<HttpsOverride>,
        auth: &dyn HostAuth,
    ) -> Result<Client, HttpError> {
        let password = self.password_for(auth)?;
        let header = auth.auth_header_value(&password);
        build_client(https_override, header)
    }

    fn password_for(&self, auth: &dyn HostAuth) -> Result<String, HttpError> {
        let username = match auth.auth_method() {
            AuthMethod::None => return Ok(String::new()),
            AuthMethod::UsernameToken => auth.username().unwrap_or("token"),
            AuthMethod::JustToken => auth.username().unwrap_or("token"),
        };
        if let Some(password) = self.credentials.get_password(username, auth.base_url()) {
            return Ok(password);
        }
        let prompted = self
            .credentials
            .prompt_for_password(Some(username), auth.base_url());
        if !prompted.is_empty() {
            return Ok(prompted);
        }
        self.notifier.show(
            "Password not set",
            &format!(
                "Password was not set for {:?}: {}@{}",
                auth.auth_method(),
                username,
                auth.base_url()
            ),
            Severity::Warning,
        );
        Err(HttpError::CredentialsMissing {
            auth_method: auth.auth_method(),
            username: username.to_string(),
            base_url: auth.base_url().to_string(),
        })
    }
}

fn build_client(
    https_override: Option<HttpsOverride>,
    auth_header: Option<String>,
) -> Result<Client, HttpError> {
    let mut builder = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT);

    match https_override {
        Some(HttpsOverride::AllowSelfSignedCert) => {
            builder = builder.danger_accept_invalid_certs(true);
        }
        Some(HttpsOverride::AllowAnything) => {
            builder = builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }
        None => {}
    }

    if let Some(value) = auth_header {
        let mut header =
            HeaderValue::from_str(&value).map_err(|e| HttpError::Build(e.to_string()))?;
        header.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, header);
        builder = builder.default_headers(headers);
    }

    builder.build().map_err(|e| HttpError::Build(e.to_string()))
}
