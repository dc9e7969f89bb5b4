//! repoherd - bulk repository search, cached cloning, and PR automation
//!
//! repoherd lets an operator find repositories across one or more search
//! backends, clone them locally with cached-copy reuse, and open, track,
//! update, and close pull requests against heterogeneous code hosts through
//! one uniform contract.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, builds the
//!   composition root, delegates to routers)
//! - [`config`] - Settings schema, validation, and loading
//! - [`secrets`] - Credential storage and prompting
//! - [`http`] - HTTP client construction (timeouts, TLS overrides, auth)
//! - [`search`] - Search backends and the search router
//! - [`vcs`] - Code-host clients, wrapper types, and the PR router
//! - [`git`] - Subprocess git, clone reconciliation, clone URL construction
//! - [`notify`] - User-facing notifications
//! - [`util`] - Shared utilities
//!
//! # Correctness Invariants
//!
//! 1. Settings are immutable snapshots re-read per operation; mid-flight
//!    edits never corrupt an in-progress operation
//! 2. A missing configuration skips an operation, never crashes it
//! 3. A settings/wrapper variant mismatch fails fast as a contract violation
//! 4. Reconciliation histories are ordered and append-only, one entry per
//!    subprocess step or milestone

pub mod cli;
pub mod config;
pub mod git;
pub mod http;
pub mod notify;
pub mod search;
pub mod secrets;
pub mod util;
pub mod vcs;
