//! cli
//!
//! Command-line interface layer.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Build the composition root: one loader, one credential store, one HTTP
//!   factory, one router per concern, per invocation — no ambient globals
//! - Delegate to command handlers

pub mod args;
pub mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::config::{SettingsLoader, TomlSettingsLoader};
use crate::git::{GitUrlHelper, LocalCloneReconciler, ProcessRunner, TokioProcessRunner};
use crate::http::ClientFactory;
use crate::notify::{LogNotifier, NotificationSink};
use crate::search::{GithubSearchClient, SearchRouter, SourcegraphSearchClient};
use crate::secrets::{CredentialStore, PromptingCredentialStore};
use crate::vcs::bitbucket::BitbucketServerClient;
use crate::vcs::github::GithubComClient;
use crate::vcs::PrRouter;

pub use args::Cli;

/// Everything a command handler needs, built once per invocation.
pub struct Context {
    pub work_root: PathBuf,
    pub search_router: SearchRouter,
    pub pr_router: PrRouter,
    pub reconciler: LocalCloneReconciler,
    pub url_helper: GitUrlHelper,
    pub runner: Arc<dyn ProcessRunner>,
}

impl Context {
    /// Composition root.
    pub fn build(config: Option<PathBuf>) -> Result<Self> {
        let loader: Arc<dyn SettingsLoader> = Arc::new(TomlSettingsLoader::new(
            config.unwrap_or_else(TomlSettingsLoader::default_path),
        ));
        let notifier: Arc<dyn NotificationSink> = Arc::new(LogNotifier);
        let credentials: Arc<dyn CredentialStore> =
            Arc::new(PromptingCredentialStore::new(Arc::clone(&notifier)));
        let factory = Arc::new(ClientFactory::new(
            Arc::clone(&loader),
            Arc::clone(&credentials),
            Arc::clone(&notifier),
        ));
        let runner: Arc<dyn ProcessRunner> = Arc::new(TokioProcessRunner);
        let work_root = std::env::current_dir()?;

        Ok(Self {
            search_router: SearchRouter::new(
                Arc::clone(&loader),
                SourcegraphSearchClient::new(Arc::clone(&factory)),
                GithubSearchClient::new(Arc::clone(&factory)),
                Arc::clone(&notifier),
            ),
            pr_router: PrRouter::new(
                Arc::clone(&loader),
                BitbucketServerClient::new(Arc::clone(&factory), Arc::clone(&notifier)),
                GithubComClient::new(Arc::clone(&factory), Arc::clone(&notifier)),
                Arc::clone(&notifier),
            ),
            reconciler: LocalCloneReconciler::new(&work_root, Arc::clone(&runner)),
            url_helper: GitUrlHelper::new(credentials),
            runner,
            work_root,
        })
    }
}

/// Run the CLI application. Entry point called from `main.rs`.
pub async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let mut logger = env_logger::Builder::from_default_env();
    if cli.debug {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    let ctx = Context::build(cli.config)?;
    commands::dispatch(cli.command, &ctx).await
}
