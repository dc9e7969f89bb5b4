//! cli::args
//!
//! Command-line argument definitions using clap derive.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// repoherd - bulk repository search, cached cloning, and PR automation
#[derive(Parser, Debug)]
#[command(name = "repoherd")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (defaults to <config dir>/repoherd/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    Author,
    Reviewer,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search a configured search host for repositories
    Search {
        /// Search host name from the settings file
        search_host: String,
        /// Backend-native query, passed through verbatim
        query: String,
    },

    /// List open pull requests under a host pair
    Prs {
        search_host: String,
        code_host: String,
        /// Which side of the PRs the configured user is on
        #[arg(long, value_enum, default_value = "author")]
        role: RoleArg,
    },

    /// Ensure a fork of a repository exists, print its clone URL
    Fork {
        search_host: String,
        code_host: String,
        project: String,
        repo: String,
    },

    /// Clone a repository, reusing the local cache when configured
    Clone {
        search_host: String,
        code_host: String,
        project: String,
        repo: String,
        /// Branch to end up on
        #[arg(long, default_value = "main")]
        branch: String,
        /// The repository's default branch
        #[arg(long, default_value = "main")]
        default_branch: String,
    },

    /// Check that the stored token for a search host works
    ValidateToken {
        search_host: String,
    },
}
