//! cli
//!
//! Command-line interface layer for Forgeline.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Assemble the session from configuration
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap, wires the process
//! runner and [`ForgeSession`] together from configuration, and dispatches
//! to a command handler. All forge traffic flows through the session.

pub mod args;
pub mod commands;

pub use args::Cli;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::config::Config;
use crate::forge::{ForgeSession, GhAuthSource, GitRemoteLookup};
use crate::http::CurlClient;
use crate::process::{ProcessRunner, TokioRunner};

/// Shared state handed to every command handler.
pub struct Context {
    /// Repository root the commands operate on.
    pub repo_root: PathBuf,
    /// The session owning provider detection and caches.
    pub session: Arc<ForgeSession>,
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let repo_root = match cli.cwd.clone() {
        Some(path) => path,
        None => std::env::current_dir().context("could not determine current directory")?,
    };

    let runner: Arc<dyn ProcessRunner> = Arc::new(TokioRunner::new());
    let session = Arc::new(ForgeSession::new(
        Arc::new(GitRemoteLookup::with_git_bin(
            runner.clone(),
            config.git_bin(),
        )),
        Arc::new(GhAuthSource::with_gh_bin(runner.clone(), config.gh_bin())),
        CurlClient::with_curl_bin(runner, config.curl_bin())
            .with_default_timeout(config.timeout_seconds()),
    ));

    let ctx = Context { repo_root, session };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(commands::dispatch(cli.command, &ctx))
}
