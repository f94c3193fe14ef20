//! cli::commands::checks
//!
//! List check runs for a pull request's head commit.

use anyhow::Result;

use crate::cli::Context;
use crate::forge::{CheckStatus, Forge};

/// Run the checks command.
pub async fn checks(ctx: &Context, number: u64) -> Result<()> {
    let forge = ctx.session.detect(&ctx.repo_root).await?;
    let pr = forge.get_pull_request(number).await?;
    let runs = forge.list_check_runs(&pr.head_sha).await?;

    if runs.is_empty() {
        println!("No check runs for {}.", pr.head_sha);
        return Ok(());
    }

    for run in runs {
        let state = match run.status {
            CheckStatus::Completed => run.conclusion.as_deref().unwrap_or("completed").to_string(),
            CheckStatus::InProgress => "in progress".to_string(),
            CheckStatus::Queued => "queued".to_string(),
        };
        match &run.details_url {
            Some(url) => println!("{:<12} {}  {url}", state, run.name),
            None => println!("{:<12} {}", state, run.name),
        }
    }
    Ok(())
}
